//! `downpour conform` — compare rendered `*.text` fixtures against their
//! `*.html` counterparts.

use anyhow::{Context, Result};
use colored::Colorize;
use downpour::{HtmlRenderer, Markdown};
use std::fs;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::config::Options;

/// Outcome of one conformance run.
#[derive(Debug, Default)]
pub struct ConformReport {
    pub passed: usize,
    pub failed: Vec<PathBuf>,
    pub missing: Vec<PathBuf>,
}

impl ConformReport {
    pub fn is_success(&self) -> bool {
        self.failed.is_empty()
    }

    pub fn print_summary(&self) {
        println!();
        println!("{}", "====".dimmed());

        let mut parts = vec![format!("{} passed", self.passed)];
        if !self.failed.is_empty() {
            parts.push(format!("{} failed", self.failed.len()));
        }
        if !self.missing.is_empty() {
            parts.push(format!("{} without expected output", self.missing.len()));
        }
        let line = parts.join(", ");
        if self.is_success() {
            println!("{}", line.green());
        } else {
            println!("{}", line.red().bold());
        }
    }
}

/// Collapse whitespace runs and drop whitespace between tags.
pub fn normalize_html(html: &str) -> String {
    html.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .replace("> <", "><")
}

/// Render every `*.text` file under `dir` and compare it with the `.html`
/// file next to it.
pub fn run_conform(dir: &Path, options: Options, quiet: bool) -> Result<ConformReport> {
    if !dir.is_dir() {
        anyhow::bail!("Fixture directory not found: {}", dir.display());
    }

    let mut md = Markdown::new(HtmlRenderer::new(options.render), options.extensions)?
        .with_max_nesting(options.max_nesting);

    let mut fixtures = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        let path = entry.path();
        if entry.file_type().is_file() && path.extension().is_some_and(|ext| ext == "text") {
            fixtures.push(path.to_path_buf());
        }
    }

    let mut report = ConformReport::default();
    for text_path in fixtures {
        let html_path = text_path.with_extension("html");
        if !html_path.exists() {
            if !quiet {
                println!("{}: {}", text_path.display(), "SKIP".yellow());
            }
            report.missing.push(text_path);
            continue;
        }

        let source = fs::read(&text_path)
            .with_context(|| format!("Failed to read {}", text_path.display()))?;
        let expected = fs::read_to_string(&html_path)
            .with_context(|| format!("Failed to read {}", html_path.display()))?;

        let actual = md
            .render_bytes(&source)
            .with_context(|| format!("Failed to render {}", text_path.display()))?;

        if normalize_html(&actual) == normalize_html(&expected) {
            if !quiet {
                println!("{}: {}", text_path.display(), "OK".green());
            }
            report.passed += 1;
        } else {
            println!("{}: {}", text_path.display(), "FAIL".red().bold());
            if !quiet {
                println!("  {} {}", "expected:".dimmed(), normalize_html(&expected));
                println!("  {} {}", "actual:".dimmed(), normalize_html(&actual));
            }
            log::debug!("raw output for {}:\n{}", text_path.display(), actual);
            report.failed.push(text_path);
        }
    }

    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use downpour::{DEFAULT_MAX_NESTING, Extensions, RenderFlags};

    fn options() -> Options {
        Options {
            extensions: Extensions::empty(),
            render: RenderFlags::empty(),
            max_nesting: DEFAULT_MAX_NESTING,
        }
    }

    fn temp_dir(name: &str) -> PathBuf {
        let dir = std::env::temp_dir().join("downpour-conform-unit").join(name);
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(&dir).unwrap();
        dir
    }

    #[test]
    fn test_normalize_html() {
        assert_eq!(
            normalize_html("<p>a\n  b</p>\n\n<ul>\n<li>x</li>\n</ul>\n"),
            "<p>a b</p><ul><li>x</li></ul>"
        );
        assert_eq!(normalize_html("  \n\t "), "");
    }

    #[test]
    fn test_pass_fail_and_missing() {
        let dir = temp_dir("mixed");
        fs::write(dir.join("good.text"), "Hello *there*\n").unwrap();
        fs::write(dir.join("good.html"), "<p>Hello\n<em>there</em></p>\n").unwrap();
        fs::write(dir.join("bad.text"), "# Title\n").unwrap();
        fs::write(dir.join("bad.html"), "<h2>Title</h2>\n").unwrap();
        fs::write(dir.join("lonely.text"), "nothing to compare\n").unwrap();

        let report = run_conform(&dir, options(), true).unwrap();
        assert_eq!(report.passed, 1);
        assert_eq!(report.failed, vec![dir.join("bad.text")]);
        assert_eq!(report.missing, vec![dir.join("lonely.text")]);
        assert!(!report.is_success());
    }

    #[test]
    fn test_library_fixtures_conform() {
        let dir = Path::new(env!("CARGO_MANIFEST_DIR")).join("downpour/tests/fixtures");
        let report = run_conform(&dir, options(), true).unwrap();
        assert!(report.is_success(), "failed: {:?}", report.failed);
        assert!(report.missing.is_empty(), "missing: {:?}", report.missing);
        assert!(report.passed >= 10, "only {} fixtures passed", report.passed);
    }

    #[test]
    fn test_missing_directory() {
        assert!(run_conform(Path::new("/definitely/not/here"), options(), true).is_err());
    }
}
