//! `downpour build` — render a tree of Markdown files into HTML files.
//!
//! Every `*.md`, `*.markdown` and `*.text` file under the source directory
//! becomes an `.html` file at the same relative path under the output
//! directory. Outputs whose content hash has not changed are left alone.

use anyhow::{Context, Result};
use colored::Colorize;
use downpour::{HtmlRenderer, Markdown};
use notify::{EventKind, RecursiveMode, Watcher};
use sha2::{Digest, Sha256};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc;
use std::time::{Duration, Instant};
use walkdir::WalkDir;

use crate::config::Options;

const SOURCE_EXTENSIONS: &[&str] = &["md", "markdown", "text"];

/// Options passed from CLI to the build.
pub struct BuildOpts<'a> {
    pub source: &'a Path,
    pub out: &'a Path,
    pub force: bool,
    pub quiet: bool,
    pub options: Options,
}

/// Result status for a single output file.
#[derive(Debug, PartialEq)]
enum FileStatus {
    Created,
    Updated,
    Unchanged,
}

/// Aggregate report from one build.
#[derive(Debug, Default)]
pub struct BuildReport {
    pub created: usize,
    pub updated: usize,
    pub unchanged: usize,
    pub warnings: Vec<String>,
}

impl BuildReport {
    pub fn print_summary(&self) {
        println!();
        println!("{}", "Build complete!".green().bold());

        let mut parts = Vec::new();
        if self.created > 0 {
            parts.push(format!("{} created", self.created));
        }
        if self.updated > 0 {
            parts.push(format!("{} updated", self.updated));
        }
        if self.unchanged > 0 {
            parts.push(format!("{} unchanged", self.unchanged));
        }
        if parts.is_empty() {
            parts.push("no Markdown files found".to_string());
        }
        println!("{}", parts.join(", "));

        for w in &self.warnings {
            println!("{} {}", "WARNING:".yellow(), w);
        }
    }
}

/// Render every Markdown file under `opts.source` into `opts.out`.
pub fn handle_build(opts: &BuildOpts) -> Result<BuildReport> {
    let renderer = HtmlRenderer::new(opts.options.render);
    let mut md = Markdown::new(renderer, opts.options.extensions)?
        .with_max_nesting(opts.options.max_nesting);

    let mut report = BuildReport::default();
    for rel_path in list_sources(opts.source)? {
        let src_path = opts.source.join(&rel_path);
        let dest_path = opts.out.join(&rel_path).with_extension("html");

        let bytes = fs::read(&src_path)
            .with_context(|| format!("Failed to read {}", src_path.display()))?;
        let html = match md.render_bytes(&bytes) {
            Ok(html) => html,
            Err(e) => {
                report.warnings.push(format!("{}: {}", src_path.display(), e));
                continue;
            }
        };

        let status = write_if_changed(&dest_path, &html, opts.force)?;
        if !opts.quiet && status != FileStatus::Unchanged {
            let label = match status {
                FileStatus::Created => "created".green(),
                _ => "updated".cyan(),
            };
            println!("  {} {} → {}", label, rel_path.display(), dest_path.display());
        }
        match status {
            FileStatus::Created => report.created += 1,
            FileStatus::Updated => report.updated += 1,
            FileStatus::Unchanged => report.unchanged += 1,
        }
    }

    log::debug!(
        "build of {}: {} created, {} updated, {} unchanged",
        opts.source.display(),
        report.created,
        report.updated,
        report.unchanged
    );
    Ok(report)
}

/// Relative paths of all Markdown sources under `dir`, sorted.
fn list_sources(dir: &Path) -> Result<Vec<PathBuf>> {
    if !dir.is_dir() {
        anyhow::bail!("Source directory not found: {}", dir.display());
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(dir).follow_links(true) {
        let entry = entry.with_context(|| format!("Failed to walk {}", dir.display()))?;
        if !entry.file_type().is_file() || !is_source(entry.path()) {
            continue;
        }
        if let Ok(rel) = entry.path().strip_prefix(dir) {
            files.push(rel.to_path_buf());
        }
    }
    files.sort();
    Ok(files)
}

fn is_source(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .is_some_and(|ext| SOURCE_EXTENSIONS.contains(&ext))
}

fn write_if_changed(dest: &Path, html: &str, force: bool) -> Result<FileStatus> {
    let status = if !dest.exists() {
        FileStatus::Created
    } else if !force && file_hash(dest)? == content_hash(html.as_bytes()) {
        return Ok(FileStatus::Unchanged);
    } else {
        FileStatus::Updated
    };

    if let Some(parent) = dest.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }
    fs::write(dest, html).with_context(|| format!("Failed to write {}", dest.display()))?;
    Ok(status)
}

fn content_hash(bytes: &[u8]) -> String {
    let mut hasher = Sha256::new();
    hasher.update(bytes);
    format!("{:x}", hasher.finalize())
}

fn file_hash(path: &Path) -> Result<String> {
    let content = fs::read(path).with_context(|| format!("Failed to read {}", path.display()))?;
    Ok(content_hash(&content))
}

/// Watch the source directory and rebuild on each change.
///
/// Debounces rapid events (e.g. editors that write in stages) with a 200ms window.
/// Ctrl+C exits cleanly.
pub fn watch_and_rebuild(opts: &BuildOpts) -> Result<()> {
    let source = fs::canonicalize(opts.source)
        .with_context(|| format!("Cannot resolve path '{}'", opts.source.display()))?;
    let out = fs::canonicalize(opts.out).unwrap_or_else(|_| opts.out.to_path_buf());

    println!(
        "{} {} for changes (Ctrl+C to stop)",
        "Watching".cyan().bold(),
        opts.source.display()
    );

    let (tx, rx) = mpsc::channel();
    let mut watcher = notify::recommended_watcher(move |res: notify::Result<notify::Event>| {
        if let Ok(event) = res {
            let _ = tx.send(event);
        }
    })?;
    watcher.watch(&source, RecursiveMode::Recursive)?;

    let mut last_rebuild = Instant::now();
    let debounce = Duration::from_millis(200);

    loop {
        match rx.recv_timeout(Duration::from_secs(1)) {
            Ok(event) => {
                let relevant = matches!(
                    event.kind,
                    EventKind::Modify(_) | EventKind::Create(_) | EventKind::Remove(_)
                );
                // writes into an output dir nested under the source must not retrigger
                let touches_source = event
                    .paths
                    .iter()
                    .any(|p| is_source(p) && !p.starts_with(&out));

                if relevant && touches_source && last_rebuild.elapsed() > debounce {
                    // Small delay to let the editor finish writing
                    std::thread::sleep(Duration::from_millis(50));

                    match handle_build(opts) {
                        Ok(report) => {
                            if !opts.quiet {
                                report.print_summary();
                            }
                            last_rebuild = Instant::now();
                        }
                        Err(e) => {
                            eprintln!("{} {:#}", "Build error:".red().bold(), e);
                        }
                    }
                }
            }
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }

    Ok(())
}
