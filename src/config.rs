use anyhow::{Context, Result};
use downpour::{DEFAULT_MAX_NESTING, Extensions, RenderFlags};
use serde::Deserialize;
use std::path::{Path, PathBuf};

pub const CONFIG_FILE: &str = "downpour.json";

/// Top-level downpour.json schema.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DownpourConfig {
    /// Parser extension names, e.g. `"tables"` or `"fenced-code"`.
    #[serde(default)]
    pub extensions: Vec<String>,

    /// HTML render flag names, e.g. `"hard-wrap"` or `"smartypants"`.
    #[serde(default)]
    pub render: Vec<String>,

    #[serde(default = "default_max_nesting")]
    pub max_nesting: usize,
}

fn default_max_nesting() -> usize {
    DEFAULT_MAX_NESTING
}

impl Default for DownpourConfig {
    fn default() -> Self {
        Self {
            extensions: Vec::new(),
            render: Vec::new(),
            max_nesting: default_max_nesting(),
        }
    }
}

/// Resolved pipeline settings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Options {
    pub extensions: Extensions,
    pub render: RenderFlags,
    pub max_nesting: usize,
}

impl DownpourConfig {
    /// Combine the configured names with those given on the command line.
    pub fn resolve(&self, extra_extensions: &[String], extra_flags: &[String]) -> Result<Options> {
        let extensions = Extensions::from_names(self.extensions.iter().chain(extra_extensions))?;
        let render = RenderFlags::from_names(self.render.iter().chain(extra_flags))?;
        Ok(Options {
            extensions,
            render,
            max_nesting: self.max_nesting,
        })
    }
}

/// Load the config from `explicit`, or from downpour.json in `dir` when it
/// exists. Missing files yield defaults; an explicit path must exist.
pub fn load_config(explicit: Option<&Path>, dir: &Path) -> Result<DownpourConfig> {
    let config_path: PathBuf = match explicit {
        Some(path) => path.to_path_buf(),
        None => {
            let candidate = dir.join(CONFIG_FILE);
            if !candidate.exists() {
                return Ok(DownpourConfig::default());
            }
            candidate
        }
    };

    let raw = std::fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read {}", config_path.display()))?;
    let config: DownpourConfig = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse {}", config_path.display()))?;
    log::debug!("loaded {} from {}", CONFIG_FILE, config_path.display());
    Ok(config)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_full_config() {
        let json = r#"{
            "extensions": ["tables", "fenced-code", "FOOTNOTES"],
            "render": ["hard-wrap", "smartypants"],
            "maxNesting": 8
        }"#;

        let config: DownpourConfig = serde_json::from_str(json).unwrap();
        assert_eq!(config.extensions.len(), 3);
        assert_eq!(config.max_nesting, 8);

        let options = config.resolve(&[], &[]).unwrap();
        assert_eq!(
            options.extensions,
            Extensions::TABLES | Extensions::FENCED_CODE | Extensions::FOOTNOTES
        );
        assert_eq!(options.render, RenderFlags::HARD_WRAP | RenderFlags::SMARTYPANTS);
        assert_eq!(options.max_nesting, 8);
    }

    #[test]
    fn test_defaults() {
        let config: DownpourConfig = serde_json::from_str("{}").unwrap();
        assert!(config.extensions.is_empty());
        assert!(config.render.is_empty());
        assert_eq!(config.max_nesting, DEFAULT_MAX_NESTING);
    }

    #[test]
    fn test_command_line_names_add_to_config() {
        let config = DownpourConfig {
            extensions: vec!["tables".to_string()],
            ..Default::default()
        };
        let options = config
            .resolve(&["autolink".to_string()], &["xhtml".to_string()])
            .unwrap();
        assert_eq!(options.extensions, Extensions::TABLES | Extensions::AUTOLINK);
        assert_eq!(options.render, RenderFlags::USE_XHTML);
    }

    #[test]
    fn test_unknown_name_is_an_error() {
        let config = DownpourConfig::default();
        let err = config.resolve(&["nope".to_string()], &[]).unwrap_err();
        assert!(err.to_string().contains("nope"), "got {err}");
    }

    #[test]
    fn test_missing_file_yields_defaults() {
        let dir = std::env::temp_dir().join("downpour-config-test-missing");
        let _ = std::fs::create_dir_all(&dir);
        let _ = std::fs::remove_file(dir.join(CONFIG_FILE));
        let config = load_config(None, &dir).unwrap();
        assert_eq!(config.max_nesting, DEFAULT_MAX_NESTING);

        assert!(load_config(Some(&dir.join("absent.json")), &dir).is_err());
    }
}
