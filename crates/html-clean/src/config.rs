use serde::Deserialize;
use std::path::{Path, PathBuf};

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Policy document; the bundled baseline is used when unset.
    #[serde(default)]
    pub policy_file: Option<PathBuf>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub backend: BackendConfig,
}

#[derive(Debug, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Deserialize)]
pub struct BackendConfig {
    /// Reject markup that leaves the parser in an ambiguous state.
    #[serde(default = "default_true")]
    pub strict: bool,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            strict: default_true(),
        }
    }
}

// ---------------------------------------------------------------------------
// Default-value functions used by serde
// ---------------------------------------------------------------------------

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_true() -> bool {
    true
}

// ---------------------------------------------------------------------------
// Loader
// ---------------------------------------------------------------------------

/// Load configuration from a YAML file.
///
/// Returns `Ok(None)` when the file does not exist.  Nothing is logged here
/// because the subscriber is configured from the result; the caller reports
/// the fallback once tracing is up.
pub fn load(path: &Path) -> anyhow::Result<Option<Config>> {
    if !path.exists() {
        return Ok(None);
    }

    let contents = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

    parse(&contents)
        .map(Some)
        .map_err(|e| anyhow::anyhow!("failed to parse config file {}: {e}", path.display()))
}

fn parse(contents: &str) -> Result<Config, serde_yml::Error> {
    // An empty file deserializes to YAML null rather than an empty mapping.
    if contents.trim().is_empty() {
        return Ok(Config::default());
    }
    serde_yml::from_str(contents)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults() {
        let cfg = Config::default();
        assert!(cfg.policy_file.is_none());
        assert_eq!(cfg.logging.level, "warn");
        assert_eq!(cfg.logging.format, LogFormat::Text);
        assert!(cfg.backend.strict);
    }

    #[test]
    fn parse_full_config() {
        let cfg = parse(
            r#"
policy_file: policies/strict.yaml
logging:
  level: debug
  format: json
backend:
  strict: false
"#,
        )
        .unwrap();
        assert_eq!(cfg.policy_file, Some(PathBuf::from("policies/strict.yaml")));
        assert_eq!(cfg.logging.level, "debug");
        assert_eq!(cfg.logging.format, LogFormat::Json);
        assert!(!cfg.backend.strict);
    }

    #[test]
    fn parse_partial_config_fills_defaults() {
        let cfg = parse("logging:\n  format: json\n").unwrap();
        assert!(cfg.policy_file.is_none());
        assert_eq!(cfg.logging.level, "warn");
        assert!(cfg.backend.strict);
    }

    #[test]
    fn parse_empty_file() {
        let cfg = parse("").unwrap();
        assert_eq!(cfg.logging.level, "warn");
    }

    #[test]
    fn reject_unknown_log_format() {
        assert!(parse("logging:\n  format: xml\n").is_err());
    }

    #[test]
    fn missing_file_is_reported_as_absent() {
        let loaded = load(Path::new("/does/not/exist/html-clean.yaml")).unwrap();
        assert!(loaded.is_none());
    }

    #[test]
    fn load_reads_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("html-clean.yaml");
        std::fs::write(&path, "backend:\n  strict: false\n").unwrap();
        let cfg = load(&path).unwrap().expect("file exists");
        assert!(!cfg.backend.strict);
    }
}
