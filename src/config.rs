//! Application configuration.
//!
//! Configuration is loaded from a TOML file at:
//! 1. `$MIMESCAN_CONFIG` (environment variable)
//! 2. `~/.config/mimescan/config.toml` (Linux/macOS)
//!    `%APPDATA%\mimescan\config.toml` (Windows)
//! 3. Built-in defaults

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General behavior settings.
    pub general: GeneralConfig,
    /// Structural scanner limits and matching rules.
    pub scanner: ScannerConfig,
}

/// General behavior settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Override cache directory for logs.
    pub cache_dir: Option<PathBuf>,
    /// Log level: "error", "warn", "info", "debug", "trace".
    pub log_level: String,
}

/// Structural scanner settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ScannerConfig {
    /// Bytes requested from the source per read (default: 131072 = 128 KB).
    pub read_buffer_size: usize,
    /// Longest accepted line, terminator excluded (default: 65536 = 64 KB).
    pub max_line_length: usize,
    /// Header bytes buffered for content-type inspection (default: 1 MB).
    pub max_header_size: usize,
    /// Deepest multipart nesting that is split into parts.
    pub max_depth: usize,
    /// Delimiter-line matching rules.
    pub delimiter: DelimiterConfig,
}

/// How multipart delimiter lines are recognized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DelimiterConfig {
    /// Accept spaces and tabs after `--boundary` / `--boundary--`.
    pub allow_trailing_whitespace: bool,
    /// Compare the boundary token byte-for-byte. When false, ASCII case is ignored.
    pub case_sensitive: bool,
}

// ── Default implementations ─────────────────────────────────────

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            cache_dir: None,
            log_level: "warn".to_string(),
        }
    }
}

impl Default for ScannerConfig {
    fn default() -> Self {
        Self {
            read_buffer_size: 128 * 1024, // 128 KB
            max_line_length: 64 * 1024,   // 64 KB
            max_header_size: 1024 * 1024, // 1 MB
            max_depth: 10,
            delimiter: DelimiterConfig::default(),
        }
    }
}

impl Default for DelimiterConfig {
    fn default() -> Self {
        Self {
            allow_trailing_whitespace: true,
            case_sensitive: true,
        }
    }
}

// ── Load / save ─────────────────────────────────────────────────

/// Load configuration, searching standard locations.
///
/// Returns the default configuration if no file is found or on parse error.
pub fn load_config() -> Config {
    if let Some(path) = config_file_path() {
        if path.exists() {
            match std::fs::read_to_string(&path) {
                Ok(contents) => match toml::from_str::<Config>(&contents) {
                    Ok(cfg) => {
                        tracing::info!(path = %path.display(), "Loaded config");
                        return cfg;
                    }
                    Err(e) => {
                        tracing::warn!(
                            path = %path.display(),
                            error = %e,
                            "Failed to parse config, using defaults"
                        );
                    }
                },
                Err(e) => {
                    tracing::warn!(
                        path = %path.display(),
                        error = %e,
                        "Failed to read config file, using defaults"
                    );
                }
            }
        }
    }
    Config::default()
}

/// Save configuration to the standard location. Returns the path written.
pub fn save_config(config: &Config) -> anyhow::Result<PathBuf> {
    let path = config_file_path()
        .ok_or_else(|| anyhow::anyhow!("Could not determine config file path"))?;

    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }

    let contents = toml::to_string_pretty(config)?;
    std::fs::write(&path, contents)?;
    tracing::info!(path = %path.display(), "Saved config");
    Ok(path)
}

/// Determine the config file path (checking env var first, then standard dirs).
pub fn config_file_path() -> Option<PathBuf> {
    if let Ok(env_path) = std::env::var("MIMESCAN_CONFIG") {
        return Some(PathBuf::from(env_path));
    }

    dirs::config_dir().map(|d| d.join("mimescan").join("config.toml"))
}

/// Return the cache directory for logs.
pub fn cache_dir(config: &Config) -> PathBuf {
    if let Some(ref dir) = config.general.cache_dir {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("mimescan")
}

/// Return the log file path.
pub fn log_file_path(config: &Config) -> PathBuf {
    cache_dir(config).join("mimescan.log")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let cfg = Config::default();
        assert_eq!(cfg.general.log_level, "warn");
        assert_eq!(cfg.scanner.max_line_length, 64 * 1024);
        assert_eq!(cfg.scanner.max_depth, 10);
        assert!(cfg.scanner.delimiter.allow_trailing_whitespace);
        assert!(cfg.scanner.delimiter.case_sensitive);
    }

    #[test]
    fn test_serialize_deserialize_roundtrip() {
        let cfg = Config::default();
        let toml_str = toml::to_string_pretty(&cfg).expect("serialize");
        let parsed: Config = toml::from_str(&toml_str).expect("deserialize");
        assert_eq!(parsed.general.log_level, cfg.general.log_level);
        assert_eq!(parsed.scanner, cfg.scanner);
    }

    #[test]
    fn test_partial_config_uses_defaults() {
        let partial = r#"
[scanner]
max_line_length = 998

[scanner.delimiter]
case_sensitive = false
"#;
        let cfg: Config = toml::from_str(partial).expect("parse partial");
        assert_eq!(cfg.scanner.max_line_length, 998);
        assert!(!cfg.scanner.delimiter.case_sensitive);
        // Other fields use defaults
        assert!(cfg.scanner.delimiter.allow_trailing_whitespace);
        assert_eq!(cfg.scanner.read_buffer_size, 128 * 1024);
        assert_eq!(cfg.general.log_level, "warn");
    }

    #[test]
    fn test_log_file_in_cache_dir() {
        let mut cfg = Config::default();
        cfg.general.cache_dir = Some(PathBuf::from("/tmp/mimescan-test"));
        assert_eq!(
            log_file_path(&cfg),
            PathBuf::from("/tmp/mimescan-test/mimescan.log")
        );
    }
}
