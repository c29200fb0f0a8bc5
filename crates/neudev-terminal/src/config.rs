//! Terminal configuration.

use anyhow::Result;
use neudev_core::{ErrorClassifier, SessionConfig, DEFAULT_TERMINATION_MARKER};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default = "default_backend_url")]
    pub backend_url: String,
    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,
    #[serde(default = "default_termination_marker")]
    pub termination_marker: String,
    #[serde(default)]
    pub classifier: ErrorClassifier,
}

fn default_backend_url() -> String {
    "wss://neudevcompiler-production.up.railway.app".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_termination_marker() -> String {
    DEFAULT_TERMINATION_MARKER.to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            backend_url: default_backend_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            termination_marker: default_termination_marker(),
            classifier: ErrorClassifier::default(),
        }
    }
}

impl Config {
    /// Load config from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load config from config/default.toml, then the user config directory,
    /// or fall back to defaults.
    pub fn load() -> Result<Self> {
        for path in Self::search_paths() {
            if path.exists() {
                return Self::load_from(&path);
            }
        }
        Ok(Config::default())
    }

    fn search_paths() -> Vec<PathBuf> {
        let mut paths = vec![PathBuf::from("config/default.toml")];
        if let Some(dir) = dirs::config_dir() {
            paths.push(dir.join("neudev").join("terminal.toml"));
        }
        paths
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn session_config(&self) -> SessionConfig {
        SessionConfig {
            classifier: self.classifier.clone(),
            termination_marker: self.termination_marker.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_defaults() {
        let config = Config::default();
        assert!(config.backend_url.starts_with("wss://"));
        assert_eq!(config.connect_timeout(), Duration::from_secs(10));
        assert_eq!(config.termination_marker, ">>> Program Terminated");
    }

    #[test]
    fn test_load_partial_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
backend_url = "ws://localhost:9000"

[classifier]
fragment_markers = ["Traceback", "panicked at"]
"#
        )
        .unwrap();

        let config = Config::load_from(file.path()).unwrap();
        assert_eq!(config.backend_url, "ws://localhost:9000");
        assert_eq!(config.connect_timeout_secs, 10);
        assert_eq!(
            config.classifier.fragment_markers,
            vec!["Traceback", "panicked at"]
        );
        assert_eq!(
            config.classifier.transcript_markers,
            ErrorClassifier::default().transcript_markers
        );
        assert_eq!(
            config.session_config().termination_marker,
            DEFAULT_TERMINATION_MARKER
        );
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "backend_url = ").unwrap();
        assert!(Config::load_from(file.path()).is_err());
    }
}
