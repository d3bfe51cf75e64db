//! Runtime configuration.
//!
//! Configuration is a TOML file; every field is optional and falls back to
//! the defaults below.
//!
//! ```toml
//! command_prefix = "!"
//! tag_marker = "#"
//! max_download_bytes = 8388608
//! fetch_timeout_secs = 30
//! max_input_bytes = 33554432
//! log_level = "info"
//! ```

use crate::core::error::ConfigError;
use crate::parser::ParserOptions;
use crate::pipeline::ExecutionOptions;
use crate::source::{DEFAULT_FETCH_TIMEOUT, DEFAULT_MAX_DOWNLOAD_BYTES};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Environment variable naming a config file.
pub const CONFIG_ENV: &str = "IMAGER_CONFIG";

/// Environment variable overriding the log level.
pub const LOG_ENV: &str = "IMAGER_LOG";

/// Imager configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ImagerConfig {
    /// Prefix of chat commands, used in help hints.
    pub command_prefix: String,
    /// Marker that turns a token into a tag.
    pub tag_marker: char,
    /// Largest attachment accepted from any source.
    pub max_download_bytes: usize,
    /// Network timeout for attachment downloads.
    pub fetch_timeout_secs: u64,
    /// Decoded pixel budget for the fetched image.
    pub max_input_bytes: u64,
    /// Default log filter.
    pub log_level: String,
}

impl Default for ImagerConfig {
    fn default() -> Self {
        Self {
            command_prefix: "!".to_string(),
            tag_marker: '#',
            max_download_bytes: DEFAULT_MAX_DOWNLOAD_BYTES,
            fetch_timeout_secs: DEFAULT_FETCH_TIMEOUT.as_secs(),
            max_input_bytes: 32 * 1024 * 1024,
            log_level: "info".to_string(),
        }
    }
}

impl ImagerConfig {
    /// Load configuration from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|error| ConfigError::Io {
            path: path.display().to_string(),
            error,
        })?;
        Self::from_toml(&text)
    }

    /// Parse configuration from TOML text.
    pub fn from_toml(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Load from `IMAGER_CONFIG` when set, else use defaults; `IMAGER_LOG`
    /// then overrides the log level.
    pub fn from_env_or_default() -> Result<Self, ConfigError> {
        let mut config = match std::env::var_os(CONFIG_ENV) {
            Some(path) => Self::load(path)?,
            None => Self::default(),
        };
        if let Ok(level) = std::env::var(LOG_ENV) {
            if !level.trim().is_empty() {
                config.log_level = level;
            }
        }
        Ok(config)
    }

    /// Parser options derived from this configuration.
    pub fn parser_options(&self) -> ParserOptions {
        ParserOptions {
            tag_marker: self.tag_marker,
        }
    }

    /// Executor options derived from this configuration.
    pub fn execution_options(&self) -> ExecutionOptions {
        ExecutionOptions::new().with_max_input_bytes(self.max_input_bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "command_prefix = \"?\"\ntag_marker = \"+\"\nfetch_timeout_secs = 5").unwrap();

        let config = ImagerConfig::load(file.path()).unwrap();
        assert_eq!(config.command_prefix, "?");
        assert_eq!(config.tag_marker, '+');
        assert_eq!(config.fetch_timeout_secs, 5);
        assert_eq!(config.max_download_bytes, DEFAULT_MAX_DOWNLOAD_BYTES);
        assert_eq!(config.log_level, "info");
        assert_eq!(config.parser_options().tag_marker, '+');
    }

    #[test]
    fn test_errors() {
        assert!(matches!(
            ImagerConfig::load("/definitely/not/here.toml"),
            Err(ConfigError::Io { .. })
        ));
        assert!(matches!(
            ImagerConfig::from_toml("max_input_bytes = \"lots\""),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_empty_file_is_default() {
        assert_eq!(ImagerConfig::from_toml("").unwrap(), ImagerConfig::default());
    }
}
