//! Configuration file
//!
//! Optional JSON file with executor limits and the logging threshold:
//!
//! ```json
//! { "log_level": "warn", "max_rows": 1000, "default_timeout_ms": 500 }
//! ```
//!
//! Every field has a default. Validation is strict: a config that fails
//! validation is never applied.

mod errors;

use std::fs;
use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::executor::ExecutorConfig;
use crate::observability::{log_event_with_fields, Event, Logger, Severity};

pub use errors::{ConfigError, ConfigResult};

/// Configuration file structure
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct AeroQueryConfig {
    /// Minimum severity written to the log (optional, default "info")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Largest result a single fetch may return (optional, unlimited)
    #[serde(default)]
    pub max_rows: Option<usize>,

    /// Deadline applied to executions without their own (optional, none)
    #[serde(default)]
    pub default_timeout_ms: Option<u64>,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for AeroQueryConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            max_rows: None,
            default_timeout_ms: None,
        }
    }
}

impl AeroQueryConfig {
    /// Load configuration from file
    pub fn load(path: &Path) -> ConfigResult<Self> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;

        let config = Self::from_json_str(&content)?;

        let source = path.display().to_string();
        log_event_with_fields(
            Event::ConfigLoaded,
            &[("path", source.as_str()), ("log_level", config.log_level.as_str())],
        );
        Ok(config)
    }

    /// Load from file if given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> ConfigResult<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    pub fn from_json_str(json: &str) -> ConfigResult<Self> {
        let config: AeroQueryConfig =
            serde_json::from_str(json).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> ConfigResult<()> {
        self.severity()?;

        if self.max_rows == Some(0) {
            return Err(ConfigError::Invalid("max_rows must be > 0".into()));
        }

        if self.default_timeout_ms == Some(0) {
            return Err(ConfigError::Invalid("default_timeout_ms must be > 0".into()));
        }

        Ok(())
    }

    /// Parsed `log_level`
    pub fn severity(&self) -> ConfigResult<Severity> {
        Severity::parse(&self.log_level).ok_or_else(|| {
            ConfigError::Invalid(format!(
                "Invalid log_level: '{}'. Must be one of trace, info, warn, error, fatal.",
                self.log_level
            ))
        })
    }

    /// Sets the process-wide logging threshold
    pub fn apply_log_level(&self) -> ConfigResult<()> {
        Logger::set_min_severity(self.severity()?);
        Ok(())
    }

    pub fn to_executor_config(&self) -> ExecutorConfig {
        ExecutorConfig {
            max_rows: self.max_rows,
            default_timeout: self.default_timeout_ms.map(Duration::from_millis),
        }
    }
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use tempfile::NamedTempFile;

    use super::*;

    fn write_config(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(json.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_defaults() {
        let config = AeroQueryConfig::from_json_str("{}").unwrap();
        assert_eq!(config, AeroQueryConfig::default());
        assert_eq!(config.severity().unwrap(), Severity::Info);
        assert_eq!(config.to_executor_config(), ExecutorConfig::default());
    }

    #[test]
    fn test_load_from_file() {
        let file = write_config(r#"{"log_level": "warn", "max_rows": 10, "default_timeout_ms": 250}"#);
        let config = AeroQueryConfig::load(file.path()).unwrap();

        assert_eq!(config.severity().unwrap(), Severity::Warn);
        let executor = config.to_executor_config();
        assert_eq!(executor.max_rows, Some(10));
        assert_eq!(executor.default_timeout, Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = AeroQueryConfig::load(&dir.path().join("absent.json")).unwrap_err();
        assert_eq!(err.code(), "AERO_CONFIG_READ");
    }

    #[test]
    fn test_no_path_means_defaults() {
        let config = AeroQueryConfig::load_or_default(None).unwrap();
        assert_eq!(config, AeroQueryConfig::default());
    }

    #[test]
    fn test_rejects_invalid_values() {
        let err = AeroQueryConfig::from_json_str(r#"{"max_rows": 0}"#).unwrap_err();
        assert_eq!(err.code(), "AERO_CONFIG_INVALID");

        let err = AeroQueryConfig::from_json_str(r#"{"default_timeout_ms": 0}"#).unwrap_err();
        assert_eq!(err.code(), "AERO_CONFIG_INVALID");

        let err = AeroQueryConfig::from_json_str(r#"{"log_level": "verbose"}"#).unwrap_err();
        assert_eq!(err.code(), "AERO_CONFIG_INVALID");
    }

    #[test]
    fn test_rejects_malformed_json() {
        let err = AeroQueryConfig::from_json_str(r#"{"max_rows": "ten"}"#).unwrap_err();
        assert_eq!(err.code(), "AERO_CONFIG_PARSE");

        let err = AeroQueryConfig::from_json_str(r#"{"data_dir": "/tmp"}"#).unwrap_err();
        assert_eq!(err.code(), "AERO_CONFIG_PARSE");
    }
}
