//! Configuration settings and validation.

use crate::{Error, Result};
use std::path::PathBuf;
use std::time::Duration;

/// Default quiet window for collapsing bursts of change events.
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(50);

/// File looked up in the working directory when no root is given.
pub const DEFAULT_FILE_NAME: &str = "confwatch.conf";

/// Upper bound for the quiet window.
const MAX_DEBOUNCE: Duration = Duration::from_secs(10);

/// Settings for configuration change watching.
#[derive(Debug, Clone)]
pub struct Config {
    /// Whether configuration files are watched at all.
    pub watch_enabled: bool,

    /// Explicit root configuration file.
    pub root: Option<PathBuf>,

    /// Root file name searched in the working directory when `root` is unset.
    pub default_file_name: String,

    /// Quiet window measured from the first change of a burst.
    pub debounce: Duration,

    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON.
    pub log_json: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            watch_enabled: false,
            root: None,
            default_file_name: DEFAULT_FILE_NAME.to_string(),
            debounce: DEFAULT_DEBOUNCE,
            log_level: "info".to_string(),
            log_json: false,
        }
    }
}

impl Config {
    /// Create a new configuration with defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration value is invalid.
    pub fn validate(&self) -> Result<()> {
        if self.debounce.is_zero() {
            return Err(Error::config("debounce cannot be 0"));
        }

        if self.debounce > MAX_DEBOUNCE {
            return Err(Error::config(format!(
                "debounce cannot exceed {}ms",
                MAX_DEBOUNCE.as_millis()
            )));
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.log_level.to_lowercase().as_str()) {
            return Err(Error::config(format!(
                "invalid log level '{}', must be one of: {}",
                self.log_level,
                valid_levels.join(", ")
            )));
        }

        if self.default_file_name.is_empty() {
            return Err(Error::config("default_file_name cannot be empty"));
        }

        if self
            .root
            .as_ref()
            .is_some_and(|root| root.as_os_str().is_empty())
        {
            return Err(Error::config("root path cannot be empty"));
        }

        Ok(())
    }

    /// Resolve the root configuration file.
    ///
    /// Returns the explicit root if one is set, otherwise the default file in
    /// the working directory if it exists, otherwise `None`.
    #[must_use]
    pub fn root_path(&self) -> Option<PathBuf> {
        if let Some(root) = &self.root {
            return Some(root.clone());
        }

        let fallback = PathBuf::from(&self.default_file_name);
        fallback.is_file().then_some(fallback)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.watch_enabled);
        assert_eq!(config.debounce, Duration::from_millis(50));
        assert_eq!(config.default_file_name, "confwatch.conf");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_zero_debounce() {
        let config = Config {
            debounce: Duration::ZERO,
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("debounce"));
    }

    #[test]
    fn test_validate_debounce_too_long() {
        let config = Config {
            debounce: Duration::from_secs(60),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("10000ms"));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let config = Config {
            log_level: "loud".to_string(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("log level"));
    }

    #[test]
    fn test_log_level_case_insensitive() {
        for level in ["TRACE", "Debug", "INFO", "Warn", "ERROR"] {
            let config = Config {
                log_level: level.to_string(),
                ..Default::default()
            };
            assert!(
                config.validate().is_ok(),
                "Level '{level}' should be valid (case insensitive)"
            );
        }
    }

    #[test]
    fn test_validate_empty_default_file_name() {
        let config = Config {
            default_file_name: String::new(),
            ..Default::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("default_file_name"));
    }

    #[test]
    fn test_validate_empty_root() {
        let config = Config {
            root: Some(PathBuf::new()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_root_path_prefers_explicit_root() {
        let config = Config {
            root: Some(PathBuf::from("/etc/app/app.conf")),
            ..Default::default()
        };
        assert_eq!(config.root_path(), Some(PathBuf::from("/etc/app/app.conf")));
    }

    #[test]
    fn test_root_path_missing_default() {
        let config = Config {
            default_file_name: "definitely-not-here-7f3a.conf".to_string(),
            ..Default::default()
        };
        assert_eq!(config.root_path(), None);
    }
}
