//! Configuration for the APM tracker.

use crate::core::DEFAULT_CAPACITY;
use serde::{Deserialize, Serialize};
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration for the tracker.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Maximum number of events kept in memory and on disk
    pub capacity: usize,

    /// Binary data file the event history is persisted to
    pub data_file: PathBuf,

    /// How often the event history is written to disk
    #[serde(with = "duration_serde")]
    pub save_interval: Duration,

    /// How often APM statistics are logged
    #[serde(with = "duration_serde")]
    pub stats_interval: Duration,

    /// How often the foreground status line is refreshed
    #[serde(with = "duration_serde")]
    pub display_interval: Duration,

    /// Which input sources count as activity
    pub sources: SourceConfig,

    /// Append log output here instead of stderr
    pub log_file: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        let data_dir = dirs::data_local_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("apm-tracker");

        Self {
            capacity: DEFAULT_CAPACITY,
            data_file: data_dir.join("apm_data.bin"),
            save_interval: Duration::from_secs(300), // 5 minutes
            stats_interval: Duration::from_secs(3600),
            display_interval: Duration::from_secs(1),
            sources: SourceConfig::default(),
            log_file: None,
        }
    }
}

impl Config {
    /// Load configuration from the default location.
    pub fn load() -> Result<Self, ConfigError> {
        Self::load_from(&Self::config_path())
    }

    /// Load configuration from `path`, falling back to defaults if it does not exist.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            let content =
                std::fs::read_to_string(path).map_err(|e| ConfigError::IoError(e.to_string()))?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| ConfigError::ParseError(e.to_string()))?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    /// Get the path to the configuration file.
    pub fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("apm-tracker")
            .join("config.json")
    }

    /// Check that every value is usable.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid("capacity must be at least 1".into()));
        }
        if u32::try_from(self.capacity).is_err() {
            return Err(ConfigError::Invalid(format!(
                "capacity {} exceeds the data file limit of {}",
                self.capacity,
                u32::MAX
            )));
        }
        for (name, interval) in [
            ("save_interval", self.save_interval),
            ("stats_interval", self.stats_interval),
            ("display_interval", self.display_interval),
        ] {
            if interval.is_zero() {
                return Err(ConfigError::Invalid(format!("{name} must be non-zero")));
            }
        }
        if !self.sources.any_enabled() {
            return Err(ConfigError::Invalid(
                "at least one source must be enabled (keyboard or mouse)".into(),
            ));
        }
        Ok(())
    }

    /// Capacity as a validated non-zero value.
    pub fn store_capacity(&self) -> Result<NonZeroUsize, ConfigError> {
        NonZeroUsize::new(self.capacity)
            .ok_or_else(|| ConfigError::Invalid("capacity must be at least 1".into()))
    }
}

/// Configuration for which input sources to capture.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub keyboard: bool,
    pub mouse: bool,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            keyboard: true,
            mouse: true,
        }
    }
}

impl SourceConfig {
    /// Parse source configuration from a comma-separated string.
    pub fn from_csv(s: &str) -> Self {
        let sources: Vec<String> = s.split(',').map(|s| s.trim().to_lowercase()).collect();

        Self {
            keyboard: sources.iter().any(|s| s == "keyboard" || s == "all"),
            mouse: sources.iter().any(|s| s == "mouse" || s == "all"),
        }
    }

    /// Check if at least one source is enabled.
    pub fn any_enabled(&self) -> bool {
        self.keyboard || self.mouse
    }
}

/// Configuration errors.
#[derive(Debug)]
pub enum ConfigError {
    IoError(String),
    ParseError(String),
    Invalid(String),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::IoError(e) => write!(f, "IO error: {e}"),
            ConfigError::ParseError(e) => write!(f, "Parse error: {e}"),
            ConfigError::Invalid(e) => write!(f, "Invalid configuration: {e}"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// Serde support for Duration.
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        duration.as_secs().serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let secs = u64::deserialize(deserializer)?;
        Ok(Duration::from_secs(secs))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_source_config_parsing() {
        let config = SourceConfig::from_csv("keyboard,mouse");
        assert!(config.keyboard);
        assert!(config.mouse);

        let config = SourceConfig::from_csv("Keyboard");
        assert!(config.keyboard);
        assert!(!config.mouse);

        let config = SourceConfig::from_csv("all");
        assert!(config.keyboard);
        assert!(config.mouse);

        assert!(!SourceConfig::from_csv("touchpad").any_enabled());
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.capacity, 604_800);
        assert_eq!(config.save_interval, Duration::from_secs(300));
        assert_eq!(config.stats_interval, Duration::from_secs(3600));
        assert!(config.data_file.ends_with("apm-tracker/apm_data.bin"));
        assert!(config.log_file.is_none());
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let config = Config {
            capacity: 0,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
        assert!(config.store_capacity().is_err());

        let config = Config {
            save_interval: Duration::ZERO,
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config = Config {
            sources: SourceConfig {
                keyboard: false,
                mouse: false,
            },
            ..Config::default()
        };
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: Config =
            serde_json::from_str(r#"{"capacity": 10, "save_interval": 60}"#).unwrap();
        assert_eq!(config.capacity, 10);
        assert_eq!(config.save_interval, Duration::from_secs(60));
        assert_eq!(config.stats_interval, Duration::from_secs(3600));
        assert!(config.sources.keyboard);
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");

        std::fs::write(&path, r#"{"capacity": 50, "sources": {"keyboard": true, "mouse": false}}"#)
            .unwrap();
        let config = Config::load_from(&path).unwrap();
        assert_eq!(config.capacity, 50);
        assert!(!config.sources.mouse);

        std::fs::write(&path, r#"{"capacity": 0}"#).unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::Invalid(_))));

        std::fs::write(&path, "not json").unwrap();
        assert!(matches!(Config::load_from(&path), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config::load_from(&dir.path().join("absent.json")).unwrap();
        assert_eq!(config.capacity, DEFAULT_CAPACITY);
    }
}
