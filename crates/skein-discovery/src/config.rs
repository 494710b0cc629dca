//! Configuration for the discovery core.
//!
//! Loaded from TOML. Every field has a default, so an empty file (or a file
//! with only some sections) yields a usable configuration.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;
use tracing_subscriber::EnvFilter;

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the file failed
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The file is not valid TOML for this schema
    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    /// Serializing to TOML failed
    #[error("Serialize error: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// A value is out of range
    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Discovery configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct DiscoveryConfig {
    /// Routing table configuration
    #[serde(default)]
    pub routing: RoutingConfig,
    /// Firewall self-diagnosis configuration
    #[serde(default)]
    pub firewall: FirewallConfig,
    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Routing table configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RoutingConfig {
    /// Node identifier length in bytes
    #[serde(default = "default_id_len")]
    pub id_len: usize,
    /// Bucket capacity (k)
    #[serde(default = "default_bucket_size")]
    pub bucket_size: usize,
}

/// Firewall self-diagnosis configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FirewallConfig {
    /// Number of peers to probe
    #[serde(default = "default_candidate_count")]
    pub candidate_count: usize,
    /// Confirmations required when `candidate_count` peers were probed
    #[serde(default = "default_min_confirmations")]
    pub min_confirmations: usize,
    /// Confirmations required when fewer peers were available
    #[serde(default = "default_min_confirmations_few")]
    pub min_confirmations_few: usize,
    /// Upper bound on the whole probe round, in milliseconds
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level or `EnvFilter` directive, e.g. `info,skein_discovery=debug`
    #[serde(default = "default_log_level")]
    pub level: String,
}

// Default values

fn default_id_len() -> usize {
    32
}

fn default_bucket_size() -> usize {
    crate::dht::K
}

fn default_candidate_count() -> usize {
    5
}

fn default_min_confirmations() -> usize {
    3
}

fn default_min_confirmations_few() -> usize {
    1
}

fn default_probe_timeout_ms() -> u64 {
    5_000
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            id_len: default_id_len(),
            bucket_size: default_bucket_size(),
        }
    }
}

impl Default for FirewallConfig {
    fn default() -> Self {
        Self {
            candidate_count: default_candidate_count(),
            min_confirmations: default_min_confirmations(),
            min_confirmations_few: default_min_confirmations_few(),
            probe_timeout_ms: default_probe_timeout_ms(),
        }
    }
}

impl FirewallConfig {
    /// Probe round timeout
    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl DiscoveryConfig {
    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parse configuration from a TOML string
    ///
    /// # Errors
    ///
    /// Returns an error if the string is not valid configuration.
    pub fn from_toml_str(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Save configuration to file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be written.
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        let contents = toml::to_string_pretty(self)?;

        if let Some(parent) = path.as_ref().parent() {
            fs::create_dir_all(parent)?;
        }

        fs::write(path, contents)?;
        Ok(())
    }

    /// Validate configuration
    ///
    /// # Errors
    ///
    /// Returns an error if configuration is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.routing.id_len == 0 {
            return Err(ConfigError::Invalid("id_len must be at least 1".into()));
        }

        if self.routing.bucket_size == 0 {
            return Err(ConfigError::Invalid(
                "bucket_size must be at least 1".into(),
            ));
        }

        let fw = &self.firewall;
        if fw.candidate_count == 0 {
            return Err(ConfigError::Invalid(
                "candidate_count must be at least 1".into(),
            ));
        }

        if fw.min_confirmations > fw.candidate_count {
            return Err(ConfigError::Invalid(format!(
                "min_confirmations ({}) exceeds candidate_count ({})",
                fw.min_confirmations, fw.candidate_count
            )));
        }

        if fw.min_confirmations_few > fw.min_confirmations {
            return Err(ConfigError::Invalid(format!(
                "min_confirmations_few ({}) exceeds min_confirmations ({})",
                fw.min_confirmations_few, fw.min_confirmations
            )));
        }

        if fw.probe_timeout_ms == 0 {
            return Err(ConfigError::Invalid(
                "probe_timeout_ms must be positive".into(),
            ));
        }

        if let Err(e) = EnvFilter::try_new(&self.logging.level) {
            return Err(ConfigError::Invalid(format!(
                "Invalid log level: {}: {e}",
                self.logging.level
            )));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = DiscoveryConfig::default();
        assert_eq!(config.routing.id_len, 32);
        assert_eq!(config.routing.bucket_size, 20);
        assert_eq!(config.firewall.candidate_count, 5);
        assert_eq!(config.firewall.min_confirmations, 3);
        assert_eq!(config.firewall.min_confirmations_few, 1);
        assert_eq!(config.firewall.probe_timeout(), Duration::from_secs(5));
        assert_eq!(config.logging.level, "info");
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_toml_uses_defaults() {
        let config = DiscoveryConfig::from_toml_str(
            r#"
            [routing]
            bucket_size = 8

            [firewall]
            probe_timeout_ms = 1500
            "#,
        )
        .unwrap();

        assert_eq!(config.routing.bucket_size, 8);
        assert_eq!(config.routing.id_len, 32);
        assert_eq!(config.firewall.probe_timeout(), Duration::from_millis(1500));
        assert_eq!(config.firewall.candidate_count, 5);
        assert_eq!(config.logging, LoggingConfig::default());
    }

    #[test]
    fn test_empty_toml() {
        let config = DiscoveryConfig::from_toml_str("").unwrap();
        assert_eq!(config, DiscoveryConfig::default());
    }

    #[test]
    fn test_invalid_toml() {
        let err = DiscoveryConfig::from_toml_str("[routing]\nbucket_size = \"many\"").unwrap_err();
        assert!(matches!(err, ConfigError::Parse(_)));
    }

    #[test]
    fn test_config_validation() {
        let mut config = DiscoveryConfig::default();
        config.routing.bucket_size = 0;
        assert!(config.validate().is_err());

        let mut config = DiscoveryConfig::default();
        config.firewall.min_confirmations = 6;
        assert!(config.validate().is_err());

        let mut config = DiscoveryConfig::default();
        config.firewall.min_confirmations_few = 4;
        assert!(config.validate().is_err());

        let mut config = DiscoveryConfig::default();
        config.logging.level = "skein_discovery=loud".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_log_directives_accepted() {
        for level in ["warn", "debug", "skein_discovery=debug", "info,skein_discovery::nat=trace"] {
            let mut config = DiscoveryConfig::default();
            config.logging.level = level.to_string();
            assert!(config.validate().is_ok(), "{level} rejected");
        }
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/skein.toml");

        let mut config = DiscoveryConfig::default();
        config.routing.bucket_size = 16;
        config.logging.level = "debug".to_string();
        config.save(&path).unwrap();

        let loaded = DiscoveryConfig::load(&path).unwrap();
        assert_eq!(loaded, config);
    }

    #[test]
    fn test_load_missing_file() {
        let err = DiscoveryConfig::load("/nonexistent/skein.toml").unwrap_err();
        assert!(matches!(err, ConfigError::Io(_)));
    }
}
