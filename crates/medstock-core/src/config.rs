//! Engine configuration.
//!
//! Loaded from JSON; every field has a default so an empty object is a
//! valid configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::models::{Thresholds, DEFAULT_CRITICAL_DAYS, DEFAULT_LOW_DAYS};

/// Configuration errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

/// What to do when an outgoing movement exceeds current stock.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum NegativeStockPolicy {
    /// Refuse the movement.
    #[default]
    Reject,
    /// Record it and let stock go negative.
    Allow,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Critical threshold given to users without settings.
    pub default_critical_days: i64,
    /// Low threshold given to users without settings.
    pub default_low_days: i64,
    /// Source label of the movement written for a medication's initial stock.
    pub initial_stock_source: String,
    pub negative_stock: NegativeStockPolicy,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            default_critical_days: DEFAULT_CRITICAL_DAYS,
            default_low_days: DEFAULT_LOW_DAYS,
            initial_stock_source: "Initial Stock".to_string(),
            negative_stock: NegativeStockPolicy::Reject,
        }
    }
}

impl EngineConfig {
    /// Parse and validate a JSON configuration.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let config: EngineConfig = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Read, parse and validate a JSON configuration file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_json_str(&contents)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_critical_days < 0 {
            return Err(ConfigError::Invalid(
                "default_critical_days must not be negative".into(),
            ));
        }
        if self.default_low_days < self.default_critical_days {
            return Err(ConfigError::Invalid(format!(
                "default_low_days ({}) must be at least default_critical_days ({})",
                self.default_low_days, self.default_critical_days
            )));
        }
        if self.initial_stock_source.trim().is_empty() {
            return Err(ConfigError::Invalid("initial_stock_source must not be empty".into()));
        }
        Ok(())
    }

    pub fn default_thresholds(&self) -> Thresholds {
        Thresholds {
            critical: self.default_critical_days,
            low: self.default_low_days,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_gives_defaults() {
        let config = EngineConfig::from_json_str("{}").unwrap();
        assert_eq!(config, EngineConfig::default());
        assert_eq!(config.default_thresholds(), Thresholds { critical: 3, low: 7 });
    }

    #[test]
    fn test_partial_override() {
        let config =
            EngineConfig::from_json_str(r#"{"default_low_days": 10, "negative_stock": "allow"}"#)
                .unwrap();
        assert_eq!(config.default_critical_days, 3);
        assert_eq!(config.default_low_days, 10);
        assert_eq!(config.negative_stock, NegativeStockPolicy::Allow);
    }

    #[test]
    fn test_rejects_inverted_thresholds() {
        let result = EngineConfig::from_json_str(r#"{"default_critical_days": 9}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_blank_label() {
        let result = EngineConfig::from_json_str(r#"{"initial_stock_source": "  "}"#);
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("medstock.json");
        std::fs::write(&path, r#"{"default_critical_days": 2}"#).unwrap();

        let config = EngineConfig::load(&path).unwrap();
        assert_eq!(config.default_critical_days, 2);

        assert!(matches!(
            EngineConfig::load(dir.path().join("missing.json")),
            Err(ConfigError::Io(_))
        ));
    }
}
