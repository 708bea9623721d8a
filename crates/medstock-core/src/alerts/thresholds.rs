//! Per-user thresholds and the status bands they define.

use chrono::Utc;
use tracing::{debug, info};

use crate::config::EngineConfig;
use crate::db::Database;
use crate::error::{EngineError, EngineResult};
use crate::models::{AlertSettings, StockStatus, Thresholds};

/// Classify days of remaining stock.
///
/// Bounds belong to the stricter band: exactly `critical` days is
/// `Critical`, exactly `low` days is `Warning`.
pub fn classify_status(days_remaining: i64, critical: i64, low: i64) -> StockStatus {
    if days_remaining <= critical {
        StockStatus::Critical
    } else if days_remaining <= low {
        StockStatus::Warning
    } else {
        StockStatus::Ok
    }
}

/// Resolves per-user alert settings, creating defaults on first use.
pub struct ThresholdResolver<'a> {
    db: &'a Database,
    defaults: Thresholds,
}

impl<'a> ThresholdResolver<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self::with_config(db, &EngineConfig::default())
    }

    pub fn with_config(db: &'a Database, config: &EngineConfig) -> Self {
        Self {
            db,
            defaults: config.default_thresholds(),
        }
    }

    /// The user's settings, created with defaults if absent.
    ///
    /// Creation is insert-if-absent keyed by user id, so concurrent first
    /// reads converge on one row.
    pub fn ensure_settings(&self, user_id: &str) -> EngineResult<AlertSettings> {
        let defaults = AlertSettings::with_defaults(user_id.to_string(), self.defaults);
        if self.db.insert_alert_settings_if_absent(&defaults)? {
            info!(user_id, "Default alert settings created");
        }

        self.db
            .get_alert_settings(user_id)?
            .ok_or_else(|| EngineError::not_found("AlertSettings", user_id))
    }

    /// `(critical, low)` for the user.
    pub fn get_thresholds(&self, user_id: &str) -> EngineResult<Thresholds> {
        let thresholds = self.ensure_settings(user_id)?.thresholds;
        debug!(user_id, critical = thresholds.critical, low = thresholds.low, "Thresholds resolved");
        Ok(thresholds)
    }

    /// Replace the user's settings after validating the thresholds.
    pub fn update_alert_settings(&self, user_id: &str, mut settings: AlertSettings) -> EngineResult<AlertSettings> {
        let Thresholds { critical, low } = settings.thresholds;
        if critical < 0 {
            return Err(EngineError::InvalidInput(format!(
                "critical threshold must not be negative (got {})",
                critical
            )));
        }
        if low < critical {
            return Err(EngineError::InvalidInput(format!(
                "low threshold ({}) must be at least the critical threshold ({})",
                low, critical
            )));
        }

        settings.user_id = user_id.to_string();
        settings.updated_at = Utc::now();
        self.db.save_alert_settings(&settings)?;

        info!(user_id, critical, low, "Alert settings updated");
        Ok(settings)
    }

    /// Classify days remaining against the user's thresholds.
    pub fn classify_for_user(&self, user_id: &str, days_remaining: i64) -> EngineResult<StockStatus> {
        let Thresholds { critical, low } = self.get_thresholds(user_id)?;
        Ok(classify_status(days_remaining, critical, low))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_bands() {
        assert_eq!(classify_status(0, 3, 7), StockStatus::Critical);
        assert_eq!(classify_status(3, 3, 7), StockStatus::Critical);
        assert_eq!(classify_status(4, 3, 7), StockStatus::Warning);
        assert_eq!(classify_status(7, 3, 7), StockStatus::Warning);
        assert_eq!(classify_status(8, 3, 7), StockStatus::Ok);
    }

    #[test]
    fn test_classify_equal_thresholds() {
        assert_eq!(classify_status(5, 5, 5), StockStatus::Critical);
        assert_eq!(classify_status(6, 5, 5), StockStatus::Ok);
    }

    #[test]
    fn test_thresholds_created_lazily_once() {
        let db = Database::open_in_memory().unwrap();
        let resolver = ThresholdResolver::new(&db);

        assert!(db.get_alert_settings("user").unwrap().is_none());
        assert_eq!(resolver.get_thresholds("user").unwrap(), Thresholds { critical: 3, low: 7 });
        let first = db.get_alert_settings("user").unwrap().unwrap();

        resolver.get_thresholds("user").unwrap();
        let second = db.get_alert_settings("user").unwrap().unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_configured_defaults() {
        let db = Database::open_in_memory().unwrap();
        let config = EngineConfig {
            default_critical_days: 2,
            default_low_days: 5,
            ..EngineConfig::default()
        };
        let resolver = ThresholdResolver::with_config(&db, &config);
        assert_eq!(resolver.get_thresholds("user").unwrap(), Thresholds { critical: 2, low: 5 });
    }

    #[test]
    fn test_update_alert_settings_validates() {
        let db = Database::open_in_memory().unwrap();
        let resolver = ThresholdResolver::new(&db);
        let mut settings = resolver.ensure_settings("user").unwrap();

        settings.thresholds = Thresholds { critical: 10, low: 4 };
        assert!(matches!(
            resolver.update_alert_settings("user", settings.clone()),
            Err(EngineError::InvalidInput(_))
        ));

        settings.thresholds = Thresholds { critical: 5, low: 14 };
        resolver.update_alert_settings("user", settings).unwrap();
        assert_eq!(resolver.get_thresholds("user").unwrap(), Thresholds { critical: 5, low: 14 });
        assert_eq!(resolver.classify_for_user("user", 10).unwrap(), StockStatus::Warning);
    }

    #[test]
    fn test_update_alert_settings_pins_user() {
        let db = Database::open_in_memory().unwrap();
        let resolver = ThresholdResolver::new(&db);
        let settings = AlertSettings::with_defaults("someone-else".into(), Thresholds::default());

        let saved = resolver.update_alert_settings("user", settings).unwrap();
        assert_eq!(saved.user_id, "user");
        assert!(db.get_alert_settings("someone-else").unwrap().is_none());
    }
}
