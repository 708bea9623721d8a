//! Which alert condition holds for a user right now.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::ThresholdResolver;
use crate::config::EngineConfig;
use crate::db::Database;
use crate::error::EngineResult;
use crate::ledger::StockLedger;
use crate::models::{NotificationChannel, StockStatus};

/// Alert conditions the engine can raise.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AlertKind {
    CriticalStock,
    LowStock,
    ReplenishmentRequest,
}

/// An alert condition that holds and is enabled, with where it should go.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Alert {
    pub kind: AlertKind,
    pub channels: Vec<NotificationChannel>,
}

pub struct AlertEvaluator<'a> {
    db: &'a Database,
    config: EngineConfig,
}

impl<'a> AlertEvaluator<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self::with_config(db, EngineConfig::default())
    }

    pub fn with_config(db: &'a Database, config: EngineConfig) -> Self {
        Self { db, config }
    }

    /// The stock alert for a medication as seen by `user_id`, if one holds
    /// and the user has it enabled.
    pub fn stock_alert(&self, user_id: &str, medication_id: &str) -> EngineResult<Option<Alert>> {
        let report = StockLedger::with_config(self.db, self.config.clone()).report(user_id, medication_id)?;
        let settings = ThresholdResolver::with_config(self.db, &self.config).ensure_settings(user_id)?;

        let (kind, preference) = match report.status {
            StockStatus::Critical => (AlertKind::CriticalStock, &settings.critical_stock),
            StockStatus::Warning => (AlertKind::LowStock, &settings.low_stock),
            StockStatus::Ok => return Ok(None),
        };

        if !preference.enabled {
            debug!(user_id, medication_id, ?kind, "Stock alert suppressed by settings");
            return Ok(None);
        }

        Ok(Some(Alert {
            kind,
            channels: preference.channels.clone(),
        }))
    }

    /// Whether `time` falls inside the user's enabled quiet hours.
    pub fn is_quiet_time(&self, user_id: &str, time: NaiveTime) -> EngineResult<bool> {
        let settings = ThresholdResolver::with_config(self.db, &self.config).ensure_settings(user_id)?;
        Ok(settings.is_quiet_at(time))
    }

    /// The alert an owner gets for a new replenishment request, if enabled.
    pub fn replenishment_alert(&self, owner_id: &str) -> EngineResult<Option<Alert>> {
        let settings = ThresholdResolver::with_config(self.db, &self.config).ensure_settings(owner_id)?;
        let preference = settings.replenishment_request;
        Ok(preference.enabled.then_some(Alert {
            kind: AlertKind::ReplenishmentRequest,
            channels: preference.channels,
        }))
    }
}
