//! Per-medication stock reports: stock, consumption, runway and status.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::{days_remaining, StockLedger};
use crate::access;
use crate::alerts::{classify_status, ThresholdResolver};
use crate::consumption::PosologyAggregator;
use crate::error::EngineResult;
use crate::models::{Medication, StockStatus, Thresholds};

/// Derived stock state of one medication.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StockReport {
    pub medication_id: String,
    pub medication_name: String,
    pub current_stock: Decimal,
    pub total_daily_consumption: Decimal,
    pub days_remaining: i64,
    pub status: StockStatus,
}

impl<'a> StockLedger<'a> {
    /// Report for one medication the user can access, classified against
    /// the user's thresholds.
    pub fn report(&self, user_id: &str, medication_id: &str) -> EngineResult<StockReport> {
        let medication = access::accessible_medication(self.db, user_id, medication_id)?;
        let thresholds = ThresholdResolver::with_config(self.db, &self.config).get_thresholds(user_id)?;
        self.build_report(medication, thresholds)
    }

    /// Reports for every medication the user can access, most urgent first.
    pub fn reports_for_user(&self, user_id: &str) -> EngineResult<Vec<StockReport>> {
        let thresholds = ThresholdResolver::with_config(self.db, &self.config).get_thresholds(user_id)?;

        let mut reports = self
            .db
            .list_accessible_medications(user_id)?
            .into_iter()
            .map(|medication| self.build_report(medication, thresholds))
            .collect::<EngineResult<Vec<_>>>()?;

        reports.sort_by(|a, b| {
            a.days_remaining
                .cmp(&b.days_remaining)
                .then_with(|| a.medication_name.cmp(&b.medication_name))
        });
        Ok(reports)
    }

    fn build_report(&self, medication: Medication, thresholds: Thresholds) -> EngineResult<StockReport> {
        let current_stock = self.current_stock(&medication.id)?;
        let total_daily_consumption =
            PosologyAggregator::new(self.db).total_daily_consumption(&medication.id)?;
        let days = days_remaining(current_stock, total_daily_consumption);
        let status = classify_status(days, thresholds.critical, thresholds.low);

        debug!(medication_id = %medication.id, days, ?status, "Stock report built");
        Ok(StockReport {
            medication_id: medication.id,
            medication_name: medication.name,
            current_stock,
            total_daily_consumption,
            days_remaining: days,
            status,
        })
    }
}
