//! Medstock Core Library
//!
//! Stock ledger and care scheduling engine for a medication-adherence and
//! caregiving application.
//!
//! # Architecture
//!
//! ```text
//!   Stock entry / Replenishment approval
//!                   │
//!                   ▼
//!   ┌───────────────────────────────┐      ┌─────────────────────────┐
//!   │     Stock Ledger (append)     │◄─────│   Posology Aggregator   │
//!   │  stock = Σ(in) − Σ(out)       │      │  Σ daily consumption    │
//!   └───────────────┬───────────────┘      └─────────────────────────┘
//!                   │ days remaining
//!                   ▼
//!   ┌───────────────────────────────┐
//!   │   Alert Threshold Resolver    │
//!   │  Critical / Warning / Ok      │
//!   └───────────────┬───────────────┘
//!                   │
//!         ┌─────────┴─────────┐
//!         ▼                   ▼
//!     Reports              Alerts
//!
//!   Care Schedule Resolver and Expense Amortizer read the same data.
//! ```
//!
//! # Core Principle
//!
//! **Stock is never stored.** It is recomputed from the movement history on
//! every read.
//!
//! # Modules
//!
//! - [`db`]: SQLite persistence
//! - [`models`]: Domain types (Medication, StockMovement, CaregiverSchedule, etc.)
//! - [`ledger`]: Stock ledger and stock reports
//! - [`consumption`]: Posology aggregation
//! - [`alerts`]: Thresholds, status classification and alert conditions
//! - [`replenishment`]: Replenishment request workflow
//! - [`schedule`]: Caregiver on-duty resolution
//! - [`expense`]: Monthly expense amortization

pub mod access;
pub mod alerts;
pub mod config;
pub mod consumption;
pub mod db;
pub mod error;
pub mod expense;
pub mod ledger;
pub mod models;
pub mod replenishment;
pub mod schedule;

// Re-export commonly used types
pub use alerts::{classify_status, Alert, AlertEvaluator, AlertKind, ThresholdResolver};
pub use config::{ConfigError, EngineConfig, NegativeStockPolicy};
pub use consumption::PosologyAggregator;
pub use db::Database;
pub use error::{EngineError, EngineResult};
pub use expense::{ExpenseAmortizer, MonthlyExpense, YearMonth};
pub use ledger::{NewMovement, StockLedger, StockReport};
pub use models::{
    AlertSettings, Caregiver, CaregiverSchedule, Direction, Medication, MedicationPatientLink,
    Patient, Posology, ReplenishmentRequest, RequestStatus, StockMovement, StockStatus,
    Thresholds, TimeWindow, TreatmentType, Urgency, Weekday,
};
pub use replenishment::ReplenishmentWorkflow;
pub use schedule::{CareScheduleResolver, ScheduleOverlap};

use std::path::Path;
use std::sync::{Arc, Mutex};

use chrono::NaiveTime;
use rust_decimal::Decimal;
use tracing::info;

use access::authenticate;

// =========================================================================
// Factory Functions
// =========================================================================

/// Open or create an engine backed by the database at `path`.
pub fn open_engine<P: AsRef<Path>>(path: P) -> EngineResult<Engine> {
    Engine::open(path)
}

// =========================================================================
// Main API Object
// =========================================================================

/// Thread-safe engine over one database.
///
/// Every operation takes the caller identity handed over by the auth layer;
/// `None` or a blank id fails with [`EngineError::Unauthenticated`].
#[derive(Clone)]
pub struct Engine {
    db: Arc<Mutex<Database>>,
    config: EngineConfig,
}

impl Engine {
    pub fn open<P: AsRef<Path>>(path: P) -> EngineResult<Self> {
        let db = Database::open(path)?;
        Ok(Self::from_database(db))
    }

    /// In-memory engine, mostly for tests.
    pub fn open_in_memory() -> EngineResult<Self> {
        let db = Database::open_in_memory()?;
        Ok(Self::from_database(db))
    }

    pub fn from_database(db: Database) -> Self {
        Self {
            db: Arc::new(Mutex::new(db)),
            config: EngineConfig::default(),
        }
    }

    /// Swap in `config`, refusing one that fails validation.
    pub fn with_config(mut self, config: EngineConfig) -> EngineResult<Self> {
        config.validate()?;
        self.config = config;
        Ok(self)
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    // =========================================================================
    // Patient and Caregiver Operations
    // =========================================================================

    /// Create a patient owned by the caller.
    pub fn create_patient(&self, caller: Option<&str>, name: String) -> EngineResult<Patient> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        let patient = Patient::new(name, user.to_string());
        db.insert_patient(&patient)?;
        info!(patient_id = %patient.id, "Patient created");
        Ok(patient)
    }

    /// Get a patient the caller can access. `None` if it does not exist.
    pub fn get_patient(&self, caller: Option<&str>, patient_id: &str) -> EngineResult<Option<Patient>> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        match access::accessible_patient(&db, user, patient_id) {
            Ok(patient) => Ok(Some(patient)),
            Err(EngineError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    /// Patients the caller owns or is shared into.
    pub fn list_patients(&self, caller: Option<&str>) -> EngineResult<Vec<Patient>> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        Ok(db.list_accessible_patients(user)?)
    }

    /// Delete a patient the caller owns. Links, shares and schedule
    /// memberships cascade.
    pub fn delete_patient(&self, caller: Option<&str>, patient_id: &str) -> EngineResult<()> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        owned_patient(&db, user, patient_id)?;
        db.delete_patient(patient_id)?;
        info!(patient_id, "Patient deleted");
        Ok(())
    }

    /// Give `user_id` shared access to a patient the caller owns.
    pub fn share_patient(&self, caller: Option<&str>, patient_id: &str, user_id: &str) -> EngineResult<()> {
        let owner = authenticate(caller)?;
        let shared_with = authenticate(Some(user_id))?;
        let db = self.db.lock()?;
        owned_patient(&db, owner, patient_id)?;
        db.share_patient(patient_id, shared_with)?;
        info!(patient_id, user_id = shared_with, "Patient shared");
        Ok(())
    }

    /// Revoke shared access. Returns whether a share existed.
    pub fn unshare_patient(&self, caller: Option<&str>, patient_id: &str, user_id: &str) -> EngineResult<bool> {
        let owner = authenticate(caller)?;
        let db = self.db.lock()?;
        owned_patient(&db, owner, patient_id)?;
        Ok(db.unshare_patient(patient_id, user_id)?)
    }

    /// Create a caregiver owned by the caller.
    pub fn create_caregiver(
        &self,
        caller: Option<&str>,
        name: String,
        phone: Option<String>,
    ) -> EngineResult<Caregiver> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        let mut caregiver = Caregiver::new(name, user.to_string());
        caregiver.phone = phone;
        db.insert_caregiver(&caregiver)?;
        info!(caregiver_id = %caregiver.id, "Caregiver created");
        Ok(caregiver)
    }

    /// Delete a caregiver the caller owns, along with its schedules.
    pub fn delete_caregiver(&self, caller: Option<&str>, caregiver_id: &str) -> EngineResult<()> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        let caregiver = db
            .get_caregiver(caregiver_id)?
            .ok_or_else(|| EngineError::not_found("Caregiver", caregiver_id))?;
        if caregiver.owner_id != user {
            return Err(EngineError::Forbidden(format!(
                "user {} does not own caregiver {}",
                user, caregiver_id
            )));
        }
        db.delete_caregiver(caregiver_id)?;
        info!(caregiver_id, "Caregiver deleted");
        Ok(())
    }

    // =========================================================================
    // Medication and Ledger Operations
    // =========================================================================

    /// Create a medication owned by the caller. Non-zero initial stock is
    /// written as its first movement.
    pub fn create_medication(
        &self,
        caller: Option<&str>,
        medication: Medication,
        initial_stock: Decimal,
    ) -> EngineResult<Medication> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        self.ledger(&db).register_medication(user, medication, initial_stock)
    }

    /// Get a medication the caller can access. `None` if it does not exist.
    pub fn get_medication(&self, caller: Option<&str>, medication_id: &str) -> EngineResult<Option<Medication>> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        match access::accessible_medication(&db, user, medication_id) {
            Ok(medication) => Ok(Some(medication)),
            Err(EngineError::NotFound { .. }) => Ok(None),
            Err(e) => Err(e),
        }
    }

    pub fn list_medications(&self, caller: Option<&str>) -> EngineResult<Vec<Medication>> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        Ok(db.list_accessible_medications(user)?)
    }

    /// Delete a medication the caller owns. Movements, links and requests
    /// cascade.
    pub fn delete_medication(&self, caller: Option<&str>, medication_id: &str) -> EngineResult<()> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        access::owned_medication(&db, user, medication_id)?;
        db.delete_medication(medication_id)?;
        info!(medication_id, "Medication deleted");
        Ok(())
    }

    /// Append a stock movement, returning its id.
    pub fn record_movement(&self, caller: Option<&str>, movement: NewMovement) -> EngineResult<String> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        self.ledger(&db).record_movement(user, movement)
    }

    pub fn current_stock(&self, caller: Option<&str>, medication_id: &str) -> EngineResult<Decimal> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        access::accessible_medication(&db, user, medication_id)?;
        self.ledger(&db).current_stock(medication_id)
    }

    /// Whole days the stock lasts at the medication's total consumption.
    pub fn days_remaining(&self, caller: Option<&str>, medication_id: &str) -> EngineResult<i64> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        access::accessible_medication(&db, user, medication_id)?;
        let consumption = PosologyAggregator::new(&db).total_daily_consumption(medication_id)?;
        self.ledger(&db).days_remaining(medication_id, consumption)
    }

    /// Movement history, newest first.
    pub fn movement_history(&self, caller: Option<&str>, medication_id: &str) -> EngineResult<Vec<StockMovement>> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        access::accessible_medication(&db, user, medication_id)?;
        self.ledger(&db).history(medication_id)
    }

    pub fn stock_report(&self, caller: Option<&str>, medication_id: &str) -> EngineResult<StockReport> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        self.ledger(&db).report(user, medication_id)
    }

    /// Reports for all accessible medications, most urgent first.
    pub fn stock_reports(&self, caller: Option<&str>) -> EngineResult<Vec<StockReport>> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        self.ledger(&db).reports_for_user(user)
    }

    // =========================================================================
    // Posology Operations
    // =========================================================================

    pub fn attach_patient(
        &self,
        caller: Option<&str>,
        medication_id: &str,
        patient_id: &str,
        posology: Posology,
    ) -> EngineResult<MedicationPatientLink> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        PosologyAggregator::new(&db).attach_patient(user, medication_id, patient_id, posology)
    }

    pub fn detach_patient(&self, caller: Option<&str>, medication_id: &str, patient_id: &str) -> EngineResult<()> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        PosologyAggregator::new(&db).detach_patient(user, medication_id, patient_id)
    }

    pub fn update_posology(
        &self,
        caller: Option<&str>,
        medication_id: &str,
        patient_id: &str,
        posology: Posology,
    ) -> EngineResult<()> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        PosologyAggregator::new(&db).update_posology(user, medication_id, patient_id, posology)
    }

    pub fn medication_links(
        &self,
        caller: Option<&str>,
        medication_id: &str,
    ) -> EngineResult<Vec<MedicationPatientLink>> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        access::accessible_medication(&db, user, medication_id)?;
        PosologyAggregator::new(&db).links(medication_id)
    }

    pub fn total_daily_consumption(&self, caller: Option<&str>, medication_id: &str) -> EngineResult<Decimal> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        access::accessible_medication(&db, user, medication_id)?;
        PosologyAggregator::new(&db).total_daily_consumption(medication_id)
    }

    // =========================================================================
    // Alert Operations
    // =========================================================================

    /// The caller's thresholds, created with defaults on first use.
    pub fn get_thresholds(&self, caller: Option<&str>) -> EngineResult<Thresholds> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        ThresholdResolver::with_config(&db, &self.config).get_thresholds(user)
    }

    pub fn alert_settings(&self, caller: Option<&str>) -> EngineResult<AlertSettings> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        ThresholdResolver::with_config(&db, &self.config).ensure_settings(user)
    }

    pub fn update_alert_settings(&self, caller: Option<&str>, settings: AlertSettings) -> EngineResult<AlertSettings> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        ThresholdResolver::with_config(&db, &self.config).update_alert_settings(user, settings)
    }

    pub fn stock_alert(&self, caller: Option<&str>, medication_id: &str) -> EngineResult<Option<Alert>> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        AlertEvaluator::with_config(&db, self.config.clone()).stock_alert(user, medication_id)
    }

    pub fn is_quiet_time(&self, caller: Option<&str>, time: NaiveTime) -> EngineResult<bool> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        AlertEvaluator::with_config(&db, self.config.clone()).is_quiet_time(user, time)
    }

    // =========================================================================
    // Replenishment Operations
    // =========================================================================

    /// Submit a replenishment request. Returns its id and the owner's alert
    /// for it, if the owner wants one.
    pub fn create_replenishment_request(
        &self,
        caller: Option<&str>,
        medication_id: &str,
        quantity: Decimal,
        urgency: Urgency,
        notes: Option<String>,
    ) -> EngineResult<(String, Option<Alert>)> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        let request_id = ReplenishmentWorkflow::with_config(&db, self.config.clone())
            .create(user, medication_id, quantity, urgency, notes)?;

        let owner_id = db
            .get_request(&request_id)?
            .map(|request| request.owner_id)
            .ok_or_else(|| EngineError::not_found("ReplenishmentRequest", &request_id))?;
        let alert = AlertEvaluator::with_config(&db, self.config.clone()).replenishment_alert(&owner_id)?;
        Ok((request_id, alert))
    }

    pub fn approve_replenishment_request(
        &self,
        caller: Option<&str>,
        request_id: &str,
        quantity_added: Decimal,
    ) -> EngineResult<ReplenishmentRequest> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        ReplenishmentWorkflow::with_config(&db, self.config.clone()).approve(request_id, user, quantity_added)
    }

    pub fn reject_replenishment_request(
        &self,
        caller: Option<&str>,
        request_id: &str,
    ) -> EngineResult<ReplenishmentRequest> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        ReplenishmentWorkflow::with_config(&db, self.config.clone()).reject(request_id, user)
    }

    pub fn get_replenishment_request(
        &self,
        caller: Option<&str>,
        request_id: &str,
    ) -> EngineResult<ReplenishmentRequest> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        ReplenishmentWorkflow::new(&db).get(user, request_id)
    }

    /// Requests waiting on the caller's decision, oldest first.
    pub fn pending_replenishment_requests(&self, caller: Option<&str>) -> EngineResult<Vec<ReplenishmentRequest>> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        ReplenishmentWorkflow::new(&db).pending_for_owner(user)
    }

    /// Requests the caller submitted, newest first.
    pub fn my_replenishment_requests(&self, caller: Option<&str>) -> EngineResult<Vec<ReplenishmentRequest>> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        ReplenishmentWorkflow::new(&db).by_requester(user)
    }

    // =========================================================================
    // Schedule Operations
    // =========================================================================

    pub fn create_schedule(
        &self,
        caller: Option<&str>,
        caregiver_id: &str,
        weekdays: Vec<Weekday>,
        window: TimeWindow,
        patient_ids: Vec<String>,
    ) -> EngineResult<CaregiverSchedule> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        CareScheduleResolver::new(&db).create_schedule(user, caregiver_id, weekdays, window, patient_ids)
    }

    pub fn delete_schedule(&self, caller: Option<&str>, schedule_id: &str) -> EngineResult<()> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        CareScheduleResolver::new(&db).delete_schedule(user, schedule_id)
    }

    /// Name of the caregiver on duty for a patient. `weekday` is a display
    /// label such as "Segunda" or "sábado".
    pub fn find_responsible_caregiver(
        &self,
        caller: Option<&str>,
        patient_id: &str,
        weekday: &str,
        time: NaiveTime,
    ) -> EngineResult<Option<String>> {
        let user = authenticate(caller)?;
        let day = Weekday::from_label(weekday)
            .ok_or_else(|| EngineError::InvalidInput(format!("unknown weekday label: {}", weekday)))?;
        let db = self.db.lock()?;
        CareScheduleResolver::new(&db).find_responsible_caregiver(user, patient_id, day, time)
    }

    pub fn overlapping_schedules(&self, caller: Option<&str>, patient_id: &str) -> EngineResult<Vec<ScheduleOverlap>> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        CareScheduleResolver::new(&db).overlapping_schedules(user, patient_id)
    }

    // =========================================================================
    // Expense Operations
    // =========================================================================

    pub fn monthly_expense(&self, caller: Option<&str>, month: YearMonth) -> EngineResult<Decimal> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        ExpenseAmortizer::new(&db).monthly_expense(user, month)
    }

    pub fn yearly_expenses(&self, caller: Option<&str>, year: i32) -> EngineResult<Vec<MonthlyExpense>> {
        let user = authenticate(caller)?;
        let db = self.db.lock()?;
        ExpenseAmortizer::new(&db).yearly_breakdown(user, year)
    }

    fn ledger<'a>(&self, db: &'a Database) -> StockLedger<'a> {
        StockLedger::with_config(db, self.config.clone())
    }
}

fn owned_patient(db: &Database, user_id: &str, patient_id: &str) -> EngineResult<Patient> {
    let patient = db
        .get_patient(patient_id)?
        .ok_or_else(|| EngineError::not_found("Patient", patient_id))?;
    if patient.owner_id != user_id {
        return Err(EngineError::Forbidden(format!(
            "user {} does not own patient {}",
            user_id, patient_id
        )));
    }
    Ok(patient)
}
