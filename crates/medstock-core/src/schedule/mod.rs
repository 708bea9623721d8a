//! Care schedule resolution: which caregiver is on duty for a patient at a
//! given weekday and clock time.
//!
//! A schedule's weekdays name the day its shift *starts*. An overnight
//! window (end <= start) therefore covers the early hours after that day
//! under the same label, matching how shifts are entered in the apps.

mod overlap;

pub use overlap::*;

use chrono::NaiveTime;
use tracing::{debug, info, warn};

use crate::access;
use crate::db::Database;
use crate::error::{EngineError, EngineResult};
use crate::models::{Caregiver, CaregiverSchedule, TimeWindow, Weekday};

pub struct CareScheduleResolver<'a> {
    db: &'a Database,
}

impl<'a> CareScheduleResolver<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Create a schedule for a caregiver the user owns, covering patients
    /// the user can access.
    pub fn create_schedule(
        &self,
        user_id: &str,
        caregiver_id: &str,
        weekdays: Vec<Weekday>,
        window: TimeWindow,
        patient_ids: Vec<String>,
    ) -> EngineResult<CaregiverSchedule> {
        if weekdays.is_empty() {
            return Err(EngineError::InvalidInput("a schedule needs at least one weekday".into()));
        }
        if patient_ids.is_empty() {
            return Err(EngineError::InvalidInput("a schedule needs at least one patient".into()));
        }

        let schedule = self.db.atomically(|db| {
            let caregiver = db
                .get_caregiver(caregiver_id)?
                .ok_or_else(|| EngineError::not_found("Caregiver", caregiver_id))?;
            if caregiver.owner_id != user_id {
                return Err(EngineError::Forbidden(format!(
                    "user {} does not own caregiver {}",
                    user_id, caregiver_id
                )));
            }
            for patient_id in &patient_ids {
                access::accessible_patient(db, user_id, patient_id)?;
            }

            let schedule = CaregiverSchedule::new(
                caregiver_id.to_string(),
                weekdays,
                window,
                user_id.to_string(),
                patient_ids,
            );
            db.insert_schedule(&schedule)?;
            Ok(schedule)
        })?;

        info!(
            schedule_id = %schedule.id,
            caregiver_id,
            overnight = schedule.window.is_overnight(),
            "Caregiver schedule created"
        );
        Ok(schedule)
    }

    /// Delete one of the user's schedules.
    pub fn delete_schedule(&self, user_id: &str, schedule_id: &str) -> EngineResult<()> {
        self.db.atomically(|db| {
            let schedule = db
                .get_schedule(schedule_id)?
                .ok_or_else(|| EngineError::not_found("CaregiverSchedule", schedule_id))?;
            if schedule.owner_id != user_id {
                return Err(EngineError::Forbidden(format!(
                    "user {} does not own schedule {}",
                    user_id, schedule_id
                )));
            }
            db.delete_schedule(schedule_id)?;
            Ok(())
        })?;

        info!(schedule_id, "Caregiver schedule deleted");
        Ok(())
    }

    /// The user's schedules for a patient, in creation order.
    pub fn schedules_for_patient(&self, user_id: &str, patient_id: &str) -> EngineResult<Vec<CaregiverSchedule>> {
        Ok(self.db.list_schedules_for_patient(user_id, patient_id)?)
    }

    /// First schedule, in creation order, whose caregiver is on duty for
    /// the patient at `weekday` and `time`.
    ///
    /// Schedules whose caregiver has vanished are skipped.
    pub fn find_responsible_schedule(
        &self,
        user_id: &str,
        patient_id: &str,
        weekday: Weekday,
        time: NaiveTime,
    ) -> EngineResult<Option<(CaregiverSchedule, Caregiver)>> {
        for schedule in self.db.list_schedules_for_patient(user_id, patient_id)? {
            if !schedule.runs_on(weekday) || !schedule.window.contains(time) {
                continue;
            }

            match self.db.get_caregiver(&schedule.caregiver_id)? {
                Some(caregiver) => {
                    debug!(
                        patient_id,
                        schedule_id = %schedule.id,
                        caregiver_id = %caregiver.id,
                        "Responsible caregiver resolved"
                    );
                    return Ok(Some((schedule, caregiver)));
                }
                None => {
                    warn!(
                        schedule_id = %schedule.id,
                        caregiver_id = %schedule.caregiver_id,
                        "Schedule references a missing caregiver"
                    );
                }
            }
        }

        debug!(patient_id, weekday = weekday.label(), %time, "No caregiver on duty");
        Ok(None)
    }

    /// Name of the caregiver on duty, if any.
    pub fn find_responsible_caregiver(
        &self,
        user_id: &str,
        patient_id: &str,
        weekday: Weekday,
        time: NaiveTime,
    ) -> EngineResult<Option<String>> {
        Ok(self
            .find_responsible_schedule(user_id, patient_id, weekday, time)?
            .map(|(_, caregiver)| caregiver.name))
    }
}
