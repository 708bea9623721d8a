//! Caregiver schedule database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{Database, DbError, DbResult};
use crate::models::{CaregiverSchedule, TimeWindow, Weekday};

impl Database {
    /// Insert a schedule together with its patient memberships.
    pub fn insert_schedule(&self, schedule: &CaregiverSchedule) -> DbResult<()> {
        let weekdays_json = serde_json::to_string(&schedule.weekdays)?;

        self.atomically(|db| {
            db.conn.execute(
                r#"
                INSERT INTO caregiver_schedules (
                    id, caregiver_id, weekdays, start_time, end_time, owner_id, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
                params![
                    schedule.id,
                    schedule.caregiver_id,
                    weekdays_json,
                    schedule.window.start,
                    schedule.window.end,
                    schedule.owner_id,
                    schedule.created_at,
                ],
            )?;

            for patient_id in &schedule.patient_ids {
                db.conn.execute(
                    "INSERT OR IGNORE INTO caregiver_schedule_patients (schedule_id, patient_id) VALUES (?1, ?2)",
                    [&schedule.id, patient_id],
                )?;
            }
            Ok(())
        })
    }

    /// Get a schedule by ID.
    pub fn get_schedule(&self, id: &str) -> DbResult<Option<CaregiverSchedule>> {
        let row = self
            .conn
            .query_row(
                r#"
                SELECT id, caregiver_id, weekdays, start_time, end_time, owner_id, created_at
                FROM caregiver_schedules
                WHERE id = ?
                "#,
                [id],
                ScheduleRow::from_row,
            )
            .optional()?;

        match row {
            Some(row) => Ok(Some(self.hydrate_schedule(row)?)),
            None => Ok(None),
        }
    }

    /// Schedules owned by `owner_id` that include `patient_id`, in creation order.
    pub fn list_schedules_for_patient(
        &self,
        owner_id: &str,
        patient_id: &str,
    ) -> DbResult<Vec<CaregiverSchedule>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT s.id, s.caregiver_id, s.weekdays, s.start_time, s.end_time, s.owner_id, s.created_at
            FROM caregiver_schedules s
            JOIN caregiver_schedule_patients sp ON sp.schedule_id = s.id
            WHERE s.owner_id = ?1 AND sp.patient_id = ?2
            ORDER BY s.created_at, s.rowid
            "#,
        )?;

        let rows = stmt.query_map([owner_id, patient_id], ScheduleRow::from_row)?;

        let mut schedules = Vec::new();
        for row in rows {
            schedules.push(self.hydrate_schedule(row?)?);
        }
        Ok(schedules)
    }

    /// Delete a schedule. Memberships cascade.
    pub fn delete_schedule(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self
            .conn
            .execute("DELETE FROM caregiver_schedules WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    fn schedule_patient_ids(&self, schedule_id: &str) -> DbResult<Vec<String>> {
        let mut stmt = self.conn.prepare(
            "SELECT patient_id FROM caregiver_schedule_patients WHERE schedule_id = ? ORDER BY rowid",
        )?;
        let rows = stmt.query_map([schedule_id], |row| row.get(0))?;
        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    fn hydrate_schedule(&self, row: ScheduleRow) -> DbResult<CaregiverSchedule> {
        let weekdays: Vec<Weekday> = serde_json::from_str(&row.weekdays)?;
        if weekdays.is_empty() {
            return Err(DbError::Constraint(format!("Schedule {} has no weekdays", row.id)));
        }
        let patient_ids = self.schedule_patient_ids(&row.id)?;

        Ok(CaregiverSchedule {
            id: row.id,
            caregiver_id: row.caregiver_id,
            weekdays,
            window: TimeWindow::new(row.start_time, row.end_time),
            owner_id: row.owner_id,
            patient_ids,
            created_at: row.created_at,
        })
    }
}

/// Intermediate row struct for database mapping.
struct ScheduleRow {
    id: String,
    caregiver_id: String,
    weekdays: String,
    start_time: chrono::NaiveTime,
    end_time: chrono::NaiveTime,
    owner_id: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl ScheduleRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            caregiver_id: row.get(1)?,
            weekdays: row.get(2)?,
            start_time: row.get(3)?,
            end_time: row.get(4)?,
            owner_id: row.get(5)?,
            created_at: row.get(6)?,
        })
    }
}
