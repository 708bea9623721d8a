//! Patient, sharing and caregiver database operations.

use rusqlite::{params, OptionalExtension};

use super::{Database, DbResult};
use crate::models::{Caregiver, Patient};

impl Database {
    /// Insert a new patient.
    pub fn insert_patient(&self, patient: &Patient) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO patients (id, name, owner_id, created_at) VALUES (?1, ?2, ?3, ?4)",
            params![patient.id, patient.name, patient.owner_id, patient.created_at],
        )?;
        Ok(())
    }

    /// Get a patient by ID.
    pub fn get_patient(&self, id: &str) -> DbResult<Option<Patient>> {
        self.conn
            .query_row(
                "SELECT id, name, owner_id, created_at FROM patients WHERE id = ?",
                [id],
                |row| {
                    Ok(Patient {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        owner_id: row.get(2)?,
                        created_at: row.get(3)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// List patients the user owns or has been shared into.
    pub fn list_accessible_patients(&self, user_id: &str) -> DbResult<Vec<Patient>> {
        let mut stmt = self.conn.prepare(
            r#"
            SELECT id, name, owner_id, created_at
            FROM patients
            WHERE owner_id = ?1
               OR id IN (SELECT patient_id FROM patient_shares WHERE user_id = ?1)
            ORDER BY name
            "#,
        )?;

        let rows = stmt.query_map([user_id], |row| {
            Ok(Patient {
                id: row.get(0)?,
                name: row.get(1)?,
                owner_id: row.get(2)?,
                created_at: row.get(3)?,
            })
        })?;

        rows.collect::<Result<Vec<_>, _>>().map_err(Into::into)
    }

    /// Delete a patient. Links and schedule memberships cascade.
    pub fn delete_patient(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM patients WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// Grant `user_id` shared access to a patient. Idempotent.
    pub fn share_patient(&self, patient_id: &str, user_id: &str) -> DbResult<()> {
        self.conn.execute(
            "INSERT OR IGNORE INTO patient_shares (patient_id, user_id) VALUES (?1, ?2)",
            [patient_id, user_id],
        )?;
        Ok(())
    }

    /// Revoke shared access.
    pub fn unshare_patient(&self, patient_id: &str, user_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "DELETE FROM patient_shares WHERE patient_id = ?1 AND user_id = ?2",
            [patient_id, user_id],
        )?;
        Ok(rows_affected > 0)
    }

    /// Whether the user owns or is shared into the patient.
    pub fn user_can_access_patient(&self, user_id: &str, patient_id: &str) -> DbResult<bool> {
        let found = self
            .conn
            .query_row(
                r#"
                SELECT 1 FROM patients
                WHERE id = ?1
                  AND (owner_id = ?2
                       OR EXISTS (SELECT 1 FROM patient_shares
                                  WHERE patient_id = ?1 AND user_id = ?2))
                "#,
                [patient_id, user_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }

    /// Insert a new caregiver.
    pub fn insert_caregiver(&self, caregiver: &Caregiver) -> DbResult<()> {
        self.conn.execute(
            "INSERT INTO caregivers (id, name, phone, owner_id, created_at) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                caregiver.id,
                caregiver.name,
                caregiver.phone,
                caregiver.owner_id,
                caregiver.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get a caregiver by ID.
    pub fn get_caregiver(&self, id: &str) -> DbResult<Option<Caregiver>> {
        self.conn
            .query_row(
                "SELECT id, name, phone, owner_id, created_at FROM caregivers WHERE id = ?",
                [id],
                |row| {
                    Ok(Caregiver {
                        id: row.get(0)?,
                        name: row.get(1)?,
                        phone: row.get(2)?,
                        owner_id: row.get(3)?,
                        created_at: row.get(4)?,
                    })
                },
            )
            .optional()
            .map_err(Into::into)
    }

    /// Delete a caregiver. Their schedules cascade.
    pub fn delete_caregiver(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM caregivers WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }
}
