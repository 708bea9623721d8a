//! Medication database operations.

use rusqlite::{params, OptionalExtension, Row};

use super::{decimal_from_sql, decimal_to_sql, Database, DbError, DbResult};
use crate::models::Medication;

const MEDICATION_COLUMNS: &str = "id, name, dosage_amount, dosage_unit, form, route, box_size, \
     instructions, owner_id, prescription_id, created_at";

impl Database {
    /// Insert a new medication. Stock is not part of the row.
    pub fn insert_medication(&self, medication: &Medication) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO medications (
                id, name, dosage_amount, dosage_unit, form, route, box_size,
                instructions, owner_id, prescription_id, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
            "#,
            params![
                medication.id,
                medication.name,
                decimal_to_sql(&medication.dosage_amount),
                medication.dosage_unit,
                medication.form,
                medication.route,
                medication.box_size,
                medication.instructions,
                medication.owner_id,
                medication.prescription_id,
                medication.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get a medication by ID.
    pub fn get_medication(&self, id: &str) -> DbResult<Option<Medication>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM medications WHERE id = ?", MEDICATION_COLUMNS),
                [id],
                MedicationRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// List medications the user owns or reaches through an accessible patient.
    pub fn list_accessible_medications(&self, user_id: &str) -> DbResult<Vec<Medication>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {}
            FROM medications
            WHERE owner_id = ?1
               OR id IN (
                   SELECT mp.medication_id
                   FROM medication_patients mp
                   JOIN patients p ON p.id = mp.patient_id
                   WHERE p.owner_id = ?1
                      OR p.id IN (SELECT patient_id FROM patient_shares WHERE user_id = ?1)
               )
            ORDER BY name
            "#,
            MEDICATION_COLUMNS
        ))?;

        let rows = stmt.query_map([user_id], MedicationRow::from_row)?;

        let mut medications = Vec::new();
        for row in rows {
            medications.push(row?.try_into()?);
        }
        Ok(medications)
    }

    /// Delete a medication. Its movements, links and requests cascade.
    pub fn delete_medication(&self, id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute("DELETE FROM medications WHERE id = ?", [id])?;
        Ok(rows_affected > 0)
    }

    /// Whether the user owns the medication or can access a patient linked to it.
    pub fn user_can_access_medication(&self, user_id: &str, medication_id: &str) -> DbResult<bool> {
        let found = self
            .conn
            .query_row(
                r#"
                SELECT 1 FROM medications m
                WHERE m.id = ?1
                  AND (m.owner_id = ?2
                       OR EXISTS (
                           SELECT 1
                           FROM medication_patients mp
                           JOIN patients p ON p.id = mp.patient_id
                           WHERE mp.medication_id = m.id
                             AND (p.owner_id = ?2
                                  OR EXISTS (SELECT 1 FROM patient_shares s
                                             WHERE s.patient_id = p.id AND s.user_id = ?2))
                       ))
                "#,
                [medication_id, user_id],
                |_| Ok(()),
            )
            .optional()?;
        Ok(found.is_some())
    }
}

/// Intermediate row struct for database mapping.
struct MedicationRow {
    id: String,
    name: String,
    dosage_amount: String,
    dosage_unit: String,
    form: String,
    route: String,
    box_size: u32,
    instructions: Option<String>,
    owner_id: String,
    prescription_id: Option<String>,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl MedicationRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            name: row.get(1)?,
            dosage_amount: row.get(2)?,
            dosage_unit: row.get(3)?,
            form: row.get(4)?,
            route: row.get(5)?,
            box_size: row.get(6)?,
            instructions: row.get(7)?,
            owner_id: row.get(8)?,
            prescription_id: row.get(9)?,
            created_at: row.get(10)?,
        })
    }
}

impl TryFrom<MedicationRow> for Medication {
    type Error = DbError;

    fn try_from(row: MedicationRow) -> Result<Self, Self::Error> {
        Ok(Medication {
            id: row.id,
            name: row.name,
            dosage_amount: decimal_from_sql(&row.dosage_amount)?,
            dosage_unit: row.dosage_unit,
            form: row.form,
            route: row.route,
            box_size: row.box_size,
            instructions: row.instructions,
            owner_id: row.owner_id,
            prescription_id: row.prescription_id,
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{MedicationPatientLink, Patient, Posology};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn setup_db() -> Database {
        Database::open_in_memory().unwrap()
    }

    fn make_medication(owner: &str) -> Medication {
        let mut med = Medication::new("Metformina".into(), owner.into());
        med.dosage_amount = Decimal::new(850, 0);
        med.dosage_unit = "mg".into();
        med.form = "comprimido".into();
        med.route = "oral".into();
        med.box_size = 30;
        med
    }

    #[test]
    fn test_insert_and_get() {
        let db = setup_db();
        let med = make_medication("owner");
        db.insert_medication(&med).unwrap();

        let retrieved = db.get_medication(&med.id).unwrap().unwrap();
        assert_eq!(retrieved, med);
    }

    #[test]
    fn test_access_through_linked_patient() {
        let db = setup_db();
        let med = make_medication("owner");
        db.insert_medication(&med).unwrap();

        let patient = Patient::new("Ana".into(), "owner".into());
        db.insert_patient(&patient).unwrap();
        db.share_patient(&patient.id, "nurse").unwrap();

        assert!(db.user_can_access_medication("owner", &med.id).unwrap());
        assert!(!db.user_can_access_medication("nurse", &med.id).unwrap());

        let posology = Posology::continuous(
            "1x".into(),
            NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            Decimal::ONE,
        );
        let link = MedicationPatientLink::new(med.id.clone(), patient.id.clone(), posology);
        db.insert_link(&link).unwrap();

        assert!(db.user_can_access_medication("nurse", &med.id).unwrap());
        assert!(!db.user_can_access_medication("stranger", &med.id).unwrap());

        let listed = db.list_accessible_medications("nurse").unwrap();
        assert_eq!(listed.len(), 1);
        assert_eq!(listed[0].id, med.id);
    }

    #[test]
    fn test_delete_medication() {
        let db = setup_db();
        let med = make_medication("owner");
        db.insert_medication(&med).unwrap();

        assert!(db.delete_medication(&med.id).unwrap());
        assert!(!db.delete_medication(&med.id).unwrap());
        assert!(db.get_medication(&med.id).unwrap().is_none());
    }
}
