//! Medication/patient link (posology) database operations.

use chrono::NaiveTime;
use rusqlite::{params, OptionalExtension, Row};

use super::{decimal_from_sql, decimal_to_sql, Database, DbError, DbResult};
use crate::models::{MedicationPatientLink, Posology, TreatmentType};

const LINK_COLUMNS: &str = "id, medication_id, patient_id, frequency, administration_times, \
     half_dose, custom_frequency, as_needed, treatment_type, start_date, end_date, tapering, \
     daily_consumption, created_at";

impl Database {
    /// Insert a link. Fails with a constraint error if the pair already exists.
    pub fn insert_link(&self, link: &MedicationPatientLink) -> DbResult<()> {
        let times_json = serde_json::to_string(&link.posology.administration_times)?;
        let p = &link.posology;

        self.conn.execute(
            r#"
            INSERT INTO medication_patients (
                id, medication_id, patient_id, frequency, administration_times,
                half_dose, custom_frequency, as_needed, treatment_type, start_date,
                end_date, tapering, daily_consumption, created_at
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
            "#,
            params![
                link.id,
                link.medication_id,
                link.patient_id,
                p.frequency,
                times_json,
                p.half_dose,
                p.custom_frequency,
                p.as_needed,
                p.treatment.as_str(),
                p.start_date,
                p.end_date,
                p.tapering,
                decimal_to_sql(&p.daily_consumption),
                link.created_at,
            ],
        )?;
        Ok(())
    }

    /// Get the link for a (medication, patient) pair.
    pub fn get_link(
        &self,
        medication_id: &str,
        patient_id: &str,
    ) -> DbResult<Option<MedicationPatientLink>> {
        self.conn
            .query_row(
                &format!(
                    "SELECT {} FROM medication_patients WHERE medication_id = ?1 AND patient_id = ?2",
                    LINK_COLUMNS
                ),
                [medication_id, patient_id],
                LinkRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// All links of a medication, in attachment order.
    pub fn list_links_for_medication(
        &self,
        medication_id: &str,
    ) -> DbResult<Vec<MedicationPatientLink>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM medication_patients WHERE medication_id = ? ORDER BY created_at, rowid",
            LINK_COLUMNS
        ))?;

        let rows = stmt.query_map([medication_id], LinkRow::from_row)?;

        let mut links = Vec::new();
        for row in rows {
            links.push(row?.try_into()?);
        }
        Ok(links)
    }

    /// Replace the posology of one pairing.
    pub fn update_link_posology(
        &self,
        medication_id: &str,
        patient_id: &str,
        posology: &Posology,
    ) -> DbResult<bool> {
        let times_json = serde_json::to_string(&posology.administration_times)?;

        let rows_affected = self.conn.execute(
            r#"
            UPDATE medication_patients SET
                frequency = ?3,
                administration_times = ?4,
                half_dose = ?5,
                custom_frequency = ?6,
                as_needed = ?7,
                treatment_type = ?8,
                start_date = ?9,
                end_date = ?10,
                tapering = ?11,
                daily_consumption = ?12
            WHERE medication_id = ?1 AND patient_id = ?2
            "#,
            params![
                medication_id,
                patient_id,
                posology.frequency,
                times_json,
                posology.half_dose,
                posology.custom_frequency,
                posology.as_needed,
                posology.treatment.as_str(),
                posology.start_date,
                posology.end_date,
                posology.tapering,
                decimal_to_sql(&posology.daily_consumption),
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Remove a link. The medication, patient and ledger are untouched.
    pub fn delete_link(&self, medication_id: &str, patient_id: &str) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            "DELETE FROM medication_patients WHERE medication_id = ?1 AND patient_id = ?2",
            [medication_id, patient_id],
        )?;
        Ok(rows_affected > 0)
    }
}

/// Intermediate row struct for database mapping.
struct LinkRow {
    id: String,
    medication_id: String,
    patient_id: String,
    frequency: String,
    administration_times: String,
    half_dose: bool,
    custom_frequency: Option<String>,
    as_needed: bool,
    treatment_type: String,
    start_date: chrono::NaiveDate,
    end_date: Option<chrono::NaiveDate>,
    tapering: bool,
    daily_consumption: String,
    created_at: chrono::DateTime<chrono::Utc>,
}

impl LinkRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            medication_id: row.get(1)?,
            patient_id: row.get(2)?,
            frequency: row.get(3)?,
            administration_times: row.get(4)?,
            half_dose: row.get(5)?,
            custom_frequency: row.get(6)?,
            as_needed: row.get(7)?,
            treatment_type: row.get(8)?,
            start_date: row.get(9)?,
            end_date: row.get(10)?,
            tapering: row.get(11)?,
            daily_consumption: row.get(12)?,
            created_at: row.get(13)?,
        })
    }
}

impl TryFrom<LinkRow> for MedicationPatientLink {
    type Error = DbError;

    fn try_from(row: LinkRow) -> Result<Self, Self::Error> {
        let administration_times: Vec<NaiveTime> = serde_json::from_str(&row.administration_times)?;
        let treatment = TreatmentType::parse(&row.treatment_type).ok_or_else(|| {
            DbError::Constraint(format!("Unknown treatment type: {}", row.treatment_type))
        })?;

        Ok(MedicationPatientLink {
            id: row.id,
            medication_id: row.medication_id,
            patient_id: row.patient_id,
            posology: Posology {
                frequency: row.frequency,
                administration_times,
                half_dose: row.half_dose,
                custom_frequency: row.custom_frequency,
                as_needed: row.as_needed,
                treatment,
                start_date: row.start_date,
                end_date: row.end_date,
                tapering: row.tapering,
                daily_consumption: decimal_from_sql(&row.daily_consumption)?,
            },
            created_at: row.created_at,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Medication, Patient};
    use chrono::NaiveDate;
    use rust_decimal::Decimal;

    fn setup_db() -> (Database, Medication, Patient) {
        let db = Database::open_in_memory().unwrap();
        let med = Medication::new("Losartana".into(), "owner".into());
        let patient = Patient::new("Ana".into(), "owner".into());
        db.insert_medication(&med).unwrap();
        db.insert_patient(&patient).unwrap();
        (db, med, patient)
    }

    fn posology(consumption: Decimal) -> Posology {
        let mut p = Posology::continuous(
            "12/12h".into(),
            NaiveDate::from_ymd_opt(2024, 2, 1).unwrap(),
            consumption,
        );
        p.administration_times = vec![
            NaiveTime::from_hms_opt(8, 0, 0).unwrap(),
            NaiveTime::from_hms_opt(20, 0, 0).unwrap(),
        ];
        p
    }

    #[test]
    fn test_insert_and_get() {
        let (db, med, patient) = setup_db();
        let link = MedicationPatientLink::new(med.id.clone(), patient.id.clone(), posology(Decimal::TWO));
        db.insert_link(&link).unwrap();

        let retrieved = db.get_link(&med.id, &patient.id).unwrap().unwrap();
        assert_eq!(retrieved, link);
    }

    #[test]
    fn test_duplicate_pair_rejected() {
        let (db, med, patient) = setup_db();
        let first = MedicationPatientLink::new(med.id.clone(), patient.id.clone(), posology(Decimal::ONE));
        let second = MedicationPatientLink::new(med.id.clone(), patient.id.clone(), posology(Decimal::ONE));
        db.insert_link(&first).unwrap();
        assert!(db.insert_link(&second).is_err());
    }

    #[test]
    fn test_update_posology() {
        let (db, med, patient) = setup_db();
        let link = MedicationPatientLink::new(med.id.clone(), patient.id.clone(), posology(Decimal::ONE));
        db.insert_link(&link).unwrap();

        let mut updated = posology(Decimal::new(15, 1));
        updated.half_dose = true;
        updated.end_date = NaiveDate::from_ymd_opt(2024, 3, 1);
        updated.treatment = TreatmentType::TimeBoxed;
        assert!(db.update_link_posology(&med.id, &patient.id, &updated).unwrap());

        let retrieved = db.get_link(&med.id, &patient.id).unwrap().unwrap();
        assert_eq!(retrieved.posology, updated);
        assert!(!db.update_link_posology(&med.id, "ghost", &updated).unwrap());
    }

    #[test]
    fn test_delete_link_keeps_medication() {
        let (db, med, patient) = setup_db();
        let link = MedicationPatientLink::new(med.id.clone(), patient.id.clone(), posology(Decimal::ONE));
        db.insert_link(&link).unwrap();

        assert!(db.delete_link(&med.id, &patient.id).unwrap());
        assert!(db.list_links_for_medication(&med.id).unwrap().is_empty());
        assert!(db.get_medication(&med.id).unwrap().is_some());
        assert!(db.get_patient(&patient.id).unwrap().is_some());
    }
}
