//! Posology aggregation: per-patient dosing rolled up into a medication's
//! total daily consumption.

use rust_decimal::Decimal;
use tracing::{debug, info};

use crate::access;
use crate::db::Database;
use crate::error::{EngineError, EngineResult};
use crate::models::{MedicationPatientLink, Posology};

/// Manages medication/patient links and sums their consumption.
pub struct PosologyAggregator<'a> {
    db: &'a Database,
}

impl<'a> PosologyAggregator<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self { db }
    }

    /// Link a patient to a medication with its posology.
    ///
    /// The acting user must own the medication and have access to the patient.
    pub fn attach_patient(
        &self,
        actor_id: &str,
        medication_id: &str,
        patient_id: &str,
        posology: Posology,
    ) -> EngineResult<MedicationPatientLink> {
        posology.validate().map_err(EngineError::InvalidInput)?;

        let link = self.db.atomically(|db| {
            access::owned_medication(db, actor_id, medication_id)?;
            access::accessible_patient(db, actor_id, patient_id)?;

            if db.get_link(medication_id, patient_id)?.is_some() {
                return Err(EngineError::DuplicateAssociation {
                    medication_id: medication_id.to_string(),
                    patient_id: patient_id.to_string(),
                });
            }

            let link =
                MedicationPatientLink::new(medication_id.to_string(), patient_id.to_string(), posology);
            db.insert_link(&link)?;
            ensure_total_fits(db, medication_id)?;
            Ok(link)
        })?;

        info!(medication_id, patient_id, "Patient attached to medication");
        Ok(link)
    }

    /// Remove a link. Medication, patient and ledger are untouched.
    pub fn detach_patient(&self, actor_id: &str, medication_id: &str, patient_id: &str) -> EngineResult<()> {
        self.db.atomically(|db| {
            access::owned_medication(db, actor_id, medication_id)?;
            if !db.delete_link(medication_id, patient_id)? {
                return Err(EngineError::not_found(
                    "MedicationPatientLink",
                    &format!("{}/{}", medication_id, patient_id),
                ));
            }
            Ok(())
        })?;

        info!(medication_id, patient_id, "Patient detached from medication");
        Ok(())
    }

    /// Replace the posology of a single pairing.
    pub fn update_posology(
        &self,
        actor_id: &str,
        medication_id: &str,
        patient_id: &str,
        mut posology: Posology,
    ) -> EngineResult<()> {
        posology.validate().map_err(EngineError::InvalidInput)?;
        posology.normalize();

        self.db.atomically(|db| {
            access::owned_medication(db, actor_id, medication_id)?;
            if !db.update_link_posology(medication_id, patient_id, &posology)? {
                return Err(EngineError::not_found(
                    "MedicationPatientLink",
                    &format!("{}/{}", medication_id, patient_id),
                ));
            }
            ensure_total_fits(db, medication_id)
        })?;

        info!(medication_id, patient_id, "Posology updated");
        Ok(())
    }

    /// Links of a medication, in attachment order.
    pub fn links(&self, medication_id: &str) -> EngineResult<Vec<MedicationPatientLink>> {
        Ok(self.db.list_links_for_medication(medication_id)?)
    }

    /// Sum of every link's daily consumption. Zero without links.
    pub fn total_daily_consumption(&self, medication_id: &str) -> EngineResult<Decimal> {
        let total = checked_total(&self.links(medication_id)?).ok_or_else(|| {
            EngineError::InvalidState(format!("daily consumption of {} overflows", medication_id))
        })?;

        debug!(medication_id, %total, "Total daily consumption derived");
        Ok(total)
    }
}

fn checked_total(links: &[MedicationPatientLink]) -> Option<Decimal> {
    links
        .iter()
        .try_fold(Decimal::ZERO, |acc, link| acc.checked_add(link.posology.daily_consumption))
}

/// Fails, rolling back the surrounding write, when the medication's links
/// no longer sum to a representable total.
fn ensure_total_fits(db: &Database, medication_id: &str) -> EngineResult<()> {
    if checked_total(&db.list_links_for_medication(medication_id)?).is_none() {
        return Err(EngineError::InvalidInput(format!(
            "daily consumption of {} would overflow",
            medication_id
        )));
    }
    Ok(())
}
