//! Caller identity and access checks shared by the engine components.

use crate::db::Database;
use crate::error::{EngineError, EngineResult};
use crate::models::{Medication, Patient};

/// Turn the identity handed over by the auth collaborator into a user id.
pub fn authenticate(identity: Option<&str>) -> EngineResult<&str> {
    match identity.map(str::trim) {
        Some(id) if !id.is_empty() => Ok(id),
        _ => Err(EngineError::Unauthenticated),
    }
}

/// Load a medication the user owns or reaches through a linked patient.
pub fn accessible_medication(
    db: &Database,
    user_id: &str,
    medication_id: &str,
) -> EngineResult<Medication> {
    let medication = db
        .get_medication(medication_id)?
        .ok_or_else(|| EngineError::not_found("Medication", medication_id))?;

    if !db.user_can_access_medication(user_id, medication_id)? {
        return Err(EngineError::Forbidden(format!(
            "user {} cannot access medication {}",
            user_id, medication_id
        )));
    }
    Ok(medication)
}

/// Load a medication the user owns.
pub fn owned_medication(
    db: &Database,
    user_id: &str,
    medication_id: &str,
) -> EngineResult<Medication> {
    let medication = db
        .get_medication(medication_id)?
        .ok_or_else(|| EngineError::not_found("Medication", medication_id))?;

    if !medication.is_owned_by(user_id) {
        return Err(EngineError::Forbidden(format!(
            "user {} does not own medication {}",
            user_id, medication_id
        )));
    }
    Ok(medication)
}

/// Load a patient the user owns or is shared into.
pub fn accessible_patient(db: &Database, user_id: &str, patient_id: &str) -> EngineResult<Patient> {
    let patient = db
        .get_patient(patient_id)?
        .ok_or_else(|| EngineError::not_found("Patient", patient_id))?;

    if !db.user_can_access_patient(user_id, patient_id)? {
        return Err(EngineError::Forbidden(format!(
            "user {} cannot access patient {}",
            user_id, patient_id
        )));
    }
    Ok(patient)
}
