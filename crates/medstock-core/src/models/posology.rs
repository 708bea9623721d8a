//! Posology models: the dosing plan for one medication/patient pairing.

use chrono::{DateTime, NaiveDate, NaiveTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How long a treatment runs.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum TreatmentType {
    /// No planned end
    Continuous,
    /// Ends on the posology's end date
    TimeBoxed,
}

impl TreatmentType {
    pub fn as_str(&self) -> &'static str {
        match self {
            TreatmentType::Continuous => "continuous",
            TreatmentType::TimeBoxed => "time_boxed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "continuous" => Some(TreatmentType::Continuous),
            "time_boxed" => Some(TreatmentType::TimeBoxed),
            _ => None,
        }
    }
}

/// Dosing plan for a medication given to one patient.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Posology {
    /// Frequency label (e.g. "8/8h", "1x ao dia")
    pub frequency: String,
    /// Administration times, ordered and without duplicates
    pub administration_times: Vec<NaiveTime>,
    pub half_dose: bool,
    pub custom_frequency: Option<String>,
    /// Extra / as-needed medication
    pub as_needed: bool,
    pub treatment: TreatmentType,
    pub start_date: NaiveDate,
    pub end_date: Option<NaiveDate>,
    pub tapering: bool,
    /// Units consumed per day by this patient
    pub daily_consumption: Decimal,
}

impl Posology {
    /// A continuous posology starting on `start_date`.
    pub fn continuous(frequency: String, start_date: NaiveDate, daily_consumption: Decimal) -> Self {
        Self {
            frequency,
            administration_times: Vec::new(),
            half_dose: false,
            custom_frequency: None,
            as_needed: false,
            treatment: TreatmentType::Continuous,
            start_date,
            end_date: None,
            tapering: false,
            daily_consumption,
        }
    }

    /// Sort administration times and drop duplicates.
    pub fn normalize(&mut self) {
        self.administration_times.sort();
        self.administration_times.dedup();
    }

    /// Check field-level constraints, returning a message on failure.
    pub fn validate(&self) -> Result<(), String> {
        if self.daily_consumption.is_sign_negative() {
            return Err(format!(
                "daily consumption must not be negative (got {})",
                self.daily_consumption
            ));
        }
        if let Some(end) = self.end_date {
            if end < self.start_date {
                return Err(format!(
                    "end date {} precedes start date {}",
                    end, self.start_date
                ));
            }
        }
        if self.treatment == TreatmentType::TimeBoxed && self.end_date.is_none() {
            return Err("time-boxed treatment requires an end date".into());
        }
        Ok(())
    }
}

/// Association of one medication with one patient, carrying its posology.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MedicationPatientLink {
    pub id: String,
    pub medication_id: String,
    pub patient_id: String,
    pub posology: Posology,
    pub created_at: DateTime<Utc>,
}

impl MedicationPatientLink {
    pub fn new(medication_id: String, patient_id: String, mut posology: Posology) -> Self {
        posology.normalize();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            medication_id,
            patient_id,
            posology,
            created_at: Utc::now(),
        }
    }
}
