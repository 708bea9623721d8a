//! Medication models.
//!
//! A medication never stores its stock. Stock and days remaining are always
//! derived from the movement ledger (see [`crate::ledger`]).

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// A medication managed by a representative user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Medication {
    /// Local UUID
    pub id: String,
    /// Commercial or generic name
    pub name: String,
    /// Dosage amount per unit (e.g. 500 for "500 mg")
    pub dosage_amount: Decimal,
    /// Dosage unit (e.g. "mg", "mL")
    pub dosage_unit: String,
    /// Presentation form (e.g. "tablet", "syrup")
    pub form: String,
    /// Administration route (e.g. "oral")
    pub route: String,
    /// Units per box
    pub box_size: u32,
    /// Free-text instructions
    pub instructions: Option<String>,
    /// Representative who manages this medication
    pub owner_id: String,
    /// Prescription this medication came from, if any
    pub prescription_id: Option<String>,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Medication {
    /// Create a new medication with required fields.
    pub fn new(name: String, owner_id: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            dosage_amount: Decimal::ZERO,
            dosage_unit: String::new(),
            form: String::new(),
            route: String::new(),
            box_size: 0,
            instructions: None,
            owner_id,
            prescription_id: None,
            created_at: Utc::now(),
        }
    }

    /// Check whether `user_id` is the managing representative.
    pub fn is_owned_by(&self, user_id: &str) -> bool {
        self.owner_id == user_id
    }
}
