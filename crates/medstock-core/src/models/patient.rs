//! Patient and caregiver models.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A patient managed by a representative user.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Patient {
    /// Local UUID
    pub id: String,
    /// Patient name
    pub name: String,
    /// User who manages this patient
    pub owner_id: String,
    /// Creation timestamp
    pub created_at: DateTime<Utc>,
}

impl Patient {
    /// Create a new patient owned by `owner_id`.
    pub fn new(name: String, owner_id: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            owner_id,
            created_at: Utc::now(),
        }
    }
}

/// A caregiver who can be scheduled to look after patients.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Caregiver {
    pub id: String,
    pub name: String,
    /// Contact phone, free text
    pub phone: Option<String>,
    pub owner_id: String,
    pub created_at: DateTime<Utc>,
}

impl Caregiver {
    /// Create a new caregiver owned by `owner_id`.
    pub fn new(name: String, owner_id: String) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name,
            phone: None,
            owner_id,
            created_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_patient() {
        let patient = Patient::new("Maria".into(), "user-1".into());
        assert_eq!(patient.name, "Maria");
        assert_eq!(patient.owner_id, "user-1");
        assert_eq!(patient.id.len(), 36); // UUID format
    }

    #[test]
    fn test_new_caregiver_has_no_phone() {
        let caregiver = Caregiver::new("Joana".into(), "user-1".into());
        assert!(caregiver.phone.is_none());
        assert_ne!(caregiver.id, Caregiver::new("Joana".into(), "user-1".into()).id);
    }
}
