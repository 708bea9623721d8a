//! Replenishment request models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// How urgently stock is needed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum Urgency {
    Low,
    Medium,
    High,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Urgency::Low => "low",
            Urgency::Medium => "medium",
            Urgency::High => "high",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "low" => Some(Urgency::Low),
            "medium" => Some(Urgency::Medium),
            "high" => Some(Urgency::High),
            _ => None,
        }
    }
}

/// Request status. `Completed` and `Rejected` are terminal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    Pending,
    Completed,
    Rejected,
}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Completed => "completed",
            RequestStatus::Rejected => "rejected",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "completed" => Some(RequestStatus::Completed),
            "rejected" => Some(RequestStatus::Rejected),
            _ => None,
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, RequestStatus::Pending)
    }

    /// Whether moving to `next` is a legal transition.
    pub fn can_transition_to(&self, next: RequestStatus) -> bool {
        match (self, next) {
            (RequestStatus::Pending, RequestStatus::Completed) => true,
            (RequestStatus::Pending, RequestStatus::Rejected) => true,
            (RequestStatus::Pending, RequestStatus::Pending) => false,
            (RequestStatus::Completed, _) | (RequestStatus::Rejected, _) => false,
        }
    }
}

/// A request asking a medication's owner to approve adding stock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ReplenishmentRequest {
    pub id: String,
    pub medication_id: String,
    pub requester_id: String,
    pub requested_at: DateTime<Utc>,
    pub requested_quantity: Decimal,
    pub urgency: Urgency,
    pub status: RequestStatus,
    pub notes: Option<String>,
    /// Set when the request leaves `Pending`
    pub completed_at: Option<DateTime<Utc>>,
    /// Set only on approval
    pub added_quantity: Option<Decimal>,
    /// Medication owner captured at creation, used to authorize decisions
    pub owner_id: String,
}

impl ReplenishmentRequest {
    pub fn new(
        medication_id: String,
        requester_id: String,
        requested_quantity: Decimal,
        urgency: Urgency,
        owner_id: String,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            medication_id,
            requester_id,
            requested_at: Utc::now(),
            requested_quantity,
            urgency,
            status: RequestStatus::Pending,
            notes: None,
            completed_at: None,
            added_quantity: None,
            owner_id,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transitions_only_from_pending() {
        use RequestStatus::*;
        assert!(Pending.can_transition_to(Completed));
        assert!(Pending.can_transition_to(Rejected));
        assert!(!Pending.can_transition_to(Pending));
        for terminal in [Completed, Rejected] {
            assert!(terminal.is_terminal());
            for next in [Pending, Completed, Rejected] {
                assert!(!terminal.can_transition_to(next));
            }
        }
    }

    #[test]
    fn test_new_request_is_pending() {
        let req = ReplenishmentRequest::new(
            "med".into(),
            "caregiver".into(),
            Decimal::from(30),
            Urgency::High,
            "owner".into(),
        );
        assert_eq!(req.status, RequestStatus::Pending);
        assert!(req.completed_at.is_none());
        assert!(req.added_quantity.is_none());
    }

    #[test]
    fn test_urgency_ordering() {
        assert!(Urgency::High > Urgency::Medium);
        assert_eq!(Urgency::parse("medium"), Some(Urgency::Medium));
    }
}
