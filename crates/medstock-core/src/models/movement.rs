//! Stock movement models.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// Direction of a stock movement.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    In,
    Out,
}

impl Direction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::In => "in",
            Direction::Out => "out",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "in" => Some(Direction::In),
            "out" => Some(Direction::Out),
            _ => None,
        }
    }

    /// Sign applied to the quantity when summing the ledger.
    pub fn signed(&self, quantity: Decimal) -> Decimal {
        match self {
            Direction::In => quantity,
            Direction::Out => -quantity,
        }
    }
}

/// An immutable ledger entry. Created once, never edited.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockMovement {
    pub id: String,
    pub medication_id: String,
    pub direction: Direction,
    /// Always positive
    pub quantity: Decimal,
    /// Creation time; also the purchase date for expense reporting
    pub created_at: DateTime<Utc>,
    /// Free-text source or reason (e.g. "Initial Stock", "Pharmacy")
    pub source: String,
    /// Total price paid, if this was a purchase
    pub price: Option<Decimal>,
    /// Number of installments; `None` or ≤ 1 means paid in full
    pub total_installments: Option<u32>,
    /// User who recorded the movement
    pub actor_id: String,
}

impl StockMovement {
    /// Create a new movement stamped with the current time.
    pub fn new(
        medication_id: String,
        direction: Direction,
        quantity: Decimal,
        source: String,
        actor_id: String,
    ) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            medication_id,
            direction,
            quantity,
            created_at: Utc::now(),
            source,
            price: None,
            total_installments: None,
            actor_id,
        }
    }

    /// Quantity with the sign of its direction.
    pub fn signed_quantity(&self) -> Decimal {
        self.direction.signed(self.quantity)
    }

    /// Whether the price is spread over more than one month.
    pub fn is_installment_purchase(&self) -> bool {
        matches!(self.total_installments, Some(n) if n > 1)
    }
}
