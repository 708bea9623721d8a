//! Stock ledger: append-only movements and the stock derived from them.
//!
//! Current stock is never stored. Every read replays the medication's
//! movements, so there is no cached counter that could drift.

mod arithmetic;
mod report;

pub use arithmetic::*;
pub use report::*;

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use crate::access;
use crate::config::{EngineConfig, NegativeStockPolicy};
use crate::db::Database;
use crate::error::{EngineError, EngineResult};
use crate::models::{Direction, Medication, StockMovement};

/// Input for [`StockLedger::record_movement`].
#[derive(Debug, Clone, PartialEq)]
pub struct NewMovement {
    pub medication_id: String,
    pub direction: Direction,
    pub quantity: Decimal,
    pub source: String,
    pub price: Option<Decimal>,
    pub total_installments: Option<u32>,
}

impl NewMovement {
    pub fn new(medication_id: String, direction: Direction, quantity: Decimal, source: String) -> Self {
        Self {
            medication_id,
            direction,
            quantity,
            source,
            price: None,
            total_installments: None,
        }
    }

    /// Attach a purchase price, optionally split into installments.
    pub fn priced(mut self, price: Decimal, total_installments: Option<u32>) -> Self {
        self.price = Some(price);
        self.total_installments = total_installments;
        self
    }
}

/// Ledger operations over one database.
pub struct StockLedger<'a> {
    db: &'a Database,
    config: EngineConfig,
}

impl<'a> StockLedger<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self::with_config(db, EngineConfig::default())
    }

    pub fn with_config(db: &'a Database, config: EngineConfig) -> Self {
        Self { db, config }
    }

    /// Create a medication, recording a non-zero initial stock as its first
    /// `In` movement.
    pub fn register_medication(
        &self,
        owner_id: &str,
        mut medication: Medication,
        initial_stock: Decimal,
    ) -> EngineResult<Medication> {
        if initial_stock.is_sign_negative() {
            return Err(EngineError::InvalidInput(format!(
                "initial stock must not be negative (got {})",
                initial_stock
            )));
        }
        medication.owner_id = owner_id.to_string();

        self.db.atomically(|db| {
            db.insert_medication(&medication)?;
            if !initial_stock.is_zero() {
                let movement = StockMovement::new(
                    medication.id.clone(),
                    Direction::In,
                    initial_stock,
                    self.config.initial_stock_source.clone(),
                    owner_id.to_string(),
                );
                db.insert_movement(&movement)?;
            }
            Ok::<_, EngineError>(())
        })?;

        info!(medication_id = %medication.id, %initial_stock, "Medication registered");
        Ok(medication)
    }

    /// Append a movement on behalf of `actor_id`, returning its id.
    ///
    /// The actor must own the medication or reach it through a linked patient.
    pub fn record_movement(&self, actor_id: &str, input: NewMovement) -> EngineResult<String> {
        self.db.atomically(|db| {
            access::accessible_medication(db, actor_id, &input.medication_id)?;

            let mut movement = StockMovement::new(
                input.medication_id,
                input.direction,
                input.quantity,
                input.source,
                actor_id.to_string(),
            );
            movement.price = input.price;
            movement.total_installments = input.total_installments;

            self.append(&movement)?;
            Ok(movement.id)
        })
    }

    /// Validate and append an already-built movement. No authorization.
    pub fn append(&self, movement: &StockMovement) -> EngineResult<()> {
        if movement.quantity <= Decimal::ZERO {
            return Err(EngineError::InvalidInput(format!(
                "movement quantity must be positive (got {})",
                movement.quantity
            )));
        }
        if let Some(price) = movement.price {
            if price.is_sign_negative() {
                return Err(EngineError::InvalidInput(format!(
                    "price must not be negative (got {})",
                    price
                )));
            }
        }
        if movement.total_installments == Some(0) {
            return Err(EngineError::InvalidInput("installments must be at least 1".into()));
        }

        self.db.atomically(|db| {
            let (ins, outs) = movement_totals(db.list_movement_quantities(&movement.medication_id)?)
                .ok_or_else(|| stock_overflow(&movement.medication_id))?;

            let fits = match movement.direction {
                Direction::In => ins.checked_add(movement.quantity).is_some(),
                Direction::Out => outs.checked_add(movement.quantity).is_some(),
            };
            if !fits {
                return Err(EngineError::InvalidInput(format!(
                    "movement of {} would overflow the ledger of {}",
                    movement.quantity, movement.medication_id
                )));
            }

            if movement.direction == Direction::Out
                && self.config.negative_stock == NegativeStockPolicy::Reject
            {
                let available = ins - outs;
                if movement.quantity > available {
                    warn!(
                        medication_id = %movement.medication_id,
                        %available,
                        requested = %movement.quantity,
                        "Rejected movement exceeding stock"
                    );
                    return Err(EngineError::InsufficientStock {
                        medication_id: movement.medication_id.clone(),
                        available,
                        requested: movement.quantity,
                    });
                }
            }

            db.insert_movement(movement)?;
            Ok(())
        })?;

        info!(
            movement_id = %movement.id,
            medication_id = %movement.medication_id,
            direction = movement.direction.as_str(),
            quantity = %movement.quantity,
            "Stock movement recorded"
        );
        Ok(())
    }

    /// Σ(In) − Σ(Out) over every movement of the medication. Zero when it
    /// has none.
    pub fn current_stock(&self, medication_id: &str) -> EngineResult<Decimal> {
        let stock = sum_movements(self.db.list_movement_quantities(medication_id)?)
            .ok_or_else(|| stock_overflow(medication_id))?;
        debug!(medication_id, %stock, "Current stock derived");
        Ok(stock)
    }

    /// Whole days the current stock lasts at `total_daily_consumption`.
    pub fn days_remaining(
        &self,
        medication_id: &str,
        total_daily_consumption: Decimal,
    ) -> EngineResult<i64> {
        let stock = self.current_stock(medication_id)?;
        Ok(days_remaining(stock, total_daily_consumption))
    }

    /// Movement history, newest first.
    pub fn history(&self, medication_id: &str) -> EngineResult<Vec<StockMovement>> {
        Ok(self.db.list_movements(medication_id)?)
    }
}

fn stock_overflow(medication_id: &str) -> EngineError {
    EngineError::InvalidState(format!("stock totals of {} overflow", medication_id))
}
