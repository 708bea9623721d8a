//! Engine error taxonomy.

use thiserror::Error;

use crate::config::ConfigError;
use crate::db::DbError;

/// Errors surfaced by engine operations.
///
/// Every failing operation leaves no partial writes behind.
#[derive(Error, Debug)]
pub enum EngineError {
    /// No caller identity was supplied.
    #[error("Unauthenticated: no caller identity")]
    Unauthenticated,

    /// The caller lacks ownership or shared access to the target.
    #[error("Access denied: {0}")]
    Forbidden(String),

    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// A state-machine precondition does not hold.
    #[error("Invalid state: {0}")]
    InvalidState(String),

    #[error("Patient {patient_id} is already linked to medication {medication_id}")]
    DuplicateAssociation {
        medication_id: String,
        patient_id: String,
    },

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// An outgoing movement would take stock below zero.
    #[error("Insufficient stock for {medication_id}: {available} available, {requested} requested")]
    InsufficientStock {
        medication_id: String,
        available: rust_decimal::Decimal,
        requested: rust_decimal::Decimal,
    },

    #[error("Database error: {0}")]
    Database(#[from] DbError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),
}

impl EngineError {
    pub(crate) fn not_found(entity: &'static str, id: &str) -> Self {
        EngineError::NotFound {
            entity,
            id: id.to_string(),
        }
    }
}

impl From<rusqlite::Error> for EngineError {
    fn from(e: rusqlite::Error) -> Self {
        EngineError::Database(DbError::Sqlite(e))
    }
}

impl<T> From<std::sync::PoisonError<T>> for EngineError {
    fn from(e: std::sync::PoisonError<T>) -> Self {
        EngineError::Database(DbError::Constraint(format!("Lock poisoned: {}", e)))
    }
}

pub type EngineResult<T> = Result<T, EngineError>;
