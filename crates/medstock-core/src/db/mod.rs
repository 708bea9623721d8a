//! Database layer: the persistence collaborator behind every engine component.

mod schema;
mod medications;
mod patients;
mod movements;
mod links;
mod alert_settings;
mod replenishment;
mod schedules;

pub use schema::*;
#[allow(unused_imports)]
pub use medications::*;
#[allow(unused_imports)]
pub use patients::*;
#[allow(unused_imports)]
pub use movements::*;
#[allow(unused_imports)]
pub use links::*;
#[allow(unused_imports)]
pub use alert_settings::*;
#[allow(unused_imports)]
pub use replenishment::*;
#[allow(unused_imports)]
pub use schedules::*;

use std::path::Path;
use std::str::FromStr;

use rusqlite::Connection;
use rust_decimal::Decimal;
use thiserror::Error;

/// Database errors.
#[derive(Error, Debug)]
pub enum DbError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid decimal {value:?}: {source}")]
    Decimal {
        value: String,
        source: rust_decimal::Error,
    },

    #[error("Constraint violation: {0}")]
    Constraint(String),
}

pub type DbResult<T> = Result<T, DbError>;

/// Database connection wrapper.
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open database at path, creating if needed.
    pub fn open<P: AsRef<Path>>(path: P) -> DbResult<Self> {
        let conn = Connection::open(path)?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Create in-memory database (for testing).
    pub fn open_in_memory() -> DbResult<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Self { conn };
        db.initialize()?;
        Ok(db)
    }

    /// Initialize schema.
    fn initialize(&self) -> DbResult<()> {
        self.conn.execute_batch(SCHEMA)?;
        Ok(())
    }

    /// Get raw connection (for advanced queries).
    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    /// Run `f` as one unit of work.
    ///
    /// Everything `f` writes through this database is committed together, or
    /// rolled back if `f` returns an error. Calls nested inside an open unit
    /// of work join the outer one.
    pub fn atomically<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&Database) -> Result<T, E>,
        E: From<DbError>,
    {
        if !self.conn.is_autocommit() {
            return f(self);
        }

        let tx = self
            .conn
            .unchecked_transaction()
            .map_err(|e| E::from(DbError::from(e)))?;
        let value = f(self)?;
        tx.commit().map_err(|e| E::from(DbError::from(e)))?;
        Ok(value)
    }
}

/// Decimal columns are stored as text to keep them exact.
pub(crate) fn decimal_to_sql(value: &Decimal) -> String {
    value.normalize().to_string()
}

pub(crate) fn decimal_from_sql(value: &str) -> DbResult<Decimal> {
    Decimal::from_str(value).map_err(|source| DbError::Decimal {
        value: value.to_string(),
        source,
    })
}

pub(crate) fn optional_decimal_from_sql(value: Option<String>) -> DbResult<Option<Decimal>> {
    value.as_deref().map(decimal_from_sql).transpose()
}
