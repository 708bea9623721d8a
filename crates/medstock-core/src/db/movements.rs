//! Stock movement database operations.
//!
//! The ledger is append-only: there is deliberately no update or delete
//! path here, and the schema aborts any UPDATE on `stock_movements`.

use rusqlite::{params, Row};

use super::{decimal_from_sql, decimal_to_sql, optional_decimal_from_sql, Database, DbError, DbResult};
use crate::models::{Direction, StockMovement};

const MOVEMENT_COLUMNS: &str = "id, medication_id, direction, quantity, created_at, source, \
     price, total_installments, actor_id";

impl Database {
    /// Append a movement to the ledger.
    pub fn insert_movement(&self, movement: &StockMovement) -> DbResult<()> {
        self.conn.execute(
            r#"
            INSERT INTO stock_movements (
                id, medication_id, direction, quantity, created_at, source,
                price, total_installments, actor_id
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)
            "#,
            params![
                movement.id,
                movement.medication_id,
                movement.direction.as_str(),
                decimal_to_sql(&movement.quantity),
                movement.created_at,
                movement.source,
                movement.price.as_ref().map(decimal_to_sql),
                movement.total_installments,
                movement.actor_id,
            ],
        )?;
        Ok(())
    }

    /// All movements for a medication, newest first.
    pub fn list_movements(&self, medication_id: &str) -> DbResult<Vec<StockMovement>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM stock_movements WHERE medication_id = ? ORDER BY created_at DESC, rowid DESC",
            MOVEMENT_COLUMNS
        ))?;

        let rows = stmt.query_map([medication_id], MovementRow::from_row)?;

        let mut movements = Vec::new();
        for row in rows {
            movements.push(row?.try_into()?);
        }
        Ok(movements)
    }

    /// Direction and quantity of every movement for a medication.
    pub fn list_movement_quantities(
        &self,
        medication_id: &str,
    ) -> DbResult<Vec<(Direction, rust_decimal::Decimal)>> {
        let mut stmt = self
            .conn
            .prepare("SELECT direction, quantity FROM stock_movements WHERE medication_id = ?")?;

        let rows = stmt.query_map([medication_id], |row| {
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
        })?;

        let mut quantities = Vec::new();
        for row in rows {
            let (direction, quantity) = row?;
            quantities.push((parse_direction(&direction)?, decimal_from_sql(&quantity)?));
        }
        Ok(quantities)
    }

    /// Priced `In` movements of every medication the user can access.
    pub fn list_priced_purchases(&self, user_id: &str) -> DbResult<Vec<StockMovement>> {
        let mut stmt = self.conn.prepare(&format!(
            r#"
            SELECT {}
            FROM stock_movements
            WHERE direction = 'in'
              AND price IS NOT NULL
              AND medication_id IN (
                  SELECT m.id FROM medications m
                  WHERE m.owner_id = ?1
                     OR m.id IN (
                         SELECT mp.medication_id
                         FROM medication_patients mp
                         JOIN patients p ON p.id = mp.patient_id
                         WHERE p.owner_id = ?1
                            OR p.id IN (SELECT patient_id FROM patient_shares WHERE user_id = ?1)
                     )
              )
            ORDER BY created_at
            "#,
            MOVEMENT_COLUMNS
        ))?;

        let rows = stmt.query_map([user_id], MovementRow::from_row)?;

        let mut movements = Vec::new();
        for row in rows {
            movements.push(row?.try_into()?);
        }
        Ok(movements)
    }
}

fn parse_direction(s: &str) -> DbResult<Direction> {
    Direction::parse(s).ok_or_else(|| DbError::Constraint(format!("Unknown direction: {}", s)))
}

/// Intermediate row struct for database mapping.
struct MovementRow {
    id: String,
    medication_id: String,
    direction: String,
    quantity: String,
    created_at: chrono::DateTime<chrono::Utc>,
    source: String,
    price: Option<String>,
    total_installments: Option<u32>,
    actor_id: String,
}

impl MovementRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            medication_id: row.get(1)?,
            direction: row.get(2)?,
            quantity: row.get(3)?,
            created_at: row.get(4)?,
            source: row.get(5)?,
            price: row.get(6)?,
            total_installments: row.get(7)?,
            actor_id: row.get(8)?,
        })
    }
}

impl TryFrom<MovementRow> for StockMovement {
    type Error = DbError;

    fn try_from(row: MovementRow) -> Result<Self, Self::Error> {
        Ok(StockMovement {
            id: row.id,
            medication_id: row.medication_id,
            direction: parse_direction(&row.direction)?,
            quantity: decimal_from_sql(&row.quantity)?,
            created_at: row.created_at,
            source: row.source,
            price: optional_decimal_from_sql(row.price)?,
            total_installments: row.total_installments,
            actor_id: row.actor_id,
        })
    }
}
