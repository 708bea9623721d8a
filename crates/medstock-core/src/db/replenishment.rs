//! Replenishment request database operations.

use chrono::{DateTime, Utc};
use rusqlite::{params, OptionalExtension, Row};
use rust_decimal::Decimal;

use super::{decimal_from_sql, decimal_to_sql, optional_decimal_from_sql, Database, DbError, DbResult};
use crate::models::{ReplenishmentRequest, RequestStatus, Urgency};

const REQUEST_COLUMNS: &str = "id, medication_id, requester_id, requested_at, requested_quantity, \
     urgency, status, notes, completed_at, added_quantity, owner_id";

impl Database {
    /// Insert a new request.
    pub fn insert_request(&self, request: &ReplenishmentRequest) -> DbResult<()> {
        self.conn.execute(
            &format!(
                "INSERT INTO replenishment_requests ({}) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)",
                REQUEST_COLUMNS
            ),
            params![
                request.id,
                request.medication_id,
                request.requester_id,
                request.requested_at,
                decimal_to_sql(&request.requested_quantity),
                request.urgency.as_str(),
                request.status.as_str(),
                request.notes,
                request.completed_at,
                request.added_quantity.as_ref().map(decimal_to_sql),
                request.owner_id,
            ],
        )?;
        Ok(())
    }

    /// Get a request by ID.
    pub fn get_request(&self, id: &str) -> DbResult<Option<ReplenishmentRequest>> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM replenishment_requests WHERE id = ?", REQUEST_COLUMNS),
                [id],
                RequestRow::from_row,
            )
            .optional()?
            .map(|row| row.try_into())
            .transpose()
    }

    /// Move a pending request to a terminal status.
    ///
    /// The `status = 'pending'` guard makes the flip single-shot: returns
    /// `false` if the request was not pending anymore.
    pub fn close_request(
        &self,
        id: &str,
        status: RequestStatus,
        completed_at: DateTime<Utc>,
        added_quantity: Option<Decimal>,
    ) -> DbResult<bool> {
        let rows_affected = self.conn.execute(
            r#"
            UPDATE replenishment_requests SET
                status = ?2,
                completed_at = ?3,
                added_quantity = ?4
            WHERE id = ?1 AND status = 'pending'
            "#,
            params![
                id,
                status.as_str(),
                completed_at,
                added_quantity.as_ref().map(decimal_to_sql),
            ],
        )?;
        Ok(rows_affected > 0)
    }

    /// Pending requests awaiting a decision by `owner_id`, oldest first.
    pub fn list_pending_requests_for_owner(&self, owner_id: &str) -> DbResult<Vec<ReplenishmentRequest>> {
        self.query_requests(
            "WHERE owner_id = ? AND status = 'pending' ORDER BY requested_at, rowid",
            owner_id,
        )
    }

    /// Requests submitted by `requester_id`, newest first.
    pub fn list_requests_by_requester(&self, requester_id: &str) -> DbResult<Vec<ReplenishmentRequest>> {
        self.query_requests(
            "WHERE requester_id = ? ORDER BY requested_at DESC, rowid DESC",
            requester_id,
        )
    }

    fn query_requests(&self, clause: &str, arg: &str) -> DbResult<Vec<ReplenishmentRequest>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM replenishment_requests {}",
            REQUEST_COLUMNS, clause
        ))?;

        let rows = stmt.query_map([arg], RequestRow::from_row)?;

        let mut requests = Vec::new();
        for row in rows {
            requests.push(row?.try_into()?);
        }
        Ok(requests)
    }
}

/// Intermediate row struct for database mapping.
struct RequestRow {
    id: String,
    medication_id: String,
    requester_id: String,
    requested_at: DateTime<Utc>,
    requested_quantity: String,
    urgency: String,
    status: String,
    notes: Option<String>,
    completed_at: Option<DateTime<Utc>>,
    added_quantity: Option<String>,
    owner_id: String,
}

impl RequestRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            medication_id: row.get(1)?,
            requester_id: row.get(2)?,
            requested_at: row.get(3)?,
            requested_quantity: row.get(4)?,
            urgency: row.get(5)?,
            status: row.get(6)?,
            notes: row.get(7)?,
            completed_at: row.get(8)?,
            added_quantity: row.get(9)?,
            owner_id: row.get(10)?,
        })
    }
}

impl TryFrom<RequestRow> for ReplenishmentRequest {
    type Error = DbError;

    fn try_from(row: RequestRow) -> Result<Self, Self::Error> {
        let urgency = Urgency::parse(&row.urgency)
            .ok_or_else(|| DbError::Constraint(format!("Unknown urgency: {}", row.urgency)))?;
        let status = RequestStatus::parse(&row.status)
            .ok_or_else(|| DbError::Constraint(format!("Unknown request status: {}", row.status)))?;

        Ok(ReplenishmentRequest {
            id: row.id,
            medication_id: row.medication_id,
            requester_id: row.requester_id,
            requested_at: row.requested_at,
            requested_quantity: decimal_from_sql(&row.requested_quantity)?,
            urgency,
            status,
            notes: row.notes,
            completed_at: row.completed_at,
            added_quantity: optional_decimal_from_sql(row.added_quantity)?,
            owner_id: row.owner_id,
        })
    }
}
