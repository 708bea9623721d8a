//! Replenishment workflow: `Pending` requests approved into the ledger or
//! rejected by the medication owner.

use chrono::Utc;
use rust_decimal::Decimal;
use tracing::info;

use crate::access;
use crate::config::EngineConfig;
use crate::db::Database;
use crate::error::{EngineError, EngineResult};
use crate::ledger::StockLedger;
use crate::models::{Direction, ReplenishmentRequest, RequestStatus, StockMovement, Urgency};

/// Ledger source label for an approved request.
pub fn approval_source(request_id: &str) -> String {
    format!("Replenishment Approved — Req #{}", request_id)
}

pub struct ReplenishmentWorkflow<'a> {
    db: &'a Database,
    config: EngineConfig,
}

impl<'a> ReplenishmentWorkflow<'a> {
    pub fn new(db: &'a Database) -> Self {
        Self::with_config(db, EngineConfig::default())
    }

    pub fn with_config(db: &'a Database, config: EngineConfig) -> Self {
        Self { db, config }
    }

    /// Submit a request. The requester needs access to the medication; its
    /// current owner becomes the request's approver.
    pub fn create(
        &self,
        requester_id: &str,
        medication_id: &str,
        quantity: Decimal,
        urgency: Urgency,
        notes: Option<String>,
    ) -> EngineResult<String> {
        if quantity <= Decimal::ZERO {
            return Err(EngineError::InvalidInput(format!(
                "requested quantity must be positive (got {})",
                quantity
            )));
        }

        let request = self.db.atomically(|db| {
            let medication = access::accessible_medication(db, requester_id, medication_id)?;

            let mut request = ReplenishmentRequest::new(
                medication.id,
                requester_id.to_string(),
                quantity,
                urgency,
                medication.owner_id,
            );
            request.notes = notes;
            db.insert_request(&request)?;
            Ok::<_, EngineError>(request)
        })?;

        info!(
            request_id = %request.id,
            medication_id,
            owner_id = %request.owner_id,
            urgency = request.urgency.as_str(),
            "Replenishment requested"
        );
        Ok(request.id)
    }

    /// Approve a pending request: append an `In` movement for
    /// `quantity_added` and complete the request, both or neither.
    pub fn approve(
        &self,
        request_id: &str,
        approver_id: &str,
        quantity_added: Decimal,
    ) -> EngineResult<ReplenishmentRequest> {
        if quantity_added <= Decimal::ZERO {
            return Err(EngineError::InvalidInput(format!(
                "added quantity must be positive (got {})",
                quantity_added
            )));
        }

        let request = self.db.atomically(|db| {
            let request = self.decidable(db, request_id, approver_id, RequestStatus::Completed)?;

            let movement = StockMovement::new(
                request.medication_id.clone(),
                Direction::In,
                quantity_added,
                approval_source(&request.id),
                approver_id.to_string(),
            );
            StockLedger::with_config(db, self.config.clone()).append(&movement)?;

            self.close(db, request, RequestStatus::Completed, Some(quantity_added))
        })?;

        info!(
            request_id,
            medication_id = %request.medication_id,
            quantity = %quantity_added,
            "Replenishment approved"
        );
        Ok(request)
    }

    /// Reject a pending request. No ledger effect.
    pub fn reject(&self, request_id: &str, approver_id: &str) -> EngineResult<ReplenishmentRequest> {
        let request = self.db.atomically(|db| {
            let request = self.decidable(db, request_id, approver_id, RequestStatus::Rejected)?;
            self.close(db, request, RequestStatus::Rejected, None)
        })?;

        info!(request_id, medication_id = %request.medication_id, "Replenishment rejected");
        Ok(request)
    }

    /// A request visible to the user as requester or owner.
    pub fn get(&self, user_id: &str, request_id: &str) -> EngineResult<ReplenishmentRequest> {
        let request = self
            .db
            .get_request(request_id)?
            .ok_or_else(|| EngineError::not_found("ReplenishmentRequest", request_id))?;

        if request.owner_id != user_id && request.requester_id != user_id {
            return Err(EngineError::Forbidden(format!(
                "user {} cannot see request {}",
                user_id, request_id
            )));
        }
        Ok(request)
    }

    /// Pending requests awaiting the owner's decision, oldest first.
    pub fn pending_for_owner(&self, owner_id: &str) -> EngineResult<Vec<ReplenishmentRequest>> {
        Ok(self.db.list_pending_requests_for_owner(owner_id)?)
    }

    /// Requests the user submitted, newest first.
    pub fn by_requester(&self, requester_id: &str) -> EngineResult<Vec<ReplenishmentRequest>> {
        Ok(self.db.list_requests_by_requester(requester_id)?)
    }

    /// Load a request and check `approver_id` may move it to `next`.
    fn decidable(
        &self,
        db: &Database,
        request_id: &str,
        approver_id: &str,
        next: RequestStatus,
    ) -> EngineResult<ReplenishmentRequest> {
        let request = db
            .get_request(request_id)?
            .ok_or_else(|| EngineError::not_found("ReplenishmentRequest", request_id))?;

        if request.owner_id != approver_id {
            return Err(EngineError::Forbidden(format!(
                "only the medication owner can decide request {}",
                request_id
            )));
        }
        if !request.status.can_transition_to(next) {
            return Err(EngineError::InvalidState(format!(
                "request {} is {}, not pending",
                request_id,
                request.status.as_str()
            )));
        }
        Ok(request)
    }

    fn close(
        &self,
        db: &Database,
        mut request: ReplenishmentRequest,
        status: RequestStatus,
        added_quantity: Option<Decimal>,
    ) -> EngineResult<ReplenishmentRequest> {
        let completed_at = Utc::now();
        if !db.close_request(&request.id, status, completed_at, added_quantity)? {
            return Err(EngineError::InvalidState(format!(
                "request {} was decided concurrently",
                request.id
            )));
        }

        request.status = status;
        request.completed_at = Some(completed_at);
        request.added_quantity = added_quantity;
        Ok(request)
    }
}
