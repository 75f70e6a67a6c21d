//! Approval chain state machine.
//!
//! An expense starts `Pending`. Any rejecting decision moves it to `Rejected`; an approving
//! decision moves it to `Approved` once no higher step is still pending. Both are terminal,
//! and each approval row is decided exactly once.

mod route;

pub use route::{ApprovalRoute, ManagerRoute};

use std::sync::Arc;

use chrono::NaiveDateTime;
use serde::Serialize;
use tracing::{debug, info};

use super::authorization::can_decide;
use super::domain::{
    Approval, ApprovalDecision, ApprovalId, ApprovalStatus, Expense, ExpenseStatus, NewApproval,
    Principal,
};
use super::repository::{RepositoryError, StoreTransaction};

/// A decision request routed to [`ApprovalWorkflow::decide`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionRequest {
    pub approval_id: ApprovalId,
    pub decision: ApprovalDecision,
    pub comments: Option<String>,
}

/// Updated approval plus the expense status it produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DecisionOutcome {
    pub approval: Approval,
    pub expense_status: ExpenseStatus,
}

pub struct ApprovalWorkflow {
    route: Arc<dyn ApprovalRoute>,
}

impl Default for ApprovalWorkflow {
    fn default() -> Self {
        Self::new(Arc::new(ManagerRoute))
    }
}

impl ApprovalWorkflow {
    pub fn new(route: Arc<dyn ApprovalRoute>) -> Self {
        Self { route }
    }

    /// Creates one pending approval per routed approver, steps numbered from 1.
    ///
    /// With [`ManagerRoute`] this yields a single manager step, or nothing when the
    /// submitter has no manager; the expense then stays pending with no approver.
    pub fn initiate(
        &self,
        tx: &mut dyn StoreTransaction,
        expense: &Expense,
        submitter: &Principal,
        now: NaiveDateTime,
    ) -> Result<Vec<Approval>, WorkflowError> {
        let approvers = self.route.approvers(expense, submitter);
        if approvers.is_empty() {
            debug!(expense_id = expense.id.0, "no approver routed for expense");
        }

        let mut created = Vec::with_capacity(approvers.len());
        for (index, approver_id) in approvers.into_iter().enumerate() {
            let approval = tx.insert_approval(NewApproval {
                expense_id: expense.id,
                approver_id,
                workflow_step: index as u32 + 1,
                created_at: now,
            })?;
            created.push(approval);
        }
        Ok(created)
    }

    /// Records a decision and settles the expense status.
    ///
    /// Must run inside a single store transaction: the pending-step lookup and both
    /// writes are only consistent when no other decision interleaves.
    pub fn decide(
        &self,
        tx: &mut dyn StoreTransaction,
        request: DecisionRequest,
        actor: &Principal,
        now: NaiveDateTime,
    ) -> Result<DecisionOutcome, WorkflowError> {
        let mut approval = tx
            .approval(request.approval_id)?
            .ok_or(WorkflowError::NotFound("approval"))?;

        can_decide(actor, &approval).into_result(WorkflowError::PermissionDenied)?;

        if approval.status != ApprovalStatus::Pending {
            return Err(WorkflowError::InvalidState(format!(
                "approval {} is already {}",
                approval.id.0,
                approval.status.label()
            )));
        }

        let mut expense = tx
            .expense(approval.expense_id)?
            .ok_or(WorkflowError::NotFound("expense"))?;
        if expense.status.is_terminal() {
            return Err(WorkflowError::InvalidState(format!(
                "expense {} is already {}",
                expense.id.0,
                expense.status.label()
            )));
        }

        approval.status = request.decision.status();
        approval.comments = request.comments;
        approval.approved_at = Some(now);

        let expense_status = match request.decision {
            ApprovalDecision::Rejected => ExpenseStatus::Rejected,
            ApprovalDecision::Approved => {
                let higher_step_pending = tx
                    .approvals_for_expense(expense.id)?
                    .iter()
                    .any(|other| {
                        other.id != approval.id
                            && other.workflow_step > approval.workflow_step
                            && other.status == ApprovalStatus::Pending
                    });
                if higher_step_pending {
                    ExpenseStatus::Pending
                } else {
                    ExpenseStatus::Approved
                }
            }
        };

        tx.update_approval(approval.clone())?;
        if expense_status != expense.status {
            expense.status = expense_status;
            expense.updated_at = now;
            tx.update_expense(expense.clone())?;
        }

        info!(
            approval_id = approval.id.0,
            expense_id = expense.id.0,
            step = approval.workflow_step,
            decision = approval.status.label(),
            expense_status = expense_status.label(),
            "approval decided"
        );

        Ok(DecisionOutcome {
            approval,
            expense_status,
        })
    }
}

/// Error raised by the approval workflow.
#[derive(Debug, thiserror::Error)]
pub enum WorkflowError {
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}
