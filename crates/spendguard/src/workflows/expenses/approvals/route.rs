use super::super::domain::{Expense, Principal, UserId};

/// Decides who signs off on an expense, in step order.
///
/// The workflow engine creates one pending approval per returned approver, numbering
/// steps from 1. Chains longer than the manager step are opt-in through a custom route.
pub trait ApprovalRoute: Send + Sync {
    fn approvers(&self, expense: &Expense, submitter: &Principal) -> Vec<UserId>;
}

/// Single manager step; submitters without a manager get no approval rows.
#[derive(Debug, Clone, Copy, Default)]
pub struct ManagerRoute;

impl ApprovalRoute for ManagerRoute {
    fn approvers(&self, _expense: &Expense, submitter: &Principal) -> Vec<UserId> {
        submitter.manager_id.into_iter().collect()
    }
}
