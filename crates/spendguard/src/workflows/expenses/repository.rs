use chrono::NaiveDateTime;
use rust_decimal::Decimal;

use super::domain::{
    Approval, ApprovalId, ApprovalStatus, Company, CompanyId, Expense, ExpenseId, ExpenseStatus,
    NewApproval, NewExpense, NewRiskScore, NewUser, RiskScore, User, UserId,
};

/// Equality/range filter over stored expenses. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ExpenseFilter {
    pub company_id: Option<CompanyId>,
    pub owner_ids: Option<Vec<UserId>>,
    pub status: Option<ExpenseStatus>,
    pub amount: Option<Decimal>,
    pub expense_date: Option<NaiveDateTime>,
    pub created_since: Option<NaiveDateTime>,
    pub exclude: Option<ExpenseId>,
}

impl ExpenseFilter {
    pub fn company(company_id: CompanyId) -> Self {
        Self {
            company_id: Some(company_id),
            ..Self::default()
        }
    }

    pub fn owners(owner_ids: Vec<UserId>) -> Self {
        Self {
            owner_ids: Some(owner_ids),
            ..Self::default()
        }
    }

    pub fn owner(owner_id: UserId) -> Self {
        Self::owners(vec![owner_id])
    }

    pub fn with_status(mut self, status: ExpenseStatus) -> Self {
        self.status = Some(status);
        self
    }

    pub fn matches(&self, expense: &Expense) -> bool {
        self.company_id.map_or(true, |id| expense.company_id == id)
            && self
                .owner_ids
                .as_ref()
                .map_or(true, |owners| owners.contains(&expense.owner_id))
            && self.status.map_or(true, |status| expense.status == status)
            && self.amount.map_or(true, |amount| expense.amount == amount)
            && self
                .expense_date
                .map_or(true, |date| expense.expense_date == date)
            && self
                .created_since
                .map_or(true, |since| expense.created_at >= since)
            && self.exclude.map_or(true, |id| expense.id != id)
    }
}

/// Read side of the store.
pub trait ExpenseQueries {
    fn company(&self, id: CompanyId) -> Result<Option<Company>, RepositoryError>;
    fn user(&self, id: UserId) -> Result<Option<User>, RepositoryError>;
    fn direct_reports(&self, manager_id: UserId) -> Result<Vec<User>, RepositoryError>;
    /// Members of one company ordered by id.
    fn users_in_company(&self, company_id: CompanyId) -> Result<Vec<User>, RepositoryError>;
    fn expense(&self, id: ExpenseId) -> Result<Option<Expense>, RepositoryError>;
    /// Matching expenses, newest first.
    fn expenses(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>, RepositoryError>;
    fn count_expenses(&self, filter: &ExpenseFilter) -> Result<usize, RepositoryError>;
    fn risk_score_for(&self, expense_id: ExpenseId) -> Result<Option<RiskScore>, RepositoryError>;
    fn risk_scores_for_company(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<RiskScore>, RepositoryError>;
    fn approval(&self, id: ApprovalId) -> Result<Option<Approval>, RepositoryError>;
    /// Approvals of one expense ordered by workflow step.
    fn approvals_for_expense(&self, expense_id: ExpenseId)
        -> Result<Vec<Approval>, RepositoryError>;
    fn approvals_for_approver(
        &self,
        approver_id: UserId,
        status: Option<ApprovalStatus>,
    ) -> Result<Vec<Approval>, RepositoryError>;
}

/// Write side, only reachable inside [`ExpenseStore::transaction`].
pub trait StoreTransaction: ExpenseQueries {
    fn insert_user(&mut self, company_id: CompanyId, user: NewUser)
        -> Result<User, RepositoryError>;
    fn update_user(&mut self, user: User) -> Result<(), RepositoryError>;
    fn insert_expense(&mut self, expense: NewExpense) -> Result<Expense, RepositoryError>;
    fn update_expense(&mut self, expense: Expense) -> Result<(), RepositoryError>;
    /// Fails with `Conflict` when the expense already carries a score.
    fn insert_risk_score(&mut self, score: NewRiskScore) -> Result<RiskScore, RepositoryError>;
    /// Fails with `Conflict` unless the step is above every existing step of the expense.
    fn insert_approval(&mut self, approval: NewApproval) -> Result<Approval, RepositoryError>;
    fn update_approval(&mut self, approval: Approval) -> Result<(), RepositoryError>;
}

/// Storage abstraction so the service can be exercised against any transactional backend.
///
/// `transaction` must apply every write made by `work` atomically, and none of them when
/// `work` returns an error. Concurrent transactions must not interleave their reads and writes.
pub trait ExpenseStore: Send + Sync {
    fn read<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&dyn ExpenseQueries) -> Result<T, E>,
        E: From<RepositoryError>;

    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTransaction) -> Result<T, E>,
        E: From<RepositoryError>;
}

/// Error enumeration for repository failures.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RepositoryError {
    #[error("record already exists")]
    Conflict,
    #[error("record not found")]
    NotFound,
    #[error("repository unavailable: {0}")]
    Unavailable(String),
}
