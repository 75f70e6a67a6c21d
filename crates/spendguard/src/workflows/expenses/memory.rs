use std::collections::BTreeMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::domain::{
    Approval, ApprovalId, ApprovalStatus, Company, CompanyId, Expense, ExpenseId, ExpenseStatus,
    NewApproval, NewExpense, NewRiskScore, NewUser, RiskScore, RiskScoreId, User, UserId,
};
use super::repository::{
    ExpenseFilter, ExpenseQueries, ExpenseStore, RepositoryError, StoreTransaction,
};

#[derive(Debug, Default, Clone)]
struct Sequences {
    expense: u64,
    approval: u64,
    risk_score: u64,
}

#[derive(Debug, Default, Clone)]
struct StoreState {
    companies: BTreeMap<CompanyId, Company>,
    users: BTreeMap<UserId, User>,
    expenses: BTreeMap<ExpenseId, Expense>,
    risk_scores: BTreeMap<RiskScoreId, RiskScore>,
    approvals: BTreeMap<ApprovalId, Approval>,
    sequences: Sequences,
}

/// Process-local store. A transaction works on a staged copy under the store lock and
/// swaps it in only when the unit of work succeeds.
///
/// The staged copy is the whole state, so every submit or decision costs time and memory
/// proportional to the number of stored rows.
#[derive(Debug, Default, Clone)]
pub struct InMemoryExpenseStore {
    state: Arc<Mutex<StoreState>>,
}

impl InMemoryExpenseStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register_company(&self, company: Company) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        if guard.companies.contains_key(&company.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.companies.insert(company.id, company);
        Ok(())
    }

    pub fn register_user(&self, user: User) -> Result<(), RepositoryError> {
        let mut guard = self.lock()?;
        if guard.users.contains_key(&user.id) {
            return Err(RepositoryError::Conflict);
        }
        guard.users.insert(user.id, user);
        Ok(())
    }

    fn lock(&self) -> Result<MutexGuard<'_, StoreState>, RepositoryError> {
        self.state
            .lock()
            .map_err(|_| RepositoryError::Unavailable("store mutex poisoned".to_string()))
    }
}

impl ExpenseStore for InMemoryExpenseStore {
    fn read<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&dyn ExpenseQueries) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let guard = self.lock()?;
        work(&*guard)
    }

    fn transaction<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: FnOnce(&mut dyn StoreTransaction) -> Result<T, E>,
        E: From<RepositoryError>,
    {
        let mut guard = self.lock()?;
        let mut staged = guard.clone();
        let value = work(&mut staged)?;
        *guard = staged;
        Ok(value)
    }
}

impl ExpenseQueries for StoreState {
    fn company(&self, id: CompanyId) -> Result<Option<Company>, RepositoryError> {
        Ok(self.companies.get(&id).cloned())
    }

    fn user(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        Ok(self.users.get(&id).cloned())
    }

    fn direct_reports(&self, manager_id: UserId) -> Result<Vec<User>, RepositoryError> {
        Ok(self
            .users
            .values()
            .filter(|user| user.manager_id == Some(manager_id))
            .cloned()
            .collect())
    }

    fn users_in_company(&self, company_id: CompanyId) -> Result<Vec<User>, RepositoryError> {
        Ok(self
            .users
            .values()
            .filter(|user| user.company_id == company_id)
            .cloned()
            .collect())
    }

    fn expense(&self, id: ExpenseId) -> Result<Option<Expense>, RepositoryError> {
        Ok(self.expenses.get(&id).cloned())
    }

    fn expenses(&self, filter: &ExpenseFilter) -> Result<Vec<Expense>, RepositoryError> {
        let mut matches: Vec<Expense> = self
            .expenses
            .values()
            .filter(|expense| filter.matches(expense))
            .cloned()
            .collect();
        matches.sort_by(|a, b| b.created_at.cmp(&a.created_at).then(b.id.cmp(&a.id)));
        Ok(matches)
    }

    fn count_expenses(&self, filter: &ExpenseFilter) -> Result<usize, RepositoryError> {
        Ok(self
            .expenses
            .values()
            .filter(|expense| filter.matches(expense))
            .count())
    }

    fn risk_score_for(&self, expense_id: ExpenseId) -> Result<Option<RiskScore>, RepositoryError> {
        Ok(self
            .risk_scores
            .values()
            .find(|score| score.expense_id == expense_id)
            .cloned())
    }

    fn risk_scores_for_company(
        &self,
        company_id: CompanyId,
    ) -> Result<Vec<RiskScore>, RepositoryError> {
        Ok(self
            .risk_scores
            .values()
            .filter(|score| {
                self.expenses
                    .get(&score.expense_id)
                    .is_some_and(|expense| expense.company_id == company_id)
            })
            .cloned()
            .collect())
    }

    fn approval(&self, id: ApprovalId) -> Result<Option<Approval>, RepositoryError> {
        Ok(self.approvals.get(&id).cloned())
    }

    fn approvals_for_expense(
        &self,
        expense_id: ExpenseId,
    ) -> Result<Vec<Approval>, RepositoryError> {
        let mut approvals: Vec<Approval> = self
            .approvals
            .values()
            .filter(|approval| approval.expense_id == expense_id)
            .cloned()
            .collect();
        approvals.sort_by_key(|approval| approval.workflow_step);
        Ok(approvals)
    }

    fn approvals_for_approver(
        &self,
        approver_id: UserId,
        status: Option<ApprovalStatus>,
    ) -> Result<Vec<Approval>, RepositoryError> {
        Ok(self
            .approvals
            .values()
            .filter(|approval| approval.approver_id == approver_id)
            .filter(|approval| status.map_or(true, |status| approval.status == status))
            .cloned()
            .collect())
    }
}

impl StoreTransaction for StoreState {
    fn insert_user(
        &mut self,
        company_id: CompanyId,
        user: NewUser,
    ) -> Result<User, RepositoryError> {
        // Ids continue above the highest registered user.
        let id = UserId(self.users.keys().next_back().map_or(1, |last| last.0 + 1));
        let stored = User {
            id,
            company_id,
            role: user.role,
            manager_id: user.manager_id,
            full_name: user.full_name,
        };
        self.users.insert(id, stored.clone());
        Ok(stored)
    }

    fn update_user(&mut self, user: User) -> Result<(), RepositoryError> {
        match self.users.get_mut(&user.id) {
            Some(slot) => {
                *slot = user;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn insert_expense(&mut self, expense: NewExpense) -> Result<Expense, RepositoryError> {
        self.sequences.expense += 1;
        let id = ExpenseId(self.sequences.expense);
        let stored = Expense {
            id,
            owner_id: expense.owner_id,
            company_id: expense.company_id,
            amount: expense.amount,
            currency: expense.currency,
            converted_amount: expense.converted_amount,
            category: expense.category,
            description: expense.description,
            expense_date: expense.expense_date,
            vendor: expense.vendor,
            receipt_key: expense.receipt_key,
            suggested_category: expense.suggested_category,
            status: ExpenseStatus::Pending,
            created_at: expense.created_at,
            updated_at: expense.created_at,
        };
        self.expenses.insert(id, stored.clone());
        Ok(stored)
    }

    fn update_expense(&mut self, expense: Expense) -> Result<(), RepositoryError> {
        match self.expenses.get_mut(&expense.id) {
            Some(slot) => {
                *slot = expense;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }

    fn insert_risk_score(&mut self, score: NewRiskScore) -> Result<RiskScore, RepositoryError> {
        if !self.expenses.contains_key(&score.expense_id) {
            return Err(RepositoryError::NotFound);
        }
        if self
            .risk_scores
            .values()
            .any(|existing| existing.expense_id == score.expense_id)
        {
            return Err(RepositoryError::Conflict);
        }

        self.sequences.risk_score += 1;
        let id = RiskScoreId(self.sequences.risk_score);
        let stored = RiskScore {
            id,
            expense_id: score.expense_id,
            score: score.score,
            risk_level: score.risk_level,
            factors: score.factors,
            created_at: score.created_at,
        };
        self.risk_scores.insert(id, stored.clone());
        Ok(stored)
    }

    fn insert_approval(&mut self, approval: NewApproval) -> Result<Approval, RepositoryError> {
        if !self.expenses.contains_key(&approval.expense_id) {
            return Err(RepositoryError::NotFound);
        }
        let highest_step = self
            .approvals
            .values()
            .filter(|existing| existing.expense_id == approval.expense_id)
            .map(|existing| existing.workflow_step)
            .max()
            .unwrap_or(0);
        if approval.workflow_step == 0 || approval.workflow_step <= highest_step {
            return Err(RepositoryError::Conflict);
        }

        self.sequences.approval += 1;
        let id = ApprovalId(self.sequences.approval);
        let stored = Approval {
            id,
            expense_id: approval.expense_id,
            approver_id: approval.approver_id,
            workflow_step: approval.workflow_step,
            status: ApprovalStatus::Pending,
            comments: None,
            approved_at: None,
            created_at: approval.created_at,
        };
        self.approvals.insert(id, stored.clone());
        Ok(stored)
    }

    fn update_approval(&mut self, approval: Approval) -> Result<(), RepositoryError> {
        match self.approvals.get_mut(&approval.id) {
            Some(slot) => {
                *slot = approval;
                Ok(())
            }
            None => Err(RepositoryError::NotFound),
        }
    }
}
