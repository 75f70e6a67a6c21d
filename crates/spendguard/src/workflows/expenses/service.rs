use std::sync::Arc;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::Serialize;
use tracing::{debug, info};

use super::analytics::{self, DashboardReport, SpendRecord, UserStats};
use super::approvals::{
    ApprovalRoute, ApprovalWorkflow, DecisionOutcome, DecisionRequest, WorkflowError,
};
use super::authorization::{can_manage_users, can_update_expense, can_view_expense, ExpenseScope};
use super::clock::{Clock, SystemClock};
use super::domain::{
    Approval, ApprovalDecision, ApprovalId, ApprovalStatus, CompanyId, Expense, ExpenseId,
    ExpenseSubmission, ExpenseUpdate, NewExpense, NewUser, Principal, RiskLevel, RiskScore, Role,
    User, UserId, UserUpdate,
};
use super::enrichment::{Enrichment, StaticRateTable};
use super::messaging::MessageComposer;
use super::repository::{ExpenseFilter, ExpenseQueries, ExpenseStore, RepositoryError};
use super::risk::{RiskEngine, RiskPolicy};
use crate::config::ExpenseConfig;

/// Service-wide defaults.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpenseSettings {
    /// Reporting currency used when the submitter's company is not on file.
    pub default_currency: String,
}

impl Default for ExpenseSettings {
    fn default() -> Self {
        Self {
            default_currency: "USD".to_string(),
        }
    }
}

/// Everything created by one submission.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SubmissionReceipt {
    pub expense: Expense,
    pub risk_score: RiskScore,
    pub approvals: Vec<Approval>,
    pub message: String,
}

/// Risk score with the gamified message for the viewer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RiskView {
    pub expense_id: ExpenseId,
    pub score: u8,
    pub risk_level: RiskLevel,
    pub factors: Vec<String>,
    pub message: String,
}

/// Approval awaiting the caller, with what the approver needs to decide.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PendingApproval {
    pub approval: Approval,
    pub expense: Expense,
    pub submitter: Option<User>,
}

/// Composes the store, risk engine, approval workflow, enrichment, and messaging.
pub struct ExpenseService<S> {
    store: Arc<S>,
    engine: RiskEngine,
    workflow: ApprovalWorkflow,
    enrichment: Enrichment,
    messages: MessageComposer,
    clock: Arc<dyn Clock>,
    settings: ExpenseSettings,
}

impl<S> ExpenseService<S>
where
    S: ExpenseStore + 'static,
{
    pub fn new(
        store: Arc<S>,
        enrichment: Enrichment,
        messages: MessageComposer,
        settings: ExpenseSettings,
    ) -> Self {
        Self {
            store,
            engine: RiskEngine::default(),
            workflow: ApprovalWorkflow::default(),
            enrichment,
            messages,
            clock: Arc::new(SystemClock),
            settings,
        }
    }

    /// Local collaborators, rate table, and message seed taken from configuration.
    pub fn from_config(store: Arc<S>, config: &ExpenseConfig) -> Self {
        let rates = StaticRateTable::new(
            config.reporting_currency.clone(),
            config.fx_rates.iter().cloned(),
        );
        Self::new(
            store,
            Enrichment::local(rates),
            MessageComposer::from_seed(config.message_seed),
            ExpenseSettings {
                default_currency: config.reporting_currency.clone(),
            },
        )
    }

    pub fn with_route(mut self, route: Arc<dyn ApprovalRoute>) -> Self {
        self.workflow = ApprovalWorkflow::new(route);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn with_risk_policy(mut self, policy: RiskPolicy) -> Self {
        self.engine = RiskEngine::new(policy);
        self
    }

    pub fn store(&self) -> &Arc<S> {
        &self.store
    }

    /// Enriches the submission, then stores the expense, its risk score, and its approval
    /// steps in one transaction.
    pub fn submit(
        &self,
        principal: &Principal,
        submission: ExpenseSubmission,
    ) -> Result<SubmissionReceipt, ExpenseServiceError> {
        validate_submission(&submission)?;

        let currency = submission.currency.trim().to_ascii_uppercase();
        let reporting_currency = self.reporting_currency(principal.company_id)?;
        let converted =
            self.enrichment
                .convert_or_identity(submission.amount, &currency, &reporting_currency);

        let receipt_fields = submission
            .receipt
            .as_ref()
            .map(|receipt| self.enrichment.receipt_fields(receipt));
        let vendor = non_blank(submission.vendor)
            .or_else(|| receipt_fields.and_then(|fields| fields.vendor));
        let suggested_category = self.enrichment.suggest_category(&submission.description);

        let now = self.clock.now();
        let draft = NewExpense {
            owner_id: principal.id,
            company_id: principal.company_id,
            amount: submission.amount,
            currency,
            converted_amount: Some(converted),
            category: submission.category,
            description: submission.description.trim().to_string(),
            expense_date: submission.expense_date,
            vendor,
            receipt_key: submission.receipt.map(|receipt| receipt.storage_key),
            suggested_category: Some(suggested_category),
            created_at: now,
        };

        let (expense, risk_score, approvals) =
            self.store
                .transaction(|tx| -> Result<_, ExpenseServiceError> {
                    let expense = tx.insert_expense(draft)?;
                    let assessment = self.engine.assess(&expense, &*tx, now)?;
                    let risk_score = tx.insert_risk_score(assessment.to_record(&expense, now))?;
                    let approvals = self.workflow.initiate(tx, &expense, principal, now)?;
                    Ok((expense, risk_score, approvals))
                })?;

        info!(
            expense_id = expense.id.0,
            owner_id = principal.id.0,
            score = risk_score.score,
            risk_level = risk_score.risk_level.label(),
            approval_steps = approvals.len(),
            "expense submitted"
        );

        let message = self
            .messages
            .compose(risk_score.risk_level, &principal.display_name);
        Ok(SubmissionReceipt {
            expense,
            risk_score,
            approvals,
            message,
        })
    }

    /// Edits content fields while the expense awaits its first decision. The risk score is
    /// not recomputed.
    pub fn update(
        &self,
        principal: &Principal,
        expense_id: ExpenseId,
        changes: ExpenseUpdate,
    ) -> Result<Expense, ExpenseServiceError> {
        validate_update(&changes)?;

        let current = self.store.read(|queries| find_expense(queries, expense_id))?;
        let reporting_currency = self.reporting_currency(current.company_id)?;
        let converted = changes.amount.map(|amount| {
            self.enrichment
                .convert_or_identity(amount, &current.currency, &reporting_currency)
        });
        let now = self.clock.now();

        self.store.transaction(|tx| {
            let mut expense = find_expense(&*tx, expense_id)?;
            let approvals = tx.approvals_for_expense(expense_id)?;
            can_update_expense(principal, &expense, &approvals)
                .into_result(ExpenseServiceError::PermissionDenied)?;

            if let (Some(amount), Some(converted)) = (changes.amount, converted) {
                expense.amount = amount;
                expense.converted_amount = Some(converted);
            }
            if let Some(category) = changes.category {
                expense.category = category;
            }
            if let Some(description) = changes.description {
                expense.description = description.trim().to_string();
            }
            if let Some(expense_date) = changes.expense_date {
                expense.expense_date = expense_date;
            }
            if let Some(vendor) = changes.vendor {
                expense.vendor = non_blank(Some(vendor));
            }
            expense.updated_at = now;

            tx.update_expense(expense.clone())?;
            debug!(expense_id = expense.id.0, "expense updated");
            Ok(expense)
        })
    }

    pub fn get(
        &self,
        principal: &Principal,
        expense_id: ExpenseId,
    ) -> Result<Expense, ExpenseServiceError> {
        self.store.read(|queries| visible_expense(queries, principal, expense_id))
    }

    /// Expenses in the caller's scope, newest first.
    pub fn list(&self, principal: &Principal) -> Result<Vec<Expense>, ExpenseServiceError> {
        self.store.read(|queries| {
            let reports = if principal.role == Role::Manager {
                queries.direct_reports(principal.id)?
            } else {
                Vec::new()
            };
            let scope = ExpenseScope::for_principal(principal, &reports);
            Ok(queries.expenses(&scope.filter())?)
        })
    }

    pub fn risk_view(
        &self,
        principal: &Principal,
        expense_id: ExpenseId,
    ) -> Result<RiskView, ExpenseServiceError> {
        let score = self.store.read(|queries| {
            visible_expense(queries, principal, expense_id)?;
            queries
                .risk_score_for(expense_id)?
                .ok_or(ExpenseServiceError::NotFound("risk score"))
        })?;

        let message = self
            .messages
            .compose(score.risk_level, &principal.display_name);
        Ok(RiskView {
            expense_id,
            score: score.score,
            risk_level: score.risk_level,
            factors: score.factors,
            message,
        })
    }

    pub fn decide(
        &self,
        principal: &Principal,
        approval_id: ApprovalId,
        decision: ApprovalDecision,
        comments: Option<String>,
    ) -> Result<DecisionOutcome, ExpenseServiceError> {
        let request = DecisionRequest {
            approval_id,
            decision,
            comments: non_blank(comments),
        };
        let now = self.clock.now();
        let outcome = self
            .store
            .transaction(|tx| self.workflow.decide(tx, request, principal, now))?;
        Ok(outcome)
    }

    pub fn pending_approvals(
        &self,
        principal: &Principal,
    ) -> Result<Vec<PendingApproval>, ExpenseServiceError> {
        self.store.read(|queries| {
            let approvals =
                queries.approvals_for_approver(principal.id, Some(ApprovalStatus::Pending))?;
            let mut pending = Vec::with_capacity(approvals.len());
            for approval in approvals {
                let expense = find_expense(queries, approval.expense_id)?;
                let submitter = queries.user(expense.owner_id)?;
                pending.push(PendingApproval {
                    approval,
                    expense,
                    submitter,
                });
            }
            Ok(pending)
        })
    }

    /// Approval chain of one expense, ordered by step.
    pub fn expense_approvals(
        &self,
        principal: &Principal,
        expense_id: ExpenseId,
    ) -> Result<Vec<Approval>, ExpenseServiceError> {
        self.store.read(|queries| {
            visible_expense(queries, principal, expense_id)?;
            Ok(queries.approvals_for_expense(expense_id)?)
        })
    }

    pub fn dashboard(&self, principal: &Principal) -> Result<DashboardReport, ExpenseServiceError> {
        let company_id = principal.company_id;
        let currency = self.reporting_currency(company_id)?;
        let (expenses, scores) = self.store.read(|queries| {
            let expenses = queries.expenses(&ExpenseFilter::company(company_id))?;
            let scores = queries.risk_scores_for_company(company_id)?;
            Ok::<_, ExpenseServiceError>((expenses, scores))
        })?;

        let records: Vec<SpendRecord> = expenses.iter().map(SpendRecord::from).collect();
        Ok(analytics::dashboard(
            &records,
            scores.iter().map(|score| score.risk_level),
            &currency,
            self.clock.today(),
        ))
    }

    pub fn user_stats(&self, principal: &Principal) -> Result<UserStats, ExpenseServiceError> {
        let expenses = self.store.read(|queries| {
            Ok::<_, ExpenseServiceError>(queries.expenses(&ExpenseFilter::owner(principal.id))?)
        })?;
        Ok(analytics::user_stats(&expenses))
    }

    /// Members of the admin's company ordered by id.
    pub fn list_users(&self, principal: &Principal) -> Result<Vec<User>, ExpenseServiceError> {
        can_manage_users(principal).into_result(ExpenseServiceError::PermissionDenied)?;
        self.store
            .read(|queries| Ok(queries.users_in_company(principal.company_id)?))
    }

    /// Adds a member to the admin's company.
    pub fn create_user(
        &self,
        principal: &Principal,
        user: NewUser,
    ) -> Result<User, ExpenseServiceError> {
        can_manage_users(principal).into_result(ExpenseServiceError::PermissionDenied)?;
        let full_name = user.full_name.trim().to_string();
        if full_name.is_empty() {
            return Err(ExpenseServiceError::Validation(
                "full_name must not be empty".to_string(),
            ));
        }

        let created = self.store.transaction(|tx| {
            validate_manager(&*tx, principal.company_id, None, user.manager_id)?;
            Ok::<_, ExpenseServiceError>(tx.insert_user(
                principal.company_id,
                NewUser { full_name, ..user },
            )?)
        })?;
        info!(
            user_id = created.id.0,
            role = created.role.label(),
            admin_id = principal.id.0,
            "user created"
        );
        Ok(created)
    }

    /// Replaces the role and manager of a member of the admin's company.
    pub fn update_user(
        &self,
        principal: &Principal,
        user_id: UserId,
        update: UserUpdate,
    ) -> Result<User, ExpenseServiceError> {
        can_manage_users(principal).into_result(ExpenseServiceError::PermissionDenied)?;
        let updated = self.store.transaction(|tx| {
            let mut user = tx
                .user(user_id)?
                .filter(|user| user.company_id == principal.company_id)
                .ok_or(ExpenseServiceError::NotFound("user"))?;
            validate_manager(&*tx, principal.company_id, Some(user_id), update.manager_id)?;
            user.role = update.role;
            user.manager_id = update.manager_id;
            tx.update_user(user.clone())?;
            Ok::<_, ExpenseServiceError>(user)
        })?;
        info!(
            user_id = updated.id.0,
            role = updated.role.label(),
            admin_id = principal.id.0,
            "user updated"
        );
        Ok(updated)
    }

    fn reporting_currency(&self, company_id: CompanyId) -> Result<String, ExpenseServiceError> {
        let company = self.store.read(|queries| {
            Ok::<_, ExpenseServiceError>(queries.company(company_id)?)
        })?;
        Ok(company
            .map(|company| company.currency)
            .unwrap_or_else(|| self.settings.default_currency.clone()))
    }
}

fn find_expense<Q>(queries: &Q, expense_id: ExpenseId) -> Result<Expense, ExpenseServiceError>
where
    Q: ExpenseQueries + ?Sized,
{
    queries
        .expense(expense_id)?
        .ok_or(ExpenseServiceError::NotFound("expense"))
}

fn visible_expense<Q>(
    queries: &Q,
    principal: &Principal,
    expense_id: ExpenseId,
) -> Result<Expense, ExpenseServiceError>
where
    Q: ExpenseQueries + ?Sized,
{
    let expense = find_expense(queries, expense_id)?;
    can_view_expense(principal, &expense).into_result(ExpenseServiceError::PermissionDenied)?;
    Ok(expense)
}

/// A manager must be another member of the same company.
fn validate_manager<Q>(
    queries: &Q,
    company_id: CompanyId,
    user_id: Option<UserId>,
    manager_id: Option<UserId>,
) -> Result<(), ExpenseServiceError>
where
    Q: ExpenseQueries + ?Sized,
{
    let Some(manager_id) = manager_id else {
        return Ok(());
    };
    if user_id == Some(manager_id) {
        return Err(ExpenseServiceError::Validation(
            "a user cannot manage themselves".to_string(),
        ));
    }
    match queries.user(manager_id)? {
        Some(manager) if manager.company_id == company_id => Ok(()),
        _ => Err(ExpenseServiceError::Validation(format!(
            "manager {} is not a member of this company",
            manager_id.0
        ))),
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|value| value.trim().to_string())
        .filter(|value| !value.is_empty())
}

/// Largest amount accepted on submit or update.
pub const MAX_EXPENSE_AMOUNT: Decimal = dec!(1000000000000);

fn validate_amount(amount: Decimal) -> Result<(), ExpenseServiceError> {
    if amount <= Decimal::ZERO {
        return Err(ExpenseServiceError::Validation(
            "amount must be positive".to_string(),
        ));
    }
    if amount > MAX_EXPENSE_AMOUNT {
        return Err(ExpenseServiceError::Validation(format!(
            "amount must not exceed {MAX_EXPENSE_AMOUNT}"
        )));
    }
    Ok(())
}

fn validate_currency(code: &str) -> Result<(), ExpenseServiceError> {
    let code = code.trim();
    if code.len() == 3 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Ok(())
    } else {
        Err(ExpenseServiceError::Validation(format!(
            "currency must be a three-letter code, got {code:?}"
        )))
    }
}

fn validate_submission(submission: &ExpenseSubmission) -> Result<(), ExpenseServiceError> {
    validate_amount(submission.amount)?;
    if submission.description.trim().is_empty() {
        return Err(ExpenseServiceError::Validation(
            "description is required".to_string(),
        ));
    }
    validate_currency(&submission.currency)
}

fn validate_update(changes: &ExpenseUpdate) -> Result<(), ExpenseServiceError> {
    if let Some(amount) = changes.amount {
        validate_amount(amount)?;
    }
    if changes
        .description
        .as_deref()
        .is_some_and(|description| description.trim().is_empty())
    {
        return Err(ExpenseServiceError::Validation(
            "description is required".to_string(),
        ));
    }
    Ok(())
}

/// Error raised by the expense service.
#[derive(Debug, thiserror::Error)]
pub enum ExpenseServiceError {
    #[error("validation failed: {0}")]
    Validation(String),
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("invalid state: {0}")]
    InvalidState(String),
    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

impl From<WorkflowError> for ExpenseServiceError {
    fn from(error: WorkflowError) -> Self {
        match error {
            WorkflowError::NotFound(what) => Self::NotFound(what),
            WorkflowError::PermissionDenied(reason) => Self::PermissionDenied(reason),
            WorkflowError::InvalidState(reason) => Self::InvalidState(reason),
            WorkflowError::Repository(error) => Self::Repository(error),
        }
    }
}
