mod config;
mod rules;

pub use config::RiskPolicy;

use chrono::{Duration, NaiveDateTime};
use serde::{Deserialize, Serialize};

use super::domain::{Expense, NewRiskScore, RiskLevel, UserId};
use super::repository::{ExpenseFilter, ExpenseQueries, RepositoryError};

/// Store lookups the scoring heuristics depend on.
pub trait RiskLookups {
    /// Other expenses of the same owner with the identical amount and expense date.
    fn duplicate_count(&self, expense: &Expense) -> Result<usize, RepositoryError>;
    /// Expenses the owner created at or after `since`.
    fn submissions_since(
        &self,
        owner_id: UserId,
        since: NaiveDateTime,
    ) -> Result<usize, RepositoryError>;
}

impl<Q> RiskLookups for Q
where
    Q: ExpenseQueries + ?Sized,
{
    fn duplicate_count(&self, expense: &Expense) -> Result<usize, RepositoryError> {
        let filter = ExpenseFilter {
            amount: Some(expense.amount),
            expense_date: Some(expense.expense_date),
            exclude: Some(expense.id),
            ..ExpenseFilter::owner(expense.owner_id)
        };
        self.count_expenses(&filter)
    }

    fn submissions_since(
        &self,
        owner_id: UserId,
        since: NaiveDateTime,
    ) -> Result<usize, RepositoryError> {
        let filter = ExpenseFilter {
            created_since: Some(since),
            ..ExpenseFilter::owner(owner_id)
        };
        self.count_expenses(&filter)
    }
}

/// Lookup results gathered before scoring.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RiskSignals {
    pub duplicate_count: usize,
    pub recent_submissions: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RiskFactorKind {
    Amount,
    Duplicate,
    Weekend,
    Frequency,
    MissingReceipt,
}

/// Discrete contribution to a risk score, kept for audits.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskComponent {
    pub factor: RiskFactorKind,
    pub points: u8,
    pub notes: String,
}

/// Composite score with the factor trail that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RiskAssessment {
    pub score: u8,
    pub risk_level: RiskLevel,
    pub components: Vec<RiskComponent>,
}

impl RiskAssessment {
    pub fn factors(&self) -> Vec<String> {
        self.components
            .iter()
            .map(|component| component.notes.clone())
            .collect()
    }

    pub fn to_record(&self, expense: &Expense, created_at: NaiveDateTime) -> NewRiskScore {
        NewRiskScore {
            expense_id: expense.id,
            score: self.score,
            risk_level: self.risk_level,
            factors: self.factors(),
            created_at,
        }
    }
}

/// Stateless evaluator applying the heuristic factors to an expense.
#[derive(Debug, Clone, Default)]
pub struct RiskEngine {
    policy: RiskPolicy,
}

impl RiskEngine {
    pub fn new(policy: RiskPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RiskPolicy {
        &self.policy
    }

    /// Gathers the duplicate and frequency signals, then scores. Lookup failures propagate.
    pub fn assess<L>(
        &self,
        expense: &Expense,
        lookups: &L,
        now: NaiveDateTime,
    ) -> Result<RiskAssessment, RepositoryError>
    where
        L: RiskLookups + ?Sized,
    {
        let since = now - Duration::days(self.policy.frequency_window_days);
        let signals = RiskSignals {
            duplicate_count: lookups.duplicate_count(expense)?,
            recent_submissions: lookups.submissions_since(expense.owner_id, since)?,
        };
        Ok(self.score(expense, &signals))
    }

    pub fn score(&self, expense: &Expense, signals: &RiskSignals) -> RiskAssessment {
        let (components, score) = rules::score_expense(expense, signals, &self.policy);
        RiskAssessment {
            score,
            risk_level: RiskLevel::from_score(score),
            components,
        }
    }
}
