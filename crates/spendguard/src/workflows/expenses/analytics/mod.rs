//! Company dashboard rollups and per-user statistics.

mod insights;
mod summary;
pub mod views;

pub use summary::{SpendRecord, SpendRollup};
pub use views::{
    ApprovalStats, CategorySpendEntry, DashboardInsight, DashboardReport, InsightKind,
    MonthlySpendEntry, PolicySuggestion, RiskDistribution, SpendSummary, SuggestionPriority,
    UserStats, VendorSpendEntry,
};

use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::domain::{Expense, ExpenseStatus, RiskLevel};

/// Builds the dashboard for one company's records. Trend months are the calendar months of
/// expenses dated within 180 days of `today`, oldest first.
pub fn dashboard<'a, I, L>(
    records: I,
    risk_levels: L,
    currency: &str,
    today: NaiveDate,
) -> DashboardReport
where
    I: IntoIterator<Item = &'a SpendRecord>,
    L: IntoIterator<Item = RiskLevel>,
{
    let summary = SpendRollup::collect(records, risk_levels, today).summary();
    let insights = insights::generate_insights(&summary, currency);
    let policy_suggestions = insights::policy_suggestions(&summary);
    DashboardReport {
        currency: currency.to_string(),
        summary,
        insights,
        policy_suggestions,
    }
}

pub fn user_stats(expenses: &[Expense]) -> UserStats {
    let count = |status: ExpenseStatus| {
        expenses
            .iter()
            .filter(|expense| expense.status == status)
            .count()
    };
    let total_submitted = expenses.len();
    let approved = count(ExpenseStatus::Approved);
    let approval_rate = if total_submitted == 0 {
        0.0
    } else {
        approved as f64 / total_submitted as f64 * 100.0
    };

    UserStats {
        total_submitted,
        total_amount: expenses
            .iter()
            .map(Expense::reporting_amount)
            .fold(Decimal::ZERO, Decimal::saturating_add),
        approved,
        rejected: count(ExpenseStatus::Rejected),
        pending: count(ExpenseStatus::Pending),
        approval_rate,
    }
}
