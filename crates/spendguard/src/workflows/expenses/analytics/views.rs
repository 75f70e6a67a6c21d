use super::super::domain::{ExpenseCategory, RiskLevel};
use rust_decimal::Decimal;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategorySpendEntry {
    pub category: ExpenseCategory,
    pub category_label: &'static str,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthlySpendEntry {
    pub year: i32,
    pub month: u32,
    pub label: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VendorSpendEntry {
    pub vendor: String,
    pub total: Decimal,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct RiskDistribution {
    pub low: usize,
    pub medium: usize,
    pub high: usize,
}

impl RiskDistribution {
    pub fn from_levels<I>(levels: I) -> Self
    where
        I: IntoIterator<Item = RiskLevel>,
    {
        levels
            .into_iter()
            .fold(Self::default(), |mut distribution, level| {
                match level {
                    RiskLevel::Low => distribution.low += 1,
                    RiskLevel::Medium => distribution.medium += 1,
                    RiskLevel::High => distribution.high += 1,
                }
                distribution
            })
    }

    pub fn count(&self, level: RiskLevel) -> usize {
        match level {
            RiskLevel::Low => self.low,
            RiskLevel::Medium => self.medium,
            RiskLevel::High => self.high,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ApprovalStats {
    pub pending: usize,
    pub approved: usize,
    pub rejected: usize,
}

/// Rollups only; insights and suggestions are derived from this.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpendSummary {
    pub total_spend: Decimal,
    pub category_spend: Vec<CategorySpendEntry>,
    pub monthly_trend: Vec<MonthlySpendEntry>,
    pub risk_distribution: RiskDistribution,
    pub top_vendors: Vec<VendorSpendEntry>,
    pub approval_stats: ApprovalStats,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum InsightKind {
    Forecast,
    Risk,
    Category,
}

impl InsightKind {
    pub const fn label(self) -> &'static str {
        match self {
            Self::Forecast => "Spending Forecast",
            Self::Risk => "High-Risk Alert",
            Self::Category => "Top Spending Category",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardInsight {
    #[serde(rename = "type")]
    pub kind: InsightKind,
    pub title: &'static str,
    pub message: String,
    pub value: Decimal,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SuggestionPriority {
    High,
    Medium,
}

impl SuggestionPriority {
    pub const fn label(self) -> &'static str {
        match self {
            Self::High => "high",
            Self::Medium => "medium",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PolicySuggestion {
    pub title: &'static str,
    pub description: &'static str,
    pub priority: SuggestionPriority,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardReport {
    pub currency: String,
    #[serde(flatten)]
    pub summary: SpendSummary,
    pub insights: Vec<DashboardInsight>,
    pub policy_suggestions: Vec<PolicySuggestion>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct UserStats {
    pub total_submitted: usize,
    pub total_amount: Decimal,
    pub approved: usize,
    pub rejected: usize,
    pub pending: usize,
    /// Percentage of submitted expenses that were approved.
    pub approval_rate: f64,
}
