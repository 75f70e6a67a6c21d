use super::super::domain::{ExpenseCategory, RiskLevel};
use super::views::{
    CategorySpendEntry, DashboardInsight, InsightKind, PolicySuggestion, SpendSummary,
    SuggestionPriority,
};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;

const FORECAST_MONTHS: usize = 3;
const FORECAST_GROWTH: Decimal = dec!(1.1);
const HIGH_RISK_SUGGESTION_THRESHOLD: usize = 5;
const TRAVEL_SHARE_THRESHOLD: Decimal = dec!(0.4);

pub(crate) fn generate_insights(summary: &SpendSummary, currency: &str) -> Vec<DashboardInsight> {
    let mut insights = Vec::new();

    let trend = &summary.monthly_trend;
    if trend.len() >= FORECAST_MONTHS {
        let recent = trend[trend.len() - FORECAST_MONTHS..]
            .iter()
            .fold(Decimal::ZERO, |sum, entry| sum.saturating_add(entry.total));
        let forecast = (recent / Decimal::from(FORECAST_MONTHS as u64))
            .saturating_mul(FORECAST_GROWTH)
            .round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
        insights.push(DashboardInsight {
            kind: InsightKind::Forecast,
            title: InsightKind::Forecast.label(),
            message: format!(
                "Based on recent trends, projected spend next month: {currency} {forecast:.2}"
            ),
            value: forecast,
        });
    }

    let high_risk = summary.risk_distribution.count(RiskLevel::High);
    if high_risk > 0 {
        insights.push(DashboardInsight {
            kind: InsightKind::Risk,
            title: InsightKind::Risk.label(),
            message: format!("{high_risk} expenses flagged as high-risk. Review recommended."),
            value: Decimal::from(high_risk as u64),
        });
    }

    // First category in display order wins ties.
    let top_category = summary
        .category_spend
        .iter()
        .fold(None, |best: Option<&CategorySpendEntry>, entry| match best {
            Some(current) if current.total >= entry.total => Some(current),
            _ => Some(entry),
        });
    if let Some(entry) = top_category {
        insights.push(DashboardInsight {
            kind: InsightKind::Category,
            title: InsightKind::Category.label(),
            message: format!(
                "{} accounts for {currency} {:.2}",
                entry.category_label, entry.total
            ),
            value: entry.total,
        });
    }

    insights
}

pub(crate) fn policy_suggestions(summary: &SpendSummary) -> Vec<PolicySuggestion> {
    let mut suggestions = Vec::new();

    if summary.risk_distribution.count(RiskLevel::High) > HIGH_RISK_SUGGESTION_THRESHOLD {
        suggestions.push(PolicySuggestion {
            title: "Strengthen Approval Rules",
            description:
                "Consider adding additional approval steps for expenses over a certain threshold.",
            priority: SuggestionPriority::High,
        });
    }

    let travel_spend = summary
        .category_spend
        .iter()
        .find(|entry| entry.category == ExpenseCategory::Travel)
        .map_or(Decimal::ZERO, |entry| entry.total);
    if travel_spend > summary.total_spend.saturating_mul(TRAVEL_SHARE_THRESHOLD) {
        suggestions.push(PolicySuggestion {
            title: "Travel Policy Review",
            description:
                "Travel expenses are 40%+ of total spend. Review travel policy for optimization.",
            priority: SuggestionPriority::Medium,
        });
    }

    suggestions
}
