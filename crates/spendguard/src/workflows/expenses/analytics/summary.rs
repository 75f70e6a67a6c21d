use super::super::domain::{Expense, ExpenseCategory, ExpenseStatus, RiskLevel};
use super::views::{
    ApprovalStats, CategorySpendEntry, MonthlySpendEntry, RiskDistribution, SpendSummary,
    VendorSpendEntry,
};
use chrono::{Datelike, Duration, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use std::collections::{BTreeMap, HashMap};

pub(crate) const TREND_WINDOW_DAYS: i64 = 180;
pub(crate) const TOP_VENDOR_LIMIT: usize = 5;

/// Fields the dashboard reads from an expense, in the reporting currency.
#[derive(Debug, Clone, PartialEq)]
pub struct SpendRecord {
    pub category: ExpenseCategory,
    /// Converted amount; records without a conversion carry zero.
    pub amount: Decimal,
    pub expense_date: NaiveDateTime,
    pub vendor: Option<String>,
    pub status: ExpenseStatus,
}

impl From<&Expense> for SpendRecord {
    fn from(expense: &Expense) -> Self {
        Self {
            category: expense.category,
            amount: expense.reporting_amount(),
            expense_date: expense.expense_date,
            vendor: expense.vendor.clone(),
            status: expense.status,
        }
    }
}

#[derive(Debug, Default)]
pub struct SpendRollup {
    pub total_spend: Decimal,
    pub by_category: HashMap<ExpenseCategory, Decimal>,
    pub by_month: BTreeMap<(i32, u32), Decimal>,
    pub by_vendor: HashMap<String, Decimal>,
    pub approval_stats: ApprovalStats,
    pub risk_distribution: RiskDistribution,
}

impl SpendRollup {
    pub fn collect<'a, I, L>(records: I, risk_levels: L, today: NaiveDate) -> Self
    where
        I: IntoIterator<Item = &'a SpendRecord>,
        L: IntoIterator<Item = RiskLevel>,
    {
        let trend_start = today - Duration::days(TREND_WINDOW_DAYS);
        let mut rollup = Self {
            risk_distribution: RiskDistribution::from_levels(risk_levels),
            ..Self::default()
        };

        for record in records {
            let amount = record.amount;
            accumulate(&mut rollup.total_spend, amount);
            accumulate(rollup.by_category.entry(record.category).or_default(), amount);

            let date = record.expense_date.date();
            if date >= trend_start {
                accumulate(
                    rollup
                        .by_month
                        .entry((date.year(), date.month()))
                        .or_default(),
                    amount,
                );
            }

            if let Some(vendor) = &record.vendor {
                accumulate(rollup.by_vendor.entry(vendor.clone()).or_default(), amount);
            }

            match record.status {
                ExpenseStatus::Pending => rollup.approval_stats.pending += 1,
                ExpenseStatus::Approved => rollup.approval_stats.approved += 1,
                ExpenseStatus::Rejected => rollup.approval_stats.rejected += 1,
            }
        }

        rollup
    }

    pub fn summary(&self) -> SpendSummary {
        let category_spend = ExpenseCategory::ordered()
            .into_iter()
            .filter_map(|category| {
                self.by_category
                    .get(&category)
                    .map(|total| CategorySpendEntry {
                        category,
                        category_label: category.label(),
                        total: *total,
                    })
            })
            .collect();

        let monthly_trend = self
            .by_month
            .iter()
            .map(|(&(year, month), total)| MonthlySpendEntry {
                year,
                month,
                label: format!("{year:04}-{month:02}"),
                total: *total,
            })
            .collect();

        let mut top_vendors: Vec<VendorSpendEntry> = self
            .by_vendor
            .iter()
            .map(|(vendor, total)| VendorSpendEntry {
                vendor: vendor.clone(),
                total: *total,
            })
            .collect();
        top_vendors.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.vendor.cmp(&b.vendor)));
        top_vendors.truncate(TOP_VENDOR_LIMIT);

        SpendSummary {
            total_spend: self.total_spend,
            category_spend,
            monthly_trend,
            risk_distribution: self.risk_distribution,
            top_vendors,
            approval_stats: self.approval_stats,
        }
    }
}

/// Totals pin at `Decimal::MAX` instead of overflowing.
fn accumulate(total: &mut Decimal, amount: Decimal) {
    *total = total.saturating_add(amount);
}
