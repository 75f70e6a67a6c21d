use chrono::{Datelike, Weekday};

use super::super::domain::Expense;
use super::config::RiskPolicy;
use super::{RiskComponent, RiskFactorKind, RiskSignals};

const HIGH_AMOUNT_POINTS: u8 = 30;
const MEDIUM_HIGH_AMOUNT_POINTS: u8 = 20;
const MEDIUM_AMOUNT_POINTS: u8 = 10;
const DUPLICATE_POINTS: u8 = 25;
const WEEKEND_POINTS: u8 = 15;
const HIGH_FREQUENCY_POINTS: u8 = 20;
const MEDIUM_FREQUENCY_POINTS: u8 = 10;
const MISSING_RECEIPT_POINTS: u8 = 10;

pub(crate) const MAX_SCORE: u8 = 100;

pub(crate) fn score_expense(
    expense: &Expense,
    signals: &RiskSignals,
    policy: &RiskPolicy,
) -> (Vec<RiskComponent>, u8) {
    let mut components = Vec::new();

    if let Some(amount) = expense.converted_amount {
        if amount > policy.high_amount {
            components.push(RiskComponent {
                factor: RiskFactorKind::Amount,
                points: HIGH_AMOUNT_POINTS,
                notes: format!("High amount (>{})", policy.high_amount),
            });
        } else if amount > policy.medium_high_amount {
            components.push(RiskComponent {
                factor: RiskFactorKind::Amount,
                points: MEDIUM_HIGH_AMOUNT_POINTS,
                notes: format!("Medium-high amount (>{})", policy.medium_high_amount),
            });
        } else if amount > policy.medium_amount {
            components.push(RiskComponent {
                factor: RiskFactorKind::Amount,
                points: MEDIUM_AMOUNT_POINTS,
                notes: format!("Medium amount (>{})", policy.medium_amount),
            });
        }
    }

    if signals.duplicate_count > 0 {
        components.push(RiskComponent {
            factor: RiskFactorKind::Duplicate,
            points: DUPLICATE_POINTS,
            notes: format!(
                "Potential duplicate ({} similar expenses)",
                signals.duplicate_count
            ),
        });
    }

    if matches!(expense.expense_date.weekday(), Weekday::Sat | Weekday::Sun) {
        components.push(RiskComponent {
            factor: RiskFactorKind::Weekend,
            points: WEEKEND_POINTS,
            notes: "Weekend expense".to_string(),
        });
    }

    let window = policy.frequency_window_days;
    if signals.recent_submissions > policy.high_frequency {
        components.push(RiskComponent {
            factor: RiskFactorKind::Frequency,
            points: HIGH_FREQUENCY_POINTS,
            notes: format!(
                "High frequency ({} expenses in {window} days)",
                signals.recent_submissions
            ),
        });
    } else if signals.recent_submissions > policy.medium_frequency {
        components.push(RiskComponent {
            factor: RiskFactorKind::Frequency,
            points: MEDIUM_FREQUENCY_POINTS,
            notes: format!(
                "Medium frequency ({} expenses in {window} days)",
                signals.recent_submissions
            ),
        });
    }

    if !expense.has_receipt() {
        components.push(RiskComponent {
            factor: RiskFactorKind::MissingReceipt,
            points: MISSING_RECEIPT_POINTS,
            notes: "No receipt uploaded".to_string(),
        });
    }

    let total: u32 = components
        .iter()
        .map(|component| u32::from(component.points))
        .sum();
    let score = total.min(u32::from(MAX_SCORE)) as u8;

    (components, score)
}
