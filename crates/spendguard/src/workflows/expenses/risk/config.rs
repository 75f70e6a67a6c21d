use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};

/// Thresholds driving the tiered amount and frequency factors.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RiskPolicy {
    pub high_amount: Decimal,
    pub medium_high_amount: Decimal,
    pub medium_amount: Decimal,
    pub high_frequency: usize,
    pub medium_frequency: usize,
    pub frequency_window_days: i64,
}

impl Default for RiskPolicy {
    fn default() -> Self {
        Self {
            high_amount: dec!(10000),
            medium_high_amount: dec!(5000),
            medium_amount: dec!(1000),
            high_frequency: 10,
            medium_frequency: 5,
            frequency_window_days: 7,
        }
    }
}
