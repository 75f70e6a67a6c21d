use std::str::FromStr;

use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

const VENDOR_MAX_CHARS: usize = 50;

static AMOUNT_PATTERN: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[\$€£¥₹]\s*(\d+\.?\d*)").expect("amount pattern compiles"));

static DATE_PATTERNS: Lazy<[Regex; 3]> = Lazy::new(|| {
    [
        Regex::new(r"\d{2}/\d{2}/\d{4}").expect("slash date pattern compiles"),
        Regex::new(r"\d{2}-\d{2}-\d{4}").expect("dash date pattern compiles"),
        Regex::new(r"\d{4}-\d{2}-\d{2}").expect("iso date pattern compiles"),
    ]
});

/// Structured hints pulled out of OCR text. Every field is best effort.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReceiptFields {
    pub text: String,
    pub amount: Option<Decimal>,
    pub date: Option<String>,
    pub vendor: Option<String>,
}

/// Extracts the first symbol-prefixed amount, the first recognizable date, and the
/// first line as vendor.
pub fn parse_receipt_text(text: &str) -> ReceiptFields {
    let amount = AMOUNT_PATTERN
        .captures(text)
        .and_then(|captures| captures.get(1))
        .and_then(|value| Decimal::from_str(value.as_str().trim_end_matches('.')).ok());

    let date = DATE_PATTERNS
        .iter()
        .find_map(|pattern| pattern.find(text))
        .map(|found| found.as_str().to_string());

    let vendor = text
        .lines()
        .next()
        .map(|line| line.trim().chars().take(VENDOR_MAX_CHARS).collect::<String>())
        .filter(|line| !line.is_empty());

    ReceiptFields {
        text: text.to_string(),
        amount,
        date,
        vendor,
    }
}
