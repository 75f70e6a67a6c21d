//! Best-effort inputs from outside services: currency conversion, receipt OCR, and
//! category suggestions. Failures here degrade the submission, they never abort it.

mod receipt;

pub use receipt::{parse_receipt_text, ReceiptFields};

use std::collections::HashMap;
use std::sync::Arc;

use rust_decimal::{Decimal, RoundingStrategy};
use tracing::warn;

use super::domain::{ExpenseCategory, ReceiptUpload};

/// Failure of an external collaborator.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UpstreamError {
    #[error("upstream service unavailable: {0}")]
    Unavailable(String),
    #[error("no exchange rate for {0}")]
    UnsupportedCurrency(String),
    #[error("unreadable receipt: {0}")]
    UnreadableReceipt(String),
    #[error("converting {amount} {from} to {to} overflows")]
    ConversionOverflow {
        amount: Decimal,
        from: String,
        to: String,
    },
}

pub trait CurrencyConverter: Send + Sync {
    fn convert(&self, amount: Decimal, from: &str, to: &str) -> Result<Decimal, UpstreamError>;
}

pub trait ReceiptReader: Send + Sync {
    fn extract_text(&self, receipt: &ReceiptUpload) -> Result<String, UpstreamError>;
}

pub trait CategoryClassifier: Send + Sync {
    fn classify(&self, description: &str) -> Result<ExpenseCategory, UpstreamError>;
}

/// Fixed rate table. Each rate is the value of one unit of that currency in `base`.
#[derive(Debug, Clone)]
pub struct StaticRateTable {
    base: String,
    rates: HashMap<String, Decimal>,
}

impl StaticRateTable {
    pub fn new(base: impl Into<String>, rates: impl IntoIterator<Item = (String, Decimal)>) -> Self {
        let base = base.into().to_ascii_uppercase();
        let mut table: HashMap<String, Decimal> = rates
            .into_iter()
            .map(|(code, rate)| (code.to_ascii_uppercase(), rate))
            .collect();
        table.insert(base.clone(), Decimal::ONE);
        Self { base, rates: table }
    }

    pub fn base(&self) -> &str {
        &self.base
    }

    fn rate(&self, code: &str) -> Result<Decimal, UpstreamError> {
        self.rates
            .get(&code.to_ascii_uppercase())
            .copied()
            .filter(|rate| *rate > Decimal::ZERO)
            .ok_or_else(|| UpstreamError::UnsupportedCurrency(code.to_string()))
    }
}

impl CurrencyConverter for StaticRateTable {
    fn convert(&self, amount: Decimal, from: &str, to: &str) -> Result<Decimal, UpstreamError> {
        if from.eq_ignore_ascii_case(to) {
            return Ok(amount);
        }
        let (from_rate, to_rate) = (self.rate(from)?, self.rate(to)?);
        let converted = amount
            .checked_mul(from_rate)
            .and_then(|value| value.checked_div(to_rate))
            .ok_or_else(|| UpstreamError::ConversionOverflow {
                amount,
                from: from.to_string(),
                to: to.to_string(),
            })?;
        Ok(converted.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }
}

/// Treats the uploaded bytes as already-recognized UTF-8 text.
#[derive(Debug, Clone, Copy, Default)]
pub struct PlainTextReceiptReader;

impl ReceiptReader for PlainTextReceiptReader {
    fn extract_text(&self, receipt: &ReceiptUpload) -> Result<String, UpstreamError> {
        String::from_utf8(receipt.content.clone())
            .map_err(|err| UpstreamError::UnreadableReceipt(err.to_string()))
    }
}

/// Keyword matcher used when no NLP service is wired in.
#[derive(Debug, Clone, Copy, Default)]
pub struct KeywordClassifier;

const CATEGORY_KEYWORDS: [(ExpenseCategory, &[&str]); 9] = [
    (
        ExpenseCategory::Travel,
        &["flight", "airfare", "airline", "travel", "trip", "visa"],
    ),
    (
        ExpenseCategory::Accommodation,
        &["hotel", "lodging", "airbnb", "motel", "accommodation"],
    ),
    (
        ExpenseCategory::Meals,
        &["lunch", "dinner", "breakfast", "meal", "coffee", "restaurant"],
    ),
    (
        ExpenseCategory::Transportation,
        &["taxi", "uber", "lyft", "train", "parking", "fuel", "mileage"],
    ),
    (
        ExpenseCategory::OfficeSupplies,
        &["paper", "printer", "stationery", "toner", "supplies"],
    ),
    (
        ExpenseCategory::Entertainment,
        &["client event", "tickets", "concert", "entertainment"],
    ),
    (
        ExpenseCategory::Utilities,
        &["internet", "phone bill", "electricity", "utility"],
    ),
    (
        ExpenseCategory::Software,
        &["license", "subscription", "saas", "software"],
    ),
    (
        ExpenseCategory::Training,
        &["course", "conference", "training", "workshop", "certification"],
    ),
];

impl CategoryClassifier for KeywordClassifier {
    fn classify(&self, description: &str) -> Result<ExpenseCategory, UpstreamError> {
        let lowered = description.to_lowercase();
        Ok(CATEGORY_KEYWORDS
            .iter()
            .find(|(_, keywords)| keywords.iter().any(|keyword| lowered.contains(keyword)))
            .map(|(category, _)| *category)
            .unwrap_or(ExpenseCategory::Other))
    }
}

/// Collaborators bundle with the local fallbacks applied on failure.
#[derive(Clone)]
pub struct Enrichment {
    converter: Arc<dyn CurrencyConverter>,
    receipts: Arc<dyn ReceiptReader>,
    classifier: Arc<dyn CategoryClassifier>,
}

impl Enrichment {
    pub fn new(
        converter: Arc<dyn CurrencyConverter>,
        receipts: Arc<dyn ReceiptReader>,
        classifier: Arc<dyn CategoryClassifier>,
    ) -> Self {
        Self {
            converter,
            receipts,
            classifier,
        }
    }

    /// Local-only collaborators backed by a static rate table.
    pub fn local(rates: StaticRateTable) -> Self {
        Self::new(
            Arc::new(rates),
            Arc::new(PlainTextReceiptReader),
            Arc::new(KeywordClassifier),
        )
    }

    /// Falls back to the unconverted amount.
    pub fn convert_or_identity(&self, amount: Decimal, from: &str, to: &str) -> Decimal {
        match self.converter.convert(amount, from, to) {
            Ok(converted) => converted,
            Err(err) => {
                warn!(%from, %to, error = %err, "currency conversion failed; keeping original amount");
                amount
            }
        }
    }

    /// Falls back to empty fields.
    pub fn receipt_fields(&self, receipt: &ReceiptUpload) -> ReceiptFields {
        match self.receipts.extract_text(receipt) {
            Ok(text) => parse_receipt_text(&text),
            Err(err) => {
                warn!(storage_key = %receipt.storage_key, error = %err, "receipt OCR failed");
                ReceiptFields::default()
            }
        }
    }

    /// Falls back to `Other`.
    pub fn suggest_category(&self, description: &str) -> ExpenseCategory {
        match self.classifier.classify(description) {
            Ok(category) => category,
            Err(err) => {
                warn!(error = %err, "category classification failed");
                ExpenseCategory::Other
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    struct OfflineConverter;

    impl CurrencyConverter for OfflineConverter {
        fn convert(&self, _: Decimal, _: &str, _: &str) -> Result<Decimal, UpstreamError> {
            Err(UpstreamError::Unavailable("timeout".to_string()))
        }
    }

    struct OfflineReader;

    impl ReceiptReader for OfflineReader {
        fn extract_text(&self, _: &ReceiptUpload) -> Result<String, UpstreamError> {
            Err(UpstreamError::Unavailable("timeout".to_string()))
        }
    }

    struct OfflineClassifier;

    impl CategoryClassifier for OfflineClassifier {
        fn classify(&self, _: &str) -> Result<ExpenseCategory, UpstreamError> {
            Err(UpstreamError::Unavailable("timeout".to_string()))
        }
    }

    fn receipt(content: &[u8]) -> ReceiptUpload {
        ReceiptUpload {
            storage_key: "receipts/1.txt".to_string(),
            content: content.to_vec(),
        }
    }

    #[test]
    fn static_rates_convert_through_the_base_currency() {
        let table = StaticRateTable::new(
            "usd",
            vec![
                ("EUR".to_string(), dec!(1.10)),
                ("GBP".to_string(), dec!(1.25)),
            ],
        );
        assert_eq!(table.base(), "USD");
        assert_eq!(table.convert(dec!(100), "EUR", "USD"), Ok(dec!(110.00)));
        assert_eq!(table.convert(dec!(110), "USD", "EUR"), Ok(dec!(100.00)));
        assert_eq!(table.convert(dec!(100), "EUR", "GBP"), Ok(dec!(88.00)));
        assert_eq!(table.convert(dec!(42), "JPY", "JPY"), Ok(dec!(42)));
        assert_eq!(
            table.convert(dec!(1), "JPY", "USD"),
            Err(UpstreamError::UnsupportedCurrency("JPY".to_string()))
        );
    }

    #[test]
    fn oversized_conversions_fail_instead_of_panicking() {
        let table = StaticRateTable::new("USD", vec![("EUR".to_string(), dec!(1000))]);
        let amount = Decimal::MAX / dec!(10);

        assert_eq!(
            table.convert(amount, "EUR", "USD"),
            Err(UpstreamError::ConversionOverflow {
                amount,
                from: "EUR".to_string(),
                to: "USD".to_string(),
            })
        );

        let enrichment = Enrichment::local(table);
        assert_eq!(enrichment.convert_or_identity(amount, "EUR", "USD"), amount);
    }

    #[test]
    fn failures_fall_back_to_documented_defaults() {
        let enrichment = Enrichment::new(
            Arc::new(OfflineConverter),
            Arc::new(OfflineReader),
            Arc::new(OfflineClassifier),
        );

        assert_eq!(
            enrichment.convert_or_identity(dec!(250), "EUR", "USD"),
            dec!(250)
        );
        assert_eq!(
            enrichment.receipt_fields(&receipt(b"ACME\n$12.00")),
            ReceiptFields::default()
        );
        assert_eq!(
            enrichment.suggest_category("Flight to Berlin"),
            ExpenseCategory::Other
        );
    }

    #[test]
    fn local_collaborators_parse_and_classify() {
        let enrichment = Enrichment::local(StaticRateTable::new("USD", Vec::new()));
        let fields = enrichment.receipt_fields(&receipt(b"Grand Hotel\nTotal $310.40"));
        assert_eq!(fields.vendor.as_deref(), Some("Grand Hotel"));
        assert_eq!(fields.amount, Some(dec!(310.40)));

        let invalid = enrichment.receipt_fields(&receipt(&[0xff, 0xfe]));
        assert_eq!(invalid, ReceiptFields::default());

        assert_eq!(
            enrichment.suggest_category("Hotel stay for onsite"),
            ExpenseCategory::Accommodation
        );
        assert_eq!(
            enrichment.suggest_category("Team offsite snacks"),
            ExpenseCategory::Other
        );
    }
}
