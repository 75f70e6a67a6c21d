use crate::workflows::expenses::analytics::SpendRecord;
use crate::workflows::expenses::domain::{ExpenseCategory, ExpenseStatus, RiskLevel, UserId};
use chrono::{DateTime, NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer};
use std::io::Read;
use std::str::FromStr;

use super::LedgerImportError;

/// One exported expense, already validated.
#[derive(Debug, Clone, PartialEq)]
pub struct LedgerEntry {
    pub owner_id: UserId,
    pub amount: Decimal,
    pub currency: String,
    pub converted_amount: Option<Decimal>,
    pub description: String,
    pub risk_level: Option<RiskLevel>,
    pub record: SpendRecord,
}

pub(crate) fn parse_entries<R: Read>(reader: R) -> Result<Vec<LedgerEntry>, LedgerImportError> {
    let mut csv_reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);
    let mut entries = Vec::new();

    for (index, row) in csv_reader.deserialize::<LedgerRow>().enumerate() {
        // Header is line 1.
        let line = index + 2;
        let row = row?;
        entries.push(row.into_entry(line)?);
    }

    Ok(entries)
}

#[derive(Debug, Deserialize)]
struct LedgerRow {
    owner_id: u64,
    amount: String,
    currency: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    converted_amount: Option<String>,
    category: String,
    #[serde(default)]
    description: String,
    expense_date: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    vendor: Option<String>,
    status: String,
    #[serde(default, deserialize_with = "empty_string_as_none")]
    risk_level: Option<String>,
}

impl LedgerRow {
    fn into_entry(self, line: usize) -> Result<LedgerEntry, LedgerImportError> {
        let invalid = |message: String| LedgerImportError::Row { line, message };

        let amount = parse_decimal(&self.amount)
            .ok_or_else(|| invalid(format!("invalid amount {:?}", self.amount)))?;
        let converted_amount = match self.converted_amount.as_deref() {
            Some(raw) => Some(
                parse_decimal(raw)
                    .ok_or_else(|| invalid(format!("invalid converted_amount {raw:?}")))?,
            ),
            None => None,
        };
        let category = ExpenseCategory::parse(&self.category)
            .ok_or_else(|| invalid(format!("unknown category {:?}", self.category)))?;
        let status = parse_status(&self.status)
            .ok_or_else(|| invalid(format!("unknown status {:?}", self.status)))?;
        let expense_date = parse_datetime(&self.expense_date)
            .ok_or_else(|| invalid(format!("invalid expense_date {:?}", self.expense_date)))?;
        let risk_level = match self.risk_level.as_deref() {
            Some(raw) => Some(
                RiskLevel::parse(raw)
                    .ok_or_else(|| invalid(format!("unknown risk_level {raw:?}")))?,
            ),
            None => None,
        };

        Ok(LedgerEntry {
            owner_id: UserId(self.owner_id),
            amount,
            currency: self.currency.to_ascii_uppercase(),
            converted_amount,
            description: self.description,
            risk_level,
            record: SpendRecord {
                category,
                amount: converted_amount.unwrap_or(Decimal::ZERO),
                expense_date,
                vendor: self.vendor,
                status,
            },
        })
    }
}

fn parse_decimal(raw: &str) -> Option<Decimal> {
    Decimal::from_str(raw.trim()).ok()
}

fn parse_status(raw: &str) -> Option<ExpenseStatus> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "pending" => Some(ExpenseStatus::Pending),
        "approved" => Some(ExpenseStatus::Approved),
        "rejected" => Some(ExpenseStatus::Rejected),
        _ => None,
    }
}

fn empty_string_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt = Option::<String>::deserialize(deserializer)?;
    Ok(opt.filter(|value| !value.trim().is_empty()))
}

pub(crate) fn parse_datetime(value: &str) -> Option<NaiveDateTime> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(trimmed) {
        return Some(dt.naive_utc());
    }

    for format in ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S"] {
        if let Ok(dt) = NaiveDateTime::parse_from_str(trimmed, format) {
            return Some(dt);
        }
    }

    if let Ok(date) = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d") {
        return date.and_hms_opt(0, 0, 0);
    }

    None
}
