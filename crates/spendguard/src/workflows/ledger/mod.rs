//! Offline dashboard input: expenses exported to CSV, one row per expense.

mod parser;

pub use parser::LedgerEntry;

use crate::workflows::expenses::analytics::{self, DashboardReport, SpendRecord};
use crate::workflows::expenses::domain::RiskLevel;
use chrono::NaiveDate;
use std::io::Read;
use std::path::Path;

#[derive(Debug)]
pub enum LedgerImportError {
    Io(std::io::Error),
    Csv(csv::Error),
    Row { line: usize, message: String },
}

impl std::fmt::Display for LedgerImportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LedgerImportError::Io(err) => write!(f, "failed to read expense export: {}", err),
            LedgerImportError::Csv(err) => write!(f, "invalid expense CSV data: {}", err),
            LedgerImportError::Row { line, message } => {
                write!(f, "invalid expense on line {}: {}", line, message)
            }
        }
    }
}

impl std::error::Error for LedgerImportError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            LedgerImportError::Io(err) => Some(err),
            LedgerImportError::Csv(err) => Some(err),
            LedgerImportError::Row { .. } => None,
        }
    }
}

impl From<std::io::Error> for LedgerImportError {
    fn from(err: std::io::Error) -> Self {
        Self::Io(err)
    }
}

impl From<csv::Error> for LedgerImportError {
    fn from(err: csv::Error) -> Self {
        Self::Csv(err)
    }
}

/// Parsed export ready for the analytics rollups.
#[derive(Debug, Clone, Default)]
pub struct ImportedLedger {
    entries: Vec<LedgerEntry>,
}

impl ImportedLedger {
    pub fn entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn records(&self) -> impl Iterator<Item = &SpendRecord> {
        self.entries.iter().map(|entry| &entry.record)
    }

    pub fn risk_levels(&self) -> impl Iterator<Item = RiskLevel> + '_ {
        self.entries.iter().filter_map(|entry| entry.risk_level)
    }

    pub fn dashboard(&self, currency: &str, today: NaiveDate) -> DashboardReport {
        analytics::dashboard(self.records(), self.risk_levels(), currency, today)
    }
}

pub struct LedgerImporter;

impl LedgerImporter {
    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<ImportedLedger, LedgerImportError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<ImportedLedger, LedgerImportError> {
        let entries = parser::parse_entries(reader)?;
        Ok(ImportedLedger { entries })
    }
}
