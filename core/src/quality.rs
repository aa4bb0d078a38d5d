//! Non-fatal data-quality findings.
//!
//! Nothing here stops a run. Rows are dropped or coerced by the
//! components themselves; this module only counts them so the caller can
//! print a summary.

use crate::{
    graph::AccountRegistry,
    records::TransferRecord,
    table::{as_number, Table},
};
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum DataQualityWarning {
    /// Rows excluded because a sender or recipient id was null.
    MissingIdentifiers { table: String, rows: usize },
    /// Transfers excluded from the entity graph because an account had no owner.
    UnmappedAccounts { rows: usize },
    /// Amount cells that were present but not numeric, counted as 0.
    NonNumericAmounts { table: String, rows: usize },
    /// Counterparty rows whose role was neither remitter nor beneficiary.
    UnknownRoles { rows: usize },
}

impl fmt::Display for DataQualityWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::MissingIdentifiers { table, rows } => {
                write!(f, "{table}: {rows} row(s) dropped for a missing identifier")
            }
            Self::UnmappedAccounts { rows } => {
                write!(f, "transfers: {rows} row(s) dropped for an unmapped account")
            }
            Self::NonNumericAmounts { table, rows } => {
                write!(f, "{table}: {rows} non-numeric amount(s) counted as 0")
            }
            Self::UnknownRoles { rows } => {
                write!(f, "counterparty_transactions: {rows} row(s) with an unknown role skipped")
            }
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataQualityReport {
    pub warnings: Vec<DataQualityWarning>,
}

impl DataQualityReport {
    /// Record a warning only when it actually affected rows.
    pub fn note(&mut self, rows: usize, warning: impl FnOnce(usize) -> DataQualityWarning) {
        if rows > 0 {
            self.warnings.push(warning(rows));
        }
    }

    pub fn is_clean(&self) -> bool {
        self.warnings.is_empty()
    }

    pub fn log(&self) {
        for w in &self.warnings {
            log::warn!("data quality: {w}");
        }
    }
}

pub fn missing_identifier_count(transfers: &[TransferRecord]) -> usize {
    transfers.iter().filter(|t| t.endpoints().is_none()).count()
}

/// Transfers with both ids present where at least one has no owning entity.
pub fn unmapped_transfer_count(transfers: &[TransferRecord], registry: &AccountRegistry) -> usize {
    transfers
        .iter()
        .filter_map(|t| t.endpoints())
        .filter(|(s, r)| registry.resolve(*s).is_none() || registry.resolve(*r).is_none())
        .count()
}

/// Non-null cells in `column` that do not read as a number.
pub fn non_numeric_count(table: &Table, column: &str) -> usize {
    table
        .iter_rows()
        .filter(|row| {
            let cell = row.get(column);
            !cell.is_null() && as_number(cell).is_none()
        })
        .count()
}
