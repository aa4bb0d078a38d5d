//! Typed input records and their conversion from untyped tables.
//!
//! Each `from_table` checks the required columns first and only then
//! reads rows. Optional columns (descriptive entity attributes) are
//! picked up when present and never invented when absent.

use crate::{
    error::FlowResult,
    table::{as_number, Cell, Table},
    types::{AccountId, EntityId},
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

// ── Transfers ──────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransferRecord {
    pub transfer_id: Option<i64>,
    pub sender_account_id: Option<AccountId>,
    pub recipient_account_id: Option<AccountId>,
    pub normalised_amount: f64,
}

impl TransferRecord {
    pub const COLUMNS: [&'static str; 4] = [
        "transfer_id",
        "sender_account_id",
        "recipient_account_id",
        "normalised_amount",
    ];

    pub fn new(transfer_id: i64, sender: AccountId, recipient: AccountId, amount: f64) -> Self {
        Self {
            transfer_id: Some(transfer_id),
            sender_account_id: Some(sender),
            recipient_account_id: Some(recipient),
            normalised_amount: amount,
        }
    }

    /// Both ends present.
    pub fn endpoints(&self) -> Option<(AccountId, AccountId)> {
        Some((self.sender_account_id?, self.recipient_account_id?))
    }

    /// Null or non-numeric amounts read as 0.
    pub fn from_table(table: &Table) -> FlowResult<Vec<Self>> {
        table.require(&Self::COLUMNS)?;
        Ok(table
            .iter_rows()
            .map(|row| Self {
                transfer_id: row.id("transfer_id"),
                sender_account_id: row.id("sender_account_id"),
                recipient_account_id: row.id("recipient_account_id"),
                normalised_amount: row.number("normalised_amount").unwrap_or(0.0),
            })
            .collect())
    }
}

// ── Accounts ───────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountRecord {
    pub account_id: AccountId,
    pub entity_id: Option<EntityId>,
}

impl AccountRecord {
    pub const COLUMNS: [&'static str; 2] = ["account_id", "entity_id"];

    /// Rows without a usable account id cannot be mapped and are skipped.
    pub fn from_table(table: &Table) -> FlowResult<Vec<Self>> {
        table.require(&Self::COLUMNS)?;
        Ok(table
            .iter_rows()
            .filter_map(|row| {
                Some(Self {
                    account_id: row.id("account_id")?,
                    entity_id: row.id("entity_id"),
                })
            })
            .collect())
    }
}

// ── Entities ───────────────────────────────────────────────────────

/// A registry entry. `attributes` holds whatever descriptive columns the
/// registry carried (company name, segment, industry, ...), nulls included.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EntityRecord {
    pub entity_id: EntityId,
    #[serde(default)]
    pub attributes: BTreeMap<String, Cell>,
}

impl EntityRecord {
    pub const ID_COLUMN: &'static str = "entity_id";

    pub fn new(entity_id: EntityId) -> Self {
        Self {
            entity_id,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, key: &str, value: impl Into<Cell>) -> Self {
        self.attributes.insert(key.to_string(), value.into());
        self
    }

    pub fn attribute_text(&self, key: &str) -> Option<&str> {
        match self.attributes.get(key) {
            Some(Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
            _ => None,
        }
    }

    /// Every non-id column becomes an attribute.
    pub fn from_table(table: &Table) -> FlowResult<Vec<Self>> {
        table.require(&[Self::ID_COLUMN])?;
        let attribute_columns: Vec<&String> = table
            .columns
            .iter()
            .filter(|c| c.as_str() != Self::ID_COLUMN)
            .collect();
        Ok(table
            .iter_rows()
            .filter_map(|row| {
                let entity_id = row.id(Self::ID_COLUMN)?;
                let attributes = attribute_columns
                    .iter()
                    .map(|c| (c.to_string(), row.get(c).clone()))
                    .collect();
                Some(Self {
                    entity_id,
                    attributes,
                })
            })
            .collect())
    }
}

// ── Counterparty transactions ──────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CounterpartyRole {
    Remitter,
    Beneficiary,
}

impl CounterpartyRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Remitter => "remitter",
            Self::Beneficiary => "beneficiary",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "remitter" => Some(Self::Remitter),
            "beneficiary" => Some(Self::Beneficiary),
            _ => None,
        }
    }
}

impl fmt::Display for CounterpartyRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.as_str())
    }
}

/// A raw amount as it arrived from the source sheet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Amount {
    Numeric(f64),
    Text(String),
    Missing,
}

impl Amount {
    /// Numeric text parses; anything else (blank, garbage, NaN) is 0.
    pub fn value(&self) -> f64 {
        let v = match self {
            Self::Numeric(v) => *v,
            Self::Text(s) => s.trim().parse::<f64>().unwrap_or(0.0),
            Self::Missing => 0.0,
        };
        if v.is_finite() {
            v
        } else {
            0.0
        }
    }

    pub fn is_numeric(&self) -> bool {
        match self {
            Self::Numeric(v) => v.is_finite(),
            Self::Text(s) => s.trim().parse::<f64>().map(f64::is_finite).unwrap_or(false),
            Self::Missing => false,
        }
    }

    fn from_cell(cell: &Cell) -> Self {
        match cell {
            Value::Null => Self::Missing,
            Value::String(s) => Self::Text(s.clone()),
            other => match as_number(other) {
                Some(v) => Self::Numeric(v),
                None => Self::Text(other.to_string()),
            },
        }
    }
}

impl From<f64> for Amount {
    fn from(v: f64) -> Self {
        Self::Numeric(v)
    }
}

impl From<&str> for Amount {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

/// One transaction row seen from one counterparty's side.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterpartyTxn {
    /// Standardised display name from the upstream name normaliser.
    pub name: Option<String>,
    pub role: CounterpartyRole,
    pub amount: Amount,
}

impl CounterpartyTxn {
    pub const COLUMNS: [&'static str; 3] = ["counterparty_name", "role", "amount"];

    pub fn new(name: Option<&str>, role: CounterpartyRole, amount: impl Into<Amount>) -> Self {
        Self {
            name: name.map(str::to_string),
            role,
            amount: amount.into(),
        }
    }

    /// Rows whose role is neither remitter nor beneficiary are skipped;
    /// the count of skipped rows is returned alongside.
    pub fn from_table(table: &Table) -> FlowResult<(Vec<Self>, usize)> {
        table.require(&Self::COLUMNS)?;
        let mut skipped = 0;
        let mut out = Vec::with_capacity(table.len());
        for row in table.iter_rows() {
            let Some(role) = row.text("role").as_deref().and_then(CounterpartyRole::parse) else {
                skipped += 1;
                continue;
            };
            out.push(Self {
                name: row.text("counterparty_name"),
                role,
                amount: Amount::from_cell(row.get("amount")),
            });
        }
        Ok((out, skipped))
    }
}
