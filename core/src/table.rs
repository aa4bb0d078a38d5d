//! Untyped tabular boundary.
//!
//! Loaders hand the engine named columns of loosely typed cells.
//! RULE: every conversion from a Table into typed records goes through
//! `Table::require` first, so a missing column is a Schema error and
//! never a silent default.

use crate::error::{FlowError, FlowResult};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A single loosely typed cell.
pub type Cell = Value;

static NULL: Cell = Value::Null;

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Table {
    pub name: String,
    pub columns: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

impl Table {
    pub fn new(name: &str, columns: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            columns: columns.iter().map(|c| c.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn push_row(&mut self, row: Vec<Cell>) {
        self.rows.push(row);
    }

    /// Builder form of `push_row`, handy for fixtures.
    pub fn with_row(mut self, row: Vec<Cell>) -> Self {
        self.rows.push(row);
        self
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.column_index(name).is_some()
    }

    /// Fail with a Schema error listing every required column that is absent.
    pub fn require(&self, required: &[&str]) -> FlowResult<()> {
        let mut missing: Vec<String> = required
            .iter()
            .filter(|c| !self.has_column(c))
            .map(|c| c.to_string())
            .collect();
        if missing.is_empty() {
            return Ok(());
        }
        missing.sort();
        Err(FlowError::Schema {
            table: self.name.clone(),
            missing,
        })
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = Row<'_>> {
        self.rows.iter().map(move |cells| Row { table: self, cells })
    }
}

/// A borrowed view of one row, addressed by column name.
pub struct Row<'a> {
    table: &'a Table,
    cells: &'a [Cell],
}

impl<'a> Row<'a> {
    /// The raw cell, or Null for an unknown column or a short row.
    pub fn get(&self, column: &str) -> &'a Cell {
        self.table
            .column_index(column)
            .and_then(|i| self.cells.get(i))
            .unwrap_or(&NULL)
    }

    /// An integer identifier. Null and anything non-integral read as None.
    pub fn id(&self, column: &str) -> Option<i64> {
        as_id(self.get(column))
    }

    /// A number, or None when the cell is null or not numeric.
    pub fn number(&self, column: &str) -> Option<f64> {
        as_number(self.get(column))
    }

    /// Trimmed non-empty text. Numbers are rendered as text.
    pub fn text(&self, column: &str) -> Option<String> {
        let s = match self.get(column) {
            Value::String(s) => s.trim().to_string(),
            Value::Number(n) => n.to_string(),
            Value::Bool(b) => b.to_string(),
            _ => return None,
        };
        if s.is_empty() {
            None
        } else {
            Some(s)
        }
    }
}

pub fn as_id(cell: &Cell) -> Option<i64> {
    match cell {
        Value::Number(n) => n.as_i64().or_else(|| n.as_f64().and_then(integral)),
        Value::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| s.parse::<f64>().ok().and_then(integral))
        }
        _ => None,
    }
}

pub fn as_number(cell: &Cell) -> Option<f64> {
    let n = match cell {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => s.trim().parse::<f64>().ok()?,
        _ => return None,
    };
    n.is_finite().then_some(n)
}

fn integral(f: f64) -> Option<i64> {
    (f.is_finite() && f.fract() == 0.0).then_some(f as i64)
}
