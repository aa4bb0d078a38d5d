//! Counterparty value/volume classification.
//!
//! Transactions are grouped by (standardised name, role). Blank names go to
//! the "Unknown" bucket. Quadrant cut points are the medians of the scaled
//! value totals and of the volume totals over the rows being classified;
//! a row equal to a median counts as meeting it.

use crate::{
    config::QuadrantConfig,
    records::{CounterpartyRole, CounterpartyTxn},
    sum::CompensatedSum,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;

pub const UNKNOWN_COUNTERPARTY: &str = "Unknown";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CounterpartyAggregate {
    pub name: String,
    pub role: CounterpartyRole,
    pub value_total: f64,
    pub volume_total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Quadrant {
    #[serde(rename = "High Value / High Volume")]
    HighValueHighVolume,
    #[serde(rename = "Low Value / High Volume")]
    LowValueHighVolume,
    #[serde(rename = "High Value / Low Volume")]
    HighValueLowVolume,
    #[serde(rename = "Low Value / Low Volume")]
    LowValueLowVolume,
}

impl Quadrant {
    pub const ALL: [Quadrant; 4] = [
        Self::HighValueHighVolume,
        Self::LowValueHighVolume,
        Self::HighValueLowVolume,
        Self::LowValueLowVolume,
    ];

    pub fn from_flags(high_value: bool, high_volume: bool) -> Self {
        match (high_value, high_volume) {
            (true, true) => Self::HighValueHighVolume,
            (false, true) => Self::LowValueHighVolume,
            (true, false) => Self::HighValueLowVolume,
            (false, false) => Self::LowValueLowVolume,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::HighValueHighVolume => "High Value / High Volume",
            Self::LowValueHighVolume => "Low Value / High Volume",
            Self::HighValueLowVolume => "High Value / Low Volume",
            Self::LowValueLowVolume => "Low Value / Low Volume",
        }
    }
}

impl fmt::Display for Quadrant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassifiedCounterparty {
    pub name: String,
    pub role: CounterpartyRole,
    pub value_total: f64,
    pub volume_total: u64,
    /// value_total / value_scale, the quantity compared to the value median.
    pub value_scaled: f64,
    pub quadrant: Quadrant,
}

/// The cut points used by one classification call.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct QuadrantCuts {
    pub value_median: f64,
    pub volume_median: f64,
}

fn display_name(name: &Option<String>) -> String {
    match name.as_deref().map(str::trim) {
        Some(n) if !n.is_empty() => n.to_string(),
        _ => UNKNOWN_COUNTERPARTY.to_string(),
    }
}

/// Sum value and count rows per (name, role), in (name, role) order.
/// Non-numeric amounts add 0 to the value but still count as volume.
pub fn aggregate_counterparties(txns: &[CounterpartyTxn]) -> Vec<CounterpartyAggregate> {
    let mut groups: BTreeMap<(String, CounterpartyRole), (CompensatedSum, u64)> =
        BTreeMap::new();
    let mut coerced = 0usize;
    for t in txns {
        if !t.amount.is_numeric() {
            coerced += 1;
        }
        let entry = groups.entry((display_name(&t.name), t.role)).or_default();
        entry.0.add(t.amount.value());
        entry.1 += 1;
    }
    if coerced > 0 {
        log::warn!("counterparty aggregation: {coerced} non-numeric amount(s) counted as 0");
    }
    groups
        .into_iter()
        .map(|((name, role), (value, volume))| CounterpartyAggregate {
            name,
            role,
            value_total: value.value(),
            volume_total: volume,
        })
        .collect()
}

/// Median of an unsorted slice; mean of the middle two for even lengths.
pub fn median(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(f64::total_cmp);
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

pub fn quadrant_cuts(aggregates: &[CounterpartyAggregate], config: &QuadrantConfig) -> QuadrantCuts {
    let values: Vec<f64> = aggregates
        .iter()
        .map(|a| a.value_total / config.value_scale)
        .collect();
    let volumes: Vec<f64> = aggregates.iter().map(|a| a.volume_total as f64).collect();
    QuadrantCuts {
        value_median: median(&values),
        volume_median: median(&volumes),
    }
}

/// Classify each aggregate into a quadrant; output sorted by value_total
/// descending (stable).
pub fn classify_counterparty_quadrants(
    aggregates: &[CounterpartyAggregate],
    config: &QuadrantConfig,
) -> Vec<ClassifiedCounterparty> {
    let cuts = quadrant_cuts(aggregates, config);
    let mut rows: Vec<ClassifiedCounterparty> = aggregates
        .iter()
        .map(|a| {
            let value_scaled = a.value_total / config.value_scale;
            ClassifiedCounterparty {
                name: a.name.clone(),
                role: a.role,
                value_total: a.value_total,
                volume_total: a.volume_total,
                value_scaled,
                quadrant: Quadrant::from_flags(
                    value_scaled >= cuts.value_median,
                    a.volume_total as f64 >= cuts.volume_median,
                ),
            }
        })
        .collect();
    rows.sort_by(|a, b| b.value_total.total_cmp(&a.value_total));
    rows
}

pub fn quadrant_counts(rows: &[ClassifiedCounterparty]) -> Vec<(Quadrant, usize)> {
    Quadrant::ALL
        .iter()
        .map(|q| (*q, rows.iter().filter(|r| r.quadrant == *q).count()))
        .collect()
}

// ── Name totals ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NameTotal {
    pub name: String,
    pub amount: f64,
}

/// Total amount per standardised name across both roles, largest first.
pub fn aggregate_totals(txns: &[CounterpartyTxn]) -> Vec<NameTotal> {
    let mut totals: BTreeMap<String, CompensatedSum> = BTreeMap::new();
    for t in txns {
        totals
            .entry(display_name(&t.name))
            .or_default()
            .add(t.amount.value());
    }
    let mut out: Vec<NameTotal> = totals
        .into_iter()
        .map(|(name, amount)| NameTotal {
            name,
            amount: amount.value(),
        })
        .collect();
    out.sort_by(|a, b| b.amount.total_cmp(&a.amount));
    out
}
