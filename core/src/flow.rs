//! Flow aggregation: transfer rows → directional flow pairs.

use crate::{
    error::FlowResult,
    records::TransferRecord,
    sum::CompensatedSum,
    table::Table,
    types::ParticipantId,
};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FlowPair {
    pub source_id: ParticipantId,
    pub destination_id: ParticipantId,
    pub transfer_count: u64,
    pub total_value: f64,
}

impl FlowPair {
    pub const COLUMNS: [&'static str; 4] =
        ["source_id", "destination_id", "transfer_count", "total_value"];

    pub fn new(source_id: ParticipantId, destination_id: ParticipantId, count: u64, value: f64) -> Self {
        Self {
            source_id,
            destination_id,
            transfer_count: count,
            total_value: value,
        }
    }

    pub fn is_self_loop(&self) -> bool {
        self.source_id == self.destination_id
    }

    /// Rows missing either id are skipped, same as for transfers.
    pub fn from_table(table: &Table) -> FlowResult<Vec<Self>> {
        table.require(&Self::COLUMNS)?;
        Ok(table
            .iter_rows()
            .filter_map(|row| {
                Some(Self {
                    source_id: row.id("source_id")?,
                    destination_id: row.id("destination_id")?,
                    transfer_count: row.id("transfer_count").unwrap_or(0).max(0) as u64,
                    total_value: row.number("total_value").unwrap_or(0.0),
                })
            })
            .collect())
    }
}

/// Running (count, compensated sum) per ordered key.
#[derive(Debug, Default)]
pub(crate) struct PairAccumulator<K: Ord> {
    totals: BTreeMap<K, (u64, CompensatedSum)>,
}

impl<K: Ord> PairAccumulator<K> {
    pub(crate) fn new() -> Self {
        Self {
            totals: BTreeMap::new(),
        }
    }

    pub(crate) fn add(&mut self, key: K, amount: f64) {
        let entry = self.totals.entry(key).or_default();
        entry.0 += 1;
        entry.1.add(amount);
    }

    /// Entries in ascending key order.
    pub(crate) fn into_entries(self) -> impl Iterator<Item = (K, u64, f64)> {
        self.totals
            .into_iter()
            .map(|(key, (count, sum))| (key, count, sum.value()))
    }
}

/// Group transfers by (sender, recipient).
///
/// Rows with a missing sender or recipient are excluded before grouping.
/// `transfer_count` counts rows, so a repeated transfer_id counts twice.
/// Output is in ascending (source_id, destination_id) order.
pub fn aggregate_flow_pairs(transfers: &[TransferRecord]) -> Vec<FlowPair> {
    let mut acc = PairAccumulator::new();
    let mut dropped = 0usize;

    for t in transfers {
        match t.endpoints() {
            Some(key) => acc.add(key, t.normalised_amount),
            None => dropped += 1,
        }
    }

    if dropped > 0 {
        log::warn!("flow aggregation: dropped {dropped} transfer(s) with a missing account id");
    }

    let pairs: Vec<FlowPair> = acc
        .into_entries()
        .map(|((src, dst), count, sum)| FlowPair::new(src, dst, count, sum))
        .collect();
    log::debug!(
        "flow aggregation: {} transfer(s) → {} flow pair(s)",
        transfers.len() - dropped,
        pairs.len()
    );
    pairs
}
