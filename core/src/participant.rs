//! Participant metric engine.
//!
//! Derived purely from flow pairs: a participant exists iff it sits on
//! at least one end of some pair. Profiles come from an ordered rule list,
//! first match wins:
//!   1. Isolated          : no counterparties at all
//!   2. Hub               : wide on both sides
//!   3. Broker            : wide on exactly one side
//!   4. Peripheral Member : at most `peripheral_max_counterparties`
//!   5. Regular Member    : everything else

use crate::{
    config::ProfileThresholds,
    error::FlowResult,
    flow::FlowPair,
    sum::CompensatedSum,
    table::Table,
    types::ParticipantId,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum InteractionProfile {
    #[serde(rename = "Isolated")]
    Isolated,
    #[serde(rename = "Hub")]
    Hub,
    #[serde(rename = "Broker")]
    Broker,
    #[serde(rename = "Peripheral Member")]
    PeripheralMember,
    #[serde(rename = "Regular Member")]
    RegularMember,
}

impl InteractionProfile {
    pub const ALL: [InteractionProfile; 5] = [
        Self::Isolated,
        Self::Hub,
        Self::Broker,
        Self::PeripheralMember,
        Self::RegularMember,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Isolated => "Isolated",
            Self::Hub => "Hub",
            Self::Broker => "Broker",
            Self::PeripheralMember => "Peripheral Member",
            Self::RegularMember => "Regular Member",
        }
    }
}

impl fmt::Display for InteractionProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

/// The counts a profile is decided on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProfileInput {
    pub unique_destinations: u64,
    pub unique_sources: u64,
}

impl ProfileInput {
    pub fn unique_counterparties(&self) -> u64 {
        self.unique_destinations + self.unique_sources
    }
}

type ProfileRule = fn(&ProfileInput, &ProfileThresholds) -> bool;

/// Evaluated top to bottom. The last rule always matches.
pub const PROFILE_RULES: [(InteractionProfile, ProfileRule); 5] = [
    (InteractionProfile::Isolated, |p, _| p.unique_counterparties() == 0),
    (InteractionProfile::Hub, |p, t| {
        p.unique_destinations >= t.hub_min_counterparties
            && p.unique_sources >= t.hub_min_counterparties
    }),
    (InteractionProfile::Broker, |p, t| {
        (p.unique_destinations >= t.hub_min_counterparties)
            != (p.unique_sources >= t.hub_min_counterparties)
    }),
    (InteractionProfile::PeripheralMember, |p, t| {
        p.unique_counterparties() <= t.peripheral_max_counterparties
    }),
    (InteractionProfile::RegularMember, |_, _| true),
];

pub fn classify_profile(input: &ProfileInput, thresholds: &ProfileThresholds) -> InteractionProfile {
    PROFILE_RULES
        .iter()
        .find(|(_, rule)| rule(input, thresholds))
        .map(|(profile, _)| *profile)
        .unwrap_or(InteractionProfile::RegularMember)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParticipantMetrics {
    pub participant_id: ParticipantId,
    pub unique_destinations: u64,
    pub unique_sources: u64,
    pub unique_counterparties: u64,
    pub total_sent: f64,
    pub total_received: f64,
    pub has_two_way_flow: bool,
    pub interaction_profile: InteractionProfile,
}

#[derive(Default)]
struct Sides {
    destinations: BTreeSet<ParticipantId>,
    sources: BTreeSet<ParticipantId>,
    sent: CompensatedSum,
    received: CompensatedSum,
}

/// Per-participant metrics in ascending participant_id order.
pub fn participant_metrics(
    flow_pairs: &[FlowPair],
    thresholds: &ProfileThresholds,
) -> Vec<ParticipantMetrics> {
    let mut sides: BTreeMap<ParticipantId, Sides> = BTreeMap::new();
    for fp in flow_pairs {
        let out = sides.entry(fp.source_id).or_default();
        out.destinations.insert(fp.destination_id);
        out.sent.add(fp.total_value);

        let inc = sides.entry(fp.destination_id).or_default();
        inc.sources.insert(fp.source_id);
        inc.received.add(fp.total_value);
    }

    let two_way = two_way_participants(flow_pairs);

    sides
        .into_iter()
        .map(|(id, s)| {
            let input = ProfileInput {
                unique_destinations: s.destinations.len() as u64,
                unique_sources: s.sources.len() as u64,
            };
            ParticipantMetrics {
                participant_id: id,
                unique_destinations: input.unique_destinations,
                unique_sources: input.unique_sources,
                unique_counterparties: input.unique_counterparties(),
                total_sent: s.sent.value(),
                total_received: s.received.value(),
                has_two_way_flow: two_way.contains(&id),
                interaction_profile: classify_profile(&input, thresholds),
            }
        })
        .collect()
}

/// Schema-checked entry point for untyped flow pair tables.
pub fn participant_metrics_from_table(
    table: &Table,
    thresholds: &ProfileThresholds,
) -> FlowResult<Vec<ParticipantMetrics>> {
    let pairs = FlowPair::from_table(table)?;
    Ok(participant_metrics(&pairs, thresholds))
}

/// Participants p with some q != p such that both (p, q) and (q, p) exist.
fn two_way_participants(flow_pairs: &[FlowPair]) -> HashSet<ParticipantId> {
    let corridors: HashSet<(ParticipantId, ParticipantId)> = flow_pairs
        .iter()
        .map(|fp| (fp.source_id, fp.destination_id))
        .collect();

    let mut two_way = HashSet::new();
    for &(s, d) in &corridors {
        if s != d && corridors.contains(&(d, s)) {
            two_way.insert(s);
            two_way.insert(d);
        }
    }
    two_way
}

/// Rank by (unique_counterparties, total_sent, total_received), all descending.
/// The sort is stable, so equal rows keep their input order.
pub fn top_participants(records: &[ParticipantMetrics], n: usize) -> Vec<ParticipantMetrics> {
    let mut ranked: Vec<&ParticipantMetrics> = records.iter().collect();
    ranked.sort_by(|a, b| {
        b.unique_counterparties
            .cmp(&a.unique_counterparties)
            .then_with(|| b.total_sent.total_cmp(&a.total_sent))
            .then_with(|| b.total_received.total_cmp(&a.total_received))
    });
    ranked.into_iter().take(n).cloned().collect()
}

/// Participant count per profile, in rule order.
pub fn profile_counts(records: &[ParticipantMetrics]) -> Vec<(InteractionProfile, usize)> {
    InteractionProfile::ALL
        .iter()
        .map(|p| {
            (
                *p,
                records.iter().filter(|r| r.interaction_profile == *p).count(),
            )
        })
        .collect()
}
