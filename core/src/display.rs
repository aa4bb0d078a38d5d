//! Node selection for renderers that draw a bounded subgraph.

use crate::{graph::EntityNetwork, types::EntityId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedNode {
    pub entity_id: EntityId,
    /// degree_total + ln(1 + strength_total); the log term only for positive strength.
    pub score: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LabelBy {
    Strength,
    Betweenness,
}

/// Top `max_nodes` nodes by display score, highest first. Ties keep node order.
pub fn display_ranking(network: &EntityNetwork, max_nodes: usize) -> Vec<RankedNode> {
    let mut ranked: Vec<RankedNode> = network
        .nodes
        .iter()
        .map(|n| {
            let strength = n.strength_total();
            let log_term = if strength > 0.0 { strength.ln_1p() } else { 0.0 };
            RankedNode {
                entity_id: n.entity_id,
                score: n.degree_total() as f64 + log_term,
            }
        })
        .collect();
    ranked.sort_by(|a, b| b.score.total_cmp(&a.score));
    ranked.truncate(max_nodes);
    ranked
}

/// Among the displayed nodes, the `k` to put text labels on.
pub fn label_candidates(
    network: &EntityNetwork,
    displayed: &[RankedNode],
    by: LabelBy,
    k: usize,
) -> Vec<EntityId> {
    let mut scored: Vec<(EntityId, f64, f64)> = displayed
        .iter()
        .map(|r| {
            let key = network
                .node(r.entity_id)
                .map(|n| match by {
                    LabelBy::Strength => n.strength_total(),
                    LabelBy::Betweenness => n.betweenness,
                })
                .unwrap_or(0.0);
            (r.entity_id, key, r.score)
        })
        .collect();
    scored.sort_by(|a, b| b.1.total_cmp(&a.1).then_with(|| b.2.total_cmp(&a.2)));
    scored.into_iter().take(k).map(|(id, _, _)| id).collect()
}

/// Label text for a node: the company name when the registry has one.
pub fn node_label(network: &EntityNetwork, entity_id: EntityId) -> String {
    network
        .node(entity_id)
        .and_then(|n| n.attribute_text("company_name"))
        .map(|name| name.chars().take(28).collect())
        .unwrap_or_else(|| entity_id.to_string())
}
