//! Entity-resolved flow graph.
//!
//! Pipeline (fixed order):
//!   1. Resolve sender/recipient accounts to entities, dropping unmapped rows
//!   2. Aggregate transfers per ordered entity pair
//!   3. Build the directed graph; every registry entity is a node
//!   4. Degree and strength per direction
//!   5. Betweenness on the undirected projection
//!   6. Quantile levels and network role
//!
//! Nodes appear in registry order, followed by entities that only the
//! account mapping knows about (ascending id, no attributes).

use crate::{
    centrality::{betweenness, Adjacency, BetweennessMode},
    config::EngineConfig,
    flow::PairAccumulator,
    records::{AccountRecord, EntityRecord, TransferRecord},
    roles::{classify_role, Level, LevelCuts, NetworkRole, RoleInput},
    sum::CompensatedSum,
    table::Cell,
    types::{AccountId, EntityId},
};
use petgraph::{
    graph::{DiGraph, NodeIndex},
    visit::EdgeRef,
    Direction,
};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet, HashMap};

// ── Account resolution ─────────────────────────────────────────────

#[derive(Debug, Clone, Default)]
pub struct AccountRegistry {
    owners: HashMap<AccountId, Option<EntityId>>,
}

impl AccountRegistry {
    /// The first row for a repeated account id wins.
    pub fn from_records(accounts: &[AccountRecord]) -> Self {
        let mut owners = HashMap::with_capacity(accounts.len());
        let mut duplicates = 0usize;
        for a in accounts {
            if owners.contains_key(&a.account_id) {
                duplicates += 1;
                continue;
            }
            owners.insert(a.account_id, a.entity_id);
        }
        if duplicates > 0 {
            log::warn!("account registry: ignored {duplicates} duplicate account row(s)");
        }
        Self { owners }
    }

    /// None for unknown accounts and for accounts without an owner.
    pub fn resolve(&self, account_id: AccountId) -> Option<EntityId> {
        self.owners.get(&account_id).copied().flatten()
    }
}

// ── Graph ──────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FlowEdge {
    /// Summed transfer amount.
    pub weight: f64,
    /// Number of underlying transfers.
    pub count: u64,
}

/// Directed graph keyed by entity id. At most one edge per ordered pair.
#[derive(Debug, Clone, Default)]
pub struct EntityGraph {
    graph: DiGraph<EntityId, FlowEdge>,
    index: HashMap<EntityId, NodeIndex>,
}

impl EntityGraph {
    fn add_node(&mut self, id: EntityId) -> NodeIndex {
        *self
            .index
            .entry(id)
            .or_insert_with(|| self.graph.add_node(id))
    }

    /// Read-only view of the petgraph graph, for callers running their own
    /// traversals. Node weights are entity ids.
    pub fn inner(&self) -> &DiGraph<EntityId, FlowEdge> {
        &self.graph
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn edge(&self, from: EntityId, to: EntityId) -> Option<&FlowEdge> {
        let a = *self.index.get(&from)?;
        let b = *self.index.get(&to)?;
        self.graph.find_edge(a, b).map(|e| &self.graph[e])
    }

    /// (distinct neighbours, summed weight) in one direction.
    fn degree_and_strength(&self, node: NodeIndex, dir: Direction) -> (u64, f64) {
        let mut strength = CompensatedSum::new();
        let mut degree = 0;
        for e in self.graph.edges_directed(node, dir) {
            degree += 1;
            strength.add(e.weight().weight);
        }
        (degree, strength.value())
    }

    /// Undirected projection: u-v when either direction carries weight > 0.
    fn undirected_projection(&self) -> Adjacency {
        let mut adj = Adjacency::new(self.graph.node_count());
        for e in self.graph.edge_references() {
            if e.weight().weight > 0.0 {
                adj.connect(e.source().index(), e.target().index());
            }
        }
        adj
    }
}

// ── Output tables ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NodeMetrics {
    pub entity_id: EntityId,
    pub in_degree: u64,
    pub out_degree: u64,
    pub in_strength: f64,
    pub out_strength: f64,
    pub betweenness: f64,
    pub degree_level: Level,
    pub strength_level: Level,
    pub betweenness_level: Level,
    pub network_role: NetworkRole,
    /// Descriptive registry columns; empty when the entity is not registered.
    pub attributes: BTreeMap<String, Cell>,
}

impl NodeMetrics {
    pub fn degree_total(&self) -> u64 {
        self.in_degree + self.out_degree
    }

    pub fn strength_total(&self) -> f64 {
        self.in_strength + self.out_strength
    }

    pub fn attribute_text(&self, key: &str) -> Option<&str> {
        match self.attributes.get(key) {
            Some(serde_json::Value::String(s)) if !s.trim().is_empty() => Some(s.as_str()),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub sender_entity: EntityId,
    pub recipient_entity: EntityId,
    pub edge_amount: f64,
    pub edge_count: u64,
}

#[derive(Debug, Clone)]
pub struct EntityNetwork {
    pub nodes: Vec<NodeMetrics>,
    pub edges: Vec<EdgeRecord>,
    pub graph: EntityGraph,
    pub betweenness_mode: BetweennessMode,
    /// Transfers that could not be resolved to two entities.
    pub dropped_transfers: usize,
}

impl EntityNetwork {
    pub fn node(&self, id: EntityId) -> Option<&NodeMetrics> {
        self.nodes.iter().find(|n| n.entity_id == id)
    }

    pub fn role_counts(&self) -> Vec<(NetworkRole, usize)> {
        NetworkRole::ALL
            .iter()
            .map(|r| (*r, self.nodes.iter().filter(|n| n.network_role == *r).count()))
            .collect()
    }
}

// ── Builder ────────────────────────────────────────────────────────

pub fn build_entity_graph(
    entities: &[EntityRecord],
    accounts: &[AccountRecord],
    transfers: &[TransferRecord],
    config: &EngineConfig,
) -> EntityNetwork {
    let registry = AccountRegistry::from_records(accounts);

    // 1-2. Resolve and aggregate.
    let mut acc = PairAccumulator::new();
    let mut dropped_transfers = 0usize;
    for t in transfers {
        let resolved = t
            .endpoints()
            .and_then(|(s, r)| Some((registry.resolve(s)?, registry.resolve(r)?)));
        match resolved {
            Some(key) => acc.add(key, t.normalised_amount),
            None => dropped_transfers += 1,
        }
    }
    if dropped_transfers > 0 {
        log::warn!(
            "entity graph: dropped {dropped_transfers} transfer(s) with a missing or unmapped account"
        );
    }
    let edges: Vec<EdgeRecord> = acc
        .into_entries()
        .map(|((s, r), count, sum)| EdgeRecord {
            sender_entity: s,
            recipient_entity: r,
            edge_amount: sum,
            edge_count: count,
        })
        .collect();

    // 3. Nodes, then edges.
    let mut graph = EntityGraph::default();
    let mut attributes: HashMap<EntityId, &BTreeMap<String, Cell>> = HashMap::new();
    for e in entities {
        graph.add_node(e.entity_id);
        attributes.entry(e.entity_id).or_insert(&e.attributes);
    }
    let unregistered: BTreeSet<EntityId> = edges
        .iter()
        .flat_map(|e| [e.sender_entity, e.recipient_entity])
        .filter(|id| !graph.contains(*id))
        .collect();
    for id in unregistered {
        graph.add_node(id);
    }
    for e in &edges {
        let a = graph.add_node(e.sender_entity);
        let b = graph.add_node(e.recipient_entity);
        graph.graph.add_edge(
            a,
            b,
            FlowEdge {
                weight: e.edge_amount,
                count: e.edge_count,
            },
        );
    }

    // 4. Degree and strength.
    let directional: Vec<((u64, f64), (u64, f64))> = graph
        .graph
        .node_indices()
        .map(|n| {
            (
                graph.degree_and_strength(n, Direction::Incoming),
                graph.degree_and_strength(n, Direction::Outgoing),
            )
        })
        .collect();

    // 5. Betweenness.
    let centrality = betweenness(&graph.undirected_projection(), &config.betweenness);

    // 6. Levels and roles, cut points taken from this node set.
    let degree_totals: Vec<f64> = directional
        .iter()
        .map(|((din, _), (dout, _))| (din + dout) as f64)
        .collect();
    let strength_totals: Vec<f64> = directional
        .iter()
        .map(|((_, sin), (_, sout))| sin + sout)
        .collect();
    let degree_levels = LevelCuts::label_all(&degree_totals, &config.roles);
    let strength_levels = LevelCuts::label_all(&strength_totals, &config.roles);
    let betweenness_levels = LevelCuts::label_all(&centrality.scores, &config.roles);

    let nodes: Vec<NodeMetrics> = graph
        .graph
        .node_indices()
        .map(|n| {
            let i = n.index();
            let entity_id = graph.graph[n];
            let ((in_degree, in_strength), (out_degree, out_strength)) = directional[i];
            let input = RoleInput {
                degree: degree_levels[i],
                strength: strength_levels[i],
                betweenness: betweenness_levels[i],
            };
            NodeMetrics {
                entity_id,
                in_degree,
                out_degree,
                in_strength,
                out_strength,
                betweenness: centrality.scores[i],
                degree_level: input.degree,
                strength_level: input.strength,
                betweenness_level: input.betweenness,
                network_role: classify_role(&input),
                attributes: attributes
                    .get(&entity_id)
                    .map(|a| (*a).clone())
                    .unwrap_or_default(),
            }
        })
        .collect();

    log::debug!(
        "entity graph: {} node(s), {} edge(s), betweenness {:?}",
        graph.node_count(),
        graph.edge_count(),
        centrality.mode
    );

    EntityNetwork {
        nodes,
        edges,
        graph,
        betweenness_mode: centrality.mode,
        dropped_transfers,
    }
}
