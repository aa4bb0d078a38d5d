//! Betweenness centrality (Brandes algorithm) over an undirected,
//! unweighted adjacency list.
//!
//! Exact computation runs a BFS from every node: O(V·E).
//! Above `exact_node_limit` nodes only `sample_size` seeded pivots are
//! used as BFS sources and their contributions are scaled by n / k.
//!
//! Scores are normalised so that a node lying on every shortest path
//! between every other pair scores 1.0.

use crate::{config::BetweennessConfig, rng::PivotSampler};
use std::collections::VecDeque;

/// Undirected simple graph on nodes `0..n`.
#[derive(Debug, Clone, Default)]
pub struct Adjacency {
    neighbors: Vec<Vec<usize>>,
}

impl Adjacency {
    pub fn new(num_nodes: usize) -> Self {
        Self {
            neighbors: vec![Vec::new(); num_nodes],
        }
    }

    /// Add the undirected edge u-v. Self-loops and repeats are ignored.
    pub fn connect(&mut self, u: usize, v: usize) {
        if u == v || self.neighbors[u].contains(&v) {
            return;
        }
        self.neighbors[u].push(v);
        self.neighbors[v].push(u);
    }

    pub fn num_nodes(&self) -> usize {
        self.neighbors.len()
    }

    pub fn num_edges(&self) -> usize {
        self.neighbors.iter().map(Vec::len).sum::<usize>() / 2
    }

    pub fn neighbors(&self, v: usize) -> &[usize] {
        &self.neighbors[v]
    }
}

/// Which BFS sources were used.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BetweennessMode {
    Exact,
    Sampled { pivots: usize },
}

#[derive(Debug, Clone)]
pub struct BetweennessResult {
    pub scores: Vec<f64>,
    pub mode: BetweennessMode,
}

pub fn betweenness(graph: &Adjacency, config: &BetweennessConfig) -> BetweennessResult {
    let n = graph.num_nodes();
    if n <= 2 {
        return BetweennessResult {
            scores: vec![0.0; n],
            mode: BetweennessMode::Exact,
        };
    }

    let (sources, mode): (Vec<usize>, BetweennessMode) = if n > config.exact_node_limit {
        let pivots = PivotSampler::new(config.seed).sample_indices(n, config.sample_size);
        log::debug!(
            "betweenness: {n} nodes over limit {}, sampling {} pivots (seed {})",
            config.exact_node_limit,
            pivots.len(),
            config.seed
        );
        let k = pivots.len();
        (pivots, BetweennessMode::Sampled { pivots: k })
    } else {
        ((0..n).collect(), BetweennessMode::Exact)
    };

    let mut raw = vec![0.0f64; n];
    let mut work = BrandesScratch::new(n);
    for &s in &sources {
        work.accumulate_from(graph, s, &mut raw);
    }

    // Each unordered pair is reached from both ends, hence (n-1)(n-2)
    // rather than (n-1)(n-2)/2.
    let mut scale = 1.0 / ((n - 1) * (n - 2)) as f64;
    if let BetweennessMode::Sampled { pivots } = mode {
        scale *= n as f64 / pivots as f64;
    }

    let scores = raw.into_iter().map(|c| (c * scale).min(1.0)).collect();
    BetweennessResult { scores, mode }
}

/// Per-source buffers, reused across BFS runs.
struct BrandesScratch {
    stack: Vec<usize>,
    predecessors: Vec<Vec<usize>>,
    sigma: Vec<f64>,
    dist: Vec<i64>,
    delta: Vec<f64>,
    queue: VecDeque<usize>,
}

impl BrandesScratch {
    fn new(n: usize) -> Self {
        Self {
            stack: Vec::with_capacity(n),
            predecessors: vec![Vec::new(); n],
            sigma: vec![0.0; n],
            dist: vec![-1; n],
            delta: vec![0.0; n],
            queue: VecDeque::with_capacity(n),
        }
    }

    fn reset(&mut self) {
        self.stack.clear();
        self.queue.clear();
        for p in &mut self.predecessors {
            p.clear();
        }
        self.sigma.fill(0.0);
        self.dist.fill(-1);
        self.delta.fill(0.0);
    }

    fn accumulate_from(&mut self, graph: &Adjacency, s: usize, centrality: &mut [f64]) {
        self.reset();
        self.sigma[s] = 1.0;
        self.dist[s] = 0;
        self.queue.push_back(s);

        // Forward BFS: shortest-path counts and predecessor lists.
        while let Some(v) = self.queue.pop_front() {
            self.stack.push(v);
            for &w in graph.neighbors(v) {
                if self.dist[w] < 0 {
                    self.dist[w] = self.dist[v] + 1;
                    self.queue.push_back(w);
                }
                if self.dist[w] == self.dist[v] + 1 {
                    self.sigma[w] += self.sigma[v];
                    self.predecessors[w].push(v);
                }
            }
        }

        // Backward pass: dependency accumulation.
        while let Some(w) = self.stack.pop() {
            for &v in &self.predecessors[w] {
                self.delta[v] += (self.sigma[v] / self.sigma[w]) * (1.0 + self.delta[w]);
            }
            if w != s {
                centrality[w] += self.delta[w];
            }
        }
    }
}
