//! Quantile levels and network roles for entity graph nodes.
//!
//! Cut points are recomputed from the node set on every call: a node is
//! High at or above the `high_quantile` value, Medium at or above the
//! `medium_quantile` value, Low otherwise. A node with zero activity on a
//! measure is Low on it regardless of where the cut points fall.

use crate::config::RoleThresholds;
use serde::{Deserialize, Serialize};
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Level {
    Low,
    Medium,
    High,
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(match self {
            Self::Low => "Low",
            Self::Medium => "Medium",
            Self::High => "High",
        })
    }
}

/// Linear-interpolated quantile of an ascending slice. Empty input gives 0.
pub fn quantile(sorted: &[f64], q: f64) -> f64 {
    match sorted.len() {
        0 => 0.0,
        1 => sorted[0],
        n => {
            let pos = q.clamp(0.0, 1.0) * (n - 1) as f64;
            let lo = pos.floor() as usize;
            let hi = pos.ceil() as usize;
            sorted[lo] + (sorted[hi] - sorted[lo]) * (pos - lo as f64)
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LevelCuts {
    pub high: f64,
    pub medium: f64,
}

impl LevelCuts {
    pub fn from_values(values: &[f64], thresholds: &RoleThresholds) -> Self {
        let mut sorted = values.to_vec();
        sorted.sort_by(f64::total_cmp);
        Self {
            high: quantile(&sorted, thresholds.high_quantile),
            medium: quantile(&sorted, thresholds.medium_quantile),
        }
    }

    pub fn level(&self, value: f64) -> Level {
        if value <= 0.0 {
            Level::Low
        } else if value >= self.high {
            Level::High
        } else if value >= self.medium {
            Level::Medium
        } else {
            Level::Low
        }
    }

    /// Level every value against cuts taken from the same values.
    pub fn label_all(values: &[f64], thresholds: &RoleThresholds) -> Vec<Level> {
        let cuts = Self::from_values(values, thresholds);
        values.iter().map(|v| cuts.level(*v)).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum NetworkRole {
    Hub,
    Bridge,
    Connector,
    Peripheral,
}

impl NetworkRole {
    pub const ALL: [NetworkRole; 4] = [Self::Hub, Self::Bridge, Self::Connector, Self::Peripheral];

    pub fn label(&self) -> &'static str {
        match self {
            Self::Hub => "Hub",
            Self::Bridge => "Bridge",
            Self::Connector => "Connector",
            Self::Peripheral => "Peripheral",
        }
    }
}

impl fmt::Display for NetworkRole {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.label())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoleInput {
    pub degree: Level,
    pub strength: Level,
    pub betweenness: Level,
}

type RoleRule = fn(&RoleInput) -> bool;

/// First match wins; the last rule always matches.
pub const ROLE_RULES: [(NetworkRole, RoleRule); 4] = [
    (NetworkRole::Hub, |r| r.degree == Level::High && r.strength == Level::High),
    (NetworkRole::Bridge, |r| r.betweenness == Level::High),
    (NetworkRole::Connector, |r| {
        r.degree == Level::Medium || r.strength == Level::Medium
    }),
    (NetworkRole::Peripheral, |_| true),
];

pub fn classify_role(input: &RoleInput) -> NetworkRole {
    ROLE_RULES
        .iter()
        .find(|(_, rule)| rule(input))
        .map(|(role, _)| *role)
        .unwrap_or(NetworkRole::Peripheral)
}
