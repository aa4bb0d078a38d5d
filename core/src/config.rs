use crate::error::{FlowError, FlowResult};
use serde::{Deserialize, Serialize};

// ── Participant profile thresholds ─────────────────────────────────

/// Count thresholds for the interaction profile rules.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ProfileThresholds {
    /// Distinct destinations (or sources) needed to count as "wide" on that side.
    pub hub_min_counterparties: u64,
    /// At most this many counterparties makes a participant peripheral.
    pub peripheral_max_counterparties: u64,
}

impl Default for ProfileThresholds {
    fn default() -> Self {
        Self {
            hub_min_counterparties: 5,
            peripheral_max_counterparties: 2,
        }
    }
}

// ── Network role thresholds ────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct RoleThresholds {
    pub high_quantile: f64,
    pub medium_quantile: f64,
}

impl Default for RoleThresholds {
    fn default() -> Self {
        Self {
            high_quantile: 0.9,
            medium_quantile: 0.6,
        }
    }
}

// ── Betweenness ────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BetweennessConfig {
    /// Above this many nodes the pivot-sampled approximation is used.
    pub exact_node_limit: usize,
    /// Number of pivots drawn for the approximation.
    pub sample_size: usize,
    /// Seed for the pivot sampler.
    pub seed: u64,
}

impl Default for BetweennessConfig {
    fn default() -> Self {
        Self {
            exact_node_limit: 4000,
            sample_size: 400,
            seed: 42,
        }
    }
}

// ── Counterparty quadrants ─────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct QuadrantConfig {
    /// Divisor applied to value totals before the median is taken (millions).
    pub value_scale: f64,
}

impl Default for QuadrantConfig {
    fn default() -> Self {
        Self {
            value_scale: 1_000_000.0,
        }
    }
}

// ── Reporting ──────────────────────────────────────────────────────

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ReportConfig {
    pub top_n: usize,
    pub display_max_nodes: usize,
}

impl Default for ReportConfig {
    fn default() -> Self {
        Self {
            top_n: 15,
            display_max_nodes: 200,
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    pub profile: ProfileThresholds,
    pub roles: RoleThresholds,
    pub betweenness: BetweennessConfig,
    pub quadrant: QuadrantConfig,
    pub report: ReportConfig,
}

impl EngineConfig {
    /// Load from a JSON file. Missing sections and fields fall back to defaults.
    pub fn load(path: &str) -> FlowResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: EngineConfig = serde_json::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> FlowResult<()> {
        let roles = &self.roles;
        for (name, q) in [
            ("roles.high_quantile", roles.high_quantile),
            ("roles.medium_quantile", roles.medium_quantile),
        ] {
            if !(0.0..=1.0).contains(&q) {
                return Err(invalid(format!("{name} must be within [0, 1], got {q}")));
            }
        }
        if roles.medium_quantile > roles.high_quantile {
            return Err(invalid(format!(
                "roles.medium_quantile ({}) exceeds roles.high_quantile ({})",
                roles.medium_quantile, roles.high_quantile
            )));
        }
        if self.betweenness.sample_size == 0 {
            return Err(invalid("betweenness.sample_size must be > 0".into()));
        }
        if !(self.quadrant.value_scale > 0.0) {
            return Err(invalid(format!(
                "quadrant.value_scale must be positive, got {}",
                self.quadrant.value_scale
            )));
        }
        Ok(())
    }
}

fn invalid(reason: String) -> FlowError {
    FlowError::InvalidConfig { reason }
}
