//! Rank computation.
//!
//! Strategy composition for provider ranking with reusable components. A
//! rank is a sum of component contributions: the tenant's priority weight
//! plus penalties derived from live monitoring. Lower is better throughout;
//! the banding thresholds come from [`RankingConfig`], not from code.

use serde::{Deserialize, Serialize};

use crate::config::RankingConfig;

use super::sources::ProviderMetrics;

/// Everything one rank computation sees about a provider.
#[derive(Debug, Clone)]
pub struct RankInput<'a> {
    pub provider: &'a str,
    pub service: &'a str,
    /// Tenant's priority weight for this provider/service; lower is better
    pub priority_weight: f64,
    pub metrics: &'a ProviderMetrics,
}

/// One component's contribution to a rank.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankContribution {
    pub component: String,
    pub amount: f64,
}

/// Per-component breakdown of a computed rank, kept on the candidate so a
/// terminal record can explain why providers were ordered as they were.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct RankBreakdown {
    pub contributions: Vec<RankContribution>,
}

impl RankBreakdown {
    /// Contribution amount for a named component, if present.
    pub fn contribution(&self, component: &str) -> Option<f64> {
        self.contributions
            .iter()
            .find(|entry| entry.component == component)
            .map(|entry| entry.amount)
    }
}

/// A single ranking criterion.
///
/// Returns a contribution added into the rank; positive amounts push a
/// provider later in the candidate order.
pub trait RankComponent: Send + Sync {
    /// Get the name of this ranking criterion
    fn name(&self) -> &'static str;

    /// Contribution for a provider; lower keeps the provider earlier
    fn contribution(&self, input: &RankInput<'_>) -> f64;
}

/// The tenant's own priority weight, passed through unchanged.
#[derive(Debug, Clone, Default)]
pub struct PriorityComponent;

impl RankComponent for PriorityComponent {
    fn name(&self) -> &'static str {
        "priority"
    }

    fn contribution(&self, input: &RankInput<'_>) -> f64 {
        input.priority_weight
    }
}

/// Banded penalty for degraded availability.
#[derive(Debug, Clone)]
pub struct AvailabilityComponent {
    full_pct: f64,
    degraded_pct: f64,
    floor_pct: f64,
    degraded_penalty: f64,
    floor_penalty: f64,
    outage_penalty: f64,
}

impl AvailabilityComponent {
    pub fn from_config(config: &RankingConfig) -> Self {
        Self {
            full_pct: config.availability_full_pct,
            degraded_pct: config.availability_degraded_pct,
            floor_pct: config.availability_floor_pct,
            degraded_penalty: config.degraded_penalty,
            floor_penalty: config.floor_penalty,
            outage_penalty: config.outage_penalty,
        }
    }
}

impl RankComponent for AvailabilityComponent {
    fn name(&self) -> &'static str {
        "availability"
    }

    fn contribution(&self, input: &RankInput<'_>) -> f64 {
        match input.metrics.availability_pct {
            pct if pct >= self.full_pct => 0.0,
            pct if pct >= self.degraded_pct => self.degraded_penalty,
            pct if pct >= self.floor_pct => self.floor_penalty,
            _ => self.outage_penalty,
        }
    }
}

/// Linear penalty for latency over the configured budget.
#[derive(Debug, Clone)]
pub struct LatencyComponent {
    budget_ms: f64,
    penalty_per_100ms: f64,
}

impl LatencyComponent {
    pub fn from_config(config: &RankingConfig) -> Self {
        Self {
            budget_ms: config.latency_budget_ms,
            penalty_per_100ms: config.latency_penalty_per_100ms,
        }
    }
}

impl RankComponent for LatencyComponent {
    fn name(&self) -> &'static str {
        "latency"
    }

    fn contribution(&self, input: &RankInput<'_>) -> f64 {
        let over_budget = (input.metrics.avg_latency_ms - self.budget_ms).max(0.0);
        (over_budget / 100.0) * self.penalty_per_100ms
    }
}

/// Composite ranker combining multiple components into one rank.
pub struct CompositeRanker {
    components: Vec<Box<dyn RankComponent>>,
}

impl CompositeRanker {
    /// Create an empty composite; add components with `with_component`.
    pub fn new() -> Self {
        Self {
            components: Vec::new(),
        }
    }

    /// Add a ranking component.
    pub fn with_component(mut self, component: impl RankComponent + 'static) -> Self {
        self.components.push(Box::new(component));
        self
    }

    /// The standard composition: priority plus availability and latency
    /// penalties with thresholds from config.
    pub fn standard(config: &RankingConfig) -> Self {
        Self::new()
            .with_component(PriorityComponent)
            .with_component(AvailabilityComponent::from_config(config))
            .with_component(LatencyComponent::from_config(config))
    }

    /// Compute the rank and its per-component breakdown.
    pub fn rank(&self, input: &RankInput<'_>) -> (f64, RankBreakdown) {
        let contributions: Vec<RankContribution> = self
            .components
            .iter()
            .map(|component| RankContribution {
                component: component.name().to_string(),
                amount: component.contribution(input),
            })
            .collect();
        let total = contributions.iter().map(|entry| entry.amount).sum();
        (total, RankBreakdown { contributions })
    }
}

impl Default for CompositeRanker {
    fn default() -> Self {
        Self::standard(&RankingConfig::default())
    }
}
