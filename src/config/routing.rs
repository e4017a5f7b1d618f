use serde::{Deserialize, Serialize};

use crate::providers::ProviderId;

fn default_quality_provider() -> ProviderId {
    ProviderId::OpenAi
}

fn default_cost_provider() -> ProviderId {
    ProviderId::Gemini
}

fn default_hybrid_weight() -> f64 {
    0.7
}

/// Which provider plays which role, and how hybrid tiers split traffic.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RoutingConfig {
    /// Primary quality-tier provider. Pinned operations and fallback
    /// always land here.
    #[serde(default = "default_quality_provider")]
    pub quality_provider: ProviderId,

    /// Secondary cost-tier provider used by free and hybrid tiers.
    #[serde(default = "default_cost_provider")]
    pub cost_provider: ProviderId,

    /// Probability that a hybrid-eligible operation on a hybrid tier goes
    /// to the cost provider. Must be in [0, 1].
    #[serde(default = "default_hybrid_weight")]
    pub hybrid_weight: f64,

    /// When the quality provider itself exhausts its retries, degrade to
    /// the cost provider instead of failing. Off by default: availability
    /// is traded for output quality only when an operator opts in.
    #[serde(default)]
    pub fallback_on_primary_failure: bool,
}

impl Default for RoutingConfig {
    fn default() -> Self {
        Self {
            quality_provider: default_quality_provider(),
            cost_provider: default_cost_provider(),
            hybrid_weight: default_hybrid_weight(),
            fallback_on_primary_failure: false,
        }
    }
}

impl RoutingConfig {
    pub fn validate(&self) -> Result<(), String> {
        if !(0.0..=1.0).contains(&self.hybrid_weight) {
            return Err(format!(
                "routing.hybrid_weight must be within [0, 1], got {}",
                self.hybrid_weight
            ));
        }
        if self.quality_provider == self.cost_provider {
            return Err(
                "routing.quality_provider and routing.cost_provider must differ".to_string(),
            );
        }
        Ok(())
    }
}
