//! Tier-based provider routing.
//!
//! Policy resolution is a pure function of tier, operation kind, and the
//! routing configuration, so the full policy table is unit-testable
//! without any I/O. The weighted coin flip for hybrid tiers lives behind
//! [`WeightSampler`] so tests can drive it deterministically.

mod router;

pub use router::{RouteError, RouteResult, Router};

use crate::{
    config::RoutingConfig,
    models::{OperationKind, SubscriptionTier},
    providers::ProviderId,
};

/// Where an operation goes for a given tier and kind.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RoutingPolicy {
    /// Always this provider.
    Fixed(ProviderId),
    /// `primary` with probability `weight`, otherwise `secondary`.
    Hybrid {
        primary: ProviderId,
        secondary: ProviderId,
        weight: f64,
    },
}

/// Resolve the routing policy.
///
/// Generation is pinned to the quality provider for every tier. Free
/// users always get the cost provider. Pro and student tiers split
/// hybrid-eligible operations between both providers; everything else
/// lands on the quality provider.
pub fn resolve_policy(
    tier: SubscriptionTier,
    kind: OperationKind,
    config: &RoutingConfig,
    hybrid_weight: f64,
) -> RoutingPolicy {
    if kind.is_pinned() {
        return RoutingPolicy::Fixed(config.quality_provider);
    }

    match tier {
        SubscriptionTier::Free => RoutingPolicy::Fixed(config.cost_provider),
        SubscriptionTier::Pro | SubscriptionTier::Student if kind.is_hybrid_eligible() => {
            RoutingPolicy::Hybrid {
                primary: config.cost_provider,
                secondary: config.quality_provider,
                weight: hybrid_weight,
            }
        }
        SubscriptionTier::Pro
        | SubscriptionTier::Student
        | SubscriptionTier::OneTime
        | SubscriptionTier::Premium
        | SubscriptionTier::Lifetime
        | SubscriptionTier::Admin => RoutingPolicy::Fixed(config.quality_provider),
    }
}

/// Source of the uniform sample behind hybrid routing decisions.
pub trait WeightSampler: Send + Sync {
    /// A value in `[0, 1)`. The primary provider wins when the sample is
    /// below the hybrid weight.
    fn sample(&self) -> f64;
}

/// Production sampler backed by the thread-local RNG.
pub struct ThreadRngSampler;

impl WeightSampler for ThreadRngSampler {
    fn sample(&self) -> f64 {
        use rand::Rng;
        rand::thread_rng().gen_range(0.0..1.0)
    }
}

impl RoutingPolicy {
    /// Collapse the policy to a concrete target, consuming one sample for
    /// hybrid policies.
    pub fn choose(&self, sampler: &dyn WeightSampler) -> ProviderId {
        match *self {
            RoutingPolicy::Fixed(id) => id,
            RoutingPolicy::Hybrid {
                primary,
                secondary,
                weight,
            } => {
                if sampler.sample() < weight {
                    primary
                } else {
                    secondary
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    struct FixedSampler(f64);

    impl WeightSampler for FixedSampler {
        fn sample(&self) -> f64 {
            self.0
        }
    }

    fn config() -> RoutingConfig {
        RoutingConfig::default()
    }

    #[rstest]
    #[case(SubscriptionTier::Free)]
    #[case(SubscriptionTier::OneTime)]
    #[case(SubscriptionTier::Pro)]
    #[case(SubscriptionTier::Premium)]
    #[case(SubscriptionTier::Student)]
    #[case(SubscriptionTier::Lifetime)]
    #[case(SubscriptionTier::Admin)]
    fn test_generation_pinned_for_every_tier(#[case] tier: SubscriptionTier) {
        let policy = resolve_policy(tier, OperationKind::Generate, &config(), 0.7);
        assert_eq!(policy, RoutingPolicy::Fixed(ProviderId::OpenAi));
    }

    #[test]
    fn test_free_tier_always_cost_provider() {
        for kind in OperationKind::ALL {
            if kind.is_pinned() {
                continue;
            }
            let policy = resolve_policy(SubscriptionTier::Free, kind, &config(), 0.7);
            assert_eq!(policy, RoutingPolicy::Fixed(ProviderId::Gemini));
        }
    }

    #[rstest]
    #[case(OperationKind::Parse)]
    #[case(OperationKind::Categorize)]
    #[case(OperationKind::Summarize)]
    fn test_pro_hybrid_for_eligible_kinds(#[case] kind: OperationKind) {
        let policy = resolve_policy(SubscriptionTier::Pro, kind, &config(), 0.7);
        assert_eq!(
            policy,
            RoutingPolicy::Hybrid {
                primary: ProviderId::Gemini,
                secondary: ProviderId::OpenAi,
                weight: 0.7,
            }
        );
    }

    #[rstest]
    #[case(OperationKind::Enhance)]
    #[case(OperationKind::Match)]
    fn test_pro_quality_for_ineligible_kinds(#[case] kind: OperationKind) {
        let policy = resolve_policy(SubscriptionTier::Pro, kind, &config(), 0.7);
        assert_eq!(policy, RoutingPolicy::Fixed(ProviderId::OpenAi));
    }

    #[rstest]
    #[case(SubscriptionTier::OneTime)]
    #[case(SubscriptionTier::Premium)]
    #[case(SubscriptionTier::Lifetime)]
    #[case(SubscriptionTier::Admin)]
    fn test_quality_tiers_never_hybrid(#[case] tier: SubscriptionTier) {
        for kind in OperationKind::ALL {
            let policy = resolve_policy(tier, kind, &config(), 0.7);
            assert_eq!(policy, RoutingPolicy::Fixed(ProviderId::OpenAi));
        }
    }

    #[test]
    fn test_student_mirrors_pro() {
        for kind in OperationKind::ALL {
            assert_eq!(
                resolve_policy(SubscriptionTier::Student, kind, &config(), 0.4),
                resolve_policy(SubscriptionTier::Pro, kind, &config(), 0.4),
            );
        }
    }

    #[test]
    fn test_choose_respects_weight_boundary() {
        let policy = RoutingPolicy::Hybrid {
            primary: ProviderId::Gemini,
            secondary: ProviderId::OpenAi,
            weight: 0.7,
        };

        assert_eq!(policy.choose(&FixedSampler(0.0)), ProviderId::Gemini);
        assert_eq!(policy.choose(&FixedSampler(0.699)), ProviderId::Gemini);
        // The boundary itself falls to the secondary provider.
        assert_eq!(policy.choose(&FixedSampler(0.7)), ProviderId::OpenAi);
        assert_eq!(policy.choose(&FixedSampler(0.999)), ProviderId::OpenAi);
    }

    #[test]
    fn test_zero_weight_never_picks_primary() {
        let policy = RoutingPolicy::Hybrid {
            primary: ProviderId::Gemini,
            secondary: ProviderId::OpenAi,
            weight: 0.0,
        };
        assert_eq!(policy.choose(&FixedSampler(0.0)), ProviderId::OpenAi);
    }

    #[test]
    fn test_fixed_ignores_sampler() {
        let policy = RoutingPolicy::Fixed(ProviderId::Gemini);
        assert_eq!(policy.choose(&FixedSampler(0.99)), ProviderId::Gemini);
    }
}
