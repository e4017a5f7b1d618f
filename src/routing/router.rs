//! Request router: policy resolution, retry, fallback, and accounting.
//!
//! `route` is the single entry point for executing an AI operation. It
//! resolves the target provider, runs the call through the retry
//! executor, falls back to the quality provider when the target exhausts
//! its retries, and appends exactly one usage record whatever happens.
//! The ledger write is spawned onto a task tracker so a client that
//! drops the connection mid-flight still gets billed for work performed.

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use tokio_util::task::TaskTracker;
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{
    config::{RetryConfig, RoutingConfig},
    db::UsageRepo,
    models::{
        Completion, CompletionRequest, QuotaState, SubscriptionTier, TokenUsage, UsageOutcome,
        UsageRecord,
    },
    pricing::{Cost, PricingConfig},
    providers::{retry::with_retry, Provider, ProviderError, ProviderId, ProviderRegistry},
    routing::{resolve_policy, WeightSampler},
    settings::SettingsStore,
};

#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

/// Outcome of a successfully routed operation.
#[derive(Debug, Clone)]
pub struct RouteResult {
    pub text: String,
    pub usage: TokenUsage,
    /// Provider that actually produced the result.
    pub provider: ProviderId,
    pub model: String,
    pub cost: Cost,
    /// Whether the result came from the fallback provider rather than the
    /// originally targeted one.
    pub fallback: bool,
}

pub struct Router {
    registry: ProviderRegistry,
    client: reqwest::Client,
    retry: RetryConfig,
    routing: RoutingConfig,
    pricing: PricingConfig,
    usage: Arc<dyn UsageRepo>,
    settings: Arc<SettingsStore>,
    sampler: Box<dyn WeightSampler>,
    tracker: TaskTracker,
}

impl Router {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        registry: ProviderRegistry,
        client: reqwest::Client,
        retry: RetryConfig,
        routing: RoutingConfig,
        pricing: PricingConfig,
        usage: Arc<dyn UsageRepo>,
        settings: Arc<SettingsStore>,
        sampler: Box<dyn WeightSampler>,
        tracker: TaskTracker,
    ) -> Self {
        Self {
            registry,
            client,
            retry,
            routing,
            pricing,
            usage,
            settings,
            sampler,
            tracker,
        }
    }

    /// Execute one operation for `user_id`.
    ///
    /// Exactly one usage record is appended per call: a success record
    /// attributed to the provider that produced the result, or an error
    /// record attributed to the last provider attempted.
    pub async fn route(
        &self,
        user_id: Uuid,
        tier: SubscriptionTier,
        request: CompletionRequest,
    ) -> Result<RouteResult, RouteError> {
        let settings = self.settings.snapshot();
        let policy = resolve_policy(tier, request.kind, &self.routing, settings.hybrid_weight);
        let target = policy.choose(self.sampler.as_ref());

        let started = Instant::now();

        let (attempted, outcome) = match self.attempt(target, &request).await {
            Ok(completion) => (target, Ok((completion, false, serde_json::json!({})))),
            Err(primary_error) => {
                match self.fallback_target(target, &primary_error, settings.fallback_on_primary_failure) {
                    Some(fallback) => {
                        warn!(
                            provider = %target,
                            fallback = %fallback,
                            operation = %request.kind,
                            error = %primary_error,
                            "Provider exhausted retries, falling back"
                        );
                        let metadata = serde_json::json!({
                            "fallback": true,
                            "fallback_from": target.as_str(),
                            "fallback_error": primary_error.to_string(),
                        });
                        match self.attempt(fallback, &request).await {
                            Ok(completion) => (fallback, Ok((completion, true, metadata))),
                            Err(fallback_error) => (fallback, Err((fallback_error, metadata))),
                        }
                    }
                    None => (target, Err((primary_error, serde_json::json!({})))),
                }
            }
        };

        let latency_ms = started.elapsed().as_millis() as i64;

        match outcome {
            Ok((completion, fallback, metadata)) => {
                let cost = self.pricing.cost(
                    attempted,
                    completion.usage.input_tokens,
                    completion.usage.output_tokens,
                );

                self.append_record(UsageRecord {
                    id: Uuid::new_v4(),
                    user_id,
                    provider: attempted.as_str().to_string(),
                    model: completion.model.clone(),
                    feature: request.kind.as_str().to_string(),
                    input_tokens: completion.usage.input_tokens,
                    output_tokens: completion.usage.output_tokens,
                    total_tokens: completion.usage.total(),
                    cost: cost.clone(),
                    latency_ms,
                    outcome: UsageOutcome::Success,
                    error_message: None,
                    quota_state: QuotaState::Counted,
                    metadata,
                    created_at: Utc::now(),
                });

                info!(
                    user_id = %user_id,
                    provider = %attempted,
                    operation = %request.kind,
                    tokens = completion.usage.total(),
                    cost_microcents = cost.microcents,
                    latency_ms,
                    fallback,
                    "Operation completed"
                );

                Ok(RouteResult {
                    text: completion.text,
                    usage: completion.usage,
                    provider: attempted,
                    model: completion.model,
                    cost,
                    fallback,
                })
            }
            Err((last_error, metadata)) => {
                let model = self
                    .registry
                    .get(attempted)
                    .map(|p| p.model().to_string())
                    .unwrap_or_default();

                self.append_record(UsageRecord {
                    id: Uuid::new_v4(),
                    user_id,
                    provider: attempted.as_str().to_string(),
                    model,
                    feature: request.kind.as_str().to_string(),
                    input_tokens: 0,
                    output_tokens: 0,
                    total_tokens: 0,
                    cost: Cost::zero(&self.pricing.display_currency),
                    latency_ms,
                    outcome: UsageOutcome::Error,
                    error_message: Some(last_error.to_string()),
                    quota_state: QuotaState::Counted,
                    metadata,
                    created_at: Utc::now(),
                });

                error!(
                    user_id = %user_id,
                    provider = %attempted,
                    operation = %request.kind,
                    error = %last_error,
                    latency_ms,
                    "Operation failed"
                );

                Err(RouteError::Provider(last_error))
            }
        }
    }

    /// Run `request` against one provider through the retry executor.
    async fn attempt(
        &self,
        id: ProviderId,
        request: &CompletionRequest,
    ) -> Result<Completion, ProviderError> {
        let provider: &Arc<dyn Provider> = self.registry.get(id)?;
        with_retry(&self.retry, id, request.kind.as_str(), || {
            provider.complete(&self.client, request)
        })
        .await
    }

    /// Decide whether a failed target gets a second chance elsewhere.
    ///
    /// Only retryable errors that exhausted their attempts trigger
    /// fallback; a fatal error would fail identically on any backend.
    /// Targets other than the quality provider always fall back to it.
    /// The quality provider itself degrades to the cost provider only
    /// when the operator opted in.
    fn fallback_target(
        &self,
        target: ProviderId,
        error: &ProviderError,
        on_primary_failure: bool,
    ) -> Option<ProviderId> {
        if !error.is_retryable() {
            return None;
        }
        if target != self.routing.quality_provider {
            Some(self.routing.quality_provider)
        } else if on_primary_failure {
            Some(self.routing.cost_provider)
        } else {
            None
        }
    }

    /// Spawn the ledger write on the tracker. The record is complete
    /// before spawning, so a caller dropped mid-await still gets charged.
    fn append_record(&self, record: UsageRecord) {
        let usage = self.usage.clone();
        self.tracker.spawn(async move {
            if let Err(db_error) = usage.insert(&record).await {
                error!(
                    record_id = %record.id,
                    user_id = %record.user_id,
                    error = %db_error,
                    "Failed to append usage record"
                );
            }
        });
    }
}
