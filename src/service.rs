//! Operation service: quota admission in front of the router.
//!
//! The single entry point the HTTP surface calls. Quota is checked before
//! any provider traffic, so a rejected operation costs nothing and leaves
//! no ledger record.

use uuid::Uuid;

use crate::{
    db::DbError,
    models::{CompletionRequest, OperationKind, SubscriptionTier},
    providers::ProviderError,
    quota::{QuotaDecision, QuotaEnforcer, QuotaScope},
    routing::{RouteError, RouteResult, Router},
};

#[derive(Debug, thiserror::Error)]
pub enum OperationError {
    #[error("{scope} quota exceeded: {used} of {limit} operations used")]
    QuotaExceeded {
        scope: QuotaScope,
        limit: i64,
        used: i64,
    },

    #[error(transparent)]
    Provider(#[from] ProviderError),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl From<RouteError> for OperationError {
    fn from(error: RouteError) -> Self {
        match error {
            RouteError::Provider(e) => Self::Provider(e),
        }
    }
}

pub struct AiService {
    quota: QuotaEnforcer,
    router: Router,
}

impl AiService {
    pub fn new(quota: QuotaEnforcer, router: Router) -> Self {
        Self { quota, router }
    }

    /// Check quota, then route the operation.
    pub async fn perform(
        &self,
        user_id: Uuid,
        tier: SubscriptionTier,
        kind: OperationKind,
        input: String,
    ) -> Result<RouteResult, OperationError> {
        match self.quota.check_and_admit(user_id, tier).await? {
            QuotaDecision::Admit => {}
            QuotaDecision::Reject { scope, limit, used } => {
                tracing::info!(
                    user_id = %user_id,
                    tier = %tier,
                    scope = %scope,
                    limit,
                    used,
                    "Operation rejected by quota"
                );
                return Err(OperationError::QuotaExceeded { scope, limit, used });
            }
        }

        let result = self
            .router
            .route(user_id, tier, CompletionRequest::new(kind, input))
            .await?;
        Ok(result)
    }

    pub fn quota(&self) -> &QuotaEnforcer {
        &self.quota
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc as StdArc;

    use tokio_util::task::TaskTracker;

    use super::*;
    use crate::config::{PricingConfig, QuotasConfig, RetryConfig, RoutingConfig};
    use crate::db::{Database, UsageRepo};
    use crate::providers::test::TestProvider;
    use crate::providers::{ProviderId, ProviderRegistry};
    use crate::routing::ThreadRngSampler;
    use crate::settings::{RuntimeSettings, SettingsStore};

    async fn service() -> (Database, AiService, TaskTracker) {
        let db = Database::in_memory().await.unwrap();
        db.migrate().await.unwrap();
        let repo: StdArc<dyn UsageRepo> = StdArc::new(db.usage_repo());
        let settings = StdArc::new(SettingsStore::new(RuntimeSettings::from_config(
            &QuotasConfig::default(),
            &RoutingConfig::default(),
        )));
        let tracker = TaskTracker::new();

        let router = Router::new(
            ProviderRegistry::new(vec![
                StdArc::new(TestProvider::new(ProviderId::OpenAi)),
                StdArc::new(TestProvider::new(ProviderId::Gemini)),
            ]),
            reqwest::Client::new(),
            RetryConfig {
                max_attempts: 1,
                base_delay_ms: 1,
                max_delay_ms: 1,
                jitter: 0.0,
            },
            RoutingConfig::default(),
            PricingConfig::default(),
            repo.clone(),
            settings.clone(),
            Box::new(ThreadRngSampler),
            tracker.clone(),
        );

        let quota = QuotaEnforcer::new(repo, settings);
        (db, AiService::new(quota, router), tracker)
    }

    #[tokio::test]
    async fn test_perform_succeeds_and_records() {
        let (db, service, tracker) = service().await;
        let user = uuid::Uuid::new_v4();

        let result = service
            .perform(
                user,
                SubscriptionTier::Free,
                OperationKind::Parse,
                "resume".into(),
            )
            .await
            .unwrap();
        assert_eq!(result.provider, ProviderId::Gemini);

        tracker.close();
        tracker.wait().await;
        let records = db.usage_repo().list_recent(user, 10).await.unwrap();
        assert_eq!(records.len(), 1);
    }

    #[tokio::test]
    async fn test_quota_rejection_reaches_no_provider_and_writes_nothing() {
        let (db, service, tracker) = service().await;
        let user = uuid::Uuid::new_v4();
        let repo = db.usage_repo();

        // Fill the free daily window directly in the ledger.
        for _ in 0..10 {
            repo.insert(&crate::models::UsageRecord {
                id: uuid::Uuid::new_v4(),
                user_id: user,
                provider: "gemini".to_string(),
                model: "gemini-2.0-flash".to_string(),
                feature: "parse".to_string(),
                input_tokens: 10,
                output_tokens: 5,
                total_tokens: 15,
                cost: crate::pricing::Cost::zero("inr"),
                latency_ms: 100,
                outcome: crate::models::UsageOutcome::Success,
                error_message: None,
                quota_state: crate::models::QuotaState::Counted,
                metadata: serde_json::json!({}),
                created_at: chrono::Utc::now(),
            })
            .await
            .unwrap();
        }

        let result = service
            .perform(
                user,
                SubscriptionTier::Free,
                OperationKind::Parse,
                "resume".into(),
            )
            .await;
        assert!(matches!(
            result,
            Err(OperationError::QuotaExceeded {
                scope: QuotaScope::Daily,
                limit: 10,
                ..
            })
        ));

        tracker.close();
        tracker.wait().await;
        // Ten successes, no record for the rejected call.
        let records = repo.list_recent(user, 50).await.unwrap();
        assert_eq!(records.len(), 10);
    }
}
