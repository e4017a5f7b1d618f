//! Admin surface: quota inspection, limit changes, resets, analytics.
//!
//! Authentication is the caller's responsibility; these routes are meant
//! to sit behind the main backend, never exposed to end users directly.

use axum::{
    Json,
    extract::{Path, Query, State},
};
use chrono::{Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;
use uuid::Uuid;

use crate::{
    models::{SubscriptionTier, UsageSummary, UserQuotaStatus},
    routes::{ApiError, AppState},
    settings::RuntimeSettings,
};

/// GET /admin/quotas
///
/// The live per-tier limits plus the settings version that produced them.
pub async fn list_quotas(State(state): State<AppState>) -> Json<serde_json::Value> {
    let settings = state.settings.snapshot();
    Json(json!({
        "quotas": settings.quotas,
        "updated_by": settings.updated_by,
        "updated_at": settings.updated_at,
    }))
}

#[derive(Debug, Deserialize)]
pub struct TierQuery {
    pub tier: SubscriptionTier,
}

/// GET /admin/quotas/{user_id}?tier=free
pub async fn user_quota_status(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<TierQuery>,
) -> Result<Json<UserQuotaStatus>, ApiError> {
    let status = state
        .service
        .quota()
        .status(user_id, query.tier)
        .await?;
    Ok(Json(status))
}

/// POST /admin/quotas/{user_id}/reset
///
/// Forgive today's usage for one user. History is retained.
pub async fn reset_daily(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let forgiven = state.service.quota().reset_daily(user_id).await?;
    info!(user_id = %user_id, forgiven, "Daily quota reset");
    Ok(Json(json!({ "user_id": user_id, "forgiven": forgiven })))
}

#[derive(Debug, Deserialize)]
pub struct UpdateLimitsRequest {
    pub tier: SubscriptionTier,
    pub daily: i64,
    pub monthly: i64,
    pub updated_by: String,
}

/// PUT /admin/limits
pub async fn update_limits(
    State(state): State<AppState>,
    Json(request): Json<UpdateLimitsRequest>,
) -> Result<Json<RuntimeSettings>, ApiError> {
    let settings = state.settings.update_limits(
        request.tier,
        request.daily,
        request.monthly,
        &request.updated_by,
    )?;
    info!(
        tier = %request.tier,
        daily = request.daily,
        monthly = request.monthly,
        updated_by = %request.updated_by,
        "Tier limits updated"
    );
    Ok(Json((*settings).clone()))
}

/// GET /admin/settings
pub async fn get_settings(State(state): State<AppState>) -> Json<RuntimeSettings> {
    Json((*state.settings.snapshot()).clone())
}

#[derive(Debug, Deserialize)]
pub struct UpdateSettingsRequest {
    pub hybrid_weight: Option<f64>,
    pub fallback_on_primary_failure: Option<bool>,
    pub updated_by: String,
}

/// PUT /admin/settings
pub async fn update_settings(
    State(state): State<AppState>,
    Json(request): Json<UpdateSettingsRequest>,
) -> Result<Json<RuntimeSettings>, ApiError> {
    if let Some(weight) = request.hybrid_weight {
        state
            .settings
            .update_hybrid_weight(weight, &request.updated_by)?;
    }
    if let Some(enabled) = request.fallback_on_primary_failure {
        state
            .settings
            .update_fallback_on_primary_failure(enabled, &request.updated_by);
    }
    info!(updated_by = %request.updated_by, "Runtime settings updated");
    Ok(Json((*state.settings.snapshot()).clone()))
}

#[derive(Debug, Deserialize)]
pub struct ResetSettingsRequest {
    pub updated_by: String,
}

/// POST /admin/settings/reset
///
/// Discard every runtime change and return to the startup configuration.
pub async fn reset_settings(
    State(state): State<AppState>,
    Json(request): Json<ResetSettingsRequest>,
) -> Json<RuntimeSettings> {
    let settings = state.settings.reset(&request.updated_by);
    info!(updated_by = %request.updated_by, "Runtime settings reset to startup values");
    Json((*settings).clone())
}

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    pub user_id: Option<Uuid>,
    /// Window length in days, default 30.
    pub days: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct SummaryResponse {
    pub since: chrono::DateTime<Utc>,
    #[serde(flatten)]
    pub summary: UsageSummary,
}

/// GET /admin/usage/summary?user_id=...&days=7
pub async fn usage_summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> Result<Json<SummaryResponse>, ApiError> {
    let days = query.days.unwrap_or(30).clamp(1, 365);
    let since = Utc::now() - Duration::days(days);
    let summary = state.usage.summary(query.user_id, since).await?;
    Ok(Json(SummaryResponse { since, summary }))
}

/// DELETE /admin/users/{user_id}
///
/// Remove every ledger record for the user. The one deletion path in the
/// system, for account removal.
pub async fn purge_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let deleted = state.usage.purge_user(user_id).await?;
    info!(user_id = %user_id, deleted, "User ledger purged");
    Ok(Json(json!({ "user_id": user_id, "deleted": deleted })))
}
