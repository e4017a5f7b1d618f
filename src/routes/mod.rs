//! HTTP surface.

pub mod admin;
pub mod operations;

use std::sync::Arc;

use axum::{
    Json, Router as AxumRouter,
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::{get, post, put},
};
use serde::Serialize;
use serde_json::json;
use tower_http::{cors::CorsLayer, trace::TraceLayer};

use crate::{db::UsageRepo, quota::QuotaScope, service::AiService, settings::SettingsStore};

#[derive(Clone)]
pub struct AppState {
    pub service: Arc<AiService>,
    pub settings: Arc<SettingsStore>,
    pub usage: Arc<dyn UsageRepo>,
}

/// Error body: `{"error": {"type": "...", "message": "...", ...}}`.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: serde_json::Value,
}

/// API-level errors, mapped onto HTTP statuses.
#[derive(Debug)]
pub enum ApiError {
    QuotaExceeded {
        scope: QuotaScope,
        limit: i64,
        used: i64,
    },
    Upstream(String),
    BadRequest(String),
    Internal(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, body) = match self {
            ApiError::QuotaExceeded { scope, limit, used } => (
                StatusCode::TOO_MANY_REQUESTS,
                json!({
                    "type": "quota_exceeded",
                    "message": format!("{scope} quota exceeded"),
                    "scope": scope,
                    "limit": limit,
                    "used": used,
                }),
            ),
            ApiError::Upstream(message) => (
                StatusCode::BAD_GATEWAY,
                json!({ "type": "upstream_error", "message": message }),
            ),
            ApiError::BadRequest(message) => (
                StatusCode::BAD_REQUEST,
                json!({ "type": "invalid_request", "message": message }),
            ),
            ApiError::Internal(message) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({ "type": "internal_error", "message": message }),
            ),
        };

        (status, Json(ErrorBody { error: body })).into_response()
    }
}

impl From<crate::service::OperationError> for ApiError {
    fn from(error: crate::service::OperationError) -> Self {
        use crate::service::OperationError;
        match error {
            OperationError::QuotaExceeded { scope, limit, used } => {
                Self::QuotaExceeded { scope, limit, used }
            }
            OperationError::Provider(e) => Self::Upstream(e.to_string()),
            OperationError::Db(e) => Self::Internal(e.to_string()),
        }
    }
}

impl From<crate::db::DbError> for ApiError {
    fn from(error: crate::db::DbError) -> Self {
        Self::Internal(error.to_string())
    }
}

impl From<crate::settings::SettingsError> for ApiError {
    fn from(error: crate::settings::SettingsError) -> Self {
        Self::BadRequest(error.to_string())
    }
}

async fn health() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Assemble the full application router.
pub fn build_router(state: AppState) -> AxumRouter {
    AxumRouter::new()
        .route("/health", get(health))
        .route("/v1/operations", post(operations::run_operation))
        .route("/admin/quotas", get(admin::list_quotas))
        .route("/admin/quotas/{user_id}", get(admin::user_quota_status))
        .route("/admin/quotas/{user_id}/reset", post(admin::reset_daily))
        .route("/admin/limits", put(admin::update_limits))
        .route(
            "/admin/settings",
            get(admin::get_settings).put(admin::update_settings),
        )
        .route("/admin/settings/reset", post(admin::reset_settings))
        .route("/admin/usage/summary", get(admin::usage_summary))
        .route(
            "/admin/users/{user_id}",
            axum::routing::delete(admin::purge_user),
        )
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}
