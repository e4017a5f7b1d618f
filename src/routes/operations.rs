//! The operation endpoint.

use axum::{Json, extract::State};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    models::{OperationKind, SubscriptionTier, TokenUsage},
    pricing::Cost,
    routes::{ApiError, AppState},
};

#[derive(Debug, Deserialize)]
pub struct OperationRequest {
    pub user_id: Uuid,
    pub tier: SubscriptionTier,
    pub operation: OperationKind,
    pub input: String,
}

#[derive(Debug, Serialize)]
pub struct OperationResponse {
    pub text: String,
    pub provider: String,
    pub model: String,
    pub usage: TokenUsage,
    pub cost: Cost,
    pub fallback: bool,
}

/// POST /v1/operations
pub async fn run_operation(
    State(state): State<AppState>,
    Json(request): Json<OperationRequest>,
) -> Result<Json<OperationResponse>, ApiError> {
    if request.input.trim().is_empty() {
        return Err(ApiError::BadRequest("input must not be empty".into()));
    }

    let result = state
        .service
        .perform(
            request.user_id,
            request.tier,
            request.operation,
            request.input,
        )
        .await?;

    Ok(Json(OperationResponse {
        text: result.text,
        provider: result.provider.as_str().to_string(),
        model: result.model,
        usage: result.usage,
        cost: result.cost,
        fallback: result.fallback,
    }))
}
