use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{models::SubscriptionTier, pricing::Cost};

/// Terminal outcome of a routed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UsageOutcome {
    Success,
    Error,
}

impl UsageOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Success => "success",
            Self::Error => "error",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "success" => Self::Success,
            _ => Self::Error,
        }
    }
}

/// Whether a record counts toward quota windows.
///
/// A daily reset flips records to `Forgiven` instead of deleting them, so
/// analytics queries still see the full history while quota counting
/// ignores the forgiven rows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaState {
    Counted,
    Forgiven,
}

impl QuotaState {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Counted => "counted",
            Self::Forgiven => "forgiven",
        }
    }

    pub fn parse(s: &str) -> Self {
        match s {
            "forgiven" => Self::Forgiven,
            _ => Self::Counted,
        }
    }
}

/// One usage record per attempted operation, success or failure.
///
/// Append-only: nothing is ever mutated after insert except `quota_state`,
/// which an administrative reset may flip to `Forgiven`. The `provider`
/// field names the backend that actually produced the result, which after
/// a fallback differs from the originally targeted one (the original
/// target and triggering error live in `metadata`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UsageRecord {
    pub id: Uuid,
    pub user_id: Uuid,
    pub provider: String,
    pub model: String,
    /// Operation kind, stored as its wire name (`parse`, `enhance`, ...).
    pub feature: String,
    pub input_tokens: i64,
    pub output_tokens: i64,
    /// Invariant: `total_tokens = input_tokens + output_tokens`.
    pub total_tokens: i64,
    pub cost: Cost,
    pub latency_ms: i64,
    pub outcome: UsageOutcome,
    pub error_message: Option<String>,
    pub quota_state: QuotaState,
    /// Free-form context: `{"fallback": true, "fallback_from": "gemini",
    /// "fallback_error": "..."}` when a fallback occurred.
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

/// Point-in-time usage against a single quota window. Derived from record
/// counts, never stored.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct QuotaSnapshot {
    pub used: i64,
    /// None means the window is unbounded.
    pub limit: Option<i64>,
    /// `max(0, limit - used)`; None when unbounded.
    pub remaining: Option<i64>,
    /// Fraction of the limit consumed, 0.0 when unbounded.
    pub percentage: f64,
}

impl QuotaSnapshot {
    pub fn new(used: i64, limit: Option<i64>) -> Self {
        let remaining = limit.map(|l| (l - used).max(0));
        let percentage = match limit {
            Some(l) if l > 0 => (used as f64 / l as f64).min(1.0) * 100.0,
            _ => 0.0,
        };
        Self {
            used,
            limit,
            remaining,
            percentage,
        }
    }
}

/// Daily and monthly standing for one user, as served by the admin surface.
#[derive(Debug, Clone, Serialize)]
pub struct UserQuotaStatus {
    pub user_id: Uuid,
    pub tier: SubscriptionTier,
    pub daily: QuotaSnapshot,
    pub monthly: QuotaSnapshot,
}

/// Aggregated usage over a window, for the admin analytics surface.
/// Counts every attempt regardless of quota state, so a reset does not
/// rewrite history.
#[derive(Debug, Clone, Default, Serialize)]
pub struct UsageSummary {
    pub request_count: i64,
    pub success_count: i64,
    pub error_count: i64,
    pub input_tokens: i64,
    pub output_tokens: i64,
    pub total_tokens: i64,
    pub cost_microcents: i64,
}
