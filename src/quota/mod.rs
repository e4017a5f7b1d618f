//! Quota enforcement over the usage ledger.
//!
//! Limits are counted, not stored: the number of successful, still-counted
//! records inside the current UTC day and calendar month is compared
//! against the tier limits from the live settings. Failed operations never
//! consume quota, and an administrative daily reset flips records to
//! forgiven rather than deleting them.
//!
//! Enforcement is check-then-act without a transaction around the provider
//! call, so concurrent requests near the boundary can land a few
//! operations past the limit. The limits here are product soft limits,
//! and the ledger stays truthful about what ran; an occasional overshoot
//! is preferable to serializing every operation through the database.

use std::sync::Arc;

use chrono::{DateTime, Datelike, Utc};
use serde::Serialize;
use uuid::Uuid;

use crate::{
    db::{DbResult, UsageRepo},
    models::{QuotaSnapshot, SubscriptionTier, UserQuotaStatus},
    settings::SettingsStore,
};

/// Which quota window rejected an operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum QuotaScope {
    Daily,
    Monthly,
}

impl QuotaScope {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Monthly => "monthly",
        }
    }
}

impl std::fmt::Display for QuotaScope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of an admission check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuotaDecision {
    Admit,
    Reject {
        scope: QuotaScope,
        limit: i64,
        used: i64,
    },
}

/// Start of the current UTC day.
fn day_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc()
}

/// Start of the current UTC calendar month.
fn month_start(now: DateTime<Utc>) -> DateTime<Utc> {
    now.date_naive()
        .with_day(1)
        .unwrap_or(now.date_naive())
        .and_hms_opt(0, 0, 0)
        .unwrap_or_default()
        .and_utc()
}

pub struct QuotaEnforcer {
    usage: Arc<dyn UsageRepo>,
    settings: Arc<SettingsStore>,
}

impl QuotaEnforcer {
    pub fn new(usage: Arc<dyn UsageRepo>, settings: Arc<SettingsStore>) -> Self {
        Self { usage, settings }
    }

    /// Decide whether one more operation is allowed right now.
    ///
    /// Both windows must have headroom; the daily window is checked first
    /// so boundary rejections name the tighter scope. Admin users bypass
    /// the check without touching the database.
    pub async fn check_and_admit(
        &self,
        user_id: Uuid,
        tier: SubscriptionTier,
    ) -> DbResult<QuotaDecision> {
        if tier.is_admin() {
            return Ok(QuotaDecision::Admit);
        }

        let quota = self.settings.snapshot().quotas.for_tier(tier);
        let now = Utc::now();

        if let Some(limit) = quota.daily {
            let used = self
                .usage
                .count_quota_success(user_id, day_start(now))
                .await?;
            if used >= limit {
                return Ok(QuotaDecision::Reject {
                    scope: QuotaScope::Daily,
                    limit,
                    used,
                });
            }
        }

        if let Some(limit) = quota.monthly {
            let used = self
                .usage
                .count_quota_success(user_id, month_start(now))
                .await?;
            if used >= limit {
                return Ok(QuotaDecision::Reject {
                    scope: QuotaScope::Monthly,
                    limit,
                    used,
                });
            }
        }

        Ok(QuotaDecision::Admit)
    }

    /// Current standing in both windows, for the admin surface.
    pub async fn status(
        &self,
        user_id: Uuid,
        tier: SubscriptionTier,
    ) -> DbResult<UserQuotaStatus> {
        let quota = self.settings.snapshot().quotas.for_tier(tier);
        let now = Utc::now();

        let daily_used = self
            .usage
            .count_quota_success(user_id, day_start(now))
            .await?;
        let monthly_used = self
            .usage
            .count_quota_success(user_id, month_start(now))
            .await?;

        Ok(UserQuotaStatus {
            user_id,
            tier,
            daily: QuotaSnapshot::new(daily_used, quota.daily),
            monthly: QuotaSnapshot::new(monthly_used, quota.monthly),
        })
    }

    /// Forgive today's successful operations so the user can continue.
    /// Returns the number of records flipped. Monthly counting also stops
    /// seeing them; the ledger itself is untouched.
    pub async fn reset_daily(&self, user_id: Uuid) -> DbResult<u64> {
        self.usage
            .forgive_since(user_id, day_start(Utc::now()))
            .await
    }
}
