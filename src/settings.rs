//! Runtime-adjustable settings.
//!
//! Quota limits and the hybrid traffic weight can be changed through the
//! admin surface without a restart. Readers take a cheap `Arc` snapshot,
//! so a request observes one consistent view of the settings for its
//! whole lifetime even while an admin update lands concurrently.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};

use crate::config::{QuotasConfig, RoutingConfig, TierQuota};
use crate::models::SubscriptionTier;

#[derive(Debug, thiserror::Error)]
pub enum SettingsError {
    #[error("Invalid setting: {0}")]
    Invalid(String),
}

/// One immutable version of the live settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RuntimeSettings {
    pub quotas: QuotasConfig,
    pub hybrid_weight: f64,
    pub fallback_on_primary_failure: bool,
    /// Who produced this version ("startup" for the config-file values).
    pub updated_by: String,
    pub updated_at: DateTime<Utc>,
}

impl RuntimeSettings {
    pub fn from_config(quotas: &QuotasConfig, routing: &RoutingConfig) -> Self {
        Self {
            quotas: quotas.clone(),
            hybrid_weight: routing.hybrid_weight,
            fallback_on_primary_failure: routing.fallback_on_primary_failure,
            updated_by: "startup".to_string(),
            updated_at: Utc::now(),
        }
    }
}

/// Copy-on-write store for [`RuntimeSettings`].
///
/// Updates clone the current version, apply the change, and swap the
/// `Arc`. In-flight requests keep reading the snapshot they took.
pub struct SettingsStore {
    current: RwLock<Arc<RuntimeSettings>>,
    startup: RuntimeSettings,
}

impl SettingsStore {
    pub fn new(settings: RuntimeSettings) -> Self {
        Self {
            current: RwLock::new(Arc::new(settings.clone())),
            startup: settings,
        }
    }

    /// The current settings version.
    pub fn snapshot(&self) -> Arc<RuntimeSettings> {
        self.current.read().clone()
    }

    /// Replace the quota limits for one tier.
    ///
    /// Both limits must be at least 1; unbounded tiers are expressed by
    /// the admin tier, not by zeroing limits here.
    pub fn update_limits(
        &self,
        tier: SubscriptionTier,
        daily: i64,
        monthly: i64,
        updated_by: &str,
    ) -> Result<Arc<RuntimeSettings>, SettingsError> {
        if daily < 1 || monthly < 1 {
            return Err(SettingsError::Invalid(format!(
                "limits must be >= 1, got daily={daily} monthly={monthly}"
            )));
        }
        if tier.is_admin() {
            return Err(SettingsError::Invalid(
                "the admin tier is exempt from quotas".to_string(),
            ));
        }

        Ok(self.apply(updated_by, |settings| {
            settings
                .quotas
                .set_for_tier(tier, TierQuota::new(daily, monthly));
        }))
    }

    /// Replace the hybrid traffic weight.
    pub fn update_hybrid_weight(
        &self,
        weight: f64,
        updated_by: &str,
    ) -> Result<Arc<RuntimeSettings>, SettingsError> {
        if !(0.0..=1.0).contains(&weight) || !weight.is_finite() {
            return Err(SettingsError::Invalid(format!(
                "hybrid_weight must be within [0, 1], got {weight}"
            )));
        }

        Ok(self.apply(updated_by, |settings| {
            settings.hybrid_weight = weight;
        }))
    }

    /// Toggle degradation from the quality provider to the cost provider.
    pub fn update_fallback_on_primary_failure(
        &self,
        enabled: bool,
        updated_by: &str,
    ) -> Arc<RuntimeSettings> {
        self.apply(updated_by, |settings| {
            settings.fallback_on_primary_failure = enabled;
        })
    }

    /// Discard all runtime changes and return to the startup values.
    pub fn reset(&self, updated_by: &str) -> Arc<RuntimeSettings> {
        let mut settings = self.startup.clone();
        settings.updated_by = updated_by.to_string();
        settings.updated_at = Utc::now();
        let next = Arc::new(settings);
        *self.current.write() = next.clone();
        next
    }

    fn apply(
        &self,
        updated_by: &str,
        mutate: impl FnOnce(&mut RuntimeSettings),
    ) -> Arc<RuntimeSettings> {
        let mut guard = self.current.write();
        let mut settings = (**guard).clone();
        mutate(&mut settings);
        settings.updated_by = updated_by.to_string();
        settings.updated_at = Utc::now();
        let next = Arc::new(settings);
        *guard = next.clone();
        next
    }
}
