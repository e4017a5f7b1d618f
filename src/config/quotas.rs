use serde::{Deserialize, Serialize};

use crate::models::SubscriptionTier;

/// Operation-count limits for one tier. `None` means unbounded.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TierQuota {
    #[serde(default)]
    pub daily: Option<i64>,
    #[serde(default)]
    pub monthly: Option<i64>,
}

impl TierQuota {
    pub const fn new(daily: i64, monthly: i64) -> Self {
        Self {
            daily: Some(daily),
            monthly: Some(monthly),
        }
    }

    pub const UNBOUNDED: TierQuota = TierQuota {
        daily: None,
        monthly: None,
    };
}

fn default_free() -> TierQuota {
    TierQuota::new(10, 100)
}

fn default_one_time() -> TierQuota {
    TierQuota::new(25, 50)
}

fn default_pro() -> TierQuota {
    TierQuota::new(100, 1_500)
}

fn default_premium() -> TierQuota {
    TierQuota::new(300, 5_000)
}

fn default_student() -> TierQuota {
    TierQuota::new(100, 1_500)
}

fn default_lifetime() -> TierQuota {
    TierQuota::new(300, 5_000)
}

/// Per-tier daily and monthly operation limits.
///
/// These are the startup defaults; the live values sit in the settings
/// store and can be changed at runtime through the admin surface. The
/// admin tier carries no limits here because quota enforcement bypasses
/// it entirely.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct QuotasConfig {
    #[serde(default = "default_free")]
    pub free: TierQuota,

    #[serde(default = "default_one_time")]
    pub one_time: TierQuota,

    #[serde(default = "default_pro")]
    pub pro: TierQuota,

    #[serde(default = "default_premium")]
    pub premium: TierQuota,

    #[serde(default = "default_student")]
    pub student: TierQuota,

    #[serde(default = "default_lifetime")]
    pub lifetime: TierQuota,
}

impl Default for QuotasConfig {
    fn default() -> Self {
        Self {
            free: default_free(),
            one_time: default_one_time(),
            pro: default_pro(),
            premium: default_premium(),
            student: default_student(),
            lifetime: default_lifetime(),
        }
    }
}

impl QuotasConfig {
    pub fn for_tier(&self, tier: SubscriptionTier) -> TierQuota {
        match tier {
            SubscriptionTier::Free => self.free,
            SubscriptionTier::OneTime => self.one_time,
            SubscriptionTier::Pro => self.pro,
            SubscriptionTier::Premium => self.premium,
            SubscriptionTier::Student => self.student,
            SubscriptionTier::Lifetime => self.lifetime,
            SubscriptionTier::Admin => TierQuota::UNBOUNDED,
        }
    }

    pub fn set_for_tier(&mut self, tier: SubscriptionTier, quota: TierQuota) {
        match tier {
            SubscriptionTier::Free => self.free = quota,
            SubscriptionTier::OneTime => self.one_time = quota,
            SubscriptionTier::Pro => self.pro = quota,
            SubscriptionTier::Premium => self.premium = quota,
            SubscriptionTier::Student => self.student = quota,
            SubscriptionTier::Lifetime => self.lifetime = quota,
            // Admin limits are never consulted; ignore writes.
            SubscriptionTier::Admin => {}
        }
    }
}
