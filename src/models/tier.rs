use serde::{Deserialize, Serialize};

/// Subscription tier of a resume-builder account.
///
/// The tier is immutable for the duration of a single routed operation:
/// a tier change takes effect on the next operation, never retroactively.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubscriptionTier {
    Free,
    OneTime,
    Pro,
    Premium,
    Student,
    Lifetime,
    Admin,
}

impl SubscriptionTier {
    /// All tiers, in display order. Used by the admin quota listing.
    pub const ALL: [SubscriptionTier; 7] = [
        Self::Free,
        Self::OneTime,
        Self::Pro,
        Self::Premium,
        Self::Student,
        Self::Lifetime,
        Self::Admin,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Free => "free",
            Self::OneTime => "one_time",
            Self::Pro => "pro",
            Self::Premium => "premium",
            Self::Student => "student",
            Self::Lifetime => "lifetime",
            Self::Admin => "admin",
        }
    }

    /// Admin accounts bypass quota enforcement entirely, regardless of
    /// any limits configured for the tier.
    pub fn is_admin(&self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for SubscriptionTier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
