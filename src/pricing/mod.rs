//! Token cost model.
//!
//! Costs are stored in microcents (1/1,000,000 of a dollar) for precision:
//! $0.000207 = 207 microcents. Rates are configured per provider as
//! microcents per 1M input/output tokens, matching how vendors publish
//! pricing. The display amount is the base cost converted at a fixed rate
//! into the shop currency shown to end users.
//!
//! The whole module is a pure function of its configuration so it can be
//! unit-tested without any network involvement.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::providers::ProviderId;

/// Rates for one provider, in microcents per 1M tokens.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderRates {
    #[serde(default)]
    pub input_per_1m_tokens: i64,
    #[serde(default)]
    pub output_per_1m_tokens: i64,
}

/// Monetary cost of a single operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cost {
    /// Base cost in microcents (USD).
    pub microcents: i64,
    /// Cost converted to the display currency, rounded to 4 decimal places.
    pub display: Decimal,
    /// ISO-ish code of the display currency (lowercase).
    pub currency: String,
}

impl Cost {
    /// Zero cost in the given display currency. Used for failed operations
    /// where no tokens were billed.
    pub fn zero(currency: impl Into<String>) -> Self {
        Self {
            microcents: 0,
            display: Decimal::ZERO,
            currency: currency.into(),
        }
    }
}

fn default_openai_rates() -> ProviderRates {
    // gpt-4o-mini list pricing: $0.15 / $0.60 per 1M tokens.
    ProviderRates {
        input_per_1m_tokens: 150_000,
        output_per_1m_tokens: 600_000,
    }
}

fn default_gemini_rates() -> ProviderRates {
    // gemini-2.0-flash list pricing: $0.10 / $0.40 per 1M tokens.
    ProviderRates {
        input_per_1m_tokens: 100_000,
        output_per_1m_tokens: 400_000,
    }
}

fn default_display_currency() -> String {
    "inr".to_string()
}

fn default_units_per_usd() -> Decimal {
    Decimal::new(83, 0)
}

/// Rate table plus display-currency conversion.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct PricingConfig {
    #[serde(default = "default_openai_rates")]
    pub openai: ProviderRates,

    #[serde(default = "default_gemini_rates")]
    pub gemini: ProviderRates,

    /// Currency shown to end users.
    #[serde(default = "default_display_currency")]
    pub display_currency: String,

    /// Fixed conversion rate from USD to the display currency.
    #[serde(default = "default_units_per_usd")]
    pub units_per_usd: Decimal,
}

impl Default for PricingConfig {
    fn default() -> Self {
        Self {
            openai: default_openai_rates(),
            gemini: default_gemini_rates(),
            display_currency: default_display_currency(),
            units_per_usd: default_units_per_usd(),
        }
    }
}

impl PricingConfig {
    pub fn rates_for(&self, provider: ProviderId) -> ProviderRates {
        match provider {
            ProviderId::OpenAi => self.openai,
            ProviderId::Gemini => self.gemini,
        }
    }

    /// Compute the cost of one call.
    ///
    /// Deterministic and side-effect free. Intermediate math uses `i128`
    /// so large token counts cannot overflow; the result saturates at
    /// `i64::MAX`.
    pub fn cost(&self, provider: ProviderId, tokens_in: i64, tokens_out: i64) -> Cost {
        let rates = self.rates_for(provider);

        let mut total: i128 = 0;
        total += (tokens_in.max(0) as i128 * rates.input_per_1m_tokens as i128) / 1_000_000;
        total += (tokens_out.max(0) as i128 * rates.output_per_1m_tokens as i128) / 1_000_000;
        let microcents = total.min(i64::MAX as i128) as i64;

        // microcents -> dollars has scale 6.
        let dollars = Decimal::new(microcents, 6);
        let display = (dollars * self.units_per_usd).round_dp(4);

        Cost {
            microcents,
            display,
            currency: self.display_currency.clone(),
        }
    }
}
