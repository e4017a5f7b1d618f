//! Provider adapters.
//!
//! Each adapter speaks one vendor API and exposes the uniform
//! [`Provider`] trait. All adapters receive a shared `&reqwest::Client`;
//! the client is created once at startup and reqwest keeps per-host
//! connection pools internally, so each provider endpoint gets its own
//! pool.

pub mod error;
pub mod gemini;
pub mod open_ai;
pub mod retry;

use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
pub use error::{ProviderError, is_transient_message};
use serde::{Deserialize, Serialize};

use crate::{
    config::ProvidersConfig,
    models::{Completion, CompletionRequest, OperationKind},
};

/// Identity of an AI backend.
///
/// OpenAI is the primary quality-tier provider, Gemini the secondary
/// cost-tier provider. Which role each plays is decided by the routing
/// configuration, not by this enum.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderId {
    OpenAi,
    Gemini,
}

impl ProviderId {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Gemini => "gemini",
        }
    }
}

impl std::fmt::Display for ProviderId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// System instruction sent to the provider for each operation kind.
///
/// Kept provider-agnostic; adapters place it wherever their API expects
/// system-level guidance.
pub(crate) fn instruction_for(kind: OperationKind) -> &'static str {
    match kind {
        OperationKind::Parse => {
            "Extract the resume below into structured JSON with keys: name, \
             contact, experience, education, skills. Return only JSON."
        }
        OperationKind::Enhance => {
            "Rewrite the resume section below to be concise and \
             achievement-oriented. Preserve all facts. Return only the \
             rewritten text."
        }
        OperationKind::Summarize => {
            "Write a 2-3 sentence professional summary for the resume below."
        }
        OperationKind::Categorize => {
            "Group the skills below into named categories. Return JSON \
             mapping category names to skill arrays."
        }
        OperationKind::Match => {
            "Score how well the resume matches the job description below, \
             0-100, and list the top gaps. Return JSON with keys: score, gaps."
        }
        OperationKind::Generate => {
            "Write a tailored, one-page cover letter based on the resume and \
             job description below."
        }
    }
}

/// Uniform operation interface over a vendor API.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Stable identity used for routing, pricing, and usage attribution.
    fn id(&self) -> ProviderId;

    /// Model name this adapter is configured to call.
    fn model(&self) -> &str;

    /// Execute one operation. Implementations perform exactly one HTTP
    /// call per invocation; retries live in [`retry::with_retry`], outside
    /// the adapter.
    async fn complete(
        &self,
        client: &reqwest::Client,
        request: &CompletionRequest,
    ) -> Result<Completion, ProviderError>;
}

/// Lookup table from provider identity to adapter, built once at startup.
pub struct ProviderRegistry {
    providers: HashMap<ProviderId, Arc<dyn Provider>>,
}

impl ProviderRegistry {
    /// Build a registry from arbitrary adapters, keyed by their own ids.
    /// Tests use this to register scriptable providers.
    pub fn new(providers: Vec<Arc<dyn Provider>>) -> Self {
        Self {
            providers: providers.into_iter().map(|p| (p.id(), p)).collect(),
        }
    }

    /// Build the production registry from configuration. Fails fast on
    /// missing credentials.
    pub fn from_config(config: &ProvidersConfig) -> Result<Self, ProviderError> {
        Ok(Self::new(vec![
            Arc::new(open_ai::OpenAiProvider::from_config(&config.openai)?),
            Arc::new(gemini::GeminiProvider::from_config(&config.gemini)?),
        ]))
    }

    pub fn get(&self, id: ProviderId) -> Result<&Arc<dyn Provider>, ProviderError> {
        self.providers.get(&id).ok_or_else(|| {
            ProviderError::Configuration(format!("provider '{id}' is not registered"))
        })
    }
}
