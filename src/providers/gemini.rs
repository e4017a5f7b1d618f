//! Gemini adapter — the secondary cost-tier provider.

use http::header::CONTENT_TYPE;
use serde::Deserialize;
use serde_json::json;

use crate::{
    config::ProviderEndpointConfig,
    models::{Completion, CompletionRequest, TokenUsage},
    providers::{Provider, ProviderError, ProviderId, instruction_for},
};

pub struct GeminiProvider {
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    usage_metadata: Option<UsageMetadata>,
    model_version: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<ContentPart>,
}

#[derive(Debug, Deserialize)]
struct ContentPart {
    text: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(rename_all = "camelCase")]
struct UsageMetadata {
    #[serde(default)]
    prompt_token_count: i64,
    #[serde(default)]
    candidates_token_count: i64,
}

impl GeminiProvider {
    pub fn from_config(config: &ProviderEndpointConfig) -> Result<Self, ProviderError> {
        let api_key = config.api_key.trim();
        if api_key.is_empty() {
            return Err(ProviderError::Configuration(
                "Gemini API key is not configured (providers.gemini.api_key)".into(),
            ));
        }
        Ok(Self {
            api_key: api_key.to_string(),
            base_url: config.base_url.trim_end_matches('/').to_string(),
            model: config.model.clone(),
        })
    }
}

#[async_trait::async_trait]
impl Provider for GeminiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::Gemini
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        client: &reqwest::Client,
        request: &CompletionRequest,
    ) -> Result<Completion, ProviderError> {
        let url = format!("{}/models/{}:generateContent", self.base_url, self.model);
        let body = json!({
            "systemInstruction": {
                "parts": [{ "text": instruction_for(request.kind) }],
            },
            "contents": [
                { "role": "user", "parts": [{ "text": request.input }] },
            ],
        });

        let response = client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header(CONTENT_TYPE, "application/json")
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            return Err(ProviderError::Http {
                status: status.as_u16(),
                message,
            });
        }

        let parsed: GenerateContentResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let text = parsed
            .candidates
            .first()
            .and_then(|c| c.content.as_ref())
            .and_then(|content| content.parts.first())
            .and_then(|part| part.text.clone())
            .ok_or_else(|| {
                ProviderError::InvalidResponse("generateContent returned no candidates".into())
            })?;

        let usage = parsed.usage_metadata.unwrap_or_default();
        Ok(Completion {
            text,
            usage: TokenUsage::new(usage.prompt_token_count, usage.candidates_token_count),
            model: parsed.model_version.unwrap_or_else(|| self.model.clone()),
        })
    }
}
