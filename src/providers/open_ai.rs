//! OpenAI adapter — the primary quality-tier provider.

use http::header::{AUTHORIZATION, CONTENT_TYPE};
use serde::Deserialize;
use serde_json::json;

use crate::{
    config::ProviderEndpointConfig,
    models::{Completion, CompletionRequest, TokenUsage},
    providers::{Provider, ProviderError, ProviderId, instruction_for},
};

pub struct OpenAiProvider {
    api_key: String,
    base_url: String,
    model: String,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    model: Option<String>,
    choices: Vec<ChatChoice>,
    usage: Option<ChatUsage>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Debug, Deserialize)]
struct ChatMessage {
    content: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
struct ChatUsage {
    #[serde(default)]
    prompt_tokens: i64,
    #[serde(default)]
    completion_tokens: i64,
}

impl OpenAiProvider {
    pub fn from_config(config: &ProviderEndpointConfig) -> Result<Self, ProviderError> {
        let api_key = config.api_key.trim();
        if api_key.is_empty() {
            return Err(ProviderError::Configuration(
                "OpenAI API key is not configured (providers.openai.api_key)".into(),
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
impl Provider for OpenAiProvider {
    fn id(&self) -> ProviderId {
        ProviderId::OpenAi
    }

    fn model(&self) -> &str {
        &self.model
    }

    async fn complete(
        &self,
        client: &reqwest::Client,
        request: &CompletionRequest,
    ) -> Result<Completion, ProviderError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = json!({
            "model": self.model,
            "messages": [
                { "role": "system", "content": instruction_for(request.kind) },
                { "role": "user", "content": request.input },
            ],
        });

        let response = client
            .post(&url)
            .header(AUTHORIZATION, format!("Bearer {}", self.api_key))
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

        let parsed: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| ProviderError::InvalidResponse(e.to_string()))?;

        let text = parsed
            .choices
            .first()
            .and_then(|c| c.message.content.clone())
            .ok_or_else(|| {
                ProviderError::InvalidResponse("chat completion contained no choices".into())
            })?;

        let usage = parsed.usage.unwrap_or_default();
        Ok(Completion {
            text,
            usage: TokenUsage::new(usage.prompt_tokens, usage.completion_tokens),
            model: parsed.model.unwrap_or_else(|| self.model.clone()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderEndpointConfig;

    #[test]
    fn test_missing_api_key_is_configuration_error() {
        let config = ProviderEndpointConfig {
            api_key: "  ".into(),
            ..ProviderEndpointConfig::openai_defaults()
        };
        assert!(matches!(
            OpenAiProvider::from_config(&config),
            Err(ProviderError::Configuration(_))
        ));
    }

    #[test]
    fn test_base_url_trailing_slash_stripped() {
        let config = ProviderEndpointConfig {
            api_key: "sk-test".into(),
            base_url: "https://api.openai.com/v1/".into(),
            ..ProviderEndpointConfig::openai_defaults()
        };
        let provider = OpenAiProvider::from_config(&config).unwrap();
        assert_eq!(provider.base_url, "https://api.openai.com/v1");
    }
}
