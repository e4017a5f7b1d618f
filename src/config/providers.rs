use serde::{Deserialize, Serialize};

fn default_openai_base_url() -> String {
    "https://api.openai.com/v1".to_string()
}

fn default_openai_model() -> String {
    "gpt-4o-mini".to_string()
}

fn default_gemini_base_url() -> String {
    "https://generativelanguage.googleapis.com/v1beta".to_string()
}

fn default_gemini_model() -> String {
    "gemini-2.0-flash".to_string()
}

fn default_timeout_secs() -> u64 {
    60
}

/// Endpoint settings for one provider.
///
/// API keys come from the environment via `${VAR}` expansion in the config
/// file; an empty key is a startup error when the adapter is constructed.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProviderEndpointConfig {
    #[serde(default)]
    pub api_key: String,

    pub base_url: String,

    pub model: String,

    /// Per-request timeout applied by the shared HTTP client.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl ProviderEndpointConfig {
    pub fn openai_defaults() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_openai_base_url(),
            model: default_openai_model(),
            timeout_secs: default_timeout_secs(),
        }
    }

    pub fn gemini_defaults() -> Self {
        Self {
            api_key: String::new(),
            base_url: default_gemini_base_url(),
            model: default_gemini_model(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// Static provider endpoints.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ProvidersConfig {
    #[serde(default = "ProviderEndpointConfig::openai_defaults")]
    pub openai: ProviderEndpointConfig,

    #[serde(default = "ProviderEndpointConfig::gemini_defaults")]
    pub gemini: ProviderEndpointConfig,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        Self {
            openai: ProviderEndpointConfig::openai_defaults(),
            gemini: ProviderEndpointConfig::gemini_defaults(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_toml_fills_defaults() {
        let config: ProvidersConfig = toml::from_str(
            r#"
            [openai]
            api_key = "sk-test"
            base_url = "https://api.openai.com/v1"
            model = "gpt-4o"
        "#,
        )
        .unwrap();

        assert_eq!(config.openai.model, "gpt-4o");
        assert_eq!(config.openai.timeout_secs, 60);
        assert_eq!(config.gemini.model, "gemini-2.0-flash");
        assert!(config.gemini.api_key.is_empty());
    }
}
