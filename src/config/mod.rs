//! Service configuration.
//!
//! Vitae is configured via a TOML file, with environment variable
//! interpolation using `${VAR_NAME}` syntax. Every section is optional
//! and falls back to defaults, so a minimal deployment needs nothing
//! but the provider API keys:
//!
//! ```toml
//! [providers.openai]
//! api_key = "${OPENAI_API_KEY}"
//!
//! [providers.gemini]
//! api_key = "${GEMINI_API_KEY}"
//! ```

mod providers;
mod quotas;
mod retry;
mod routing;
mod server;

use std::path::Path;

pub use providers::*;
pub use quotas::*;
pub use retry::*;
pub use routing::*;
use serde::{Deserialize, Serialize};
pub use server::*;

pub use crate::pricing::PricingConfig;

/// Root configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct VitaeConfig {
    /// HTTP server configuration.
    #[serde(default)]
    pub server: ServerConfig,

    /// SQLite usage ledger location.
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Logging configuration.
    #[serde(default)]
    pub observability: ObservabilityConfig,

    /// Static provider endpoints and credentials.
    #[serde(default)]
    pub providers: ProvidersConfig,

    /// Retry and backoff behavior for provider calls.
    #[serde(default)]
    pub retry: RetryConfig,

    /// Provider roles and hybrid traffic split.
    #[serde(default)]
    pub routing: RoutingConfig,

    /// Startup per-tier quota limits.
    #[serde(default)]
    pub quotas: QuotasConfig,

    /// Token rates and display currency.
    #[serde(default)]
    pub pricing: PricingConfig,
}

impl VitaeConfig {
    /// Load configuration from a TOML file.
    ///
    /// Environment variables in the format `${VAR_NAME}` are expanded.
    /// Missing variables are an error.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path.as_ref())
            .map_err(|e| ConfigError::Io(e, path.as_ref().to_path_buf()))?;

        Self::from_str(&contents)
    }

    /// Parse configuration from a TOML string.
    pub fn from_str(contents: &str) -> Result<Self, ConfigError> {
        let expanded = expand_env_vars(contents)?;
        let config: VitaeConfig = toml::from_str(&expanded).map_err(ConfigError::Parse)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        self.routing.validate().map_err(ConfigError::Validation)?;
        Ok(())
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {1}: {0}")]
    Io(std::io::Error, std::path::PathBuf),

    #[error("Failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Environment variable not found: {0}")]
    EnvVarNotFound(String),

    #[error("Configuration validation error: {0}")]
    Validation(String),
}

/// Expand `${VAR_NAME}` references to environment variable values.
///
/// Variables appearing after a `#` comment marker are left untouched.
fn expand_env_vars(input: &str) -> Result<String, ConfigError> {
    let re = regex::Regex::new(r"\$\{([^}]+)\}").unwrap();
    let mut result = String::with_capacity(input.len());

    for line in input.lines() {
        let comment_pos = line.find('#');

        let mut line_result = String::with_capacity(line.len());
        let mut last_end = 0;

        for cap in re.captures_iter(line) {
            let whole = cap.get(0).unwrap();

            if let Some(pos) = comment_pos
                && whole.start() >= pos
            {
                continue;
            }

            line_result.push_str(&line[last_end..whole.start()]);

            let var_name = &cap[1];
            let value = std::env::var(var_name)
                .map_err(|_| ConfigError::EnvVarNotFound(var_name.to_string()))?;
            line_result.push_str(&value);

            last_end = whole.end();
        }

        line_result.push_str(&line[last_end..]);
        result.push_str(&line_result);
        result.push('\n');
    }

    if !input.ends_with('\n') && result.ends_with('\n') {
        result.pop();
    }

    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::ProviderId;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = VitaeConfig::from_str("").unwrap();
        assert_eq!(config.server.port, 8090);
        assert_eq!(config.retry.max_attempts, 3);
        assert_eq!(config.routing.quality_provider, ProviderId::OpenAi);
        assert_eq!(config.quotas.free.daily, Some(10));
    }

    #[test]
    fn test_env_var_expansion() {
        // SAFETY: test-local variable name, no concurrent reader cares.
        unsafe { std::env::set_var("VITAE_TEST_KEY", "sk-expanded") };

        let config = VitaeConfig::from_str(
            r#"
            [providers.openai]
            api_key = "${VITAE_TEST_KEY}"
            base_url = "https://api.openai.com/v1"
            model = "gpt-4o-mini"
        "#,
        )
        .unwrap();

        assert_eq!(config.providers.openai.api_key, "sk-expanded");
    }

    #[test]
    fn test_missing_env_var_is_error() {
        let result = VitaeConfig::from_str(
            r#"
            [providers.openai]
            api_key = "${VITAE_DEFINITELY_UNSET_VAR}"
            base_url = "https://api.openai.com/v1"
            model = "gpt-4o-mini"
        "#,
        );

        assert!(matches!(result, Err(ConfigError::EnvVarNotFound(_))));
    }

    #[test]
    fn test_env_vars_in_comments_are_ignored() {
        let expanded = expand_env_vars("port = 8090 # set via ${UNSET_VAR}").unwrap();
        assert_eq!(expanded, "port = 8090 # set via ${UNSET_VAR}");
    }

    #[test]
    fn test_unknown_section_rejected() {
        let result = VitaeConfig::from_str("[nonsense]\nfoo = 1\n");
        assert!(matches!(result, Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_invalid_routing_rejected() {
        let result = VitaeConfig::from_str(
            r#"
            [routing]
            hybrid_weight = 2.0
        "#,
        );
        assert!(matches!(result, Err(ConfigError::Validation(_))));
    }
}
