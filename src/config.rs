//! Environment-backed configuration.
//!
//! Every sample resolves its connection parameters from the process
//! environment (plus a `.env` file when one is present) and fails with
//! [`ConfigurationError::MissingVar`] before any request is made.

use std::collections::HashMap;

use crate::error::ConfigurationError;

pub const OPENAI_API_KEY: &str = "OPENAI_API_KEY";
pub const OPENAI_CHAT_MODEL_NAME: &str = "OPENAI_CHAT_MODEL_NAME";
pub const OPENAI_BASE_URL: &str = "OPENAI_BASE_URL";

pub const AZURE_OPENAI_ENDPOINT: &str = "AZURE_OPENAI_ENDPOINT";
pub const AZURE_OPENAI_DEPLOYMENT_NAME: &str = "AZURE_OPENAI_DEPLOYMENT_NAME";
pub const AZURE_OPENAI_API_KEY: &str = "AZURE_OPENAI_API_KEY";
pub const AZURE_OPENAI_API_VERSION: &str = "AZURE_OPENAI_API_VERSION";

pub const AZURE_FOUNDRY_PROJECT_ENDPOINT: &str = "AZURE_FOUNDRY_PROJECT_ENDPOINT";
pub const AZURE_FOUNDRY_PROJECT_DEPLOYMENT_NAME: &str = "AZURE_FOUNDRY_PROJECT_DEPLOYMENT_NAME";
pub const AZURE_FOUNDRY_ACCESS_TOKEN: &str = "AZURE_FOUNDRY_ACCESS_TOKEN";
pub const AZURE_FOUNDRY_API_VERSION: &str = "AZURE_FOUNDRY_API_VERSION";

pub const BING_CONNECTION_ID: &str = "BING_CONNECTION_ID";
pub const AZURE_AI_SEARCH_CONNECTION_ID: &str = "AZURE_AI_SEARCH_CONNECTION_ID";
pub const AZURE_AI_SEARCH_INDEX_NAME: &str = "AZURE_AI_SEARCH_INDEX_NAME";
pub const BROWSER_AUTOMATION_CONNECTION_ID: &str = "BROWSER_AUTOMATION_CONNECTION_ID";
pub const AZURE_AI_MEMORY_STORE_NAME: &str = "AZURE_AI_MEMORY_STORE_NAME";

pub const ANTHROPIC_API_KEY: &str = "ANTHROPIC_API_KEY";
pub const ANTHROPIC_MODEL: &str = "ANTHROPIC_MODEL";

/// Immutable snapshot of string settings.
#[derive(Debug, Clone, Default)]
pub struct EnvConfig {
    values: HashMap<String, String>,
}

impl EnvConfig {
    /// Loads `.env` if present, then snapshots the process environment.
    pub fn from_env() -> Self {
        if let Err(err) = dotenvy::dotenv() {
            if !err.not_found() {
                tracing::warn!(error = %err, "ignoring unreadable .env file");
            }
        }
        std::env::vars().collect()
    }

    /// Value for `key`, or [`ConfigurationError::MissingVar`].
    ///
    /// Blank values count as missing.
    pub fn require(&self, key: &str) -> Result<&str, ConfigurationError> {
        self.optional(key)
            .ok_or_else(|| ConfigurationError::MissingVar(key.to_string()))
    }

    pub fn optional(&self, key: &str) -> Option<&str> {
        self.values
            .get(key)
            .map(|value| value.trim())
            .filter(|value| !value.is_empty())
    }

    pub fn or_default<'a>(&'a self, key: &str, default: &'a str) -> &'a str {
        self.optional(key).unwrap_or(default)
    }

    /// Checks every key and reports the first one missing, in order.
    pub fn require_all(&self, keys: &[&str]) -> Result<(), ConfigurationError> {
        for key in keys {
            self.require(key)?;
        }
        Ok(())
    }

    pub fn parse_url(&self, key: &str) -> Result<String, ConfigurationError> {
        let value = self.require(key)?;
        if !(value.starts_with("https://") || value.starts_with("http://")) {
            return Err(ConfigurationError::Invalid {
                key: key.to_string(),
                message: format!("expected an http(s) URL, got '{value}'"),
            });
        }
        Ok(value.trim_end_matches('/').to_string())
    }
}

impl<K, V> FromIterator<(K, V)> for EnvConfig
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            values: iter
                .into_iter()
                .map(|(key, value)| (key.into(), value.into()))
                .collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_reports_missing_key_by_name() {
        let config = EnvConfig::from_iter([(OPENAI_CHAT_MODEL_NAME, "gpt-4o-mini")]);

        let err = config.require(OPENAI_API_KEY).expect_err("must fail");
        assert_eq!(err, ConfigurationError::MissingVar(OPENAI_API_KEY.to_string()));
        assert_eq!(err.to_string(), "OPENAI_API_KEY is not set");
    }

    #[test]
    fn blank_values_count_as_missing() {
        let config = EnvConfig::from_iter([(OPENAI_API_KEY, "   ")]);

        assert!(config.optional(OPENAI_API_KEY).is_none());
        assert!(config.require(OPENAI_API_KEY).is_err());
        assert_eq!(config.or_default(OPENAI_API_KEY, "fallback"), "fallback");
    }

    #[test]
    fn require_all_reports_first_missing_key() {
        let config = EnvConfig::from_iter([(AZURE_OPENAI_ENDPOINT, "https://x.openai.azure.com")]);

        let err = config
            .require_all(&[
                AZURE_OPENAI_ENDPOINT,
                AZURE_OPENAI_DEPLOYMENT_NAME,
                AZURE_OPENAI_API_KEY,
            ])
            .expect_err("must fail");
        assert_eq!(
            err,
            ConfigurationError::MissingVar(AZURE_OPENAI_DEPLOYMENT_NAME.to_string())
        );
    }

    #[test]
    fn parse_url_rejects_non_http_values_and_trims_slash() {
        let config = EnvConfig::from_iter([
            (AZURE_FOUNDRY_PROJECT_ENDPOINT, "https://res.services.ai.azure.com/api/projects/p/"),
            (AZURE_OPENAI_ENDPOINT, "res.openai.azure.com"),
        ]);

        assert_eq!(
            config
                .parse_url(AZURE_FOUNDRY_PROJECT_ENDPOINT)
                .expect("valid url"),
            "https://res.services.ai.azure.com/api/projects/p"
        );
        assert!(matches!(
            config.parse_url(AZURE_OPENAI_ENDPOINT),
            Err(ConfigurationError::Invalid { .. })
        ));
    }
}
