//! Provider configuration and credential resolution.
//!
//! Every setting is resolved with the same precedence: a non-empty value in
//! the provider configuration block wins over a non-empty environment
//! variable, which wins over the built-in default. The API token has no
//! default, so its absence is a [`ProviderError::MissingCredential`].

use serde::{Deserialize, Serialize};
use url::Url;

use crate::error::ProviderError;
use crate::schema::{Attribute, Schema};

/// Environment variable holding the Forge API token.
pub const TOKEN_ENV_VAR: &str = "FORGE_API_TOKEN";

/// Environment variable overriding the Forge API base URL.
pub const ENDPOINT_ENV_VAR: &str = "FORGE_API_URL";

/// Base URL of the public Forge API.
pub const DEFAULT_ENDPOINT: &str = "https://forge.laravel.com/api/v1/";

/// The provider configuration block as written by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Forge API token.
    #[serde(default)]
    pub token: Option<String>,
    /// Alternative API base URL.
    #[serde(default)]
    pub endpoint: Option<String>,
}

impl ProviderConfig {
    /// Schema of the provider configuration block.
    pub fn schema() -> Schema {
        Schema::v0()
            .with_description("Laravel Forge provider configuration")
            .with_attribute(
                "token",
                Attribute::optional_string()
                    .sensitive()
                    .with_description(format!(
                        "Laravel Forge API token. May also be set with the `{}` environment variable.",
                        TOKEN_ENV_VAR
                    )),
            )
            .with_attribute(
                "endpoint",
                Attribute::optional_string().with_description(format!(
                    "Forge API base URL. May also be set with the `{}` environment variable. Defaults to `{}`.",
                    ENDPOINT_ENV_VAR, DEFAULT_ENDPOINT
                )),
            )
    }

    /// Decode the configuration block sent by the host.
    ///
    /// A null configuration is treated as an empty block.
    pub fn from_value(value: serde_json::Value) -> Result<Self, ProviderError> {
        if value.is_null() {
            return Ok(Self::default());
        }
        Ok(serde_json::from_value(value)?)
    }

    /// Resolve the effective client settings.
    ///
    /// `env` looks up an environment variable; production code passes
    /// [`process_env`].
    pub fn resolve<F>(&self, env: F) -> Result<ClientSettings, ProviderError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let token = pick(self.token.as_deref(), env(TOKEN_ENV_VAR)).ok_or_else(|| {
            ProviderError::MissingCredential(format!(
                "While configuring the provider, the API token was not found in the {} \
                 environment variable or provider configuration block token attribute.",
                TOKEN_ENV_VAR
            ))
        })?;

        let endpoint = pick(self.endpoint.as_deref(), env(ENDPOINT_ENV_VAR))
            .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string());
        let endpoint = parse_endpoint(&endpoint)?;

        Ok(ClientSettings { token, endpoint })
    }
}

/// Settings the API client is built from.
#[derive(Clone, PartialEq, Eq)]
pub struct ClientSettings {
    /// Resolved API token.
    pub token: String,
    /// Resolved API base URL, always ending in `/`.
    pub endpoint: Url,
}

impl std::fmt::Debug for ClientSettings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientSettings")
            .field("token", &"<redacted>")
            .field("endpoint", &self.endpoint.as_str())
            .finish()
    }
}

/// Look up a variable in the process environment.
pub fn process_env(key: &str) -> Option<String> {
    std::env::var(key).ok()
}

fn pick(config: Option<&str>, env: Option<String>) -> Option<String> {
    match config {
        Some(value) if !value.is_empty() => Some(value.to_string()),
        _ => env.filter(|value| !value.is_empty()),
    }
}

pub(crate) fn parse_endpoint(raw: &str) -> Result<Url, ProviderError> {
    // Url::join drops the last path segment unless the base ends in '/'
    let normalized = if raw.ends_with('/') {
        raw.to_string()
    } else {
        format!("{}/", raw)
    };
    Url::parse(&normalized).map_err(|err| {
        ProviderError::Configuration(format!("Invalid Forge API endpoint `{}`: {}", raw, err))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn env_with(token: Option<&'static str>) -> impl Fn(&str) -> Option<String> {
        move |key: &str| match key {
            TOKEN_ENV_VAR => token.map(str::to_string),
            _ => None,
        }
    }

    fn config(token: &str) -> ProviderConfig {
        ProviderConfig {
            token: Some(token.to_string()),
            endpoint: None,
        }
    }

    #[test]
    fn test_config_token_overrides_env() {
        let settings = config("A").resolve(env_with(Some("B"))).unwrap();
        assert_eq!(settings.token, "A");
    }

    #[test]
    fn test_empty_config_token_falls_back_to_env() {
        let settings = config("").resolve(env_with(Some("B"))).unwrap();
        assert_eq!(settings.token, "B");

        let settings = ProviderConfig::default()
            .resolve(env_with(Some("B")))
            .unwrap();
        assert_eq!(settings.token, "B");
    }

    #[test]
    fn test_missing_token_is_missing_credential() {
        let err = config("").resolve(env_with(Some(""))).unwrap_err();
        assert!(matches!(err, ProviderError::MissingCredential(_)));
        assert!(err.message().contains(TOKEN_ENV_VAR));

        let err = ProviderConfig::default().resolve(env_with(None)).unwrap_err();
        assert!(matches!(err, ProviderError::MissingCredential(_)));
    }

    #[test]
    fn test_endpoint_defaults_and_overrides() {
        let settings = config("A").resolve(env_with(None)).unwrap();
        assert_eq!(settings.endpoint.as_str(), DEFAULT_ENDPOINT);

        let env = |key: &str| match key {
            ENDPOINT_ENV_VAR => Some("http://127.0.0.1:9000/api".to_string()),
            _ => None,
        };
        let settings = config("A").resolve(env).unwrap();
        assert_eq!(settings.endpoint.as_str(), "http://127.0.0.1:9000/api/");

        let cfg = ProviderConfig {
            token: Some("A".to_string()),
            endpoint: Some("http://localhost:1234".to_string()),
        };
        let settings = cfg.resolve(env).unwrap();
        assert_eq!(settings.endpoint.as_str(), "http://localhost:1234/");
    }

    #[test]
    fn test_invalid_endpoint_is_configuration_error() {
        let cfg = ProviderConfig {
            token: Some("A".to_string()),
            endpoint: Some("not a url".to_string()),
        };
        let err = cfg.resolve(env_with(None)).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }

    #[test]
    fn test_from_value() {
        let cfg = ProviderConfig::from_value(json!({"token": "abc"})).unwrap();
        assert_eq!(cfg.token.as_deref(), Some("abc"));
        assert!(cfg.endpoint.is_none());

        let cfg = ProviderConfig::from_value(json!(null)).unwrap();
        assert_eq!(cfg, ProviderConfig::default());

        let cfg = ProviderConfig::from_value(json!({"token": null})).unwrap();
        assert!(cfg.token.is_none());

        assert!(ProviderConfig::from_value(json!({"token": 5})).is_err());
    }

    #[test]
    fn test_settings_debug_redacts_token() {
        let settings = config("secret-token").resolve(env_with(None)).unwrap();
        let rendered = format!("{:?}", settings);
        assert!(!rendered.contains("secret-token"));
        assert!(rendered.contains("<redacted>"));
    }

    #[test]
    fn test_schema_marks_token_sensitive() {
        let schema = ProviderConfig::schema();
        let token = schema.attribute("token").unwrap();
        assert!(token.flags.sensitive);
        assert!(token.flags.optional);
    }
}
