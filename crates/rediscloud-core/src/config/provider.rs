//! Provider-level settings: API URL and credentials
//!
//! Resolution order for each setting:
//! 1. A value set explicitly in the provider block
//! 2. The fallback environment variable
//! 3. A built-in default (URL only)
//!
//! A value that the host reports as unknown fails immediately; the provider
//! cannot plan anything without credentials.

use std::env;

use url::Url;

use super::error::{ConfigError, Result};

/// Default Redis Cloud API base URL
pub const DEFAULT_API_URL: &str = "https://api.redislabs.com/v1";

pub const URL_ENV_VAR: &str = "REDISCLOUD_URL";
pub const ACCESS_KEY_ENV_VAR: &str = "REDISCLOUD_ACCESS_KEY";
pub const SECRET_KEY_ENV_VAR: &str = "REDISCLOUD_SECRET_KEY";

/// A provider setting as handed over by the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Setting {
    /// Explicitly configured
    Known(String),
    /// Depends on a value computed later in the apply
    Unknown,
    /// Not set in the provider block
    Absent,
}

impl Setting {
    pub fn known(value: impl Into<String>) -> Self {
        Setting::Known(value.into())
    }
}

impl From<Option<String>> for Setting {
    fn from(value: Option<String>) -> Self {
        match value {
            Some(v) => Setting::Known(v),
            None => Setting::Absent,
        }
    }
}

/// Fully resolved provider configuration
#[derive(Clone, PartialEq, Eq)]
pub struct ProviderConfig {
    pub url: String,
    pub api_key: String,
    pub secret_key: String,
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("url", &self.url)
            .field("api_key", &redact(&self.api_key))
            .field("secret_key", &"<redacted>")
            .finish()
    }
}

fn redact(value: &str) -> String {
    let prefix: String = value.chars().take(4).collect();
    format!("{}...", prefix)
}

impl ProviderConfig {
    /// Resolve the three provider settings against their environment fallbacks
    pub fn resolve(url: Setting, api_key: Setting, secret_key: Setting) -> Result<Self> {
        let url = resolve_setting("url", url, URL_ENV_VAR)?
            .unwrap_or_else(|| DEFAULT_API_URL.to_string());
        let api_key = resolve_setting("api_key", api_key, ACCESS_KEY_ENV_VAR)?.ok_or_else(|| {
            ConfigError::MissingValue {
                attribute: "api_key".to_string(),
                env_var: ACCESS_KEY_ENV_VAR.to_string(),
            }
        })?;
        let secret_key = resolve_setting("secret_key", secret_key, SECRET_KEY_ENV_VAR)?
            .ok_or_else(|| ConfigError::MissingValue {
                attribute: "secret_key".to_string(),
                env_var: SECRET_KEY_ENV_VAR.to_string(),
            })?;

        let config = Self {
            url: normalize_url(&url)?,
            api_key,
            secret_key,
        };
        Ok(config)
    }
}

/// Resolve one setting: explicit value, then environment variable
fn resolve_setting(attribute: &str, setting: Setting, env_var: &str) -> Result<Option<String>> {
    match setting {
        Setting::Unknown => Err(ConfigError::UnknownValue {
            attribute: attribute.to_string(),
        }),
        Setting::Known(value) if !value.is_empty() => Ok(Some(value)),
        Setting::Known(_) | Setting::Absent => Ok(env::var(env_var)
            .ok()
            .filter(|value| !value.is_empty())),
    }
}

/// Validate the base URL and strip any trailing slash so paths join cleanly
fn normalize_url(raw: &str) -> Result<String> {
    let parsed = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    match parsed.scheme() {
        "http" | "https" => Ok(raw.trim_end_matches('/').to_string()),
        other => Err(ConfigError::InvalidUrl {
            url: raw.to_string(),
            reason: format!("unsupported scheme '{}'", other),
        }),
    }
}
