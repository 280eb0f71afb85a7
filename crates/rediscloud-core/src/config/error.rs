//! Error types for provider configuration

use thiserror::Error;

/// Errors that can occur while resolving provider configuration
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The value was not yet known when the provider was configured
    #[error("{attribute} is unknown at plan time; it must be known before any resource is planned")]
    UnknownValue { attribute: String },

    /// Neither an explicit value nor the fallback environment variable was set
    #[error("{attribute} is required; set it in the provider block or via {env_var}")]
    MissingValue {
        attribute: String,
        env_var: String,
    },

    #[error("Invalid API URL '{url}': {reason}")]
    InvalidUrl { url: String, reason: String },

    #[error("Failed to parse client options: {0}")]
    ParseError(#[from] serde_json::Error),

    #[error("Failed to build HTTP client: {0}")]
    HttpClient(String),
}

impl ConfigError {
    /// The provider attribute this error is scoped to, if any
    pub fn attribute(&self) -> Option<&str> {
        match self {
            ConfigError::UnknownValue { attribute } | ConfigError::MissingValue { attribute, .. } => {
                Some(attribute)
            }
            ConfigError::InvalidUrl { .. } => Some("url"),
            _ => None,
        }
    }
}

/// Result type for configuration operations
pub type Result<T> = std::result::Result<T, ConfigError>;
