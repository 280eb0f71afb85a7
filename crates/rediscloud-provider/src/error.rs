//! Error types for the provider
//!
//! Controllers return [`ProviderError`]; the provider turns every error into
//! host [`Diagnostics`] at the dispatch boundary.

use rediscloud_core::{ConfigError, CoreError, ResourceFamily};
use thiserror::Error;

use crate::host::{Diagnostic, Diagnostics};

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error(transparent)]
    Core(#[from] CoreError),

    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A check against config or plan failed
    #[error("{message}")]
    Validation {
        attribute: Option<String>,
        message: String,
    },

    #[error("Provider is not configured; configure must run before any resource operation")]
    NotConfigured,

    #[error("Unknown resource type '{0}'")]
    UnknownResource(String),

    #[error("Unknown data source '{0}'")]
    UnknownDataSource(String),

    #[error("Resource '{0}' does not support import")]
    ImportNotSupported(String),

    /// A lookup by filters matched zero or several objects
    #[error("{0}")]
    Lookup(String),

    #[error("Invalid timeouts: {0}")]
    Timeouts(String),

    #[error("{0}")]
    Diagnostics(Diagnostics),

    #[error("Failed to decode value: {0}")]
    Decode(#[from] serde_json::Error),
}

impl ProviderError {
    pub fn validation(message: impl Into<String>) -> Self {
        ProviderError::Validation {
            attribute: None,
            message: message.into(),
        }
    }

    pub fn validation_at(attribute: impl Into<String>, message: impl Into<String>) -> Self {
        ProviderError::Validation {
            attribute: Some(attribute.into()),
            message: message.into(),
        }
    }

    pub fn lookup(message: impl Into<String>) -> Self {
        ProviderError::Lookup(message.into())
    }

    /// A remote object was not found, in any family
    pub fn is_not_found(&self) -> bool {
        matches!(self, ProviderError::Core(e) if e.is_not_found())
    }

    /// A remote object of `family` was not found
    pub fn is_not_found_in(&self, family: ResourceFamily) -> bool {
        matches!(self, ProviderError::Core(e) if e.is_not_found_in(family))
    }
}

impl From<ProviderError> for Diagnostics {
    fn from(err: ProviderError) -> Self {
        match err {
            ProviderError::Diagnostics(diags) => diags,
            ProviderError::Validation {
                attribute: Some(attribute),
                message,
            } => Diagnostic::error(message).at(attribute).into(),
            ProviderError::Config(config) => {
                let attribute = config.attribute().map(str::to_string);
                let diag = Diagnostic::error(config.to_string());
                match attribute {
                    Some(a) => diag.at(a).into(),
                    None => diag.into(),
                }
            }
            other => Diagnostic::error(other.to_string()).into(),
        }
    }
}

impl From<Diagnostics> for ProviderError {
    fn from(diags: Diagnostics) -> Self {
        ProviderError::Diagnostics(diags)
    }
}

pub type Result<T> = std::result::Result<T, ProviderError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scoped_validation_keeps_attribute() {
        let diags: Diagnostics = ProviderError::validation_at("tags", "tag keys must be lower case").into();
        let first = diags.iter().next().unwrap();
        assert_eq!(first.attribute.as_deref(), Some("tags"));
        assert!(first.is_error());
    }

    #[test]
    fn test_not_found_passes_through_core() {
        let err: ProviderError = CoreError::not_found(ResourceFamily::Database, "gone").into();
        assert!(err.is_not_found());
        assert!(!ProviderError::NotConfigured.is_not_found());
    }

    #[test]
    fn test_not_found_is_scoped_to_family() {
        let err: ProviderError = CoreError::not_found(ResourceFamily::Pricing, "no pricing").into();
        assert!(err.is_not_found_in(ResourceFamily::Pricing));
        assert!(!err.is_not_found_in(ResourceFamily::Subscription));
    }

    #[test]
    fn test_config_error_is_scoped_to_attribute() {
        let err: ProviderError = ConfigError::UnknownValue { attribute: "api_key".to_string() }.into();
        let diags: Diagnostics = err.into();
        assert_eq!(diags.iter().next().unwrap().attribute.as_deref(), Some("api_key"));
    }
}
