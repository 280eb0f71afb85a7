//! Provider configuration
//!
//! Credentials and API URL resolution with environment fallbacks, plus the
//! options applied to the shared HTTP client.

pub mod error;
pub mod options;
pub mod provider;

pub use error::{ConfigError, Result};
pub use options::ClientOptions;
pub use provider::{
    ACCESS_KEY_ENV_VAR, DEFAULT_API_URL, ProviderConfig, SECRET_KEY_ENV_VAR, Setting, URL_ENV_VAR,
};
