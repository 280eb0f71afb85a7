//! Redis Cloud API transport
//!
//! Wraps [`redis_cloud::CloudClient`] together with the provider's polling
//! options. Family handlers in [`crate::api`] either call the crate's typed
//! handlers through [`CloudClient::cloud`] or, for payloads its models do
//! not cover, the raw JSON methods here, which tag 404s with the family of
//! the endpoint.

use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::config::{ClientOptions, ConfigError, DEFAULT_API_URL, ProviderConfig};
use crate::error::{InFamily, ResourceFamily, Result};

/// Shared Redis Cloud API client
#[derive(Clone)]
pub struct CloudClient {
    cloud: redis_cloud::CloudClient,
    inner: Arc<ClientInner>,
}

struct ClientInner {
    base_url: String,
    options: ClientOptions,
}

impl std::fmt::Debug for CloudClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CloudClient")
            .field("base_url", &self.inner.base_url)
            .finish_non_exhaustive()
    }
}

/// Builder for [`CloudClient`]
#[derive(Default)]
pub struct CloudClientBuilder {
    api_key: Option<String>,
    api_secret: Option<String>,
    base_url: Option<String>,
    options: ClientOptions,
}

impl CloudClientBuilder {
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    pub fn api_secret(mut self, secret: impl Into<String>) -> Self {
        self.api_secret = Some(secret.into());
        self
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn user_agent(mut self, agent: impl Into<String>) -> Self {
        self.options.user_agent = agent.into();
        self
    }

    pub fn options(mut self, options: ClientOptions) -> Self {
        self.options = options;
        self
    }

    pub fn build(self) -> std::result::Result<CloudClient, ConfigError> {
        let base_url = self
            .base_url
            .unwrap_or_else(|| DEFAULT_API_URL.to_string())
            .trim_end_matches('/')
            .to_string();

        let cloud = redis_cloud::CloudClient::builder()
            .api_key(self.api_key.unwrap_or_default())
            .api_secret(self.api_secret.unwrap_or_default())
            .base_url(base_url.clone())
            .timeout(Duration::from_secs(self.options.request_timeout_secs))
            .user_agent(self.options.user_agent.clone())
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;

        Ok(CloudClient::from_parts(cloud, base_url, self.options))
    }
}

impl CloudClient {
    pub fn builder() -> CloudClientBuilder {
        CloudClientBuilder::default()
    }

    /// Build a client from resolved provider configuration
    pub fn from_config(
        config: &ProviderConfig,
        options: ClientOptions,
    ) -> std::result::Result<Self, ConfigError> {
        Self::builder()
            .api_key(&config.api_key)
            .api_secret(&config.secret_key)
            .base_url(&config.url)
            .options(options)
            .build()
    }

    /// Wrap an already configured `redis-cloud` client
    pub fn from_cloud(
        cloud: redis_cloud::CloudClient,
        base_url: impl Into<String>,
        options: ClientOptions,
    ) -> Self {
        Self::from_parts(cloud, base_url.into(), options)
    }

    fn from_parts(cloud: redis_cloud::CloudClient, base_url: String, options: ClientOptions) -> Self {
        Self {
            cloud,
            inner: Arc::new(ClientInner { base_url, options }),
        }
    }

    /// The underlying `redis-cloud` client, for its typed handlers
    pub fn cloud(&self) -> &redis_cloud::CloudClient {
        &self.cloud
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    pub fn options(&self) -> &ClientOptions {
        &self.inner.options
    }

    pub async fn get_raw(&self, family: ResourceFamily, path: &str) -> Result<Value> {
        self.cloud.get_raw(path).await.in_family(family)
    }

    pub async fn post_raw(&self, family: ResourceFamily, path: &str, body: Value) -> Result<Value> {
        self.cloud.post_raw(path, body).await.in_family(family)
    }

    pub async fn put_raw(&self, family: ResourceFamily, path: &str, body: Value) -> Result<Value> {
        self.cloud.put_raw(path, body).await.in_family(family)
    }

    pub async fn delete_raw(&self, family: ResourceFamily, path: &str) -> Result<Value> {
        self.cloud.delete_raw(path).await.in_family(family)
    }

    /// DELETE carrying a JSON body (region removal takes the region list in the body)
    pub async fn delete_with_body(
        &self,
        family: ResourceFamily,
        path: &str,
        body: Value,
    ) -> Result<Value> {
        self.cloud
            .delete_with_body(path, body)
            .await
            .in_family(family)
    }

    /// GET and decode into a typed model
    pub async fn get<T: DeserializeOwned>(&self, family: ResourceFamily, path: &str) -> Result<T> {
        let value = self.get_raw(family, path).await?;
        Ok(serde_json::from_value(value)?)
    }
}
