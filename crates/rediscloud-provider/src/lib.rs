//! # rediscloud-provider
//!
//! Infrastructure-as-code provider for Redis Cloud. The host hands this crate
//! declarative config and prior state; the provider validates plans, drives
//! the Redis Cloud API through [`rediscloud_core`] and hands back the state
//! it observed.
//!
//! ## Layers
//!
//! - **Host adapter** - [`host`]: values, schemas, diffs, diagnostics and the
//!   [`Resource`](host::Resource) / [`DataSource`](host::DataSource) traits
//! - **Plan checks** - [`validate`]: pure functions over config and diff
//! - **Reconciliation** - [`reconcile`]: Active-Active per-region overrides
//! - **Controllers** - [`resources`] and [`data_sources`]
//! - **Dispatch** - [`Provider`] routes host calls to the registry
//!
//! ```text
//! rediscloud-provider/
//! ├── src/
//! │   ├── host/          # schema, values, diagnostics
//! │   ├── validate/      # plan-time rules
//! │   ├── resources/     # lifecycle controllers
//! │   ├── data_sources/  # read-only lookups
//! │   ├── reconcile.rs   # override reconciler
//! │   ├── provider.rs    # registry and dispatch
//! │   ├── state.rs       # configured client + locks
//! │   └── logging.rs     # tracing setup
//! ```
//!
//! ## Example
//!
//! ```no_run
//! use rediscloud_provider::Provider;
//! use serde_json::json;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! rediscloud_provider::logging::init();
//! let provider = Provider::new();
//! provider
//!     .configure(&json!({"api_key": "key", "secret_key": "secret"}))
//!     .await
//!     .map_err(|diags| diags.to_string())?;
//! # Ok(())
//! # }
//! ```

pub mod data_sources;
pub mod error;
pub mod host;
pub mod logging;
pub mod provider;
pub mod reconcile;
pub mod resources;
pub mod state;
pub mod validate;

pub use error::{ProviderError, Result};
pub use host::{DataSource, Diagnostic, Diagnostics, Resource, ResourceData, Schema};
pub use provider::{ApplyResult, PlanResult, Provider, ProviderSchema};
pub use state::ProviderState;
