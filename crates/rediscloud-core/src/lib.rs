//! # rediscloud-core
//!
//! Shared engine for the Redis Cloud provider: API models and family
//! handlers, task polling, state waiters, the per-subscription mutation
//! serializer and composite resource IDs.
//!
//! ## Layers
//!
//! - **Transport** - [`CloudClient`] wraps the `redis-cloud` client and
//!   tags its failures with the resource family as [`CoreError`]
//! - **Families** - [`api`] handlers, one per Redis Cloud resource family
//! - **Waiting** - [`progress::poll_task`] for task envelopes,
//!   [`waiter::wait_for_state`] for resource status transitions
//! - **Workflows** - [`cloud`] "submit and wait" compositions
//! - **Coordination** - [`lock::SubscriptionLocks`] serializes mutations per
//!   subscription; [`OperationContext`] carries cancellation and deadlines
//!
//! ```text
//! rediscloud-core/
//! ├── src/
//! │   ├── api/        # family handlers and models
//! │   ├── cloud/      # workflows and status sets
//! │   ├── config/     # provider configuration
//! │   ├── client.rs   # redis-cloud transport
//! │   ├── context.rs  # cancellation + deadline
//! │   ├── ids.rs      # composite IDs
//! │   ├── lock.rs     # per-subscription serializer
//! │   ├── progress.rs # task polling
//! │   └── waiter.rs   # state-change waiter
//! ```

pub mod api;
pub mod client;
pub mod cloud;
pub mod config;
pub mod context;
pub mod error;
pub mod ids;
pub mod lock;
pub mod progress;
pub mod waiter;

pub use client::{CloudClient, CloudClientBuilder};
pub use config::{ClientOptions, ConfigError, ProviderConfig, Setting};
pub use context::OperationContext;
pub use error::{CoreError, InFamily, ResourceFamily, Result};
pub use ids::{
    ActiveActivePscEndpointId, ActiveActiveTransitGatewayId, DatabaseId, PscEndpointId,
    TransitGatewayId,
};
pub use lock::{SubscriptionGuard, SubscriptionLocks};
pub use progress::{ProgressCallback, ProgressEvent, poll_task};
pub use waiter::{Observed, WaitConfig, wait_for_state};
