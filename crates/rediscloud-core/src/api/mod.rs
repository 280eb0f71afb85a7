//! Redis Cloud API families
//!
//! One handler per resource family, each wrapping a cloneable
//! [`CloudClient`](crate::client::CloudClient). Calls go through the
//! `redis-cloud` typed handlers where their request models carry every
//! field the provider sends, and through the raw JSON methods otherwise.
//! Mutations return the submitted [`TaskStateUpdate`]; callers poll it with
//! [`wait_for_task`](crate::progress::wait_for_task). Reads that the API
//! itself runs as tasks (CIDR allowlist, transit gateways, PSC endpoints,
//! latest backup/import) are resolved inside the handler.

pub mod acl;
pub mod backup;
pub mod cloud_accounts;
pub mod databases;
pub mod fixed;
pub mod maintenance;
pub mod payment_methods;
pub mod pricing;
pub mod psc;
pub mod regions;
pub mod subscriptions;
pub mod tags;
pub mod tasks;
pub mod transit_gateway;

use std::time::Duration;

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub use acl::{AclHandler, AclRole, AclRule, AclUser};
pub use backup::{BackupStatus, BackupStatusHandler, ImportStatus};
pub use cloud_accounts::{CloudAccount, CloudAccountHandler};
pub use databases::{CrdbDatabase, Database, DatabaseHandler};
pub use fixed::{FixedDatabase, FixedDatabaseHandler, FixedPlan, FixedSubscription, FixedSubscriptionHandler};
pub use maintenance::{MaintenanceHandler, MaintenanceWindows};
pub use payment_methods::{PaymentMethod, PaymentMethodHandler};
pub use pricing::{Pricing, PricingHandler};
pub use psc::{PscEndpoint, PscHandler};
pub use regions::{ActiveActiveRegion, RegionHandler};
pub use subscriptions::{Subscription, SubscriptionHandler};
pub use tags::{Tag, TagHandler};
pub use tasks::{TaskHandler, TaskStateUpdate};
pub use transit_gateway::{TransitGatewayAttachment, TransitGatewayHandler};

use crate::client::CloudClient;
use crate::context::OperationContext;
use crate::error::{CoreError, ResourceFamily, Result};
use crate::progress::poll_task;

/// Upper bound for task-backed reads when the context carries no deadline
pub const READ_TASK_TIMEOUT: Duration = Duration::from_secs(10 * 60);

/// `{ "by": "operations-per-second", "value": 1000 }`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ThroughputMeasurement {
    pub by: String,
    pub value: i64,
}

/// Alert threshold
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Alert {
    pub name: String,
    pub value: i64,
}

/// Module reference (`{"name": "RediSearch"}`)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Module {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameters: Option<Value>,
}

/// Submit a mutation response and parse its task envelope
pub(crate) fn submitted(response: Value) -> Result<TaskStateUpdate> {
    TaskStateUpdate::from_submission(response)
}

/// The Cloud API addresses resources with 32-bit IDs
pub fn api_id(id: i64) -> Result<i32> {
    i32::try_from(id).map_err(|_| CoreError::Id(format!("{} is out of range for the Cloud API", id)))
}

/// Resolve a read the API answers with a task, returning `response.resource`.
/// A 404 inside the task is reported as not-found for `family`.
pub(crate) async fn read_via_task(
    ctx: &OperationContext,
    client: &CloudClient,
    family: ResourceFamily,
    task: TaskStateUpdate,
) -> Result<Value> {
    let task_id = task
        .task_id
        .ok_or_else(|| CoreError::TaskFailed("No task ID returned".to_string()))?;
    let timeout = ctx
        .remaining()
        .map_or(READ_TASK_TIMEOUT, |r| r.min(READ_TASK_TIMEOUT));
    let interval = client.options().task_poll_interval();

    match poll_task(ctx, client, &task_id, timeout, interval, None).await {
        Ok(done) => Ok(done.resource()),
        Err(CoreError::NotFound { message, .. }) => Err(CoreError::not_found(family, message)),
        Err(e) => Err(e),
    }
}

/// Decode a list nested under `key`, treating a missing key as empty
pub(crate) fn list_field<T: serde::de::DeserializeOwned>(value: &Value, key: &str) -> Result<Vec<T>> {
    match value.get(key) {
        None | Some(Value::Null) => Ok(Vec::new()),
        Some(items) => Ok(serde_json::from_value(items.clone())?),
    }
}
