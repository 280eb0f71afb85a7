//! Essentials (fixed plan) subscriptions, databases and plans

use redis_cloud::fixed_subscriptions::{FixedSubscriptionCreateRequest, FixedSubscriptionUpdateRequest};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::databases::{Backup, Replica, RegexRule};
use super::tasks::TaskStateUpdate;
use super::{Alert, Module, api_id, list_field, submitted};
use crate::client::CloudClient;
use crate::error::{InFamily, ResourceFamily, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedSubscription {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub plan_id: Option<i64>,
    #[serde(default)]
    pub payment_method_id: Option<i64>,
    #[serde(default)]
    pub payment_method_type: Option<String>,
    #[serde(default)]
    pub creation_date: Option<String>,
}

impl FixedSubscription {
    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or_default()
    }
}

/// Body of Essentials subscription create/update
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedSubscriptionRequest {
    pub name: String,
    pub plan_id: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<i64>,
}

/// An Essentials plan from the `/fixed/plans` catalogue
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedPlan {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub size: Option<f64>,
    #[serde(default)]
    pub size_measurement_unit: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub region_id: Option<i64>,
    #[serde(default)]
    pub price: Option<f64>,
    #[serde(default)]
    pub price_currency: Option<String>,
    #[serde(default)]
    pub price_period: Option<String>,
    #[serde(default)]
    pub maximum_databases: Option<i64>,
    #[serde(default)]
    pub maximum_throughput: Option<i64>,
    #[serde(default, rename = "maximumBandwidthGB")]
    pub maximum_bandwidth_gb: Option<f64>,
    #[serde(default)]
    pub availability: Option<String>,
    #[serde(default)]
    pub connections: Option<String>,
    #[serde(default)]
    pub cidr_allow_rules: Option<i64>,
    #[serde(default)]
    pub support_data_persistence: Option<bool>,
    #[serde(default)]
    pub support_instant_and_daily_backups: Option<bool>,
    #[serde(default)]
    pub support_replication: Option<bool>,
    #[serde(default)]
    pub support_clustering: Option<bool>,
    #[serde(default)]
    pub customer_support: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedDatabase {
    pub database_id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub protocol: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub redis_version: Option<String>,
    #[serde(default)]
    pub resp_version: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub plan_memory_limit: Option<f64>,
    #[serde(default)]
    pub plan_dataset_size: Option<f64>,
    #[serde(default)]
    pub memory_limit_measurement_unit: Option<String>,
    #[serde(default)]
    pub memory_used_in_mb: Option<f64>,
    #[serde(default)]
    pub activated_on: Option<String>,
    #[serde(default)]
    pub last_modified: Option<String>,
    #[serde(default)]
    pub public_endpoint: Option<String>,
    #[serde(default)]
    pub private_endpoint: Option<String>,
    #[serde(default)]
    pub replication: Option<bool>,
    #[serde(default)]
    pub data_persistence: Option<String>,
    #[serde(default)]
    pub data_eviction_policy: Option<String>,
    #[serde(default)]
    pub clustering: Option<FixedClustering>,
    #[serde(default)]
    pub security: Option<FixedSecurity>,
    #[serde(default)]
    pub backup: Option<Backup>,
    #[serde(default)]
    pub modules: Vec<super::databases::DatabaseModule>,
    #[serde(default)]
    pub alerts: Vec<Alert>,
    #[serde(default)]
    pub replica: Option<Replica>,
}

impl FixedDatabase {
    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedClustering {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub regex_rules: Vec<RegexRule>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedSecurity {
    #[serde(default)]
    pub enable_default_user: Option<bool>,
    #[serde(default)]
    pub password: Option<String>,
    #[serde(default)]
    pub ssl_client_authentication: Option<bool>,
    #[serde(default)]
    pub enable_tls: Option<bool>,
    #[serde(default)]
    pub source_ips: Vec<String>,
}

/// Body of Essentials database create/update
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FixedDatabaseRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit_in_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_size_in_gb: Option<f64>,
    #[serde(rename = "supportOSSClusterApi", skip_serializing_if = "Option::is_none")]
    pub support_oss_cluster_api: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resp_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_persistence: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data_eviction_policy: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replication: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub periodic_backup_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source_ips: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replica: Option<Replica>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub regex_rules: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub client_tls_certificates: Option<Vec<super::databases::ClientTlsCertificate>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_tls: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub password: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub enable_default_user: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alerts: Option<Vec<Alert>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub modules: Option<Vec<Module>>,
}

/// Handler for `/fixed/subscriptions` and `/fixed/plans`
#[derive(Debug, Clone)]
pub struct FixedSubscriptionHandler {
    client: CloudClient,
}

impl FixedSubscriptionHandler {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<FixedSubscription>> {
        let value = self
            .client
            .get_raw(ResourceFamily::FixedSubscription, "/fixed/subscriptions")
            .await?;
        list_field(&value, "subscriptions")
    }

    pub async fn get(&self, subscription_id: i64) -> Result<FixedSubscription> {
        self.client
            .get(
                ResourceFamily::FixedSubscription,
                &format!("/fixed/subscriptions/{}", subscription_id),
            )
            .await
    }

    pub async fn create(&self, request: &FixedSubscriptionRequest) -> Result<TaskStateUpdate> {
        let request = FixedSubscriptionCreateRequest {
            name: request.name.clone(),
            plan_id: api_id(request.plan_id)?,
            payment_method: request.payment_method.clone(),
            payment_method_id: request.payment_method_id.map(api_id).transpose()?,
            command_type: None,
        };
        let task = self
            .client
            .cloud()
            .fixed_subscriptions()
            .create(&request)
            .await
            .in_family(ResourceFamily::FixedSubscription)?;
        TaskStateUpdate::from_task(&task)
    }

    pub async fn update(
        &self,
        subscription_id: i64,
        request: &FixedSubscriptionRequest,
    ) -> Result<TaskStateUpdate> {
        let request = FixedSubscriptionUpdateRequest {
            subscription_id: None,
            name: Some(request.name.clone()),
            plan_id: Some(api_id(request.plan_id)?),
            payment_method: request.payment_method.clone(),
            payment_method_id: request.payment_method_id.map(api_id).transpose()?,
            command_type: None,
        };
        let task = self
            .client
            .cloud()
            .fixed_subscriptions()
            .update(api_id(subscription_id)?, &request)
            .await
            .in_family(ResourceFamily::FixedSubscription)?;
        TaskStateUpdate::from_task(&task)
    }

    pub async fn delete(&self, subscription_id: i64) -> Result<TaskStateUpdate> {
        let task = self
            .client
            .cloud()
            .fixed_subscriptions()
            .delete_by_id(api_id(subscription_id)?)
            .await
            .in_family(ResourceFamily::FixedSubscription)?;
        TaskStateUpdate::from_task(&task)
    }

    /// Plans offered for `provider` (all providers when `None`)
    pub async fn list_plans(&self, provider: Option<&str>) -> Result<Vec<FixedPlan>> {
        let path = match provider {
            Some(p) => format!("/fixed/plans?provider={}", urlencoding::encode(p)),
            None => "/fixed/plans".to_string(),
        };
        let value = self.client.get_raw(ResourceFamily::FixedPlan, &path).await?;
        list_field(&value, "plans")
    }
}

/// Handler for `/fixed/subscriptions/{sub}/databases`
#[derive(Debug, Clone)]
pub struct FixedDatabaseHandler {
    client: CloudClient,
}

impl FixedDatabaseHandler {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }

    fn path(subscription_id: i64, database_id: i64) -> String {
        format!(
            "/fixed/subscriptions/{}/databases/{}",
            subscription_id, database_id
        )
    }

    pub async fn list(&self, subscription_id: i64) -> Result<Vec<FixedDatabase>> {
        let value = self
            .client
            .get_raw(
                ResourceFamily::FixedSubscription,
                &format!("/fixed/subscriptions/{}/databases", subscription_id),
            )
            .await?;
        let container = match value.get("subscription") {
            Some(Value::Array(items)) => items.first().cloned().unwrap_or(Value::Null),
            Some(other) => other.clone(),
            None => Value::Null,
        };
        list_field(&container, "databases")
    }

    pub async fn get(&self, subscription_id: i64, database_id: i64) -> Result<FixedDatabase> {
        self.client
            .get(
                ResourceFamily::FixedDatabase,
                &Self::path(subscription_id, database_id),
            )
            .await
    }

    pub async fn create(
        &self,
        subscription_id: i64,
        request: &FixedDatabaseRequest,
    ) -> Result<TaskStateUpdate> {
        let body = serde_json::to_value(request)?;
        submitted(
            self.client
                .post_raw(
                    ResourceFamily::FixedSubscription,
                    &format!("/fixed/subscriptions/{}/databases", subscription_id),
                    body,
                )
                .await?,
        )
    }

    pub async fn update(
        &self,
        subscription_id: i64,
        database_id: i64,
        request: &FixedDatabaseRequest,
    ) -> Result<TaskStateUpdate> {
        let body = serde_json::to_value(request)?;
        submitted(
            self.client
                .put_raw(
                    ResourceFamily::FixedDatabase,
                    &Self::path(subscription_id, database_id),
                    body,
                )
                .await?,
        )
    }

    pub async fn delete(&self, subscription_id: i64, database_id: i64) -> Result<TaskStateUpdate> {
        let task = self
            .client
            .cloud()
            .fixed_databases()
            .delete_by_id(api_id(subscription_id)?, api_id(database_id)?)
            .await
            .in_family(ResourceFamily::FixedDatabase)?;
        TaskStateUpdate::from_task(&task)
    }
}
