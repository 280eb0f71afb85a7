//! Active-Active subscription regions and the provider region catalogue

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::subscriptions::LocalThroughput;
use super::tasks::TaskStateUpdate;
use super::{list_field, submitted};
use crate::client::CloudClient;
use crate::error::{ResourceFamily, Result};

/// A region participating in an Active-Active subscription
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ActiveActiveRegion {
    #[serde(default)]
    pub region_id: Option<i64>,
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default, alias = "deploymentCIDR")]
    pub deployment_cidr: Option<String>,
    #[serde(default)]
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub databases: Vec<RegionDatabase>,
}

/// Local throughput of one database inside a region
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionDatabase {
    pub database_id: i64,
    #[serde(default)]
    pub database_name: Option<String>,
    #[serde(default)]
    pub read_operations_per_second: Option<i64>,
    #[serde(default)]
    pub write_operations_per_second: Option<i64>,
}

/// Body of `POST /subscriptions/{id}/regions` (one region per call)
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionCreateRequest {
    pub region: String,
    #[serde(rename = "deploymentCIDR")]
    pub deployment_cidr: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub databases: Vec<RegionDatabaseRequest>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionDatabaseRequest {
    pub name: String,
    pub local_throughput_measurement: LocalThroughput,
}

/// A region name offered by a cloud provider
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProviderRegion {
    pub name: String,
    #[serde(default)]
    pub provider: Option<String>,
}

/// Handler for Active-Active regions and `/regions`
#[derive(Debug, Clone)]
pub struct RegionHandler {
    client: CloudClient,
}

impl RegionHandler {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, subscription_id: i64) -> Result<Vec<ActiveActiveRegion>> {
        let value = self
            .client
            .get_raw(
                ResourceFamily::Region,
                &format!("/subscriptions/{}/regions", subscription_id),
            )
            .await?;
        list_field(&value, "regions")
    }

    pub async fn create(
        &self,
        subscription_id: i64,
        request: &RegionCreateRequest,
    ) -> Result<TaskStateUpdate> {
        let body = serde_json::to_value(request)?;
        submitted(
            self.client
                .post_raw(
                    ResourceFamily::Region,
                    &format!("/subscriptions/{}/regions", subscription_id),
                    body,
                )
                .await?,
        )
    }

    /// Remove regions; the API takes the region names in the DELETE body
    pub async fn delete(&self, subscription_id: i64, regions: &[String]) -> Result<TaskStateUpdate> {
        let body = json!({
            "regions": regions.iter().map(|r| json!({"region": r})).collect::<Vec<_>>(),
        });
        submitted(
            self.client
                .delete_with_body(
                    ResourceFamily::Region,
                    &format!("/subscriptions/{}/regions", subscription_id),
                    body,
                )
                .await?,
        )
    }

    /// Regions a cloud provider offers (all providers when `None`)
    pub async fn list_provider_regions(&self, provider: Option<&str>) -> Result<Vec<ProviderRegion>> {
        let path = match provider {
            Some(p) => format!("/regions?provider={}", urlencoding::encode(p)),
            None => "/regions".to_string(),
        };
        let value = self.client.get_raw(ResourceFamily::Region, &path).await?;
        list_field(&value, "regions")
    }
}
