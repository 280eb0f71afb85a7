//! Pro and Active-Active subscriptions
//!
//! Both variants share `/subscriptions`; the `deploymentType` field tells
//! them apart (`single-region` or `active-active`).

use redis_cloud::subscriptions::CidrAllowlistUpdateRequest;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::tasks::TaskStateUpdate;
use super::{Module, ThroughputMeasurement, api_id, list_field, read_via_task, submitted};
use crate::client::CloudClient;
use crate::context::OperationContext;
use crate::error::{InFamily, ResourceFamily, Result};

pub const DEPLOYMENT_SINGLE_REGION: &str = "single-region";
pub const DEPLOYMENT_ACTIVE_ACTIVE: &str = "active-active";

/// Subscription as returned by `GET /subscriptions/{id}`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subscription {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub payment_method_id: Option<i64>,
    #[serde(default)]
    pub payment_method_type: Option<String>,
    #[serde(default)]
    pub memory_storage: Option<String>,
    #[serde(default)]
    pub deployment_type: Option<String>,
    #[serde(default)]
    pub number_of_databases: Option<i64>,
    #[serde(default)]
    pub redis_version: Option<String>,
    #[serde(default)]
    pub public_endpoint_access: Option<bool>,
    #[serde(default)]
    pub customer_managed_key_access_details: Option<Value>,
    #[serde(default)]
    pub cloud_details: Vec<CloudDetail>,
}

impl Subscription {
    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or_default()
    }

    pub fn is_active_active(&self) -> bool {
        self.deployment_type.as_deref() == Some(DEPLOYMENT_ACTIVE_ACTIVE)
    }

    /// The first (for Pro, the only) cloud provider block
    pub fn primary_cloud(&self) -> Option<&CloudDetail> {
        self.cloud_details.first()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudDetail {
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub cloud_account_id: Option<i64>,
    #[serde(default)]
    pub aws_account_id: Option<String>,
    #[serde(default)]
    pub total_size_in_gb: Option<f64>,
    #[serde(default)]
    pub regions: Vec<RegionDetail>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionDetail {
    #[serde(default)]
    pub region: Option<String>,
    #[serde(default)]
    pub networking: Vec<Networking>,
    #[serde(default)]
    pub preferred_availability_zones: Vec<String>,
    #[serde(default)]
    pub multiple_availability_zones: Option<bool>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Networking {
    #[serde(default, rename = "deploymentCIDR", alias = "deploymentCidr")]
    pub deployment_cidr: Option<String>,
    #[serde(default)]
    pub vpc_id: Option<String>,
    #[serde(default)]
    pub subnet_id: Option<String>,
}

/// Body of `POST /subscriptions`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionCreateRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dry_run: Option<bool>,
    pub deployment_type: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_storage: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub redis_version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_endpoint_access: Option<bool>,
    pub cloud_providers: Vec<CloudProviderRequest>,
    pub databases: Vec<CreationPlanDatabase>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudProviderRequest {
    pub provider: String,
    pub cloud_account_id: i64,
    pub regions: Vec<RegionRequest>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegionRequest {
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub multiple_availability_zones: Option<bool>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub preferred_availability_zones: Vec<String>,
    pub networking: NetworkingRequest,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct NetworkingRequest {
    #[serde(rename = "deploymentCIDR", skip_serializing_if = "Option::is_none")]
    pub deployment_cidr: Option<String>,
    #[serde(rename = "vpcId", skip_serializing_if = "Option::is_none")]
    pub vpc_id: Option<String>,
}

/// One synthetic database in the creation plan
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationPlanDatabase {
    pub name: String,
    pub protocol: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub memory_limit_in_gb: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub dataset_size_in_gb: Option<f64>,
    #[serde(rename = "supportOSSClusterApi", skip_serializing_if = "Option::is_none")]
    pub support_oss_cluster_api: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub replication: Option<bool>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub throughput_measurement: Option<ThroughputMeasurement>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub local_throughput_measurement: Vec<LocalThroughput>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<Module>,
    pub quantity: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub average_item_size_in_bytes: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub query_performance_factor: Option<String>,
}

/// Per-region read/write throughput for Active-Active databases
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalThroughput {
    pub region: String,
    pub write_operations_per_second: i64,
    pub read_operations_per_second: i64,
}

/// Body of `PUT /subscriptions/{id}`
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SubscriptionUpdateRequest {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub payment_method_id: Option<i64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub public_endpoint_access: Option<bool>,
}

/// CIDR allowlist as carried in the task resource of `GET /subscriptions/{id}/cidr`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CidrAllowlist {
    #[serde(default, alias = "cidrIps")]
    pub cidr_ips: Vec<String>,
    #[serde(default, alias = "securityGroupIds")]
    pub security_group_ids: Vec<String>,
}

/// Handler for `/subscriptions`
#[derive(Debug, Clone)]
pub struct SubscriptionHandler {
    client: CloudClient,
}

impl SubscriptionHandler {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<Subscription>> {
        let value = self
            .client
            .get_raw(ResourceFamily::Subscription, "/subscriptions")
            .await?;
        list_field(&value, "subscriptions")
    }

    pub async fn get(&self, subscription_id: i64) -> Result<Subscription> {
        self.client
            .get(
                ResourceFamily::Subscription,
                &format!("/subscriptions/{}", subscription_id),
            )
            .await
    }

    pub async fn create(&self, request: &SubscriptionCreateRequest) -> Result<TaskStateUpdate> {
        let body = serde_json::to_value(request)?;
        submitted(
            self.client
                .post_raw(ResourceFamily::Subscription, "/subscriptions", body)
                .await?,
        )
    }

    pub async fn update(
        &self,
        subscription_id: i64,
        request: &SubscriptionUpdateRequest,
    ) -> Result<TaskStateUpdate> {
        let body = serde_json::to_value(request)?;
        submitted(
            self.client
                .put_raw(
                    ResourceFamily::Subscription,
                    &format!("/subscriptions/{}", subscription_id),
                    body,
                )
                .await?,
        )
    }

    pub async fn delete(&self, subscription_id: i64) -> Result<TaskStateUpdate> {
        let task = self
            .client
            .cloud()
            .subscriptions()
            .delete_subscription_by_id(api_id(subscription_id)?)
            .await
            .in_family(ResourceFamily::Subscription)?;
        TaskStateUpdate::from_task(&task)
    }

    pub async fn get_cidr_allowlist(
        &self,
        ctx: &OperationContext,
        subscription_id: i64,
    ) -> Result<CidrAllowlist> {
        let task = self
            .client
            .cloud()
            .subscriptions()
            .get_cidr_allowlist(api_id(subscription_id)?)
            .await
            .in_family(ResourceFamily::Subscription)?;
        let resource = read_via_task(
            ctx,
            &self.client,
            ResourceFamily::Subscription,
            TaskStateUpdate::from_task(&task)?,
        )
        .await?;
        if resource.is_null() {
            return Ok(CidrAllowlist::default());
        }
        Ok(serde_json::from_value(resource)?)
    }

    pub async fn update_cidr_allowlist(
        &self,
        subscription_id: i64,
        allowlist: &CidrAllowlist,
    ) -> Result<TaskStateUpdate> {
        let subscription_id = api_id(subscription_id)?;
        let request = CidrAllowlistUpdateRequest {
            subscription_id: None,
            cidr_ips: Some(allowlist.cidr_ips.clone()),
            security_group_ids: Some(allowlist.security_group_ids.clone()),
            command_type: None,
        };
        let task = self
            .client
            .cloud()
            .subscriptions()
            .update_subscription_cidr_allowlist(subscription_id, &request)
            .await
            .in_family(ResourceFamily::Subscription)?;
        TaskStateUpdate::from_task(&task)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_subscription_decodes_networking() {
        let sub: Subscription = serde_json::from_value(json!({
            "id": 1234,
            "name": "prod",
            "status": "active",
            "paymentMethodType": "credit-card",
            "memoryStorage": "ram",
            "deploymentType": "single-region",
            "cloudDetails": [{
                "provider": "AWS",
                "cloudAccountId": 1,
                "regions": [{
                    "region": "us-east-1",
                    "multipleAvailabilityZones": false,
                    "networking": [{"deploymentCIDR": "10.0.0.0/24", "vpcId": "vpc-1", "subnetId": "subnet-1"}]
                }]
            }]
        }))
        .unwrap();

        assert_eq!(sub.status(), "active");
        assert!(!sub.is_active_active());
        let region = &sub.primary_cloud().unwrap().regions[0];
        assert_eq!(region.networking[0].deployment_cidr.as_deref(), Some("10.0.0.0/24"));
    }

    #[test]
    fn test_create_request_omits_unset_fields() {
        let request = SubscriptionCreateRequest {
            name: "prod".to_string(),
            deployment_type: DEPLOYMENT_SINGLE_REGION.to_string(),
            payment_method: Some("marketplace".to_string()),
            cloud_providers: vec![CloudProviderRequest {
                provider: "AWS".to_string(),
                cloud_account_id: 1,
                regions: vec![RegionRequest {
                    region: "us-east-1".to_string(),
                    networking: NetworkingRequest {
                        deployment_cidr: Some("10.0.0.0/24".to_string()),
                        vpc_id: None,
                    },
                    ..Default::default()
                }],
            }],
            ..Default::default()
        };

        let body = serde_json::to_value(&request).unwrap();
        assert!(body.get("paymentMethodId").is_none());
        assert_eq!(
            body["cloudProviders"][0]["regions"][0]["networking"],
            json!({"deploymentCIDR": "10.0.0.0/24"})
        );
    }
}
