//! GCP Private Service Connect endpoints
//!
//! Endpoint listing and creation scripts are task-backed reads. Pro endpoint
//! updates go through the `redis-cloud` PSC handler; the accept/reject
//! action and the service-scoped paths it does not cover are sent raw.

use redis_cloud::connectivity::PscEndpointUpdateRequest;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::tasks::TaskStateUpdate;
use super::{api_id, list_field, read_via_task, submitted};
use crate::client::CloudClient;
use crate::context::OperationContext;
use crate::error::{CoreError, InFamily, ResourceFamily, Result};

pub const ACTION_ACCEPT: &str = "accept";
pub const ACTION_REJECT: &str = "reject";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PscEndpoint {
    pub id: i64,
    #[serde(default)]
    pub gcp_project_id: Option<String>,
    #[serde(default)]
    pub gcp_vpc_name: Option<String>,
    #[serde(default)]
    pub gcp_vpc_subnet_name: Option<String>,
    #[serde(default)]
    pub endpoint_connection_name: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub service_attachments: Vec<ServiceAttachment>,
}

impl PscEndpoint {
    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ServiceAttachment {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub dns_record: Option<String>,
    #[serde(default)]
    pub ip_address_name: Option<String>,
    #[serde(default)]
    pub forwarding_rule_name: Option<String>,
}

/// Body of endpoint create/update
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PscEndpointRequest {
    pub gcp_project_id: String,
    pub gcp_vpc_name: String,
    pub gcp_vpc_subnet_name: String,
    pub endpoint_connection_name: String,
}

/// gcloud / terraform scripts to create the consumer side of an endpoint
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreationScripts {
    #[serde(default)]
    pub gcloud: Option<ScriptPair>,
    #[serde(default)]
    pub terraform_gcp: Option<Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScriptPair {
    #[serde(default)]
    pub create_command: Option<String>,
    #[serde(default)]
    pub delete_command: Option<String>,
}

/// Where a PSC service lives: a Pro subscription or an Active-Active region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PscScope {
    Subscription(i64),
    Region { subscription_id: i64, region_id: i64 },
}

impl PscScope {
    pub fn subscription_id(&self) -> i64 {
        match self {
            PscScope::Subscription(id) => *id,
            PscScope::Region { subscription_id, .. } => *subscription_id,
        }
    }

    fn service(&self, psc_service_id: i64) -> String {
        match self {
            PscScope::Subscription(id) => {
                format!("/subscriptions/{}/private-service-connect/{}", id, psc_service_id)
            }
            PscScope::Region {
                subscription_id,
                region_id,
            } => format!(
                "/subscriptions/{}/regions/{}/private-service-connect/{}",
                subscription_id, region_id, psc_service_id
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct PscHandler {
    client: CloudClient,
}

impl PscHandler {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }

    pub async fn list_endpoints(
        &self,
        ctx: &OperationContext,
        scope: PscScope,
        psc_service_id: i64,
    ) -> Result<Vec<PscEndpoint>> {
        let submission = submitted(
            self.client
                .get_raw(ResourceFamily::PrivateServiceConnect, &scope.service(psc_service_id))
                .await?,
        )?;
        let resource =
            read_via_task(ctx, &self.client, ResourceFamily::PrivateServiceConnect, submission)
                .await?;
        list_field(&resource, "endpoints")
    }

    pub async fn get_endpoint(
        &self,
        ctx: &OperationContext,
        scope: PscScope,
        psc_service_id: i64,
        endpoint_id: i64,
    ) -> Result<PscEndpoint> {
        self.list_endpoints(ctx, scope, psc_service_id)
            .await?
            .into_iter()
            .find(|e| e.id == endpoint_id)
            .ok_or_else(|| {
                CoreError::not_found(
                    ResourceFamily::PrivateServiceConnect,
                    format!("PSC endpoint {} not found", endpoint_id),
                )
            })
    }

    pub async fn create_endpoint(
        &self,
        scope: PscScope,
        psc_service_id: i64,
        request: &PscEndpointRequest,
    ) -> Result<TaskStateUpdate> {
        let body = serde_json::to_value(request)?;
        submitted(
            self.client
                .post_raw(
                    ResourceFamily::PrivateServiceConnect,
                    &scope.service(psc_service_id),
                    body,
                )
                .await?,
        )
    }

    pub async fn update_endpoint(
        &self,
        scope: PscScope,
        psc_service_id: i64,
        endpoint_id: i64,
        request: &PscEndpointRequest,
    ) -> Result<TaskStateUpdate> {
        if let PscScope::Subscription(id) = scope {
            let update = PscEndpointUpdateRequest {
                subscription_id: api_id(id)?,
                psc_service_id: api_id(psc_service_id)?,
                endpoint_id: api_id(endpoint_id)?,
                gcp_project_id: Some(request.gcp_project_id.clone()),
                gcp_vpc_name: Some(request.gcp_vpc_name.clone()),
                gcp_vpc_subnet_name: Some(request.gcp_vpc_subnet_name.clone()),
                endpoint_connection_name: Some(request.endpoint_connection_name.clone()),
            };
            let task = self
                .client
                .cloud()
                .psc()
                .update_endpoint(update.subscription_id, update.endpoint_id, &update)
                .await
                .in_family(ResourceFamily::PrivateServiceConnect)?;
            return TaskStateUpdate::from_task(&task);
        }
        let body = serde_json::to_value(request)?;
        self.put_endpoint(scope, psc_service_id, endpoint_id, body).await
    }

    /// Accept or reject a pending endpoint
    pub async fn set_endpoint_action(
        &self,
        scope: PscScope,
        psc_service_id: i64,
        endpoint_id: i64,
        action: &str,
    ) -> Result<TaskStateUpdate> {
        self.put_endpoint(scope, psc_service_id, endpoint_id, json!({"action": action}))
            .await
    }

    async fn put_endpoint(
        &self,
        scope: PscScope,
        psc_service_id: i64,
        endpoint_id: i64,
        body: Value,
    ) -> Result<TaskStateUpdate> {
        submitted(
            self.client
                .put_raw(
                    ResourceFamily::PrivateServiceConnect,
                    &format!("{}/endpoints/{}", scope.service(psc_service_id), endpoint_id),
                    body,
                )
                .await?,
        )
    }

    pub async fn delete_endpoint(
        &self,
        scope: PscScope,
        psc_service_id: i64,
        endpoint_id: i64,
    ) -> Result<TaskStateUpdate> {
        submitted(
            self.client
                .delete_raw(
                    ResourceFamily::PrivateServiceConnect,
                    &format!("{}/endpoints/{}", scope.service(psc_service_id), endpoint_id),
                )
                .await?,
        )
    }

    pub async fn creation_scripts(
        &self,
        ctx: &OperationContext,
        scope: PscScope,
        psc_service_id: i64,
        endpoint_id: i64,
    ) -> Result<CreationScripts> {
        let submission = submitted(
            self.client
                .get_raw(
                    ResourceFamily::PrivateServiceConnect,
                    &format!(
                        "{}/endpoints/{}/creationScripts",
                        scope.service(psc_service_id),
                        endpoint_id
                    ),
                )
                .await?,
        )?;
        let resource =
            read_via_task(ctx, &self.client, ResourceFamily::PrivateServiceConnect, submission)
                .await?;
        match resource.get("script") {
            Some(script) if !script.is_null() => Ok(serde_json::from_value(script.clone())?),
            _ => Ok(CreationScripts::default()),
        }
    }
}
