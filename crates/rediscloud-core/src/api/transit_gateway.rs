//! AWS Transit Gateway attachments
//!
//! Listing is task-backed. Pro attachments hang off the subscription and go
//! through the `redis-cloud` transit gateway handler; Active-Active ones hang
//! off a subscription region, whose per-gateway paths that handler does not
//! cover. Deletion stays raw in both scopes so the caller gets the task.

use redis_cloud::connectivity::transit_gateway::TgwAttachmentRequest;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use super::tasks::TaskStateUpdate;
use super::{api_id, list_field, read_via_task, submitted};
use crate::client::CloudClient;
use crate::context::OperationContext;
use crate::error::{CoreError, InFamily, ResourceFamily, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitGatewayAttachment {
    pub id: i64,
    #[serde(default)]
    pub aws_tgw_uid: Option<String>,
    #[serde(default)]
    pub attachment_uid: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub attachment_status: Option<String>,
    #[serde(default)]
    pub aws_account_id: Option<String>,
    #[serde(default)]
    pub cidrs: Vec<TransitGatewayCidr>,
}

impl TransitGatewayAttachment {
    pub fn cidr_addresses(&self) -> Vec<String> {
        self.cidrs.iter().map(|c| c.cidr_address.clone()).collect()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransitGatewayCidr {
    pub cidr_address: String,
    #[serde(default)]
    pub status: Option<String>,
}

/// Where an attachment lives: a Pro subscription or one Active-Active region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TgwScope {
    Subscription(i64),
    Region { subscription_id: i64, region_id: i64 },
}

impl TgwScope {
    pub fn subscription_id(&self) -> i64 {
        match self {
            TgwScope::Subscription(id) => *id,
            TgwScope::Region { subscription_id, .. } => *subscription_id,
        }
    }

    fn base(&self) -> String {
        match self {
            TgwScope::Subscription(id) => format!("/subscriptions/{}/transitGateways", id),
            TgwScope::Region {
                subscription_id,
                region_id,
            } => format!(
                "/subscriptions/{}/regions/{}/transitGateways",
                subscription_id, region_id
            ),
        }
    }
}

#[derive(Debug, Clone)]
pub struct TransitGatewayHandler {
    client: CloudClient,
}

impl TransitGatewayHandler {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }

    /// Every transit gateway visible to the scope, attached or not
    pub async fn list(
        &self,
        ctx: &OperationContext,
        scope: TgwScope,
    ) -> Result<Vec<TransitGatewayAttachment>> {
        let submission = match scope {
            TgwScope::Subscription(id) => {
                let task = self
                    .client
                    .cloud()
                    .transit_gateway()
                    .get_attachments(api_id(id)?)
                    .await
                    .in_family(ResourceFamily::TransitGateway)?;
                TaskStateUpdate::from_task(&task)?
            }
            TgwScope::Region { .. } => submitted(
                self.client
                    .get_raw(ResourceFamily::TransitGateway, &scope.base())
                    .await?,
            )?,
        };
        let resource =
            read_via_task(ctx, &self.client, ResourceFamily::TransitGateway, submission).await?;
        list_field(&resource, "resources")
    }

    pub async fn get(
        &self,
        ctx: &OperationContext,
        scope: TgwScope,
        tgw_id: i64,
    ) -> Result<TransitGatewayAttachment> {
        self.list(ctx, scope)
            .await?
            .into_iter()
            .find(|t| t.id == tgw_id)
            .ok_or_else(|| {
                CoreError::not_found(
                    ResourceFamily::TransitGateway,
                    format!("transit gateway {} not found", tgw_id),
                )
            })
    }

    /// Request an attachment. Routes cannot be sent until the AWS side accepts.
    pub async fn create_attachment(&self, scope: TgwScope, tgw_id: i64) -> Result<TaskStateUpdate> {
        if let TgwScope::Subscription(id) = scope {
            let task = self
                .client
                .cloud()
                .transit_gateway()
                .create_attachment_with_id(api_id(id)?, &tgw_id.to_string())
                .await
                .in_family(ResourceFamily::TransitGateway)?;
            return TaskStateUpdate::from_task(&task);
        }
        submitted(
            self.client
                .post_raw(
                    ResourceFamily::TransitGateway,
                    &format!("{}/{}/attachment", scope.base(), tgw_id),
                    Value::Object(Default::default()),
                )
                .await?,
        )
    }

    /// Replace the attachment's CIDR routes; an empty list clears them
    pub async fn update_cidrs(
        &self,
        scope: TgwScope,
        tgw_id: i64,
        cidrs: &[String],
    ) -> Result<TaskStateUpdate> {
        if let TgwScope::Subscription(id) = scope {
            let request = TgwAttachmentRequest {
                aws_account_id: None,
                tgw_id: None,
                cidrs: Some(cidrs.to_vec()),
            };
            let task = self
                .client
                .cloud()
                .transit_gateway()
                .update_attachment_cidrs(api_id(id)?, tgw_id.to_string(), &request)
                .await
                .in_family(ResourceFamily::TransitGateway)?;
            return TaskStateUpdate::from_task(&task);
        }
        submitted(
            self.client
                .put_raw(
                    ResourceFamily::TransitGateway,
                    &format!("{}/{}/attachment", scope.base(), tgw_id),
                    json!({ "cidrs": cidrs }),
                )
                .await?,
        )
    }

    pub async fn delete_attachment(&self, scope: TgwScope, tgw_id: i64) -> Result<TaskStateUpdate> {
        submitted(
            self.client
                .delete_raw(
                    ResourceFamily::TransitGateway,
                    &format!("{}/{}/attachment", scope.base(), tgw_id),
                )
                .await?,
        )
    }
}
