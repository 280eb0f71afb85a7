//! Transit gateway attachments and their CIDR routes, for Pro
//! subscriptions and for single Active-Active regions
//!
//! An attachment is created without routes. AWS sends an invitation that
//! must be accepted out of band, after which the route resource owns the
//! attachment's CIDR list.

use async_trait::async_trait;
use rediscloud_core::api::TransitGatewayAttachment;
use rediscloud_core::api::transit_gateway::TgwScope;
use rediscloud_core::cloud::status::transit_gateway::AVAILABLE;
use rediscloud_core::{ActiveActiveTransitGatewayId, OperationContext, ResourceFamily, TransitGatewayId, cloud};
use tracing::info;

use super::common::{cidr_set, found, int_attr, strings_like, subscription_id};
use crate::error::{ProviderError, Result};
use crate::host::{Attribute, AttrType, Block, Operation, Resource, ResourceData, Schema, Timeouts};
use crate::state::ProviderState;

/// Which attachment flavour a resource manages
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Subscription,
    Region,
}

fn scope(data: &ResourceData, placement: Placement) -> Result<TgwScope> {
    let subscription_id = subscription_id(data)?;
    Ok(match placement {
        Placement::Subscription => TgwScope::Subscription(subscription_id),
        Placement::Region => TgwScope::Region {
            subscription_id,
            region_id: int_attr(data, "region_id", "Region")?,
        },
    })
}

fn composite_id(scope: TgwScope, tgw_id: i64) -> String {
    match scope {
        TgwScope::Subscription(subscription_id) => TransitGatewayId {
            subscription_id,
            tgw_id,
        }
        .to_string(),
        TgwScope::Region {
            subscription_id,
            region_id,
        } => ActiveActiveTransitGatewayId {
            subscription_id,
            region_id,
            tgw_id,
        }
        .to_string(),
    }
}

fn import_id(data: &mut ResourceData, placement: Placement) -> Result<()> {
    match placement {
        Placement::Subscription => {
            let id: TransitGatewayId = data.id().parse()?;
            data.set("subscription_id", id.subscription_id.to_string());
            data.set("tgw_id", id.tgw_id);
        }
        Placement::Region => {
            let id: ActiveActiveTransitGatewayId = data.id().parse()?;
            data.set("subscription_id", id.subscription_id.to_string());
            data.set("region_id", id.region_id);
            data.set("tgw_id", id.tgw_id);
        }
    }
    Ok(())
}

fn identity(block: Block, placement: Placement) -> Block {
    let block = block
        .attr("subscription_id", Attribute::string().required().force_new())
        .attr("tgw_id", Attribute::int().required().force_new());
    match placement {
        Placement::Subscription => block,
        Placement::Region => block.attr("region_id", Attribute::int().required().force_new()),
    }
}

async fn fetch(
    ctx: &OperationContext,
    state: &ProviderState,
    data: &mut ResourceData,
    placement: Placement,
) -> Result<Option<TransitGatewayAttachment>> {
    let scope = scope(data, placement)?;
    let tgw_id = int_attr(data, "tgw_id", "Transit gateway")?;
    found(data, ResourceFamily::TransitGateway, state.transit_gateways().get(ctx, scope, tgw_id).await)
}

pub struct TransitGatewayAttachmentResource {
    placement: Placement,
}

impl TransitGatewayAttachmentResource {
    pub const PRO: Self = Self {
        placement: Placement::Subscription,
    };
    pub const ACTIVE_ACTIVE: Self = Self {
        placement: Placement::Region,
    };
}

#[async_trait]
impl Resource for TransitGatewayAttachmentResource {
    fn type_name(&self) -> &'static str {
        match self.placement {
            Placement::Subscription => "rediscloud_transit_gateway_attachment",
            Placement::Region => "rediscloud_active_active_transit_gateway_attachment",
        }
    }

    fn family(&self) -> ResourceFamily {
        ResourceFamily::TransitGateway
    }

    fn schema(&self) -> Schema {
        let block = identity(Block::new(), self.placement)
            .attr("aws_tgw_uid", Attribute::string().computed())
            .attr("attachment_uid", Attribute::string().computed())
            .attr("status", Attribute::string().computed())
            .attr("attachment_status", Attribute::string().computed())
            .attr("aws_account_id", Attribute::string().computed())
            .attr(
                "cidrs",
                Attribute::set(AttrType::String)
                    .computed()
                    .description("Routes currently set on the attachment, managed by the route resource"),
            );
        Schema::resource(block, Some(Timeouts::minutes(10, 5, 10, 10)))
    }

    async fn create(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let scope = scope(data, self.placement)?;
        let sub = scope.subscription_id();
        let tgw_id = int_attr(data, "tgw_id", "Transit gateway")?;
        let client = state.client();
        let timeout = data.timeout(Operation::Create);
        {
            let _guard = state.lock_subscription(ctx, sub).await?;
            cloud::wait_for_subscription_active(ctx, client, sub, timeout).await?;
            let task = state.transit_gateways().create_attachment(scope, tgw_id).await?;
            cloud::complete_task(ctx, client, task, timeout).await?;
            data.set_id(composite_id(scope, tgw_id));
            info!(attachment = data.id(), "Transit gateway attachment requested");
            cloud::wait_for_subscription_active(ctx, client, sub, timeout).await?;
        }
        self.read(ctx, state, data).await
    }

    async fn read(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let Some(attachment) = fetch(ctx, state, data, self.placement).await? else {
            return Ok(());
        };
        data.set_opt("aws_tgw_uid", attachment.aws_tgw_uid.clone());
        data.set_opt("attachment_uid", attachment.attachment_uid.clone());
        data.set_opt("status", attachment.status.clone());
        data.set_opt("attachment_status", attachment.attachment_status.clone());
        data.set_opt("aws_account_id", attachment.aws_account_id.clone());
        data.set("cidrs", attachment.cidr_addresses());
        Ok(())
    }

    // Every input forces replacement
    async fn update(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        self.read(ctx, state, data).await
    }

    async fn delete(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let scope = scope(data, self.placement)?;
        let sub = scope.subscription_id();
        let tgw_id = int_attr(data, "tgw_id", "Transit gateway")?;
        let client = state.client();
        let timeout = data.timeout(Operation::Delete);

        let _guard = state.lock_subscription(ctx, sub).await?;
        cloud::wait_for_subscription_active(ctx, client, sub, timeout).await?;
        let task = state.transit_gateways().delete_attachment(scope, tgw_id).await?;
        cloud::complete_task(ctx, client, task, timeout).await?;
        cloud::wait_for_subscription_active(ctx, client, sub, timeout).await?;
        Ok(())
    }

    async fn import(&self, _ctx: &OperationContext, _state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        import_id(data, self.placement)
    }
}

pub struct TransitGatewayRouteResource {
    placement: Placement,
}

impl TransitGatewayRouteResource {
    pub const PRO: Self = Self {
        placement: Placement::Subscription,
    };
    pub const ACTIVE_ACTIVE: Self = Self {
        placement: Placement::Region,
    };

    async fn put_cidrs(
        &self,
        ctx: &OperationContext,
        state: &ProviderState,
        data: &ResourceData,
        cidrs: &[String],
        op: Operation,
    ) -> Result<()> {
        let scope = scope(data, self.placement)?;
        let sub = scope.subscription_id();
        let tgw_id = int_attr(data, "tgw_id", "Transit gateway")?;
        let client = state.client();
        let timeout = data.timeout(op);

        let _guard = state.lock_subscription(ctx, sub).await?;
        cloud::wait_for_subscription_active(ctx, client, sub, timeout).await?;
        let task = state.transit_gateways().update_cidrs(scope, tgw_id, cidrs).await?;
        cloud::complete_task(ctx, client, task, timeout).await?;
        cloud::wait_for_subscription_active(ctx, client, sub, timeout).await?;
        info!(subscription_id = sub, tgw_id, routes = cidrs.len(), "Transit gateway routes updated");
        Ok(())
    }
}

#[async_trait]
impl Resource for TransitGatewayRouteResource {
    fn type_name(&self) -> &'static str {
        match self.placement {
            Placement::Subscription => "rediscloud_transit_gateway_route",
            Placement::Region => "rediscloud_active_active_transit_gateway_route",
        }
    }

    fn family(&self) -> ResourceFamily {
        ResourceFamily::TransitGateway
    }

    fn schema(&self) -> Schema {
        let block = identity(Block::new(), self.placement).attr("cidrs", cidr_set().required());
        Schema::resource(block, Some(Timeouts::minutes(10, 5, 10, 10)))
    }

    async fn create(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let Some(attachment) = fetch(ctx, state, data, self.placement).await? else {
            return Err(ProviderError::lookup(format!(
                "transit gateway {} is not visible to subscription {}",
                data.get_i64("tgw_id").unwrap_or_default(),
                data.get_str("subscription_id").unwrap_or_default(),
            )));
        };
        if attachment.attachment_status.as_deref() != Some(AVAILABLE) {
            return Err(ProviderError::validation_at(
                "tgw_id",
                format!(
                    "the attachment is '{}'; accept the invitation in AWS before setting routes",
                    attachment.attachment_status.as_deref().unwrap_or("missing"),
                ),
            ));
        }

        let cidrs = data.get_strings("cidrs");
        self.put_cidrs(ctx, state, data, &cidrs, Operation::Create).await?;
        let scope = scope(data, self.placement)?;
        data.set_id(composite_id(scope, attachment.id));
        self.read(ctx, state, data).await
    }

    async fn read(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let Some(attachment) = fetch(ctx, state, data, self.placement).await? else {
            return Ok(());
        };
        let current = data.get_strings("cidrs");
        data.set("cidrs", strings_like(&current, attachment.cidr_addresses()));
        Ok(())
    }

    async fn update(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        if data.has_change("cidrs") {
            let cidrs = data.get_strings("cidrs");
            self.put_cidrs(ctx, state, data, &cidrs, Operation::Update).await?;
        }
        self.read(ctx, state, data).await
    }

    async fn delete(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        self.put_cidrs(ctx, state, data, &[], Operation::Delete).await
    }

    async fn import(&self, _ctx: &OperationContext, _state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        import_id(data, self.placement)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_import_region_attachment() {
        let mut data = ResourceData::for_import("12/3/45");
        import_id(&mut data, Placement::Region).unwrap();
        assert_eq!(data.get_str("subscription_id"), Some("12"));
        assert_eq!(data.get_i64("region_id"), Some(3));
        assert_eq!(data.get_i64("tgw_id"), Some(45));
        assert!(import_id(&mut ResourceData::for_import("12/45"), Placement::Region).is_err());
    }

    #[test]
    fn test_composite_id_follows_scope() {
        let data = ResourceData::new(json!({"subscription_id": "12", "region_id": 3, "tgw_id": 45}));
        let region = scope(&data, Placement::Region).unwrap();
        assert_eq!(composite_id(region, 45), "12/3/45");
        let pro = scope(&data, Placement::Subscription).unwrap();
        assert_eq!(composite_id(pro, 45), "12/45");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(
            TransitGatewayRouteResource::ACTIVE_ACTIVE.type_name(),
            "rediscloud_active_active_transit_gateway_route"
        );
        assert_eq!(
            TransitGatewayAttachmentResource::PRO.type_name(),
            "rediscloud_transit_gateway_attachment"
        );
    }
}
