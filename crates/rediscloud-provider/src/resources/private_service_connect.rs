//! GCP Private Service Connect endpoints and their accepters
//!
//! An endpoint is registered against an existing PSC service, then the
//! consumer creates the matching GCP forwarding rules. The accepter
//! resource accepts or rejects the resulting connection.

use async_trait::async_trait;
use rediscloud_core::api::PscEndpoint;
use rediscloud_core::api::psc::{ACTION_ACCEPT, ACTION_REJECT, PscEndpointRequest, PscScope};
use rediscloud_core::cloud::status::psc;
use rediscloud_core::{ActiveActivePscEndpointId, OperationContext, PscEndpointId, ResourceFamily, cloud};
use serde_json::{Value, json};
use tracing::info;

use super::common::{found, int_attr, subscription_id};
use crate::error::Result;
use crate::host::{Attribute, Block, Operation, Resource, ResourceData, Schema, Timeouts, Validation};
use crate::state::ProviderState;

const SERVICE_ID: &str = "private_service_connect_service_id";
const ENDPOINT_ID: &str = "private_service_connect_endpoint_id";
const ACTIONS: &[&str] = &[ACTION_ACCEPT, ACTION_REJECT];

/// Whether the PSC service belongs to a Pro subscription or an
/// Active-Active region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placement {
    Subscription,
    Region,
}

fn scope(data: &ResourceData, placement: Placement) -> Result<PscScope> {
    let subscription_id = subscription_id(data)?;
    Ok(match placement {
        Placement::Subscription => PscScope::Subscription(subscription_id),
        Placement::Region => PscScope::Region {
            subscription_id,
            region_id: int_attr(data, "region_id", "Region")?,
        },
    })
}

fn composite_id(scope: PscScope, psc_service_id: i64, endpoint_id: i64) -> String {
    match scope {
        PscScope::Subscription(subscription_id) => PscEndpointId {
            subscription_id,
            psc_service_id,
            endpoint_id,
        }
        .to_string(),
        PscScope::Region {
            subscription_id,
            region_id,
        } => ActiveActivePscEndpointId {
            subscription_id,
            region_id,
            psc_service_id,
            endpoint_id,
        }
        .to_string(),
    }
}

fn identity(placement: Placement) -> Block {
    let block = Block::new()
        .attr("subscription_id", Attribute::string().required().force_new())
        .attr(SERVICE_ID, Attribute::int().required().force_new());
    match placement {
        Placement::Subscription => block,
        Placement::Region => block.attr("region_id", Attribute::int().required().force_new()),
    }
}

fn service_attachments_state(endpoint: &PscEndpoint) -> Value {
    endpoint
        .service_attachments
        .iter()
        .map(|a| {
            json!({
                "name": a.name,
                "dns_record": a.dns_record,
                "ip_address_name": a.ip_address_name,
                "forwarding_rule_name": a.forwarding_rule_name,
            })
        })
        .collect()
}

struct Target {
    scope: PscScope,
    service: i64,
    endpoint: i64,
}

impl Target {
    fn from_data(data: &ResourceData, placement: Placement) -> Result<Self> {
        Ok(Self {
            scope: scope(data, placement)?,
            service: int_attr(data, SERVICE_ID, "PSC service")?,
            endpoint: int_attr(data, ENDPOINT_ID, "PSC endpoint")?,
        })
    }
}

pub struct PrivateServiceConnectEndpointResource {
    placement: Placement,
}

impl PrivateServiceConnectEndpointResource {
    pub const PRO: Self = Self {
        placement: Placement::Subscription,
    };
    pub const ACTIVE_ACTIVE: Self = Self {
        placement: Placement::Region,
    };

    fn request(data: &ResourceData) -> PscEndpointRequest {
        let field = |name: &str| data.get_string(name).unwrap_or_default();
        PscEndpointRequest {
            gcp_project_id: field("gcp_project_id"),
            gcp_vpc_name: field("gcp_vpc_name"),
            gcp_vpc_subnet_name: field("gcp_vpc_subnet_name"),
            endpoint_connection_name: field("endpoint_connection_name"),
        }
    }

    fn import_id(&self, data: &mut ResourceData) -> Result<()> {
        let (sub, region, service, endpoint) = match self.placement {
            Placement::Subscription => {
                let id: PscEndpointId = data.id().parse()?;
                (id.subscription_id, None, id.psc_service_id, id.endpoint_id)
            }
            Placement::Region => {
                let id: ActiveActivePscEndpointId = data.id().parse()?;
                (id.subscription_id, Some(id.region_id), id.psc_service_id, id.endpoint_id)
            }
        };
        data.set("subscription_id", sub.to_string());
        data.set_opt("region_id", region);
        data.set(SERVICE_ID, service);
        data.set(ENDPOINT_ID, endpoint);
        Ok(())
    }
}

#[async_trait]
impl Resource for PrivateServiceConnectEndpointResource {
    fn type_name(&self) -> &'static str {
        match self.placement {
            Placement::Subscription => "rediscloud_private_service_connect_endpoint",
            Placement::Region => "rediscloud_active_active_private_service_connect_endpoint",
        }
    }

    fn family(&self) -> ResourceFamily {
        ResourceFamily::PrivateServiceConnect
    }

    fn schema(&self) -> Schema {
        let attachment = Block::new()
            .attr("name", Attribute::string().computed())
            .attr("dns_record", Attribute::string().computed())
            .attr("ip_address_name", Attribute::string().computed())
            .attr("forwarding_rule_name", Attribute::string().computed());
        let block = identity(self.placement)
            .attr(ENDPOINT_ID, Attribute::int().computed())
            .attr("gcp_project_id", Attribute::string().required())
            .attr("gcp_vpc_name", Attribute::string().required())
            .attr("gcp_vpc_subnet_name", Attribute::string().required())
            .attr("endpoint_connection_name", Attribute::string().required())
            .attr("status", Attribute::string().computed())
            .attr("service_attachments", Attribute::list_block(attachment).computed())
            .attr("creation_script", Attribute::string().computed())
            .attr("deletion_script", Attribute::string().computed());
        Schema::resource(block, Some(Timeouts::uniform(10)))
    }

    async fn create(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let scope = scope(data, self.placement)?;
        let service = int_attr(data, SERVICE_ID, "PSC service")?;
        let sub = scope.subscription_id();
        let client = state.client();
        let timeout = data.timeout(Operation::Create);
        {
            let _guard = state.lock_subscription(ctx, sub).await?;
            cloud::wait_for_subscription_active(ctx, client, sub, timeout).await?;

            let task = state
                .psc()
                .create_endpoint(scope, service, &Self::request(data))
                .await?;
            let endpoint = cloud::complete_task(ctx, client, task, timeout)
                .await?
                .resource_id()?;
            data.set_id(composite_id(scope, service, endpoint));
            data.set(ENDPOINT_ID, endpoint);
            info!(endpoint = data.id(), "PSC endpoint created");

            cloud::wait_for_psc_endpoint(
                ctx,
                client,
                scope,
                service,
                endpoint,
                psc::CREATE_PENDING,
                psc::CREATE_TARGET,
                timeout,
            )
            .await?;
            cloud::wait_for_subscription_active(ctx, client, sub, timeout).await?;
        }
        self.read(ctx, state, data).await
    }

    async fn read(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let target = Target::from_data(data, self.placement)?;
        let Some(endpoint) = found(
            data,
            self.family(),
            state
                .psc()
                .get_endpoint(ctx, target.scope, target.service, target.endpoint)
                .await,
        )?
        else {
            return Ok(());
        };

        data.set_opt("gcp_project_id", endpoint.gcp_project_id.clone());
        data.set_opt("gcp_vpc_name", endpoint.gcp_vpc_name.clone());
        data.set_opt("gcp_vpc_subnet_name", endpoint.gcp_vpc_subnet_name.clone());
        data.set_opt("endpoint_connection_name", endpoint.endpoint_connection_name.clone());
        data.set_opt("status", endpoint.status.clone());
        data.set("service_attachments", service_attachments_state(&endpoint));

        let scripts = state
            .psc()
            .creation_scripts(ctx, target.scope, target.service, target.endpoint)
            .await?;
        if let Some(gcloud) = scripts.gcloud {
            data.set_opt("creation_script", gcloud.create_command);
            data.set_opt("deletion_script", gcloud.delete_command);
        }
        Ok(())
    }

    async fn update(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let target = Target::from_data(data, self.placement)?;
        let sub = target.scope.subscription_id();
        let client = state.client();
        let timeout = data.timeout(Operation::Update);
        {
            let _guard = state.lock_subscription(ctx, sub).await?;
            cloud::wait_for_subscription_active(ctx, client, sub, timeout).await?;
            let task = state
                .psc()
                .update_endpoint(target.scope, target.service, target.endpoint, &Self::request(data))
                .await?;
            cloud::complete_task(ctx, client, task, timeout).await?;
            cloud::wait_for_psc_endpoint(
                ctx,
                client,
                target.scope,
                target.service,
                target.endpoint,
                psc::CREATE_PENDING,
                psc::CREATE_TARGET,
                timeout,
            )
            .await?;
        }
        self.read(ctx, state, data).await
    }

    async fn delete(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let target = Target::from_data(data, self.placement)?;
        let sub = target.scope.subscription_id();
        let client = state.client();
        let timeout = data.timeout(Operation::Delete);

        let _guard = state.lock_subscription(ctx, sub).await?;
        cloud::wait_for_subscription_active(ctx, client, sub, timeout).await?;
        let task = state
            .psc()
            .delete_endpoint(target.scope, target.service, target.endpoint)
            .await?;
        cloud::complete_task(ctx, client, task, timeout).await?;
        cloud::wait_for_psc_endpoint_gone(ctx, client, target.scope, target.service, target.endpoint, timeout)
            .await?;
        cloud::wait_for_subscription_active(ctx, client, sub, timeout).await?;
        Ok(())
    }

    async fn import(&self, _ctx: &OperationContext, _state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        self.import_id(data)
    }
}

pub struct PrivateServiceConnectAccepterResource {
    placement: Placement,
}

impl PrivateServiceConnectAccepterResource {
    pub const PRO: Self = Self {
        placement: Placement::Subscription,
    };
    pub const ACTIVE_ACTIVE: Self = Self {
        placement: Placement::Region,
    };

    /// Drive the endpoint to the state the configured action leads to.
    /// An endpoint already there is left alone.
    async fn apply(
        &self,
        ctx: &OperationContext,
        state: &ProviderState,
        data: &mut ResourceData,
        op: Operation,
    ) -> Result<()> {
        let target = Target::from_data(data, self.placement)?;
        let action = data.get_string("action").unwrap_or_else(|| ACTION_ACCEPT.to_string());
        let (pending, done) = if action == ACTION_REJECT {
            (psc::REJECT_PENDING_STATES, psc::REJECTED)
        } else {
            (psc::ACCEPT_PENDING_STATES, psc::ACTIVE)
        };
        let client = state.client();
        let timeout = data.timeout(op);

        {
            // Held until the endpoint settles
            let _guard = state.lock_subscription(ctx, target.scope.subscription_id()).await?;
            let current = state
                .psc()
                .get_endpoint(ctx, target.scope, target.service, target.endpoint)
                .await?;
            if current.status() != done {
                let task = state
                    .psc()
                    .set_endpoint_action(target.scope, target.service, target.endpoint, &action)
                    .await?;
                cloud::complete_task(ctx, client, task, timeout).await?;
                cloud::wait_for_psc_endpoint(
                    ctx,
                    client,
                    target.scope,
                    target.service,
                    target.endpoint,
                    pending,
                    &[done],
                    timeout,
                )
                .await?;
                info!(endpoint = target.endpoint, action = %action, "PSC endpoint decision applied");
            }
        }

        data.set_id(composite_id(target.scope, target.service, target.endpoint));
        self.read(ctx, state, data).await
    }
}

#[async_trait]
impl Resource for PrivateServiceConnectAccepterResource {
    fn type_name(&self) -> &'static str {
        match self.placement {
            Placement::Subscription => "rediscloud_private_service_connect_endpoint_accepter",
            Placement::Region => "rediscloud_active_active_private_service_connect_endpoint_accepter",
        }
    }

    fn family(&self) -> ResourceFamily {
        ResourceFamily::PrivateServiceConnect
    }

    fn schema(&self) -> Schema {
        let block = identity(self.placement)
            .attr(ENDPOINT_ID, Attribute::int().required().force_new())
            .attr("action", Attribute::string().required().validate(Validation::OneOf(ACTIONS)))
            .attr("status", Attribute::string().computed());
        Schema::resource(block, Some(Timeouts::uniform(10)))
    }

    async fn create(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        self.apply(ctx, state, data, Operation::Create).await
    }

    async fn read(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let target = Target::from_data(data, self.placement)?;
        let Some(endpoint) = found(
            data,
            self.family(),
            state
                .psc()
                .get_endpoint(ctx, target.scope, target.service, target.endpoint)
                .await,
        )?
        else {
            return Ok(());
        };
        data.set_opt("status", endpoint.status);
        Ok(())
    }

    async fn update(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        self.apply(ctx, state, data, Operation::Update).await
    }

    // The endpoint goes away when the consumer removes its GCP side
    async fn delete(&self, _ctx: &OperationContext, _state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        info!(endpoint = data.id(), "Removing PSC accepter from state only");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_import_active_active_endpoint() {
        let resource = PrivateServiceConnectEndpointResource::ACTIVE_ACTIVE;
        let mut data = ResourceData::for_import("10/2/30/40");
        resource.import_id(&mut data).unwrap();
        assert_eq!(data.get_str("subscription_id"), Some("10"));
        assert_eq!(data.get_i64("region_id"), Some(2));
        assert_eq!(data.get_i64(SERVICE_ID), Some(30));
        assert_eq!(data.get_i64(ENDPOINT_ID), Some(40));

        let target = Target::from_data(&data, Placement::Region).unwrap();
        assert_eq!(composite_id(target.scope, target.service, target.endpoint), "10/2/30/40");
    }

    #[test]
    fn test_pro_import_rejects_region_form() {
        let resource = PrivateServiceConnectEndpointResource::PRO;
        let mut data = ResourceData::for_import("10/2/30/40");
        assert!(resource.import_id(&mut data).is_err());
    }

    #[test]
    fn test_accepter_action_is_validated() {
        let schema = PrivateServiceConnectAccepterResource::PRO.schema();
        let mut config = json!({
            "subscription_id": "10",
            SERVICE_ID: 30,
            ENDPOINT_ID: 40,
            "action": "maybe"
        });
        let mut diags = crate::host::Diagnostics::new();
        schema.block.validate_config("", &config, &mut diags);
        assert!(diags.has_errors());

        config["action"] = json!("reject");
        let mut diags = crate::host::Diagnostics::new();
        schema.block.validate_config("", &config, &mut diags);
        assert!(!diags.has_errors());
    }
}
