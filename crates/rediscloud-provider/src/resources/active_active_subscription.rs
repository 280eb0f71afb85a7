//! `rediscloud_active_active_subscription`
//!
//! Same lifecycle as the Pro subscription, but the creation plan lists the
//! participating regions with a local throughput each, and the cloud
//! provider is a single string.

use async_trait::async_trait;
use rediscloud_core::api::Module;
use rediscloud_core::api::cloud_accounts::INTERNAL_CLOUD_ACCOUNT_ID;
use rediscloud_core::api::subscriptions::{
    CloudProviderRequest, CreationPlanDatabase, DEPLOYMENT_ACTIVE_ACTIVE, LocalThroughput,
    NetworkingRequest, RegionRequest, SubscriptionCreateRequest,
};
use rediscloud_core::{OperationContext, ResourceFamily, cloud};
use serde_json::{Value, json};
use tracing::info;

use super::common::{found, own_id};
use super::subscription::{
    apply_maintenance, apply_settings, delete_subscription, maintenance_block, payment_attributes,
    payment_method_id, pricing_block, read_extras, set_common_fields,
};
use crate::error::Result;
use crate::host::walk;
use crate::host::{
    AttrType, Attribute, Block, Diagnostics, Operation, Resource, ResourceData, ResourceDiff,
    Schema, Timeouts, Validation, import_passthrough,
};
use crate::state::ProviderState;
use crate::validate::{
    check_cidr_overlap, check_memory_or_dataset, check_payment_method, check_unique_region_names,
    require_creation_plan, suppress_after_create,
};

pub const TYPE_NAME: &str = "rediscloud_active_active_subscription";

const PROVIDERS: &[&str] = &["AWS", "GCP"];
const CREATION_PLAN_DATABASE: &str = "creation-plan-db";

pub struct ActiveActiveSubscriptionResource;

fn creation_plan_block() -> Attribute {
    let region = Block::new()
        .attr("region", Attribute::string().required())
        .attr(
            "networking_deployment_cidr",
            Attribute::string().required().validate(Validation::Cidr),
        )
        .attr("write_operations_per_second", Attribute::int().required())
        .attr("read_operations_per_second", Attribute::int().required());
    Attribute::list_block(
        Block::new()
            .attr("memory_limit_in_gb", Attribute::float().optional())
            .attr("dataset_size_in_gb", Attribute::float().optional())
            .attr(
                "quantity",
                Attribute::int().required().validate(Validation::IntAtLeast(1)),
            )
            .attr("modules", Attribute::set(AttrType::String).optional())
            .attr("region", Attribute::set_block(region).required().min_items(1)),
    )
    .optional()
    .max_items(1)
    .suppress(suppress_after_create)
}

fn create_request(data: &ResourceData) -> Result<SubscriptionCreateRequest> {
    let plan = ResourceData::new(data.get_block("creation_plan").cloned().unwrap_or_default());
    let regions: Vec<ResourceData> = plan.get_list("region").into_iter().map(ResourceData::new).collect();

    let database = CreationPlanDatabase {
        name: CREATION_PLAN_DATABASE.to_string(),
        protocol: "redis".to_string(),
        memory_limit_in_gb: plan.get_f64("memory_limit_in_gb"),
        dataset_size_in_gb: plan.get_f64("dataset_size_in_gb"),
        local_throughput_measurement: regions
            .iter()
            .map(|r| LocalThroughput {
                region: r.get_string("region").unwrap_or_default(),
                write_operations_per_second: r.get_i64("write_operations_per_second").unwrap_or_default(),
                read_operations_per_second: r.get_i64("read_operations_per_second").unwrap_or_default(),
            })
            .collect(),
        modules: plan
            .get_strings("modules")
            .into_iter()
            .map(|name| Module { name, parameters: None })
            .collect(),
        quantity: plan.get_i64("quantity").unwrap_or(1),
        ..Default::default()
    };

    Ok(SubscriptionCreateRequest {
        name: data.get_string("name").unwrap_or_default(),
        dry_run: Some(false),
        deployment_type: DEPLOYMENT_ACTIVE_ACTIVE.to_string(),
        payment_method: data.get_string("payment_method"),
        payment_method_id: payment_method_id(data)?,
        memory_storage: Some("ram".to_string()),
        redis_version: data.get_string("redis_version"),
        public_endpoint_access: data.get_bool("public_endpoint_access"),
        cloud_providers: vec![CloudProviderRequest {
            provider: data.get_string("cloud_provider").unwrap_or_else(|| "AWS".to_string()),
            cloud_account_id: INTERNAL_CLOUD_ACCOUNT_ID,
            regions: regions
                .iter()
                .map(|r| RegionRequest {
                    region: r.get_string("region").unwrap_or_default(),
                    networking: NetworkingRequest {
                        deployment_cidr: r.get_string("networking_deployment_cidr"),
                        vpc_id: None,
                    },
                    ..Default::default()
                })
                .collect(),
        }],
        databases: vec![database],
    })
}

#[async_trait]
impl Resource for ActiveActiveSubscriptionResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn family(&self) -> ResourceFamily {
        ResourceFamily::Subscription
    }

    fn schema(&self) -> Schema {
        let block = payment_attributes(Block::new())
            .attr("name", Attribute::string().required())
            .attr(
                "cloud_provider",
                Attribute::string()
                    .default("AWS")
                    .force_new()
                    .validate(Validation::OneOf(PROVIDERS)),
            )
            .attr("redis_version", Attribute::string().optional().computed().force_new())
            .attr("public_endpoint_access", Attribute::bool().default(true))
            .attr("creation_plan", creation_plan_block())
            .attr("maintenance_windows", maintenance_block())
            .attr("status", Attribute::string().computed())
            .attr("pricing", pricing_block());
        Schema::resource(block, Some(Timeouts::minutes(30, 10, 30, 10)))
            .with_description("A subscription whose databases replicate across regions")
    }

    fn validate(&self, config: &Value) -> Diagnostics {
        let mut diags = check_payment_method(config);
        if walk::is_set(config, "creation_plan.0") {
            diags.extend(check_memory_or_dataset(config, "creation_plan.0"));
            diags.extend(check_cidr_overlap(config, "creation_plan.0.region", "networking_deployment_cidr"));
            diags.extend(check_unique_region_names(config, "creation_plan.0.region", "region"));
        }
        diags
    }

    fn customize_diff(&self, diff: &mut ResourceDiff<'_>) -> Result<()> {
        require_creation_plan(diff)
    }

    async fn create(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let request = create_request(data)?;
        let client = state.client();
        let timeout = data.timeout(Operation::Create);

        let task = state.subscriptions().create(&request).await?;
        let id = cloud::complete_task(ctx, client, task, timeout)
            .await?
            .resource_id()?;
        data.set_id(id.to_string());
        info!(
            subscription_id = id,
            regions = request.cloud_providers[0].regions.len(),
            "Active-Active subscription created"
        );

        {
            let _guard = state.lock_subscription(ctx, id).await?;
            cloud::remove_creation_plan_databases(ctx, client, id, timeout).await?;
            apply_maintenance(ctx, state, data, id, timeout).await?;
            cloud::wait_for_subscription_active(ctx, client, id, timeout).await?;
        }

        self.read(ctx, state, data).await
    }

    async fn read(&self, _ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let id = own_id(data, "Subscription")?;
        let Some(sub) = found(data, self.family(), state.subscriptions().get(id).await)? else {
            return Ok(());
        };

        set_common_fields(data, &sub);
        if let Some(provider) = sub.primary_cloud().and_then(|c| c.provider.clone()) {
            data.set("cloud_provider", provider);
        }
        read_extras(state, data, id).await
    }

    async fn update(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let id = own_id(data, "Subscription")?;
        let timeout = data.timeout(Operation::Update);
        {
            let _guard = state.lock_subscription(ctx, id).await?;
            cloud::wait_for_subscription_active(ctx, state.client(), id, timeout).await?;
            apply_settings(ctx, state, data, id, timeout).await?;
            apply_maintenance(ctx, state, data, id, timeout).await?;
        }
        self.read(ctx, state, data).await
    }

    async fn delete(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let id = own_id(data, "Subscription")?;
        delete_subscription(ctx, state, id, data.timeout(Operation::Delete)).await
    }

    async fn import(&self, _ctx: &OperationContext, _state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        import_passthrough(data)
    }
}
