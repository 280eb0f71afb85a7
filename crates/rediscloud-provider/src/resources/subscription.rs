//! `rediscloud_subscription`: a Pro (flexible) subscription
//!
//! The first apply carries a `creation_plan` describing the databases the
//! subscription is sized for. The server provisions those databases to
//! build out the regional infrastructure; once the subscription is active
//! they are deleted again, leaving an empty subscription for
//! `rediscloud_subscription_database` resources to fill.

use std::time::Duration;

use async_trait::async_trait;
use rediscloud_core::api::maintenance::{MaintenanceWindow, MaintenanceWindows};
use rediscloud_core::api::subscriptions::{
    CidrAllowlist, CloudProviderRequest, CreationPlanDatabase, DEPLOYMENT_SINGLE_REGION,
    NetworkingRequest, RegionRequest, SubscriptionCreateRequest, SubscriptionUpdateRequest,
};
use rediscloud_core::api::{Module, Subscription};
use rediscloud_core::api::cloud_accounts::INTERNAL_CLOUD_ACCOUNT_ID;
use rediscloud_core::{OperationContext, ResourceFamily, cloud};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::common::{THROUGHPUT_BY, cidr_set, found, own_id, strings_like, throughput};
use crate::error::{ProviderError, Result};
use crate::host::walk;
use crate::host::{
    AttrType, Attribute, Block, Diagnostics, Operation, Resource, ResourceData, ResourceDiff,
    Schema, Timeouts, Validation, import_passthrough,
};
use crate::state::ProviderState;
use crate::validate::subscription::{PAYMENT_CREDIT_CARD, PAYMENT_MARKETPLACE};
use crate::validate::{
    check_allowlist_account, check_cidr_overlap, check_gcp_account, check_memory_or_dataset,
    check_payment_method, check_query_performance_factor, check_unique_region_names,
    require_creation_plan, suppress_after_create,
};

pub const TYPE_NAME: &str = "rediscloud_subscription";

const PROVIDERS: &[&str] = &["AWS", "GCP"];
const MEMORY_STORAGE: &[&str] = &["ram", "ram-and-flash"];
const MAINTENANCE_MODES: &[&str] = &["automatic", "manual"];

/// Name given to the throwaway databases of a creation plan
const CREATION_PLAN_DATABASE: &str = "creation-plan-db";

pub struct SubscriptionResource;

// Schema pieces shared with the Active-Active subscription

pub(super) fn payment_attributes(block: Block) -> Block {
    block
        .attr(
            "payment_method",
            Attribute::string()
                .default(PAYMENT_CREDIT_CARD)
                .validate(Validation::OneOf(&[PAYMENT_CREDIT_CARD, PAYMENT_MARKETPLACE]))
                .suppress(suppress_after_create)
                .description("credit-card or marketplace; only read on create"),
        )
        .attr(
            "payment_method_id",
            Attribute::string()
                .optional()
                .computed()
                .validate(Validation::Pattern(r"^\d+$", "payment_method_id must be numeric")),
        )
}

pub(super) fn maintenance_block() -> Attribute {
    Attribute::list_block(
        Block::new()
            .attr(
                "mode",
                Attribute::string()
                    .required()
                    .validate(Validation::OneOf(MAINTENANCE_MODES)),
            )
            .attr(
                "window",
                Attribute::list_block(
                    Block::new()
                        .attr(
                            "start_hour",
                            Attribute::int().required().validate(Validation::IntBetween(0, 23)),
                        )
                        .attr(
                            "duration_in_hours",
                            Attribute::int().required().validate(Validation::IntBetween(4, 24)),
                        )
                        .attr("days", Attribute::list(AttrType::String).required().min_items(1)),
                )
                .optional(),
            ),
    )
    .optional()
    .computed()
    .max_items(1)
}

pub(super) fn pricing_block() -> Attribute {
    Attribute::list_block(
        Block::new()
            .attr("database_name", Attribute::string().computed())
            .attr("type", Attribute::string().computed())
            .attr("type_details", Attribute::string().computed())
            .attr("quantity", Attribute::int().computed())
            .attr("quantity_measurement", Attribute::string().computed())
            .attr("price_per_unit", Attribute::float().computed())
            .attr("price_currency", Attribute::string().computed())
            .attr("price_period", Attribute::string().computed())
            .attr("region", Attribute::string().computed()),
    )
    .computed()
}

fn cloud_provider_block() -> Attribute {
    let region = Block::new()
        .attr("region", Attribute::string().required())
        .attr("multiple_availability_zones", Attribute::bool().default(false))
        .attr(
            "preferred_availability_zones",
            Attribute::list(AttrType::String).optional().computed(),
        )
        .attr(
            "networking_deployment_cidr",
            Attribute::string().required().validate(Validation::Cidr),
        )
        .attr("networking_vpc_id", Attribute::string().optional().computed())
        .attr("networking_subnet_id", Attribute::string().computed());
    Attribute::list_block(
        Block::new()
            .attr(
                "provider",
                Attribute::string().default("AWS").validate(Validation::OneOf(PROVIDERS)),
            )
            .attr(
                "cloud_account_id",
                Attribute::string()
                    .default(INTERNAL_CLOUD_ACCOUNT_ID.to_string())
                    .validate(Validation::Pattern(r"^\d+$", "cloud_account_id must be numeric")),
            )
            .attr("region", Attribute::set_block(region).required().min_items(1)),
    )
    .required()
    .max_items(1)
    .force_new()
}

fn creation_plan_block() -> Attribute {
    Attribute::list_block(
        Block::new()
            .attr("memory_limit_in_gb", Attribute::float().optional())
            .attr("dataset_size_in_gb", Attribute::float().optional())
            .attr("average_item_size_in_bytes", Attribute::int().optional())
            .attr(
                "throughput_measurement_by",
                Attribute::string().required().validate(Validation::OneOf(THROUGHPUT_BY)),
            )
            .attr("throughput_measurement_value", Attribute::int().required())
            .attr(
                "quantity",
                Attribute::int().required().validate(Validation::IntAtLeast(1)),
            )
            .attr("support_oss_cluster_api", Attribute::bool().default(false))
            .attr("replication", Attribute::bool().required())
            .attr("modules", Attribute::set(AttrType::String).optional())
            .attr("query_performance_factor", Attribute::string().optional()),
    )
    .optional()
    .max_items(1)
    .suppress(suppress_after_create)
}

fn allowlist_block() -> Attribute {
    Attribute::list_block(
        Block::new()
            .attr("cidrs", cidr_set().optional())
            .attr("security_group_ids", Attribute::set(AttrType::String).optional()),
    )
    .optional()
    .max_items(1)
}

// Config to request

pub(super) fn payment_method_id(data: &ResourceData) -> Result<Option<i64>> {
    data.get_string("payment_method_id")
        .map(|raw| {
            raw.parse::<i64>().map_err(|_| {
                ProviderError::validation_at("payment_method_id", format!("'{}' is not a payment method ID", raw))
            })
        })
        .transpose()
}

fn creation_plan_databases(data: &ResourceData) -> Vec<CreationPlanDatabase> {
    let Some(plan) = data.get_block("creation_plan") else {
        return Vec::new();
    };
    let plan = ResourceData::new(plan.clone());
    let modules: Vec<Module> = plan
        .get_strings("modules")
        .into_iter()
        .map(|name| Module {
            name,
            parameters: None,
        })
        .collect();
    vec![CreationPlanDatabase {
        name: CREATION_PLAN_DATABASE.to_string(),
        protocol: "redis".to_string(),
        memory_limit_in_gb: plan.get_f64("memory_limit_in_gb"),
        dataset_size_in_gb: plan.get_f64("dataset_size_in_gb"),
        support_oss_cluster_api: plan.get_bool("support_oss_cluster_api"),
        replication: plan.get_bool("replication"),
        throughput_measurement: throughput(&plan, ""),
        local_throughput_measurement: Vec::new(),
        modules,
        quantity: plan.get_i64("quantity").unwrap_or(1),
        average_item_size_in_bytes: plan.get_i64("average_item_size_in_bytes"),
        query_performance_factor: plan.get_string("query_performance_factor"),
    }]
}

fn create_request(data: &ResourceData) -> Result<SubscriptionCreateRequest> {
    let provider = ResourceData::new(data.get_block("cloud_provider").cloned().unwrap_or_default());
    let cloud_account_id = provider
        .get_i64("cloud_account_id")
        .unwrap_or(INTERNAL_CLOUD_ACCOUNT_ID);
    let regions = provider
        .get_list("region")
        .into_iter()
        .map(|region| {
            let region = ResourceData::new(region);
            RegionRequest {
                region: region.get_string("region").unwrap_or_default(),
                multiple_availability_zones: region.get_bool("multiple_availability_zones"),
                preferred_availability_zones: region.get_strings("preferred_availability_zones"),
                networking: NetworkingRequest {
                    deployment_cidr: region.get_string("networking_deployment_cidr"),
                    vpc_id: region.get_string("networking_vpc_id"),
                },
            }
        })
        .collect();

    Ok(SubscriptionCreateRequest {
        name: data.get_string("name").unwrap_or_default(),
        dry_run: Some(false),
        deployment_type: DEPLOYMENT_SINGLE_REGION.to_string(),
        payment_method: data.get_string("payment_method"),
        payment_method_id: payment_method_id(data)?,
        memory_storage: data.get_string("memory_storage"),
        redis_version: data.get_string("redis_version"),
        public_endpoint_access: data.get_bool("public_endpoint_access"),
        cloud_providers: vec![CloudProviderRequest {
            provider: provider.get_string("provider").unwrap_or_else(|| "AWS".to_string()),
            cloud_account_id,
            regions,
        }],
        databases: creation_plan_databases(data),
    })
}

fn maintenance_request(block: &Value) -> MaintenanceWindows {
    let block = ResourceData::new(block.clone());
    MaintenanceWindows {
        mode: block.get_string("mode").unwrap_or_else(|| "automatic".to_string()),
        windows: block
            .get_list("window")
            .into_iter()
            .map(|w| {
                let w = ResourceData::new(w);
                MaintenanceWindow {
                    start_hour: w.get_i64("start_hour").unwrap_or_default(),
                    duration_in_hours: w.get_i64("duration_in_hours").unwrap_or_default(),
                    days: w.get_strings("days"),
                }
            })
            .collect(),
    }
}

// Post-create and update steps shared with the Active-Active subscription

/// Push `maintenance_windows` when set (on create) or changed (on update)
pub(super) async fn apply_maintenance(
    ctx: &OperationContext,
    state: &ProviderState,
    data: &ResourceData,
    id: i64,
    timeout: Duration,
) -> Result<()> {
    let Some(block) = data.get_block("maintenance_windows") else {
        return Ok(());
    };
    if data.raw_state().is_some() && !data.has_change("maintenance_windows") {
        return Ok(());
    }
    let windows = maintenance_request(block);
    debug!(subscription_id = id, mode = %windows.mode, "Updating maintenance windows");
    let task = state.maintenance().update(id, &windows).await?;
    cloud::complete_task(ctx, state.client(), task, timeout).await?;
    cloud::wait_for_subscription_active(ctx, state.client(), id, timeout).await?;
    Ok(())
}

/// Name, payment method and endpoint access are the only in-place changes
pub(super) async fn apply_settings(
    ctx: &OperationContext,
    state: &ProviderState,
    data: &ResourceData,
    id: i64,
    timeout: Duration,
) -> Result<()> {
    let mut request = SubscriptionUpdateRequest::default();
    if data.has_change("name") {
        request.name = data.get_string("name");
    }
    if data.has_change("payment_method_id") {
        request.payment_method_id = payment_method_id(data)?;
    }
    if data.has_change("public_endpoint_access") {
        request.public_endpoint_access = data.get_bool("public_endpoint_access");
    }
    if request.name.is_none()
        && request.payment_method_id.is_none()
        && request.public_endpoint_access.is_none()
    {
        return Ok(());
    }
    let task = state.subscriptions().update(id, &request).await?;
    cloud::complete_task(ctx, state.client(), task, timeout).await?;
    cloud::wait_for_subscription_active(ctx, state.client(), id, timeout).await?;
    Ok(())
}

async fn apply_allowlist(
    ctx: &OperationContext,
    state: &ProviderState,
    data: &ResourceData,
    id: i64,
    timeout: Duration,
) -> Result<()> {
    let created = data.raw_state().is_none();
    if (created && data.get_block("allowlist").is_none()) || !data.has_change("allowlist") {
        return Ok(());
    }
    let block = ResourceData::new(data.get_block("allowlist").cloned().unwrap_or_default());
    let allowlist = CidrAllowlist {
        cidr_ips: block.get_strings("cidrs"),
        security_group_ids: block.get_strings("security_group_ids"),
    };
    let task = state.subscriptions().update_cidr_allowlist(id, &allowlist).await?;
    cloud::complete_task(ctx, state.client(), task, timeout).await?;
    cloud::wait_for_subscription_active(ctx, state.client(), id, timeout).await?;
    Ok(())
}

pub(super) async fn delete_subscription(
    ctx: &OperationContext,
    state: &ProviderState,
    id: i64,
    timeout: Duration,
) -> Result<()> {
    let client = state.client();
    let _guard = state.lock_subscription(ctx, id).await?;
    cloud::wait_for_subscription_active(ctx, client, id, timeout).await?;
    let task = state.subscriptions().delete(id).await?;
    cloud::complete_task(ctx, client, task, timeout).await?;
    cloud::wait_for_subscription_deleted(ctx, client, id, timeout).await?;
    info!(subscription_id = id, "Subscription deleted");
    Ok(())
}

// API to state

pub(super) fn set_common_fields(data: &mut ResourceData, sub: &Subscription) {
    data.set_opt("name", sub.name.clone());
    data.set_opt("status", sub.status.clone());
    data.set_opt("payment_method_id", sub.payment_method_id.map(|id| id.to_string()));
    data.set_opt("memory_storage", sub.memory_storage.clone());
    if let Some(version) = &sub.redis_version {
        data.set("redis_version", version.clone());
    }
    if let Some(access) = sub.public_endpoint_access {
        data.set("public_endpoint_access", access);
    }
}

pub(super) async fn read_extras(state: &ProviderState, data: &mut ResourceData, id: i64) -> Result<()> {
    let windows = state.maintenance().get(id).await?;
    data.set(
        "maintenance_windows",
        json!([{
            "mode": windows.mode,
            "window": windows.windows.iter().map(|w| json!({
                "start_hour": w.start_hour,
                "duration_in_hours": w.duration_in_hours,
                "days": w.days,
            })).collect::<Vec<_>>(),
        }]),
    );

    let pricing: Vec<Value> = state
        .pricing()
        .list(id)
        .await?
        .into_iter()
        .map(|p| {
            json!({
                "database_name": p.database_name,
                "type": p.kind,
                "type_details": p.type_details,
                "quantity": p.quantity,
                "quantity_measurement": p.quantity_measurement,
                "price_per_unit": p.price_per_unit,
                "price_currency": p.price_currency,
                "price_period": p.price_period,
                "region": p.region,
            })
        })
        .collect();
    data.set("pricing", pricing);
    Ok(())
}

fn cloud_provider_state(data: &ResourceData, sub: &Subscription) -> Value {
    let Some(cloud) = sub.primary_cloud() else {
        return data.get("cloud_provider").cloned().unwrap_or(Value::Null);
    };
    let current = data.get("cloud_provider.0.region");
    let regions = cloud
        .regions
        .iter()
        .map(|r| {
            let networking = r.networking.first();
            let current_zones = current
                .and_then(|list| {
                    walk::find_by_key(list, "region", r.region.as_deref().unwrap_or_default())
                })
                .map(|c| ResourceData::new(c.clone()).get_strings("preferred_availability_zones"))
                .unwrap_or_default();
            json!({
                "region": r.region,
                "multiple_availability_zones": r.multiple_availability_zones.unwrap_or(false),
                "preferred_availability_zones": strings_like(&current_zones, r.preferred_availability_zones.clone()),
                "networking_deployment_cidr": networking.and_then(|n| n.deployment_cidr.clone()),
                "networking_vpc_id": networking.and_then(|n| n.vpc_id.clone()),
                "networking_subnet_id": networking.and_then(|n| n.subnet_id.clone()),
            })
        })
        .collect();
    let regions = super::common::ordered_like(current, regions, "region");
    json!([{
        "provider": cloud.provider.clone().unwrap_or_else(|| "AWS".to_string()),
        "cloud_account_id": cloud.cloud_account_id.unwrap_or(INTERNAL_CLOUD_ACCOUNT_ID).to_string(),
        "region": regions,
    }])
}

#[async_trait]
impl Resource for SubscriptionResource {
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
                "memory_storage",
                Attribute::string()
                    .default("ram")
                    .force_new()
                    .validate(Validation::OneOf(MEMORY_STORAGE)),
            )
            .attr("redis_version", Attribute::string().optional().computed().force_new())
            .attr("public_endpoint_access", Attribute::bool().default(true))
            .attr("cloud_provider", cloud_provider_block())
            .attr("creation_plan", creation_plan_block())
            .attr("allowlist", allowlist_block())
            .attr("maintenance_windows", maintenance_block())
            .attr("status", Attribute::string().computed())
            .attr("pricing", pricing_block());
        Schema::resource(block, Some(Timeouts::minutes(30, 10, 30, 10)))
            .with_description("A Pro subscription in a single region of one cloud provider")
    }

    fn validate(&self, config: &Value) -> Diagnostics {
        let mut diags = check_payment_method(config);
        diags.extend(check_gcp_account(config, "cloud_provider.0"));
        diags.extend(check_allowlist_account(config, "cloud_provider.0"));
        diags.extend(check_cidr_overlap(config, "cloud_provider.0.region", "networking_deployment_cidr"));
        diags.extend(check_unique_region_names(config, "cloud_provider.0.region", "region"));
        if walk::is_set(config, "creation_plan.0") {
            diags.extend(check_memory_or_dataset(config, "creation_plan.0"));
            diags.extend(check_query_performance_factor(config, "creation_plan.0"));
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
        info!(subscription_id = id, name = %request.name, "Subscription created");

        {
            let _guard = state.lock_subscription(ctx, id).await?;
            cloud::remove_creation_plan_databases(ctx, client, id, timeout).await?;
            apply_maintenance(ctx, state, data, id, timeout).await?;
            apply_allowlist(ctx, state, data, id, timeout).await?;
            cloud::wait_for_subscription_active(ctx, client, id, timeout).await?;
        }

        self.read(ctx, state, data).await
    }

    async fn read(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let id = own_id(data, "Subscription")?;
        let Some(sub) = found(data, self.family(), state.subscriptions().get(id).await)? else {
            return Ok(());
        };

        set_common_fields(data, &sub);
        let cloud_provider = cloud_provider_state(data, &sub);
        data.set("cloud_provider", cloud_provider);

        // Only tracked once the user manages it; the internal account has none
        let account = data.get_i64("cloud_provider.0.cloud_account_id");
        if data.get_block("allowlist").is_some() && account != Some(INTERNAL_CLOUD_ACCOUNT_ID) {
            let allowlist = state.subscriptions().get_cidr_allowlist(ctx, id).await?;
            data.set(
                "allowlist",
                json!([{
                    "cidrs": allowlist.cidr_ips,
                    "security_group_ids": allowlist.security_group_ids,
                }]),
            );
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
            apply_allowlist(ctx, state, data, id, timeout).await?;
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

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn config() -> Value {
        json!({
            "name": "prod",
            "payment_method_id": "4242",
            "cloud_provider": [{
                "provider": "AWS",
                "cloud_account_id": "1",
                "region": [{"region": "us-east-1", "networking_deployment_cidr": "10.0.0.0/24"}]
            }],
            "creation_plan": [{
                "memory_limit_in_gb": 1,
                "quantity": 1,
                "replication": true,
                "throughput_measurement_by": "operations-per-second",
                "throughput_measurement_value": 1000,
                "modules": ["RediSearch"]
            }]
        })
    }

    #[test]
    fn test_create_request_from_plan() {
        let schema = SubscriptionResource.schema();
        let planned = ResourceDiff::new(&schema, None, config()).into_planned();
        let request = create_request(&ResourceData::new(planned)).unwrap();

        assert_eq!(request.deployment_type, "single-region");
        assert_eq!(request.payment_method_id, Some(4242));
        assert_eq!(request.memory_storage.as_deref(), Some("ram"));
        assert_eq!(request.cloud_providers[0].cloud_account_id, 1);
        assert_eq!(request.cloud_providers[0].regions[0].networking.deployment_cidr.as_deref(), Some("10.0.0.0/24"));
        let db = &request.databases[0];
        assert_eq!(db.quantity, 1);
        assert_eq!(db.memory_limit_in_gb, Some(1.0));
        assert_eq!(db.throughput_measurement.as_ref().map(|t| t.value), Some(1000));
        assert_eq!(db.modules[0].name, "RediSearch");
    }

    #[test]
    fn test_creation_plan_required_only_on_create() {
        let schema = SubscriptionResource.schema();
        let mut config = config();
        config.as_object_mut().unwrap().remove("creation_plan");

        let mut diff = ResourceDiff::new(&schema, None, config.clone());
        assert!(SubscriptionResource.customize_diff(&mut diff).is_err());

        let prior = json!({"id": "12", "name": "prod"});
        let mut diff = ResourceDiff::new(&schema, Some(prior), config);
        assert!(SubscriptionResource.customize_diff(&mut diff).is_ok());
    }

    #[test]
    fn test_gcp_needs_internal_account() {
        let mut config = config();
        config["cloud_provider"][0]["provider"] = json!("GCP");
        config["cloud_provider"][0]["cloud_account_id"] = json!("77");
        let diags = SubscriptionResource.validate(&config);
        assert!(diags.has_errors());
    }
}
