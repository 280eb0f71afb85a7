//! Subscription lookups: Pro, Active-Active and Essentials

use async_trait::async_trait;
use rediscloud_core::OperationContext;
use rediscloud_core::api::Subscription;
use serde_json::{Value, json};

use super::{exactly_one, matches_str};
use crate::error::Result;
use crate::host::{AttrType, Attribute, Block, DataSource, ResourceData, Schema};
use crate::state::ProviderState;

fn cloud_provider_state(sub: &Subscription) -> Value {
    sub.cloud_details
        .iter()
        .map(|cloud| {
            json!({
                "provider": cloud.provider,
                "cloud_account_id": cloud.cloud_account_id.map(|id| id.to_string()),
                "region": cloud.regions.iter().map(|region| {
                    let networking = region.networking.first();
                    json!({
                        "region": region.region,
                        "multiple_availability_zones": region.multiple_availability_zones,
                        "preferred_availability_zones": region.preferred_availability_zones,
                        "networking_deployment_cidr": networking.and_then(|n| n.deployment_cidr.clone()),
                        "networking_vpc_id": networking.and_then(|n| n.vpc_id.clone()),
                        "networking_subnet_ids": region.networking.iter().filter_map(|n| n.subnet_id.clone()).collect::<Vec<_>>(),
                    })
                }).collect::<Vec<_>>(),
            })
        })
        .collect()
}

fn set_common(data: &mut ResourceData, sub: &Subscription) {
    data.set_id(sub.id.to_string());
    data.set_opt("name", sub.name.clone());
    data.set_opt("status", sub.status.clone());
    data.set_opt("payment_method_id", sub.payment_method_id.map(|id| id.to_string()));
    data.set_opt("payment_method", sub.payment_method_type.clone());
    data.set_opt("number_of_databases", sub.number_of_databases);
    data.set_opt("redis_version", sub.redis_version.clone());
    data.set_opt("public_endpoint_access", sub.public_endpoint_access);
}

fn common_block() -> Block {
    Block::new()
        .attr("name", Attribute::string().optional().computed())
        .attr("status", Attribute::string().computed())
        .attr("payment_method", Attribute::string().computed())
        .attr("payment_method_id", Attribute::string().computed())
        .attr("number_of_databases", Attribute::int().computed())
        .attr("redis_version", Attribute::string().computed())
        .attr("public_endpoint_access", Attribute::bool().computed())
}

/// `rediscloud_subscription`
pub struct SubscriptionDataSource;

#[async_trait]
impl DataSource for SubscriptionDataSource {
    fn type_name(&self) -> &'static str {
        "rediscloud_subscription"
    }

    fn schema(&self) -> Schema {
        let region = Block::new()
            .attr("region", Attribute::string().computed())
            .attr("multiple_availability_zones", Attribute::bool().computed())
            .attr("preferred_availability_zones", Attribute::list(AttrType::String).computed())
            .attr("networking_deployment_cidr", Attribute::string().computed())
            .attr("networking_vpc_id", Attribute::string().computed())
            .attr("networking_subnet_ids", Attribute::list(AttrType::String).computed());
        let cloud = Block::new()
            .attr("provider", Attribute::string().computed())
            .attr("cloud_account_id", Attribute::string().computed())
            .attr("region", Attribute::list_block(region).computed());
        let block = common_block()
            .attr("memory_storage", Attribute::string().computed())
            .attr("cloud_provider", Attribute::list_block(cloud).computed());
        Schema::data_source(block)
    }

    async fn read(&self, _ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let matches: Vec<Subscription> = state
            .subscriptions()
            .list()
            .await?
            .into_iter()
            .filter(|s| !s.is_active_active())
            .filter(|s| matches_str(data, "name", s.name.as_deref()))
            .collect();
        let sub = exactly_one("subscription", data, &["name"], matches)?;

        set_common(data, &sub);
        data.set_opt("memory_storage", sub.memory_storage.clone());
        data.set("cloud_provider", cloud_provider_state(&sub));
        Ok(())
    }
}

/// `rediscloud_active_active_subscription`
pub struct ActiveActiveSubscriptionDataSource;

#[async_trait]
impl DataSource for ActiveActiveSubscriptionDataSource {
    fn type_name(&self) -> &'static str {
        "rediscloud_active_active_subscription"
    }

    fn schema(&self) -> Schema {
        Schema::data_source(common_block().attr("cloud_provider", Attribute::string().computed()))
    }

    async fn read(&self, _ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let matches: Vec<Subscription> = state
            .subscriptions()
            .list()
            .await?
            .into_iter()
            .filter(Subscription::is_active_active)
            .filter(|s| matches_str(data, "name", s.name.as_deref()))
            .collect();
        let sub = exactly_one("Active-Active subscription", data, &["name"], matches)?;

        set_common(data, &sub);
        data.set_opt("cloud_provider", sub.primary_cloud().and_then(|c| c.provider.clone()));
        Ok(())
    }
}

/// `rediscloud_essentials_subscription`
pub struct EssentialsSubscriptionDataSource;

#[async_trait]
impl DataSource for EssentialsSubscriptionDataSource {
    fn type_name(&self) -> &'static str {
        "rediscloud_essentials_subscription"
    }

    fn schema(&self) -> Schema {
        let block = Block::new()
            .attr("id", Attribute::string().optional().computed())
            .attr("name", Attribute::string().optional().computed())
            .attr("plan_id", Attribute::string().computed())
            .attr("status", Attribute::string().computed())
            .attr("payment_method", Attribute::string().computed())
            .attr("payment_method_id", Attribute::string().computed())
            .attr("creation_date", Attribute::string().computed());
        Schema::data_source(block)
    }

    async fn read(&self, _ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let wanted_id = data.get_i64("id");
        let matches: Vec<_> = state
            .fixed_subscriptions()
            .list()
            .await?
            .into_iter()
            .filter(|s| wanted_id.is_none_or(|id| id == s.id))
            .filter(|s| matches_str(data, "name", s.name.as_deref()))
            .collect();
        let sub = exactly_one("Essentials subscription", data, &["id", "name"], matches)?;

        data.set_id(sub.id.to_string());
        data.set_opt("name", sub.name);
        data.set_opt("plan_id", sub.plan_id.map(|id| id.to_string()));
        data.set_opt("status", sub.status);
        data.set_opt("payment_method", sub.payment_method_type);
        data.set_opt("payment_method_id", sub.payment_method_id.map(|id| id.to_string()));
        data.set_opt("creation_date", sub.creation_date);
        Ok(())
    }
}
