//! Database lookups within one subscription

use std::collections::BTreeMap;

use async_trait::async_trait;
use rediscloud_core::api::{Database, FixedDatabase};
use rediscloud_core::{DatabaseId, OperationContext};
use serde_json::json;

use super::{exactly_one, matches_str};
use crate::error::{ProviderError, Result};
use crate::host::{AttrType, Attribute, Block, DataSource, ResourceData, Schema};
use crate::state::ProviderState;

const FILTERS: &[&str] = &["subscription_id", "name", "protocol", "region"];

fn subscription_id(data: &ResourceData) -> Result<i64> {
    data.get_i64("subscription_id")
        .ok_or_else(|| ProviderError::validation_at("subscription_id", "subscription_id must be a number"))
}

fn lookup_block() -> Block {
    Block::new()
        .attr("subscription_id", Attribute::string().required())
        .attr("name", Attribute::string().optional().computed())
        .attr("db_id", Attribute::int().computed())
        .attr("status", Attribute::string().computed())
        .attr("redis_version", Attribute::string().computed())
        .attr("memory_limit_in_gb", Attribute::float().computed())
        .attr("dataset_size_in_gb", Attribute::float().computed())
        .attr("data_persistence", Attribute::string().computed())
        .attr("data_eviction", Attribute::string().computed())
        .attr("support_oss_cluster_api", Attribute::bool().computed())
}

/// `rediscloud_database`
pub struct DatabaseDataSource;

#[async_trait]
impl DataSource for DatabaseDataSource {
    fn type_name(&self) -> &'static str {
        "rediscloud_database"
    }

    fn schema(&self) -> Schema {
        let block = lookup_block()
            .attr("protocol", Attribute::string().optional().computed())
            .attr("region", Attribute::string().optional().computed())
            .attr("resp_version", Attribute::string().computed())
            .attr("replication", Attribute::bool().computed())
            .attr("public_endpoint", Attribute::string().computed())
            .attr("private_endpoint", Attribute::string().computed())
            .attr("enable_tls", Attribute::bool().computed())
            .attr("source_ips", Attribute::list(AttrType::String).computed());
        Schema::data_source(block)
    }

    async fn read(&self, _ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let sub = subscription_id(data)?;
        let matches: Vec<Database> = state
            .databases()
            .list(sub)
            .await?
            .into_iter()
            .filter(|db| matches_str(data, "name", db.name.as_deref()))
            .filter(|db| matches_str(data, "protocol", db.protocol.as_deref()))
            .filter(|db| matches_str(data, "region", db.region.as_deref()))
            .collect();
        let db = exactly_one("database", data, FILTERS, matches)?;

        data.set_id(DatabaseId::new(sub, db.database_id).to_string());
        data.set("db_id", db.database_id);
        data.set_opt("name", db.name);
        data.set_opt("protocol", db.protocol);
        data.set_opt("region", db.region);
        data.set_opt("status", db.status);
        data.set_opt("redis_version", db.redis_version);
        data.set_opt("resp_version", db.resp_version);
        data.set_opt("memory_limit_in_gb", db.memory_limit_in_gb);
        data.set_opt("dataset_size_in_gb", db.dataset_size_in_gb);
        data.set_opt("data_persistence", db.data_persistence);
        data.set_opt("data_eviction", db.data_eviction_policy);
        data.set_opt("replication", db.replication);
        data.set_opt("support_oss_cluster_api", db.support_oss_cluster_api);
        data.set_opt("public_endpoint", db.public_endpoint);
        data.set_opt("private_endpoint", db.private_endpoint);
        let security = db.security.unwrap_or_default();
        data.set_opt("enable_tls", security.enable_tls);
        data.set("source_ips", security.source_ips);
        Ok(())
    }
}

/// `rediscloud_active_active_subscription_database`
pub struct ActiveActiveDatabaseDataSource;

#[async_trait]
impl DataSource for ActiveActiveDatabaseDataSource {
    fn type_name(&self) -> &'static str {
        "rediscloud_active_active_subscription_database"
    }

    fn schema(&self) -> Schema {
        let block = lookup_block()
            .attr("public_endpoint", Attribute::map(AttrType::String).computed())
            .attr("private_endpoint", Attribute::map(AttrType::String).computed())
            .attr("regions", Attribute::list(AttrType::String).computed());
        Schema::data_source(block)
    }

    async fn read(&self, _ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let sub = subscription_id(data)?;
        let matches: Vec<Database> = state
            .databases()
            .list(sub)
            .await?
            .into_iter()
            .filter(|db| matches_str(data, "name", db.name.as_deref()))
            .collect();
        let db = exactly_one("Active-Active database", data, FILTERS, matches)?;

        let mut public = BTreeMap::new();
        let mut private = BTreeMap::new();
        let mut regions = Vec::new();
        for crdb in &db.crdb_databases {
            let Some(region) = crdb.region.clone() else {
                continue;
            };
            if let Some(endpoint) = &crdb.public_endpoint {
                public.insert(region.clone(), endpoint.clone());
            }
            if let Some(endpoint) = &crdb.private_endpoint {
                private.insert(region.clone(), endpoint.clone());
            }
            regions.push(region);
        }

        data.set_id(DatabaseId::new(sub, db.database_id).to_string());
        data.set("db_id", db.database_id);
        data.set_opt("name", db.name);
        data.set_opt("status", db.status);
        data.set_opt("redis_version", db.redis_version);
        data.set_opt("memory_limit_in_gb", db.memory_limit_in_gb);
        data.set_opt("dataset_size_in_gb", db.dataset_size_in_gb);
        data.set_opt("data_persistence", db.data_persistence);
        data.set_opt("data_eviction", db.data_eviction_policy);
        data.set_opt("support_oss_cluster_api", db.support_oss_cluster_api);
        data.set("public_endpoint", json!(public));
        data.set("private_endpoint", json!(private));
        data.set("regions", regions);
        Ok(())
    }
}

/// `rediscloud_essentials_database`
pub struct EssentialsDatabaseDataSource;

#[async_trait]
impl DataSource for EssentialsDatabaseDataSource {
    fn type_name(&self) -> &'static str {
        "rediscloud_essentials_database"
    }

    fn schema(&self) -> Schema {
        let block = lookup_block()
            .attr("db_id", Attribute::int().optional().computed())
            .attr("protocol", Attribute::string().computed())
            .attr("replication", Attribute::bool().computed())
            .attr("public_endpoint", Attribute::string().computed())
            .attr("private_endpoint", Attribute::string().computed());
        Schema::data_source(block)
    }

    async fn read(&self, _ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let sub = subscription_id(data)?;
        let wanted_id = data.get_i64("db_id");
        let matches: Vec<FixedDatabase> = state
            .fixed_databases()
            .list(sub)
            .await?
            .into_iter()
            .filter(|db| wanted_id.is_none_or(|id| id == db.database_id))
            .filter(|db| matches_str(data, "name", db.name.as_deref()))
            .collect();
        let db = exactly_one("Essentials database", data, &["subscription_id", "db_id", "name"], matches)?;

        data.set_id(DatabaseId::new(sub, db.database_id).to_string());
        data.set("db_id", db.database_id);
        data.set_opt("name", db.name);
        data.set_opt("protocol", db.protocol);
        data.set_opt("status", db.status);
        data.set_opt("redis_version", db.redis_version);
        data.set_opt("memory_limit_in_gb", db.plan_memory_limit);
        data.set_opt("dataset_size_in_gb", db.plan_dataset_size);
        data.set_opt("data_persistence", db.data_persistence);
        data.set_opt("data_eviction", db.data_eviction_policy);
        data.set_opt("replication", db.replication);
        data.set_opt("support_oss_cluster_api", db.clustering.and_then(|c| c.enabled));
        data.set_opt("public_endpoint", db.public_endpoint);
        data.set_opt("private_endpoint", db.private_endpoint);
        Ok(())
    }
}
