//! `rediscloud_active_active_subscription_regions`
//!
//! Manages the region set of an existing Active-Active subscription. Regions
//! are added one per call; removing a region, or changing its deployment
//! CIDR (which means removing and re-adding it), drops its data and is only
//! done when `delete_regions` is set.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use rediscloud_core::api::ActiveActiveRegion;
use rediscloud_core::api::databases::{ActiveActiveDatabaseUpdateRequest, RegionOverrideRequest};
use rediscloud_core::api::regions::{RegionCreateRequest, RegionDatabaseRequest};
use rediscloud_core::api::subscriptions::LocalThroughput;
use rediscloud_core::{OperationContext, ResourceFamily, cloud};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::common::{found, int_attr, ordered_like};
use crate::error::{ProviderError, Result};
use crate::host::walk;
use crate::host::{
    Attribute, Block, Operation, Resource, ResourceData, ResourceDiff, Schema, Timeouts, Validation,
};
use crate::state::ProviderState;

pub const TYPE_NAME: &str = "rediscloud_active_active_subscription_regions";

pub struct ActiveActiveRegionsResource;

#[derive(Debug, Clone, PartialEq)]
struct RegionDatabase {
    name: String,
    write_operations_per_second: i64,
    read_operations_per_second: i64,
}

#[derive(Debug, Clone, PartialEq)]
struct DesiredRegion {
    name: String,
    cidr: String,
    databases: Vec<RegionDatabase>,
}

/// What has to happen to move from the current region set to the desired one
#[derive(Debug, Default, PartialEq)]
struct RegionChanges {
    add: Vec<String>,
    delete: Vec<String>,
    recreate: Vec<String>,
}

impl RegionChanges {
    fn between(current: &[(String, Option<String>)], desired: &[DesiredRegion]) -> Self {
        let mut changes = RegionChanges::default();
        for region in desired {
            match current.iter().find(|(name, _)| *name == region.name) {
                None => changes.add.push(region.name.clone()),
                Some((_, cidr)) if cidr.as_deref().is_some_and(|c| c != region.cidr) => {
                    changes.recreate.push(region.name.clone())
                }
                Some(_) => {}
            }
        }
        for (name, _) in current {
            if !desired.iter().any(|d| d.name == *name) {
                changes.delete.push(name.clone());
            }
        }
        changes
    }

    fn is_destructive(&self) -> bool {
        !self.delete.is_empty() || !self.recreate.is_empty()
    }

    fn check_allowed(&self, delete_regions: bool) -> Result<()> {
        if self.is_destructive() && !delete_regions {
            let mut regions = self.delete.clone();
            regions.extend(self.recreate.iter().cloned());
            return Err(ProviderError::validation_at(
                "delete_regions",
                format!(
                    "regions [{}] would be deleted; set delete_regions = true to allow it",
                    regions.join(", ")
                ),
            ));
        }
        Ok(())
    }
}

fn desired_regions(regions: &[Value]) -> Vec<DesiredRegion> {
    regions
        .iter()
        .map(|r| {
            let r = ResourceData::new(r.clone());
            DesiredRegion {
                name: r.get_string("region").unwrap_or_default(),
                cidr: r.get_string("networking_deployment_cidr").unwrap_or_default(),
                databases: r
                    .get_list("database")
                    .into_iter()
                    .map(|db| {
                        let db = ResourceData::new(db);
                        RegionDatabase {
                            name: db.get_string("database_name").unwrap_or_default(),
                            write_operations_per_second: db
                                .get_i64("local_write_operations_per_second")
                                .unwrap_or_default(),
                            read_operations_per_second: db
                                .get_i64("local_read_operations_per_second")
                                .unwrap_or_default(),
                        }
                    })
                    .collect(),
            }
        })
        .collect()
}

fn create_request(region: &DesiredRegion) -> RegionCreateRequest {
    RegionCreateRequest {
        region: region.name.clone(),
        deployment_cidr: region.cidr.clone(),
        databases: region
            .databases
            .iter()
            .map(|db| RegionDatabaseRequest {
                name: db.name.clone(),
                local_throughput_measurement: LocalThroughput {
                    region: region.name.clone(),
                    write_operations_per_second: db.write_operations_per_second,
                    read_operations_per_second: db.read_operations_per_second,
                },
            })
            .collect(),
        ..Default::default()
    }
}

/// Throughput changes for regions that stay, grouped by database ID
fn throughput_updates(
    current: &[ActiveActiveRegion],
    desired: &[DesiredRegion],
    skip: &[String],
) -> BTreeMap<i64, Vec<RegionOverrideRequest>> {
    let mut updates: BTreeMap<i64, Vec<RegionOverrideRequest>> = BTreeMap::new();
    for region in desired.iter().filter(|r| !skip.contains(&r.name)) {
        let Some(existing) = current.iter().find(|c| c.region.as_deref() == Some(region.name.as_str())) else {
            continue;
        };
        for db in &region.databases {
            let Some(live) = existing
                .databases
                .iter()
                .find(|d| d.database_name.as_deref() == Some(db.name.as_str()))
            else {
                continue;
            };
            if live.write_operations_per_second == Some(db.write_operations_per_second)
                && live.read_operations_per_second == Some(db.read_operations_per_second)
            {
                continue;
            }
            updates.entry(live.database_id).or_default().push(RegionOverrideRequest {
                region: region.name.clone(),
                local_throughput_measurement: Some(LocalThroughput {
                    region: region.name.clone(),
                    write_operations_per_second: db.write_operations_per_second,
                    read_operations_per_second: db.read_operations_per_second,
                }),
                ..Default::default()
            });
        }
    }
    updates
}

/// Record the subscription as managed once a change to it has landed
fn adopt(data: &mut ResourceData, sub: i64) {
    if !data.has_id() {
        data.set_id(sub.to_string());
    }
}

async fn apply_regions(
    ctx: &OperationContext,
    state: &ProviderState,
    data: &mut ResourceData,
    sub: i64,
    timeout: Duration,
) -> Result<()> {
    let client = state.client();
    let _guard = state.lock_subscription(ctx, sub).await?;
    cloud::wait_for_subscription_active(ctx, client, sub, timeout).await?;

    let current = state.regions().list(sub).await?;
    let desired = desired_regions(&data.get_list("region"));
    let names: Vec<(String, Option<String>)> = current
        .iter()
        .filter_map(|r| Some((r.region.clone()?, r.deployment_cidr.clone())))
        .collect();
    let changes = RegionChanges::between(&names, &desired);
    changes.check_allowed(data.get_bool("delete_regions").unwrap_or(false))?;

    let mut doomed = changes.delete.clone();
    doomed.extend(changes.recreate.iter().cloned());
    if !doomed.is_empty() {
        info!(subscription_id = sub, regions = ?doomed, "Deleting regions");
        let task = state.regions().delete(sub, &doomed).await?;
        cloud::complete_task(ctx, client, task, timeout).await?;
        adopt(data, sub);
        cloud::wait_for_subscription_active(ctx, client, sub, timeout).await?;
    }

    for region in desired
        .iter()
        .filter(|r| changes.add.contains(&r.name) || changes.recreate.contains(&r.name))
    {
        info!(subscription_id = sub, region = %region.name, "Adding region");
        let task = state.regions().create(sub, &create_request(region)).await?;
        cloud::complete_task(ctx, client, task, timeout).await?;
        adopt(data, sub);
        cloud::wait_for_subscription_active(ctx, client, sub, timeout).await?;
    }

    for (db, regions) in throughput_updates(&current, &desired, &changes.recreate) {
        debug!(subscription_id = sub, database_id = db, regions = regions.len(), "Updating local throughput");
        let request = ActiveActiveDatabaseUpdateRequest {
            regions,
            ..Default::default()
        };
        let task = state.databases().update_active_active(sub, db, &request).await?;
        cloud::complete_task(ctx, client, task, timeout).await?;
        adopt(data, sub);
        cloud::wait_for_database_active(ctx, client, sub, db, timeout).await?;
    }
    cloud::wait_for_subscription_active(ctx, client, sub, timeout).await?;
    adopt(data, sub);
    Ok(())
}

fn regions_state(current: Option<&Value>, regions: &[ActiveActiveRegion]) -> Value {
    let items = regions
        .iter()
        .map(|r| {
            let name = r.region.as_deref().unwrap_or_default();
            let current_dbs = current
                .and_then(|list| walk::find_by_key(list, "region", name))
                .and_then(|c| c.get("database"));
            let databases = r
                .databases
                .iter()
                .map(|db| {
                    json!({
                        "database_id": db.database_id,
                        "database_name": db.database_name,
                        "local_write_operations_per_second": db.write_operations_per_second,
                        "local_read_operations_per_second": db.read_operations_per_second,
                    })
                })
                .collect();
            json!({
                "region_id": r.region_id,
                "region": name,
                "vpc_id": r.vpc_id,
                "networking_deployment_cidr": r.deployment_cidr,
                "database": ordered_like(current_dbs, databases, "database_name"),
            })
        })
        .collect();
    ordered_like(current, items, "region")
}

#[async_trait]
impl Resource for ActiveActiveRegionsResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn family(&self) -> ResourceFamily {
        ResourceFamily::Region
    }

    fn schema(&self) -> Schema {
        let database = Block::new()
            .attr("database_id", Attribute::int().computed())
            .attr("database_name", Attribute::string().required())
            .attr("local_write_operations_per_second", Attribute::int().required())
            .attr("local_read_operations_per_second", Attribute::int().required());
        let region = Block::new()
            .attr("region_id", Attribute::int().computed())
            .attr("region", Attribute::string().required())
            .attr("vpc_id", Attribute::string().computed())
            .attr(
                "networking_deployment_cidr",
                Attribute::string().required().validate(Validation::Cidr),
            )
            .attr("database", Attribute::set_block(database).optional());
        let block = Block::new()
            .attr("subscription_id", Attribute::string().required().force_new())
            .attr(
                "delete_regions",
                Attribute::bool()
                    .optional()
                    .description("Allow removing regions or changing their deployment CIDR"),
            )
            .attr("region", Attribute::set_block(region).required().min_items(1));
        Schema::resource(block, Some(Timeouts::minutes(60, 10, 60, 10)))
    }

    fn customize_diff(&self, diff: &mut ResourceDiff<'_>) -> Result<()> {
        let Some(prior) = diff.prior() else {
            return Ok(());
        };
        let current: Vec<(String, Option<String>)> = walk::get(prior, "region")
            .and_then(Value::as_array)
            .map(|items| {
                items
                    .iter()
                    .filter_map(|r| {
                        let name = r.get("region")?.as_str()?.to_string();
                        let cidr = r
                            .get("networking_deployment_cidr")
                            .and_then(Value::as_str)
                            .map(str::to_string);
                        Some((name, cidr))
                    })
                    .collect()
            })
            .unwrap_or_default();
        let planned = diff
            .get("region")
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let delete_regions = diff
            .get("delete_regions")
            .and_then(Value::as_bool)
            .unwrap_or(false);
        RegionChanges::between(&current, &desired_regions(&planned)).check_allowed(delete_regions)
    }

    async fn create(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let sub = int_attr(data, "subscription_id", "Subscription")?;
        let timeout = data.timeout(Operation::Create);
        apply_regions(ctx, state, data, sub, timeout).await?;
        self.read(ctx, state, data).await
    }

    async fn read(&self, _ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let sub = int_attr(data, "id", "Subscription")?;
        let Some(regions) = found(data, self.family(), state.regions().list(sub).await)? else {
            return Ok(());
        };
        let region = regions_state(data.get("region"), &regions);
        data.set("subscription_id", sub.to_string());
        data.set("region", region);
        Ok(())
    }

    async fn update(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let sub = int_attr(data, "id", "Subscription")?;
        let timeout = data.timeout(Operation::Update);
        apply_regions(ctx, state, data, sub, timeout).await?;
        self.read(ctx, state, data).await
    }

    async fn delete(&self, _ctx: &OperationContext, _state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        // A subscription always keeps its regions; they go with the subscription
        info!(subscription_id = %data.id(), "Forgetting Active-Active regions");
        Ok(())
    }

    async fn import(&self, _ctx: &OperationContext, _state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let sub = int_attr(data, "id", "Subscription")?;
        data.set("subscription_id", sub.to_string());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn region(name: &str, cidr: &str) -> DesiredRegion {
        DesiredRegion {
            name: name.to_string(),
            cidr: cidr.to_string(),
            databases: Vec::new(),
        }
    }

    #[test]
    fn test_region_changes() {
        let current = vec![
            ("us-east-1".to_string(), Some("10.0.0.0/24".to_string())),
            ("eu-west-1".to_string(), Some("10.0.1.0/24".to_string())),
            ("ap-south-1".to_string(), Some("10.0.2.0/24".to_string())),
        ];
        let desired = vec![
            region("us-east-1", "10.0.0.0/24"),
            region("eu-west-1", "10.0.5.0/24"),
            region("us-west-2", "10.0.3.0/24"),
        ];
        let changes = RegionChanges::between(&current, &desired);
        assert_eq!(
            changes,
            RegionChanges {
                add: vec!["us-west-2".to_string()],
                delete: vec!["ap-south-1".to_string()],
                recreate: vec!["eu-west-1".to_string()],
            }
        );
        assert!(changes.check_allowed(false).is_err());
        assert!(changes.check_allowed(true).is_ok());

        let additive = RegionChanges::between(&current[..1], &desired[..1]);
        assert!(!additive.is_destructive());
    }

    #[test]
    fn test_plan_rejects_removal_without_flag() {
        let schema = ActiveActiveRegionsResource.schema();
        let prior = json!({
            "id": "1234",
            "subscription_id": "1234",
            "region": [
                {"region": "us-east-1", "networking_deployment_cidr": "10.0.0.0/24", "region_id": 1},
                {"region": "eu-west-1", "networking_deployment_cidr": "10.0.1.0/24", "region_id": 2}
            ]
        });
        let config = json!({
            "subscription_id": "1234",
            "region": [{"region": "us-east-1", "networking_deployment_cidr": "10.0.0.0/24"}]
        });
        let mut diff = ResourceDiff::new(&schema, Some(prior.clone()), config.clone());
        let err = ActiveActiveRegionsResource.customize_diff(&mut diff).unwrap_err();
        assert!(err.to_string().contains("eu-west-1"));

        let mut allowed = config;
        allowed["delete_regions"] = json!(true);
        let mut diff = ResourceDiff::new(&schema, Some(prior), allowed);
        assert!(ActiveActiveRegionsResource.customize_diff(&mut diff).is_ok());
    }

    #[test]
    fn test_throughput_updates_skip_unchanged() {
        let current: Vec<ActiveActiveRegion> = serde_json::from_value(json!([{
            "regionId": 1, "region": "us-east-1", "deploymentCIDR": "10.0.0.0/24",
            "databases": [
                {"databaseId": 7, "databaseName": "a", "readOperationsPerSecond": 1000, "writeOperationsPerSecond": 1000},
                {"databaseId": 8, "databaseName": "b", "readOperationsPerSecond": 500, "writeOperationsPerSecond": 500}
            ]
        }]))
        .unwrap();
        let mut desired = region("us-east-1", "10.0.0.0/24");
        desired.databases = vec![
            RegionDatabase { name: "a".into(), write_operations_per_second: 1000, read_operations_per_second: 1000 },
            RegionDatabase { name: "b".into(), write_operations_per_second: 500, read_operations_per_second: 2000 },
        ];
        let updates = throughput_updates(&current, &[desired], &[]);
        assert_eq!(updates.len(), 1);
        let throughput = updates[&8][0].local_throughput_measurement.as_ref().unwrap();
        assert_eq!(throughput.read_operations_per_second, 2000);
    }
}
