//! `rediscloud_active_active_subscription_database`
//!
//! Global settings apply to every region; `override_region` blocks carry the
//! per-region exceptions. The API only reports effective per-region values,
//! so refresh runs them through [`reconcile`](crate::reconcile) to tell real
//! overrides from inherited ones.

use std::collections::BTreeMap;

use async_trait::async_trait;
use rediscloud_core::api::databases::{
    ActiveActiveDatabaseCreateRequest, ActiveActiveDatabaseUpdateRequest, ClientTlsCertificate,
    RegionOverrideRequest, RemoteBackupRequest,
};
use rediscloud_core::api::subscriptions::LocalThroughput;
use rediscloud_core::api::{Alert, Database, Module};
use rediscloud_core::{DatabaseId, OperationContext, ResourceFamily, cloud};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::common::{
    EVICTION_POLICIES, PERSISTENCE_KINDS, RESP_VERSIONS, alert_block, alerts, alerts_state,
    backup_state, cidr_set, found, ordered_like, remote_backup, remote_backup_block, strings_like,
    subscription_id,
};
use super::database::{database_id, import_database_id, set_sizing, validate_database};
use crate::error::Result;
use crate::host::value::is_empty;
use crate::host::walk;
use crate::host::{
    AttrType, Attribute, Block, Diagnostics, Operation, Resource, ResourceData, ResourceDiff,
    Schema, Timeouts, Validation,
};
use crate::reconcile::{
    FIELD_ALERT, FIELD_DATA_PERSISTENCE, FIELD_ENABLE_DEFAULT_USER, FIELD_PASSWORD,
    FIELD_REMOTE_BACKUP, FIELD_SOURCE_IPS, OVERRIDE_REGION, OverrideValues, reconcile_regions,
};
use crate::state::ProviderState;
use crate::validate::{check_backup_time_utc, check_memory_or_dataset, check_unique_region_names};

pub const TYPE_NAME: &str = "rediscloud_active_active_subscription_database";

/// Local throughput each region starts with
const DEFAULT_LOCAL_OPS: i64 = 1000;
const ALL_ADDRESSES: &str = "0.0.0.0/0";

pub struct ActiveActiveDatabaseResource;

fn override_region_block() -> Attribute {
    Attribute::set_block(
        Block::new()
            .attr("name", Attribute::string().required())
            .attr(
                FIELD_DATA_PERSISTENCE,
                Attribute::string().optional().validate(Validation::OneOf(PERSISTENCE_KINDS)),
            )
            .attr(FIELD_PASSWORD, Attribute::string().optional().sensitive())
            .attr(FIELD_ENABLE_DEFAULT_USER, Attribute::bool().optional())
            .attr(FIELD_SOURCE_IPS, cidr_set().optional())
            .attr(FIELD_ALERT, alert_block())
            .attr(FIELD_REMOTE_BACKUP, remote_backup_block()),
    )
    .optional()
}

fn client_certificates(data: &ResourceData) -> Option<Vec<ClientTlsCertificate>> {
    let certificates = data.get_strings("client_tls_certificates");
    (!certificates.is_empty()).then(|| {
        certificates
            .into_iter()
            .map(|pem| ClientTlsCertificate {
                public_certificate_pem_string: pem,
            })
            .collect()
    })
}

/// The API resets a source IP list to everything when sent empty
fn source_ips_or_default(ips: Vec<String>) -> Vec<String> {
    if ips.is_empty() {
        vec![ALL_ADDRESSES.to_string()]
    } else {
        ips
    }
}

fn create_request(data: &ResourceData, regions: &[String]) -> ActiveActiveDatabaseCreateRequest {
    ActiveActiveDatabaseCreateRequest {
        dry_run: Some(false),
        name: data.get_string("name").unwrap_or_default(),
        protocol: Some("redis".to_string()),
        port: data.get_i64("port"),
        memory_limit_in_gb: data.get_f64("memory_limit_in_gb"),
        dataset_size_in_gb: data.get_f64("dataset_size_in_gb"),
        support_oss_cluster_api: data.get_bool("support_oss_cluster_api"),
        use_external_endpoint_for_oss_cluster_api: data.get_bool("external_endpoint_for_oss_cluster_api"),
        redis_version: data.get_string("redis_version"),
        resp_version: data.get_string("resp_version"),
        global_data_persistence: data.get_string("global_data_persistence"),
        global_password: data.get_string("global_password"),
        global_enable_default_user: data.get_bool("global_enable_default_user"),
        global_source_ip: data.get_strings("global_source_ips"),
        global_alerts: alerts(data, "global_alert"),
        data_eviction_policy: data.get_string("data_eviction"),
        local_throughput_measurement: regions
            .iter()
            .map(|region| LocalThroughput {
                region: region.clone(),
                write_operations_per_second: DEFAULT_LOCAL_OPS,
                read_operations_per_second: DEFAULT_LOCAL_OPS,
            })
            .collect(),
        enable_tls: data.get_bool("enable_tls"),
        client_ssl_certificate: data.get_string("client_ssl_certificate"),
        client_tls_certificates: client_certificates(data),
        modules: data
            .get_strings("global_modules")
            .into_iter()
            .map(|name| Module { name, parameters: None })
            .collect(),
    }
}

fn named<'a>(list: &'a [Value], name: &str) -> Option<&'a Value> {
    list.iter()
        .find(|b| b.get("name").and_then(Value::as_str) == Some(name))
}

/// Non-null, non-empty field of a region block
fn present(block: Option<&ResourceData>, field: &str) -> bool {
    block.and_then(|b| b.get(field)).is_some_and(|v| !is_empty(v))
}

/// Override requests for every region whose overrides changed. A removed
/// override is reset to the global value.
fn region_overrides(data: &ResourceData, create: bool) -> Vec<RegionOverrideRequest> {
    let current = data.get_list(OVERRIDE_REGION);
    let prior: Vec<Value> = if create {
        Vec::new()
    } else {
        data.old(OVERRIDE_REGION)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default()
    };

    let mut names: Vec<String> = Vec::new();
    for block in current.iter().chain(prior.iter()) {
        if let Some(name) = block.get("name").and_then(Value::as_str)
            && !names.iter().any(|n| n == name)
        {
            names.push(name.to_string());
        }
    }

    let mut requests = Vec::new();
    for name in names {
        let cur_raw = named(&current, &name);
        let old_raw = named(&prior, &name);
        if !create
            && walk::changed_paths(old_raw.unwrap_or(&Value::Null), cur_raw.unwrap_or(&Value::Null)).is_empty()
        {
            continue;
        }
        let cur = cur_raw.map(|v| ResourceData::new(v.clone()));
        let old = old_raw.map(|v| ResourceData::new(v.clone()));
        let had = |field: &str| present(old.as_ref(), field);

        let mut request = RegionOverrideRequest {
            region: name.clone(),
            ..Default::default()
        };
        let cur_ref = cur.as_ref();

        request.data_persistence = cur_ref
            .and_then(|c| c.get_string(FIELD_DATA_PERSISTENCE))
            .or_else(|| had(FIELD_DATA_PERSISTENCE).then(|| data.get_string("global_data_persistence")).flatten());
        request.password = cur_ref
            .and_then(|c| c.get_string(FIELD_PASSWORD))
            .or_else(|| had(FIELD_PASSWORD).then(|| data.get_string("global_password")).flatten());
        request.enable_default_user = cur_ref
            .and_then(|c| c.get_bool(FIELD_ENABLE_DEFAULT_USER))
            .or_else(|| had(FIELD_ENABLE_DEFAULT_USER).then(|| data.get_bool("global_enable_default_user")).flatten());

        let ips = cur_ref.map(|c| c.get_strings(FIELD_SOURCE_IPS)).unwrap_or_default();
        if !ips.is_empty() {
            request.source_ip = Some(ips);
        } else if had(FIELD_SOURCE_IPS) {
            request.source_ip = Some(source_ips_or_default(data.get_strings("global_source_ips")));
        }

        let region_alerts = cur_ref.map(|c| alerts(c, FIELD_ALERT)).unwrap_or_default();
        if !region_alerts.is_empty() {
            request.alerts = Some(region_alerts);
        } else if had(FIELD_ALERT) {
            request.alerts = Some(alerts(data, "global_alert"));
        }

        if let Some(c) = cur_ref.filter(|c| c.get_block(FIELD_REMOTE_BACKUP).is_some()) {
            request.remote_backup = Some(remote_backup(c, FIELD_REMOTE_BACKUP));
        } else if had(FIELD_REMOTE_BACKUP) {
            request.remote_backup = Some(RemoteBackupRequest::default());
        }

        let empty = RegionOverrideRequest {
            region: name,
            ..Default::default()
        };
        if request != empty {
            requests.push(request);
        }
    }
    requests
}

fn update_request(data: &ResourceData, create: bool) -> ActiveActiveDatabaseUpdateRequest {
    let mut request = ActiveActiveDatabaseUpdateRequest {
        regions: region_overrides(data, create),
        ..Default::default()
    };
    if create {
        return request;
    }
    if data.has_change("memory_limit_in_gb") {
        request.memory_limit_in_gb = data.get_f64("memory_limit_in_gb");
    }
    if data.has_change("dataset_size_in_gb") {
        request.dataset_size_in_gb = data.get_f64("dataset_size_in_gb");
    }
    if data.has_change("support_oss_cluster_api") {
        request.support_oss_cluster_api = data.get_bool("support_oss_cluster_api");
    }
    if data.has_change("external_endpoint_for_oss_cluster_api") {
        request.use_external_endpoint_for_oss_cluster_api =
            data.get_bool("external_endpoint_for_oss_cluster_api");
    }
    if data.has_changes(&["enable_tls", "client_ssl_certificate", "client_tls_certificates"]) {
        request.enable_tls = data.get_bool("enable_tls");
        request.client_ssl_certificate = data.get_string("client_ssl_certificate");
        request.client_tls_certificates = client_certificates(data);
    }
    if data.has_change("global_data_persistence") {
        request.global_data_persistence = data.get_string("global_data_persistence");
    }
    if data.has_change("global_password") {
        request.global_password = data.get_string("global_password");
    }
    if data.has_change("global_enable_default_user") {
        request.global_enable_default_user = data.get_bool("global_enable_default_user");
    }
    if data.has_change("global_source_ips") {
        request.global_source_ip = Some(source_ips_or_default(data.get_strings("global_source_ips")));
    }
    if data.has_change("global_alert") {
        request.global_alerts = Some(alerts(data, "global_alert"));
    }
    if data.has_change("data_eviction") {
        request.data_eviction_policy = data.get_string("data_eviction");
    }
    request
}

fn has_content(request: &ActiveActiveDatabaseUpdateRequest) -> Result<bool> {
    let body = serde_json::to_value(request)?;
    Ok(body.as_object().is_some_and(|o| !o.is_empty()))
}

/// Globals as the user declared them; the API does not report them
fn globals(data: &ResourceData) -> OverrideValues {
    OverrideValues {
        data_persistence: data.get_string("global_data_persistence"),
        password: data.get_string("global_password"),
        enable_default_user: data.get_bool("global_enable_default_user"),
        source_ips: data.get_strings("global_source_ips"),
        alerts: alerts(data, "global_alert"),
        remote_backup: None,
    }
}

fn region_values(db: &Database) -> Vec<(String, OverrideValues)> {
    db.crdb_databases
        .iter()
        .filter_map(|crdb| {
            let security = crdb.security.clone().unwrap_or_default();
            let backup = backup_state(crdb.backup.as_ref())
                .as_array()
                .and_then(|items| items.first().cloned());
            Some((
                crdb.region.clone()?,
                OverrideValues {
                    data_persistence: crdb.data_persistence.clone(),
                    password: security.password,
                    enable_default_user: security.enable_default_user,
                    source_ips: security.source_ips,
                    alerts: crdb.alerts.clone(),
                    remote_backup: backup,
                },
            ))
        })
        .collect()
}

fn endpoints(db: &Database, private: bool) -> BTreeMap<String, String> {
    db.crdb_databases
        .iter()
        .filter_map(|crdb| {
            let endpoint = if private { &crdb.private_endpoint } else { &crdb.public_endpoint };
            Some((crdb.region.clone()?, endpoint.clone()?))
        })
        .collect()
}

fn set_state(data: &mut ResourceData, db: &Database, tags: &BTreeMap<String, String>) {
    let overrides = reconcile_regions(&region_values(db), &globals(data), data.raw_config(), Some(data.state()));
    let overrides = ordered_like(data.get(OVERRIDE_REGION), overrides, "name");

    data.set("db_id", db.database_id);
    data.set_opt("name", db.name.clone());
    set_sizing(data, db);
    data.set_opt("support_oss_cluster_api", db.support_oss_cluster_api);
    data.set_opt(
        "external_endpoint_for_oss_cluster_api",
        db.use_external_endpoint_for_oss_cluster_api,
    );
    data.set_opt("redis_version", db.redis_version.clone());
    data.set_opt("resp_version", db.resp_version.clone());
    data.set_opt("data_eviction", db.data_eviction_policy.clone());
    if let Some(tls) = db.security.as_ref().and_then(|s| s.enable_tls) {
        data.set("enable_tls", tls);
    }

    let public = endpoints(db, false);
    if let Some(port) = public
        .values()
        .next()
        .and_then(|e| e.rsplit_once(':'))
        .and_then(|(_, p)| p.parse::<i64>().ok())
    {
        data.set("port", port);
    }
    data.set("public_endpoint", json!(public));
    data.set("private_endpoint", json!(endpoints(db, true)));

    let current = data.get_strings("global_modules");
    let modules = db.modules.iter().map(|m| m.name.clone()).collect();
    data.set("global_modules", strings_like(&current, modules));

    // Globals are not reported; keep the declared alert order stable
    let global_alerts: Vec<Alert> = alerts(data, "global_alert");
    let global_alert = alerts_state(data.get("global_alert"), &global_alerts);
    data.set("global_alert", global_alert);

    data.set(OVERRIDE_REGION, overrides);
    data.set("tags", json!(tags));
}

#[async_trait]
impl Resource for ActiveActiveDatabaseResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn family(&self) -> ResourceFamily {
        ResourceFamily::Database
    }

    fn schema(&self) -> Schema {
        let block = Block::new()
            .attr("subscription_id", Attribute::string().required().force_new())
            .attr("db_id", Attribute::int().computed())
            .attr("name", Attribute::string().required().force_new())
            .attr(
                "memory_limit_in_gb",
                Attribute::float().optional().computed().validate(Validation::FloatAtLeast(0.1)),
            )
            .attr(
                "dataset_size_in_gb",
                Attribute::float().optional().computed().validate(Validation::FloatAtLeast(0.1)),
            )
            .attr("support_oss_cluster_api", Attribute::bool().default(false))
            .attr("external_endpoint_for_oss_cluster_api", Attribute::bool().default(false))
            .attr("redis_version", Attribute::string().optional().computed().force_new())
            .attr(
                "resp_version",
                Attribute::string().optional().computed().validate(Validation::OneOf(RESP_VERSIONS)),
            )
            .attr(
                "data_eviction",
                Attribute::string().default("volatile-lru").validate(Validation::OneOf(EVICTION_POLICIES)),
            )
            .attr("enable_tls", Attribute::bool().optional().computed())
            .attr("client_ssl_certificate", Attribute::string().optional())
            .attr(
                "client_tls_certificates",
                Attribute::list(AttrType::String).optional().conflicts_with(&["client_ssl_certificate"]),
            )
            .attr("port", Attribute::int().optional().computed().force_new())
            .attr(
                "global_data_persistence",
                Attribute::string()
                    .optional()
                    .computed()
                    .validate(Validation::OneOf(PERSISTENCE_KINDS)),
            )
            .attr("global_password", Attribute::string().optional().computed().sensitive())
            .attr("global_enable_default_user", Attribute::bool().default(true))
            .attr("global_source_ips", cidr_set().optional())
            .attr("global_alert", alert_block())
            .attr(
                "global_modules",
                Attribute::set(AttrType::String).optional().computed().force_new(),
            )
            .attr(OVERRIDE_REGION, override_region_block())
            .attr("public_endpoint", Attribute::map(AttrType::String).computed())
            .attr("private_endpoint", Attribute::map(AttrType::String).computed())
            .attr("tags", Attribute::map(AttrType::String).optional());
        Schema::resource(block, Some(Timeouts::minutes(30, 10, 30, 10)))
    }

    fn validate(&self, config: &Value) -> Diagnostics {
        let mut diags = validate_database(config);
        diags.extend(check_memory_or_dataset(config, ""));
        diags.extend(check_unique_region_names(config, OVERRIDE_REGION, "name"));
        diags
    }

    fn customize_diff(&self, diff: &mut ResourceDiff<'_>) -> Result<()> {
        check_backup_time_utc(diff).into_result()?;
        Ok(())
    }

    async fn create(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let sub = subscription_id(data)?;
        let client = state.client();
        let timeout = data.timeout(Operation::Create);

        {
            let _guard = state.lock_subscription(ctx, sub).await?;
            cloud::wait_for_subscription_active(ctx, client, sub, timeout).await?;

            let regions: Vec<String> = state
                .regions()
                .list(sub)
                .await?
                .into_iter()
                .filter_map(|r| r.region)
                .collect();
            let request = create_request(data, &regions);
            let task = state.databases().create_active_active(sub, &request).await?;
            let db = cloud::complete_task(ctx, client, task, timeout)
                .await?
                .resource_id()?;
            let id = DatabaseId::new(sub, db);
            data.set_id(id.to_string());
            data.set("db_id", db);
            info!(database = %id, regions = regions.len(), "Active-Active database created");
            cloud::wait_for_database_active(ctx, client, sub, db, timeout).await?;

            // Region overrides can only be applied once the database exists
            let overrides = update_request(data, true);
            if has_content(&overrides)? {
                let task = state.databases().update_active_active(sub, db, &overrides).await?;
                cloud::complete_task(ctx, client, task, timeout).await?;
                cloud::wait_for_database_active(ctx, client, sub, db, timeout).await?;
            }

            let tags = data.get_map("tags");
            if !tags.is_empty() {
                state.tags().put(sub, db, &tags).await?;
            }
            cloud::wait_for_subscription_active(ctx, client, sub, timeout).await?;
        }

        self.read(ctx, state, data).await
    }

    async fn read(&self, _ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let id = database_id(data)?;
        let result = state.databases().get(id.subscription_id, id.database_id).await;
        let Some(db) = found(data, self.family(), result)? else {
            return Ok(());
        };
        let tags = state.tags().get(id.subscription_id, id.database_id).await?;

        data.set_id(id.to_string());
        data.set("subscription_id", id.subscription_id.to_string());
        set_state(data, &db, &tags);
        Ok(())
    }

    async fn update(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let id = database_id(data)?;
        let (sub, db) = (id.subscription_id, id.database_id);
        let client = state.client();
        let timeout = data.timeout(Operation::Update);
        let request = update_request(data, false);

        {
            let _guard = state.lock_subscription(ctx, sub).await?;
            cloud::wait_for_subscription_active(ctx, client, sub, timeout).await?;
            cloud::wait_for_database_active(ctx, client, sub, db, timeout).await?;

            if has_content(&request)? {
                debug!(database = %id, regions = request.regions.len(), "Updating Active-Active database");
                let task = state.databases().update_active_active(sub, db, &request).await?;
                cloud::complete_task(ctx, client, task, timeout).await?;
                cloud::wait_for_database_active(ctx, client, sub, db, timeout).await?;
            }
            if data.has_change("tags") {
                state.tags().put(sub, db, &data.get_map("tags")).await?;
            }
            cloud::wait_for_subscription_active(ctx, client, sub, timeout).await?;
        }

        self.read(ctx, state, data).await
    }

    async fn delete(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let id = database_id(data)?;
        let client = state.client();
        let timeout = data.timeout(Operation::Delete);

        let _guard = state.lock_subscription(ctx, id.subscription_id).await?;
        cloud::wait_for_database_active(ctx, client, id.subscription_id, id.database_id, timeout).await?;
        cloud::delete_database_and_wait(ctx, client, id.subscription_id, id.database_id, timeout).await?;
        cloud::wait_for_subscription_active(ctx, client, id.subscription_id, timeout).await?;
        Ok(())
    }

    async fn import(&self, _ctx: &OperationContext, _state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        import_database_id(data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn state(overrides: Value) -> Value {
        json!({
            "id": "1234/5678",
            "subscription_id": "1234",
            "name": "global-db",
            "global_data_persistence": "none",
            "global_password": "global-pass",
            "global_enable_default_user": true,
            "global_source_ips": ["10.0.0.0/16"],
            "override_region": overrides,
        })
    }

    #[test]
    fn test_create_overrides_only_carry_set_fields() {
        let data = ResourceData::new(state(json!([
            {"name": "us-east-1", "override_global_data_persistence": "aof-every-write"},
            {"name": "eu-west-1"}
        ])));
        let request = update_request(&data, true);
        assert_eq!(request.regions.len(), 1);
        assert_eq!(request.regions[0].region, "us-east-1");
        assert_eq!(request.regions[0].data_persistence.as_deref(), Some("aof-every-write"));
        assert!(request.regions[0].source_ip.is_none());
        assert!(request.global_password.is_none());
    }

    #[test]
    fn test_removed_override_resets_to_global() {
        let prior = state(json!([{
            "name": "us-east-1",
            "override_global_source_ips": ["192.168.0.0/16"],
            "override_global_password": "region-pass"
        }]));
        let current = state(json!([{"name": "us-east-1"}]));
        let data = ResourceData::from_parts(current, Some(prior), None, Timeouts::default());

        let request = update_request(&data, false);
        assert_eq!(request.regions.len(), 1);
        let region = &request.regions[0];
        assert_eq!(region.source_ip, Some(vec!["10.0.0.0/16".to_string()]));
        assert_eq!(region.password.as_deref(), Some("global-pass"));
        assert!(region.data_persistence.is_none());
        assert!(request.global_source_ip.is_none());
    }

    #[test]
    fn test_unchanged_regions_are_not_sent() {
        let overrides = json!([{"name": "us-east-1", "override_global_data_persistence": "aof-every-write"}]);
        let data = ResourceData::from_parts(
            state(overrides.clone()),
            Some(state(overrides)),
            None,
            Timeouts::default(),
        );
        let request = update_request(&data, false);
        assert!(!has_content(&request).unwrap());
    }

    #[test]
    fn test_refresh_surfaces_only_real_overrides() {
        let db: Database = serde_json::from_value(json!({
            "databaseId": 5678,
            "name": "global-db",
            "crdbDatabases": [
                {"region": "us-east-1", "dataPersistence": "aof-every-write",
                 "publicEndpoint": "redis-5678.us-east-1.example.com:12000",
                 "security": {"password": "global-pass", "enableDefaultUser": true, "sourceIps": ["10.0.0.0/16"]}},
                {"region": "eu-west-1", "dataPersistence": "none",
                 "publicEndpoint": "redis-5678.eu-west-1.example.com:12000",
                 "security": {"password": "global-pass", "enableDefaultUser": true, "sourceIps": ["10.0.0.0/16"]}}
            ]
        }))
        .unwrap();
        let mut data = ResourceData::new(state(json!([])));
        set_state(&mut data, &db, &BTreeMap::new());

        assert_eq!(
            data.get("override_region"),
            Some(&json!([{"name": "us-east-1", "override_global_data_persistence": "aof-every-write"}]))
        );
        assert_eq!(data.get_i64("port"), Some(12000));
        assert_eq!(
            data.get_str("public_endpoint.eu-west-1"),
            Some("redis-5678.eu-west-1.example.com:12000")
        );
    }
}
