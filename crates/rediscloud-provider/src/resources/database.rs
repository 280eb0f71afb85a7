//! `rediscloud_subscription_database`: a database in a Pro subscription

use std::collections::BTreeMap;

use async_trait::async_trait;
use rediscloud_core::api::Database;
use rediscloud_core::api::databases::{ClientTlsCertificate, DatabaseRequest, Replica, SyncSource};
use rediscloud_core::{DatabaseId, OperationContext, ResourceFamily, cloud};
use serde_json::{Value, json};
use tracing::{debug, info};

use super::common::{
    EVICTION_POLICIES, PERSISTENCE_KINDS, PROTOCOLS, RESP_VERSIONS, THROUGHPUT_BY, alert_block,
    alerts, alerts_state, backup_state, cidr_set, found, module_block, modules, modules_state,
    remote_backup, remote_backup_block, strings_like, subscription_id, throughput,
};
use crate::error::Result;
use crate::host::{
    AttrType, Attribute, Block, Diagnostics, Operation, Resource, ResourceData, ResourceDiff,
    Schema, Timeouts, Validation,
};
use crate::reconcile::filter_default_source_ips;
use crate::state::ProviderState;
use crate::validate::{
    check_backup_time_utc, check_memory_or_dataset, check_query_performance_factor, check_tags,
    check_tls_certificates, validate_replica_uri,
};

pub const TYPE_NAME: &str = "rediscloud_subscription_database";

pub struct DatabaseResource;

/// Parse the resource ID, falling back to `subscription_id` for the
/// single-part form
pub(super) fn database_id(data: &ResourceData) -> Result<DatabaseId> {
    let fallback = data.get_i64("subscription_id");
    Ok(DatabaseId::parse_with_fallback(data.id(), fallback)?)
}

/// Import `<subId>/<dbId>` into the resource's own attributes
pub(super) fn import_database_id(data: &mut ResourceData) -> Result<()> {
    let id: DatabaseId = data.id().parse()?;
    data.set_id(id.to_string());
    data.set("subscription_id", id.subscription_id.to_string());
    data.set("db_id", id.database_id);
    Ok(())
}

fn replica(data: &ResourceData) -> Option<Replica> {
    let sources = data.get_strings("replica_of");
    Some(Replica {
        sync_sources: sources
            .into_iter()
            .map(|endpoint| SyncSource {
                endpoint,
                encryption: None,
                server_cert: None,
            })
            .collect(),
    })
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

/// Full request on create; only changed fields on update
fn request(data: &ResourceData, create: bool) -> DatabaseRequest {
    let changed = |path: &str| create || data.has_change(path);
    let mut request = DatabaseRequest::default();

    if changed("name") {
        request.name = data.get_string("name");
    }
    if create {
        request.protocol = data.get_string("protocol");
        request.port = data.get_i64("port");
        request.modules = Some(modules(data, "modules")).filter(|m| !m.is_empty());
        request.resp_version = data.get_string("resp_version");
        request.redis_version = data.get_string("redis_version");
    } else if data.has_change("resp_version") {
        request.resp_version = data.get_string("resp_version");
    }
    if changed("memory_limit_in_gb") {
        request.memory_limit_in_gb = data.get_f64("memory_limit_in_gb");
    }
    if changed("dataset_size_in_gb") {
        request.dataset_size_in_gb = data.get_f64("dataset_size_in_gb");
    }
    if changed("support_oss_cluster_api") {
        request.support_oss_cluster_api = data.get_bool("support_oss_cluster_api");
    }
    if changed("external_endpoint_for_oss_cluster_api") {
        request.use_external_endpoint_for_oss_cluster_api =
            data.get_bool("external_endpoint_for_oss_cluster_api");
    }
    if changed("data_persistence") {
        request.data_persistence = data.get_string("data_persistence");
    }
    if changed("data_eviction") {
        request.data_eviction_policy = data.get_string("data_eviction");
    }
    if changed("replication") {
        request.replication = data.get_bool("replication");
    }
    if changed("throughput_measurement_by") || changed("throughput_measurement_value") {
        request.throughput_measurement = throughput(data, "");
    }
    if changed("average_item_size_in_bytes") {
        request.average_item_size_in_bytes = data.get_i64("average_item_size_in_bytes");
    }
    if changed("password") {
        request.password = data.get_string("password");
    }
    if changed("enable_default_user") {
        request.enable_default_user = data.get_bool("enable_default_user");
    }
    if changed("source_ips") {
        let ips = data.get_strings("source_ips");
        request.source_ip = if ips.is_empty() && create { None } else { Some(ips) };
    }
    if changed("alert") {
        request.alerts = Some(alerts(data, "alert"));
    }
    if changed("replica_of") && (!create || !data.get_strings("replica_of").is_empty()) {
        request.replica = replica(data);
    }
    if changed("remote_backup") && (!create || data.get_block("remote_backup").is_some()) {
        request.remote_backup = Some(remote_backup(data, "remote_backup"));
    }
    if changed("enable_tls") || changed("client_ssl_certificate") || changed("client_tls_certificates") {
        request.enable_tls = data.get_bool("enable_tls");
        request.client_ssl_certificate = data.get_string("client_ssl_certificate");
        request.client_tls_certificates = client_certificates(data);
    }
    if changed("hashing_policy") {
        let rules = data.get_strings("hashing_policy");
        request.regex_rules = (!rules.is_empty()).then_some(rules);
    }
    if changed("query_performance_factor") {
        request.query_performance_factor = data.get_string("query_performance_factor");
    }
    request
}

async fn put_tags(
    state: &ProviderState,
    data: &ResourceData,
    id: DatabaseId,
) -> Result<()> {
    let tags: BTreeMap<String, String> = data.get_map("tags");
    debug!(database = %id, count = tags.len(), "Writing tags");
    state.tags().put(id.subscription_id, id.database_id, &tags).await?;
    Ok(())
}

/// Fields shared by the Pro and Active-Active database state
pub(super) fn set_sizing(data: &mut ResourceData, db: &Database) {
    // Only the measure the user chose, so refresh does not flip between them
    if data.get("dataset_size_in_gb").is_some() {
        data.set_opt("dataset_size_in_gb", db.dataset_size_in_gb);
    } else if data.get("memory_limit_in_gb").is_some() {
        data.set_opt("memory_limit_in_gb", db.memory_limit_in_gb);
    } else {
        data.set_opt("dataset_size_in_gb", db.dataset_size_in_gb);
        data.set_opt("memory_limit_in_gb", db.memory_limit_in_gb);
    }
}

fn set_state(data: &mut ResourceData, db: &Database, tags: &BTreeMap<String, String>) {
    data.set("db_id", db.database_id);
    data.set_opt("name", db.name.clone());
    data.set_opt("protocol", db.protocol.clone());
    set_sizing(data, db);
    data.set_opt("support_oss_cluster_api", db.support_oss_cluster_api);
    data.set_opt(
        "external_endpoint_for_oss_cluster_api",
        db.use_external_endpoint_for_oss_cluster_api,
    );
    data.set_opt("resp_version", db.resp_version.clone());
    data.set_opt("redis_version", db.redis_version.clone());
    data.set_opt("data_persistence", db.data_persistence.clone());
    data.set_opt("data_eviction", db.data_eviction_policy.clone());
    data.set_opt("replication", db.replication);
    if let Some(t) = &db.throughput_measurement {
        data.set("throughput_measurement_by", t.by.clone());
        data.set("throughput_measurement_value", t.value);
    }
    data.set_opt("query_performance_factor", db.query_performance_factor.clone());
    data.set_opt("public_endpoint", db.public_endpoint.clone());
    data.set_opt("private_endpoint", db.private_endpoint.clone());
    if let Some(port) = db
        .public_endpoint
        .as_deref()
        .and_then(|e| e.rsplit_once(':'))
        .and_then(|(_, p)| p.parse::<i64>().ok())
    {
        data.set("port", port);
    }

    if let Some(security) = &db.security {
        if let Some(password) = &security.password {
            data.set("password", password.clone());
        }
        data.set_opt("enable_default_user", security.enable_default_user);
        if let Some(tls) = security.enable_tls {
            data.set("enable_tls", tls);
        }
        let current = data.get_strings("source_ips");
        let ips = filter_default_source_ips(&security.source_ips);
        data.set("source_ips", strings_like(&current, ips));
    }

    let replica_of: Vec<String> = db
        .replica
        .as_ref()
        .map(|r| r.sync_sources.iter().map(|s| s.endpoint.clone()).collect())
        .unwrap_or_default();
    let current = data.get_strings("replica_of");
    data.set("replica_of", strings_like(&current, replica_of));

    let rules: Vec<String> = db
        .clustering
        .as_ref()
        .map(|c| c.regex_rules.iter().map(|r| r.pattern.clone()).collect())
        .unwrap_or_default();
    if data.get("hashing_policy").is_some() {
        data.set("hashing_policy", rules);
    }

    let alert = alerts_state(data.get("alert"), &db.alerts);
    data.set("alert", alert);
    let module_state = modules_state(data.get("modules"), &db.modules);
    data.set("modules", module_state);
    data.set("remote_backup", backup_state(db.backup.as_ref()));
    data.set("tags", json!(tags));
}

pub(super) fn database_attributes(block: Block) -> Block {
    block
        .attr(
            "subscription_id",
            Attribute::string().required().force_new().description("The owning subscription"),
        )
        .attr("db_id", Attribute::int().computed())
        .attr("name", Attribute::string().required())
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
        .attr(
            "resp_version",
            Attribute::string().optional().computed().validate(Validation::OneOf(RESP_VERSIONS)),
        )
        .attr("redis_version", Attribute::string().optional().computed().force_new())
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
        .attr("password", Attribute::string().optional().computed().sensitive())
        .attr("enable_default_user", Attribute::bool().default(true))
        .attr("modules", module_block())
        .attr("alert", alert_block())
        .attr("public_endpoint", Attribute::string().computed())
        .attr("private_endpoint", Attribute::string().computed())
        .attr(
            "tags",
            Attribute::map(AttrType::String).optional().description("Lower-case key/value pairs"),
        )
}

pub(super) fn validate_database(config: &Value) -> Diagnostics {
    let mut diags = check_tls_certificates(config);
    diags.extend(check_query_performance_factor(config, ""));
    diags.extend(check_tags(config, "tags"));
    diags
}

#[async_trait]
impl Resource for DatabaseResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn family(&self) -> ResourceFamily {
        ResourceFamily::Database
    }

    fn schema(&self) -> Schema {
        let block = database_attributes(Block::new())
            .attr(
                "protocol",
                Attribute::string()
                    .default("redis")
                    .force_new()
                    .validate(Validation::OneOf(PROTOCOLS)),
            )
            .attr("port", Attribute::int().optional().computed().force_new())
            .attr(
                "data_persistence",
                Attribute::string().default("none").validate(Validation::OneOf(PERSISTENCE_KINDS)),
            )
            .attr("replication", Attribute::bool().default(true))
            .attr(
                "throughput_measurement_by",
                Attribute::string().required().validate(Validation::OneOf(THROUGHPUT_BY)),
            )
            .attr("throughput_measurement_value", Attribute::int().required())
            .attr("average_item_size_in_bytes", Attribute::int().optional())
            .attr("query_performance_factor", Attribute::string().optional().computed())
            .attr("source_ips", cidr_set().optional())
            .attr(
                "replica_of",
                Attribute::set(AttrType::String)
                    .optional()
                    .validate(Validation::Custom(validate_replica_uri)),
            )
            .attr("hashing_policy", Attribute::list(AttrType::String).optional())
            .attr("remote_backup", remote_backup_block());
        Schema::resource(block, Some(Timeouts::minutes(30, 10, 30, 10)))
    }

    fn validate(&self, config: &Value) -> Diagnostics {
        let mut diags = validate_database(config);
        diags.extend(check_memory_or_dataset(config, ""));
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
        let request = request(data, true);

        {
            let _guard = state.lock_subscription(ctx, sub).await?;
            cloud::wait_for_subscription_active(ctx, client, sub, timeout).await?;

            let task = state.databases().create(sub, &request).await?;
            let db = cloud::complete_task(ctx, client, task, timeout)
                .await?
                .resource_id()?;
            let id = DatabaseId::new(sub, db);
            data.set_id(id.to_string());
            data.set("db_id", db);
            info!(database = %id, "Database created");

            cloud::wait_for_database_active(ctx, client, sub, db, timeout).await?;
            if !data.get_map("tags").is_empty() {
                put_tags(state, data, id).await?;
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
        let request = request(data, false);

        {
            let _guard = state.lock_subscription(ctx, sub).await?;
            cloud::wait_for_subscription_active(ctx, client, sub, timeout).await?;
            cloud::wait_for_database_active(ctx, client, sub, db, timeout).await?;

            let body = serde_json::to_value(&request)?;
            if body.as_object().is_some_and(|o| !o.is_empty()) {
                let task = state.databases().update(sub, db, &request).await?;
                cloud::complete_task(ctx, client, task, timeout).await?;
                cloud::wait_for_database_active(ctx, client, sub, db, timeout).await?;
            }
            if data.has_change("tags") {
                put_tags(state, data, id).await?;
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
    use crate::host::UNKNOWN;
    use pretty_assertions::assert_eq;

    fn planned(config: Value) -> ResourceData {
        let schema = DatabaseResource.schema();
        ResourceData::new(ResourceDiff::new(&schema, None, config).into_planned())
    }

    #[test]
    fn test_create_request_carries_replica_and_backup() {
        let data = planned(json!({
            "subscription_id": "1234",
            "name": "replica",
            "memory_limit_in_gb": 1,
            "throughput_measurement_by": "operations-per-second",
            "throughput_measurement_value": 1000,
            "replica_of": ["redis://redis-1.example.com:6379"],
            "remote_backup": [{"interval": "every-6-hours", "storage_type": "aws-s3", "storage_path": "s3://b/p"}],
            "alert": [{"name": "dataset-size", "value": 80}]
        }));
        let request = request(&data, true);
        assert_eq!(request.protocol.as_deref(), Some("redis"));
        assert_eq!(request.data_persistence.as_deref(), Some("none"));
        assert_eq!(
            request.replica.unwrap().sync_sources[0].endpoint,
            "redis://redis-1.example.com:6379"
        );
        let backup = request.remote_backup.unwrap();
        assert!(backup.active);
        assert_eq!(backup.interval.as_deref(), Some("every-6-hours"));
        assert_eq!(request.alerts.unwrap().len(), 1);
        assert!(request.source_ip.is_none());
    }

    #[test]
    fn test_update_request_only_sends_changes() {
        let prior = json!({
            "id": "1234/5678", "subscription_id": "1234", "name": "a", "memory_limit_in_gb": 1.0,
            "throughput_measurement_by": "operations-per-second", "throughput_measurement_value": 1000,
            "replica_of": ["redis://a:6379"], "password": "p"
        });
        let mut current = prior.clone();
        current["name"] = json!("b");
        current["replica_of"] = json!([]);
        let data = ResourceData::from_parts(current, Some(prior), None, Timeouts::default());
        let request = request(&data, false);
        assert_eq!(request.name.as_deref(), Some("b"));
        assert!(request.password.is_none());
        assert!(request.memory_limit_in_gb.is_none());
        assert_eq!(request.replica.map(|r| r.sync_sources.len()), Some(0));
    }

    #[test]
    fn test_import_id_fills_parent_attributes() {
        let mut data = ResourceData::for_import("1234/5678");
        import_database_id(&mut data).unwrap();
        assert_eq!(data.get_str("subscription_id"), Some("1234"));
        assert_eq!(data.get_i64("db_id"), Some(5678));

        let mut bad = ResourceData::for_import("1234/x");
        assert!(import_database_id(&mut bad).is_err());
    }

    #[test]
    fn test_single_part_id_uses_subscription_attribute() {
        let data = ResourceData::new(json!({"id": "5678", "subscription_id": "1234"}));
        assert_eq!(database_id(&data).unwrap(), DatabaseId::new(1234, 5678));
    }

    #[test]
    fn test_backup_time_requires_daily_interval() {
        let schema = DatabaseResource.schema();
        let config = json!({
            "subscription_id": "1", "name": "a", "memory_limit_in_gb": 1,
            "throughput_measurement_by": "operations-per-second", "throughput_measurement_value": 1000,
            "remote_backup": [{"interval": "every-1-hours", "time_utc": "02:00", "storage_type": "aws-s3", "storage_path": "s3://b"}]
        });
        let mut diff = ResourceDiff::new(&schema, None, config);
        let err = DatabaseResource.customize_diff(&mut diff).unwrap_err();
        let diags = Diagnostics::from(err);
        let diag = diags.iter().next().unwrap();
        assert_eq!(diag.attribute.as_deref(), Some("remote_backup.0.time_utc"));
    }

    #[test]
    fn test_unknown_sizing_is_left_alone() {
        let mut data = ResourceData::new(json!({"memory_limit_in_gb": 2.0, "dataset_size_in_gb": UNKNOWN}));
        let db = Database {
            memory_limit_in_gb: Some(2.0),
            dataset_size_in_gb: Some(1.0),
            ..Default::default()
        };
        set_sizing(&mut data, &db);
        assert_eq!(data.get_f64("memory_limit_in_gb"), Some(2.0));
        assert!(data.get("dataset_size_in_gb").is_none());
    }
}
