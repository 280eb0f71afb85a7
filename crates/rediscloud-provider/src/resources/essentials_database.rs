//! `rediscloud_essentials_database`: a database in an Essentials subscription
//!
//! Sizing comes from the subscription's plan; only pay-as-you-go plans take
//! an explicit memory or dataset size.

use std::collections::BTreeMap;

use async_trait::async_trait;
use rediscloud_core::api::databases::{ClientTlsCertificate, Replica, SyncSource};
use rediscloud_core::api::fixed::FixedDatabaseRequest;
use rediscloud_core::api::{BackupStatus, FixedDatabase, ImportStatus};
use rediscloud_core::{DatabaseId, OperationContext, ResourceFamily, cloud};
use serde_json::{Value, json};
use tracing::{info, warn};

use super::common::{
    EVICTION_POLICIES, PERSISTENCE_KINDS, PROTOCOLS, RESP_VERSIONS, alert_block, alerts,
    alerts_state, cidr_set, found, module_block, modules, modules_state, strings_like,
    subscription_id,
};
use super::database::{database_id, import_database_id};
use crate::error::Result;
use crate::host::{
    AttrType, Attribute, Block, Diagnostics, Operation, Resource, ResourceData, Schema, Timeouts,
    Validation,
};
use crate::reconcile::filter_default_source_ips;
use crate::state::ProviderState;
use crate::validate::{check_tags, validate_replica_uri};

pub const TYPE_NAME: &str = "rediscloud_essentials_database";

pub struct EssentialsDatabaseResource;

fn request(data: &ResourceData, create: bool) -> FixedDatabaseRequest {
    let changed = |path: &str| create || data.has_change(path);
    let mut request = FixedDatabaseRequest::default();

    if changed("name") {
        request.name = data.get_string("name");
    }
    if create {
        request.protocol = data.get_string("protocol");
        request.redis_version = data.get_string("redis_version");
        request.modules = Some(modules(data, "modules")).filter(|m| !m.is_empty());
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
    if changed("resp_version") {
        request.resp_version = data.get_string("resp_version");
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
    if changed("periodic_backup_path") {
        request.periodic_backup_path = data.get_string("periodic_backup_path");
    }
    if changed("source_ips") {
        let ips = data.get_strings("source_ips");
        request.source_ips = (!(create && ips.is_empty())).then_some(ips);
    }
    if changed("replica_of") {
        let sources = data.get_strings("replica_of");
        if !(create && sources.is_empty()) {
            request.replica = Some(Replica {
                sync_sources: sources
                    .into_iter()
                    .map(|endpoint| SyncSource {
                        endpoint,
                        ..Default::default()
                    })
                    .collect(),
            });
        }
    }
    if changed("enable_tls") || changed("client_tls_certificates") {
        request.enable_tls = data.get_bool("enable_tls");
        let certificates = data.get_strings("client_tls_certificates");
        request.client_tls_certificates = (!certificates.is_empty()).then(|| {
            certificates
                .into_iter()
                .map(|pem| ClientTlsCertificate {
                    public_certificate_pem_string: pem,
                })
                .collect()
        });
    }
    if changed("password") {
        request.password = data.get_string("password");
    }
    if changed("enable_default_user") {
        request.enable_default_user = data.get_bool("enable_default_user");
    }
    if changed("alert") {
        request.alerts = Some(alerts(data, "alert"));
    }
    request
}

fn backup_status_state(status: BackupStatus) -> Value {
    json!([{
        "status": status.status,
        "last_backup_time": status.last_backup_time,
        "failure_reason": status.failure_reason,
    }])
}

fn import_status_state(status: ImportStatus) -> Value {
    json!([{
        "status": status.status,
        "last_import_time": status.last_import_time,
        "failure_reason": status.failure_reason,
        "failure_reason_params": status.failure_reason_params.iter().map(|p| json!({
            "key": p.key,
            "value": p.value,
        })).collect::<Vec<_>>(),
    }])
}

fn set_state(data: &mut ResourceData, db: &FixedDatabase, tags: &BTreeMap<String, String>) {
    data.set("db_id", db.database_id);
    data.set_opt("name", db.name.clone());
    data.set_opt("protocol", db.protocol.clone());
    data.set_opt("redis_version", db.redis_version.clone());
    data.set_opt("resp_version", db.resp_version.clone());
    data.set_opt("status", db.status.clone());
    data.set_opt("activated_on", db.activated_on.clone());
    data.set_opt("memory_used_in_mb", db.memory_used_in_mb);
    data.set_opt("memory_limit_in_gb", db.plan_memory_limit);
    data.set_opt("dataset_size_in_gb", db.plan_dataset_size);
    data.set_opt("data_persistence", db.data_persistence.clone());
    data.set_opt("data_eviction", db.data_eviction_policy.clone());
    data.set_opt("replication", db.replication);
    data.set_opt("public_endpoint", db.public_endpoint.clone());
    data.set_opt("private_endpoint", db.private_endpoint.clone());
    if let Some(clustering) = &db.clustering {
        data.set_opt("support_oss_cluster_api", clustering.enabled);
    }

    if let Some(security) = &db.security {
        if let Some(password) = &security.password {
            data.set("password", password.clone());
        }
        data.set_opt("enable_default_user", security.enable_default_user);
        data.set_opt("enable_tls", security.enable_tls);
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

    let alert = alerts_state(data.get("alert"), &db.alerts);
    data.set("alert", alert);
    let module_state = modules_state(data.get("modules"), &db.modules);
    data.set("modules", module_state);
    data.set("tags", json!(tags));
}

#[async_trait]
impl Resource for EssentialsDatabaseResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn family(&self) -> ResourceFamily {
        ResourceFamily::FixedDatabase
    }

    fn schema(&self) -> Schema {
        let backup_status = Block::new()
            .attr("status", Attribute::string().computed())
            .attr("last_backup_time", Attribute::string().computed())
            .attr("failure_reason", Attribute::string().computed());
        let import_status = Block::new()
            .attr("status", Attribute::string().computed())
            .attr("last_import_time", Attribute::string().computed())
            .attr("failure_reason", Attribute::string().computed())
            .attr(
                "failure_reason_params",
                Attribute::list_block(
                    Block::new()
                        .attr("key", Attribute::string().computed())
                        .attr("value", Attribute::string().computed()),
                )
                .computed(),
            );
        let block = Block::new()
            .attr("subscription_id", Attribute::string().required().force_new())
            .attr("db_id", Attribute::int().computed())
            .attr("name", Attribute::string().required())
            .attr(
                "protocol",
                Attribute::string()
                    .default("redis")
                    .force_new()
                    .validate(Validation::OneOf(PROTOCOLS)),
            )
            .attr("memory_limit_in_gb", Attribute::float().optional().computed())
            .attr("dataset_size_in_gb", Attribute::float().optional().computed())
            .attr("memory_used_in_mb", Attribute::float().computed())
            .attr("support_oss_cluster_api", Attribute::bool().optional().computed())
            .attr("redis_version", Attribute::string().optional().computed().force_new())
            .attr(
                "resp_version",
                Attribute::string().optional().computed().validate(Validation::OneOf(RESP_VERSIONS)),
            )
            .attr(
                "data_persistence",
                Attribute::string().default("none").validate(Validation::OneOf(PERSISTENCE_KINDS)),
            )
            .attr(
                "data_eviction",
                Attribute::string().default("volatile-lru").validate(Validation::OneOf(EVICTION_POLICIES)),
            )
            .attr("replication", Attribute::bool().optional().computed())
            .attr("periodic_backup_path", Attribute::string().optional())
            .attr("source_ips", cidr_set().optional())
            .attr(
                "replica_of",
                Attribute::set(AttrType::String)
                    .optional()
                    .validate(Validation::Custom(validate_replica_uri)),
            )
            .attr("client_tls_certificates", Attribute::list(AttrType::String).optional())
            .attr("enable_tls", Attribute::bool().optional().computed())
            .attr("password", Attribute::string().optional().computed().sensitive())
            .attr("enable_default_user", Attribute::bool().default(true))
            .attr("alert", alert_block())
            .attr("modules", module_block())
            .attr("tags", Attribute::map(AttrType::String).optional())
            .attr("public_endpoint", Attribute::string().computed())
            .attr("private_endpoint", Attribute::string().computed())
            .attr("status", Attribute::string().computed())
            .attr("activated_on", Attribute::string().computed())
            .attr("latest_backup_status", Attribute::list_block(backup_status).computed())
            .attr("latest_import_status", Attribute::list_block(import_status).computed());
        Schema::resource(block, Some(Timeouts::minutes(10, 10, 10, 10)))
    }

    fn validate(&self, config: &Value) -> Diagnostics {
        check_tags(config, "tags")
    }

    async fn create(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let sub = subscription_id(data)?;
        let client = state.client();
        let timeout = data.timeout(Operation::Create);
        let request = request(data, true);

        {
            let _guard = state.lock_subscription(ctx, sub).await?;
            cloud::wait_for_fixed_subscription_active(ctx, client, sub, timeout).await?;

            let task = state.fixed_databases().create(sub, &request).await?;
            let db = cloud::complete_task(ctx, client, task, timeout)
                .await?
                .resource_id()?;
            let id = DatabaseId::new(sub, db);
            data.set_id(id.to_string());
            data.set("db_id", db);
            info!(database = %id, "Essentials database created");

            cloud::wait_for_fixed_database_active(ctx, client, sub, db, timeout).await?;
            let tags = data.get_map("tags");
            if !tags.is_empty() {
                state.tags().put_fixed(sub, db, &tags).await?;
            }
            cloud::wait_for_fixed_subscription_active(ctx, client, sub, timeout).await?;
        }

        self.read(ctx, state, data).await
    }

    async fn read(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let id = database_id(data)?;
        let (sub, db_id) = (id.subscription_id, id.database_id);
        let Some(db) = found(data, self.family(), state.fixed_databases().get(sub, db_id).await)? else {
            return Ok(());
        };
        let tags = state.tags().get_fixed(sub, db_id).await?;

        data.set_id(id.to_string());
        data.set("subscription_id", sub.to_string());
        set_state(data, &db, &tags);

        // Status reads are informational; a failure leaves them empty
        let backup = match state.backups().latest_backup_fixed(ctx, sub, db_id).await {
            Ok(status) => backup_status_state(status),
            Err(e) => {
                warn!(database = %id, error = %e, "Could not read latest backup status");
                json!([])
            }
        };
        data.set("latest_backup_status", backup);
        let import = match state.backups().latest_import_fixed(ctx, sub, db_id).await {
            Ok(status) => import_status_state(status),
            Err(e) => {
                warn!(database = %id, error = %e, "Could not read latest import status");
                json!([])
            }
        };
        data.set("latest_import_status", import);
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
            cloud::wait_for_fixed_subscription_active(ctx, client, sub, timeout).await?;
            cloud::wait_for_fixed_database_active(ctx, client, sub, db, timeout).await?;

            let body = serde_json::to_value(&request)?;
            if body.as_object().is_some_and(|o| !o.is_empty()) {
                let task = state.fixed_databases().update(sub, db, &request).await?;
                cloud::complete_task(ctx, client, task, timeout).await?;
                cloud::wait_for_fixed_database_active(ctx, client, sub, db, timeout).await?;
            }
            if data.has_change("tags") {
                state.tags().put_fixed(sub, db, &data.get_map("tags")).await?;
            }
            cloud::wait_for_fixed_subscription_active(ctx, client, sub, timeout).await?;
        }

        self.read(ctx, state, data).await
    }

    async fn delete(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let id = database_id(data)?;
        let (sub, db) = (id.subscription_id, id.database_id);
        let client = state.client();
        let timeout = data.timeout(Operation::Delete);

        let _guard = state.lock_subscription(ctx, sub).await?;
        cloud::wait_for_fixed_database_active(ctx, client, sub, db, timeout).await?;
        let task = state.fixed_databases().delete(sub, db).await?;
        cloud::complete_task(ctx, client, task, timeout).await?;
        cloud::wait_for_fixed_database_deleted(ctx, client, sub, db, timeout).await?;
        cloud::wait_for_fixed_subscription_active(ctx, client, sub, timeout).await?;
        Ok(())
    }

    async fn import(&self, _ctx: &OperationContext, _state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        import_database_id(data)
    }
}
