//! Provider registry and host dispatch
//!
//! The host drives every resource through the same entry points: validate,
//! plan, apply, read and import. [`Provider`] owns the type registry and the
//! configured [`ProviderState`], applies schema defaults and suppression,
//! derives per-operation deadlines and converts errors to diagnostics.

use std::collections::BTreeMap;
use std::sync::Arc;

use rediscloud_core::{ClientOptions, CloudClient, OperationContext, ProviderConfig, Setting};
use serde::Serialize;
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, info, warn};

use crate::error::{ProviderError, Result};
use crate::host::value::is_unknown;
use crate::host::{
    Attribute, Block, DataSource, Diagnostic, Diagnostics, Operation, Resource, ResourceData,
    ResourceDiff, Schema,
};
use crate::state::ProviderState;
use crate::{data_sources, resources};

/// Schemas for the provider block and every registered type
#[derive(Debug, Clone)]
pub struct ProviderSchema {
    pub provider: Schema,
    pub resources: BTreeMap<&'static str, Schema>,
    pub data_sources: BTreeMap<&'static str, Schema>,
}

/// Outcome of planning one resource change
#[derive(Debug, Clone, Default, Serialize)]
pub struct PlanResult {
    /// `None` plans a destroy
    pub planned_state: Option<Value>,
    /// Attribute paths whose change forces replacement
    pub requires_replace: Vec<String>,
    /// Changed leaf paths
    pub changes: Vec<String>,
    pub diagnostics: Diagnostics,
}

/// Outcome of applying one resource change
#[derive(Debug, Clone, Default, Serialize)]
pub struct ApplyResult {
    /// `None` when the resource no longer exists
    pub new_state: Option<Value>,
    pub diagnostics: Diagnostics,
}

pub struct Provider {
    resources: BTreeMap<&'static str, Arc<dyn Resource>>,
    data_sources: BTreeMap<&'static str, Arc<dyn DataSource>>,
    options: ClientOptions,
    state: RwLock<Option<Arc<ProviderState>>>,
}

impl Default for Provider {
    fn default() -> Self {
        Self::new()
    }
}

impl Provider {
    /// A provider with every Redis Cloud resource and data source registered
    pub fn new() -> Self {
        Self::with_options(ClientOptions::default())
    }

    pub fn with_options(options: ClientOptions) -> Self {
        let mut provider = Self::empty(options);
        for resource in resources::all() {
            provider.register_resource(resource);
        }
        for data_source in data_sources::all() {
            provider.register_data_source(data_source);
        }
        provider
    }

    /// A provider with nothing registered
    pub fn empty(options: ClientOptions) -> Self {
        Self {
            resources: BTreeMap::new(),
            data_sources: BTreeMap::new(),
            options,
            state: RwLock::new(None),
        }
    }

    pub fn register_resource(&mut self, resource: Arc<dyn Resource>) {
        self.resources.insert(resource.type_name(), resource);
    }

    pub fn register_data_source(&mut self, data_source: Arc<dyn DataSource>) {
        self.data_sources.insert(data_source.type_name(), data_source);
    }

    pub fn resource_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.resources.keys().copied()
    }

    pub fn data_source_types(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.data_sources.keys().copied()
    }

    pub fn provider_schema() -> Schema {
        Schema::provider(
            Block::new()
                .attr(
                    "url",
                    Attribute::string()
                        .optional()
                        .description("Redis Cloud API base URL. Falls back to REDISCLOUD_URL."),
                )
                .attr(
                    "api_key",
                    Attribute::string()
                        .optional()
                        .sensitive()
                        .description("Account API key. Falls back to REDISCLOUD_ACCESS_KEY."),
                )
                .attr(
                    "secret_key",
                    Attribute::string()
                        .optional()
                        .sensitive()
                        .description("User API secret. Falls back to REDISCLOUD_SECRET_KEY."),
                ),
        )
    }

    pub fn schema(&self) -> ProviderSchema {
        ProviderSchema {
            provider: Self::provider_schema(),
            resources: self
                .resources
                .iter()
                .map(|(name, r)| (*name, r.schema()))
                .collect(),
            data_sources: self
                .data_sources
                .iter()
                .map(|(name, d)| (*name, d.schema()))
                .collect(),
        }
    }

    /// Resolve credentials and build the shared client
    pub async fn configure(&self, config: &Value) -> std::result::Result<(), Diagnostics> {
        let mut diags = Diagnostics::new();
        Self::provider_schema()
            .block
            .validate_config("", config, &mut diags);
        if diags.has_errors() {
            return Err(diags);
        }

        let setting = |key: &str| match config.get(key) {
            Some(v) if is_unknown(v) => Setting::Unknown,
            Some(Value::String(s)) => Setting::Known(s.clone()),
            _ => Setting::Absent,
        };

        let resolved = ProviderConfig::resolve(setting("url"), setting("api_key"), setting("secret_key"))
            .map_err(|e| Diagnostics::from(ProviderError::from(e)))?;
        let client = CloudClient::from_config(&resolved, self.options.clone())
            .map_err(|e| Diagnostics::from(ProviderError::from(e)))?;

        info!(url = %client.base_url(), "Configured Redis Cloud provider");
        *self.state.write().await = Some(Arc::new(ProviderState::new(client)));
        Ok(())
    }

    /// Use an already-built state, bypassing credential resolution
    pub async fn configure_with(&self, state: ProviderState) {
        *self.state.write().await = Some(Arc::new(state));
    }

    async fn state(&self) -> Result<Arc<ProviderState>> {
        self.state
            .read()
            .await
            .clone()
            .ok_or(ProviderError::NotConfigured)
    }

    fn resource(&self, type_name: &str) -> Result<Arc<dyn Resource>> {
        self.resources
            .get(type_name)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownResource(type_name.to_string()))
    }

    fn data_source(&self, type_name: &str) -> Result<Arc<dyn DataSource>> {
        self.data_sources
            .get(type_name)
            .cloned()
            .ok_or_else(|| ProviderError::UnknownDataSource(type_name.to_string()))
    }

    /// Schema checks plus the resource's own cross-attribute checks
    pub fn validate_resource_config(&self, type_name: &str, config: &Value) -> Diagnostics {
        let resource = match self.resource(type_name) {
            Ok(r) => r,
            Err(e) => return e.into(),
        };
        let schema = resource.schema();
        let mut diags = Diagnostics::new();
        schema.block.validate_config("", config, &mut diags);
        if let Err(e) = schema.timeouts_for(config) {
            diags.error_at("timeouts", e);
        }
        if !diags.has_errors() {
            diags.extend(resource.validate(config));
        }
        diags
    }

    pub fn validate_data_source_config(&self, type_name: &str, config: &Value) -> Diagnostics {
        match self.data_source(type_name) {
            Ok(d) => {
                let mut diags = Diagnostics::new();
                d.schema().block.validate_config("", config, &mut diags);
                diags
            }
            Err(e) => e.into(),
        }
    }

    /// Compute the planned state. `config = None` plans a destroy.
    pub fn plan_resource_change(
        &self,
        type_name: &str,
        prior: Option<&Value>,
        config: Option<&Value>,
    ) -> std::result::Result<PlanResult, Diagnostics> {
        let resource = self.resource(type_name).map_err(Diagnostics::from)?;
        let Some(config) = config else {
            return Ok(PlanResult::default());
        };

        let diags = self.validate_resource_config(type_name, config).into_result()?;

        let schema = resource.schema();
        let prior = prior.filter(|p| !p.is_null()).cloned();
        let mut diff = ResourceDiff::new(&schema, prior, config.clone());
        diff.apply_suppressions();
        resource.customize_diff(&mut diff).map_err(Diagnostics::from)?;

        let requires_replace = diff.requires_replace();
        let changes = diff.changed_paths();
        let planned = if requires_replace.is_empty() {
            diff.into_planned()
        } else {
            debug!(resource = type_name, paths = ?requires_replace, "Change forces replacement");
            ResourceDiff::new(&schema, None, config.clone()).into_planned()
        };

        Ok(PlanResult {
            planned_state: Some(planned),
            requires_replace,
            changes,
            diagnostics: diags,
        })
    }

    /// Apply a planned change: create when there is no prior state, delete
    /// when there is no planned state, update otherwise
    pub async fn apply_resource_change(
        &self,
        ctx: &OperationContext,
        type_name: &str,
        prior: Option<Value>,
        planned: Option<Value>,
        config: Option<Value>,
    ) -> ApplyResult {
        match self.apply(ctx, type_name, prior.clone(), planned, config).await {
            Ok(result) => result,
            Err(e) => ApplyResult {
                new_state: prior,
                diagnostics: e.into(),
            },
        }
    }

    async fn apply(
        &self,
        ctx: &OperationContext,
        type_name: &str,
        prior: Option<Value>,
        planned: Option<Value>,
        config: Option<Value>,
    ) -> Result<ApplyResult> {
        let resource = self.resource(type_name)?;
        let state = self.state().await?;
        let schema = resource.schema();
        let prior = prior.filter(|p| !p.is_null());

        match (prior, planned.filter(|p| !p.is_null())) {
            (None, None) => Ok(ApplyResult::default()),
            (Some(prior), None) => {
                let timeouts = schema.timeouts_for(&prior).map_err(ProviderError::Timeouts)?;
                let mut data = ResourceData::from_parts(prior.clone(), Some(prior.clone()), None, timeouts);
                let ctx = ctx.with_timeout(timeouts.delete);
                info!(resource = type_name, id = data.id(), "Deleting");
                match resource.delete(&ctx, &state, &mut data).await {
                    Ok(()) => Ok(ApplyResult::default()),
                    Err(e) if e.is_not_found_in(resource.family()) => {
                        warn!(resource = type_name, id = data.id(), "Already deleted");
                        Ok(ApplyResult::default())
                    }
                    Err(e) => Ok(ApplyResult {
                        new_state: Some(prior),
                        diagnostics: e.into(),
                    }),
                }
            }
            (None, Some(planned)) => {
                let timeouts = schema.timeouts_for(&planned).map_err(ProviderError::Timeouts)?;
                let mut data = ResourceData::from_parts(planned, None, config, timeouts);
                let ctx = ctx.with_timeout(timeouts.create);
                info!(resource = type_name, "Creating");
                match resource.create(&ctx, &state, &mut data).await {
                    Ok(()) => Ok(ApplyResult {
                        new_state: data.has_id().then(|| data.into_state()),
                        diagnostics: Diagnostics::new(),
                    }),
                    // Keep what was created so the host can reconcile it
                    Err(e) if data.has_id() => Ok(ApplyResult {
                        new_state: Some(data.into_state()),
                        diagnostics: e.into(),
                    }),
                    Err(e) => Ok(ApplyResult {
                        new_state: None,
                        diagnostics: e.into(),
                    }),
                }
            }
            (Some(prior), Some(planned)) => {
                let timeouts = schema.timeouts_for(&planned).map_err(ProviderError::Timeouts)?;
                let mut data = ResourceData::from_parts(planned, Some(prior.clone()), config, timeouts);
                let ctx = ctx.with_timeout(timeouts.update);
                info!(resource = type_name, id = data.id(), "Updating");
                match resource.update(&ctx, &state, &mut data).await {
                    Ok(()) => Ok(ApplyResult {
                        new_state: data.has_id().then(|| data.into_state()),
                        diagnostics: Diagnostics::new(),
                    }),
                    Err(e) => Ok(ApplyResult {
                        new_state: Some(prior),
                        diagnostics: e.into(),
                    }),
                }
            }
        }
    }

    /// Refresh one resource. `Ok(None)` means it no longer exists.
    pub async fn read_resource(
        &self,
        ctx: &OperationContext,
        type_name: &str,
        current: Value,
    ) -> std::result::Result<Option<Value>, Diagnostics> {
        self.read(ctx, type_name, current)
            .await
            .map_err(Diagnostics::from)
    }

    async fn read(&self, ctx: &OperationContext, type_name: &str, current: Value) -> Result<Option<Value>> {
        let resource = self.resource(type_name)?;
        let state = self.state().await?;
        let timeouts = resource
            .schema()
            .timeouts_for(&current)
            .map_err(ProviderError::Timeouts)?;
        let mut data = ResourceData::from_parts(current.clone(), Some(current), None, timeouts);
        let ctx = ctx.with_timeout(timeouts.read);

        match resource.read(&ctx, &state, &mut data).await {
            Ok(()) if data.has_id() => Ok(Some(data.into_state())),
            Ok(()) => Ok(None),
            Err(e) if e.is_not_found_in(resource.family()) => {
                warn!(resource = type_name, id = data.id(), "Resource not found, removing from state");
                Ok(None)
            }
            Err(e) => Err(e),
        }
    }

    /// Import an existing object by its ID and return its full state
    pub async fn import_resource_state(
        &self,
        ctx: &OperationContext,
        type_name: &str,
        id: &str,
    ) -> std::result::Result<Value, Diagnostics> {
        self.import(ctx, type_name, id).await.map_err(Diagnostics::from)
    }

    async fn import(&self, ctx: &OperationContext, type_name: &str, id: &str) -> Result<Value> {
        let resource = self.resource(type_name)?;
        let state = self.state().await?;
        let schema = resource.schema();
        let timeouts = schema.timeouts.unwrap_or_default();
        let ctx = ctx.with_timeout(timeouts.get(Operation::Read));

        let mut data = ResourceData::for_import(id);
        resource.import(&ctx, &state, &mut data).await?;
        info!(resource = type_name, id = data.id(), "Importing");

        let current = data.into_state();
        let mut data = ResourceData::from_parts(current, None, None, timeouts);
        resource.read(&ctx, &state, &mut data).await?;
        if !data.has_id() {
            return Err(ProviderError::Diagnostics(
                Diagnostic::error("Cannot import non-existent remote object")
                    .with_detail(format!("{} with ID {} was not found", type_name, id))
                    .into(),
            ));
        }
        Ok(complete(&schema, data.into_state()))
    }

    pub async fn read_data_source(
        &self,
        ctx: &OperationContext,
        type_name: &str,
        config: Value,
    ) -> std::result::Result<Value, Diagnostics> {
        let data_source = self.data_source(type_name).map_err(Diagnostics::from)?;
        let schema = data_source.schema();
        let mut diags = Diagnostics::new();
        schema.block.validate_config("", &config, &mut diags);
        if diags.has_errors() {
            return Err(diags);
        }
        let state = self.state().await.map_err(Diagnostics::from)?;
        let planned = schema.block.plan(&config, None);
        let mut data = ResourceData::from_parts(planned, None, Some(config), Default::default());
        let ctx = ctx.with_timeout(data.timeout(Operation::Read));
        data_source
            .read(&ctx, &state, &mut data)
            .await
            .map_err(Diagnostics::from)?;
        Ok(data.into_state())
    }
}

/// Add a null for every schema attribute missing from `state`
fn complete(schema: &Schema, state: Value) -> Value {
    let Value::Object(mut map) = state else {
        return state;
    };
    for name in schema.block.attributes.keys() {
        map.entry(name.clone()).or_insert(Value::Null);
    }
    Value::Object(map)
}
