//! Resource and data source traits
//!
//! One implementation per resource type. The provider owns dispatch, timeout
//! handling and state bookkeeping; implementations only talk to the API.

use async_trait::async_trait;
use rediscloud_core::{OperationContext, ResourceFamily};
use serde_json::Value;

use super::data::ResourceData;
use super::diag::Diagnostics;
use super::diff::ResourceDiff;
use super::schema::Schema;
use crate::error::{ProviderError, Result};
use crate::state::ProviderState;

#[async_trait]
pub trait Resource: Send + Sync {
    fn type_name(&self) -> &'static str;

    /// API family whose 404 means this object is gone. A 404 from any other
    /// family (pricing, tags, a parent's sub-resource) is a real error.
    fn family(&self) -> ResourceFamily;

    fn schema(&self) -> Schema;

    /// Cross-attribute checks on raw config, beyond what the schema expresses
    fn validate(&self, _config: &Value) -> Diagnostics {
        Diagnostics::new()
    }

    /// Adjust the plan after defaults and suppression
    fn customize_diff(&self, _diff: &mut ResourceDiff<'_>) -> Result<()> {
        Ok(())
    }

    async fn create(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()>;

    /// Refresh `data` from the API; clear the ID when the object is gone
    async fn read(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()>;

    async fn update(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()>;

    async fn delete(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()>;

    /// Turn an import ID into enough state for [`read`](Self::read)
    async fn import(&self, _ctx: &OperationContext, _state: &ProviderState, _data: &mut ResourceData) -> Result<()> {
        Err(ProviderError::ImportNotSupported(self.type_name().to_string()))
    }
}

#[async_trait]
pub trait DataSource: Send + Sync {
    fn type_name(&self) -> &'static str;

    fn schema(&self) -> Schema;

    async fn read(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()>;
}

/// Import by storing the given ID unchanged
pub fn import_passthrough(data: &mut ResourceData) -> Result<()> {
    if data.has_id() {
        Ok(())
    } else {
        Err(ProviderError::validation("import ID must not be empty"))
    }
}
