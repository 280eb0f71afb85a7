//! `rediscloud_cloud_account`: a bring-your-own AWS account

use async_trait::async_trait;
use rediscloud_core::api::CloudAccount;
use rediscloud_core::api::cloud_accounts::CloudAccountRequest;
use rediscloud_core::{OperationContext, ResourceFamily, cloud};
use tracing::info;

use super::common::{found, own_id};
use crate::error::Result;
use crate::host::{
    Attribute, Block, Operation, Resource, ResourceData, Schema, Timeouts, Validation,
    import_passthrough,
};
use crate::state::ProviderState;

pub const TYPE_NAME: &str = "rediscloud_cloud_account";

const PROVIDERS: &[&str] = &["AWS"];

pub struct CloudAccountResource;

fn request(data: &ResourceData) -> CloudAccountRequest {
    let field = |name: &str| data.get_string(name).unwrap_or_default();
    CloudAccountRequest {
        name: field("name"),
        provider: data.get_string("provider"),
        access_key_id: field("access_key_id"),
        access_secret_key: field("access_secret_key"),
        console_username: field("console_username"),
        console_password: field("console_password"),
        sign_in_login_url: field("sign_in_login_url"),
    }
}

fn set_state(data: &mut ResourceData, account: &CloudAccount) {
    data.set_opt("name", account.name.clone());
    data.set_opt("provider", account.provider.clone());
    data.set_opt("status", account.status.clone());
    // Secrets are never returned; only the key ID round-trips
    data.set_opt("access_key_id", account.access_key_id.clone());
    data.set_opt("sign_in_login_url", account.sign_in_login_url.clone());
}

#[async_trait]
impl Resource for CloudAccountResource {
    fn type_name(&self) -> &'static str {
        TYPE_NAME
    }

    fn family(&self) -> ResourceFamily {
        ResourceFamily::CloudAccount
    }

    fn schema(&self) -> Schema {
        let block = Block::new()
            .attr("name", Attribute::string().required())
            .attr(
                "provider",
                Attribute::string()
                    .default("AWS")
                    .force_new()
                    .validate(Validation::OneOf(PROVIDERS)),
            )
            .attr("access_key_id", Attribute::string().required().sensitive())
            .attr("access_secret_key", Attribute::string().required().sensitive())
            .attr("console_username", Attribute::string().required())
            .attr("console_password", Attribute::string().required().sensitive())
            .attr("sign_in_login_url", Attribute::string().required())
            .attr("status", Attribute::string().computed());
        Schema::resource(block, Some(Timeouts::minutes(5, 5, 5, 5)))
    }

    async fn create(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let client = state.client();
        let timeout = data.timeout(Operation::Create);

        let task = state.cloud_accounts().create(&request(data)).await?;
        let id = cloud::complete_task(ctx, client, task, timeout)
            .await?
            .resource_id()?;
        data.set_id(id.to_string());
        info!(account_id = id, "Cloud account created");

        cloud::wait_for_cloud_account_active(ctx, client, id, timeout).await?;
        self.read(ctx, state, data).await
    }

    async fn read(&self, _ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let id = own_id(data, "Cloud account")?;
        let Some(account) = found(data, self.family(), state.cloud_accounts().get(id).await)? else {
            return Ok(());
        };
        set_state(data, &account);
        Ok(())
    }

    async fn update(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let id = own_id(data, "Cloud account")?;
        let client = state.client();
        let timeout = data.timeout(Operation::Update);

        let task = state.cloud_accounts().update(id, &request(data)).await?;
        cloud::complete_task(ctx, client, task, timeout).await?;
        cloud::wait_for_cloud_account_active(ctx, client, id, timeout).await?;
        self.read(ctx, state, data).await
    }

    async fn delete(&self, ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let id = own_id(data, "Cloud account")?;
        let client = state.client();
        let timeout = data.timeout(Operation::Delete);

        let task = state.cloud_accounts().delete(id).await?;
        cloud::complete_task(ctx, client, task, timeout).await?;
        cloud::wait_for_cloud_account_deleted(ctx, client, id, timeout).await?;
        info!(account_id = id, "Cloud account deleted");
        Ok(())
    }

    async fn import(&self, _ctx: &OperationContext, _state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        import_passthrough(data)
    }
}
