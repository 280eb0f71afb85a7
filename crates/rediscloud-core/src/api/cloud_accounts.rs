//! Bring-your-own cloud accounts

use serde::{Deserialize, Serialize};

use super::tasks::TaskStateUpdate;
use super::{api_id, list_field, submitted};
use crate::client::CloudClient;
use crate::error::{InFamily, ResourceFamily, Result};

/// The Redis-managed account every GCP subscription must use
pub const INTERNAL_CLOUD_ACCOUNT_ID: i64 = 1;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudAccount {
    pub id: i64,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub provider: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub access_key_id: Option<String>,
    #[serde(default)]
    pub aws_console_role_arn: Option<String>,
    #[serde(default)]
    pub aws_user_arn: Option<String>,
    #[serde(default)]
    pub sign_in_login_url: Option<String>,
}

impl CloudAccount {
    pub fn status(&self) -> &str {
        self.status.as_deref().unwrap_or_default()
    }
}

/// Body of cloud account create and update
#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CloudAccountRequest {
    pub name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,
    pub access_key_id: String,
    pub access_secret_key: String,
    pub console_username: String,
    pub console_password: String,
    pub sign_in_login_url: String,
}

/// Handler for `/cloud-accounts`
#[derive(Debug, Clone)]
pub struct CloudAccountHandler {
    client: CloudClient,
}

impl CloudAccountHandler {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<CloudAccount>> {
        let value = self
            .client
            .get_raw(ResourceFamily::CloudAccount, "/cloud-accounts")
            .await?;
        list_field(&value, "cloudAccounts")
    }

    pub async fn get(&self, account_id: i64) -> Result<CloudAccount> {
        self.client
            .get(
                ResourceFamily::CloudAccount,
                &format!("/cloud-accounts/{}", account_id),
            )
            .await
    }

    pub async fn create(&self, request: &CloudAccountRequest) -> Result<TaskStateUpdate> {
        let body = serde_json::to_value(request)?;
        submitted(
            self.client
                .post_raw(ResourceFamily::CloudAccount, "/cloud-accounts", body)
                .await?,
        )
    }

    pub async fn update(
        &self,
        account_id: i64,
        request: &CloudAccountRequest,
    ) -> Result<TaskStateUpdate> {
        let mut body = serde_json::to_value(request)?;
        // provider cannot change after create
        if let Some(obj) = body.as_object_mut() {
            obj.remove("provider");
        }
        submitted(
            self.client
                .put_raw(
                    ResourceFamily::CloudAccount,
                    &format!("/cloud-accounts/{}", account_id),
                    body,
                )
                .await?,
        )
    }

    pub async fn delete(&self, account_id: i64) -> Result<TaskStateUpdate> {
        let task = self
            .client
            .cloud()
            .cloud_accounts()
            .delete_cloud_account(api_id(account_id)?)
            .await
            .in_family(ResourceFamily::CloudAccount)?;
        TaskStateUpdate::from_task(&task)
    }
}
