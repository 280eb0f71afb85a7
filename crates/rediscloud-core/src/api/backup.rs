//! Latest backup and import status (task-backed, informational)

use serde::{Deserialize, Serialize};

use super::{read_via_task, submitted};
use crate::client::CloudClient;
use crate::context::OperationContext;
use crate::error::{ResourceFamily, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BackupStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub last_backup_time: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ImportStatus {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub last_import_time: Option<String>,
    #[serde(default)]
    pub failure_reason: Option<String>,
    #[serde(default)]
    pub failure_reason_params: Vec<FailureReasonParam>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct FailureReasonParam {
    #[serde(default)]
    pub key: Option<String>,
    #[serde(default)]
    pub value: Option<String>,
}

#[derive(Debug, Clone)]
pub struct BackupStatusHandler {
    client: CloudClient,
}

impl BackupStatusHandler {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }

    pub async fn latest_backup(
        &self,
        ctx: &OperationContext,
        subscription_id: i64,
        database_id: i64,
    ) -> Result<BackupStatus> {
        self.read(
            ctx,
            ResourceFamily::Backup,
            format!("/subscriptions/{}/databases/{}/backup", subscription_id, database_id),
        )
        .await
    }

    /// Backup status of one region of an Active-Active database
    pub async fn latest_backup_active_active(
        &self,
        ctx: &OperationContext,
        subscription_id: i64,
        database_id: i64,
        region: &str,
    ) -> Result<BackupStatus> {
        self.read(
            ctx,
            ResourceFamily::Backup,
            format!(
                "/subscriptions/{}/databases/{}/backup?regionName={}",
                subscription_id,
                database_id,
                urlencoding::encode(region)
            ),
        )
        .await
    }

    pub async fn latest_backup_fixed(
        &self,
        ctx: &OperationContext,
        subscription_id: i64,
        database_id: i64,
    ) -> Result<BackupStatus> {
        self.read(
            ctx,
            ResourceFamily::Backup,
            format!(
                "/fixed/subscriptions/{}/databases/{}/backup",
                subscription_id, database_id
            ),
        )
        .await
    }

    pub async fn latest_import(
        &self,
        ctx: &OperationContext,
        subscription_id: i64,
        database_id: i64,
    ) -> Result<ImportStatus> {
        self.read(
            ctx,
            ResourceFamily::Import,
            format!("/subscriptions/{}/databases/{}/import", subscription_id, database_id),
        )
        .await
    }

    pub async fn latest_import_fixed(
        &self,
        ctx: &OperationContext,
        subscription_id: i64,
        database_id: i64,
    ) -> Result<ImportStatus> {
        self.read(
            ctx,
            ResourceFamily::Import,
            format!(
                "/fixed/subscriptions/{}/databases/{}/import",
                subscription_id, database_id
            ),
        )
        .await
    }

    async fn read<T>(&self, ctx: &OperationContext, family: ResourceFamily, path: String) -> Result<T>
    where
        T: serde::de::DeserializeOwned + Default,
    {
        let submission = submitted(self.client.get_raw(family, &path).await?)?;
        let resource = read_via_task(ctx, &self.client, family, submission).await?;
        if resource.is_null() {
            return Ok(T::default());
        }
        Ok(serde_json::from_value(resource)?)
    }
}
