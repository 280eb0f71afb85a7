//! Database tags (`/tags` sub-resource of Pro and Essentials databases)

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::json;

use super::list_field;
use crate::client::CloudClient;
use crate::error::{ResourceFamily, Result};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

/// Handler for database tags. Tag writes are synchronous.
#[derive(Debug, Clone)]
pub struct TagHandler {
    client: CloudClient,
}

impl TagHandler {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }

    pub async fn get(&self, subscription_id: i64, database_id: i64) -> Result<BTreeMap<String, String>> {
        self.get_at(&format!(
            "/subscriptions/{}/databases/{}/tags",
            subscription_id, database_id
        ))
        .await
    }

    pub async fn put(
        &self,
        subscription_id: i64,
        database_id: i64,
        tags: &BTreeMap<String, String>,
    ) -> Result<()> {
        self.put_at(
            &format!(
                "/subscriptions/{}/databases/{}/tags",
                subscription_id, database_id
            ),
            tags,
        )
        .await
    }

    pub async fn get_fixed(
        &self,
        subscription_id: i64,
        database_id: i64,
    ) -> Result<BTreeMap<String, String>> {
        self.get_at(&format!(
            "/fixed/subscriptions/{}/databases/{}/tags",
            subscription_id, database_id
        ))
        .await
    }

    pub async fn put_fixed(
        &self,
        subscription_id: i64,
        database_id: i64,
        tags: &BTreeMap<String, String>,
    ) -> Result<()> {
        self.put_at(
            &format!(
                "/fixed/subscriptions/{}/databases/{}/tags",
                subscription_id, database_id
            ),
            tags,
        )
        .await
    }

    async fn get_at(&self, path: &str) -> Result<BTreeMap<String, String>> {
        let value = self.client.get_raw(ResourceFamily::Tag, path).await?;
        let tags: Vec<Tag> = list_field(&value, "tags")?;
        Ok(tags.into_iter().map(|t| (t.key, t.value)).collect())
    }

    async fn put_at(&self, path: &str, tags: &BTreeMap<String, String>) -> Result<()> {
        let body = json!({
            "tags": tags
                .iter()
                .map(|(key, value)| Tag { key: key.clone(), value: value.clone() })
                .collect::<Vec<_>>(),
        });
        self.client.put_raw(ResourceFamily::Tag, path, body).await?;
        Ok(())
    }
}
