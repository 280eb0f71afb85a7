use serde::{Deserialize, Serialize};

use super::list_field;
use crate::client::CloudClient;
use crate::error::{ResourceFamily, Result};

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PaymentMethod {
    pub id: i64,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub credit_card_ends_with: Option<i64>,
    #[serde(default)]
    pub name_on_card: Option<String>,
    #[serde(default)]
    pub expiration_month: Option<i64>,
    #[serde(default)]
    pub expiration_year: Option<i64>,
}

#[derive(Debug, Clone)]
pub struct PaymentMethodHandler {
    client: CloudClient,
}

impl PaymentMethodHandler {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }

    pub async fn list(&self) -> Result<Vec<PaymentMethod>> {
        let value = self
            .client
            .get_raw(ResourceFamily::PaymentMethod, "/payment-methods")
            .await?;
        list_field(&value, "paymentMethods")
    }
}
