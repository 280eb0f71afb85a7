//! Subscription pricing breakdown

use serde::{Deserialize, Serialize};

use super::list_field;
use crate::client::CloudClient;
use crate::error::{ResourceFamily, Result};

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pricing {
    #[serde(default)]
    pub database_name: Option<String>,
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub type_details: Option<String>,
    #[serde(default)]
    pub quantity: Option<i64>,
    #[serde(default)]
    pub quantity_measurement: Option<String>,
    #[serde(default)]
    pub price_per_unit: Option<f64>,
    #[serde(default)]
    pub price_currency: Option<String>,
    #[serde(default)]
    pub price_period: Option<String>,
    #[serde(default)]
    pub region: Option<String>,
}

#[derive(Debug, Clone)]
pub struct PricingHandler {
    client: CloudClient,
}

impl PricingHandler {
    pub fn new(client: CloudClient) -> Self {
        Self { client }
    }

    pub async fn list(&self, subscription_id: i64) -> Result<Vec<Pricing>> {
        let value = self
            .client
            .get_raw(
                ResourceFamily::Pricing,
                &format!("/subscriptions/{}/pricing", subscription_id),
            )
            .await?;
        list_field(&value, "pricing")
    }
}
