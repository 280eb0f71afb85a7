//! Account-level lookups: cloud accounts, payment methods, regions

use async_trait::async_trait;
use chrono::{Datelike, NaiveDate, Utc};
use rediscloud_core::OperationContext;
use rediscloud_core::api::cloud_accounts::INTERNAL_CLOUD_ACCOUNT_ID;
use rediscloud_core::api::{CloudAccount, PaymentMethod};
use serde_json::json;

use super::{exactly_one, matches_str};
use crate::error::Result;
use crate::host::{Attribute, Block, DataSource, ResourceData, Schema, Validation};
use crate::state::ProviderState;

const PROVIDERS: &[&str] = &["AWS", "GCP", "Azure"];

/// `rediscloud_cloud_account`
pub struct CloudAccountDataSource;

#[async_trait]
impl DataSource for CloudAccountDataSource {
    fn type_name(&self) -> &'static str {
        "rediscloud_cloud_account"
    }

    fn schema(&self) -> Schema {
        let block = Block::new()
            .attr("name", Attribute::string().optional().computed())
            .attr(
                "provider_type",
                Attribute::string()
                    .optional()
                    .computed()
                    .validate(Validation::OneOf(PROVIDERS)),
            )
            .attr("exclude_internal_account", Attribute::bool().optional().default(false))
            .attr("access_key_id", Attribute::string().computed())
            .attr("status", Attribute::string().computed());
        Schema::data_source(block)
    }

    async fn read(&self, _ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let exclude_internal = data.get_bool("exclude_internal_account").unwrap_or(false);
        let matches: Vec<CloudAccount> = state
            .cloud_accounts()
            .list()
            .await?
            .into_iter()
            .filter(|a| !(exclude_internal && a.id == INTERNAL_CLOUD_ACCOUNT_ID))
            .filter(|a| matches_str(data, "name", a.name.as_deref()))
            .filter(|a| matches_str(data, "provider_type", a.provider.as_deref()))
            .collect();
        let account = exactly_one(
            "cloud account",
            data,
            &["name", "provider_type", "exclude_internal_account"],
            matches,
        )?;

        data.set_id(account.id.to_string());
        data.set_opt("name", account.name);
        data.set_opt("provider_type", account.provider);
        data.set_opt("access_key_id", account.access_key_id);
        data.set_opt("status", account.status);
        Ok(())
    }
}

/// `rediscloud_payment_method`
pub struct PaymentMethodDataSource;

/// Cards stay valid through the last day of their expiry month
fn is_expired(method: &PaymentMethod, today: NaiveDate) -> bool {
    match (method.expiration_year, method.expiration_month) {
        (Some(year), Some(month)) => (year, month) < (i64::from(today.year()), i64::from(today.month())),
        _ => false,
    }
}

fn matches_card(data: &ResourceData, method: &PaymentMethod, today: NaiveDate) -> bool {
    let exclude_expired = data.get_bool("exclude_expired").unwrap_or(true);
    !(exclude_expired && is_expired(method, today))
        && matches_str(data, "card_type", method.kind.as_deref())
        && data
            .get_i64("last_four_numbers")
            .is_none_or(|digits| method.credit_card_ends_with == Some(digits))
}

#[async_trait]
impl DataSource for PaymentMethodDataSource {
    fn type_name(&self) -> &'static str {
        "rediscloud_payment_method"
    }

    fn schema(&self) -> Schema {
        let block = Block::new()
            .attr("card_type", Attribute::string().optional().computed())
            .attr("exclude_expired", Attribute::bool().optional().default(true))
            .attr("last_four_numbers", Attribute::int().optional().computed());
        Schema::data_source(block)
    }

    async fn read(&self, _ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let today = Utc::now().date_naive();
        let matches: Vec<PaymentMethod> = state
            .payment_methods()
            .list()
            .await?
            .into_iter()
            .filter(|m| matches_card(data, m, today))
            .collect();
        let method = exactly_one(
            "payment method",
            data,
            &["card_type", "last_four_numbers", "exclude_expired"],
            matches,
        )?;

        data.set_id(method.id.to_string());
        data.set_opt("card_type", method.kind);
        data.set_opt("last_four_numbers", method.credit_card_ends_with);
        Ok(())
    }
}

/// `rediscloud_regions`
pub struct RegionsDataSource;

#[async_trait]
impl DataSource for RegionsDataSource {
    fn type_name(&self) -> &'static str {
        "rediscloud_regions"
    }

    fn schema(&self) -> Schema {
        let region = Block::new()
            .attr("name", Attribute::string().computed())
            .attr("provider_name", Attribute::string().computed());
        let block = Block::new()
            .attr(
                "provider_name",
                Attribute::string().optional().validate(Validation::OneOf(PROVIDERS)),
            )
            .attr("regions", Attribute::list_block(region).computed());
        Schema::data_source(block)
    }

    async fn read(&self, _ctx: &OperationContext, state: &ProviderState, data: &mut ResourceData) -> Result<()> {
        let provider = data.get_string("provider_name");
        let regions = state.regions().list_provider_regions(provider.as_deref()).await?;

        data.set_id(provider.unwrap_or_else(|| "ALL".to_string()));
        data.set(
            "regions",
            regions
                .into_iter()
                .map(|r| json!({"name": r.name, "provider_name": r.provider}))
                .collect::<Vec<_>>(),
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn card(value: serde_json::Value) -> PaymentMethod {
        serde_json::from_value(value).unwrap()
    }

    fn day(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_card_valid_through_expiry_month() {
        let method = card(json!({"id": 1, "expirationMonth": 3, "expirationYear": 2026}));
        assert!(!is_expired(&method, day(2026, 3, 31)));
        assert!(is_expired(&method, day(2026, 4, 1)));
        assert!(!is_expired(&card(json!({"id": 2})), day(2030, 1, 1)));
    }

    #[test]
    fn test_expired_cards_excluded_unless_asked() {
        let method = card(json!({"id": 1, "type": "Visa", "expirationMonth": 1, "expirationYear": 2020}));
        let today = day(2026, 10, 18);

        assert!(!matches_card(&ResourceData::new(json!({})), &method, today));
        let include = ResourceData::new(json!({"exclude_expired": false, "card_type": "Visa"}));
        assert!(matches_card(&include, &method, today));
        let other = ResourceData::new(json!({"exclude_expired": false, "card_type": "Amex"}));
        assert!(!matches_card(&other, &method, today));
    }
}
