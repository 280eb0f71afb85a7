//! Read-only lookups
//!
//! Every data source lists a family of objects, applies the filters set in
//! config and expects exactly one match. The listing data sources
//! (`rediscloud_regions`, `rediscloud_private_service_connect_endpoints`)
//! return everything that matches instead.

mod account;
mod acl;
mod database;
mod networking;
mod plan;
mod subscription;

use std::sync::Arc;

use serde_json::Value;

use crate::error::{ProviderError, Result};
use crate::host::{DataSource, ResourceData};

pub use account::{CloudAccountDataSource, PaymentMethodDataSource, RegionsDataSource};
pub use acl::{AclRoleDataSource, AclRuleDataSource, AclUserDataSource};
pub use database::{
    ActiveActiveDatabaseDataSource, DatabaseDataSource, EssentialsDatabaseDataSource,
};
pub use networking::{PscEndpointsDataSource, TransitGatewayDataSource};
pub use plan::EssentialsPlanDataSource;
pub use subscription::{
    ActiveActiveSubscriptionDataSource, EssentialsSubscriptionDataSource, SubscriptionDataSource,
};

/// Every data source the provider registers
pub fn all() -> Vec<Arc<dyn DataSource>> {
    vec![
        Arc::new(SubscriptionDataSource),
        Arc::new(ActiveActiveSubscriptionDataSource),
        Arc::new(EssentialsSubscriptionDataSource),
        Arc::new(DatabaseDataSource),
        Arc::new(ActiveActiveDatabaseDataSource),
        Arc::new(EssentialsDatabaseDataSource),
        Arc::new(EssentialsPlanDataSource),
        Arc::new(CloudAccountDataSource),
        Arc::new(PaymentMethodDataSource),
        Arc::new(RegionsDataSource),
        Arc::new(AclRuleDataSource),
        Arc::new(AclRoleDataSource),
        Arc::new(AclUserDataSource),
        Arc::new(TransitGatewayDataSource),
        Arc::new(PscEndpointsDataSource),
    ]
}

/// Human-readable form of the filters set in config, used in lookup errors
fn describe_filters(data: &ResourceData, keys: &[&str]) -> String {
    let set: Vec<String> = keys
        .iter()
        .filter_map(|key| {
            data.get(key).map(|value| match value {
                Value::String(s) => format!("{} = \"{}\"", key, s),
                other => format!("{} = {}", key, other),
            })
        })
        .collect();
    if set.is_empty() {
        "no filters".to_string()
    } else {
        set.join(", ")
    }
}

/// The single element of `matches`, or a lookup error naming the filters
fn exactly_one<T>(kind: &str, data: &ResourceData, keys: &[&str], mut matches: Vec<T>) -> Result<T> {
    match matches.len() {
        1 => Ok(matches.remove(0)),
        0 => Err(ProviderError::lookup(format!(
            "no {} matches {}",
            kind,
            describe_filters(data, keys)
        ))),
        n => Err(ProviderError::lookup(format!(
            "{} {}s match {}; add filters to select one",
            n,
            kind,
            describe_filters(data, keys)
        ))),
    }
}

/// A string filter that is unset or equal to `actual`
fn matches_str(data: &ResourceData, key: &str, actual: Option<&str>) -> bool {
    data.get_str(key).is_none_or(|wanted| Some(wanted) == actual)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_exactly_one_names_the_filters() {
        let data = ResourceData::new(json!({"name": "cache", "subscription_id": "12"}));
        let keys = ["subscription_id", "name", "protocol"];

        assert_eq!(exactly_one("database", &data, &keys, vec![7]).unwrap(), 7);

        let err = exactly_one::<i64>("database", &data, &keys, vec![]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "no database matches subscription_id = \"12\", name = \"cache\""
        );

        let err = exactly_one("database", &data, &keys, vec![1, 2]).unwrap_err();
        assert!(err.to_string().contains("2 databases match"));
    }

    #[test]
    fn test_unset_filter_matches_anything() {
        let data = ResourceData::new(json!({"name": "cache"}));
        assert!(matches_str(&data, "name", Some("cache")));
        assert!(!matches_str(&data, "name", Some("other")));
        assert!(matches_str(&data, "protocol", None));
    }
}
