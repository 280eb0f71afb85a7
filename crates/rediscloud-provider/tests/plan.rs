//! Plan-time behaviour that never reaches the API

use pretty_assertions::assert_eq;
use rediscloud_provider::{Diagnostics, Provider};
use serde_json::{Value, json};

fn attributes(diags: &Diagnostics) -> Vec<String> {
    diags.errors().filter_map(|d| d.attribute.clone()).collect()
}

fn subscription_config() -> Value {
    json!({
        "name": "prod",
        "payment_method_id": "4242",
        "cloud_provider": [{
            "provider": "AWS",
            "cloud_account_id": "1",
            "region": [{"region": "us-east-1", "networking_deployment_cidr": "10.0.0.0/24"}]
        }],
        "creation_plan": [{
            "memory_limit_in_gb": 1,
            "quantity": 1,
            "replication": true,
            "throughput_measurement_by": "operations-per-second",
            "throughput_measurement_value": 1000
        }]
    })
}

fn database_config() -> Value {
    json!({
        "subscription_id": "1234",
        "name": "cache",
        "memory_limit_in_gb": 1,
        "throughput_measurement_by": "operations-per-second",
        "throughput_measurement_value": 1000
    })
}

#[test]
fn test_valid_subscription_plans_a_create() {
    let provider = Provider::new();
    let config = subscription_config();
    assert!(provider.validate_resource_config("rediscloud_subscription", &config).is_empty());

    let plan = provider
        .plan_resource_change("rediscloud_subscription", None, Some(&config))
        .unwrap();
    let planned = plan.planned_state.unwrap();
    assert_eq!(planned["memory_storage"], json!("ram"));
    assert_eq!(planned["payment_method"], json!("credit-card"));
    assert!(plan.requires_replace.is_empty());
}

#[test]
fn test_creation_plan_only_needed_on_create() {
    let provider = Provider::new();
    let mut config = subscription_config();
    config.as_object_mut().unwrap().remove("creation_plan");

    let diags = provider
        .plan_resource_change("rediscloud_subscription", None, Some(&config))
        .unwrap_err();
    assert_eq!(attributes(&diags), vec!["creation_plan".to_string()]);

    let mut prior = config.clone();
    prior["id"] = json!("77");
    prior["status"] = json!("active");
    assert!(
        provider
            .plan_resource_change("rediscloud_subscription", Some(&prior), Some(&config))
            .is_ok()
    );
}

#[test]
fn test_credit_card_needs_payment_method_id() {
    let provider = Provider::new();
    let mut config = subscription_config();
    config.as_object_mut().unwrap().remove("payment_method_id");

    let diags = provider.validate_resource_config("rediscloud_subscription", &config);
    assert_eq!(attributes(&diags), vec!["payment_method_id".to_string()]);

    config["payment_method"] = json!("marketplace");
    assert!(provider.validate_resource_config("rediscloud_subscription", &config).is_empty());
}

#[test]
fn test_gcp_uses_internal_account() {
    let provider = Provider::new();
    let mut config = subscription_config();
    config["cloud_provider"][0]["provider"] = json!("GCP");
    config["cloud_provider"][0]["cloud_account_id"] = json!("5");

    let diags = provider.validate_resource_config("rediscloud_subscription", &config);
    assert_eq!(
        attributes(&diags),
        vec!["cloud_provider.0.cloud_account_id".to_string()]
    );
}

#[test]
fn test_overlapping_region_cidrs_rejected() {
    let provider = Provider::new();
    let mut config = subscription_config();
    config["cloud_provider"][0]["region"] = json!([
        {"region": "us-east-1", "networking_deployment_cidr": "10.0.0.0/16"},
        {"region": "us-west-2", "networking_deployment_cidr": "10.0.1.0/24"}
    ]);

    let diags = provider.validate_resource_config("rediscloud_subscription", &config);
    assert!(diags.has_errors());
    assert_eq!(
        attributes(&diags),
        vec!["cloud_provider.0.region.1.networking_deployment_cidr".to_string()]
    );
}

#[test]
fn test_backup_time_needs_daily_interval() {
    let provider = Provider::new();
    let mut config = database_config();
    config["remote_backup"] = json!([{
        "interval": "every-6-hours",
        "time_utc": "03:00",
        "storage_type": "aws-s3",
        "storage_path": "s3://backups/cache"
    }]);

    let diags = provider
        .plan_resource_change("rediscloud_subscription_database", None, Some(&config))
        .unwrap_err();
    let error = diags.errors().next().unwrap();
    assert_eq!(error.attribute.as_deref(), Some("remote_backup.0.time_utc"));
    assert!(error.summary.contains(
        "time_utc can only be set when interval is either every-24-hours or every-12-hours"
    ));

    config["remote_backup"][0]["interval"] = json!("every-12-hours");
    assert!(
        provider
            .plan_resource_change("rediscloud_subscription_database", None, Some(&config))
            .is_ok()
    );
}

#[test]
fn test_replica_source_must_be_redis_uri() {
    let provider = Provider::new();
    let mut config = database_config();
    config["replica_of"] = json!(["http://elsewhere:6379"]);
    let diags = provider.validate_resource_config("rediscloud_subscription_database", &config);
    assert_eq!(attributes(&diags), vec!["replica_of".to_string()]);

    config["replica_of"] = json!(["redis://redis-1.example.com:12000"]);
    assert!(
        provider
            .validate_resource_config("rediscloud_subscription_database", &config)
            .is_empty()
    );
}

#[test]
fn test_memory_and_dataset_are_exclusive() {
    let provider = Provider::new();
    let mut config = database_config();
    config["dataset_size_in_gb"] = json!(2);
    let diags = provider.validate_resource_config("rediscloud_subscription_database", &config);
    assert_eq!(attributes(&diags), vec!["dataset_size_in_gb".to_string()]);
}

#[test]
fn test_duplicate_override_regions_rejected() {
    let provider = Provider::new();
    let config = json!({
        "subscription_id": "1234",
        "name": "global-db",
        "memory_limit_in_gb": 1,
        "override_region": [{"name": "us-east-1"}, {"name": "us-east-1"}]
    });
    let diags = provider.validate_resource_config("rediscloud_active_active_subscription_database", &config);
    assert_eq!(attributes(&diags), vec!["override_region.1.name".to_string()]);
}

#[test]
fn test_changing_subscription_forces_replacement() {
    let provider = Provider::new();
    let config = database_config();
    let mut prior = provider
        .plan_resource_change("rediscloud_subscription_database", None, Some(&config))
        .unwrap()
        .planned_state
        .unwrap();
    prior["id"] = json!("1234/5678");

    let mut moved = config.clone();
    moved["subscription_id"] = json!("999");
    let plan = provider
        .plan_resource_change("rediscloud_subscription_database", Some(&prior), Some(&moved))
        .unwrap();
    assert_eq!(plan.requires_replace, vec!["subscription_id".to_string()]);
}

#[test]
fn test_unknown_resource_type() {
    let provider = Provider::new();
    let diags = provider.validate_resource_config("rediscloud_nothing", &json!({}));
    assert!(diags.has_errors());
}
