//! Resource and data source flows against a mock Redis Cloud API

use std::sync::Arc;
use std::time::Duration;

use pretty_assertions::assert_eq;
use redis_cloud::testing::{MockCloudServer, SubscriptionFixture, bad_request, success};
use rediscloud_core::{OperationContext, SubscriptionLocks};
use rediscloud_provider::Provider;
use serde_json::{Value, json};
use wiremock::Mock;
use wiremock::matchers::{body_partial_json, method, path};

mod common;

use common::{
    configured, configured_with_locks, database, database_page, mock_get, mock_get_sequence,
    mock_missing, mock_submit, mock_task_completed, mock_task_failed, mock_task_read, planned,
    received, received_bodies, subscription, task_with_resource, with_status,
};

#[tokio::test]
async fn test_imported_database_plans_no_changes() {
    let server = MockCloudServer::start().await;
    let mut db = database(5678, "cache");
    db["supportOSSClusterApi"] = json!(false);
    db["useExternalEndpointForOSSClusterApi"] = json!(false);
    server.mock_database_get(1234, 5678, db).await;
    mock_get(&server, "/subscriptions/1234/databases/5678/tags", json!({"tags": []})).await;
    let provider = configured(&server).await;
    let ctx = OperationContext::background();

    let imported = provider
        .import_resource_state(&ctx, "rediscloud_subscription_database", "1234/5678")
        .await
        .unwrap();
    assert_eq!(imported["id"], json!("1234/5678"));
    assert_eq!(imported["subscription_id"], json!("1234"));
    assert_eq!(imported["db_id"], json!(5678));
    assert_eq!(
        imported["public_endpoint"],
        json!("redis-5678.c1.us-east-1.ec2.cloud.redislabs.com:12000")
    );

    let config = json!({
        "subscription_id": "1234",
        "name": "cache",
        "memory_limit_in_gb": 1,
        "throughput_measurement_by": "operations-per-second",
        "throughput_measurement_value": 1000
    });
    let plan = provider
        .plan_resource_change("rediscloud_subscription_database", Some(&imported), Some(&config))
        .unwrap();
    assert_eq!(plan.changes, Vec::<String>::new());
    assert!(plan.requires_replace.is_empty());
}

#[tokio::test]
async fn test_import_of_missing_database_fails() {
    let server = MockCloudServer::start().await;
    server.mock_not_found("/subscriptions/1234/databases/5678").await;
    let provider = configured(&server).await;

    let diags = provider
        .import_resource_state(
            &OperationContext::background(),
            "rediscloud_subscription_database",
            "1234/5678",
        )
        .await
        .unwrap_err();
    assert!(diags.has_errors());
}

#[tokio::test]
async fn test_malformed_import_id_is_rejected() {
    let server = MockCloudServer::start().await;
    let provider = configured(&server).await;

    let diags = provider
        .import_resource_state(
            &OperationContext::background(),
            "rediscloud_subscription_database",
            "1234",
        )
        .await
        .unwrap_err();
    assert!(diags.has_errors());
}

#[tokio::test]
async fn test_transit_gateway_route_attach_then_clear() {
    let server = MockCloudServer::start().await;
    mock_task_read(
        &server,
        "/subscriptions/4/transitGateways",
        "t-tgw",
        json!({"resources": [{
            "id": 88,
            "attachmentStatus": "available",
            "cidrs": [{"cidrAddress": "10.10.0.0/16", "status": "active"}]
        }]}),
    )
    .await;
    server
        .mock_subscription_get(4, SubscriptionFixture::new(4, "net").build())
        .await;
    for cidrs in [json!(["10.10.0.0/16"]), json!([])] {
        Mock::given(method("PUT"))
            .and(path("/subscriptions/4/transitGateways/88/attachment"))
            .and(body_partial_json(json!({"cidrs": cidrs})))
            .respond_with(received("t-put"))
            .expect(1)
            .mount(server.inner())
            .await;
    }
    mock_task_completed(&server, "t-put", 88).await;
    let provider = configured(&server).await;
    let ctx = OperationContext::background();

    let config = json!({"subscription_id": "4", "tgw_id": 88, "cidrs": ["10.10.0.0/16"]});
    let plan = planned(&provider, "rediscloud_transit_gateway_route", &config);
    let created = provider
        .apply_resource_change(&ctx, "rediscloud_transit_gateway_route", None, Some(plan), Some(config))
        .await;
    assert!(created.diagnostics.is_empty(), "{}", created.diagnostics);
    let state = created.new_state.unwrap();
    assert_eq!(state["id"], json!("4/88"));
    assert_eq!(state["cidrs"], json!(["10.10.0.0/16"]));

    let deleted = provider
        .apply_resource_change(&ctx, "rediscloud_transit_gateway_route", Some(state), None, None)
        .await;
    assert!(deleted.diagnostics.is_empty(), "{}", deleted.diagnostics);
    assert_eq!(deleted.new_state, None);
}

#[tokio::test]
async fn test_routes_wait_for_accepted_attachment() {
    let server = MockCloudServer::start().await;
    mock_task_read(
        &server,
        "/subscriptions/4/transitGateways",
        "t-tgw",
        json!({"resources": [{"id": 88, "attachmentStatus": "pending-acceptance"}]}),
    )
    .await;
    let provider = configured(&server).await;

    let config = json!({"subscription_id": "4", "tgw_id": 88, "cidrs": ["10.10.0.0/16"]});
    let plan = planned(&provider, "rediscloud_transit_gateway_route", &config);
    let result = provider
        .apply_resource_change(
            &OperationContext::background(),
            "rediscloud_transit_gateway_route",
            None,
            Some(plan),
            Some(config),
        )
        .await;

    assert_eq!(result.new_state, None);
    let error = result.diagnostics.errors().next().unwrap();
    assert_eq!(error.attribute.as_deref(), Some("tgw_id"));
    assert!(
        received_bodies(&server, "PUT", "/subscriptions/4/transitGateways/88/attachment")
            .await
            .is_empty()
    );
}

#[tokio::test]
async fn test_active_active_overrides_survive_refresh() {
    let server = MockCloudServer::start().await;
    let security = json!({
        "password": "global-pass",
        "enableDefaultUser": true,
        "sourceIps": ["10.0.0.0/16"]
    });
    let mut db = database(5678, "global-db");
    db["crdbDatabases"] = json!([
        {
            "region": "us-east-1",
            "publicEndpoint": "redis-5678.us-east-1.example.com:12000",
            "dataPersistence": "aof-every-write",
            "security": security
        },
        {
            "region": "eu-west-1",
            "publicEndpoint": "redis-5678.eu-west-1.example.com:12000",
            "dataPersistence": "none",
            "security": security
        }
    ]);
    server.mock_database_get(1234, 5678, db).await;
    mock_get(&server, "/subscriptions/1234/databases/5678/tags", json!({"tags": []})).await;
    let provider = configured(&server).await;

    let prior = json!({
        "id": "1234/5678",
        "subscription_id": "1234",
        "name": "global-db",
        "global_data_persistence": "none",
        "global_password": "global-pass",
        "global_enable_default_user": true,
        "global_source_ips": ["10.0.0.0/16"],
        "override_region": [
            {"name": "us-east-1", "override_global_data_persistence": "aof-every-write"},
            {"name": "eu-west-1"}
        ]
    });
    let refreshed = provider
        .read_resource(
            &OperationContext::background(),
            "rediscloud_active_active_subscription_database",
            prior,
        )
        .await
        .unwrap()
        .unwrap();

    assert_eq!(
        refreshed["override_region"],
        json!([
            {"name": "us-east-1", "override_global_data_persistence": "aof-every-write"},
            {"name": "eu-west-1"}
        ])
    );
    assert_eq!(
        refreshed["public_endpoint"],
        json!({
            "eu-west-1": "redis-5678.eu-west-1.example.com:12000",
            "us-east-1": "redis-5678.us-east-1.example.com:12000"
        })
    );
}

#[tokio::test]
async fn test_read_of_deleted_database_clears_state() {
    let server = MockCloudServer::start().await;
    mock_missing(&server, "GET", "/subscriptions/1234/databases/5678").await;
    let provider = configured(&server).await;

    let state = provider
        .read_resource(
            &OperationContext::background(),
            "rediscloud_subscription_database",
            json!({"id": "1234/5678", "subscription_id": "1234", "name": "cache"}),
        )
        .await
        .unwrap();
    assert_eq!(state, None);
}

#[tokio::test]
async fn test_essentials_subscription_create() {
    let server = MockCloudServer::start().await;
    mock_submit(&server, "POST", "/fixed/subscriptions", "t-fixed").await;
    mock_task_completed(&server, "t-fixed", 321).await;
    mock_get(
        &server,
        "/fixed/subscriptions/321",
        json!({
            "id": 321,
            "name": "cache",
            "status": "active",
            "planId": 34858,
            "paymentMethodId": 4242,
            "creationDate": "2026-10-18T09:00:00Z"
        }),
    )
    .await;
    let provider = configured(&server).await;

    let config = json!({"name": "cache", "plan_id": "34858", "payment_method_id": "4242"});
    let plan = planned(&provider, "rediscloud_essentials_subscription", &config);
    let result = provider
        .apply_resource_change(
            &OperationContext::background(),
            "rediscloud_essentials_subscription",
            None,
            Some(plan),
            Some(config),
        )
        .await;
    assert!(result.diagnostics.is_empty(), "{}", result.diagnostics);

    let state = result.new_state.unwrap();
    assert_eq!(state["id"], json!("321"));
    assert_eq!(state["plan_id"], json!("34858"));
    assert_eq!(state["status"], json!("active"));

    let bodies = received_bodies(&server, "POST", "/fixed/subscriptions").await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["planId"], json!(34858));
    assert_eq!(bodies[0]["paymentMethodId"], json!(4242));
}

#[tokio::test]
async fn test_failed_create_task_reports_description() {
    let server = MockCloudServer::start().await;
    mock_submit(&server, "POST", "/fixed/subscriptions", "t-fixed").await;
    mock_task_failed(&server, "t-fixed", "processing-error", "Plan not available in region").await;
    let provider = configured(&server).await;

    let config = json!({"name": "cache", "plan_id": "34858", "payment_method_id": "4242"});
    let plan = planned(&provider, "rediscloud_essentials_subscription", &config);
    let result = provider
        .apply_resource_change(
            &OperationContext::background(),
            "rediscloud_essentials_subscription",
            None,
            Some(plan),
            Some(config),
        )
        .await;

    assert_eq!(result.new_state, None);
    assert!(result.diagnostics.has_errors());
    assert!(result.diagnostics.to_string().contains("Plan not available in region"));
}

#[tokio::test]
async fn test_payment_method_lookup() {
    let server = MockCloudServer::start().await;
    mock_get(
        &server,
        "/payment-methods",
        json!({"paymentMethods": [
            {"id": 11, "type": "Visa", "creditCardEndsWith": 1234, "expirationMonth": 1, "expirationYear": 2020},
            {"id": 12, "type": "Visa", "creditCardEndsWith": 5678, "expirationMonth": 12, "expirationYear": 2099},
            {"id": 13, "type": "Amex", "creditCardEndsWith": 9999, "expirationMonth": 12, "expirationYear": 2099}
        ]}),
    )
    .await;
    let provider = configured(&server).await;
    let ctx = OperationContext::background();

    let visa = provider
        .read_data_source(&ctx, "rediscloud_payment_method", json!({"card_type": "Visa"}))
        .await
        .unwrap();
    assert_eq!(visa["id"], json!("12"));
    assert_eq!(visa["last_four_numbers"], json!(5678));

    // Two unexpired cards match
    let diags = provider
        .read_data_source(&ctx, "rediscloud_payment_method", json!({}))
        .await
        .unwrap_err();
    assert!(diags.has_errors());

    let none = provider
        .read_data_source(&ctx, "rediscloud_payment_method", json!({"card_type": "Mastercard"}))
        .await
        .unwrap_err();
    assert!(none.to_string().contains("card_type = \"Mastercard\""));
}

#[tokio::test]
async fn test_acl_rule_lookup_by_name() {
    let server = MockCloudServer::start().await;
    mock_get(
        &server,
        "/acl/redisRules",
        json!({"accountRedisAclRules": [
            {"id": 1, "name": "Full-Access", "acl": "+@all ~*"},
            {"id": 2, "name": "Read-Only", "acl": "+@read ~*"}
        ]}),
    )
    .await;
    let provider = configured(&server).await;

    let rule = provider
        .read_data_source(
            &OperationContext::background(),
            "rediscloud_acl_rule",
            json!({"name": "Read-Only"}),
        )
        .await
        .unwrap();
    assert_eq!(rule["id"], json!("2"));
    assert_eq!(rule["rule"], json!("+@read ~*"));
}

#[tokio::test]
async fn test_unconfigured_provider_reports_error() {
    let provider = Provider::new();
    let diags = provider
        .read_data_source(
            &OperationContext::background(),
            "rediscloud_acl_rule",
            json!({"name": "Read-Only"}),
        )
        .await
        .unwrap_err();
    assert!(diags.has_errors());
}

fn pro_subscription_config() -> Value {
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

async fn mock_subscription_extras(server: &MockCloudServer, id: i32) {
    mock_get(
        server,
        &format!("/subscriptions/{}/maintenance-windows", id),
        json!({"mode": "automatic", "windows": []}),
    )
    .await;
}

#[tokio::test]
async fn test_pro_subscription_create_clears_creation_plan() {
    let server = MockCloudServer::start().await;
    mock_submit(&server, "POST", "/subscriptions", "t-sub").await;
    mock_task_completed(&server, "t-sub", 77).await;
    mock_get_sequence(
        &server,
        "/subscriptions/77",
        vec![with_status(subscription(77, "prod"), "pending"), subscription(77, "prod")],
    )
    .await;
    mock_get(
        &server,
        "/subscriptions/77/databases",
        database_page(77, vec![database(51, "creation-plan-db-1")]),
    )
    .await;
    // Active once for the settle wait, then gone after the delete
    server
        .mount(
            Mock::given(method("GET"))
                .and(path("/subscriptions/77/databases/51"))
                .respond_with(success(database(51, "creation-plan-db-1")))
                .up_to_n_times(1),
        )
        .await;
    mock_missing(&server, "GET", "/subscriptions/77/databases/51").await;
    mock_submit(&server, "DELETE", "/subscriptions/77/databases/51", "t-del").await;
    mock_task_completed(&server, "t-del", 51).await;
    mock_subscription_extras(&server, 77).await;
    mock_get(
        &server,
        "/subscriptions/77/pricing",
        json!({"pricing": [{
            "type": "Shards",
            "quantity": 2,
            "quantityMeasurement": "shards",
            "pricePerUnit": 0.1,
            "priceCurrency": "USD",
            "pricePeriod": "hour",
            "region": "us-east-1"
        }]}),
    )
    .await;
    let provider = configured(&server).await;

    let config = pro_subscription_config();
    let plan = planned(&provider, "rediscloud_subscription", &config);
    let result = provider
        .apply_resource_change(
            &OperationContext::background(),
            "rediscloud_subscription",
            None,
            Some(plan),
            Some(config),
        )
        .await;
    assert!(result.diagnostics.is_empty(), "{}", result.diagnostics);

    let state = result.new_state.unwrap();
    assert_eq!(state["id"], json!("77"));
    assert_eq!(state["status"], json!("active"));
    assert_eq!(state["memory_storage"], json!("ram"));
    let pricing = state["pricing"].as_array().unwrap();
    assert!(!pricing.is_empty());
    assert_eq!(pricing[0]["type"], json!("Shards"));

    let bodies = received_bodies(&server, "POST", "/subscriptions").await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["name"], json!("prod"));
    assert_eq!(bodies[0]["paymentMethodId"], json!(4242));
    assert_eq!(
        received_bodies(&server, "DELETE", "/subscriptions/77/databases/51").await.len(),
        1
    );
}

#[tokio::test]
async fn test_subscription_read_keeps_state_when_pricing_is_missing() {
    let server = MockCloudServer::start().await;
    server.mock_subscription_get(77, subscription(77, "prod")).await;
    mock_subscription_extras(&server, 77).await;
    mock_missing(&server, "GET", "/subscriptions/77/pricing").await;
    let provider = configured(&server).await;

    let mut current = pro_subscription_config();
    current["id"] = json!("77");
    let err = provider
        .read_resource(&OperationContext::background(), "rediscloud_subscription", current)
        .await
        .unwrap_err();
    assert!(err.has_errors());
    assert!(err.to_string().contains("pricing"), "{}", err);
}

#[tokio::test]
async fn test_database_read_keeps_state_when_tags_are_missing() {
    let server = MockCloudServer::start().await;
    server.mock_database_get(1234, 5678, database(5678, "cache")).await;
    mock_missing(&server, "GET", "/subscriptions/1234/databases/5678/tags").await;
    let provider = configured(&server).await;

    let result = provider
        .read_resource(
            &OperationContext::background(),
            "rediscloud_subscription_database",
            json!({"id": "1234/5678", "subscription_id": "1234", "name": "cache"}),
        )
        .await;
    assert!(result.is_err());
}

#[tokio::test]
async fn test_replica_of_round_trips_through_create_and_refresh() {
    let server = MockCloudServer::start().await;
    let source = "redis://redis-1.example.com:6379";
    server
        .mock_subscription_get(1234, SubscriptionFixture::new(1234, "prod").build())
        .await;
    server
        .mount(
            Mock::given(method("POST"))
                .and(path("/subscriptions/1234/databases"))
                .and(body_partial_json(json!({"replica": {"syncSources": [{"endpoint": source}]}})))
                .respond_with(received("t-db"))
                .expect(1),
        )
        .await;
    mock_task_completed(&server, "t-db", 5678).await;
    let mut db = database(5678, "replica");
    db["replica"] = json!({"syncSources": [{"endpoint": source}]});
    server.mock_database_get(1234, 5678, db).await;
    mock_get(&server, "/subscriptions/1234/databases/5678/tags", json!({"tags": []})).await;
    let provider = configured(&server).await;

    let config = json!({
        "subscription_id": "1234",
        "name": "replica",
        "memory_limit_in_gb": 1,
        "throughput_measurement_by": "operations-per-second",
        "throughput_measurement_value": 1000,
        "replica_of": [source]
    });
    let plan = planned(&provider, "rediscloud_subscription_database", &config);
    let result = provider
        .apply_resource_change(
            &OperationContext::background(),
            "rediscloud_subscription_database",
            None,
            Some(plan),
            Some(config),
        )
        .await;
    assert!(result.diagnostics.is_empty(), "{}", result.diagnostics);
    let created = result.new_state.unwrap();
    assert_eq!(created["id"], json!("1234/5678"));
    assert_eq!(created["replica_of"], json!([source]));

    let refreshed = provider
        .read_resource(
            &OperationContext::background(),
            "rediscloud_subscription_database",
            created,
        )
        .await
        .unwrap()
        .unwrap();
    assert_eq!(refreshed["replica_of"], json!([source]));
}

#[tokio::test]
async fn test_psc_accepter_waits_for_subscription_lock() {
    let server = MockCloudServer::start().await;
    let service = "/subscriptions/10/private-service-connect/30";
    let endpoint = "/subscriptions/10/private-service-connect/30/endpoints/40";
    mock_submit(&server, "GET", service, "t-psc").await;
    mock_get_sequence(
        &server,
        "/tasks/t-psc",
        vec![
            task_with_resource("t-psc", json!({"endpoints": [{"id": 40, "status": "pending"}]})),
            task_with_resource("t-psc", json!({"endpoints": [{"id": 40, "status": "active"}]})),
        ],
    )
    .await;
    mock_submit(&server, "PUT", endpoint, "t-act").await;
    mock_task_completed(&server, "t-act", 40).await;

    let locks = Arc::new(SubscriptionLocks::new());
    let provider = configured_with_locks(&server, locks.clone()).await;
    let type_name = "rediscloud_private_service_connect_endpoint_accepter";
    let config = json!({
        "subscription_id": "10",
        "private_service_connect_service_id": 30,
        "private_service_connect_endpoint_id": 40,
        "action": "accept"
    });

    let held = locks.lock(&OperationContext::background(), 10).await.unwrap();
    let plan = planned(&provider, type_name, &config);
    let result = provider
        .apply_resource_change(
            &OperationContext::background().with_timeout(Duration::from_millis(200)),
            type_name,
            None,
            Some(plan),
            Some(config.clone()),
        )
        .await;
    assert_eq!(result.new_state, None);
    assert!(result.diagnostics.has_errors());
    assert!(received_bodies(&server, "PUT", endpoint).await.is_empty());
    drop(held);

    let plan = planned(&provider, type_name, &config);
    let result = provider
        .apply_resource_change(
            &OperationContext::background(),
            type_name,
            None,
            Some(plan),
            Some(config),
        )
        .await;
    assert!(result.diagnostics.is_empty(), "{}", result.diagnostics);
    assert_eq!(result.new_state.unwrap()["status"], json!("active"));
    let puts = received_bodies(&server, "PUT", endpoint).await;
    assert_eq!(puts, vec![json!({"action": "accept"})]);
}

#[tokio::test]
async fn test_rejected_region_add_leaves_regions_unmanaged() {
    let server = MockCloudServer::start().await;
    server
        .mock_subscription_get(20, SubscriptionFixture::new(20, "global").build())
        .await;
    mock_get(
        &server,
        "/subscriptions/20/regions",
        json!({"regions": [{
            "regionId": 1,
            "region": "us-east-1",
            "deploymentCIDR": "10.0.0.0/24",
            "databases": []
        }]}),
    )
    .await;
    server
        .mock_path("POST", "/subscriptions/20/regions", bad_request("Invalid CIDR"))
        .await;
    let provider = configured(&server).await;

    let type_name = "rediscloud_active_active_subscription_regions";
    let config = json!({
        "subscription_id": "20",
        "region": [
            {"region": "us-east-1", "networking_deployment_cidr": "10.0.0.0/24"},
            {"region": "eu-west-1", "networking_deployment_cidr": "10.1.0.0/24"}
        ]
    });
    let plan = planned(&provider, type_name, &config);
    let result = provider
        .apply_resource_change(&OperationContext::background(), type_name, None, Some(plan), Some(config))
        .await;

    assert_eq!(result.new_state, None);
    assert!(result.diagnostics.has_errors());
    assert!(result.diagnostics.to_string().contains("Invalid CIDR"));
}
