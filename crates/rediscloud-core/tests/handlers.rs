//! Integration tests for the family handlers: paths, request bodies and the
//! shapes the Cloud API answers with.

use std::collections::BTreeMap;

use pretty_assertions::assert_eq;
use rediscloud_core::api::maintenance::{MaintenanceWindow, MaintenanceWindows};
use rediscloud_core::api::transit_gateway::TgwScope;
use rediscloud_core::api::{
    AclHandler, BackupStatusHandler, DatabaseHandler, MaintenanceHandler, RegionHandler, TagHandler,
    TransitGatewayHandler,
};
use redis_cloud::testing::{MockCloudServer, success};
use rediscloud_core::{CloudClient, ClientOptions, OperationContext, ResourceFamily};
use serde_json::json;
use wiremock::Mock;
use wiremock::matchers::{body_json, body_partial_json, header, method, path, query_param};

mod common;

use common::{client, database, database_page, mock_get, mock_missing, mock_task_read, received};

// ============================================================================
// Transport
// ============================================================================

#[tokio::test]
async fn test_requests_carry_api_key_headers() {
    let server = MockCloudServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subscriptions/1/databases/2"))
        .and(header("x-api-key", "test-key"))
        .and(header("x-api-secret-key", "test-secret"))
        .respond_with(success(database(2, "cache")))
        .expect(1)
        .mount(server.inner())
        .await;

    let db = DatabaseHandler::new(client(&server)).get(1, 2).await.unwrap();
    assert_eq!(db.database_id, 2);
}

#[tokio::test]
async fn test_404_reports_requested_family() {
    let server = MockCloudServer::start().await;
    mock_missing(&server, "GET", "/subscriptions/1/databases/404").await;

    let err = DatabaseHandler::new(client(&server))
        .get(1, 404)
        .await
        .unwrap_err();
    assert!(err.is_not_found_in(ResourceFamily::Database), "{err:?}");
    assert!(!err.is_not_found_in(ResourceFamily::Subscription));
}

// ============================================================================
// Databases
// ============================================================================

#[tokio::test]
async fn test_database_list_follows_pages() {
    let server = MockCloudServer::start().await;
    let paged = CloudClient::from_cloud(
        server.client(),
        server.uri(),
        ClientOptions {
            page_size: 2,
            ..ClientOptions::immediate()
        },
    );

    Mock::given(method("GET"))
        .and(path("/subscriptions/1/databases"))
        .and(query_param("offset", "0"))
        .and(query_param("limit", "2"))
        .respond_with(success(database_page(1, vec![database(10, "a"), database(11, "b")])))
        .mount(server.inner())
        .await;
    Mock::given(method("GET"))
        .and(path("/subscriptions/1/databases"))
        .and(query_param("offset", "2"))
        .respond_with(success(database_page(1, vec![database(12, "c")])))
        .mount(server.inner())
        .await;

    let ids: Vec<i64> = DatabaseHandler::new(paged)
        .list(1)
        .await
        .unwrap()
        .iter()
        .map(|db| db.database_id)
        .collect();
    assert_eq!(ids, vec![10, 11, 12]);
}

#[tokio::test]
async fn test_empty_subscription_lists_no_databases() {
    let server = MockCloudServer::start().await;
    mock_get(&server, "/subscriptions/1/databases", json!({"accountId": 1, "subscription": []})).await;

    let dbs = DatabaseHandler::new(client(&server)).list(1).await.unwrap();
    assert!(dbs.is_empty());
}

// ============================================================================
// Active-Active regions
// ============================================================================

#[tokio::test]
async fn test_region_delete_sends_names_in_body() {
    let server = MockCloudServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/subscriptions/3/regions"))
        .and(body_json(json!({"regions": [{"region": "eu-west-1"}]})))
        .respond_with(received("t-r"))
        .expect(1)
        .mount(server.inner())
        .await;

    let task = RegionHandler::new(client(&server))
        .delete(3, &["eu-west-1".to_string()])
        .await
        .unwrap();
    assert_eq!(task.task_id.as_deref(), Some("t-r"));
}

// ============================================================================
// Transit gateways
// ============================================================================

#[tokio::test]
async fn test_tgw_list_is_read_through_task() {
    let server = MockCloudServer::start().await;
    mock_task_read(
        &server,
        "/subscriptions/4/transitGateways",
        "t-tgw",
        json!({"resources": [{
            "id": 88,
            "awsTgwUid": "tgw-0abc",
            "attachmentUid": "tgw-attach-0abc",
            "status": "available",
            "attachmentStatus": "available",
            "awsAccountId": "123456789012",
            "cidrs": [{"cidrAddress": "10.10.0.0/16", "status": "active"}]
        }]}),
    )
    .await;

    let tgw = TransitGatewayHandler::new(client(&server))
        .get(&OperationContext::background(), TgwScope::Subscription(4), 88)
        .await
        .unwrap();
    assert_eq!(tgw.aws_tgw_uid.as_deref(), Some("tgw-0abc"));
    assert_eq!(tgw.cidr_addresses(), vec!["10.10.0.0/16".to_string()]);
}

#[tokio::test]
async fn test_tgw_missing_from_list_is_not_found() {
    let server = MockCloudServer::start().await;
    mock_task_read(&server, "/subscriptions/4/transitGateways", "t-tgw", json!({"resources": []})).await;

    let err = TransitGatewayHandler::new(client(&server))
        .get(&OperationContext::background(), TgwScope::Subscription(4), 88)
        .await
        .unwrap_err();
    assert!(err.is_not_found_in(ResourceFamily::TransitGateway));
}

#[tokio::test]
async fn test_tgw_clearing_routes_sends_empty_list() {
    let server = MockCloudServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/subscriptions/5/regions/2/transitGateways/88/attachment"))
        .and(body_json(json!({"cidrs": []})))
        .respond_with(received("t-c"))
        .expect(1)
        .mount(server.inner())
        .await;

    TransitGatewayHandler::new(client(&server))
        .update_cidrs(
            TgwScope::Region {
                subscription_id: 5,
                region_id: 2,
            },
            88,
            &[],
        )
        .await
        .unwrap();
}

#[tokio::test]
async fn test_tgw_subscription_routes_use_attachment_request() {
    let server = MockCloudServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/subscriptions/4/transitGateways/88/attachment"))
        .and(body_partial_json(json!({"cidrs": ["10.10.0.0/16"]})))
        .respond_with(received("t-s"))
        .expect(1)
        .mount(server.inner())
        .await;

    let task = TransitGatewayHandler::new(client(&server))
        .update_cidrs(TgwScope::Subscription(4), 88, &["10.10.0.0/16".to_string()])
        .await
        .unwrap();
    assert_eq!(task.task_id.as_deref(), Some("t-s"));
}

// ============================================================================
// ACL
// ============================================================================

#[tokio::test]
async fn test_acl_user_create_sends_name_role_password() {
    let server = MockCloudServer::start().await;
    Mock::given(method("POST"))
        .and(path("/acl/users"))
        .and(body_json(json!({"name": "app", "role": "Read-Only", "password": "s3cret!Pass"})))
        .respond_with(received("t-u"))
        .expect(1)
        .mount(server.inner())
        .await;

    let task = AclHandler::new(client(&server))
        .create_user("app", "Read-Only", "s3cret!Pass")
        .await
        .unwrap();
    assert_eq!(task.task_id.as_deref(), Some("t-u"));
}

#[tokio::test]
async fn test_acl_user_delete_of_missing_user_is_not_found() {
    let server = MockCloudServer::start().await;
    mock_missing(&server, "DELETE", "/acl/users/7").await;

    let err = AclHandler::new(client(&server)).delete_user(7).await.unwrap_err();
    assert!(err.is_not_found_in(ResourceFamily::AclUser), "{err:?}");
}

#[tokio::test]
async fn test_ids_beyond_api_range_are_rejected_before_sending() {
    let server = MockCloudServer::start().await;

    let err = AclHandler::new(client(&server))
        .delete_user(i64::from(i32::MAX) + 1)
        .await
        .unwrap_err();
    assert!(err.is_bad_request());
    assert!(server.inner().received_requests().await.unwrap_or_default().is_empty());
}

// ============================================================================
// Tags, maintenance, backups
// ============================================================================

#[tokio::test]
async fn test_tags_round_trip_as_key_value_list() {
    let server = MockCloudServer::start().await;
    mock_get(
        &server,
        "/subscriptions/1/databases/2/tags",
        json!({"tags": [{"key": "env", "value": "prod"}, {"key": "team", "value": "core"}]}),
    )
    .await;
    Mock::given(method("PUT"))
        .and(path("/subscriptions/1/databases/2/tags"))
        .and(body_json(json!({"tags": [{"key": "env", "value": "dev"}]})))
        .respond_with(success(json!({})))
        .expect(1)
        .mount(server.inner())
        .await;

    let handler = TagHandler::new(client(&server));
    let tags = handler.get(1, 2).await.unwrap();
    assert_eq!(tags.get("team").map(String::as_str), Some("core"));

    let update: BTreeMap<String, String> = [("env".to_string(), "dev".to_string())].into();
    handler.put(1, 2, &update).await.unwrap();
}

#[tokio::test]
async fn test_automatic_maintenance_drops_windows() {
    let server = MockCloudServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/subscriptions/1/maintenance-windows"))
        .and(body_json(json!({"mode": "automatic"})))
        .respond_with(received("t-m"))
        .expect(1)
        .mount(server.inner())
        .await;

    let windows = MaintenanceWindows {
        mode: "automatic".to_string(),
        windows: vec![MaintenanceWindow {
            start_hour: 3,
            duration_in_hours: 4,
            days: vec!["Monday".to_string()],
        }],
    };
    MaintenanceHandler::new(client(&server))
        .update(1, &windows)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_backup_status_without_resource_is_empty() {
    let server = MockCloudServer::start().await;
    server
        .mock_path("GET", "/subscriptions/1/databases/2/backup", received("t-b"))
        .await;
    server
        .mock_task_get("t-b", json!({"taskId": "t-b", "status": "processing-completed", "response": {}}))
        .await;

    let status = BackupStatusHandler::new(client(&server))
        .latest_backup(&OperationContext::background(), 1, 2)
        .await
        .unwrap();
    assert_eq!(status.status, None);
}
