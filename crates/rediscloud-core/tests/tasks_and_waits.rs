//! Integration tests for task polling, state waiters and the multi-step
//! workflows, run against a mock Cloud API.

use std::time::Duration;

use pretty_assertions::assert_eq;
use rediscloud_core::api::tasks::TaskStateUpdate;
use rediscloud_core::cloud::{self, AclKind};
use rediscloud_core::progress::wait_for_task;
use redis_cloud::testing::{MockCloudServer, SubscriptionFixture, TaskFixture, success};
use rediscloud_core::{CoreError, OperationContext, ResourceFamily};
use serde_json::{Value, json};
use wiremock::Mock;
use wiremock::matchers::{method, path};

mod common;

use common::{
    client, database, database_page, mock_get, mock_get_sequence, mock_missing, mock_submit,
    mock_task_completed, mock_task_failed, received, received_bodies,
};

const TIMEOUT: Duration = Duration::from_secs(30);

fn submission(task_id: &str) -> TaskStateUpdate {
    TaskStateUpdate::from_submission(json!({"taskId": task_id, "status": "received"})).unwrap()
}

fn processing(task_id: &str) -> Value {
    TaskFixture::new(task_id).status("processing-in-progress").build()
}

fn with_status(mut body: Value, status: &str) -> Value {
    body["status"] = json!(status);
    body
}

/// Accept exactly `times` calls to `method path`
async fn mock_submit_times(server: &MockCloudServer, http_method: &str, p: &str, task_id: &str, times: u64) {
    server
        .mount(
            Mock::given(method(http_method))
                .and(path(p))
                .respond_with(received(task_id))
                .up_to_n_times(times)
                .expect(times),
        )
        .await;
}

// ============================================================================
// Task polling
// ============================================================================

#[tokio::test]
async fn test_task_polls_until_completed() {
    let server = MockCloudServer::start().await;
    mock_get_sequence(
        &server,
        "/tasks/t-1",
        vec![
            processing("t-1"),
            processing("t-1"),
            TaskFixture::completed("t-1", 42).build(),
        ],
    )
    .await;

    let done = wait_for_task(
        &OperationContext::background(),
        &client(&server),
        submission("t-1"),
        TIMEOUT,
    )
    .await
    .unwrap();

    assert_eq!(done.resource_id().unwrap(), 42);
}

#[tokio::test]
async fn test_task_failure_surfaces_description() {
    let server = MockCloudServer::start().await;
    mock_task_failed(&server, "t-2", "400 BAD_REQUEST", "Subscription name already in use").await;

    let err = wait_for_task(
        &OperationContext::background(),
        &client(&server),
        submission("t-2"),
        TIMEOUT,
    )
    .await
    .unwrap_err();

    match err {
        CoreError::TaskFailed(message) => {
            assert!(message.contains("Subscription name already in use"), "{message}");
        }
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_task_backed_read_maps_404_to_family() {
    let server = MockCloudServer::start().await;
    server
        .mock_path("GET", "/subscriptions/9/cidr", received("t-cidr"))
        .await;
    mock_task_failed(&server, "t-cidr", "404 NOT_FOUND", "Subscription 9 not found").await;

    let handler = rediscloud_core::api::SubscriptionHandler::new(client(&server));
    let err = handler
        .get_cidr_allowlist(&OperationContext::background(), 9)
        .await
        .unwrap_err();

    assert!(err.is_not_found_in(ResourceFamily::Subscription), "{err:?}");
}

#[tokio::test]
async fn test_cancelled_context_stops_task_polling() {
    let server = MockCloudServer::start().await;
    server.mock_task_get("t-3", processing("t-3")).await;

    let ctx = OperationContext::background();
    ctx.cancel();
    let err = wait_for_task(&ctx, &client(&server), submission("t-3"), TIMEOUT)
        .await
        .unwrap_err();

    assert!(err.is_cancelled(), "{err:?}");
}

// ============================================================================
// State waiters
// ============================================================================

#[tokio::test]
async fn test_subscription_waits_through_pending() {
    let server = MockCloudServer::start().await;
    mock_get_sequence(
        &server,
        "/subscriptions/1",
        vec![
            SubscriptionFixture::new(1, "prod").status("pending").build(),
            SubscriptionFixture::new(1, "prod").status("pending").build(),
            SubscriptionFixture::new(1, "prod").build(),
        ],
    )
    .await;

    let sub = cloud::wait_for_subscription_active(
        &OperationContext::background(),
        &client(&server),
        1,
        TIMEOUT,
    )
    .await
    .unwrap();

    assert_eq!(sub.status(), "active");
    assert_eq!(sub.name.as_deref(), Some("prod"));
}

#[tokio::test]
async fn test_subscription_error_state_is_unexpected() {
    let server = MockCloudServer::start().await;
    server
        .mock_subscription_get(1, SubscriptionFixture::new(1, "prod").status("error").build())
        .await;

    let err = cloud::wait_for_subscription_active(
        &OperationContext::background(),
        &client(&server),
        1,
        TIMEOUT,
    )
    .await
    .unwrap_err();

    match err {
        CoreError::UnexpectedState { state, .. } => assert_eq!(state, "error"),
        other => panic!("unexpected error: {other:?}"),
    }
}

#[tokio::test]
async fn test_database_delete_wait_treats_404_as_done() {
    let server = MockCloudServer::start().await;
    Mock::given(method("GET"))
        .and(path("/subscriptions/1/databases/5"))
        .respond_with(success(with_status(database(5, "cache"), "deleting")))
        .up_to_n_times(2)
        .mount(server.inner())
        .await;
    mock_missing(&server, "GET", "/subscriptions/1/databases/5").await;

    cloud::wait_for_database_deleted(
        &OperationContext::background(),
        &client(&server),
        1,
        5,
        TIMEOUT,
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_wait_honours_context_deadline() {
    let server = MockCloudServer::start().await;
    server
        .mock_subscription_get(1, SubscriptionFixture::new(1, "prod").status("pending").build())
        .await;

    let ctx = OperationContext::background().with_timeout(Duration::from_millis(200));
    let err = cloud::wait_for_subscription_active(&ctx, &client(&server), 1, TIMEOUT)
        .await
        .unwrap_err();

    assert!(err.is_timeout(), "{err:?}");
}

// ============================================================================
// Workflows
// ============================================================================

#[tokio::test]
async fn test_create_database_and_wait_returns_new_id() {
    let server = MockCloudServer::start().await;
    mock_submit(&server, "POST", "/subscriptions/1/databases", "t-db").await;
    mock_task_completed(&server, "t-db", 77).await;
    mock_get_sequence(
        &server,
        "/subscriptions/1/databases/77",
        vec![with_status(database(77, "cache"), "draft"), database(77, "cache")],
    )
    .await;

    let request = rediscloud_core::api::databases::DatabaseRequest {
        name: Some("cache".to_string()),
        ..Default::default()
    };
    let id = cloud::create_database_and_wait(
        &OperationContext::background(),
        &client(&server),
        1,
        &request,
        TIMEOUT,
    )
    .await
    .unwrap();

    assert_eq!(id, 77);
    let bodies = received_bodies(&server, "POST", "/subscriptions/1/databases").await;
    assert_eq!(bodies.len(), 1);
    assert_eq!(bodies[0]["name"], json!("cache"));
}

#[tokio::test]
async fn test_creation_plan_databases_are_removed() {
    let server = MockCloudServer::start().await;
    server
        .mock_subscription_get(1, SubscriptionFixture::new(1, "prod").build())
        .await;
    mock_get(
        &server,
        "/subscriptions/1/databases",
        database_page(1, vec![database(51, "creation-plan-db-1")]),
    )
    .await;
    Mock::given(method("GET"))
        .and(path("/subscriptions/1/databases/51"))
        .respond_with(success(database(51, "creation-plan-db-1")))
        .up_to_n_times(1)
        .mount(server.inner())
        .await;
    mock_missing(&server, "GET", "/subscriptions/1/databases/51").await;
    mock_submit_times(&server, "DELETE", "/subscriptions/1/databases/51", "t-del", 1).await;
    mock_task_completed(&server, "t-del", 51).await;

    cloud::remove_creation_plan_databases(
        &OperationContext::background(),
        &client(&server),
        1,
        TIMEOUT,
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn test_acl_user_delete_is_reissued_until_gone() {
    let server = MockCloudServer::start().await;
    mock_submit_times(&server, "DELETE", "/acl/users/7", "t-user", 2).await;
    mock_task_completed(&server, "t-user", 7).await;
    Mock::given(method("GET"))
        .and(path("/acl/users/7"))
        .respond_with(success(json!({
            "id": 7, "name": "app", "role": "reader", "status": "active"
        })))
        .up_to_n_times(1)
        .mount(server.inner())
        .await;
    server.mock_not_found("/acl/users/7").await;

    cloud::delete_acl_user_and_wait(&OperationContext::background(), &client(&server), 7, TIMEOUT)
        .await
        .unwrap();
}

#[tokio::test]
async fn test_acl_rule_wait_reads_from_list() {
    let server = MockCloudServer::start().await;
    mock_get_sequence(
        &server,
        "/acl/redisRules",
        vec![
            json!({"accountRedisAclRules": [{"id": 3, "name": "ro", "acl": "+@read", "status": "pending"}]}),
            json!({"accountRedisAclRules": [{"id": 3, "name": "ro", "acl": "+@read", "status": "active"}]}),
        ],
    )
    .await;

    cloud::wait_for_acl_active(
        &OperationContext::background(),
        &client(&server),
        AclKind::Rule,
        3,
        TIMEOUT,
    )
    .await
    .unwrap();
}
