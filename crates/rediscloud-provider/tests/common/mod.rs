//! Mock API helpers shared by the provider integration tests
//!
//! The mock server, response templates and fixtures come from
//! `redis_cloud::testing`; this adds the task envelope and a provider wired
//! to the server.

#![allow(dead_code)]

use std::sync::Arc;

use redis_cloud::testing::{
    DatabaseFixture, Mock, MockCloudServer, ResponseTemplate, SubscriptionFixture, TaskFixture,
    accepted, method, not_found, path, success,
};
use rediscloud_core::{ClientOptions, CloudClient, SubscriptionLocks};
use rediscloud_provider::{Provider, ProviderState};
use serde_json::{Value, json};

pub fn client(server: &MockCloudServer) -> CloudClient {
    CloudClient::from_cloud(server.client(), server.uri(), ClientOptions::immediate())
}

/// A provider configured against `server` with its own lock table
pub async fn configured(server: &MockCloudServer) -> Provider {
    configured_with_locks(server, Arc::new(SubscriptionLocks::new())).await
}

pub async fn configured_with_locks(server: &MockCloudServer, locks: Arc<SubscriptionLocks>) -> Provider {
    let provider = Provider::new();
    provider
        .configure_with(ProviderState::with_locks(client(server), locks))
        .await;
    provider
}

pub fn planned(provider: &Provider, type_name: &str, config: &Value) -> Value {
    provider
        .plan_resource_change(type_name, None, Some(config))
        .unwrap()
        .planned_state
        .unwrap()
}

pub async fn mock_get(server: &MockCloudServer, p: &str, body: Value) {
    server.mock_path("GET", p, success(body)).await;
}

/// Answer successive `GET path` calls with `bodies` in order; the last body
/// keeps answering once the others are used up
pub async fn mock_get_sequence(server: &MockCloudServer, p: &str, bodies: Vec<Value>) {
    let count = bodies.len();
    for (i, body) in bodies.into_iter().enumerate() {
        let mock = Mock::given(method("GET")).and(path(p)).respond_with(success(body));
        let mock = if i + 1 < count { mock.up_to_n_times(1) } else { mock };
        server.mount(mock).await;
    }
}

pub async fn mock_missing(server: &MockCloudServer, http_method: &str, p: &str) {
    server
        .mock_path(http_method, p, not_found(format!("{} not found", p)))
        .await;
}

pub async fn mock_submit(server: &MockCloudServer, http_method: &str, p: &str, task_id: &str) {
    server.mock_path(http_method, p, received(task_id)).await;
}

pub async fn mock_task_completed(server: &MockCloudServer, task_id: &str, resource_id: i32) {
    server
        .mock_task_get(task_id, TaskFixture::completed(task_id, resource_id).build())
        .await;
}

pub async fn mock_task_failed(server: &MockCloudServer, task_id: &str, status: &str, description: &str) {
    server
        .mock_task_get(
            task_id,
            json!({
                "taskId": task_id,
                "status": "processing-error",
                "response": {"error": {"type": "ERROR", "status": status, "description": description}}
            }),
        )
        .await;
}

/// A task-backed read: `GET path` submits `task_id`, which completes with `resource`
pub async fn mock_task_read(server: &MockCloudServer, p: &str, task_id: &str, resource: Value) {
    mock_submit(server, "GET", p, task_id).await;
    server.mock_task_get(task_id, task_with_resource(task_id, resource)).await;
}

pub async fn received_bodies(server: &MockCloudServer, http_method: &str, p: &str) -> Vec<Value> {
    server
        .inner()
        .received_requests()
        .await
        .unwrap_or_default()
        .into_iter()
        .filter(|r| r.method.as_str() == http_method && r.url.path() == p)
        .map(|r| serde_json::from_slice(&r.body).unwrap_or(Value::Null))
        .collect()
}

pub fn received(task_id: &str) -> ResponseTemplate {
    accepted(task_id, "request")
}

pub fn task_with_resource(task_id: &str, resource: Value) -> Value {
    json!({
        "taskId": task_id,
        "status": "processing-completed",
        "response": {"resource": resource}
    })
}

/// A Pro subscription on AWS us-east-1 with its networking
pub fn subscription(id: i32, name: &str) -> Value {
    let mut sub = SubscriptionFixture::new(id, name)
        .payment_method_type("credit-card")
        .memory_storage("ram")
        .build();
    sub["paymentMethodId"] = json!(4242);
    sub["deploymentType"] = json!("single-region");
    sub["cloudDetails"] = json!([{
        "provider": "AWS",
        "cloudAccountId": 1,
        "regions": [{
            "region": "us-east-1",
            "multipleAvailabilityZones": false,
            "preferredAvailabilityZones": [],
            "networking": [{"deploymentCIDR": "10.0.0.0/24", "vpcId": "vpc-0a1b2c", "subnetId": "subnet-0a1b2c"}]
        }]
    }]);
    sub
}

/// A database body with the fields the provider reads back
pub fn database(id: i32, name: &str) -> Value {
    let mut db = DatabaseFixture::new(id, name)
        .protocol("redis")
        .replication(true)
        .data_persistence("none")
        .throughput("operations-per-second", 1000)
        .public_endpoint(format!("redis-{}.c1.us-east-1.ec2.cloud.redislabs.com:12000", id))
        .private_endpoint(format!("redis-{}.internal.c1.us-east-1.ec2.cloud.redislabs.com:12000", id))
        .build();
    db["dataEvictionPolicy"] = json!("volatile-lru");
    db["security"] = json!({
        "enableDefaultUser": true,
        "password": "secret",
        "sslClientAuthentication": false,
        "tlsClientAuthentication": false,
        "enableTls": false,
        "sourceIps": ["0.0.0.0/0"]
    });
    db
}

pub fn with_status(mut body: Value, status: &str) -> Value {
    body["status"] = json!(status);
    body
}

pub fn database_page(subscription_id: i32, databases: Vec<Value>) -> Value {
    json!({
        "accountId": 1,
        "subscription": [{
            "subscriptionId": subscription_id,
            "numberOfDatabases": databases.len(),
            "databases": databases
        }]
    })
}
