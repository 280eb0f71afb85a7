//! Mock API helpers shared by the integration tests
//!
//! Builds on `redis_cloud::testing`: the mock server, response templates and
//! fixtures come from there. What is added here is the task envelope the
//! Cloud API answers mutations and task-backed reads with.

#![allow(dead_code)]

use redis_cloud::testing::{
    DatabaseFixture, Mock, MockCloudServer, ResponseTemplate, TaskFixture, accepted, method,
    not_found, path, success,
};
use rediscloud_core::{ClientOptions, CloudClient};
use serde_json::{Value, json};

/// A core client pointed at `server` with every wait interval zeroed
pub fn client(server: &MockCloudServer) -> CloudClient {
    CloudClient::from_cloud(server.client(), server.uri(), ClientOptions::immediate())
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

/// `method path` answers 404
pub async fn mock_missing(server: &MockCloudServer, http_method: &str, p: &str) {
    server
        .mock_path(http_method, p, not_found(format!("{} not found", p)))
        .await;
}

/// Accept a mutation and hand back `task_id`
pub async fn mock_submit(server: &MockCloudServer, http_method: &str, p: &str, task_id: &str) {
    server.mock_path(http_method, p, accepted(task_id, "request")).await;
}

pub async fn mock_task_completed(server: &MockCloudServer, task_id: &str, resource_id: i32) {
    server
        .mock_task_get(task_id, TaskFixture::completed(task_id, resource_id).build())
        .await;
}

/// The task fails the way the Cloud API reports it: an error object
pub async fn mock_task_failed(server: &MockCloudServer, task_id: &str, status: &str, description: &str) {
    server.mock_task_get(task_id, failed_task(task_id, status, description)).await;
}

/// A task-backed read: `GET path` submits `task_id`, which completes with `resource`
pub async fn mock_task_read(server: &MockCloudServer, p: &str, task_id: &str, resource: Value) {
    server.mock_path("GET", p, accepted(task_id, "request")).await;
    server.mock_task_get(task_id, task_with_resource(task_id, resource)).await;
}

/// Bodies received so far for `method path`
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

pub fn failed_task(task_id: &str, status: &str, description: &str) -> Value {
    json!({
        "taskId": task_id,
        "status": "processing-error",
        "response": {"error": {"type": "ERROR", "status": status, "description": description}}
    })
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

/// `{"subscription": [{"databases": [...]}]}` list page
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
