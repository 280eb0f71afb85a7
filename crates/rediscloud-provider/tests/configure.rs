//! Provider configuration and environment fallbacks

use std::env;

use pretty_assertions::assert_eq;
use rediscloud_core::OperationContext;
use redis_cloud::testing::MockCloudServer;
use rediscloud_provider::Provider;
use rediscloud_provider::host::value::UNKNOWN;
use serde_json::json;
use serial_test::serial;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, ResponseTemplate};

fn clear_env() {
    unsafe {
        env::remove_var("REDISCLOUD_URL");
        env::remove_var("REDISCLOUD_ACCESS_KEY");
        env::remove_var("REDISCLOUD_SECRET_KEY");
    }
}

#[tokio::test]
#[serial]
async fn test_missing_secret_is_scoped_to_attribute() {
    clear_env();
    let provider = Provider::new();
    let diags = provider
        .configure(&json!({"api_key": "key"}))
        .await
        .unwrap_err();
    let error = diags.errors().next().unwrap();
    assert_eq!(error.attribute.as_deref(), Some("secret_key"));
    assert!(error.summary.contains("REDISCLOUD_SECRET_KEY"));
}

#[tokio::test]
#[serial]
async fn test_unknown_credentials_are_rejected() {
    clear_env();
    let provider = Provider::new();
    let diags = provider
        .configure(&json!({"api_key": UNKNOWN, "secret_key": "secret"}))
        .await
        .unwrap_err();
    assert_eq!(
        diags.errors().next().and_then(|d| d.attribute.clone()),
        Some("api_key".to_string())
    );
}

#[tokio::test]
#[serial]
async fn test_bad_url_is_rejected() {
    clear_env();
    let provider = Provider::new();
    let diags = provider
        .configure(&json!({"url": "ftp://api.example.com", "api_key": "k", "secret_key": "s"}))
        .await
        .unwrap_err();
    assert_eq!(
        diags.errors().next().and_then(|d| d.attribute.clone()),
        Some("url".to_string())
    );
}

#[tokio::test]
#[serial]
async fn test_environment_credentials_reach_the_api() {
    clear_env();
    let server = MockCloudServer::start().await;
    Mock::given(method("GET"))
        .and(path("/acl/users"))
        .and(header("x-api-key", "env-key"))
        .and(header("x-api-secret-key", "env-secret"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "accountACLUsers": [{"id": 7, "name": "app", "role": "Read-Only"}]
        })))
        .mount(server.inner())
        .await;

    unsafe {
        env::set_var("REDISCLOUD_URL", format!("{}/", server.uri()));
        env::set_var("REDISCLOUD_ACCESS_KEY", "env-key");
        env::set_var("REDISCLOUD_SECRET_KEY", "env-secret");
    }
    let provider = Provider::new();
    provider.configure(&json!({})).await.unwrap();

    let user = provider
        .read_data_source(
            &OperationContext::background(),
            "rediscloud_acl_user",
            json!({"name": "app"}),
        )
        .await
        .unwrap();
    assert_eq!(user["id"], json!("7"));
    assert_eq!(user["role"], json!("Read-Only"));
    clear_env();
}
