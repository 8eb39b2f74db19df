//! Integration tests for the token manager
//!
//! Verifies credential caching within the leeway window, forced refresh,
//! cache invalidation on failed grants, and the error taxonomy of the
//! token endpoint.

use drivegate_core::error::ServiceError;
use drivegate_graph::auth::TokenManager;
use wiremock::matchers::{body_string_contains, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use crate::common;

#[tokio::test]
async fn test_cached_credential_is_reused_within_leeway() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "first-token",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = common::token_manager(&server);

    let first = tokens.credential(false).await.expect("first grant failed");
    let second = tokens.credential(false).await.expect("cached read failed");

    assert_eq!(first.secret(), "first-token");
    assert_eq!(second.secret(), "first-token");
    // The mock's expect(1) verifies no second network call happened.
}

#[tokio::test]
async fn test_forced_refresh_always_performs_a_grant() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "token",
            "expires_in": 3600
        })))
        .expect(2)
        .mount(&server)
        .await;

    let tokens = common::token_manager(&server);
    tokens.credential(false).await.expect("initial grant failed");
    tokens.credential(true).await.expect("forced grant failed");
}

#[tokio::test]
async fn test_grant_sends_refresh_token_form() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .and(body_string_contains("grant_type=refresh_token"))
        .and(body_string_contains("refresh_token=test-refresh-token"))
        .and(body_string_contains("client_id=test-client-id"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "token",
            "expires_in": 3600
        })))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = common::token_manager(&server);
    tokens.credential(false).await.expect("grant failed");
}

#[tokio::test]
async fn test_missing_refresh_token_is_a_configuration_error() {
    let server = MockServer::start().await;

    let tokens = TokenManager::new(&common::test_config(None))
        .with_token_url(format!("{}/token", server.uri()));

    let err = tokens.credential(false).await.unwrap_err();
    assert!(matches!(err, ServiceError::Configuration(_)));
    assert_eq!(err.status(), 500);
    assert!(server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_rejected_grant_is_an_auth_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(400).set_body_json(serde_json::json!({
            "error": "invalid_grant",
            "error_description": "The refresh token has expired"
        })))
        .mount(&server)
        .await;

    let tokens = common::token_manager(&server);
    let err = tokens.credential(false).await.unwrap_err();

    assert!(matches!(err, ServiceError::Auth(_)));
    assert!(err.to_string().contains("The refresh token has expired"));
}

#[tokio::test]
async fn test_token_endpoint_outage_is_an_external_service_error() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(503).set_body_string("try later"))
        .mount(&server)
        .await;

    let tokens = common::token_manager(&server);
    let err = tokens.credential(false).await.unwrap_err();

    assert!(matches!(err, ServiceError::ExternalService { status: 503, .. }));
}

#[tokio::test]
async fn test_failed_refresh_invalidates_the_cache() {
    let server = MockServer::start().await;

    // First grant succeeds, the forced second one fails, the third must
    // hit the network again instead of serving the stale credential.
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "token-a",
            "expires_in": 3600
        })))
        .up_to_n_times(1)
        .with_priority(1)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(401).set_body_json(serde_json::json!({
            "error": "invalid_client"
        })))
        .up_to_n_times(1)
        .with_priority(2)
        .expect(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "token-b",
            "expires_in": 3600
        })))
        .with_priority(3)
        .expect(1)
        .mount(&server)
        .await;

    let tokens = common::token_manager(&server);

    let first = tokens.credential(false).await.expect("first grant failed");
    assert_eq!(first.secret(), "token-a");

    let err = tokens.credential(true).await.unwrap_err();
    assert!(matches!(err, ServiceError::Auth(_)));

    let third = tokens.credential(false).await.expect("re-grant failed");
    assert_eq!(third.secret(), "token-b");
}

#[tokio::test]
async fn test_invalidate_forces_the_next_call_to_the_network() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "access_token": "token",
            "expires_in": 3600
        })))
        .expect(2)
        .mount(&server)
        .await;

    let tokens = common::token_manager(&server);
    tokens.credential(false).await.expect("grant failed");
    tokens.invalidate().await;
    tokens.credential(false).await.expect("re-grant failed");
}
