//! Tests for error handling on the collection endpoint.
//!
//! These tests verify that the API returns correct error codes for various
//! failure scenarios.

use axum::http::StatusCode;
use axum_test::TestServer;
use integration_tests::fixtures::{self, request_payload, system_payload, SERVICE};
use integration_tests::setup::TestContext;
use serde_json::{json, Value};

async fn post_collect(server: &TestServer, body: String) -> axum_test::TestResponse {
    server
        .post("/collect")
        .content_type("application/json")
        .add_header("X-Project-Id", fixtures::PROJECT_ID)
        .bytes(body.into())
        .await
}

/// Test valid payloads are accepted and stored for the header's project
#[tokio::test]
async fn test_valid_payloads_are_stored() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = post_collect(
        &server,
        request_payload(SERVICE, fixtures::minute(0), "GET", "/", 503, 9.5).to_string(),
    )
    .await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["status"], "ok");

    post_collect(
        &server,
        system_payload(SERVICE, fixtures::minute(0), 12.5, 128.0).to_string(),
    )
    .await
    .assert_status_ok();

    let body: Value = server.get("/debug/metrics").await.json();
    assert_eq!(body["requestMetrics"]["count"], 1);
    assert_eq!(body["systemMetrics"]["count"], 1);
    assert_eq!(body["total"], 2);

    let event = &body["requestMetrics"]["data"][0];
    assert_eq!(event["projectId"], fixtures::PROJECT_ID);
    assert_eq!(event["statusCode"], 503);
    assert_eq!(event["isError"], true);
}

/// Test the debug view lists newest events first
#[tokio::test]
async fn test_debug_view_is_newest_first() {
    let ctx = TestContext::new();
    let server = ctx.server();

    for i in 0..3 {
        post_collect(
            &server,
            request_payload(SERVICE, fixtures::minute(i), "GET", "/", 200, 1.0).to_string(),
        )
        .await
        .assert_status_ok();
    }

    let body: Value = server.get("/debug/metrics").await.json();
    assert_eq!(body["requestMetrics"]["data"][0]["timestamp"], fixtures::minute(2));
    assert_eq!(body["requestMetrics"]["data"][2]["timestamp"], fixtures::minute(0));
}

/// Test missing project header returns VALID_003
#[tokio::test]
async fn test_missing_project_header_returns_400() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = server
        .post("/collect")
        .content_type("application/json")
        // No X-Project-Id header
        .bytes(system_payload(SERVICE, 0, 1.0, 1.0).to_string().into())
        .await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALID_003", "Expected VALID_003 for missing project");
    assert_eq!(ctx.store.memory().raw_count(), 0);
}

/// Test unknown metric type returns VALID_001
#[tokio::test]
async fn test_unknown_type_returns_400() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let payload = json!({
        "type": "disk",
        "serviceName": fixtures::SERVICE,
        "timestamp": 0,
        "usage": 0.5
    });
    let response = post_collect(&server, payload.to_string()).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALID_001", "Expected VALID_001 for unknown type");
    assert_eq!(ctx.store.memory().raw_count(), 0);
}

/// Test missing variant field returns VALID_001
#[tokio::test]
async fn test_missing_field_returns_400() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let mut payload = request_payload(SERVICE, 0, "GET", "/", 200, 1.0);
    payload.as_object_mut().unwrap().remove("statusCode");
    let response = post_collect(&server, payload.to_string()).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALID_001");
}

/// Test malformed JSON returns VALID_001
#[tokio::test]
async fn test_malformed_json_returns_400() {
    let ctx = TestContext::new();
    let server = ctx.server();

    let response = post_collect(&server, "{ not valid json".to_string()).await;

    response.assert_status(StatusCode::BAD_REQUEST);
    let body: Value = response.json();
    assert_eq!(body["code"], "VALID_001", "Expected VALID_001 for malformed JSON");
}

/// Test store write failure returns DB_001
#[tokio::test]
async fn test_store_failure_returns_500() {
    let ctx = TestContext::new();
    let server = ctx.server();
    ctx.store.set_fail_writes(true);

    let response = post_collect(
        &server,
        request_payload(SERVICE, 0, "GET", "/", 200, 1.0).to_string(),
    )
    .await;

    response.assert_status(StatusCode::INTERNAL_SERVER_ERROR);
    let body: Value = response.json();
    assert_eq!(body["code"], "DB_001", "Expected DB_001 for store failure");
}
