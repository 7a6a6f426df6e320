//! Health endpoints and request IDs.

use axum::http::{HeaderName, HeaderValue};
use booster_integration_tests::TestContext;

#[tokio::test]
async fn test_health_and_readiness() {
    let server = TestContext::new().server();

    let response = server.get("/health").await;
    response.assert_status_ok();
    response.assert_text("ok");

    server.get("/health/ready").await.assert_status_ok();
}

#[tokio::test]
async fn test_request_id_is_echoed_or_generated() {
    let server = TestContext::new().server();

    let response = server
        .get("/health")
        .add_header(
            HeaderName::from_static("x-request-id"),
            HeaderValue::from_static("abc-123"),
        )
        .await;
    assert_eq!(response.header("x-request-id"), "abc-123");

    let response = server.get("/health").await;
    assert!(!response.header("x-request-id").is_empty());
}
