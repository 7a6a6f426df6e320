//! Registration, sign-in and session tests.

use booster_integration_tests::{PASSWORD, TestContext, checkout, sign_in, verify};
use serde_json::{Value, json};

#[tokio::test]
async fn test_register_twice_conflicts() {
    let ctx = TestContext::new();
    let server = ctx.server();
    let body = json!({
        "name": "Ani",
        "email": "ani@example.com",
        "phone": "0811",
        "password": PASSWORD,
    });

    let response = server.post("/api/auth/register").json(&body).await;
    assert_eq!(response.status_code(), 201);
    let created: Value = response.json();
    assert_eq!(created["success"], true);

    let response = server.post("/api/auth/register").json(&body).await;
    assert_eq!(response.status_code(), 409);
    let error: Value = response.json();
    assert!(error["error"].is_string());
}

#[tokio::test]
async fn test_register_validates_input() {
    let server = TestContext::new().server();

    let response = server
        .post("/api/auth/register")
        .json(&json!({ "name": "Ani", "email": "ani@example.com", "password": "short" }))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = server
        .post("/api/auth/register")
        .json(&json!({ "name": "Ani", "email": "not-an-email", "password": PASSWORD }))
        .await;
    assert_eq!(response.status_code(), 400);

    let response = server
        .post("/api/auth/register")
        .json(&json!({ "email": "ani@example.com", "password": PASSWORD }))
        .await;
    assert_eq!(response.status_code(), 400);
}

#[tokio::test]
async fn test_sign_in_requires_verified_payment() {
    let ctx = TestContext::new();
    let server = ctx.server();
    server
        .post("/api/auth/register")
        .json(&json!({ "name": "Ani", "email": "ani@example.com", "password": PASSWORD }))
        .await
        .assert_status_success();

    let response = sign_in(&server, "ani@example.com").await;
    assert_eq!(response.status_code(), 403);

    let response = sign_in(&server, "nobody@example.com").await;
    assert_eq!(response.status_code(), 404);

    let response = server
        .post("/api/auth/login")
        .json(&json!({ "email": "ani@example.com", "password": "wrong-password" }))
        .await;
    assert_eq!(response.status_code(), 401);
}

#[tokio::test]
async fn test_session_lifecycle() {
    let ctx = TestContext::new();
    let admin = ctx.admin_server().await;
    let customer = ctx.server();

    assert_eq!(customer.get("/api/auth/me").await.status_code(), 401);

    let order_id = checkout(&customer, "b@x.com", "medium").await;
    verify(&admin, &order_id).await.assert_status_ok();

    let response = sign_in(&customer, "b@x.com").await;
    response.assert_status_ok();
    let body: Value = response.json();
    assert_eq!(body["success"], true);
    assert_eq!(body["user"]["email"], "b@x.com");
    assert_eq!(body["user"]["access_tier"], "medium");
    assert_eq!(body["user"]["role"], "user");

    let me: Value = customer.get("/api/auth/me").await.json();
    assert_eq!(me["user"]["email"], "b@x.com");

    customer.post("/api/auth/logout").await.assert_status_ok();
    assert_eq!(customer.get("/api/auth/me").await.status_code(), 401);
}
