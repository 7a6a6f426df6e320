//! Tier-gated LMS content and learner progress over HTTP.

use axum_test::TestServer;
use booster_integration_tests::{TestContext, checkout, sign_in, verify};
use serde_json::{Value, json};

struct Course {
    chapter_id: String,
    medium_lesson: String,
    large_lesson: String,
}

async fn created_id(admin: &TestServer, path: &str, body: Value) -> String {
    let response = admin.post(path).json(&body).await;
    assert_eq!(response.status_code(), 201, "{}", response.text());
    let body: Value = response.json();
    body["id"].as_str().unwrap_or_default().to_string()
}

async fn build_course(admin: &TestServer) -> Course {
    let module_id = created_id(
        admin,
        "/api/lms/modules",
        json!({ "title": "Memulai Bisnis Online", "is_published": true }),
    )
    .await;
    let chapter_id = created_id(
        admin,
        "/api/lms/chapters",
        json!({ "module_id": module_id, "title": "Website Pertama", "is_published": true }),
    )
    .await;
    let medium_lesson = created_id(
        admin,
        "/api/lms/lessons",
        json!({
            "chapter_id": chapter_id,
            "title": "Memasang Template",
            "content": "Langkah demi langkah",
            "is_published": true,
            "order_index": 0,
            "required_packages": ["medium", "large"],
        }),
    )
    .await;
    let large_lesson = created_id(
        admin,
        "/api/lms/lessons",
        json!({
            "chapter_id": chapter_id,
            "title": "Strategi Iklan",
            "content": "Kampanye berbayar",
            "video_url": "https://videos.bibooster.com/iklan",
            "is_published": true,
            "order_index": 1,
            "required_packages": ["large"],
        }),
    )
    .await;

    Course {
        chapter_id,
        medium_lesson,
        large_lesson,
    }
}

async fn medium_customer(ctx: &TestContext, admin: &TestServer) -> TestServer {
    let customer = ctx.server();
    let order_id = checkout(&customer, "b@x.com", "medium").await;
    verify(admin, &order_id).await.assert_status_ok();
    sign_in(&customer, "b@x.com").await.assert_status_ok();
    customer
}

static MISSING: Value = Value::Null;

/// Chapter or lesson with `id` anywhere in the tree.
fn find<'a>(content: &'a Value, id: &str) -> &'a Value {
    content
        .as_array()
        .into_iter()
        .flatten()
        .flat_map(|m| m["chapters"].as_array().into_iter().flatten())
        .flat_map(|c| {
            std::iter::once(c).chain(c["lessons"].as_array().into_iter().flatten())
        })
        .find(|item| item["id"] == id)
        .unwrap_or(&MISSING)
}

#[tokio::test]
async fn test_medium_customer_sees_medium_lesson_only() {
    let ctx = TestContext::new();
    let admin = ctx.admin_server().await;
    let course = build_course(&admin).await;
    let customer = medium_customer(&ctx, &admin).await;

    let content: Value = customer.get("/api/lms/content").await.json();

    let medium = find(&content, &course.medium_lesson);
    assert_eq!(medium["accessible"], true);
    assert_eq!(medium["content"], "Langkah demi langkah");

    let large = find(&content, &course.large_lesson);
    assert_eq!(large["accessible"], false);
    assert_eq!(large["content"], Value::Null);
    assert_eq!(large["video_url"], Value::Null);

    let chapter = find(&content, &course.chapter_id);
    assert_eq!(chapter["status"], "available");
    assert_eq!(chapter["progress"], 0);
}

#[tokio::test]
async fn test_anonymous_viewer_sees_everything_locked() {
    let ctx = TestContext::new();
    let admin = ctx.admin_server().await;
    let course = build_course(&admin).await;

    let content: Value = ctx.server().get("/api/lms/content").await.json();
    assert_eq!(find(&content, &course.medium_lesson)["accessible"], false);
    assert_eq!(find(&content, &course.chapter_id)["status"], "locked");

    let content: Value = admin.get("/api/lms/content").await.json();
    assert_eq!(find(&content, &course.large_lesson)["accessible"], true);
}

#[tokio::test]
async fn test_progress_counts_accessible_lessons_only() {
    let ctx = TestContext::new();
    let admin = ctx.admin_server().await;
    let course = build_course(&admin).await;
    let customer = medium_customer(&ctx, &admin).await;

    let response = customer
        .post(&format!("/api/lms/progress/{}", course.large_lesson))
        .json(&json!({ "completed": true }))
        .await;
    assert_eq!(response.status_code(), 403);

    let response = customer
        .post(&format!("/api/lms/progress/{}", course.medium_lesson))
        .json(&json!({ "completed": true }))
        .await;
    response.assert_status_ok();
    let progress: Value = response.json();
    assert_eq!(progress["completed"], true);

    let content: Value = customer.get("/api/lms/content").await.json();
    let chapter = find(&content, &course.chapter_id);
    assert_eq!(chapter["status"], "completed");
    assert_eq!(chapter["progress"], 100);
    assert_eq!(find(&content, &course.medium_lesson)["completed"], true);

    let me: Value = customer.get("/api/auth/me").await.json();
    let user_id = me["user"]["id"].as_str().unwrap_or_default().to_string();
    let rows: Value = customer
        .get(&format!("/api/lms/progress/{user_id}"))
        .await
        .json();
    assert_eq!(rows.as_array().map(Vec::len), Some(1));
}

#[tokio::test]
async fn test_upgrade_applies_without_new_sign_in() {
    let ctx = TestContext::new();
    let admin = ctx.admin_server().await;
    let course = build_course(&admin).await;
    let customer = medium_customer(&ctx, &admin).await;

    let order_id = checkout(&customer, "b@x.com", "large").await;
    let content: Value = customer.get("/api/lms/content").await.json();
    assert_eq!(find(&content, &course.large_lesson)["accessible"], false);
    assert_eq!(find(&content, &course.medium_lesson)["accessible"], true);

    verify(&admin, &order_id).await.assert_status_ok();

    let content: Value = customer.get("/api/lms/content").await.json();
    assert_eq!(find(&content, &course.large_lesson)["accessible"], true);
}

#[tokio::test]
async fn test_verification_grants_only_the_verified_package() {
    let ctx = TestContext::new();
    let admin = ctx.admin_server().await;
    let course = build_course(&admin).await;
    let customer = ctx.server();

    let medium_order = checkout(&customer, "b@x.com", "medium").await;
    checkout(&customer, "b@x.com", "large").await;
    verify(&admin, &medium_order).await.assert_status_ok();
    sign_in(&customer, "b@x.com").await.assert_status_ok();

    let content: Value = customer.get("/api/lms/content").await.json();
    assert_eq!(find(&content, &course.medium_lesson)["accessible"], true);
    assert_eq!(find(&content, &course.large_lesson)["accessible"], false);
}

#[tokio::test]
async fn test_cms_writes_are_admin_only_and_validated() {
    let ctx = TestContext::new();
    let admin = ctx.admin_server().await;
    let course = build_course(&admin).await;
    let customer = medium_customer(&ctx, &admin).await;

    let response = customer
        .post("/api/lms/modules")
        .json(&json!({ "title": "Modul Baru" }))
        .await;
    assert_eq!(response.status_code(), 403);

    let lesson_path = format!("/api/lms/lessons/{}", course.medium_lesson);
    let response = admin.put(&lesson_path).json(&json!({})).await;
    assert_eq!(response.status_code(), 400);

    let response = admin
        .put(&lesson_path)
        .json(&json!({ "title": "Memasang Template (Revisi)" }))
        .await;
    response.assert_status_ok();

    let content: Value = customer.get("/api/lms/content").await.json();
    assert_eq!(
        find(&content, &course.medium_lesson)["title"],
        "Memasang Template (Revisi)"
    );

    let response = admin
        .post("/api/lms/chapters")
        .json(&json!({
            "module_id": "00000000-0000-4000-8000-000000000000",
            "title": "Yatim",
        }))
        .await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_drafts_are_hidden_from_customers() {
    let ctx = TestContext::new();
    let admin = ctx.admin_server().await;
    let course = build_course(&admin).await;
    let customer = medium_customer(&ctx, &admin).await;

    admin
        .put(&format!("/api/lms/lessons/{}", course.medium_lesson))
        .json(&json!({ "is_published": false }))
        .await
        .assert_status_ok();

    let content: Value = customer.get("/api/lms/content").await.json();
    assert_eq!(find(&content, &course.medium_lesson), &Value::Null);
    assert_eq!(find(&content, &course.chapter_id)["status"], "locked");

    let content: Value = admin.get("/api/lms/content").await.json();
    assert_eq!(find(&content, &course.medium_lesson)["is_published"], false);
}
