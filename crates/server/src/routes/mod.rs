//! HTTP route handlers.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                        - Liveness
//! GET  /health/ready                  - Readiness (store reachable)
//!
//! # Auth
//! POST /api/auth/register             - Create an account
//! POST /api/auth/login                - Sign in (verified accounts only)
//! POST /api/auth/logout               - Sign out
//! GET  /api/auth/me                   - Current account
//!
//! # Orders
//! POST /api/orders/create             - Checkout
//! GET  /api/orders/status/{orderId}   - Order status
//! GET  /api/orders/user/{userId}      - Orders of an account (self or admin)
//!
//! # Admin (requires admin)
//! GET  /api/admin/orders/pending      - Orders awaiting verification
//! GET  /api/admin/orders/verified     - Paid orders awaiting delivery
//! POST /api/admin/orders/verify       - Verify payment
//! POST /api/admin/orders/complete     - Deliver template
//! POST /api/admin/orders/fail         - Reject unpaid order
//!
//! # LMS
//! GET  /api/lms/content               - Annotated content tree
//! POST /api/lms/modules               - Add module (admin)
//! POST /api/lms/chapters              - Add chapter (admin)
//! POST /api/lms/lessons               - Add lesson (admin)
//! PUT  /api/lms/lessons/{id}          - Update lesson (admin)
//! GET  /api/lms/progress/{userId}     - Progress rows (self or admin)
//! POST /api/lms/progress/{lessonId}   - Record progress
//!
//! # AI builder
//! POST /api/ai-builder/start          - Generate brief, open job
//! GET  /api/ai-builder/status/{jobId} - Job status
//! POST /api/ai-builder/complete/{jobId} - Mark ready (admin)
//! POST /api/ai-builder/fail/{jobId}   - Mark failed (admin)
//! ```

pub mod admin;
pub mod ai_builder;
pub mod auth;
pub mod lms;
pub mod orders;

use axum::{
    Router,
    routing::{get, post, put},
};

use crate::state::AppState;

/// Account routes, nested under `/api/auth`.
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/register", post(auth::register))
        .route("/login", post(auth::login))
        .route("/logout", post(auth::logout))
        .route("/me", get(auth::me))
}

/// Everything under `/api` except the auth routes.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .nest("/orders", order_routes())
        .nest("/admin", admin_routes())
        .nest("/lms", lms_routes())
        .nest("/ai-builder", ai_builder_routes())
}

fn order_routes() -> Router<AppState> {
    Router::new()
        .route("/create", post(orders::create))
        .route("/status/{order_id}", get(orders::status))
        .route("/user/{user_id}", get(orders::list_for_user))
}

fn admin_routes() -> Router<AppState> {
    Router::new()
        .route("/orders/pending", get(admin::pending_orders))
        .route("/orders/verified", get(admin::verified_orders))
        .route("/orders/verify", post(admin::verify_payment))
        .route("/orders/complete", post(admin::complete_order))
        .route("/orders/fail", post(admin::fail_order))
}

fn lms_routes() -> Router<AppState> {
    Router::new()
        .route("/content", get(lms::content))
        .route("/modules", post(lms::create_module))
        .route("/chapters", post(lms::create_chapter))
        .route("/lessons", post(lms::create_lesson))
        .route("/lessons/{id}", put(lms::update_lesson))
        .route(
            "/progress/{id}",
            get(lms::progress).post(lms::record_progress),
        )
}

fn ai_builder_routes() -> Router<AppState> {
    Router::new()
        .route("/start", post(ai_builder::start))
        .route("/status/{job_id}", get(ai_builder::status))
        .route("/complete/{job_id}", post(ai_builder::complete))
        .route("/fail/{job_id}", post(ai_builder::fail))
}
