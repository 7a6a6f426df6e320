//! Administrator order workflow handlers.

use axum::extract::State;
use serde::Deserialize;
use serde_json::{Value, json};

use booster_core::{AccountId, OrderId};

use crate::error::Result;
use crate::extract::Json;
use crate::middleware::RequireAdmin;
use crate::models::OrderQueue;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VerifyRequest {
    pub user_id: AccountId,
    pub order_id: OrderId,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CompleteRequest {
    pub order_id: OrderId,
    #[serde(default)]
    pub template_path: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FailRequest {
    pub order_id: OrderId,
}

pub async fn pending_orders(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Value>> {
    let orders = state.orders().queue(OrderQueue::Pending).await?;
    Ok(Json(json!({ "orders": orders })))
}

pub async fn verified_orders(
    State(state): State<AppState>,
    RequireAdmin(_): RequireAdmin,
) -> Result<Json<Value>> {
    let orders = state.orders().queue(OrderQueue::Verified).await?;
    Ok(Json(json!({ "orders": orders })))
}

/// Confirm payment. Repeating it for a paid order is a no-op.
pub async fn verify_payment(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<VerifyRequest>,
) -> Result<Json<Value>> {
    let verified = state
        .orders()
        .verify_payment(body.user_id, body.order_id)
        .await?;

    tracing::info!(admin_id = %admin.id, order_id = %body.order_id, changed = verified.changed, "Verify payment");

    let message = if verified.changed {
        "Payment verified, account activated"
    } else {
        "Payment was already verified"
    };
    Ok(Json(json!({ "success": true, "message": message })))
}

/// Deliver the template.
pub async fn complete_order(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<CompleteRequest>,
) -> Result<Json<Value>> {
    state
        .orders()
        .complete(body.order_id, &body.template_path)
        .await?;

    tracing::info!(admin_id = %admin.id, order_id = %body.order_id, "Template delivered");

    Ok(Json(json!({
        "success": true,
        "message": "Order completed, template delivered",
    })))
}

pub async fn fail_order(
    State(state): State<AppState>,
    RequireAdmin(admin): RequireAdmin,
    Json(body): Json<FailRequest>,
) -> Result<Json<Value>> {
    state.orders().fail(body.order_id).await?;

    tracing::info!(admin_id = %admin.id, order_id = %body.order_id, "Order rejected");

    Ok(Json(json!({ "success": true, "message": "Order marked as failed" })))
}
