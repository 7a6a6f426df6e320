//! Checkout and order lookup handlers.

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};

use booster_core::{AccountId, OrderId};

use crate::error::{AppError, Result};
use crate::extract::{Json, Path};
use crate::middleware::RequireAccount;
use crate::models::Order;
use crate::services::orders::CheckoutForm;
use crate::state::AppState;

/// The package picked in the checkout modal.
///
/// The web client posts the whole package object; plain tier strings are
/// accepted too.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
pub enum SelectedPackage {
    Tier(String),
    Package { id: String },
}

impl SelectedPackage {
    fn tier(&self) -> &str {
        match self {
            Self::Tier(id) | Self::Package { id } => id,
        }
    }
}

/// Checkout request body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOrderRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
    pub phone: Option<String>,
    pub selected_package: Option<SelectedPackage>,
    #[serde(default)]
    pub template_name: String,
    pub price: Option<String>,
    pub package_name: Option<String>,
}

/// Create a pending order, creating or updating the buyer's account.
pub async fn create(
    State(state): State<AppState>,
    Json(body): Json<CreateOrderRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    let receipt = state
        .orders()
        .checkout(CheckoutForm {
            name: &body.name,
            email: &body.email,
            password: &body.password,
            phone: body.phone.as_deref(),
            package: body
                .selected_package
                .as_ref()
                .map(SelectedPackage::tier)
                .unwrap_or_default(),
            template_name: &body.template_name,
            price: body.price.as_deref(),
            package_name: body.package_name.as_deref(),
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "orderId": receipt.order.id,
            "paymentQrUrl": receipt.payment_qr_url,
        })),
    ))
}

/// Status of one order. Order IDs are unguessable, so no session is needed.
pub async fn status(
    State(state): State<AppState>,
    Path(order_id): Path<OrderId>,
) -> Result<Json<Value>> {
    let status = state.orders().status(order_id).await?;
    Ok(Json(json!({ "status": status })))
}

/// Orders of an account, newest first.
pub async fn list_for_user(
    State(state): State<AppState>,
    RequireAccount(current): RequireAccount,
    Path(user_id): Path<AccountId>,
) -> Result<Json<Vec<Order>>> {
    if !current.may_act_for(user_id) {
        return Err(AppError::Forbidden(
            "Cannot view another account's orders".to_string(),
        ));
    }
    Ok(Json(state.orders().orders_for(user_id).await?))
}
