//! Account route handlers.
//!
//! Sessions are only granted to accounts whose payment has been verified.

use axum::{extract::State, http::StatusCode};
use serde::Deserialize;
use serde_json::{Value, json};
use tower_sessions::Session;

use crate::error::{AppError, Result, clear_sentry_user, set_sentry_user};
use crate::extract::Json;
use crate::middleware::{RequireAccount, clear_current_account, set_current_account};
use crate::models::CurrentAccount;
use crate::services::auth::{AuthService, Registration};
use crate::state::AppState;

/// Registration request body.
#[derive(Debug, Deserialize)]
pub struct RegisterRequest {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub email: String,
    pub phone: Option<String>,
    #[serde(default)]
    pub password: String,
}

/// Login request body.
#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub password: String,
}

/// Create an account.
///
/// New accounts cannot sign in until an order of theirs is verified.
pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterRequest>,
) -> Result<(StatusCode, Json<Value>)> {
    AuthService::new(state.store())
        .register(Registration {
            name: &body.name,
            email: &body.email,
            phone: body.phone.as_deref(),
            password: &body.password,
        })
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "success": true,
            "message": "Registration successful",
        })),
    ))
}

/// Sign in.
pub async fn login(
    State(state): State<AppState>,
    session: Session,
    Json(body): Json<LoginRequest>,
) -> Result<Json<Value>> {
    let account = AuthService::new(state.store())
        .authenticate(&body.email, &body.password)
        .await?;

    if !account.can_sign_in() {
        tracing::info!(account_id = %account.id, "Sign-in refused, payment not verified");
        return Err(AppError::Forbidden(
            "Account is awaiting payment verification".to_string(),
        ));
    }

    let current = CurrentAccount::from(&account);
    set_current_account(&session, &current).await?;
    set_sentry_user(&account.id, Some(account.email.as_str()));

    tracing::info!(account_id = %account.id, "Signed in");

    Ok(Json(json!({ "success": true, "user": current })))
}

/// Sign out.
pub async fn logout(session: Session) -> Result<Json<Value>> {
    clear_current_account(&session).await?;
    clear_sentry_user();
    Ok(Json(json!({ "success": true })))
}

/// The signed-in account, refreshed from the store.
pub async fn me(
    State(state): State<AppState>,
    session: Session,
    RequireAccount(current): RequireAccount,
) -> Result<Json<Value>> {
    let Some(account) = state.store().get_account(current.id).await? else {
        clear_current_account(&session).await?;
        return Err(AppError::Unauthorized("Please sign in".to_string()));
    };

    Ok(Json(json!({ "user": CurrentAccount::from(&account) })))
}
