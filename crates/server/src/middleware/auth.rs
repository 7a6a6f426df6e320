//! Authentication extractors.
//!
//! The signed-in account lives in the session under
//! [`keys::CURRENT_ACCOUNT`](crate::models::session::keys::CURRENT_ACCOUNT).
//! API clients get JSON errors rather than redirects.

use axum::{extract::FromRequestParts, http::request::Parts};
use tower_sessions::Session;

use crate::error::AppError;
use crate::models::CurrentAccount;
use crate::models::session::keys;

/// Extractor that requires a signed-in account.
///
/// ```rust,ignore
/// async fn handler(RequireAccount(account): RequireAccount) -> String {
///     format!("Hello, {}!", account.name)
/// }
/// ```
pub struct RequireAccount(pub CurrentAccount);

/// Extractor that requires a signed-in administrator.
pub struct RequireAdmin(pub CurrentAccount);

/// Extractor that optionally gets the signed-in account.
pub struct OptionalAccount(pub Option<CurrentAccount>);

async fn current_account(parts: &Parts) -> Option<CurrentAccount> {
    let session = parts.extensions.get::<Session>()?;
    session
        .get::<CurrentAccount>(keys::CURRENT_ACCOUNT)
        .await
        .ok()
        .flatten()
}

impl<S> FromRequestParts<S> for RequireAccount
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        current_account(parts)
            .await
            .map(Self)
            .ok_or_else(|| AppError::Unauthorized("Please sign in".to_string()))
    }
}

impl<S> FromRequestParts<S> for RequireAdmin
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let RequireAccount(account) = RequireAccount::from_request_parts(parts, state).await?;
        if !account.role.can_administer() {
            tracing::warn!(account_id = %account.id, "Non-admin attempted admin action");
            return Err(AppError::Forbidden(
                "Administrator access required".to_string(),
            ));
        }
        Ok(Self(account))
    }
}

impl<S> FromRequestParts<S> for OptionalAccount
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(Self(current_account(parts).await))
    }
}

/// Store the signed-in account in the session.
///
/// The session ID is cycled first so a pre-login ID cannot be reused.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn set_current_account(
    session: &Session,
    account: &CurrentAccount,
) -> Result<(), tower_sessions::session::Error> {
    session.cycle_id().await?;
    session.insert(keys::CURRENT_ACCOUNT, account).await
}

/// Sign out: drop the whole session.
///
/// # Errors
///
/// Returns an error if the session cannot be modified.
pub async fn clear_current_account(
    session: &Session,
) -> Result<(), tower_sessions::session::Error> {
    session.flush().await
}
