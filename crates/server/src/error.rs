//! Unified error handling with Sentry integration.
//!
//! Every handler returns `Result<T, AppError>`. Server-side failures are
//! captured to Sentry before the response is built; the client only ever sees
//! a JSON body of the form `{"error": "..."}`.

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

use crate::db::StoreError;
use crate::services::auth::AuthError;
use crate::services::builder::BuilderError;
use crate::services::lms::LmsError;
use crate::services::orders::WorkflowError;

/// Application-level error type.
#[derive(Debug, Error)]
pub enum AppError {
    /// Store operation failed.
    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    /// Authentication operation failed.
    #[error("Auth error: {0}")]
    Auth(#[from] AuthError),

    /// Order workflow rejected the request.
    #[error("Workflow error: {0}")]
    Workflow(#[from] WorkflowError),

    /// LMS operation failed.
    #[error("LMS error: {0}")]
    Lms(#[from] LmsError),

    /// Prompt builder failed.
    #[error("Builder error: {0}")]
    Builder(#[from] BuilderError),

    /// Session backend failed.
    #[error("Session error: {0}")]
    Session(#[from] tower_sessions::session::Error),

    /// Resource not found.
    #[error("Not found: {0}")]
    NotFound(String),

    /// Caller is not signed in.
    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    /// Caller is signed in but may not do this.
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Bad request from client.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Internal server error.
    #[error("Internal error: {0}")]
    Internal(String),
}

impl AppError {
    fn status(&self) -> StatusCode {
        match self {
            Self::Store(err) => store_status(err),
            Self::Auth(err) => match err {
                AuthError::MissingField(_)
                | AuthError::InvalidEmail(_)
                | AuthError::WeakPassword(_) => StatusCode::BAD_REQUEST,
                AuthError::AccountNotFound => StatusCode::NOT_FOUND,
                AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
                AuthError::AccountAlreadyExists => StatusCode::CONFLICT,
                AuthError::Store(err) => store_status(err),
                AuthError::PasswordHash => StatusCode::INTERNAL_SERVER_ERROR,
            },
            Self::Workflow(err) => match err {
                WorkflowError::Store(err) => store_status(err),
                WorkflowError::Auth(_) | WorkflowError::PaymentLink(_) => {
                    StatusCode::INTERNAL_SERVER_ERROR
                }
                _ => StatusCode::BAD_REQUEST,
            },
            Self::Lms(err) => match err {
                LmsError::EmptyUpdate => StatusCode::BAD_REQUEST,
                LmsError::Locked(_) => StatusCode::FORBIDDEN,
                LmsError::Store(err) => store_status(err),
            },
            Self::Builder(err) => match err {
                BuilderError::EmptyPrompt => StatusCode::BAD_REQUEST,
                BuilderError::NotConfigured => StatusCode::INTERNAL_SERVER_ERROR,
                BuilderError::Model(_) | BuilderError::EmptyOutput => StatusCode::BAD_GATEWAY,
                BuilderError::Store(err) => store_status(err),
            },
            Self::Session(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            Self::Forbidden(_) => StatusCode::FORBIDDEN,
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
        }
    }

    /// Client-facing message. Internal details stay in the logs.
    fn public_message(&self) -> String {
        match self {
            Self::Store(err)
            | Self::Auth(AuthError::Store(err))
            | Self::Workflow(WorkflowError::Store(err))
            | Self::Lms(LmsError::Store(err))
            | Self::Builder(BuilderError::Store(err)) => store_message(err),
            Self::Auth(err) => match err {
                AuthError::InvalidCredentials => "Invalid credentials".to_string(),
                AuthError::AccountNotFound => "Email not found".to_string(),
                AuthError::AccountAlreadyExists => "Email is already registered".to_string(),
                AuthError::InvalidEmail(_) => "Invalid email address".to_string(),
                AuthError::PasswordHash => "Internal server error".to_string(),
                other => other.to_string(),
            },
            Self::Workflow(WorkflowError::Auth(_) | WorkflowError::PaymentLink(_))
            | Self::Session(_)
            | Self::Internal(_) => "Internal server error".to_string(),
            Self::Workflow(err) => err.to_string(),
            Self::Lms(err) => err.to_string(),
            Self::Builder(BuilderError::NotConfigured) => "AI configuration problem".to_string(),
            Self::Builder(BuilderError::Model(_) | BuilderError::EmptyOutput) => {
                "Language model did not return a prompt".to_string()
            }
            Self::Builder(err) => err.to_string(),
            Self::NotFound(msg)
            | Self::Unauthorized(msg)
            | Self::Forbidden(msg)
            | Self::BadRequest(msg) => msg.clone(),
        }
    }
}

fn store_status(err: &StoreError) -> StatusCode {
    match err {
        StoreError::NotFound(_) => StatusCode::NOT_FOUND,
        StoreError::Conflict(_) | StoreError::Transition(_) => StatusCode::CONFLICT,
        StoreError::InvalidInput(_) => StatusCode::BAD_REQUEST,
        StoreError::Database(_) | StoreError::DataCorruption(_) => {
            StatusCode::INTERNAL_SERVER_ERROR
        }
    }
}

fn store_message(err: &StoreError) -> String {
    match err {
        StoreError::NotFound(what) => format!("Not found: {what}"),
        StoreError::Conflict(msg) | StoreError::InvalidInput(msg) => msg.clone(),
        StoreError::Transition(err) => err.to_string(),
        StoreError::Database(_) | StoreError::DataCorruption(_) => {
            "Internal server error".to_string()
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();

        if status.is_server_error() {
            let event_id = sentry::capture_error(&self);
            tracing::error!(
                error = %self,
                sentry_event_id = %event_id,
                "Request error"
            );
        } else {
            tracing::debug!(error = %self, status = status.as_u16(), "Request rejected");
        }

        (status, Json(json!({ "error": self.public_message() }))).into_response()
    }
}

/// Result type alias for `AppError`.
pub type Result<T> = std::result::Result<T, AppError>;

/// Associate subsequent Sentry events with the signed-in account.
pub fn set_sentry_user(account_id: &impl ToString, email: Option<&str>) {
    sentry::configure_scope(|scope| {
        scope.set_user(Some(sentry::User {
            id: Some(account_id.to_string()),
            email: email.map(String::from),
            ..Default::default()
        }));
    });
}

/// Clear the Sentry user context.
pub fn clear_sentry_user() {
    sentry::configure_scope(|scope| {
        scope.set_user(None);
    });
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use booster_core::{OrderEvent, OrderStatus, TransitionError};

    fn status_of(err: impl Into<AppError>) -> StatusCode {
        err.into().into_response().status()
    }

    #[test]
    fn test_taxonomy_status_codes() {
        assert_eq!(status_of(AppError::NotFound("x".into())), StatusCode::NOT_FOUND);
        assert_eq!(status_of(AppError::Unauthorized("x".into())), StatusCode::UNAUTHORIZED);
        assert_eq!(status_of(AppError::Forbidden("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(status_of(AppError::BadRequest("x".into())), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(AppError::Internal("x".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
        assert_eq!(status_of(BuilderError::EmptyOutput), StatusCode::BAD_GATEWAY);
    }

    #[test]
    fn test_store_errors_map_to_taxonomy() {
        assert_eq!(
            status_of(StoreError::Conflict("email already exists".into())),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(StoreError::Transition(TransitionError {
                from: OrderStatus::Failed,
                event: OrderEvent::VerifyPayment,
            })),
            StatusCode::CONFLICT
        );
        assert_eq!(
            status_of(StoreError::InvalidInput("mismatch".into())),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            status_of(StoreError::DataCorruption("bad tier".into())),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_internal_details_are_hidden() {
        let err = AppError::from(StoreError::DataCorruption("tier 'gold'".into()));
        assert_eq!(err.public_message(), "Internal server error");

        let err = AppError::from(BuilderError::NotConfigured);
        assert_eq!(err.public_message(), "AI configuration problem");
    }

    #[tokio::test]
    async fn test_body_is_json_error() {
        let response = AppError::Forbidden("Admins only".into()).into_response();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(body, json!({ "error": "Admins only" }));
    }
}
