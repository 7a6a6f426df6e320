//! Authentication error types.

use thiserror::Error;

use crate::db::StoreError;

/// Errors that can occur during authentication operations.
#[derive(Debug, Error)]
pub enum AuthError {
    /// A required field was empty.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// Invalid email format.
    #[error("invalid email: {0}")]
    InvalidEmail(#[from] booster_core::EmailError),

    /// Password too weak or invalid.
    #[error("{0}")]
    WeakPassword(String),

    /// No account with that email.
    #[error("account not found")]
    AccountNotFound,

    /// Wrong password.
    #[error("invalid credentials")]
    InvalidCredentials,

    /// Email already registered.
    #[error("account already exists")]
    AccountAlreadyExists,

    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Password hashing error.
    #[error("password hashing error")]
    PasswordHash,
}
