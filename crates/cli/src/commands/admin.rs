//! Administrator account commands.
//!
//! ```bash
//! booster-cli admin create -e admin@example.com -n "Admin Name" -p 'long passphrase'
//! ```
//!
//! Administrators are active and verified from the start and see every
//! lesson regardless of tier.

use booster_core::{AccountId, Email};
use booster_server::db::{self, PgStore, Store, StoreError};
use booster_server::models::NewAccount;
use booster_server::services::auth::{AuthError, hash_password};
use thiserror::Error;

/// Minimum admin password length, same as self-service registration.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Errors that can occur during admin operations.
#[derive(Debug, Error)]
pub enum AdminError {
    #[error("Missing environment variable: {0}")]
    MissingEnvVar(&'static str),

    #[error("Database connection error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Invalid email: {0}")]
    InvalidEmail(String),

    #[error("Password must be at least {MIN_PASSWORD_LENGTH} characters")]
    WeakPassword,

    #[error("Account already exists with email: {0}")]
    UserExists(String),

    #[error("Password hashing failed: {0}")]
    Hash(#[from] AuthError),

    #[error("Store error: {0}")]
    Store(StoreError),
}

/// Create an administrator account.
///
/// # Errors
///
/// Returns an error for invalid input, a taken email or a database failure.
pub async fn create_user(
    email: &str,
    name: &str,
    password: &str,
) -> Result<AccountId, AdminError> {
    let email = Email::parse(email).map_err(|_| AdminError::InvalidEmail(email.to_owned()))?;
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AdminError::WeakPassword);
    }

    let database_url =
        super::database_url().map_err(|_| AdminError::MissingEnvVar("BOOSTER_DATABASE_URL"))?;

    tracing::info!("Connecting to database...");
    let store = PgStore::new(db::create_pool(&database_url).await?);

    tracing::info!("Creating admin account: {}", email);

    let account = store
        .create_account(NewAccount::administrator(
            name.trim().to_owned(),
            email.clone(),
            hash_password(password)?,
        ))
        .await
        .map_err(|err| match err {
            StoreError::Conflict(_) => AdminError::UserExists(email.to_string()),
            other => AdminError::Store(other),
        })?;

    tracing::info!(
        "Admin account created successfully! ID: {}, Email: {}",
        account.id,
        account.email
    );

    Ok(account.id)
}
