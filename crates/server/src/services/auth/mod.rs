//! Authentication service.
//!
//! Password registration and sign-in. Credentials are Argon2id hashes kept by
//! the store; they never leave this module in plain form.

mod error;

pub use error::AuthError;

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use tracing::instrument;

use booster_core::Email;

use crate::db::{Store, StoreError};
use crate::models::{Account, NewAccount};

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Self-service registration form.
#[derive(Debug, Clone, Default)]
pub struct Registration<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub phone: Option<&'a str>,
    pub password: &'a str,
}

/// Authentication service.
pub struct AuthService<'a> {
    store: &'a dyn Store,
}

impl<'a> AuthService<'a> {
    #[must_use]
    pub const fn new(store: &'a dyn Store) -> Self {
        Self { store }
    }

    /// Register a customer account with tier `none`.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::MissingField` for an empty name, email or password,
    /// `AuthError::InvalidEmail` / `AuthError::WeakPassword` for bad input and
    /// `AuthError::AccountAlreadyExists` if the email is taken.
    #[instrument(skip(self, form), fields(email = %form.email))]
    pub async fn register(&self, form: Registration<'_>) -> Result<Account, AuthError> {
        let name = required(form.name, "name")?;
        let email = Email::parse(required(form.email, "email")?)?;
        if form.password.is_empty() {
            return Err(AuthError::MissingField("password"));
        }
        validate_password(form.password)?;

        let password_hash = hash_password(form.password)?;
        let phone = form
            .phone
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .map(String::from);

        let account = self
            .store
            .create_account(NewAccount::customer(
                name.to_string(),
                email,
                phone,
                password_hash,
            ))
            .await
            .map_err(|e| match e {
                StoreError::Conflict(_) => AuthError::AccountAlreadyExists,
                other => AuthError::Store(other),
            })?;

        tracing::info!(account_id = %account.id, "Account registered");
        Ok(account)
    }

    /// Check an email/password pair.
    ///
    /// Whether the account may actually sign in (payment verified) is decided
    /// by the caller.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::AccountNotFound` if no account has this email and
    /// `AuthError::InvalidCredentials` if the password does not match.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<Account, AuthError> {
        let email = Email::parse(email)?;

        let (account, password_hash) = self
            .store
            .get_credentials(&email)
            .await?
            .ok_or(AuthError::AccountNotFound)?;

        verify_password(password, &password_hash)?;

        Ok(account)
    }
}

/// Trimmed value of a required field.
fn required<'s>(value: &'s str, field: &'static str) -> Result<&'s str, AuthError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(AuthError::MissingField(field));
    }
    Ok(value)
}

fn validate_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(AuthError::WeakPassword(format!(
            "password must be at least {MIN_PASSWORD_LENGTH} characters"
        )));
    }
    Ok(())
}

/// Hash a password using Argon2id.
///
/// # Errors
///
/// Returns `AuthError::PasswordHash` if hashing fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;

    Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use booster_core::{AccountStatus, PackageTier, Role};

    fn form<'a>(email: &'a str, password: &'a str) -> Registration<'a> {
        Registration {
            name: "Sari",
            email,
            phone: Some("08123"),
            password,
        }
    }

    #[test]
    fn test_hash_and_verify() {
        let hash = hash_password("kopi-senja-42").unwrap();
        assert!(hash.starts_with("$argon2"));
        assert!(verify_password("kopi-senja-42", &hash).is_ok());
        assert!(matches!(
            verify_password("kopi-senja-43", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }

    #[tokio::test]
    async fn test_register_then_authenticate() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);

        let account = auth.register(form("sari@kopi.id", "rahasia-123")).await.unwrap();
        assert_eq!(account.access_tier, PackageTier::None);
        assert_eq!(account.role, Role::User);
        assert_eq!(account.status, AccountStatus::Pending);
        assert!(!account.can_sign_in());

        let signed_in = auth.authenticate("sari@kopi.id", "rahasia-123").await.unwrap();
        assert_eq!(signed_in.id, account.id);
    }

    #[tokio::test]
    async fn test_register_twice_conflicts() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        auth.register(form("sari@kopi.id", "rahasia-123")).await.unwrap();

        let err = auth
            .register(form("sari@kopi.id", "lain-lagi-456"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::AccountAlreadyExists));
    }

    #[tokio::test]
    async fn test_register_validates_input() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);

        let err = auth
            .register(Registration {
                name: "  ",
                ..form("sari@kopi.id", "rahasia-123")
            })
            .await
            .unwrap_err();
        assert!(matches!(err, AuthError::MissingField("name")));

        let err = auth.register(form("sari@kopi.id", "")).await.unwrap_err();
        assert!(matches!(err, AuthError::MissingField("password")));

        let err = auth.register(form("sari@kopi.id", "pendek")).await.unwrap_err();
        assert!(matches!(err, AuthError::WeakPassword(_)));

        let err = auth.register(form("not-an-email", "rahasia-123")).await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidEmail(_)));
    }

    #[tokio::test]
    async fn test_authenticate_failures() {
        let store = MemoryStore::new();
        let auth = AuthService::new(&store);
        auth.register(form("sari@kopi.id", "rahasia-123")).await.unwrap();

        let err = auth.authenticate("budi@kopi.id", "rahasia-123").await.unwrap_err();
        assert!(matches!(err, AuthError::AccountNotFound));

        let err = auth.authenticate("sari@kopi.id", "salah-sandi").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));

        // Emails are matched exactly.
        let err = auth.authenticate("Sari@kopi.id", "rahasia-123").await.unwrap_err();
        assert!(matches!(err, AuthError::AccountNotFound));
    }
}
