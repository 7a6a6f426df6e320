//! Account domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use booster_core::{AccountId, AccountStatus, Email, PackageTier, Role, Viewer};

/// A customer or administrator account.
///
/// The credential hash is kept by the store and never appears here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Account {
    pub id: AccountId,
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub is_verified: bool,
    pub has_paid: bool,
    pub access_tier: PackageTier,
    pub role: Role,
    pub status: AccountStatus,
    pub created_at: DateTime<Utc>,
}

impl Account {
    /// Access-relevant view of this account.
    #[must_use]
    pub const fn viewer(&self) -> Viewer {
        Viewer {
            role: self.role,
            access_tier: self.access_tier,
        }
    }

    /// Payment has been verified, so a session may be granted.
    #[must_use]
    pub const fn can_sign_in(&self) -> bool {
        self.is_verified && self.has_paid
    }
}

/// The account fields embedded in admin order queues.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AccountSummary {
    pub id: AccountId,
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub is_verified: bool,
    pub has_paid: bool,
}

impl From<&Account> for AccountSummary {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            name: account.name.clone(),
            email: account.email.clone(),
            phone: account.phone.clone(),
            is_verified: account.is_verified,
            has_paid: account.has_paid,
        }
    }
}

/// Data for inserting an account.
#[derive(Debug, Clone)]
pub struct NewAccount {
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub password_hash: String,
    pub access_tier: PackageTier,
    pub role: Role,
    pub status: AccountStatus,
    pub is_verified: bool,
    pub has_paid: bool,
}

impl NewAccount {
    /// A self-registered customer: no tier, not yet verified.
    #[must_use]
    pub fn customer(
        name: String,
        email: Email,
        phone: Option<String>,
        password_hash: String,
    ) -> Self {
        Self {
            name,
            email,
            phone,
            password_hash,
            access_tier: PackageTier::None,
            role: Role::User,
            status: AccountStatus::Pending,
            is_verified: false,
            has_paid: false,
        }
    }

    /// An administrator that can sign in immediately.
    #[must_use]
    pub fn administrator(name: String, email: Email, password_hash: String) -> Self {
        Self {
            name,
            email,
            phone: None,
            password_hash,
            access_tier: PackageTier::Enterprise,
            role: Role::Admin,
            status: AccountStatus::Active,
            is_verified: true,
            has_paid: true,
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_administrator_defaults() {
        let admin = NewAccount::administrator(
            "Admin".to_owned(),
            Email::parse("admin@bibooster.com").unwrap(),
            "hash".to_owned(),
        );
        assert_eq!(admin.role, Role::Admin);
        assert_eq!(admin.access_tier, PackageTier::Enterprise);
        assert!(admin.is_verified && admin.has_paid);
    }

    #[test]
    fn test_customer_starts_pending() {
        let customer = NewAccount::customer(
            "Sari".to_owned(),
            Email::parse("sari@kopi.id").unwrap(),
            None,
            "hash".to_owned(),
        );
        assert_eq!(customer.access_tier, PackageTier::None);
        assert_eq!(customer.status, AccountStatus::Pending);
        assert!(!customer.has_paid);
    }
}
