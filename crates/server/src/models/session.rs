//! Session-related types.

use serde::{Deserialize, Serialize};

use booster_core::{AccountId, Email, PackageTier, Role};

use super::account::Account;

/// Session-stored account identity.
///
/// Role and tier are a snapshot from sign-in; handlers that gate content
/// reload the account so upgrades apply immediately.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrentAccount {
    pub id: AccountId,
    pub email: Email,
    pub name: String,
    pub role: Role,
    pub access_tier: PackageTier,
}

impl From<&Account> for CurrentAccount {
    fn from(account: &Account) -> Self {
        Self {
            id: account.id,
            email: account.email.clone(),
            name: account.name.clone(),
            role: account.role,
            access_tier: account.access_tier,
        }
    }
}

impl CurrentAccount {
    /// Whether this account may act on behalf of `account_id`.
    #[must_use]
    pub fn may_act_for(&self, account_id: AccountId) -> bool {
        self.id == account_id || self.role.can_administer()
    }
}

/// Session keys for authentication data.
pub mod keys {
    /// Key for storing the current signed-in account.
    pub const CURRENT_ACCOUNT: &str = "current_account";
}
