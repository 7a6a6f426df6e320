//! Account roles and lifecycle status.

use serde::{Deserialize, Serialize};

/// Account role.
///
/// Administrators verify payments, deliver templates, manage LMS content and
/// can open every lesson regardless of package tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "account_role", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    #[default]
    User,
    Admin,
}

impl Role {
    /// May run the verification/fulfillment workflow and edit content.
    #[must_use]
    pub const fn can_administer(self) -> bool {
        matches!(self, Self::Admin)
    }

    /// Sees every lesson regardless of its package requirement.
    #[must_use]
    pub const fn bypasses_content_gate(self) -> bool {
        matches!(self, Self::Admin)
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

impl std::str::FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Self::User),
            "admin" => Ok(Self::Admin),
            _ => Err(format!("invalid role: {s}")),
        }
    }
}

/// Lifecycle of an account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[cfg_attr(feature = "postgres", derive(sqlx::Type))]
#[cfg_attr(
    feature = "postgres",
    sqlx(type_name = "account_status", rename_all = "lowercase")
)]
#[serde(rename_all = "lowercase")]
pub enum AccountStatus {
    /// Registered or checked out, payment not yet verified.
    #[default]
    Pending,
    /// Payment verified by an administrator.
    Active,
}
