//! Order domain types.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use booster_core::{AccountId, Email, OrderId, OrderStatus, PackageTier};

use super::account::{Account, AccountSummary};

/// One purchase attempt.
///
/// `price` is a display string carried through verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Order {
    pub id: OrderId,
    #[serde(rename = "user_id")]
    pub account_id: AccountId,
    pub package_id: PackageTier,
    pub package_name: String,
    pub template_name: String,
    pub price: String,
    pub status: OrderStatus,
    pub template_path: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// An order together with its owner, as listed in the admin queues.
#[derive(Debug, Clone, Serialize)]
pub struct OrderWithAccount {
    #[serde(flatten)]
    pub order: Order,
    /// Serialized as `User`, the key the admin dashboard reads.
    #[serde(rename = "User")]
    pub user: AccountSummary,
}

/// Admin order queues.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderQueue {
    /// Awaiting payment verification.
    Pending,
    /// Payment confirmed, template not yet delivered.
    Verified,
}

impl OrderQueue {
    #[must_use]
    pub const fn status(self) -> OrderStatus {
        match self {
            Self::Pending => OrderStatus::Pending,
            Self::Verified => OrderStatus::Paid,
        }
    }
}

/// Everything needed to upsert the buyer and insert a pending order.
#[derive(Debug, Clone)]
pub struct Checkout {
    pub name: String,
    pub email: Email,
    pub phone: Option<String>,
    pub password_hash: String,
    pub package: PackageTier,
    pub package_name: String,
    pub template_name: String,
    pub price: String,
}

/// Result of verifying a payment.
#[derive(Debug, Clone)]
pub struct PaymentVerified {
    pub account: Account,
    pub order: Order,
    /// False when the order had already been verified.
    pub changed: bool,
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_serializes_column_names() {
        let order = Order {
            id: OrderId::generate(),
            account_id: AccountId::generate(),
            package_id: PackageTier::Medium,
            package_name: "Paket Medium".to_owned(),
            template_name: "Kopi Senja".to_owned(),
            price: "Rp 1.000.000".to_owned(),
            status: OrderStatus::Pending,
            template_path: None,
            created_at: Utc::now(),
        };
        let json = serde_json::to_value(&order).unwrap();
        assert_eq!(json["package_id"], "medium");
        assert_eq!(json["status"], "pending");
        assert!(json["template_path"].is_null());
        assert_eq!(json["user_id"], order.account_id.to_string());
    }

    #[test]
    fn test_verified_queue_is_paid() {
        assert_eq!(OrderQueue::Verified.status(), OrderStatus::Paid);
        assert_eq!(OrderQueue::Pending.status(), OrderStatus::Pending);
    }
}
