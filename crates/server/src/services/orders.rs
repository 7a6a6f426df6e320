//! Checkout and the verification/fulfillment workflow.
//!
//! The store decides every status change (see `booster_core::workflow`);
//! this service validates input, builds the payment QR link and sends the
//! customer emails around each step.

use std::sync::Arc;

use thiserror::Error;
use tracing::instrument;
use url::Url;

use booster_core::{AccountId, Email, EmailError, OrderId, OrderStatus, PackageTier};

use crate::config::QrConfig;
use crate::db::{Store, StoreError};
use crate::models::{Checkout, Order, OrderQueue, OrderWithAccount, PaymentVerified};
use crate::services::auth::{AuthError, hash_password};
use crate::services::email::{self, Mailer};

/// A purchasable package as shown on the pricing page.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Package {
    pub tier: PackageTier,
    pub name: &'static str,
    pub price: &'static str,
}

const CATALOG: [Package; 4] = [
    Package {
        tier: PackageTier::Small,
        name: "Paket Small",
        price: "Rp 500.000",
    },
    Package {
        tier: PackageTier::Medium,
        name: "Paket Medium",
        price: "Rp 1.000.000",
    },
    Package {
        tier: PackageTier::Large,
        name: "Paket Large",
        price: "Rp 2.000.000",
    },
    Package {
        tier: PackageTier::Enterprise,
        name: "Paket Bisnis (Enterprise)",
        price: "Mulai dari Rp 5.000.000",
    },
];

/// Catalog entry for a tier; `None` for tiers that cannot be bought.
#[must_use]
pub fn package(tier: PackageTier) -> Option<Package> {
    CATALOG.into_iter().find(|p| p.tier == tier)
}

/// Errors from checkout and the admin workflow.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("{0} is required")]
    MissingField(&'static str),

    #[error("invalid email: {0}")]
    InvalidEmail(#[from] EmailError),

    #[error("unknown package '{0}'")]
    UnknownPackage(String),

    #[error("package '{0}' cannot be purchased")]
    NotPurchasable(PackageTier),

    #[error("templatePath must not be empty")]
    EmptyTemplatePath,

    /// The configured QR endpoint is not a valid URL.
    #[error("payment link error: {0}")]
    PaymentLink(#[from] url::ParseError),

    /// Credential hashing failed.
    #[error("auth error: {0}")]
    Auth(#[from] AuthError),

    #[error("store error: {0}")]
    Store(#[from] StoreError),
}

/// Checkout form as submitted by the package modal.
#[derive(Debug, Clone, Default)]
pub struct CheckoutForm<'a> {
    pub name: &'a str,
    pub email: &'a str,
    pub password: &'a str,
    pub phone: Option<&'a str>,
    pub package: &'a str,
    pub template_name: &'a str,
    /// Display price; defaults to the catalog price.
    pub price: Option<&'a str>,
    /// Display name; defaults to the catalog name.
    pub package_name: Option<&'a str>,
}

/// Result of a checkout.
#[derive(Debug, Clone)]
pub struct CheckoutReceipt {
    pub order: Order,
    pub payment_qr_url: String,
}

/// QR image URL encoding `QRIS|package|price|name|phone`.
///
/// # Errors
///
/// Returns `url::ParseError` if the configured endpoint is not a URL.
pub fn payment_qr_url(
    qr: &QrConfig,
    package_name: &str,
    price: &str,
    customer_name: &str,
    customer_phone: &str,
) -> Result<Url, url::ParseError> {
    let mut url = Url::parse(&qr.endpoint)?;
    let data = format!("QRIS|{package_name}|{price}|{customer_name}|{customer_phone}");
    url.query_pairs_mut()
        .append_pair("size", &format!("{0}x{0}", qr.size))
        .append_pair("data", &data);
    Ok(url)
}

/// Order service.
pub struct OrderService<'a> {
    store: &'a dyn Store,
    mailer: &'a Arc<dyn Mailer>,
    qr: &'a QrConfig,
    login_url: &'a str,
}

impl<'a> OrderService<'a> {
    #[must_use]
    pub const fn new(
        store: &'a dyn Store,
        mailer: &'a Arc<dyn Mailer>,
        qr: &'a QrConfig,
        login_url: &'a str,
    ) -> Self {
        Self {
            store,
            mailer,
            qr,
            login_url,
        }
    }

    /// Upsert the buyer and create a pending order.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::MissingField`, `InvalidEmail`,
    /// `UnknownPackage` or `NotPurchasable` for bad input.
    #[instrument(skip(self, form), fields(email = %form.email, package = %form.package))]
    pub async fn checkout(&self, form: CheckoutForm<'_>) -> Result<CheckoutReceipt, WorkflowError> {
        let name = required(form.name, "name")?;
        let email = Email::parse(required(form.email, "email")?)?;
        if form.password.is_empty() {
            return Err(WorkflowError::MissingField("password"));
        }
        let tier: PackageTier = required(form.package, "selectedPackage")?
            .parse()
            .map_err(|_| WorkflowError::UnknownPackage(form.package.to_string()))?;
        let listed = package(tier).ok_or(WorkflowError::NotPurchasable(tier))?;
        let template_name = required(form.template_name, "templateName")?;

        let phone = form.phone.map(str::trim).filter(|p| !p.is_empty());
        let price = form
            .price
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(listed.price);
        let package_name = form
            .package_name
            .map(str::trim)
            .filter(|p| !p.is_empty())
            .unwrap_or(listed.name);

        let payment_qr_url = payment_qr_url(
            self.qr,
            package_name,
            price,
            name,
            phone.unwrap_or_default(),
        )?
        .to_string();

        let order = self
            .store
            .checkout(Checkout {
                name: name.to_string(),
                email,
                phone: phone.map(String::from),
                password_hash: hash_password(form.password)?,
                package: tier,
                package_name: package_name.to_string(),
                template_name: template_name.to_string(),
                price: price.to_string(),
            })
            .await?;

        tracing::info!(order_id = %order.id, account_id = %order.account_id, "Order created");

        if let Some(account) = self.store.get_account(order.account_id).await? {
            email::dispatch(
                self.mailer,
                email::order_received(&account, &order, &payment_qr_url),
            );
        }

        Ok(CheckoutReceipt {
            order,
            payment_qr_url,
        })
    }

    /// Current status of an order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound` if the order does not exist.
    pub async fn status(&self, order_id: OrderId) -> Result<OrderStatus, WorkflowError> {
        let order = self
            .store
            .get_order(order_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(format!("order {order_id}")))?;
        Ok(order.status)
    }

    /// Orders of one account, newest first.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Store` if the store fails.
    pub async fn orders_for(&self, account_id: AccountId) -> Result<Vec<Order>, WorkflowError> {
        Ok(self.store.list_orders_by_account(account_id).await?)
    }

    /// One of the admin queues.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::Store` if the store fails.
    pub async fn queue(&self, queue: OrderQueue) -> Result<Vec<OrderWithAccount>, WorkflowError> {
        Ok(self.store.list_order_queue(queue).await?)
    }

    /// Confirm payment and unlock the account.
    ///
    /// Verifying an already-paid order succeeds without sending another email.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::NotFound`, `StoreError::InvalidInput` (order of
    /// another account) or `StoreError::Transition` (failed order).
    #[instrument(skip(self))]
    pub async fn verify_payment(
        &self,
        account_id: AccountId,
        order_id: OrderId,
    ) -> Result<PaymentVerified, WorkflowError> {
        let verified = self.store.verify_payment(account_id, order_id).await?;

        if verified.changed {
            tracing::info!(%order_id, %account_id, "Payment verified");
            email::dispatch(
                self.mailer,
                email::payment_verified(&verified.account, &verified.order, self.login_url),
            );
        } else {
            tracing::info!(%order_id, "Payment already verified");
        }

        Ok(verified)
    }

    /// Deliver the template and complete the order.
    ///
    /// # Errors
    ///
    /// Returns `WorkflowError::EmptyTemplatePath` for a blank path and
    /// `StoreError::Transition` unless the order is paid or completed.
    #[instrument(skip(self))]
    pub async fn complete(
        &self,
        order_id: OrderId,
        template_path: &str,
    ) -> Result<Order, WorkflowError> {
        let template_path = template_path.trim();
        if template_path.is_empty() {
            return Err(WorkflowError::EmptyTemplatePath);
        }

        let order = self.store.complete_order(order_id, template_path).await?;
        tracing::info!(%order_id, "Order completed");

        if let Some(account) = self.store.get_account(order.account_id).await? {
            email::dispatch(self.mailer, email::template_delivered(&account, &order));
        }

        Ok(order)
    }

    /// Reject an unpaid order.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Transition` if the order was already paid.
    #[instrument(skip(self))]
    pub async fn fail(&self, order_id: OrderId) -> Result<Order, WorkflowError> {
        let order = self.store.fail_order(order_id).await?;
        tracing::info!(%order_id, "Order failed");
        Ok(order)
    }
}

fn required<'s>(value: &'s str, field: &'static str) -> Result<&'s str, WorkflowError> {
    let value = value.trim();
    if value.is_empty() {
        return Err(WorkflowError::MissingField(field));
    }
    Ok(value)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::db::MemoryStore;
    use crate::services::email::{MailError, OutgoingEmail};
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct Outbox(Mutex<Vec<OutgoingEmail>>);

    impl Outbox {
        /// Messages sent so far, once queued deliveries have run.
        async fn sent(&self) -> Vec<OutgoingEmail> {
            for _ in 0..4 {
                tokio::task::yield_now().await;
            }
            self.0.lock().await.clone()
        }
    }

    fn outbox() -> (Arc<Outbox>, Arc<dyn Mailer>) {
        let outbox = Arc::new(Outbox::default());
        let mailer: Arc<dyn Mailer> = outbox.clone();
        (outbox, mailer)
    }

    fn refusing() -> Arc<dyn Mailer> {
        Arc::new(Refusing)
    }

    #[async_trait]
    impl Mailer for Outbox {
        async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
            self.0.lock().await.push(email);
            Ok(())
        }
    }

    struct Refusing;

    #[async_trait]
    impl Mailer for Refusing {
        async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
            Err(MailError::InvalidAddress(email.to))
        }
    }

    fn form() -> CheckoutForm<'static> {
        CheckoutForm {
            name: "Budi",
            email: "b@x.com",
            password: "kopi-senja",
            phone: Some("0812"),
            package: "medium",
            template_name: "Kopi Senja",
            price: None,
            package_name: None,
        }
    }

    #[test]
    fn test_catalog() {
        assert_eq!(package(PackageTier::Small).unwrap().price, "Rp 500.000");
        assert_eq!(
            package(PackageTier::Enterprise).unwrap().name,
            "Paket Bisnis (Enterprise)"
        );
        assert!(package(PackageTier::None).is_none());
    }

    #[test]
    fn test_payment_qr_url() {
        let url = payment_qr_url(
            &QrConfig::default(),
            "Paket Medium",
            "Rp 1.000.000",
            "Budi",
            "0812",
        )
        .unwrap();
        assert_eq!(url.host_str(), Some("api.qrserver.com"));
        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(pairs[0], ("size".to_string(), "300x300".to_string()));
        assert_eq!(
            pairs[1],
            (
                "data".to_string(),
                "QRIS|Paket Medium|Rp 1.000.000|Budi|0812".to_string()
            )
        );
    }

    #[tokio::test]
    async fn test_checkout_uses_catalog_defaults_and_mails() {
        let store = MemoryStore::new();
        let (outbox, mailer) = outbox();
        let qr = QrConfig::default();
        let service = OrderService::new(&store, &mailer, &qr, "https://bibooster.com/auth");

        let receipt = service.checkout(form()).await.unwrap();
        assert_eq!(receipt.order.status, OrderStatus::Pending);
        assert_eq!(receipt.order.package_id, PackageTier::Medium);
        assert_eq!(receipt.order.package_name, "Paket Medium");
        assert_eq!(receipt.order.price, "Rp 1.000.000");
        assert!(receipt.payment_qr_url.contains("QRIS"));

        let sent = outbox.sent().await;
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].to, "b@x.com");
    }

    #[tokio::test]
    async fn test_checkout_validation() {
        let store = MemoryStore::new();
        let qr = QrConfig::default();
        let mailer = refusing();
        let service = OrderService::new(&store, &mailer, &qr, "/auth");

        let err = service
            .checkout(CheckoutForm {
                template_name: " ",
                ..form()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::MissingField("templateName")));

        let err = service
            .checkout(CheckoutForm {
                package: "gold",
                ..form()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::UnknownPackage(_)));

        let err = service
            .checkout(CheckoutForm {
                package: "none",
                ..form()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::NotPurchasable(PackageTier::None)));

        let err = service
            .checkout(CheckoutForm {
                password: "",
                ..form()
            })
            .await
            .unwrap_err();
        assert!(matches!(err, WorkflowError::MissingField("password")));
    }

    #[tokio::test]
    async fn test_mail_failure_does_not_fail_workflow() {
        let store = MemoryStore::new();
        let qr = QrConfig::default();
        let mailer = refusing();
        let service = OrderService::new(&store, &mailer, &qr, "/auth");

        let receipt = service.checkout(form()).await.unwrap();
        let order = receipt.order;
        let verified = service
            .verify_payment(order.account_id, order.id)
            .await
            .unwrap();
        assert!(verified.changed);
        let done = service.complete(order.id, "https://t.app/kopi").await.unwrap();
        assert_eq!(done.status, OrderStatus::Completed);
    }

    #[tokio::test]
    async fn test_reverify_sends_no_second_email() {
        let store = MemoryStore::new();
        let (outbox, mailer) = outbox();
        let qr = QrConfig::default();
        let service = OrderService::new(&store, &mailer, &qr, "/auth");

        let order = service.checkout(form()).await.unwrap().order;
        service.verify_payment(order.account_id, order.id).await.unwrap();
        let again = service.verify_payment(order.account_id, order.id).await.unwrap();
        assert!(!again.changed);
        assert_eq!(service.status(order.id).await.unwrap(), OrderStatus::Paid);

        // order received + payment verified
        assert_eq!(outbox.sent().await.len(), 2);
    }

    #[tokio::test]
    async fn test_complete_rejects_blank_path_and_unpaid_order() {
        let store = MemoryStore::new();
        let (_outbox, mailer) = outbox();
        let qr = QrConfig::default();
        let service = OrderService::new(&store, &mailer, &qr, "/auth");
        let order = service.checkout(form()).await.unwrap().order;

        let err = service.complete(order.id, "  ").await.unwrap_err();
        assert!(matches!(err, WorkflowError::EmptyTemplatePath));

        let err = service.complete(order.id, "https://t.app").await.unwrap_err();
        assert!(matches!(err, WorkflowError::Store(StoreError::Transition(_))));

        let err = service.status(OrderId::generate()).await.unwrap_err();
        assert!(matches!(err, WorkflowError::Store(StoreError::NotFound(_))));
    }
}
