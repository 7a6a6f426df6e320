//! Transactional email.
//!
//! Messages are rendered from Askama templates into [`OutgoingEmail`] and
//! handed to a [`Mailer`]. With SMTP configured the [`SmtpMailer`] delivers
//! them through lettre; otherwise the [`LogMailer`] only logs the envelope.
//!
//! Every email in this service is best-effort: callers go through
//! [`dispatch`], which sends on a background task so a slow relay never holds
//! up the request, and [`deliver`] logs failures at `warn` without returning
//! them.

use std::sync::Arc;

use askama::Template;
use async_trait::async_trait;
use lettre::{
    AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor,
    message::{MultiPart, SinglePart, header::ContentType},
    transport::smtp::{Error as SmtpError, authentication::Credentials},
};
use secrecy::ExposeSecret;
use thiserror::Error;
use tokio::task::JoinHandle;

use crate::config::SmtpConfig;
use crate::models::{Account, Order};

#[derive(Template)]
#[template(path = "email/order_received.html")]
struct OrderReceivedHtml<'a> {
    name: &'a str,
    order: &'a Order,
    qr_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/order_received.txt")]
struct OrderReceivedText<'a> {
    name: &'a str,
    order: &'a Order,
    qr_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/payment_verified.html")]
struct PaymentVerifiedHtml<'a> {
    name: &'a str,
    order: &'a Order,
    login_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/payment_verified.txt")]
struct PaymentVerifiedText<'a> {
    name: &'a str,
    order: &'a Order,
    login_url: &'a str,
}

#[derive(Template)]
#[template(path = "email/template_delivered.html")]
struct TemplateDeliveredHtml<'a> {
    name: &'a str,
    order: &'a Order,
    template_path: &'a str,
}

#[derive(Template)]
#[template(path = "email/template_delivered.txt")]
struct TemplateDeliveredText<'a> {
    name: &'a str,
    order: &'a Order,
    template_path: &'a str,
}

/// Errors that can occur when building or sending email.
#[derive(Debug, Error)]
pub enum MailError {
    /// SMTP transport error.
    #[error("SMTP error: {0}")]
    Smtp(#[from] SmtpError),

    /// Failed to build email message.
    #[error("Failed to build message: {0}")]
    MessageBuild(#[from] lettre::error::Error),

    /// Invalid email address.
    #[error("Invalid email address: {0}")]
    InvalidAddress(String),

    /// Template rendering error.
    #[error("Template error: {0}")]
    Template(#[from] askama::Error),
}

/// A rendered message ready for a [`Mailer`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutgoingEmail {
    pub to: String,
    pub subject: String,
    pub text: String,
    pub html: String,
}

/// Delivery backend.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError>;
}

/// SMTP delivery via lettre.
#[derive(Clone)]
pub struct SmtpMailer {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from_address: String,
}

impl SmtpMailer {
    /// Create a mailer from configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the relay cannot be configured.
    pub fn new(config: &SmtpConfig) -> Result<Self, MailError> {
        let mut builder =
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)?.port(config.port);

        if let Some(username) = &config.username {
            let password = config
                .password
                .as_ref()
                .map(|p| p.expose_secret().to_string())
                .unwrap_or_default();
            builder = builder.credentials(Credentials::new(username.clone(), password));
        }

        Ok(Self {
            transport: builder.build(),
            from_address: config.from.clone(),
        })
    }
}

#[async_trait]
impl Mailer for SmtpMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        let message = Message::builder()
            .from(
                self.from_address
                    .parse()
                    .map_err(|_| MailError::InvalidAddress(self.from_address.clone()))?,
            )
            .to(email
                .to
                .parse()
                .map_err(|_| MailError::InvalidAddress(email.to.clone()))?)
            .subject(email.subject.as_str())
            .multipart(
                MultiPart::alternative()
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_PLAIN)
                            .body(email.text),
                    )
                    .singlepart(
                        SinglePart::builder()
                            .header(ContentType::TEXT_HTML)
                            .body(email.html),
                    ),
            )?;

        self.transport.send(message).await?;

        tracing::info!(to = %email.to, subject = %email.subject, "Email sent successfully");
        Ok(())
    }
}

/// Mailer used when SMTP is not configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        tracing::info!(to = %email.to, subject = %email.subject, "Email not sent (SMTP disabled)");
        Ok(())
    }
}

/// Send a rendered email on a background task.
pub fn dispatch(
    mailer: &Arc<dyn Mailer>,
    email: Result<OutgoingEmail, MailError>,
) -> JoinHandle<()> {
    let mailer = Arc::clone(mailer);
    tokio::spawn(async move { deliver(mailer.as_ref(), email).await })
}

/// Send a rendered email, logging and dropping any failure.
pub async fn deliver(mailer: &dyn Mailer, email: Result<OutgoingEmail, MailError>) {
    let result = match email {
        Ok(email) => mailer.send(email).await,
        Err(err) => Err(err),
    };
    if let Err(err) = result {
        tracing::warn!(error = %err, "Failed to send email");
    }
}

/// Checkout confirmation with the payment QR code.
///
/// # Errors
///
/// Returns `MailError::Template` if rendering fails.
pub fn order_received(
    to: &Account,
    order: &Order,
    qr_url: &str,
) -> Result<OutgoingEmail, MailError> {
    let name = to.name.as_str();
    Ok(OutgoingEmail {
        to: to.email.to_string(),
        subject: format!("Pesanan {} diterima", order.package_name),
        text: OrderReceivedText { name, order, qr_url }.render()?,
        html: OrderReceivedHtml { name, order, qr_url }.render()?,
    })
}

/// Payment confirmation; the account can now sign in.
///
/// # Errors
///
/// Returns `MailError::Template` if rendering fails.
pub fn payment_verified(
    to: &Account,
    order: &Order,
    login_url: &str,
) -> Result<OutgoingEmail, MailError> {
    let name = to.name.as_str();
    Ok(OutgoingEmail {
        to: to.email.to_string(),
        subject: "Pembayaran Anda telah diverifikasi".to_string(),
        text: PaymentVerifiedText {
            name,
            order,
            login_url,
        }
        .render()?,
        html: PaymentVerifiedHtml {
            name,
            order,
            login_url,
        }
        .render()?,
    })
}

/// Delivery notice pointing at the finished template.
///
/// # Errors
///
/// Returns `MailError::Template` if rendering fails.
pub fn template_delivered(to: &Account, order: &Order) -> Result<OutgoingEmail, MailError> {
    let name = to.name.as_str();
    let template_path = order.template_path.as_deref().unwrap_or_default();
    Ok(OutgoingEmail {
        to: to.email.to_string(),
        subject: format!("Template {} siap digunakan", order.template_name),
        text: TemplateDeliveredText {
            name,
            order,
            template_path,
        }
        .render()?,
        html: TemplateDeliveredHtml {
            name,
            order,
            template_path,
        }
        .render()?,
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use booster_core::{AccountId, AccountStatus, Email, OrderId, OrderStatus, PackageTier, Role};
    use chrono::Utc;

    fn account() -> Account {
        Account {
            id: AccountId::generate(),
            name: "Budi".to_string(),
            email: Email::parse("budi@kopi.id").unwrap(),
            phone: None,
            is_verified: false,
            has_paid: false,
            access_tier: PackageTier::Medium,
            role: Role::User,
            status: AccountStatus::Pending,
            created_at: Utc::now(),
        }
    }

    fn order(account: &Account) -> Order {
        Order {
            id: OrderId::generate(),
            account_id: account.id,
            package_id: PackageTier::Medium,
            package_name: "Paket Medium".to_string(),
            template_name: "Kopi Senja".to_string(),
            price: "Rp 1.000.000".to_string(),
            status: OrderStatus::Completed,
            template_path: Some("https://cdn.bibooster.com/kopi-senja.zip".to_string()),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_order_received_renders_details() {
        let account = account();
        let order = order(&account);
        let email = order_received(&account, &order, "https://qr.example/img?data=x").unwrap();

        assert_eq!(email.to, "budi@kopi.id");
        assert!(email.subject.contains("Paket Medium"));
        assert!(email.text.contains("Rp 1.000.000"));
        assert!(email.text.contains(&order.id.to_string()));
        assert!(email.html.contains("Kopi Senja"));
    }

    #[test]
    fn test_template_delivered_includes_link() {
        let account = account();
        let order = order(&account);
        let email = template_delivered(&account, &order).unwrap();
        assert!(email.text.contains("https://cdn.bibooster.com/kopi-senja.zip"));
    }

    #[derive(Default)]
    struct Gated {
        open: tokio::sync::Notify,
        sent: std::sync::Mutex<Vec<String>>,
    }

    #[async_trait]
    impl Mailer for Gated {
        async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
            self.open.notified().await;
            self.sent.lock().unwrap().push(email.to);
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_dispatch_does_not_wait_for_delivery() {
        let gated = Arc::new(Gated::default());
        let mailer: Arc<dyn Mailer> = gated.clone();
        let account = account();
        let order = order(&account);

        let handle = dispatch(&mailer, template_delivered(&account, &order));
        tokio::task::yield_now().await;
        assert!(!handle.is_finished());
        assert!(gated.sent.lock().unwrap().is_empty());

        gated.open.notify_one();
        handle.await.unwrap();
        assert_eq!(*gated.sent.lock().unwrap(), vec!["budi@kopi.id".to_string()]);
    }

    #[tokio::test]
    async fn test_deliver_swallows_render_errors() {
        deliver(
            &LogMailer,
            Err(MailError::InvalidAddress("nobody".to_string())),
        )
        .await;
    }
}
