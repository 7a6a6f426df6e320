//! Integration test harness for Booster.
//!
//! Runs the production router over the in-memory store, an in-memory session
//! store, a recording mailer and a scripted language model. No database or
//! network is needed:
//!
//! ```bash
//! cargo test -p booster-integration-tests
//! ```
//!
//! Each [`TestContext::server`] call returns a client with its own cookie
//! jar over the shared state, so one test can act as admin and customer.

use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use axum_test::{TestResponse, TestServer, TestServerConfig};
use serde_json::{Value, json};

use booster_server::app::{self, RouterOptions};
use booster_server::config::QrConfig;
use booster_server::db::{MemoryStore, Store};
use booster_server::middleware::create_session_layer;
use booster_server::models::{Account, NewAccount};
use booster_server::services::auth::hash_password;
use booster_server::services::email::{MailError, Mailer, OutgoingEmail};
use booster_server::services::prompt::{CompletionModel, PromptError};
use booster_server::state::AppState;
use booster_core::Email;

/// Password used for every account the harness creates.
pub const PASSWORD: &str = "rahasia-sekali";

/// Mailer that keeps every message.
#[derive(Debug, Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<OutgoingEmail>>,
}

impl RecordingMailer {
    /// Subjects of the messages sent to `to`, oldest first.
    ///
    /// Emails go out on background tasks, so this first lets any queued
    /// delivery run.
    pub async fn subjects_to(&self, to: &str) -> Vec<String> {
        for _ in 0..4 {
            tokio::task::yield_now().await;
        }
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .iter()
            .filter(|m| m.to == to)
            .map(|m| m.subject.clone())
            .collect()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: OutgoingEmail) -> Result<(), MailError> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(email);
        Ok(())
    }
}

/// Language model that always answers with the same brief.
#[derive(Debug, Clone)]
pub struct ScriptedModel(pub String);

#[async_trait]
impl CompletionModel for ScriptedModel {
    async fn complete(&self, _system: &str, message: &str) -> Result<String, PromptError> {
        Ok(format!("{} ({message})", self.0))
    }
}

/// Shared state behind every test client.
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub mailer: Arc<RecordingMailer>,
    state: AppState,
    sessions: tower_sessions::MemoryStore,
}

impl Default for TestContext {
    fn default() -> Self {
        Self::new()
    }
}

impl TestContext {
    /// Context with a scripted language model.
    pub fn new() -> Self {
        Self::build(Some(Arc::new(ScriptedModel(
            "Kopi Senja adalah website kedai kopi modern".to_string(),
        ))))
    }

    /// Context without a language model configured.
    pub fn without_model() -> Self {
        Self::build(None)
    }

    fn build(model: Option<Arc<dyn CompletionModel>>) -> Self {
        let store = Arc::new(MemoryStore::new());
        let mailer = Arc::new(RecordingMailer::default());
        let state = AppState::new(
            store.clone(),
            mailer.clone(),
            model,
            QrConfig::default(),
            "http://localhost:5173",
        );

        Self {
            store,
            mailer,
            state,
            sessions: tower_sessions::MemoryStore::default(),
        }
    }

    /// A client with its own cookie jar.
    ///
    /// # Panics
    ///
    /// Panics if the test server cannot be created.
    pub fn server(&self) -> TestServer {
        let app = app::router(
            self.state.clone(),
            create_session_layer(self.sessions.clone(), false),
            &RouterOptions::default(),
        );
        TestServer::new_with_config(
            app,
            TestServerConfig {
                save_cookies: true,
                ..TestServerConfig::default()
            },
        )
        .expect("Failed to create test server")
    }

    /// Insert an administrator directly into the store.
    ///
    /// # Panics
    ///
    /// Panics if the account cannot be created.
    pub async fn create_admin(&self, email: &str) -> Account {
        self.store
            .create_account(NewAccount::administrator(
                "Admin".to_string(),
                Email::parse(email).expect("valid admin email"),
                hash_password(PASSWORD).expect("hash"),
            ))
            .await
            .expect("Failed to create admin")
    }

    /// A client signed in as a fresh administrator.
    ///
    /// # Panics
    ///
    /// Panics if sign-in fails.
    pub async fn admin_server(&self) -> TestServer {
        self.create_admin("admin@bibooster.com").await;
        let server = self.server();
        sign_in(&server, "admin@bibooster.com").await.assert_status_ok();
        server
    }
}

/// Sign in with [`PASSWORD`].
pub async fn sign_in(server: &TestServer, email: &str) -> TestResponse {
    server
        .post("/api/auth/login")
        .json(&json!({ "email": email, "password": PASSWORD }))
        .await
}

/// Check out `package` for `email` and return the order ID.
///
/// # Panics
///
/// Panics if checkout does not return 201.
pub async fn checkout(server: &TestServer, email: &str, package: &str) -> String {
    let response = server
        .post("/api/orders/create")
        .json(&json!({
            "name": "Budi",
            "email": email,
            "password": PASSWORD,
            "phone": "08123456789",
            "selectedPackage": { "id": package, "name": "Paket" },
            "templateName": "Kopi Nusantara",
        }))
        .await;
    assert_eq!(response.status_code(), 201, "{}", response.text());

    let body: Value = response.json();
    body["orderId"]
        .as_str()
        .expect("orderId in checkout response")
        .to_string()
}

/// Verify the payment of `order_id` as admin.
///
/// # Panics
///
/// Panics if the order does not exist in the pending queue.
pub async fn verify(admin: &TestServer, order_id: &str) -> TestResponse {
    let pending: Value = admin.get("/api/admin/orders/pending").await.json();
    let user_id = pending["orders"]
        .as_array()
        .and_then(|orders| orders.iter().find(|o| o["id"] == order_id))
        .map(|o| o["user_id"].clone())
        .expect("order in pending queue");

    admin
        .post("/api/admin/orders/verify")
        .json(&json!({ "userId": user_id, "orderId": order_id }))
        .await
}
