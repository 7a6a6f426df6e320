//! Application state shared across handlers.

use std::sync::Arc;

use crate::config::QrConfig;
use crate::db::Store;
use crate::services::builder::BuilderService;
use crate::services::email::Mailer;
use crate::services::lms::{ContentCache, LmsService};
use crate::services::orders::OrderService;
use crate::services::prompt::CompletionModel;

/// Application state shared across all handlers.
///
/// Cheaply cloneable via `Arc`. Backends are trait objects so the same router
/// runs against Postgres in production and the in-memory store in tests.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    store: Arc<dyn Store>,
    mailer: Arc<dyn Mailer>,
    model: Option<Arc<dyn CompletionModel>>,
    content: ContentCache,
    qr: QrConfig,
    login_url: String,
}

impl AppState {
    /// Create a new application state.
    ///
    /// `web_url` is the customer-facing site; emails link to its sign-in page.
    #[must_use]
    pub fn new(
        store: Arc<dyn Store>,
        mailer: Arc<dyn Mailer>,
        model: Option<Arc<dyn CompletionModel>>,
        qr: QrConfig,
        web_url: &str,
    ) -> Self {
        Self {
            inner: Arc::new(AppStateInner {
                store,
                mailer,
                model,
                content: ContentCache::default(),
                qr,
                login_url: format!("{}/auth", web_url.trim_end_matches('/')),
            }),
        }
    }

    #[must_use]
    pub fn store(&self) -> &dyn Store {
        self.inner.store.as_ref()
    }

    #[must_use]
    pub fn orders(&self) -> OrderService<'_> {
        OrderService::new(
            self.store(),
            &self.inner.mailer,
            &self.inner.qr,
            &self.inner.login_url,
        )
    }

    #[must_use]
    pub fn lms(&self) -> LmsService<'_> {
        LmsService::new(self.store(), &self.inner.content)
    }

    #[must_use]
    pub fn builder(&self) -> BuilderService<'_> {
        BuilderService::new(self.store(), self.inner.model.as_deref())
    }
}
