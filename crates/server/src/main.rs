//! Booster Server - HTTP API for the template storefront and LMS.
//!
//! Serves the web client on port 3001.
//!
//! # Architecture
//!
//! - Axum with JSON handlers under `/api`
//! - `PostgreSQL` for accounts, orders, LMS content and build jobs
//! - `PostgreSQL`-backed sessions (tower-sessions)
//! - SMTP for order emails, a chat-completion API for the prompt builder

#![cfg_attr(not(test), forbid(unsafe_code))]

use std::net::SocketAddr;
use std::sync::Arc;

use booster_server::app::{self, RouterOptions};
use booster_server::config::ServerConfig;
use booster_server::db::{self, PgStore};
use booster_server::middleware::postgres_session_layer;
use booster_server::services::email::{LogMailer, Mailer, SmtpMailer};
use booster_server::services::prompt::{ChatClient, CompletionModel};
use booster_server::state::AppState;
use sentry::integrations::tracing as sentry_tracing;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize Sentry error tracking and return guard that must be kept alive.
fn init_sentry(config: &ServerConfig) -> Option<sentry::ClientInitGuard> {
    let dsn = config.sentry_dsn.as_ref()?;

    let guard = sentry::init((
        dsn.as_str(),
        sentry::ClientOptions {
            release: sentry::release_name!(),
            environment: config
                .sentry_environment
                .clone()
                .map(std::borrow::Cow::Owned),
            attach_stacktrace: true,
            ..Default::default()
        },
    ));

    tracing::info!("Sentry initialized");
    Some(guard)
}

/// Filter tracing events to Sentry event types.
fn sentry_event_filter(metadata: &tracing::Metadata<'_>) -> sentry_tracing::EventFilter {
    match *metadata.level() {
        tracing::Level::ERROR | tracing::Level::WARN => sentry_tracing::EventFilter::Event,
        tracing::Level::INFO | tracing::Level::DEBUG => sentry_tracing::EventFilter::Breadcrumb,
        _ => sentry_tracing::EventFilter::Ignore,
    }
}

fn mailer(config: &ServerConfig) -> Arc<dyn Mailer> {
    match config.smtp.as_ref().map(SmtpMailer::new) {
        Some(Ok(mailer)) => Arc::new(mailer),
        Some(Err(err)) => {
            tracing::error!(error = %err, "Invalid SMTP configuration, emails will only be logged");
            Arc::new(LogMailer)
        }
        None => {
            tracing::info!("SMTP not configured, emails will only be logged");
            Arc::new(LogMailer)
        }
    }
}

fn completion_model(config: &ServerConfig) -> Option<Arc<dyn CompletionModel>> {
    let Some(llm) = config.llm.as_ref() else {
        tracing::info!("LLM_API_KEY not set, prompt builder disabled");
        return None;
    };
    match ChatClient::new(llm) {
        Ok(client) => Some(Arc::new(client)),
        Err(err) => {
            tracing::error!(error = %err, "Failed to create language model client");
            None
        }
    }
}

#[tokio::main]
async fn main() {
    // Load configuration from environment (needed for Sentry init)
    let config = ServerConfig::from_env().expect("Failed to load configuration");

    // Initialize Sentry (must be done before tracing subscriber)
    let _sentry_guard = init_sentry(&config);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "booster_server=info,tower_http=debug".into());

    let json_layer = config
        .log_json
        .then(|| tracing_subscriber::fmt::layer().json().flatten_event(true));
    let text_layer = (!config.log_json).then(tracing_subscriber::fmt::layer);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(json_layer)
        .with(text_layer)
        .with(sentry_tracing::layer().event_filter(sentry_event_filter))
        .init();

    let pool = db::create_pool(&config.database_url)
        .await
        .expect("Failed to create database pool");
    tracing::info!("Database pool created");

    // NOTE: Migrations are NOT run automatically on startup.
    // Run them explicitly via: cargo run -p booster-cli -- migrate

    let session_layer = postgres_session_layer(&pool, &config);

    let web_url = config.cors_origin.as_deref().unwrap_or(&config.base_url);
    let state = AppState::new(
        Arc::new(PgStore::new(pool)),
        mailer(&config),
        completion_model(&config),
        config.qr.clone(),
        web_url,
    );

    let app = app::router(
        state,
        session_layer,
        &RouterOptions {
            cors_origin: config.cors_origin.clone(),
            rate_limit: config.rate_limit,
        },
    );

    let addr = config.socket_addr();
    tracing::info!("booster-server listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(
        listener,
        app.into_make_service_with_connect_info::<SocketAddr>(),
    )
    .with_graceful_shutdown(shutdown_signal())
    .await
    .expect("Server error");
}

/// Wait for shutdown signal (Ctrl+C or SIGTERM).
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {},
        () = terminate => {},
    }

    tracing::info!("Shutdown signal received, starting graceful shutdown");
}
