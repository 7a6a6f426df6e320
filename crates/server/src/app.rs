//! Router assembly.
//!
//! `main` and the integration tests build the same router here; only the
//! store, session backend and rate limiting differ.

use axum::{
    Router,
    extract::State,
    http::{HeaderValue, Method, StatusCode, header},
    middleware::from_fn,
    routing::get,
};
use sentry_tower::{NewSentryLayer, SentryHttpLayer};
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultOnResponse, OnResponse, TraceLayer},
};
use tower_sessions::{SessionManagerLayer, SessionStore};
use tracing::Span;

use crate::middleware::{api_rate_limiter, auth_rate_limiter, request_id_middleware};
use crate::routes;
use crate::state::AppState;

/// Router options that vary between deployments.
#[derive(Debug, Clone, Default)]
pub struct RouterOptions {
    /// Browser origin allowed to call the API with credentials.
    pub cors_origin: Option<String>,
    /// Install the per-IP rate limiters. Requires connect info or proxy headers.
    pub rate_limit: bool,
}

/// Build the application router.
pub fn router<S>(
    state: AppState,
    session_layer: SessionManagerLayer<S>,
    options: &RouterOptions,
) -> Router
where
    S: SessionStore + Clone,
{
    let mut auth = routes::auth_routes();
    let mut api = routes::api_routes();
    if options.rate_limit {
        auth = auth.layer(auth_rate_limiter());
        api = api.layer(api_rate_limiter());
    }

    let mut app = Router::new()
        .route("/health", get(health))
        .route("/health/ready", get(readiness))
        .nest("/api/auth", auth)
        .nest("/api", api)
        .layer(session_layer);

    if let Some(cors) = options.cors_origin.as_deref().and_then(cors_layer) {
        app = app.layer(cors);
    }

    app.layer(from_fn(request_id_middleware))
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(|request: &axum::http::Request<_>| {
                    tracing::info_span!(
                        "http_request",
                        method = %request.method(),
                        uri = %request.uri(),
                        request_id = tracing::field::Empty,
                        status = tracing::field::Empty,
                        latency_ms = tracing::field::Empty,
                    )
                })
                .on_response(
                    |response: &axum::http::Response<_>,
                     latency: std::time::Duration,
                     span: &Span| {
                        span.record("status", response.status().as_u16());
                        span.record(
                            "latency_ms",
                            u64::try_from(latency.as_millis()).unwrap_or(u64::MAX),
                        );
                        DefaultOnResponse::default().on_response(response, latency, span);
                    },
                ),
        )
        .with_state(state)
        // Sentry layers (outermost for full request coverage)
        .layer(
            ServiceBuilder::new()
                .layer(NewSentryLayer::new_from_top())
                .layer(SentryHttpLayer::new().enable_transaction()),
        )
}

fn cors_layer(origin: &str) -> Option<CorsLayer> {
    let Ok(origin) = HeaderValue::from_str(origin.trim_end_matches('/')) else {
        tracing::warn!(origin, "Ignoring invalid CORS origin");
        return None;
    };

    Some(
        CorsLayer::new()
            .allow_origin(origin)
            .allow_credentials(true)
            .allow_methods([Method::GET, Method::POST, Method::PUT])
            .allow_headers([header::CONTENT_TYPE]),
    )
}

/// Liveness health check endpoint.
///
/// Returns "ok" if the server is running. Does not check dependencies.
async fn health() -> &'static str {
    "ok"
}

/// Readiness health check endpoint.
///
/// Returns 503 Service Unavailable if the store is not reachable.
async fn readiness(State(state): State<AppState>) -> StatusCode {
    match state.store().ping().await {
        Ok(()) => StatusCode::OK,
        Err(err) => {
            tracing::warn!(error = %err, "Readiness check failed");
            StatusCode::SERVICE_UNAVAILABLE
        }
    }
}
