//! # ldb-api: LicenseDB Obligations HTTP Service
//!
//! Axum service exposing license obligations over REST, backed by either
//! PostgreSQL ([`db::PgObligationStore`]) or an in-memory store
//! ([`store::MemoryStore`]).
//!
//! ## API Surface
//!
//! | Method | Path                                   | Auth    |
//! |--------|----------------------------------------|---------|
//! | GET    | `/api/v1/obligations`                  | none    |
//! | GET    | `/api/v1/obligations/:topic`           | none    |
//! | POST   | `/api/v1/obligations`                  | API key |
//! | PATCH  | `/api/v1/obligations/:topic`           | API key |
//! | DELETE | `/api/v1/obligations/:topic`           | API key |
//! | GET    | `/api/v1/obligations/:topic/audits`    | API key |
//!
//! ## Middleware Stack (execution order)
//!
//! ```text
//! TraceLayer → MetricsMiddleware → ErrorEnvelope → AuthMiddleware → Handler
//! ```
//!
//! ## OpenAPI
//!
//! Generated via utoipa derive macros, served at `/openapi.json`.

pub mod auth;
pub mod db;
pub mod error;
pub mod extractors;
pub mod middleware;
pub mod openapi;
pub mod pagination;
pub mod routes;
pub mod state;
pub mod store;

use axum::extract::{DefaultBodyLimit, State};
use axum::http::StatusCode;
use axum::middleware::from_fn;
use axum::response::IntoResponse;
use axum::{Extension, Router};
use tower_http::trace::TraceLayer;

use crate::error::AppError;
use crate::middleware::metrics::ApiMetrics;
use crate::state::AppState;

/// Assemble the full application router with all routes and middleware.
///
/// Health probes (`/health/*`), `/metrics` and `/openapi.json` are mounted
/// outside the auth middleware so they remain accessible without credentials.
pub fn app(state: AppState) -> Router {
    let auth_config = state.config.auth_config();

    // Body size limit: 2 MiB.
    let mut api = Router::new()
        .merge(routes::obligations::router())
        .fallback(route_not_found)
        .layer(DefaultBodyLimit::max(2 * 1024 * 1024))
        .layer(from_fn(auth::auth_middleware))
        .layer(from_fn(middleware::envelope::error_envelope_middleware));

    if let Some(metrics) = &state.metrics {
        api = api
            .layer(from_fn(middleware::metrics::metrics_middleware))
            .layer(Extension(metrics.clone()));
    }

    let api = api
        .layer(TraceLayer::new_for_http())
        .layer(Extension(auth_config))
        .with_state(state.clone());

    let mut unauthenticated = Router::new()
        .route("/health/liveness", axum::routing::get(liveness))
        .route("/health/readiness", axum::routing::get(readiness))
        .merge(openapi::router());

    if let Some(metrics) = &state.metrics {
        unauthenticated = unauthenticated
            .route("/metrics", axum::routing::get(prometheus_metrics))
            .layer(Extension(metrics.clone()));
    }

    Router::new()
        .merge(unauthenticated.with_state(state))
        .merge(api)
}

async fn route_not_found() -> AppError {
    AppError::NotFound("route not found".into())
}

/// GET /metrics: Prometheus text exposition.
async fn prometheus_metrics(Extension(metrics): Extension<ApiMetrics>) -> impl IntoResponse {
    match metrics.gather_and_encode() {
        Ok(body) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            body,
        )
            .into_response(),
        Err(e) => {
            tracing::error!("{e}");
            (StatusCode::INTERNAL_SERVER_ERROR, "metrics encoding failed").into_response()
        }
    }
}

/// Liveness probe.
async fn liveness() -> &'static str {
    "ok"
}

/// Readiness probe. Returns 200 "ready" or 503 when the store is unreachable.
async fn readiness(State(state): State<AppState>) -> impl IntoResponse {
    match state.store.ping().await {
        Ok(()) => (StatusCode::OK, "ready").into_response(),
        Err(e) => {
            tracing::warn!("store health check failed: {e}");
            (StatusCode::SERVICE_UNAVAILABLE, "store unreachable").into_response()
        }
    }
}
