//! # ldb-api: Binary Entry Point
//!
//! Starts the Axum HTTP server for the LicenseDB obligations API.
//! Binds to configurable port (default 8080).

use std::sync::Arc;

use ldb_api::db::{self, PgObligationStore};
use ldb_api::middleware::metrics::ApiMetrics;
use ldb_api::state::{AppConfig, AppState};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize structured tracing.
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let config = AppConfig::from_env().map_err(|e| {
        tracing::error!("Invalid configuration: {e}");
        e
    })?;
    tracing::debug!(?config, "configuration loaded");

    if config.api_keys.is_empty() {
        tracing::warn!(
            dev_user = %config.dev_user,
            "LDB_API_KEYS not set, authentication disabled"
        );
    }

    let mut state = match &config.database_url {
        Some(url) => {
            let pool = db::init_pool(url).await.map_err(|e| {
                tracing::error!("Database initialization failed: {e}");
                e
            })?;

            // Acting users must exist before they can author audit records.
            let mut usernames: Vec<&str> = config.api_keys.iter().map(|k| k.username()).collect();
            if config.api_keys.is_empty() {
                usernames.push(&config.dev_user);
            }
            for username in usernames {
                db::users::ensure(&pool, username).await?;
            }

            AppState::with_store(Arc::new(PgObligationStore::new(pool)), config.clone())
        }
        None => {
            tracing::warn!("DATABASE_URL not set, running in-memory only. State will not survive restarts.");
            AppState::in_memory(config.clone())
        }
    };

    if config.metrics_enabled {
        state = state.with_metrics(ApiMetrics::try_new()?);
    }

    let app = ldb_api::app(state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("LicenseDB API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
