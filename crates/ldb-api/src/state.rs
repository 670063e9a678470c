//! # Application State and Configuration
//!
//! [`AppConfig`] is read from the environment once at startup.
//! [`AppState`] is shared across handlers via Axum's `State` extractor and
//! holds the configured [`ObligationStore`] behind an `Arc<dyn _>`.

use std::sync::Arc;

use thiserror::Error;

use crate::auth::{ApiKey, AuthConfig};
use crate::middleware::metrics::ApiMetrics;
use crate::store::{MemoryStore, ObligationStore};

/// Errors raised while reading configuration from the environment.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("PORT must be a valid port number, got '{0}'")]
    InvalidPort(String),

    #[error("LDB_API_KEYS entry #{0} must look like 'username:key'")]
    InvalidApiKey(usize),

    #[error("{var} must be 'true' or 'false', got '{value}'")]
    InvalidFlag { var: &'static str, value: String },
}

/// Application configuration.
///
/// Custom `Debug` redacts API keys and the database URL to prevent
/// credential leakage in logs.
#[derive(Clone)]
pub struct AppConfig {
    /// Port to bind the HTTP server to.
    pub port: u16,
    /// Postgres connection string. `None` selects the in-memory store.
    pub database_url: Option<String>,
    /// Accepted API keys. Empty disables authentication.
    pub api_keys: Vec<ApiKey>,
    /// Acting user when authentication is disabled.
    pub dev_user: String,
    /// Mount the Prometheus middleware and `/metrics`.
    pub metrics_enabled: bool,
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("port", &self.port)
            .field(
                "database_url",
                &self.database_url.as_ref().map(|_| "[REDACTED]"),
            )
            .field("api_keys", &self.api_keys)
            .field("dev_user", &self.dev_user)
            .field("metrics_enabled", &self.metrics_enabled)
            .finish()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            database_url: None,
            api_keys: Vec::new(),
            dev_user: "admin".to_string(),
            metrics_enabled: true,
        }
    }
}

impl AppConfig {
    /// Read configuration from process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Read configuration through `lookup`, which maps a variable name to
    /// its value. Unset and blank variables take their defaults.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |name: &str| lookup(name).filter(|v| !v.trim().is_empty());
        let defaults = Self::default();

        let port = match get("PORT") {
            Some(raw) => raw
                .trim()
                .parse::<u16>()
                .map_err(|_| ConfigError::InvalidPort(raw))?,
            None => defaults.port,
        };

        let api_keys = match get("LDB_API_KEYS") {
            Some(raw) => parse_api_keys(&raw)?,
            None => Vec::new(),
        };

        let metrics_enabled = match get("LDB_METRICS_ENABLED") {
            Some(raw) => parse_flag("LDB_METRICS_ENABLED", &raw)?,
            None => defaults.metrics_enabled,
        };

        Ok(Self {
            port,
            database_url: get("DATABASE_URL"),
            api_keys,
            dev_user: get("LDB_DEV_USER").unwrap_or(defaults.dev_user),
            metrics_enabled,
        })
    }

    /// Authentication settings derived from this configuration.
    pub fn auth_config(&self) -> AuthConfig {
        AuthConfig {
            api_keys: self.api_keys.clone(),
            dev_user: self.dev_user.clone(),
        }
    }
}

/// Parse a comma-separated list of `username:key` pairs.
fn parse_api_keys(raw: &str) -> Result<Vec<ApiKey>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .enumerate()
        .map(|(index, entry)| match entry.split_once(':') {
            Some((user, key)) if !user.trim().is_empty() && !key.trim().is_empty() => {
                Ok(ApiKey::new(user.trim(), key.trim()))
            }
            _ => Err(ConfigError::InvalidApiKey(index + 1)),
        })
        .collect()
}

fn parse_flag(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" => Ok(true),
        "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidFlag {
            var,
            value: raw.to_string(),
        }),
    }
}

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn ObligationStore>,
    pub config: AppConfig,
    /// Request metrics. `None` leaves `/metrics` unmounted.
    pub metrics: Option<ApiMetrics>,
}

impl std::fmt::Debug for AppState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppState")
            .field("config", &self.config)
            .field("metrics", &self.metrics)
            .finish_non_exhaustive()
    }
}

impl AppState {
    /// In-memory state with default configuration.
    pub fn new() -> Self {
        Self::in_memory(AppConfig::default())
    }

    /// In-memory state with the acting users registered: every API-key
    /// username, or the development user when auth is disabled.
    pub fn in_memory(config: AppConfig) -> Self {
        let store = MemoryStore::new();
        if config.api_keys.is_empty() {
            store.add_user(&config.dev_user);
        }
        for key in &config.api_keys {
            store.add_user(key.username());
        }
        Self::with_store(Arc::new(store), config)
    }

    /// State over an existing store.
    pub fn with_store(store: Arc<dyn ObligationStore>, config: AppConfig) -> Self {
        Self {
            store,
            config,
            metrics: None,
        }
    }

    /// Attach a metrics registry.
    pub fn with_metrics(mut self, metrics: ApiMetrics) -> Self {
        self.metrics = Some(metrics);
        self
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}
