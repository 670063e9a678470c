//! # Authentication Middleware
//!
//! API-key bearer authentication for mutating and audit routes.
//!
//! ## Token Format
//!
//! ```text
//! Authorization: Bearer {api-key}
//! ```
//!
//! Keys are configured as `username:key` pairs (`LDB_API_KEYS`). The
//! username bound to the matching key becomes the [`AuthenticatedUser`]
//! and is recorded as the author of audit records.
//!
//! ## Flow
//!
//! [`auth_middleware`] runs on every request. A request carrying a valid key
//! gets an [`AuthenticatedUser`] injected into its extensions; an invalid
//! key or scheme is rejected with 401 immediately. A request without an
//! `Authorization` header passes through unauthenticated, so public reads
//! keep working; handlers that need a user take the [`AuthenticatedUser`]
//! extractor, which rejects with 401 when no identity is present.
//!
//! With no keys configured, authentication is disabled and every request
//! acts as the configured development user.

use axum::extract::Request;
use axum::http::header;
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use subtle::ConstantTimeEq;

use crate::error::AppError;

// ── Keys ────────────────────────────────────────────────────────────────────

/// One configured API key and the user it authenticates.
///
/// Custom `Debug` redacts the key value.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiKey {
    username: String,
    key: String,
}

impl ApiKey {
    pub fn new(username: impl Into<String>, key: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            key: key.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    /// Constant-time check of a presented key.
    pub fn matches(&self, provided: &str) -> bool {
        constant_time_token_eq(provided, &self.key)
    }
}

impl std::fmt::Debug for ApiKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKey")
            .field("username", &self.username)
            .field("key", &"[REDACTED]")
            .finish()
    }
}

/// Auth configuration injected into request extensions.
#[derive(Debug, Clone, Default)]
pub struct AuthConfig {
    pub api_keys: Vec<ApiKey>,
    pub dev_user: String,
}

impl AuthConfig {
    pub fn is_enabled(&self) -> bool {
        !self.api_keys.is_empty()
    }

    /// Username bound to `provided`, if any key matches.
    ///
    /// Every configured key is compared so timing does not depend on which
    /// entry matched.
    pub fn authenticate(&self, provided: &str) -> Option<&str> {
        let mut found = None;
        for key in &self.api_keys {
            if key.matches(provided) && found.is_none() {
                found = Some(key.username());
            }
        }
        found
    }
}

/// Constant-time comparison of bearer tokens.
///
/// When lengths differ, performs a dummy comparison to avoid leaking length
/// information through timing variance.
fn constant_time_token_eq(provided: &str, expected: &str) -> bool {
    let provided = provided.as_bytes();
    let expected = expected.as_bytes();
    if provided.len() != expected.len() {
        let _ = expected.ct_eq(expected);
        return false;
    }
    provided.ct_eq(expected).into()
}

// ── AuthenticatedUser ───────────────────────────────────────────────────────

/// The user on whose behalf a request acts.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuthenticatedUser {
    pub username: String,
}

/// Extracts the identity that [`auth_middleware`] injected into extensions.
/// Returns 401 if no identity is present.
#[axum::async_trait]
impl<S: Send + Sync> axum::extract::FromRequestParts<S> for AuthenticatedUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthenticatedUser>()
            .cloned()
            .ok_or_else(|| AppError::Unauthorized("missing authorization header".into()))
    }
}

// ── Middleware ───────────────────────────────────────────────────────────────

/// Validate the Bearer key, if any, and inject the [`AuthenticatedUser`].
pub async fn auth_middleware(mut request: Request, next: Next) -> Response {
    let config = request
        .extensions()
        .get::<AuthConfig>()
        .cloned()
        .unwrap_or_default();

    if !config.is_enabled() {
        if !config.dev_user.is_empty() {
            request.extensions_mut().insert(AuthenticatedUser {
                username: config.dev_user.clone(),
            });
        }
        return next.run(request).await;
    }

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .map(|v| v.to_str().unwrap_or_default().to_string());

    match auth_header {
        None => next.run(request).await,
        Some(value) => match value.strip_prefix("Bearer ") {
            Some(provided) => match config.authenticate(provided.trim()) {
                Some(username) => {
                    tracing::debug!(username, "request authenticated");
                    request.extensions_mut().insert(AuthenticatedUser {
                        username: username.to_string(),
                    });
                    next.run(request).await
                }
                None => {
                    tracing::warn!("authentication failed: invalid api key");
                    AppError::Unauthorized("invalid api key".into()).into_response()
                }
            },
            None => {
                tracing::warn!("authentication failed: non-Bearer authorization scheme");
                AppError::Unauthorized("authorization header must use Bearer scheme".into())
                    .into_response()
            }
        },
    }
}
