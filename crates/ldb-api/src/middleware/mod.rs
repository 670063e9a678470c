//! # Middleware Stack
//!
//! Tower middleware for the API layer:
//! - [`envelope`]: stamps the request path into error envelopes.
//! - [`metrics`]: Prometheus request metrics labelled by matched route.
//!
//! Authentication lives in [`crate::auth`]. Per-request tracing uses
//! `tower_http::trace::TraceLayer` directly in [`crate::app`].

pub mod envelope;
pub mod metrics;
