//! Error envelope path stamping.
//!
//! Handlers and extractors return [`AppError`](crate::error::AppError)
//! without knowing the request path. [`AppError`]'s `IntoResponse` attaches
//! the rendered [`ErrorBody`] as a response extension; this middleware
//! fills in `path` and re-encodes the body.

use axum::body::Body;
use axum::extract::Request;
use axum::http::header;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::ErrorBody;

/// Stamp the request path into error envelopes produced downstream.
pub async fn error_envelope_middleware(request: Request, next: Next) -> Response {
    let path = request.uri().path().to_string();

    let mut response = next.run(request).await;

    let Some(mut body) = response.extensions_mut().remove::<ErrorBody>() else {
        return response;
    };
    body.path = path;

    let bytes = match serde_json::to_vec(&body) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::error!(error = %err, "failed to re-encode error envelope");
            return response;
        }
    };

    let (mut parts, _) = response.into_parts();
    parts.headers.remove(header::CONTENT_LENGTH);
    Response::from_parts(parts, Body::from(bytes))
}
