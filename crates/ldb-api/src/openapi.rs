//! # OpenAPI Document Assembly
//!
//! Assembles the utoipa-documented routes into one OpenAPI document served
//! at `/openapi.json`.

use axum::routing::get;
use axum::{Json, Router};
use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::state::AppState;

/// Adds the API-key bearer security scheme.
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "api_key",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .description(Some(
                            "API key authentication. Keys are configured via LDB_API_KEYS.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "LicenseDB Obligations API",
        version = "0.1.0",
        description = "CRUD over license obligations with a field-level change audit.\n\nReads are public. Creating, updating, deactivating and reading audits require `Authorization: Bearer <api-key>`. Health probes (`/health/*`) and `/metrics` are unauthenticated.",
        license(name = "GPL-2.0-only")
    ),
    servers(
        (url = "http://localhost:8080", description = "Local development server"),
    ),
    paths(
        crate::routes::obligations::list_obligations,
        crate::routes::obligations::get_obligation,
        crate::routes::obligations::create_obligation,
        crate::routes::obligations::update_obligation,
        crate::routes::obligations::deactivate_obligation,
        crate::routes::obligations::list_obligation_audits,
    ),
    components(
        schemas(
            ldb_core::Obligation,
            ldb_core::CreateObligationRequest,
            ldb_core::ObligationPatch,
            ldb_core::AuditRecord,
            ldb_core::ChangeLogEntry,
            crate::routes::obligations::ObligationResponse,
            crate::routes::obligations::AuditResponse,
            crate::pagination::PaginationMeta,
            crate::error::ErrorBody,
        ),
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "obligations", description = "License obligations and their change audit"),
    )
)]
pub struct ApiDoc;

/// Serve the OpenAPI JSON document at `/openapi.json`.
pub fn router() -> Router<AppState> {
    Router::new().route("/openapi.json", get(openapi_json))
}

async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}
