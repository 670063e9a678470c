//! # Obligations API
//!
//! CRUD over license obligations plus the per-obligation audit trail.
//! Reads are public; creating, patching, deactivating and reading audits
//! require an [`AuthenticatedUser`].

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::{Json, Router};
use ldb_core::{AuditRecord, CreateObligationRequest, Obligation, ObligationPatch, PageRequest};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::auth::AuthenticatedUser;
use crate::error::AppError;
use crate::extractors::{extract_json, extract_path, extract_query};
use crate::pagination::PaginationMeta;
use crate::state::AppState;

const OBLIGATIONS_PATH: &str = "/api/v1/obligations";

/// Success envelope carrying obligations.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ObligationResponse {
    pub status: u16,
    pub data: Vec<Obligation>,
    pub meta: PaginationMeta,
}

/// Success envelope carrying audit records.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AuditResponse {
    pub status: u16,
    pub data: Vec<AuditRecord>,
    pub meta: PaginationMeta,
}

/// Query parameters of the obligation listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListObligationsQuery {
    /// `true` (default) lists active obligations, `false` deactivated ones.
    pub active: Option<String>,
    /// 1-based page number.
    pub page: Option<i64>,
    /// Page size, at most 100.
    pub limit: Option<i64>,
}

/// Pagination query parameters.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Build the obligations router.
pub fn router() -> Router<AppState> {
    Router::new()
        .route(
            "/api/v1/obligations",
            get(list_obligations).post(create_obligation),
        )
        .route(
            "/api/v1/obligations/:topic",
            get(get_obligation)
                .patch(update_obligation)
                .delete(deactivate_obligation),
        )
        .route("/api/v1/obligations/:topic/audits", get(list_obligation_audits))
}

/// Parse the `active` filter. Absent means `true`.
fn parse_active(raw: Option<&str>) -> Result<bool, AppError> {
    match raw {
        None | Some("") => Ok(true),
        Some("1" | "t" | "T" | "true" | "TRUE" | "True") => Ok(true),
        Some("0" | "f" | "F" | "false" | "FALSE" | "False") => Ok(false),
        Some(other) => Err(AppError::bad_request(
            "Invalid active value",
            format!("Parsing failed for value '{other}'"),
        )),
    }
}

/// Link base of a topic's audit listing, with the topic percent-encoded.
fn audits_path(topic: &str) -> String {
    format!("{OBLIGATIONS_PATH}/{}/audits", urlencoding::encode(topic))
}

fn single(status: StatusCode, obligation: Obligation) -> ObligationResponse {
    ObligationResponse {
        status: status.as_u16(),
        data: vec![obligation],
        meta: PaginationMeta::single(1),
    }
}

/// GET /api/v1/obligations: List obligations by active flag.
#[utoipa::path(
    get,
    path = "/api/v1/obligations",
    params(ListObligationsQuery),
    responses(
        (status = 200, description = "Page of obligations", body = ObligationResponse),
        (status = 400, description = "Invalid active value", body = crate::error::ErrorBody),
        (status = 404, description = "Obligations could not be queried", body = crate::error::ErrorBody),
    ),
    tag = "obligations"
)]
async fn list_obligations(
    State(state): State<AppState>,
    query: Result<Query<ListObligationsQuery>, QueryRejection>,
) -> Result<Json<ObligationResponse>, AppError> {
    let query = extract_query(query)?;
    let active = parse_active(query.active.as_deref())?;
    let page = PageRequest::new(query.page, query.limit);

    let result = state.store.list(active, page).await?;
    let meta = PaginationMeta::paged(
        OBLIGATIONS_PATH,
        &[("active", active.to_string())],
        page,
        result.items.len() as u64,
        result.total,
    );

    Ok(Json(ObligationResponse {
        status: StatusCode::OK.as_u16(),
        data: result.items,
        meta,
    }))
}

/// GET /api/v1/obligations/:topic: Fetch one obligation.
#[utoipa::path(
    get,
    path = "/api/v1/obligations/{topic}",
    params(("topic" = String, Path, description = "Topic of the obligation")),
    responses(
        (status = 200, description = "Obligation found", body = ObligationResponse),
        (status = 404, description = "No obligation with given topic", body = crate::error::ErrorBody),
    ),
    tag = "obligations"
)]
async fn get_obligation(
    State(state): State<AppState>,
    topic: Result<Path<String>, PathRejection>,
) -> Result<Json<ObligationResponse>, AppError> {
    let topic = extract_path(topic)?;
    let obligation = state.store.get_by_topic(&topic).await?;
    Ok(Json(single(StatusCode::OK, obligation)))
}

/// POST /api/v1/obligations: Create an obligation and link its licenses.
#[utoipa::path(
    post,
    path = "/api/v1/obligations",
    request_body = CreateObligationRequest,
    responses(
        (status = 201, description = "Obligation created", body = ObligationResponse),
        (status = 400, description = "Bad request body", body = crate::error::ErrorBody),
        (status = 401, description = "Missing or invalid API key", body = crate::error::ErrorBody),
        (status = 409, description = "Obligation with same topic or text exists", body = crate::error::ErrorBody),
    ),
    security(("api_key" = [])),
    tag = "obligations"
)]
async fn create_obligation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    body: Result<Json<CreateObligationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<ObligationResponse>), AppError> {
    let request = extract_json(body)?;
    let new = request.into_new()?;
    let created = state.store.create(new).await?;

    tracing::info!(
        topic = %created.topic,
        username = %user.username,
        "obligation created"
    );

    Ok((
        StatusCode::CREATED,
        Json(single(StatusCode::CREATED, created)),
    ))
}

/// PATCH /api/v1/obligations/:topic: Sparse update with change audit.
#[utoipa::path(
    patch,
    path = "/api/v1/obligations/{topic}",
    params(("topic" = String, Path, description = "Topic of the obligation to update")),
    request_body = ObligationPatch,
    responses(
        (status = 200, description = "Obligation updated", body = ObligationResponse),
        (status = 400, description = "Invalid request", body = crate::error::ErrorBody),
        (status = 401, description = "Missing or invalid API key", body = crate::error::ErrorBody),
        (status = 404, description = "No obligation with given topic", body = crate::error::ErrorBody),
        (status = 409, description = "Text collides with another obligation", body = crate::error::ErrorBody),
        (status = 500, description = "Unable to update obligation", body = crate::error::ErrorBody),
    ),
    security(("api_key" = [])),
    tag = "obligations"
)]
async fn update_obligation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    topic: Result<Path<String>, PathRejection>,
    body: Result<Json<ObligationPatch>, JsonRejection>,
) -> Result<Json<ObligationResponse>, AppError> {
    let topic = extract_path(topic)?;
    // Unknown topics are reported before the body is decoded.
    state.store.get_by_topic(&topic).await?;
    let patch = extract_json(body)?;
    let updated = state.store.update(&topic, &patch, &user.username).await?;
    Ok(Json(single(StatusCode::OK, updated)))
}

/// DELETE /api/v1/obligations/:topic: Deactivate (soft delete).
#[utoipa::path(
    delete,
    path = "/api/v1/obligations/{topic}",
    params(("topic" = String, Path, description = "Topic of the obligation to deactivate")),
    responses(
        (status = 204, description = "Obligation deactivated"),
        (status = 401, description = "Missing or invalid API key", body = crate::error::ErrorBody),
        (status = 404, description = "No obligation with given topic", body = crate::error::ErrorBody),
    ),
    security(("api_key" = [])),
    tag = "obligations"
)]
async fn deactivate_obligation(
    State(state): State<AppState>,
    user: AuthenticatedUser,
    topic: Result<Path<String>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let topic = extract_path(topic)?;
    state.store.deactivate(&topic).await?;
    tracing::info!(topic = %topic, username = %user.username, "obligation deactivated");
    Ok(StatusCode::NO_CONTENT)
}

/// GET /api/v1/obligations/:topic/audits: Change history, newest first.
#[utoipa::path(
    get,
    path = "/api/v1/obligations/{topic}/audits",
    params(
        ("topic" = String, Path, description = "Topic of the obligation"),
        PageQuery,
    ),
    responses(
        (status = 200, description = "Page of audit records", body = AuditResponse),
        (status = 401, description = "Missing or invalid API key", body = crate::error::ErrorBody),
        (status = 404, description = "No obligation with given topic", body = crate::error::ErrorBody),
        (status = 500, description = "Audits could not be queried", body = crate::error::ErrorBody),
    ),
    security(("api_key" = [])),
    tag = "obligations"
)]
async fn list_obligation_audits(
    State(state): State<AppState>,
    _user: AuthenticatedUser,
    topic: Result<Path<String>, PathRejection>,
    query: Result<Query<PageQuery>, QueryRejection>,
) -> Result<Json<AuditResponse>, AppError> {
    let topic = extract_path(topic)?;
    let query = extract_query(query)?;
    let page = PageRequest::new(query.page, query.limit);

    let result = state.store.list_audits(&topic, page).await?;
    let meta = PaginationMeta::paged(
        &audits_path(&topic),
        &[],
        page,
        result.items.len() as u64,
        result.total,
    );

    Ok(Json(AuditResponse {
        status: StatusCode::OK.as_u16(),
        data: result.items,
        meta,
    }))
}
