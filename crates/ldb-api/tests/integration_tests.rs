//! # Integration Tests for ldb-api
//!
//! Drive the full router over the in-memory store: obligation CRUD, patch
//! policy and audit recording, soft delete, pagination metadata, the error
//! envelope, authentication, health probes, metrics and the OpenAPI document.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use http_body_util::BodyExt;
use serde_json::{json, Value};
use tower::ServiceExt;

use ldb_api::auth::ApiKey;
use ldb_api::middleware::metrics::ApiMetrics;
use ldb_api::state::{AppConfig, AppState};
use ldb_api::store::MemoryStore;

const OBLIGATIONS: &str = "/api/v1/obligations";

/// Helper: app with auth disabled over a shared store with one license.
fn test_app() -> (axum::Router, MemoryStore) {
    let store = MemoryStore::new().with_user("admin").with_license("MIT");
    let state = AppState::with_store(Arc::new(store.clone()), AppConfig::default());
    (ldb_api::app(state), store)
}

/// Helper: app with API keys for alice and bob.
fn test_app_with_auth() -> (axum::Router, MemoryStore) {
    let store = MemoryStore::new().with_user("alice").with_user("bob");
    let config = AppConfig {
        api_keys: vec![ApiKey::new("alice", "k-alice"), ApiKey::new("bob", "k-bob")],
        ..AppConfig::default()
    };
    let state = AppState::with_store(Arc::new(store.clone()), config);
    (ldb_api::app(state), store)
}

/// Helper: send a request and decode the JSON body (`Null` when empty).
async fn send(
    app: &axum::Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
    api_key: Option<&str>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(key) = api_key {
        builder = builder.header("Authorization", format!("Bearer {key}"));
    }
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };
    (status, value)
}

fn obligation(topic: &str, text: &str) -> Value {
    json!({
        "topic": topic,
        "type": "obligation",
        "text": text,
        "classification": "green",
        "comment": "initial",
        "modifications": false,
        "active": true,
        "shortnames": ["MIT", "Unknown-1.0"]
    })
}

async fn create(app: &axum::Router, topic: &str, text: &str) -> Value {
    let (status, body) = send(app, Method::POST, OBLIGATIONS, Some(obligation(topic, text)), None).await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {body}");
    body
}

async fn patch(app: &axum::Router, topic: &str, body: Value) -> (StatusCode, Value) {
    send(app, Method::PATCH, &format!("{OBLIGATIONS}/{topic}"), Some(body), None).await
}

async fn audits(app: &axum::Router, topic: &str) -> Value {
    let (status, body) = send(app, Method::GET, &format!("{OBLIGATIONS}/{topic}/audits"), None, None).await;
    assert_eq!(status, StatusCode::OK, "audits failed: {body}");
    body
}

// -- Health, Metrics, OpenAPI -------------------------------------------------

#[tokio::test]
async fn test_health_probes() {
    let (app, _) = test_app();
    let (status, body) = send(&app, Method::GET, "/health/liveness", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ok");

    let (status, body) = send(&app, Method::GET, "/health/readiness", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "ready");
}

#[tokio::test]
async fn test_openapi_json_served() {
    let (app, _) = test_app();
    let (status, body) = send(&app, Method::GET, "/openapi.json", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["paths"]["/api/v1/obligations/{topic}/audits"].is_object());
}

#[tokio::test]
async fn test_metrics_labelled_by_route_template() {
    let metrics = ApiMetrics::try_new().unwrap();
    let state = AppState::in_memory(AppConfig::default()).with_metrics(metrics.clone());
    let app = ldb_api::app(state);

    send(&app, Method::GET, "/api/v1/obligations/some-topic", None, None).await;
    assert_eq!(metrics.requests(), 1);
    assert_eq!(metrics.errors(), 1);

    let (status, body) = send(&app, Method::GET, "/metrics", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let text = body.as_str().unwrap();
    assert!(text.contains(r#"path="/api/v1/obligations/:topic""#));
    assert!(!text.contains("some-topic"));
}

#[tokio::test]
async fn test_metrics_unmounted_when_disabled() {
    let (app, _) = test_app();
    let (status, _) = send(&app, Method::GET, "/metrics", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

// -- Create -------------------------------------------------------------------

#[tokio::test]
async fn test_create_returns_envelope() {
    let (app, store) = test_app();
    let body = create(&app, "attribution", "Keep the copyright notice.").await;

    assert_eq!(body["status"], 201);
    assert_eq!(body["meta"], json!({"resource_count": 1}));
    let item = &body["data"][0];
    assert_eq!(item["topic"], "attribution");
    assert_eq!(item["type"], "obligation");
    assert_eq!(item["comment"], "initial");
    assert_eq!(item["text_updatable"], false);
    assert!(item.get("id").is_none());
    assert_eq!(store.linked_licenses("attribution"), vec!["MIT".to_string()]);
}

#[tokio::test]
async fn test_create_duplicate_topic_conflicts() {
    let (app, store) = test_app();
    create(&app, "attribution", "Keep the copyright notice.").await;

    let (status, body) = send(
        &app,
        Method::POST,
        OBLIGATIONS,
        Some(obligation("attribution", "Completely different text")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["message"], "can not create obligation with same topic or text");
    assert_eq!(body["error"], "CONFLICT");
    assert_eq!(body["path"], OBLIGATIONS);
    assert_eq!(
        body["details"],
        "Obligation with topic 'attribution' or Text 'Completely...' already exists"
    );
    assert_eq!(store.obligation_count(), 1);
}

#[tokio::test]
async fn test_create_duplicate_text_conflicts() {
    let (app, store) = test_app();
    create(&app, "attribution", "Keep the copyright notice.").await;

    let (status, _) = send(
        &app,
        Method::POST,
        OBLIGATIONS,
        Some(obligation("other-topic", "Keep the copyright notice.")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(store.obligation_count(), 1);
}

#[tokio::test]
async fn test_create_rejects_bad_bodies() {
    let (app, _) = test_app();

    let (status, body) = send(&app, Method::POST, OBLIGATIONS, Some(json!({"topic": "x"})), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BAD_REQUEST");
    assert_eq!(body["message"], "invalid json body");

    let mut blank = obligation("blank", "some text");
    blank["classification"] = json!("  ");
    let (status, body) = send(&app, Method::POST, OBLIGATIONS, Some(blank), None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
}

// -- Read ---------------------------------------------------------------------

#[tokio::test]
async fn test_get_by_topic() {
    let (app, _) = test_app();
    create(&app, "attribution", "Keep the copyright notice.").await;

    let (status, body) = send(&app, Method::GET, "/api/v1/obligations/attribution", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["text"], "Keep the copyright notice.");
}

#[tokio::test]
async fn test_get_unknown_topic_is_404_with_path() {
    let (app, _) = test_app();
    let (status, body) = send(&app, Method::GET, "/api/v1/obligations/missing", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["status"], 404);
    assert_eq!(body["error"], "NOT_FOUND");
    assert_eq!(body["message"], "obligation with topic 'missing' not found");
    assert_eq!(body["path"], "/api/v1/obligations/missing");
    assert!(body["timestamp"].as_str().unwrap().ends_with('Z'));
}

#[tokio::test]
async fn test_list_defaults_to_active_and_paginates() {
    let (app, _) = test_app();
    for i in 0..5 {
        create(&app, &format!("topic-{i}"), &format!("obligation text number {i}")).await;
    }
    send(&app, Method::DELETE, "/api/v1/obligations/topic-0", None, None).await;

    let (status, body) = send(&app, Method::GET, "/api/v1/obligations?page=1&limit=3", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 3);
    assert_eq!(body["data"][0]["topic"], "topic-1");
    assert_eq!(body["meta"]["resource_count"], 3);
    assert_eq!(body["meta"]["total_pages"], 2);
    assert_eq!(body["meta"]["next"], "/api/v1/obligations?active=true&page=2&limit=3");
    assert!(body["meta"].get("previous").is_none());

    let (_, body) = send(&app, Method::GET, "/api/v1/obligations?active=false", None, None).await;
    let topics: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|o| o["topic"].as_str().unwrap())
        .collect();
    assert_eq!(topics, ["topic-0"]);
}

#[tokio::test]
async fn test_list_empty_is_ok() {
    let (app, _) = test_app();
    let (status, body) = send(&app, Method::GET, OBLIGATIONS, None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
    assert_eq!(body["meta"]["resource_count"], 0);
}

#[tokio::test]
async fn test_list_invalid_active_is_400() {
    let (app, _) = test_app();
    let (status, body) = send(&app, Method::GET, "/api/v1/obligations?active=maybe", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Invalid active value");
    assert_eq!(body["path"], OBLIGATIONS);
}

// -- Update & Audit -----------------------------------------------------------

#[tokio::test]
async fn test_patch_active_writes_single_audit_entry() {
    let (app, store) = test_app();
    create(&app, "attribution", "Keep the copyright notice.").await;

    let (status, body) = patch(&app, "attribution", json!({"active": false})).await;
    assert_eq!(status, StatusCode::OK);
    let item = &body["data"][0];
    assert_eq!(item["active"], false);
    assert_eq!(item["text"], "Keep the copyright notice.");

    let body = audits(&app, "attribution").await;
    assert_eq!(body["data"].as_array().unwrap().len(), 1);
    let audit = &body["data"][0];
    assert_eq!(audit["type"], "Obligation");
    assert_eq!(
        audit["change_logs"],
        json!([{"field": "Active", "old_value": "true", "updated_value": "false"}])
    );
    assert_eq!(store.audit_count(), 1);
}

#[tokio::test]
async fn test_patch_text_on_locked_obligation_rejected() {
    let (app, store) = test_app();
    create(&app, "attribution", "Keep the copyright notice.").await;

    let (status, body) = patch(
        &app,
        "attribution",
        json!({"text": "Rewritten text", "classification": "red"}),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Can not update obligation text");
    assert_eq!(body["path"], "/api/v1/obligations/attribution");

    let (_, body) = send(&app, Method::GET, "/api/v1/obligations/attribution", None, None).await;
    assert_eq!(body["data"][0]["text"], "Keep the copyright notice.");
    assert_eq!(body["data"][0]["classification"], "green");
    assert_eq!(store.audit_count(), 0);
}

#[tokio::test]
async fn test_patch_text_after_unlocking() {
    let (app, _) = test_app();
    create(&app, "attribution", "Keep the copyright notice.").await;

    let (status, _) = patch(&app, "attribution", json!({"text_updatable": true})).await;
    assert_eq!(status, StatusCode::OK);
    let (status, body) = patch(&app, "attribution", json!({"text": "Rewritten text"})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["text"], "Rewritten text");

    let body = audits(&app, "attribution").await;
    let newest = &body["data"][0]["change_logs"][0];
    assert_eq!(newest["field"], "Text");
    assert_eq!(newest["old_value"], "Keep the copyright notice.");
    assert_eq!(newest["updated_value"], "Rewritten text");
}

#[tokio::test]
async fn test_identical_patch_writes_no_audit() {
    let (app, store) = test_app();
    create(&app, "attribution", "Keep the copyright notice.").await;

    let (status, _) = patch(
        &app,
        "attribution",
        json!({
            "text": "Keep the copyright notice.",
            "type": "obligation",
            "classification": "green",
            "comment": "initial",
            "active": true
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(store.audit_count(), 0);
}

#[tokio::test]
async fn test_patch_comment_null_clears() {
    let (app, _) = test_app();
    create(&app, "attribution", "Keep the copyright notice.").await;

    let (status, body) = patch(&app, "attribution", json!({"comment": null})).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["comment"], Value::Null);

    let body = audits(&app, "attribution").await;
    assert_eq!(
        body["data"][0]["change_logs"],
        json!([{"field": "Comment", "old_value": "initial", "updated_value": null}])
    );
}

#[tokio::test]
async fn test_patch_null_for_non_nullable_field_is_400() {
    let (app, store) = test_app();
    create(&app, "attribution", "Keep the copyright notice.").await;

    let (status, body) = patch(&app, "attribution", json!({"active": null})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BAD_REQUEST");
    assert_eq!(store.audit_count(), 0);
}

#[tokio::test]
async fn test_patch_empty_type_is_validation_error() {
    let (app, _) = test_app();
    create(&app, "attribution", "Keep the copyright notice.").await;

    let (status, body) = patch(&app, "attribution", json!({"type": ""})).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "VALIDATION_ERROR");
    assert_eq!(body["message"], "Type cannot be an empty string");
}

#[tokio::test]
async fn test_patch_unknown_topic_is_404() {
    let (app, _) = test_app();
    let (status, _) = patch(&app, "missing", json!({"active": false})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_patch_unknown_topic_is_404_before_body_decoding() {
    let (app, _) = test_app();
    let (status, body) = patch(&app, "missing", json!({"active": "nope"})).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
}

#[tokio::test]
async fn test_malformed_topic_uses_error_envelope() {
    let (app, _) = test_app();
    let (status, body) = send(&app, Method::GET, "/api/v1/obligations/%FF", None, None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "BAD_REQUEST");
    assert_eq!(body["message"], "invalid path parameters");
    assert_eq!(body["status"], 400);
}

#[tokio::test]
async fn test_audit_links_encode_topic() {
    let (app, _) = test_app();
    create(&app, "a b&c", "spaced topic").await;
    for active in [false, true] {
        let (status, body) = send(
            &app,
            Method::PATCH,
            "/api/v1/obligations/a%20b%26c",
            Some(json!({"active": active})),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK, "patch failed: {body}");
    }

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/v1/obligations/a%20b%26c/audits?page=1&limit=1",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body["meta"]["next"],
        "/api/v1/obligations/a%20b%26c/audits?page=2&limit=1"
    );
}

#[tokio::test]
async fn test_audits_for_unknown_topic_is_404() {
    let (app, _) = test_app();
    let (status, _) = send(&app, Method::GET, "/api/v1/obligations/missing/audits", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_audits_paginate_newest_first() {
    let (app, _) = test_app();
    create(&app, "attribution", "Keep the copyright notice.").await;
    patch(&app, "attribution", json!({"modifications": true})).await;
    patch(&app, "attribution", json!({"classification": "yellow"})).await;
    patch(&app, "attribution", json!({"active": false})).await;

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/v1/obligations/attribution/audits?page=1&limit=2",
        None,
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let fields: Vec<&str> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|a| a["change_logs"][0]["field"].as_str().unwrap())
        .collect();
    assert_eq!(fields, ["Active", "Classification"]);
    assert_eq!(body["meta"]["total_pages"], 2);
    assert_eq!(
        body["meta"]["next"],
        "/api/v1/obligations/attribution/audits?page=2&limit=2"
    );
}

// -- Deactivate ---------------------------------------------------------------

#[tokio::test]
async fn test_deactivate_is_idempotent() {
    let (app, store) = test_app();
    create(&app, "attribution", "Keep the copyright notice.").await;

    let (status, body) = send(&app, Method::DELETE, "/api/v1/obligations/attribution", None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, Value::Null);
    let (_, first) = send(&app, Method::GET, "/api/v1/obligations/attribution", None, None).await;

    let (status, _) = send(&app, Method::DELETE, "/api/v1/obligations/attribution", None, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    let (_, second) = send(&app, Method::GET, "/api/v1/obligations/attribution", None, None).await;

    assert_eq!(first["data"][0]["active"], false);
    assert_eq!(first["data"], second["data"]);
    assert_eq!(store.obligation_count(), 1);
}

#[tokio::test]
async fn test_deactivate_unknown_topic_is_404() {
    let (app, _) = test_app();
    let (status, body) = send(&app, Method::DELETE, "/api/v1/obligations/missing", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["path"], "/api/v1/obligations/missing");
}

// -- Authentication -----------------------------------------------------------

#[tokio::test]
async fn test_reads_are_public_when_auth_enabled() {
    let (app, _) = test_app_with_auth();
    let (status, _) = send(&app, Method::GET, OBLIGATIONS, None, None).await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_mutations_require_api_key() {
    let (app, store) = test_app_with_auth();

    let (status, body) = send(
        &app,
        Method::POST,
        OBLIGATIONS,
        Some(obligation("attribution", "Keep the copyright notice.")),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "UNAUTHORIZED");
    assert_eq!(body["path"], OBLIGATIONS);
    assert_eq!(store.obligation_count(), 0);

    let (status, _) = send(
        &app,
        Method::POST,
        OBLIGATIONS,
        Some(obligation("attribution", "Keep the copyright notice.")),
        Some("wrong-key"),
    )
    .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::DELETE, "/api/v1/obligations/attribution", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = send(&app, Method::GET, "/api/v1/obligations/attribution/audits", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_audit_records_acting_user() {
    let (app, _) = test_app_with_auth();
    let (status, _) = send(
        &app,
        Method::POST,
        OBLIGATIONS,
        Some(obligation("attribution", "Keep the copyright notice.")),
        Some("k-alice"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, _) = send(
        &app,
        Method::PATCH,
        "/api/v1/obligations/attribution",
        Some(json!({"modifications": true})),
        Some("k-bob"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, bob_audits) = send(
        &app,
        Method::GET,
        "/api/v1/obligations/attribution/audits",
        None,
        Some("k-alice"),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    // alice was registered first, then bob.
    assert_eq!(bob_audits["data"][0]["user_id"], 2);
}

#[tokio::test]
async fn test_unknown_route_uses_error_envelope() {
    let (app, _) = test_app();
    let (status, body) = send(&app, Method::GET, "/api/v1/nothing-here", None, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "NOT_FOUND");
    assert_eq!(body["path"], "/api/v1/nothing-here");
}

#[tokio::test]
async fn test_in_memory_state_registers_key_users() {
    let config = AppConfig {
        api_keys: vec![ApiKey::new("alice", "k-alice")],
        ..AppConfig::default()
    };
    let app = ldb_api::app(AppState::in_memory(config));

    let (status, body) = send(
        &app,
        Method::POST,
        OBLIGATIONS,
        Some(obligation("T1", "keyed user text")),
        Some("k-alice"),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "create failed: {body}");

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("{OBLIGATIONS}/T1"),
        Some(json!({"active": false})),
        Some("k-alice"),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "patch failed: {body}");
    assert_eq!(body["data"][0]["active"], false);
}
