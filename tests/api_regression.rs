//! API Regression Tests
//!
//! In-process tests that build the Axum app via `create_app()` and exercise
//! the /api/v1/* surface using `tower::ServiceExt::oneshot()`.
//! No binary spawn, no network port — runs in CI without `#[ignore]`.

use windward::api::{create_app, ApiContext};
use windward::config::{self, FarmConfig};
use windward::controller::FarmController;
use windward::state::FarmState;
use windward::store::{MemoryStore, Store};

use axum::body::Body;
use axum::http::{Request, StatusCode};
use axum::Router;
use std::sync::Arc;
use tokio::sync::RwLock;
use tower::ServiceExt;

fn ensure_config() {
    if !config::is_initialized() {
        config::init(FarmConfig::default());
    }
}

fn test_context() -> ApiContext {
    ensure_config();
    let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
    let state = Arc::new(RwLock::new(FarmState::new()));
    ApiContext::new(Arc::new(FarmController::new(store, state)))
}

/// App over a demo-seeded farm: six turbines, two substations, six cables.
async fn seeded_app() -> (Router, ApiContext) {
    let ctx = test_context();
    ctx.controller.load_farm().await.unwrap();
    ctx.controller.seed_demo().await.unwrap();
    (create_app(ctx.clone()), ctx)
}

async fn get_json(app: Router, uri: &str) -> (StatusCode, serde_json::Value) {
    let resp = app
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = resp.status();
    let body = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&body).unwrap())
}

async fn send_json(
    app: Router,
    method: &str,
    uri: &str,
    body: serde_json::Value,
) -> (StatusCode, serde_json::Value) {
    let resp = app
        .oneshot(
            Request::builder()
                .method(method)
                .uri(uri)
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    let status = resp.status();
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX).await.unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

/// All read endpoints answer 200 over a seeded farm.
#[tokio::test]
async fn test_get_endpoints_return_200() {
    let (app, _ctx) = seeded_app().await;

    let endpoints = [
        "/api/v1/system/health",
        "/api/v1/farm/summary",
        "/api/v1/farm/events",
        "/api/v1/turbines",
        "/api/v1/turbines/T-01",
        "/api/v1/turbines/T-01/power-history?limit=5",
        "/api/v1/turbines/T-01/health-history",
        "/api/v1/substations",
        "/api/v1/connections",
        "/api/v1/alerts",
    ];

    for endpoint in &endpoints {
        let (status, _) = get_json(app.clone(), endpoint).await;
        assert_eq!(status, StatusCode::OK, "GET {endpoint} returned {status}");
    }
}

/// Success and error responses share the envelope shape.
#[tokio::test]
async fn test_envelope_shape() {
    let (app, _ctx) = seeded_app().await;

    let (status, body) = get_json(app.clone(), "/api/v1/turbines").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"].as_array().unwrap().len(), 6);
    assert_eq!(body["meta"]["version"], "1");

    let (status, body) = get_json(app, "/api/v1/turbines/T-99").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"]["code"], "NOT_FOUND");
    assert!(body["error"]["message"].as_str().unwrap().contains("T-99"));
}

/// Unmatched paths answer an enveloped 404, inside and outside /api.
#[tokio::test]
async fn test_unmatched_routes_keep_the_envelope() {
    let (app, _ctx) = seeded_app().await;

    for uri in ["/api/v1/no-such-thing", "/definitely/not/api"] {
        let (status, body) = get_json(app.clone(), uri).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "GET {uri}");
        assert_eq!(body["error"]["code"], "NOT_FOUND");
    }
}

/// Commission, restatus, and decommission a turbine through the API.
#[tokio::test]
async fn test_turbine_lifecycle_over_http() {
    let (app, _ctx) = seeded_app().await;

    let (status, body) = send_json(
        app.clone(),
        "POST",
        "/api/v1/turbines",
        serde_json::json!({
            "id": "T-10",
            "name": "Charlie 1",
            "position": { "latitude": 55.55, "longitude": 7.97 }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["id"], "T-10");
    assert_eq!(body["data"]["status"], "normal");

    // duplicate id is a client error
    let (status, body) = send_json(
        app.clone(),
        "POST",
        "/api/v1/turbines",
        serde_json::json!({
            "id": "T-10",
            "name": "Charlie clone",
            "position": { "latitude": 55.56, "longitude": 7.98 }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, body) = send_json(
        app.clone(),
        "POST",
        "/api/v1/turbines/T-10/status",
        serde_json::json!({ "status": "warning" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "warning");

    // the status change shows up in the turbine's event log
    let (status, body) = get_json(app.clone(), "/api/v1/turbines/T-10").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["events"][0]["event"], "Status changed to warning");

    let (status, body) = send_json(
        app.clone(),
        "POST",
        "/api/v1/turbines/T-10/position",
        serde_json::json!({ "latitude": 55.60, "longitude": 7.99 }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["position"]["latitude"], 55.60);

    let (status, body) = send_json(
        app.clone(),
        "DELETE",
        "/api/v1/turbines/T-10",
        serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["deleted"], "T-10");

    let (status, _) = get_json(app, "/api/v1/turbines/T-10").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// Cables: create with derived kind, cycle status, reject substation pairs.
#[tokio::test]
async fn test_connection_endpoints() {
    let (app, _ctx) = seeded_app().await;

    let (status, body) = send_json(
        app.clone(),
        "POST",
        "/api/v1/connections",
        serde_json::json!({
            "from": { "type": "turbine", "id": "T-01" },
            "to": { "type": "substation", "id": "S-02" }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["kind"], "turbine-substation");
    let id = body["data"]["id"].as_i64().unwrap();

    let (status, body) = send_json(
        app.clone(),
        "POST",
        &format!("/api/v1/connections/{id}/cycle"),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "warning");

    let (status, body) = send_json(
        app.clone(),
        "POST",
        "/api/v1/connections",
        serde_json::json!({
            "from": { "type": "substation", "id": "S-01" },
            "to": { "type": "substation", "id": "S-02" }
        }),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"]["code"], "BAD_REQUEST");

    let (status, _) = send_json(
        app.clone(),
        "DELETE",
        &format!("/api/v1/connections/{id}"),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    let (status, _) = send_json(
        app,
        "POST",
        &format!("/api/v1/connections/{id}/cycle"),
        serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

/// Evaluation raises an alert for a tripped turbine and the alert walks
/// forward until a completed alert answers 409.
#[tokio::test]
async fn test_evaluate_and_alert_workflow() {
    let (app, _ctx) = seeded_app().await;

    let (status, _) = send_json(
        app.clone(),
        "POST",
        "/api/v1/turbines/T-04/status",
        serde_json::json!({ "status": "error" }),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // error deduction plus low output drops T-04 below the alert line
    let (status, body) = send_json(
        app.clone(),
        "POST",
        "/api/v1/turbines/T-04/evaluate",
        serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["score"], 40);
    assert_eq!(body["data"]["status"], "critical");

    let (status, body) = get_json(app.clone(), "/api/v1/alerts?turbine_id=T-04").await;
    assert_eq!(status, StatusCode::OK);
    let alerts = body["data"].as_array().unwrap();
    assert_eq!(alerts.len(), 1);
    assert_eq!(alerts[0]["status"], "pending");
    assert_eq!(alerts[0]["description"], "Low health score detected: 40");
    let alert_id = alerts[0]["id"].as_i64().unwrap();

    let advance = format!("/api/v1/alerts/{alert_id}/advance");
    let (_, body) = send_json(app.clone(), "POST", &advance, serde_json::json!({})).await;
    assert_eq!(body["data"]["status"], "in_progress");
    let (_, body) = send_json(app.clone(), "POST", &advance, serde_json::json!({})).await;
    assert_eq!(body["data"]["status"], "completed");

    let (status, body) = send_json(app, "POST", &advance, serde_json::json!({})).await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

/// A rapid reselection supersedes the in-flight history load with a 409.
#[tokio::test]
async fn test_rapid_reselection_supersedes_history_load() {
    let (app, _ctx) = seeded_app().await;

    let first = {
        let app = app.clone();
        tokio::spawn(async move {
            get_json(app, "/api/v1/turbines/T-01/power-history").await
        })
    };
    // land the second request inside the first one's debounce window
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;

    let (status, body) = get_json(app, "/api/v1/turbines/T-02/power-history").await;
    assert_eq!(status, StatusCode::OK);
    assert!(!body["data"].as_array().unwrap().is_empty());

    let (status, body) = first.await.unwrap();
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["error"]["code"], "CONFLICT");
}

/// Farm summary counts track API mutations.
#[tokio::test]
async fn test_farm_summary_tracks_mutations() {
    let (app, _ctx) = seeded_app().await;

    let (_, body) = get_json(app.clone(), "/api/v1/farm/summary").await;
    assert_eq!(body["data"]["turbines"], 6);
    assert_eq!(body["data"]["substations"], 2);
    assert_eq!(body["data"]["connections"], 6);
    assert_eq!(body["data"]["status_counts"]["warning"], 1);

    let (status, _) = send_json(
        app.clone(),
        "DELETE",
        "/api/v1/turbines/T-06",
        serde_json::json!({}),
    )
    .await;
    assert_eq!(status, StatusCode::OK);

    // T-06 and its two cables are gone
    let (_, body) = get_json(app, "/api/v1/farm/summary").await;
    assert_eq!(body["data"]["turbines"], 5);
    assert_eq!(body["data"]["connections"], 4);
}

/// System health reflects the loaded farm and the store backend.
#[tokio::test]
async fn test_system_health_reports_backend_and_counts() {
    let (app, _ctx) = seeded_app().await;

    let (status, body) = get_json(app, "/api/v1/system/health").await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["status"], "Monitoring");
    assert_eq!(body["data"]["backend"], "InMemory");
    assert_eq!(body["data"]["turbines"], 6);
    assert!(body["data"]["loaded_at"].is_string());
}
