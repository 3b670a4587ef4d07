//! API handlers — consistent envelope, typed responses, ISO-8601 timestamps.
//!
//! All handlers return `Response` via [`ApiResponse::ok`] or
//! [`ApiErrorResponse`]. Mutations go through the [`FarmController`]; plain
//! reads come straight from the shared in-memory view.

use std::sync::Arc;
use std::time::Duration;

use axum::extract::{Path, Query, State};
use axum::response::Response;
use axum::Json;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::envelope::{ApiErrorResponse, ApiResponse};
use crate::config;
use crate::controller::{ControllerError, FarmController};
use crate::history::{HistoryError, HistoryLoader};
use crate::state::FarmState;
use crate::types::{AssetRef, AssetStatus, Position, Turbine, TurbineEvent};

// ============================================================================
// API State
// ============================================================================

/// Shared state for API handlers
#[derive(Clone)]
pub struct ApiContext {
    /// Every mutation goes through the controller
    pub controller: Arc<FarmController>,
    /// Live in-memory view for read endpoints
    pub state: Arc<RwLock<FarmState>>,
    /// Debounced history reader backing the chart panels
    pub history: Arc<HistoryLoader>,
}

impl ApiContext {
    pub fn new(controller: Arc<FarmController>) -> Self {
        let state = controller.state();
        let history = Arc::new(HistoryLoader::new(controller.store()));
        Self {
            controller,
            state,
            history,
        }
    }
}

// ============================================================================
// Response types
// ============================================================================

/// Service-level report for `/api/v1/system/health`.
#[derive(Debug, Serialize)]
pub struct SystemHealthResponse {
    pub status: String,
    pub farm: String,
    pub backend: &'static str,
    pub version: &'static str,
    pub uptime_secs: u64,
    pub loaded_at: Option<DateTime<Utc>>,
    pub turbines: usize,
    pub substations: usize,
    pub connections: usize,
}

/// Selected-turbine panel: the current record plus its event log.
#[derive(Debug, Serialize)]
pub struct TurbineDetailResponse {
    pub turbine: Turbine,
    pub events: Vec<TurbineEvent>,
}

// ============================================================================
// Request types
// ============================================================================

#[derive(Debug, Deserialize)]
pub struct CreateTurbineRequest {
    /// Generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub position: Position,
}

#[derive(Debug, Deserialize)]
pub struct CreateSubstationRequest {
    /// Generated when absent.
    #[serde(default)]
    pub id: Option<String>,
    pub name: String,
    pub position: Position,
    /// Rated capacity in MW.
    #[serde(default = "default_substation_capacity")]
    pub capacity: f64,
}

fn default_substation_capacity() -> f64 {
    60.0
}

#[derive(Debug, Deserialize)]
pub struct StatusRequest {
    pub status: AssetStatus,
}

#[derive(Debug, Deserialize)]
pub struct ConnectRequest {
    pub from: AssetRef,
    pub to: AssetRef,
}

#[derive(Debug, Deserialize)]
pub struct LimitQuery {
    #[serde(default)]
    pub limit: Option<u32>,
}

#[derive(Debug, Deserialize)]
pub struct AlertsQuery {
    #[serde(default)]
    pub turbine_id: Option<String>,
}

// ============================================================================
// Error mapping
// ============================================================================

/// Map controller failures onto the error envelope.
fn controller_error(err: ControllerError) -> Response {
    match &err {
        ControllerError::TurbineNotFound(_)
        | ControllerError::SubstationNotFound(_)
        | ControllerError::ConnectionNotFound(_)
        | ControllerError::AlertNotFound(_) => ApiErrorResponse::not_found(err.to_string()),
        ControllerError::DuplicateId(_) | ControllerError::InvalidConnection(_) => {
            ApiErrorResponse::bad_request(err.to_string())
        }
        ControllerError::AlertCompleted(_) => ApiErrorResponse::conflict(err.to_string()),
        ControllerError::Store(e) => ApiErrorResponse::internal(format!("Storage error: {e}")),
    }
}

/// Map history loader failures onto the error envelope.
///
/// A superseded load answers 409 so the client knows to drop the response
/// rather than render stale rows.
fn history_error(err: HistoryError) -> Response {
    match &err {
        HistoryError::Superseded => ApiErrorResponse::conflict(err.to_string()),
        HistoryError::Store(e) => ApiErrorResponse::internal(format!("Storage error: {e}")),
    }
}

// ============================================================================
// System
// ============================================================================

/// GET /api/v1/system/health
pub async fn system_health(State(ctx): State<ApiContext>) -> Response {
    let state = ctx.state.read().await;
    ApiResponse::ok(SystemHealthResponse {
        status: state.status.to_string(),
        farm: config::get().farm.name.clone(),
        backend: ctx.controller.store().backend_name(),
        version: env!("CARGO_PKG_VERSION"),
        uptime_secs: state.uptime_secs(),
        loaded_at: state.loaded_at,
        turbines: state.turbines().len(),
        substations: state.substations().len(),
        connections: state.connections().len(),
    })
}

// ============================================================================
// Farm
// ============================================================================

/// GET /api/v1/farm/summary
pub async fn farm_summary(State(ctx): State<ApiContext>) -> Response {
    let state = ctx.state.read().await;
    ApiResponse::ok(state.summary())
}

/// GET /api/v1/farm/events?limit=50
pub async fn farm_events(State(ctx): State<ApiContext>, Query(q): Query<LimitQuery>) -> Response {
    let limit = q.limit.unwrap_or(50).min(500) as usize;
    let state = ctx.state.read().await;
    ApiResponse::ok(state.recent_events(limit))
}

// ============================================================================
// Turbines
// ============================================================================

/// GET /api/v1/turbines
pub async fn list_turbines(State(ctx): State<ApiContext>) -> Response {
    let state = ctx.state.read().await;
    ApiResponse::ok(state.turbines().to_vec())
}

/// POST /api/v1/turbines
pub async fn create_turbine(
    State(ctx): State<ApiContext>,
    Json(req): Json<CreateTurbineRequest>,
) -> Response {
    if req.name.trim().is_empty() {
        return ApiErrorResponse::bad_request("turbine name must not be empty");
    }
    let id = req.id.unwrap_or_else(|| Uuid::new_v4().to_string());
    match ctx.controller.add_turbine(&id, &req.name, req.position).await {
        Ok(turbine) => ApiResponse::ok(turbine),
        Err(e) => controller_error(e),
    }
}

/// GET /api/v1/turbines/:id?limit=20
///
/// Opening a turbine's detail also marks it as the current dashboard
/// selection; the history panels load against the selected turbine.
pub async fn turbine_detail(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Query(q): Query<LimitQuery>,
) -> Response {
    let limit = q.limit.unwrap_or(20).min(200);
    match ctx.controller.select_turbine(&id, limit).await {
        Ok((turbine, events)) => ApiResponse::ok(TurbineDetailResponse { turbine, events }),
        Err(e) => controller_error(e),
    }
}

/// POST /api/v1/turbines/:id/status
pub async fn set_turbine_status(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(req): Json<StatusRequest>,
) -> Response {
    match ctx.controller.set_turbine_status(&id, req.status).await {
        Ok(turbine) => ApiResponse::ok(turbine),
        Err(e) => controller_error(e),
    }
}

/// POST /api/v1/turbines/:id/position
pub async fn move_turbine(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(position): Json<Position>,
) -> Response {
    match ctx.controller.move_turbine(&id, position).await {
        Ok(turbine) => ApiResponse::ok(turbine),
        Err(e) => controller_error(e),
    }
}

/// DELETE /api/v1/turbines/:id
pub async fn delete_turbine(State(ctx): State<ApiContext>, Path(id): Path<String>) -> Response {
    match ctx.controller.delete_turbine(&id).await {
        Ok(()) => ApiResponse::ok(serde_json::json!({ "deleted": id })),
        Err(e) => controller_error(e),
    }
}

/// POST /api/v1/turbines/:id/evaluate
pub async fn evaluate_turbine(State(ctx): State<ApiContext>, Path(id): Path<String>) -> Response {
    match ctx.controller.evaluate_turbine(&id).await {
        Ok(health) => ApiResponse::ok(health),
        Err(e) => controller_error(e),
    }
}

/// GET /api/v1/turbines/:id/health-history?limit=50
pub async fn turbine_health_history(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Query(q): Query<LimitQuery>,
) -> Response {
    {
        let state = ctx.state.read().await;
        if state.turbine(&id).is_none() {
            return ApiErrorResponse::not_found(format!("turbine {id} not found"));
        }
    }
    let history = &config::get().history;
    let limit = q.limit.unwrap_or(history.default_limit).min(history.max_limit);
    let debounce = Duration::from_millis(history.debounce_ms);
    match ctx.history.load_health(&id, limit, debounce).await {
        Ok(rows) => ApiResponse::ok(rows),
        Err(e) => history_error(e),
    }
}

/// GET /api/v1/turbines/:id/power-history?limit=50
pub async fn turbine_power_history(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Query(q): Query<LimitQuery>,
) -> Response {
    {
        let state = ctx.state.read().await;
        if state.turbine(&id).is_none() {
            return ApiErrorResponse::not_found(format!("turbine {id} not found"));
        }
    }
    let history = &config::get().history;
    let limit = q.limit.unwrap_or(history.default_limit).min(history.max_limit);
    let debounce = Duration::from_millis(history.debounce_ms);
    match ctx.history.load_power(&id, limit, debounce).await {
        Ok(rows) => ApiResponse::ok(rows),
        Err(e) => history_error(e),
    }
}

// ============================================================================
// Substations
// ============================================================================

/// GET /api/v1/substations
pub async fn list_substations(State(ctx): State<ApiContext>) -> Response {
    let state = ctx.state.read().await;
    ApiResponse::ok(state.substations().to_vec())
}

/// POST /api/v1/substations
pub async fn create_substation(
    State(ctx): State<ApiContext>,
    Json(req): Json<CreateSubstationRequest>,
) -> Response {
    if req.name.trim().is_empty() {
        return ApiErrorResponse::bad_request("substation name must not be empty");
    }
    let id = req.id.unwrap_or_else(|| Uuid::new_v4().to_string());
    match ctx
        .controller
        .add_substation(&id, &req.name, req.position, req.capacity)
        .await
    {
        Ok(substation) => ApiResponse::ok(substation),
        Err(e) => controller_error(e),
    }
}

/// POST /api/v1/substations/:id/position
pub async fn move_substation(
    State(ctx): State<ApiContext>,
    Path(id): Path<String>,
    Json(position): Json<Position>,
) -> Response {
    match ctx.controller.move_substation(&id, position).await {
        Ok(substation) => ApiResponse::ok(substation),
        Err(e) => controller_error(e),
    }
}

/// DELETE /api/v1/substations/:id
pub async fn delete_substation(State(ctx): State<ApiContext>, Path(id): Path<String>) -> Response {
    match ctx.controller.delete_substation(&id).await {
        Ok(()) => ApiResponse::ok(serde_json::json!({ "deleted": id })),
        Err(e) => controller_error(e),
    }
}

// ============================================================================
// Connections
// ============================================================================

/// GET /api/v1/connections
pub async fn list_connections(State(ctx): State<ApiContext>) -> Response {
    let state = ctx.state.read().await;
    ApiResponse::ok(state.connections().to_vec())
}

/// POST /api/v1/connections
pub async fn create_connection(
    State(ctx): State<ApiContext>,
    Json(req): Json<ConnectRequest>,
) -> Response {
    match ctx.controller.connect(req.from, req.to).await {
        Ok(connection) => ApiResponse::ok(connection),
        Err(e) => controller_error(e),
    }
}

/// POST /api/v1/connections/:id/cycle
pub async fn cycle_connection(State(ctx): State<ApiContext>, Path(id): Path<i64>) -> Response {
    match ctx.controller.cycle_connection(id).await {
        Ok(connection) => ApiResponse::ok(connection),
        Err(e) => controller_error(e),
    }
}

/// DELETE /api/v1/connections/:id
pub async fn delete_connection(State(ctx): State<ApiContext>, Path(id): Path<i64>) -> Response {
    match ctx.controller.delete_connection(id).await {
        Ok(()) => ApiResponse::ok(serde_json::json!({ "deleted": id })),
        Err(e) => controller_error(e),
    }
}

// ============================================================================
// Maintenance alerts
// ============================================================================

/// GET /api/v1/alerts?turbine_id=T-01
pub async fn list_alerts(State(ctx): State<ApiContext>, Query(q): Query<AlertsQuery>) -> Response {
    let result = match &q.turbine_id {
        Some(id) => ctx.controller.alerts_for_turbine(id).await,
        None => ctx.controller.alerts().await,
    };
    match result {
        Ok(alerts) => ApiResponse::ok(alerts),
        Err(e) => controller_error(e),
    }
}

/// POST /api/v1/alerts/:id/advance
pub async fn advance_alert(State(ctx): State<ApiContext>, Path(id): Path<i64>) -> Response {
    match ctx.controller.advance_alert(id).await {
        Ok(alert) => ApiResponse::ok(alert),
        Err(e) => controller_error(e),
    }
}
