//! API route table.

use axum::routing::{delete, get, post};
use axum::Router;

use super::handlers::{self, ApiContext};

/// Build the `/api/v1` router.
pub fn api_routes(context: ApiContext) -> Router {
    Router::new()
        // System
        .route("/system/health", get(handlers::system_health))
        // Farm
        .route("/farm/summary", get(handlers::farm_summary))
        .route("/farm/events", get(handlers::farm_events))
        // Turbines
        .route("/turbines", get(handlers::list_turbines))
        .route("/turbines", post(handlers::create_turbine))
        .route("/turbines/:id", get(handlers::turbine_detail))
        .route("/turbines/:id", delete(handlers::delete_turbine))
        .route("/turbines/:id/status", post(handlers::set_turbine_status))
        .route("/turbines/:id/position", post(handlers::move_turbine))
        .route("/turbines/:id/evaluate", post(handlers::evaluate_turbine))
        .route("/turbines/:id/health-history", get(handlers::turbine_health_history))
        .route("/turbines/:id/power-history", get(handlers::turbine_power_history))
        // Substations
        .route("/substations", get(handlers::list_substations))
        .route("/substations", post(handlers::create_substation))
        .route("/substations/:id", delete(handlers::delete_substation))
        .route("/substations/:id/position", post(handlers::move_substation))
        // Connections
        .route("/connections", get(handlers::list_connections))
        .route("/connections", post(handlers::create_connection))
        .route("/connections/:id", delete(handlers::delete_connection))
        .route("/connections/:id/cycle", post(handlers::cycle_connection))
        // Maintenance alerts
        .route("/alerts", get(handlers::list_alerts))
        .route("/alerts/:id/advance", post(handlers::advance_alert))
        .with_state(context)
}
