//! Windward: Offshore Wind Farm Monitoring
//!
//! Backend for an offshore wind-farm monitoring dashboard: asset registry,
//! live telemetry view, health scoring, and maintenance alerting.
//!
//! ## Architecture
//!
//! - **Store**: persistence behind a trait (PostgreSQL or in-memory)
//! - **Farm State**: shared in-memory view the API and simulator read
//! - **Controller**: two-phase writes keeping store and view in step
//! - **Scoring**: turbine health assessment and alert policy
//! - **API**: Axum JSON surface under `/api/v1`

pub mod aggregate;
pub mod alerts;
pub mod api;
pub mod config;
pub mod controller;
pub mod history;
pub mod scoring;
pub mod sim;
pub mod state;
pub mod store;
pub mod types;

// Re-export farm configuration
pub use config::FarmConfig;

// Re-export commonly used types
pub use types::{
    AssetRef, AssetStatus, Connection, HealthSample, HealthScore, HealthStatus,
    MaintenanceAlert, MaintenanceStatus, Position, PowerSample, Substation, Telemetry,
    Turbine, TurbineEvent,
};

// Re-export the moving parts wired together in main
pub use api::ApiContext;
pub use controller::{ControllerError, FarmController};
pub use history::{HistoryError, HistoryLoader};
pub use sim::TelemetrySimulator;
pub use state::{FarmState, ServiceStatus};
pub use store::{MemoryStore, PgStore, Store, StoreError};
