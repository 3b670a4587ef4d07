//! Store trait — pluggable persistence backend
//!
//! Abstracts farm asset and history persistence so backends can be swapped
//! without touching controller code:
//! - `PgStore`: PostgreSQL over a connection pool, the production backend
//! - `MemoryStore`: in-memory store for tests and database-less demo runs
//!
//! Every mutation of farm state goes through this seam first; the in-memory
//! view is only updated after the store accepts the write.

mod memory;
mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use async_trait::async_trait;

use crate::types::{
    AssetRef, AssetStatus, Connection, HealthSample, MaintenanceAlert, MaintenanceStatus,
    NewAlert, NewConnection, Position, PowerSample, Substation, Telemetry, Turbine, TurbineEvent,
};

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    #[error("storage error: {0}")]
    Storage(String),
    #[error("corrupt row: {0}")]
    Corrupt(String),
    #[error("not found: {0}")]
    NotFound(String),
}

/// Trait for pluggable persistence backends
///
/// Implementations must be thread-safe (Send + Sync) for shared access
/// across async tasks. List operations return most-recent-first.
#[async_trait]
pub trait Store: Send + Sync {
    // ===== Turbines =====

    async fn load_turbines(&self) -> Result<Vec<Turbine>, StoreError>;
    async fn insert_turbine(&self, turbine: &Turbine) -> Result<(), StoreError>;
    async fn update_turbine_status(&self, id: &str, status: AssetStatus) -> Result<(), StoreError>;
    async fn update_turbine_position(&self, id: &str, position: Position) -> Result<(), StoreError>;
    async fn update_turbine_telemetry(&self, id: &str, telemetry: &Telemetry) -> Result<(), StoreError>;
    async fn delete_turbine(&self, id: &str) -> Result<(), StoreError>;

    // ===== Substations =====

    async fn load_substations(&self) -> Result<Vec<Substation>, StoreError>;
    async fn insert_substation(&self, substation: &Substation) -> Result<(), StoreError>;
    async fn update_substation_position(&self, id: &str, position: Position) -> Result<(), StoreError>;
    async fn delete_substation(&self, id: &str) -> Result<(), StoreError>;

    // ===== Connections =====

    async fn load_connections(&self) -> Result<Vec<Connection>, StoreError>;
    /// Insert and return the stored connection with its assigned id
    async fn insert_connection(&self, conn: &NewConnection) -> Result<Connection, StoreError>;
    async fn update_connection_status(&self, id: i64, status: AssetStatus) -> Result<(), StoreError>;
    async fn delete_connection(&self, id: i64) -> Result<(), StoreError>;
    /// Delete every connection with the given asset at either endpoint,
    /// returning the number removed
    async fn delete_connections_for_asset(&self, asset: &AssetRef) -> Result<u64, StoreError>;

    // ===== Events =====

    /// Insert and return the stored event with its assigned timestamp
    async fn insert_event(&self, turbine_id: &str, event: &str, priority: i32) -> Result<TurbineEvent, StoreError>;
    async fn load_events(&self, turbine_id: &str, limit: u32) -> Result<Vec<TurbineEvent>, StoreError>;
    async fn delete_events_for_turbine(&self, turbine_id: &str) -> Result<u64, StoreError>;

    // ===== Power history =====

    async fn insert_power_sample(&self, sample: &PowerSample) -> Result<(), StoreError>;
    async fn load_power_history(&self, turbine_id: &str, limit: u32) -> Result<Vec<PowerSample>, StoreError>;
    async fn delete_power_history_for_turbine(&self, turbine_id: &str) -> Result<u64, StoreError>;

    // ===== Health history =====

    async fn insert_health_sample(&self, sample: &HealthSample) -> Result<(), StoreError>;
    async fn load_health_history(&self, turbine_id: &str, limit: u32) -> Result<Vec<HealthSample>, StoreError>;
    async fn delete_health_history_for_turbine(&self, turbine_id: &str) -> Result<u64, StoreError>;

    // ===== Maintenance alerts =====

    async fn load_alerts(&self) -> Result<Vec<MaintenanceAlert>, StoreError>;
    async fn load_alerts_for_turbine(&self, turbine_id: &str) -> Result<Vec<MaintenanceAlert>, StoreError>;
    /// Insert and return the stored alert with its assigned id and timestamp
    async fn insert_alert(&self, alert: &NewAlert) -> Result<MaintenanceAlert, StoreError>;
    async fn get_alert(&self, id: i64) -> Result<Option<MaintenanceAlert>, StoreError>;
    async fn update_alert_status(&self, id: i64, status: MaintenanceStatus) -> Result<(), StoreError>;

    /// Backend name for logging
    fn backend_name(&self) -> &'static str;
}
