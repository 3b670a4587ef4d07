//! In-memory store for tests and database-less demo runs
//!
//! Thread-safe via `RwLock`. Not durable — data lost on restart. Rows keep
//! insertion order; listings reverse it so callers see most-recent-first,
//! matching the database backend's `ORDER BY ... DESC`.

use async_trait::async_trait;
use chrono::Utc;
use std::sync::RwLock;

use super::{Store, StoreError};
use crate::types::{
    AssetRef, AssetStatus, Connection, HealthSample, MaintenanceAlert, MaintenanceStatus,
    NewAlert, NewConnection, Position, PowerSample, Substation, Telemetry, Turbine, TurbineEvent,
};

#[derive(Default)]
struct Inner {
    turbines: Vec<Turbine>,
    substations: Vec<Substation>,
    connections: Vec<Connection>,
    events: Vec<TurbineEvent>,
    power: Vec<PowerSample>,
    health: Vec<HealthSample>,
    alerts: Vec<MaintenanceAlert>,
    next_connection_id: i64,
    next_alert_id: i64,
}

/// In-memory persistence backend
pub struct MemoryStore {
    inner: RwLock<Inner>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(Inner {
                next_connection_id: 1,
                next_alert_id: 1,
                ..Inner::default()
            }),
        }
    }

    fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>, StoreError> {
        self.inner
            .read()
            .map_err(|e| StoreError::Storage(e.to_string()))
    }

    fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>, StoreError> {
        self.inner
            .write()
            .map_err(|e| StoreError::Storage(e.to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Store for MemoryStore {
    // ===== Turbines =====

    async fn load_turbines(&self) -> Result<Vec<Turbine>, StoreError> {
        Ok(self.read()?.turbines.clone())
    }

    async fn insert_turbine(&self, turbine: &Turbine) -> Result<(), StoreError> {
        self.write()?.turbines.push(turbine.clone());
        Ok(())
    }

    async fn update_turbine_status(&self, id: &str, status: AssetStatus) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if let Some(t) = inner.turbines.iter_mut().find(|t| t.id == id) {
            t.status = status;
        }
        Ok(())
    }

    async fn update_turbine_position(&self, id: &str, position: Position) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if let Some(t) = inner.turbines.iter_mut().find(|t| t.id == id) {
            t.position = position;
        }
        Ok(())
    }

    async fn update_turbine_telemetry(
        &self,
        id: &str,
        telemetry: &Telemetry,
    ) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if let Some(t) = inner.turbines.iter_mut().find(|t| t.id == id) {
            t.apply_telemetry(telemetry);
        }
        Ok(())
    }

    async fn delete_turbine(&self, id: &str) -> Result<(), StoreError> {
        self.write()?.turbines.retain(|t| t.id != id);
        Ok(())
    }

    // ===== Substations =====

    async fn load_substations(&self) -> Result<Vec<Substation>, StoreError> {
        Ok(self.read()?.substations.clone())
    }

    async fn insert_substation(&self, substation: &Substation) -> Result<(), StoreError> {
        self.write()?.substations.push(substation.clone());
        Ok(())
    }

    async fn update_substation_position(
        &self,
        id: &str,
        position: Position,
    ) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if let Some(s) = inner.substations.iter_mut().find(|s| s.id == id) {
            s.position = position;
        }
        Ok(())
    }

    async fn delete_substation(&self, id: &str) -> Result<(), StoreError> {
        self.write()?.substations.retain(|s| s.id != id);
        Ok(())
    }

    // ===== Connections =====

    async fn load_connections(&self) -> Result<Vec<Connection>, StoreError> {
        Ok(self.read()?.connections.clone())
    }

    async fn insert_connection(&self, conn: &NewConnection) -> Result<Connection, StoreError> {
        let mut inner = self.write()?;
        let id = inner.next_connection_id;
        inner.next_connection_id += 1;
        let stored = Connection {
            id,
            from: conn.from.clone(),
            to: conn.to.clone(),
            status: conn.status,
            kind: conn.kind.clone(),
        };
        inner.connections.push(stored.clone());
        Ok(stored)
    }

    async fn update_connection_status(&self, id: i64, status: AssetStatus) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        if let Some(c) = inner.connections.iter_mut().find(|c| c.id == id) {
            c.status = status;
        }
        Ok(())
    }

    async fn delete_connection(&self, id: i64) -> Result<(), StoreError> {
        self.write()?.connections.retain(|c| c.id != id);
        Ok(())
    }

    async fn delete_connections_for_asset(&self, asset: &AssetRef) -> Result<u64, StoreError> {
        let mut inner = self.write()?;
        let before = inner.connections.len();
        inner.connections.retain(|c| !c.touches(asset));
        Ok((before - inner.connections.len()) as u64)
    }

    // ===== Events =====

    async fn insert_event(
        &self,
        turbine_id: &str,
        event: &str,
        priority: i32,
    ) -> Result<TurbineEvent, StoreError> {
        let stored = TurbineEvent {
            turbine_id: turbine_id.to_string(),
            event: event.to_string(),
            priority,
            created_at: Utc::now(),
        };
        self.write()?.events.push(stored.clone());
        Ok(stored)
    }

    async fn load_events(&self, turbine_id: &str, limit: u32) -> Result<Vec<TurbineEvent>, StoreError> {
        Ok(self
            .read()?
            .events
            .iter()
            .rev()
            .filter(|e| e.turbine_id == turbine_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn delete_events_for_turbine(&self, turbine_id: &str) -> Result<u64, StoreError> {
        let mut inner = self.write()?;
        let before = inner.events.len();
        inner.events.retain(|e| e.turbine_id != turbine_id);
        Ok((before - inner.events.len()) as u64)
    }

    // ===== Power history =====

    async fn insert_power_sample(&self, sample: &PowerSample) -> Result<(), StoreError> {
        self.write()?.power.push(sample.clone());
        Ok(())
    }

    async fn load_power_history(
        &self,
        turbine_id: &str,
        limit: u32,
    ) -> Result<Vec<PowerSample>, StoreError> {
        Ok(self
            .read()?
            .power
            .iter()
            .rev()
            .filter(|s| s.turbine_id == turbine_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn delete_power_history_for_turbine(&self, turbine_id: &str) -> Result<u64, StoreError> {
        let mut inner = self.write()?;
        let before = inner.power.len();
        inner.power.retain(|s| s.turbine_id != turbine_id);
        Ok((before - inner.power.len()) as u64)
    }

    // ===== Health history =====

    async fn insert_health_sample(&self, sample: &HealthSample) -> Result<(), StoreError> {
        self.write()?.health.push(sample.clone());
        Ok(())
    }

    async fn load_health_history(
        &self,
        turbine_id: &str,
        limit: u32,
    ) -> Result<Vec<HealthSample>, StoreError> {
        Ok(self
            .read()?
            .health
            .iter()
            .rev()
            .filter(|s| s.turbine_id == turbine_id)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn delete_health_history_for_turbine(&self, turbine_id: &str) -> Result<u64, StoreError> {
        let mut inner = self.write()?;
        let before = inner.health.len();
        inner.health.retain(|s| s.turbine_id != turbine_id);
        Ok((before - inner.health.len()) as u64)
    }

    // ===== Maintenance alerts =====

    async fn load_alerts(&self) -> Result<Vec<MaintenanceAlert>, StoreError> {
        Ok(self.read()?.alerts.iter().rev().cloned().collect())
    }

    async fn load_alerts_for_turbine(
        &self,
        turbine_id: &str,
    ) -> Result<Vec<MaintenanceAlert>, StoreError> {
        Ok(self
            .read()?
            .alerts
            .iter()
            .rev()
            .filter(|a| a.turbine_id == turbine_id)
            .cloned()
            .collect())
    }

    async fn insert_alert(&self, alert: &NewAlert) -> Result<MaintenanceAlert, StoreError> {
        let mut inner = self.write()?;
        let id = inner.next_alert_id;
        inner.next_alert_id += 1;
        let stored = MaintenanceAlert {
            id,
            turbine_id: alert.turbine_id.clone(),
            alert_type: alert.alert_type,
            status: alert.status,
            description: alert.description.clone(),
            health_score: alert.health_score,
            assigned_to: alert.assigned_to.clone(),
            created_at: Utc::now(),
        };
        inner.alerts.push(stored.clone());
        Ok(stored)
    }

    async fn get_alert(&self, id: i64) -> Result<Option<MaintenanceAlert>, StoreError> {
        Ok(self.read()?.alerts.iter().find(|a| a.id == id).cloned())
    }

    async fn update_alert_status(&self, id: i64, status: MaintenanceStatus) -> Result<(), StoreError> {
        let mut inner = self.write()?;
        match inner.alerts.iter_mut().find(|a| a.id == id) {
            Some(alert) => {
                alert.status = status;
                Ok(())
            }
            None => Err(StoreError::NotFound(format!("alert {id}"))),
        }
    }

    fn backend_name(&self) -> &'static str {
        "InMemory"
    }
}
