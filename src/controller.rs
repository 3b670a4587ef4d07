//! Farm Controller
//!
//! Coordinates every mutation of the farm. All writes are two-phase: the
//! store accepts the change first, and only then is the in-memory view
//! updated, so a store failure leaves the view showing what the store still
//! holds. There are no transactions — multi-step flows (cascaded deletes)
//! run in a fixed order and abort on the first failure, logging where they
//! stopped.

use std::sync::Arc;
use tokio::sync::RwLock;
use tracing::{error, info, warn};

use crate::alerts;
use crate::scoring::{self, thresholds};
use crate::state::FarmState;
use crate::store::{Store, StoreError};
use crate::types::{
    AssetRef, AssetStatus, Connection, HealthSample, HealthScore, MaintenanceAlert,
    MaintenanceStatus, NewConnection, Position, PowerSample, Substation, Telemetry, Turbine,
    TurbineEvent,
};

/// Hours of power history seeded when a turbine is commissioned, so its
/// chart opens with a day of context instead of an empty pane.
pub const SEED_HISTORY_HOURS: i64 = 24;

/// Controller errors
#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("turbine {0} not found")]
    TurbineNotFound(String),
    #[error("substation {0} not found")]
    SubstationNotFound(String),
    #[error("connection {0} not found")]
    ConnectionNotFound(i64),
    #[error("alert {0} not found")]
    AlertNotFound(i64),
    #[error("alert {0} already completed")]
    AlertCompleted(i64),
    #[error("asset id {0:?} already in use")]
    DuplicateId(String),
    #[error("invalid connection: {0}")]
    InvalidConnection(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Coordinates store writes and the shared in-memory view
pub struct FarmController {
    store: Arc<dyn Store>,
    state: Arc<RwLock<FarmState>>,
}

impl FarmController {
    pub fn new(store: Arc<dyn Store>, state: Arc<RwLock<FarmState>>) -> Self {
        Self { store, state }
    }

    pub fn state(&self) -> Arc<RwLock<FarmState>> {
        Arc::clone(&self.state)
    }

    pub fn store(&self) -> Arc<dyn Store> {
        Arc::clone(&self.store)
    }

    // ========================================================================
    // Farm loading
    // ========================================================================

    /// Rebuild the in-memory view from the store
    pub async fn load_farm(&self) -> Result<(), ControllerError> {
        let (turbines, substations, connections) = futures::future::try_join3(
            self.store.load_turbines(),
            self.store.load_substations(),
            self.store.load_connections(),
        )
        .await?;

        info!(
            turbines = turbines.len(),
            substations = substations.len(),
            connections = connections.len(),
            backend = self.store.backend_name(),
            "Farm loaded from store"
        );

        let mut state = self.state.write().await;
        state.replace_all(turbines, substations, connections);
        Ok(())
    }

    // ========================================================================
    // Turbines
    // ========================================================================

    /// Commission a new turbine at the given position
    pub async fn add_turbine(
        &self,
        id: &str,
        name: &str,
        position: Position,
    ) -> Result<Turbine, ControllerError> {
        self.insert_turbine_record(Turbine::new(id, name, position))
            .await
    }

    /// Two-phase insert shared by the API path and the demo seeder
    async fn insert_turbine_record(&self, turbine: Turbine) -> Result<Turbine, ControllerError> {
        {
            let state = self.state.read().await;
            if state.turbine(&turbine.id).is_some() {
                return Err(ControllerError::DuplicateId(turbine.id.clone()));
            }
        }

        self.store.insert_turbine(&turbine).await?;
        let event = self
            .store
            .insert_event(&turbine.id, "Turbine commissioned", AssetStatus::Normal.event_priority())
            .await?;
        self.seed_power_history(&turbine).await;

        let mut state = self.state.write().await;
        state.add_turbine(turbine.clone());
        state.push_event(event);

        info!(turbine_id = %turbine.id, name = %turbine.name, "Turbine commissioned");
        Ok(turbine)
    }

    /// Backfill a day of hourly power samples for a new turbine
    ///
    /// Chart seeding only, so a failed insert is logged and the rest of the
    /// commissioning proceeds with however much history made it in.
    async fn seed_power_history(&self, turbine: &Turbine) {
        let now = chrono::Utc::now();
        for hours_back in (1..=SEED_HISTORY_HOURS).rev() {
            let sample = PowerSample {
                turbine_id: turbine.id.clone(),
                power: turbine.power,
                expected_power: thresholds::EXPECTED_POWER_MW,
                upper_limit: thresholds::EXPECTED_POWER_MW * (1.0 + thresholds::POWER_BAND_FRACTION),
                lower_limit: thresholds::EXPECTED_POWER_MW * (1.0 - thresholds::POWER_BAND_FRACTION),
                recorded_at: now - chrono::Duration::hours(hours_back),
            };
            if let Err(e) = self.store.insert_power_sample(&sample).await {
                warn!(
                    turbine_id = %turbine.id,
                    error = %e,
                    hours_back,
                    "Power history seeding stopped early"
                );
                return;
            }
        }
    }

    /// Move a turbine on the map
    pub async fn move_turbine(
        &self,
        id: &str,
        position: Position,
    ) -> Result<Turbine, ControllerError> {
        {
            let state = self.state.read().await;
            if state.turbine(id).is_none() {
                return Err(ControllerError::TurbineNotFound(id.to_string()));
            }
        }

        self.store.update_turbine_position(id, position).await?;

        let mut state = self.state.write().await;
        state.set_turbine_position(id, position);
        state
            .turbine(id)
            .cloned()
            .ok_or_else(|| ControllerError::TurbineNotFound(id.to_string()))
    }

    /// Change a turbine's operational status
    ///
    /// Writes the status and a "Status changed to ..." event to the store,
    /// then updates the view: status on the turbine, event at the front of
    /// the feed.
    pub async fn set_turbine_status(
        &self,
        id: &str,
        status: AssetStatus,
    ) -> Result<Turbine, ControllerError> {
        {
            let state = self.state.read().await;
            if state.turbine(id).is_none() {
                return Err(ControllerError::TurbineNotFound(id.to_string()));
            }
        }

        self.store.update_turbine_status(id, status).await?;
        let event = self
            .store
            .insert_event(
                id,
                &format!("Status changed to {status}"),
                status.event_priority(),
            )
            .await?;

        let mut state = self.state.write().await;
        state.set_turbine_status(id, status);
        state.push_event(event);

        let turbine = state
            .turbine(id)
            .cloned()
            .ok_or_else(|| ControllerError::TurbineNotFound(id.to_string()))?;

        info!(turbine_id = %id, status = %status, "Turbine status changed");
        Ok(turbine)
    }

    /// Decommission a turbine and everything hanging off it
    ///
    /// Dependent rows go first, in a fixed order: connections, health
    /// history, power history, events, then the turbine itself. A failure
    /// aborts the remaining steps; rows already deleted stay deleted.
    pub async fn delete_turbine(&self, id: &str) -> Result<(), ControllerError> {
        {
            let state = self.state.read().await;
            if state.turbine(id).is_none() {
                return Err(ControllerError::TurbineNotFound(id.to_string()));
            }
        }

        let asset = AssetRef::Turbine(id.to_string());

        let connections = match self.store.delete_connections_for_asset(&asset).await {
            Ok(n) => n,
            Err(e) => {
                error!(turbine_id = %id, error = %e, "Cascade aborted deleting connections");
                return Err(e.into());
            }
        };
        let health = match self.store.delete_health_history_for_turbine(id).await {
            Ok(n) => n,
            Err(e) => {
                error!(turbine_id = %id, error = %e, "Cascade aborted deleting health history");
                return Err(e.into());
            }
        };
        let power = match self.store.delete_power_history_for_turbine(id).await {
            Ok(n) => n,
            Err(e) => {
                error!(turbine_id = %id, error = %e, "Cascade aborted deleting power history");
                return Err(e.into());
            }
        };
        let events = match self.store.delete_events_for_turbine(id).await {
            Ok(n) => n,
            Err(e) => {
                error!(turbine_id = %id, error = %e, "Cascade aborted deleting events");
                return Err(e.into());
            }
        };
        if let Err(e) = self.store.delete_turbine(id).await {
            error!(turbine_id = %id, error = %e, "Cascade aborted deleting turbine row");
            return Err(e.into());
        }

        let mut state = self.state.write().await;
        state.remove_connections_for(&asset);
        state.drop_events_for(id);
        state.remove_turbine(id);

        info!(
            turbine_id = %id,
            connections,
            health_rows = health,
            power_rows = power,
            event_rows = events,
            "Turbine decommissioned"
        );
        Ok(())
    }

    // ========================================================================
    // Substations
    // ========================================================================

    /// Add a collector substation
    pub async fn add_substation(
        &self,
        id: &str,
        name: &str,
        position: Position,
        capacity: f64,
    ) -> Result<Substation, ControllerError> {
        {
            let state = self.state.read().await;
            if state.substation(id).is_some() {
                return Err(ControllerError::DuplicateId(id.to_string()));
            }
        }

        let mut substation = Substation::new(id, name, position);
        substation.capacity = capacity;

        self.store.insert_substation(&substation).await?;
        self.state.write().await.add_substation(substation.clone());

        info!(substation_id = %id, name = %name, "Substation added");
        Ok(substation)
    }

    /// Move a substation on the map
    pub async fn move_substation(
        &self,
        id: &str,
        position: Position,
    ) -> Result<Substation, ControllerError> {
        {
            let state = self.state.read().await;
            if state.substation(id).is_none() {
                return Err(ControllerError::SubstationNotFound(id.to_string()));
            }
        }

        self.store.update_substation_position(id, position).await?;

        let mut state = self.state.write().await;
        state.set_substation_position(id, position);
        state
            .substation(id)
            .cloned()
            .ok_or_else(|| ControllerError::SubstationNotFound(id.to_string()))
    }

    /// Remove a substation and its connections
    pub async fn delete_substation(&self, id: &str) -> Result<(), ControllerError> {
        {
            let state = self.state.read().await;
            if state.substation(id).is_none() {
                return Err(ControllerError::SubstationNotFound(id.to_string()));
            }
        }

        let asset = AssetRef::Substation(id.to_string());

        let connections = match self.store.delete_connections_for_asset(&asset).await {
            Ok(n) => n,
            Err(e) => {
                error!(substation_id = %id, error = %e, "Cascade aborted deleting connections");
                return Err(e.into());
            }
        };
        if let Err(e) = self.store.delete_substation(id).await {
            error!(substation_id = %id, error = %e, "Cascade aborted deleting substation row");
            return Err(e.into());
        }

        let mut state = self.state.write().await;
        state.remove_connections_for(&asset);
        state.remove_substation(id);

        info!(substation_id = %id, connections, "Substation removed");
        Ok(())
    }

    // ========================================================================
    // Connections
    // ========================================================================

    /// Run a cable between two assets
    ///
    /// Both endpoints must exist and differ, and at least one must be a
    /// turbine. The cable kind is derived from the endpoint tags.
    pub async fn connect(
        &self,
        from: AssetRef,
        to: AssetRef,
    ) -> Result<Connection, ControllerError> {
        if from == to {
            return Err(ControllerError::InvalidConnection(
                "both endpoints are the same asset".to_string(),
            ));
        }
        let kind = from.connection_kind(&to).ok_or_else(|| {
            ControllerError::InvalidConnection(
                "substations cannot be cabled to each other".to_string(),
            )
        })?;

        {
            let state = self.state.read().await;
            for endpoint in [&from, &to] {
                let exists = match endpoint {
                    AssetRef::Turbine(id) => state.turbine(id).is_some(),
                    AssetRef::Substation(id) => state.substation(id).is_some(),
                };
                if !exists {
                    return Err(ControllerError::InvalidConnection(format!(
                        "endpoint {endpoint} does not exist"
                    )));
                }
            }
        }

        let new = NewConnection {
            from,
            to,
            status: AssetStatus::Normal,
            kind: kind.to_string(),
        };
        let connection = self.store.insert_connection(&new).await?;
        self.state.write().await.add_connection(connection.clone());

        info!(
            connection_id = connection.id,
            from = %connection.from,
            to = %connection.to,
            kind = %connection.kind,
            "Connection created"
        );
        Ok(connection)
    }

    /// Step a connection's status through normal -> warning -> error -> normal
    pub async fn cycle_connection(&self, id: i64) -> Result<Connection, ControllerError> {
        let next = {
            let state = self.state.read().await;
            let connection = state
                .connection(id)
                .ok_or(ControllerError::ConnectionNotFound(id))?;
            connection.status.cycled()
        };

        self.store.update_connection_status(id, next).await?;

        let mut state = self.state.write().await;
        state.set_connection_status(id, next);
        state
            .connection(id)
            .cloned()
            .ok_or(ControllerError::ConnectionNotFound(id))
    }

    /// Remove a cable
    pub async fn delete_connection(&self, id: i64) -> Result<(), ControllerError> {
        {
            let state = self.state.read().await;
            if state.connection(id).is_none() {
                return Err(ControllerError::ConnectionNotFound(id));
            }
        }

        self.store.delete_connection(id).await?;
        self.state.write().await.remove_connection(id);
        Ok(())
    }

    // ========================================================================
    // Health evaluation
    // ========================================================================

    /// Score a turbine now, record the sample, and raise an alert if due
    ///
    /// The history record is fire-and-forget: a failed insert is logged and
    /// does not block the assessment. The alert path is synchronous so the
    /// caller learns about store trouble.
    pub async fn evaluate_turbine(&self, id: &str) -> Result<HealthScore, ControllerError> {
        let turbine = {
            let state = self.state.read().await;
            state
                .turbine(id)
                .cloned()
                .ok_or_else(|| ControllerError::TurbineNotFound(id.to_string()))?
        };

        let health = scoring::score_turbine(&turbine);

        let sample = HealthSample::from_score(id, &health, chrono::Utc::now());
        let store = Arc::clone(&self.store);
        tokio::spawn(async move {
            if let Err(e) = store.insert_health_sample(&sample).await {
                warn!(turbine_id = %sample.turbine_id, error = %e, "Failed to record health sample");
            }
        });

        let existing = self.store.load_alerts_for_turbine(id).await?;
        if let Some(new_alert) = alerts::evaluate(&existing, id, &health) {
            let stored = self.store.insert_alert(&new_alert).await?;
            info!(
                turbine_id = %id,
                alert_id = stored.id,
                score = health.score,
                "Maintenance alert raised for low health score"
            );
        }

        Ok(health)
    }

    // ========================================================================
    // Telemetry
    // ========================================================================

    /// Apply a telemetry reading to the view only (the simulator's hot path)
    pub async fn apply_telemetry(&self, id: &str, telemetry: &Telemetry) -> bool {
        self.state.write().await.apply_telemetry(id, telemetry)
    }

    /// Persist the latest telemetry for a turbine alongside the view update
    pub async fn record_telemetry(
        &self,
        id: &str,
        telemetry: &Telemetry,
    ) -> Result<(), ControllerError> {
        self.store.update_turbine_telemetry(id, telemetry).await?;
        self.state.write().await.apply_telemetry(id, telemetry);
        Ok(())
    }

    // ========================================================================
    // Maintenance alerts
    // ========================================================================

    pub async fn alerts(&self) -> Result<Vec<MaintenanceAlert>, ControllerError> {
        Ok(self.store.load_alerts().await?)
    }

    pub async fn alerts_for_turbine(
        &self,
        turbine_id: &str,
    ) -> Result<Vec<MaintenanceAlert>, ControllerError> {
        Ok(self.store.load_alerts_for_turbine(turbine_id).await?)
    }

    /// Move an alert one step forward: pending -> in_progress -> completed
    pub async fn advance_alert(&self, id: i64) -> Result<MaintenanceAlert, ControllerError> {
        let mut alert = self
            .store
            .get_alert(id)
            .await?
            .ok_or(ControllerError::AlertNotFound(id))?;

        let next = alert
            .status
            .next()
            .ok_or(ControllerError::AlertCompleted(id))?;

        self.store.update_alert_status(id, next).await?;
        alert.status = next;

        info!(alert_id = id, status = %next, "Maintenance alert advanced");
        Ok(alert)
    }

    // ========================================================================
    // Selection
    // ========================================================================

    /// Focus a turbine and return its detail: current record plus its event
    /// log from the store, newest first
    ///
    /// The selection drives which turbine the history panels load for.
    pub async fn select_turbine(
        &self,
        turbine_id: &str,
        events_limit: u32,
    ) -> Result<(Turbine, Vec<TurbineEvent>), ControllerError> {
        let turbine = {
            let state = self.state.read().await;
            state
                .turbine(turbine_id)
                .cloned()
                .ok_or_else(|| ControllerError::TurbineNotFound(turbine_id.to_string()))?
        };

        let events = self.store.load_events(turbine_id, events_limit).await?;
        self.state
            .write()
            .await
            .select(AssetRef::Turbine(turbine_id.to_string()));
        Ok((turbine, events))
    }

    // ========================================================================
    // Demo seeding
    // ========================================================================

    /// Populate an empty farm with a small demo layout
    ///
    /// No-op when the farm already has assets.
    pub async fn seed_demo(&self) -> Result<(), ControllerError> {
        {
            let state = self.state.read().await;
            if !state.turbines().is_empty() || !state.substations().is_empty() {
                info!("Farm already populated — skipping demo seed");
                return Ok(());
            }
        }

        info!("Seeding demo farm layout");

        let turbines = [
            ("T-01", "Alpha 1", 55.530, 7.900, 7.2, AssetStatus::Normal),
            ("T-02", "Alpha 2", 55.535, 7.910, 6.8, AssetStatus::Normal),
            ("T-03", "Alpha 3", 55.540, 7.920, 7.5, AssetStatus::Normal),
            ("T-04", "Bravo 1", 55.530, 7.935, 4.1, AssetStatus::Warning),
            ("T-05", "Bravo 2", 55.535, 7.945, 6.9, AssetStatus::Normal),
            ("T-06", "Bravo 3", 55.540, 7.955, 7.1, AssetStatus::Normal),
        ];

        for (id, name, lat, lon, power, status) in turbines {
            let mut turbine = Turbine::new(id, name, Position::new(lat, lon));
            turbine.power = power;
            turbine.wind_speed = 11.0;
            turbine.temperature = 21.0;
            turbine.humidity = 74.0;
            turbine.status = status;
            self.insert_turbine_record(turbine).await?;
        }

        self.add_substation("S-01", "Collector North", Position::new(55.536, 7.928), 60.0)
            .await?;
        self.add_substation("S-02", "Collector South", Position::new(55.528, 7.948), 60.0)
            .await?;

        // two daisy-chained strings, each ending at its collector
        for (from, to) in [
            ("T-01", "T-02"),
            ("T-02", "T-03"),
            ("T-04", "T-05"),
            ("T-05", "T-06"),
        ] {
            self.connect(
                AssetRef::Turbine(from.to_string()),
                AssetRef::Turbine(to.to_string()),
            )
            .await?;
        }
        self.connect(
            AssetRef::Turbine("T-03".to_string()),
            AssetRef::Substation("S-01".to_string()),
        )
        .await?;
        self.connect(
            AssetRef::Turbine("T-06".to_string()),
            AssetRef::Substation("S-02".to_string()),
        )
        .await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::AlertType;

    fn controller() -> FarmController {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let state = Arc::new(RwLock::new(FarmState::new()));
        FarmController::new(store, state)
    }

    async fn add_default_turbine(ctl: &FarmController, id: &str) -> Turbine {
        ctl.add_turbine(id, &format!("Turbine {id}"), Position::new(55.53, 7.9))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_add_turbine_writes_store_and_view() {
        let ctl = controller();
        add_default_turbine(&ctl, "T-01").await;

        assert_eq!(ctl.store().load_turbines().await.unwrap().len(), 1);
        let state = ctl.state();
        let state = state.read().await;
        assert!(state.turbine("T-01").is_some());
        // commissioning event lands in both places
        assert_eq!(state.recent_events(10).len(), 1);
        drop(state);
        assert_eq!(ctl.store().load_events("T-01", 10).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_commissioning_seeds_a_day_of_power_history() {
        let ctl = controller();
        add_default_turbine(&ctl, "T-01").await;

        let samples = ctl.store().load_power_history("T-01", 100).await.unwrap();
        assert_eq!(samples.len(), 24);
        // newest first, hourly spacing, shared chart band
        assert!(samples[0].recorded_at > samples[23].recorded_at);
        for sample in &samples {
            assert_eq!(sample.expected_power, 8.0);
            assert_eq!(sample.upper_limit, 8.8);
            assert_eq!(sample.lower_limit, 7.2);
        }
    }

    #[tokio::test]
    async fn test_select_turbine_returns_detail_and_sets_focus() {
        let ctl = controller();
        add_default_turbine(&ctl, "T-01").await;
        ctl.set_turbine_status("T-01", AssetStatus::Warning).await.unwrap();

        let (turbine, events) = ctl.select_turbine("T-01", 10).await.unwrap();
        assert_eq!(turbine.status, AssetStatus::Warning);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0].event, "Status changed to warning");

        {
            let state = ctl.state();
            let state = state.read().await;
            assert_eq!(state.selected(), Some(&AssetRef::Turbine("T-01".into())));
        }

        // deleting the focused turbine clears the selection
        ctl.delete_turbine("T-01").await.unwrap();
        let state = ctl.state();
        let state = state.read().await;
        assert!(state.selected().is_none());

        let err = ctl.select_turbine("T-01", 10).await.unwrap_err();
        assert!(matches!(err, ControllerError::TurbineNotFound(_)));
    }

    #[tokio::test]
    async fn test_duplicate_turbine_id_rejected() {
        let ctl = controller();
        add_default_turbine(&ctl, "T-01").await;
        let err = ctl
            .add_turbine("T-01", "Clone", Position::new(55.0, 7.0))
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::DuplicateId(_)));
    }

    #[tokio::test]
    async fn test_status_change_writes_event_with_priority() {
        let ctl = controller();
        add_default_turbine(&ctl, "T-01").await;

        let updated = ctl
            .set_turbine_status("T-01", AssetStatus::Error)
            .await
            .unwrap();
        assert_eq!(updated.status, AssetStatus::Error);

        let events = ctl.store().load_events("T-01", 10).await.unwrap();
        assert_eq!(events[0].event, "Status changed to error");
        assert_eq!(events[0].priority, 1);

        // feed is newest-first
        let state = ctl.state();
        let state = state.read().await;
        assert_eq!(state.recent_events(1)[0].event, "Status changed to error");
    }

    #[tokio::test]
    async fn test_status_change_on_missing_turbine() {
        let ctl = controller();
        let err = ctl
            .set_turbine_status("T-99", AssetStatus::Warning)
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::TurbineNotFound(_)));
    }

    #[tokio::test]
    async fn test_connect_validates_endpoints_and_derives_kind() {
        let ctl = controller();
        add_default_turbine(&ctl, "T-01").await;
        add_default_turbine(&ctl, "T-02").await;
        ctl.add_substation("S-01", "Collector", Position::new(55.5, 7.92), 60.0)
            .await
            .unwrap();
        ctl.add_substation("S-02", "Collector B", Position::new(55.51, 7.95), 60.0)
            .await
            .unwrap();

        let conn = ctl
            .connect(
                AssetRef::Turbine("T-01".into()),
                AssetRef::Substation("S-01".into()),
            )
            .await
            .unwrap();
        assert_eq!(conn.status, AssetStatus::Normal);
        assert_eq!(conn.kind, "turbine-substation");

        let conn = ctl
            .connect(
                AssetRef::Turbine("T-01".into()),
                AssetRef::Turbine("T-02".into()),
            )
            .await
            .unwrap();
        assert_eq!(conn.kind, "turbine-turbine");

        // missing endpoint
        let err = ctl
            .connect(
                AssetRef::Turbine("T-01".into()),
                AssetRef::Turbine("T-77".into()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConnection(_)));

        // self loop
        let err = ctl
            .connect(
                AssetRef::Turbine("T-01".into()),
                AssetRef::Turbine("T-01".into()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConnection(_)));

        // substation pair has no cable kind
        let err = ctl
            .connect(
                AssetRef::Substation("S-01".into()),
                AssetRef::Substation("S-02".into()),
            )
            .await
            .unwrap_err();
        assert!(matches!(err, ControllerError::InvalidConnection(_)));
    }

    #[tokio::test]
    async fn test_cycle_connection_steps_forward() {
        let ctl = controller();
        add_default_turbine(&ctl, "T-01").await;
        add_default_turbine(&ctl, "T-02").await;
        let conn = ctl
            .connect(
                AssetRef::Turbine("T-01".into()),
                AssetRef::Turbine("T-02".into()),
            )
            .await
            .unwrap();

        assert_eq!(ctl.cycle_connection(conn.id).await.unwrap().status, AssetStatus::Warning);
        assert_eq!(ctl.cycle_connection(conn.id).await.unwrap().status, AssetStatus::Error);
        assert_eq!(ctl.cycle_connection(conn.id).await.unwrap().status, AssetStatus::Normal);

        let err = ctl.cycle_connection(999).await.unwrap_err();
        assert!(matches!(err, ControllerError::ConnectionNotFound(999)));
    }

    #[tokio::test]
    async fn test_delete_turbine_cascades() {
        let ctl = controller();
        add_default_turbine(&ctl, "T-01").await;
        add_default_turbine(&ctl, "T-02").await;
        ctl.connect(
            AssetRef::Turbine("T-01".into()),
            AssetRef::Turbine("T-02".into()),
        )
        .await
        .unwrap();

        let store = ctl.store();
        store
            .insert_power_sample(&crate::types::PowerSample {
                turbine_id: "T-01".into(),
                power: 6.0,
                expected_power: 8.0,
                upper_limit: 8.8,
                lower_limit: 7.2,
                recorded_at: chrono::Utc::now(),
            })
            .await
            .unwrap();
        store
            .insert_health_sample(&HealthSample {
                turbine_id: "T-01".into(),
                score: 90,
                status: crate::types::HealthStatus::Good,
                issues: vec![],
                recorded_at: chrono::Utc::now(),
            })
            .await
            .unwrap();

        ctl.delete_turbine("T-01").await.unwrap();

        assert!(store.load_connections().await.unwrap().is_empty());
        assert!(store.load_power_history("T-01", 10).await.unwrap().is_empty());
        assert!(store.load_health_history("T-01", 10).await.unwrap().is_empty());
        assert!(store.load_events("T-01", 10).await.unwrap().is_empty());
        assert_eq!(store.load_turbines().await.unwrap().len(), 1);

        let state = ctl.state();
        let state = state.read().await;
        assert!(state.turbine("T-01").is_none());
        assert!(state.connections().is_empty());
        assert!(state.recent_events(100).iter().all(|e| e.turbine_id != "T-01"));
    }

    #[tokio::test]
    async fn test_delete_substation_sweeps_connections() {
        let ctl = controller();
        add_default_turbine(&ctl, "T-01").await;
        ctl.add_substation("S-01", "Collector", Position::new(55.5, 7.92), 60.0)
            .await
            .unwrap();
        ctl.connect(
            AssetRef::Turbine("T-01".into()),
            AssetRef::Substation("S-01".into()),
        )
        .await
        .unwrap();

        ctl.delete_substation("S-01").await.unwrap();

        assert!(ctl.store().load_connections().await.unwrap().is_empty());
        assert!(ctl.store().load_substations().await.unwrap().is_empty());
        // the turbine is untouched
        assert_eq!(ctl.store().load_turbines().await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_evaluate_turbine_raises_alert_once_per_score() {
        let ctl = controller();
        add_default_turbine(&ctl, "T-01").await;
        // error status + low power + high temperature -> score 25
        ctl.set_turbine_status("T-01", AssetStatus::Error).await.unwrap();
        ctl.record_telemetry(
            "T-01",
            &Telemetry {
                power: 1.0,
                wind_speed: 9.0,
                temperature: 40.0,
                humidity: 70.0,
            },
        )
        .await
        .unwrap();

        let health = ctl.evaluate_turbine("T-01").await.unwrap();
        assert_eq!(health.score, 25);

        let alerts = ctl.alerts_for_turbine("T-01").await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].alert_type, AlertType::HealthScore);
        assert_eq!(alerts[0].description, "Low health score detected: 25");
        assert_eq!(alerts[0].health_score, Some(25));

        // same score again -> no duplicate
        ctl.evaluate_turbine("T-01").await.unwrap();
        assert_eq!(ctl.alerts_for_turbine("T-01").await.unwrap().len(), 1);

        // different low score -> new alert
        ctl.record_telemetry(
            "T-01",
            &Telemetry {
                power: 1.0,
                wind_speed: 9.0,
                temperature: 33.0,
                humidity: 70.0,
            },
        )
        .await
        .unwrap();
        let health = ctl.evaluate_turbine("T-01").await.unwrap();
        assert_eq!(health.score, 35);
        assert_eq!(ctl.alerts_for_turbine("T-01").await.unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_healthy_turbine_raises_no_alert() {
        let ctl = controller();
        add_default_turbine(&ctl, "T-01").await;
        ctl.record_telemetry(
            "T-01",
            &Telemetry {
                power: 7.5,
                wind_speed: 11.0,
                temperature: 22.0,
                humidity: 70.0,
            },
        )
        .await
        .unwrap();

        let health = ctl.evaluate_turbine("T-01").await.unwrap();
        assert_eq!(health.score, 100);
        assert!(ctl.alerts_for_turbine("T-01").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_advance_alert_walks_forward_only() {
        let ctl = controller();
        add_default_turbine(&ctl, "T-01").await;
        ctl.set_turbine_status("T-01", AssetStatus::Error).await.unwrap();
        ctl.record_telemetry(
            "T-01",
            &Telemetry {
                power: 1.0,
                wind_speed: 9.0,
                temperature: 40.0,
                humidity: 70.0,
            },
        )
        .await
        .unwrap();
        ctl.evaluate_turbine("T-01").await.unwrap();

        let alert = &ctl.alerts().await.unwrap()[0];
        assert_eq!(alert.status, MaintenanceStatus::Pending);

        let advanced = ctl.advance_alert(alert.id).await.unwrap();
        assert_eq!(advanced.status, MaintenanceStatus::InProgress);
        let advanced = ctl.advance_alert(alert.id).await.unwrap();
        assert_eq!(advanced.status, MaintenanceStatus::Completed);

        let err = ctl.advance_alert(alert.id).await.unwrap_err();
        assert!(matches!(err, ControllerError::AlertCompleted(_)));

        let err = ctl.advance_alert(12345).await.unwrap_err();
        assert!(matches!(err, ControllerError::AlertNotFound(_)));
    }

    #[tokio::test]
    async fn test_seed_demo_populates_empty_farm_once() {
        let ctl = controller();
        ctl.seed_demo().await.unwrap();

        {
            let state = ctl.state();
            let state = state.read().await;
            assert_eq!(state.turbines().len(), 6);
            assert_eq!(state.substations().len(), 2);
            assert_eq!(state.connections().len(), 6);
        }

        // second call is a no-op
        ctl.seed_demo().await.unwrap();
        let state = ctl.state();
        let state = state.read().await;
        assert_eq!(state.turbines().len(), 6);
    }

    #[tokio::test]
    async fn test_load_farm_rebuilds_view_from_store() {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        store
            .insert_turbine(&Turbine::new("T-01", "Alpha 1", Position::new(55.53, 7.9)))
            .await
            .unwrap();

        let state = Arc::new(RwLock::new(FarmState::new()));
        let ctl = FarmController::new(store, Arc::clone(&state));
        ctl.load_farm().await.unwrap();

        let state = state.read().await;
        assert_eq!(state.turbines().len(), 1);
        assert_eq!(state.status, crate::state::ServiceStatus::Monitoring);
    }
}
