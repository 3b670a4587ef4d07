//! Farm State
//!
//! Shared in-memory view of the farm, accessible from API handlers, the
//! telemetry simulator, and the controller. This struct is wrapped in
//! `Arc<RwLock<>>` for thread-safe access across the async runtime.
//!
//! The store is the source of truth; this view is refreshed from it at
//! startup and mutated through the controller's two-phase writes (store
//! first, then here).

use chrono::{DateTime, Utc};
use std::collections::VecDeque;
use std::time::Instant;

use crate::aggregate::{self, FarmSummary};
use crate::types::{
    AssetRef, AssetStatus, Connection, Position, Substation, Telemetry, Turbine, TurbineEvent,
};

/// Maximum event records kept in the in-memory feed.
pub const MAX_EVENTS: usize = 1000;

// ============================================================================
// Service Status
// ============================================================================

/// Service operational status
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ServiceStatus {
    /// Service is starting up, farm not yet loaded
    Starting,
    /// Normal operation, monitoring active
    Monitoring,
    /// A background task failed; service still answering requests
    Degraded,
}

impl std::fmt::Display for ServiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ServiceStatus::Starting => write!(f, "Starting"),
            ServiceStatus::Monitoring => write!(f, "Monitoring"),
            ServiceStatus::Degraded => write!(f, "Degraded"),
        }
    }
}

// ============================================================================
// Farm State
// ============================================================================

/// Shared in-memory view of the farm
#[derive(Debug)]
pub struct FarmState {
    turbines: Vec<Turbine>,
    substations: Vec<Substation>,
    connections: Vec<Connection>,
    /// Most-recent-first event feed, bounded at [`MAX_EVENTS`]
    events: VecDeque<TurbineEvent>,
    /// Asset currently focused in the operator's dashboard; never points at
    /// an asset missing from the collections above
    selected: Option<AssetRef>,
    pub status: ServiceStatus,
    /// When the view was last rebuilt from the store
    pub loaded_at: Option<DateTime<Utc>>,
    uptime: Instant,
}

impl Default for FarmState {
    /// Returns an empty view suitable for tests; production startup fills it
    /// via [`FarmState::replace_all`].
    fn default() -> Self {
        Self {
            turbines: Vec::new(),
            substations: Vec::new(),
            connections: Vec::new(),
            events: VecDeque::with_capacity(MAX_EVENTS),
            selected: None,
            status: ServiceStatus::Starting,
            loaded_at: None,
            uptime: Instant::now(),
        }
    }
}

impl FarmState {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole view with freshly loaded store contents
    ///
    /// Any previous selection is dropped; it may refer to an asset the
    /// reload no longer carries.
    pub fn replace_all(
        &mut self,
        turbines: Vec<Turbine>,
        substations: Vec<Substation>,
        connections: Vec<Connection>,
    ) {
        self.turbines = turbines;
        self.substations = substations;
        self.connections = connections;
        self.selected = None;
        self.loaded_at = Some(Utc::now());
        self.status = ServiceStatus::Monitoring;
    }

    // ===== Selection =====

    pub fn selected(&self) -> Option<&AssetRef> {
        self.selected.as_ref()
    }

    /// Focus an asset; true if it exists in the view
    pub fn select(&mut self, asset: AssetRef) -> bool {
        let exists = match &asset {
            AssetRef::Turbine(id) => self.turbine(id).is_some(),
            AssetRef::Substation(id) => self.substation(id).is_some(),
        };
        if exists {
            self.selected = Some(asset);
        }
        exists
    }

    pub fn clear_selection(&mut self) {
        self.selected = None;
    }

    pub fn uptime_secs(&self) -> u64 {
        self.uptime.elapsed().as_secs()
    }

    pub fn summary(&self) -> FarmSummary {
        aggregate::summarize(&self.turbines, &self.substations, &self.connections)
    }

    // ===== Turbines =====

    pub fn turbines(&self) -> &[Turbine] {
        &self.turbines
    }

    pub fn turbine(&self, id: &str) -> Option<&Turbine> {
        self.turbines.iter().find(|t| t.id == id)
    }

    pub fn add_turbine(&mut self, turbine: Turbine) {
        self.turbines.push(turbine);
    }

    /// Remove a turbine from the view; true if it was present
    ///
    /// Clears the selection if it pointed at the removed turbine.
    pub fn remove_turbine(&mut self, id: &str) -> bool {
        if matches!(&self.selected, Some(AssetRef::Turbine(sel)) if sel == id) {
            self.selected = None;
        }
        let before = self.turbines.len();
        self.turbines.retain(|t| t.id != id);
        self.turbines.len() != before
    }

    /// Set a turbine's status; true if the turbine exists
    pub fn set_turbine_status(&mut self, id: &str, status: AssetStatus) -> bool {
        match self.turbines.iter_mut().find(|t| t.id == id) {
            Some(t) => {
                t.status = status;
                true
            }
            None => false,
        }
    }

    /// Move a turbine; true if the turbine exists
    pub fn set_turbine_position(&mut self, id: &str, position: Position) -> bool {
        match self.turbines.iter_mut().find(|t| t.id == id) {
            Some(t) => {
                t.position = position;
                true
            }
            None => false,
        }
    }

    /// Apply a telemetry reading; true if the turbine exists
    pub fn apply_telemetry(&mut self, id: &str, telemetry: &Telemetry) -> bool {
        match self.turbines.iter_mut().find(|t| t.id == id) {
            Some(t) => {
                t.apply_telemetry(telemetry);
                true
            }
            None => false,
        }
    }

    // ===== Substations =====

    pub fn substations(&self) -> &[Substation] {
        &self.substations
    }

    pub fn substation(&self, id: &str) -> Option<&Substation> {
        self.substations.iter().find(|s| s.id == id)
    }

    pub fn add_substation(&mut self, substation: Substation) {
        self.substations.push(substation);
    }

    pub fn remove_substation(&mut self, id: &str) -> bool {
        if matches!(&self.selected, Some(AssetRef::Substation(sel)) if sel == id) {
            self.selected = None;
        }
        let before = self.substations.len();
        self.substations.retain(|s| s.id != id);
        self.substations.len() != before
    }

    pub fn set_substation_position(&mut self, id: &str, position: Position) -> bool {
        match self.substations.iter_mut().find(|s| s.id == id) {
            Some(s) => {
                s.position = position;
                true
            }
            None => false,
        }
    }

    // ===== Connections =====

    pub fn connections(&self) -> &[Connection] {
        &self.connections
    }

    pub fn connection(&self, id: i64) -> Option<&Connection> {
        self.connections.iter().find(|c| c.id == id)
    }

    pub fn add_connection(&mut self, connection: Connection) {
        self.connections.push(connection);
    }

    pub fn remove_connection(&mut self, id: i64) -> bool {
        let before = self.connections.len();
        self.connections.retain(|c| c.id != id);
        self.connections.len() != before
    }

    /// Remove every connection touching the asset, returning how many went
    pub fn remove_connections_for(&mut self, asset: &AssetRef) -> usize {
        let before = self.connections.len();
        self.connections.retain(|c| !c.touches(asset));
        before - self.connections.len()
    }

    pub fn set_connection_status(&mut self, id: i64, status: AssetStatus) -> bool {
        match self.connections.iter_mut().find(|c| c.id == id) {
            Some(c) => {
                c.status = status;
                true
            }
            None => false,
        }
    }

    // ===== Event feed =====

    /// Prepend an event to the feed, evicting the oldest past [`MAX_EVENTS`]
    pub fn push_event(&mut self, event: TurbineEvent) {
        self.events.push_front(event);
        if self.events.len() > MAX_EVENTS {
            self.events.pop_back();
        }
    }

    /// Drop feed entries for a deleted turbine
    pub fn drop_events_for(&mut self, turbine_id: &str) {
        self.events.retain(|e| e.turbine_id != turbine_id);
    }

    /// Most recent events across the farm, newest first
    pub fn recent_events(&self, limit: usize) -> Vec<TurbineEvent> {
        self.events.iter().take(limit).cloned().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::AssetRef;

    fn turbine(id: &str) -> Turbine {
        Turbine::new(id, format!("Turbine {id}"), Position::new(56.4, 8.1))
    }

    fn event(turbine_id: &str, text: &str) -> TurbineEvent {
        TurbineEvent {
            turbine_id: turbine_id.to_string(),
            event: text.to_string(),
            priority: 3,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn test_default_state_is_empty_and_starting() {
        let state = FarmState::default();
        assert!(state.turbines().is_empty());
        assert_eq!(state.status, ServiceStatus::Starting);
        assert!(state.loaded_at.is_none());
    }

    #[test]
    fn test_replace_all_marks_monitoring() {
        let mut state = FarmState::new();
        state.replace_all(vec![turbine("T-01")], vec![], vec![]);
        assert_eq!(state.status, ServiceStatus::Monitoring);
        assert!(state.loaded_at.is_some());
        assert_eq!(state.turbines().len(), 1);
    }

    #[test]
    fn test_setters_report_missing_assets() {
        let mut state = FarmState::new();
        state.add_turbine(turbine("T-01"));

        assert!(state.set_turbine_status("T-01", AssetStatus::Warning));
        assert!(!state.set_turbine_status("T-99", AssetStatus::Warning));
        assert_eq!(state.turbine("T-01").map(|t| t.status), Some(AssetStatus::Warning));
    }

    #[test]
    fn test_event_feed_is_newest_first_and_bounded() {
        let mut state = FarmState::new();
        for i in 0..(MAX_EVENTS + 10) {
            state.push_event(event("T-01", &format!("event {i}")));
        }
        let recent = state.recent_events(2);
        assert_eq!(recent[0].event, format!("event {}", MAX_EVENTS + 9));
        assert_eq!(recent[1].event, format!("event {}", MAX_EVENTS + 8));
        assert_eq!(state.recent_events(usize::MAX).len(), MAX_EVENTS);
    }

    #[test]
    fn test_connection_sweep_is_kind_aware() {
        let mut state = FarmState::new();
        state.add_connection(Connection {
            id: 1,
            from: AssetRef::Turbine("X".into()),
            to: AssetRef::Substation("S-01".into()),
            status: AssetStatus::Normal,
            kind: "turbine-substation".into(),
        });
        state.add_connection(Connection {
            id: 2,
            from: AssetRef::Substation("X".into()),
            to: AssetRef::Turbine("T-09".into()),
            status: AssetStatus::Normal,
            kind: "turbine-substation".into(),
        });

        // substation "X" shares the id but not the kind
        assert_eq!(state.remove_connections_for(&AssetRef::Turbine("X".into())), 1);
        assert_eq!(state.connections().len(), 1);
        assert_eq!(state.connections()[0].id, 2);
    }

    #[test]
    fn test_selection_follows_asset_lifecycle() {
        let mut state = FarmState::new();
        state.add_turbine(turbine("T-01"));

        assert!(!state.select(AssetRef::Turbine("T-99".into())));
        assert!(state.selected().is_none());

        assert!(state.select(AssetRef::Turbine("T-01".into())));
        assert_eq!(state.selected(), Some(&AssetRef::Turbine("T-01".into())));

        // removing another turbine keeps the selection
        state.remove_turbine("T-02");
        assert!(state.selected().is_some());

        // removing the selected turbine clears it
        state.remove_turbine("T-01");
        assert!(state.selected().is_none());
    }

    #[test]
    fn test_replace_all_drops_selection() {
        let mut state = FarmState::new();
        state.add_turbine(turbine("T-01"));
        assert!(state.select(AssetRef::Turbine("T-01".into())));

        state.replace_all(vec![turbine("T-02")], vec![], vec![]);
        assert!(state.selected().is_none());
    }
}
