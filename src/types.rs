//! Shared data structures for offshore wind farm monitoring
//!
//! This module defines the core types flowing through the service:
//! - Assets: Turbine, Substation, Connection and the AssetRef endpoints
//! - Telemetry: instantaneous readings applied to a turbine
//! - Health: HealthScore (computed) and HealthSample (recorded)
//! - History: PowerSample, TurbineEvent
//! - Maintenance: MaintenanceAlert with its type/status enums

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

// ============================================================================
// Asset Status
// ============================================================================

/// Operational status of a turbine or connection
///
/// Statuses are exchanged in lowercase everywhere (API, database, event
/// descriptions), so Display mirrors the serde representation.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "lowercase")]
pub enum AssetStatus {
    #[default]
    Normal,
    Warning,
    Error,
}

impl AssetStatus {
    /// Lowercase wire/storage form
    pub fn as_str(&self) -> &'static str {
        match self {
            AssetStatus::Normal => "normal",
            AssetStatus::Warning => "warning",
            AssetStatus::Error => "error",
        }
    }

    /// Parse from the lowercase wire/storage form
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "normal" => Some(AssetStatus::Normal),
            "warning" => Some(AssetStatus::Warning),
            "error" => Some(AssetStatus::Error),
            _ => None,
        }
    }

    /// Next status in the demo cycle: normal -> warning -> error -> normal
    pub fn cycled(&self) -> Self {
        match self {
            AssetStatus::Normal => AssetStatus::Warning,
            AssetStatus::Warning => AssetStatus::Error,
            AssetStatus::Error => AssetStatus::Normal,
        }
    }

    /// Event log priority for a transition into this status
    /// (1 = most urgent, shown first in operator views)
    pub fn event_priority(&self) -> i32 {
        match self {
            AssetStatus::Error => 1,
            AssetStatus::Warning => 2,
            AssetStatus::Normal => 3,
        }
    }
}

impl std::fmt::Display for AssetStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

// ============================================================================
// Asset References
// ============================================================================

/// Endpoint of a connection, tagged with the asset kind
///
/// Connections carry the kind explicitly rather than inferring it from which
/// lookup table happens to contain the id.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(tag = "type", content = "id", rename_all = "lowercase")]
pub enum AssetRef {
    Turbine(String),
    Substation(String),
}

impl AssetRef {
    /// Asset id regardless of kind
    pub fn id(&self) -> &str {
        match self {
            AssetRef::Turbine(id) | AssetRef::Substation(id) => id,
        }
    }

    /// Lowercase kind tag as stored in the connections table
    pub fn kind(&self) -> &'static str {
        match self {
            AssetRef::Turbine(_) => "turbine",
            AssetRef::Substation(_) => "substation",
        }
    }

    /// Rebuild from the (id, kind) column pair
    pub fn from_parts(id: String, kind: &str) -> Option<Self> {
        match kind {
            "turbine" => Some(AssetRef::Turbine(id)),
            "substation" => Some(AssetRef::Substation(id)),
            _ => None,
        }
    }

    pub fn is_turbine(&self) -> bool {
        matches!(self, AssetRef::Turbine(_))
    }

    /// Wire value for a cable between this asset and another, as stored in
    /// the connections `type` column. Substation pairs have no value; export
    /// links between substations are not modeled.
    pub fn connection_kind(&self, other: &AssetRef) -> Option<&'static str> {
        match (self, other) {
            (AssetRef::Turbine(_), AssetRef::Turbine(_)) => Some("turbine-turbine"),
            (AssetRef::Substation(_), AssetRef::Substation(_)) => None,
            _ => Some("turbine-substation"),
        }
    }
}

impl std::fmt::Display for AssetRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.kind(), self.id())
    }
}

// ============================================================================
// Geographic Position
// ============================================================================

/// Geographic position of an asset (WGS84 degrees)
///
/// Stored as a native POINT column but exchanged with the database as text
/// in the `(longitude,latitude)` form, longitude being the x coordinate.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Position {
    pub latitude: f64,
    pub longitude: f64,
}

impl Position {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self { latitude, longitude }
    }

    /// Textual point form accepted by the database: `(x,y)` = `(lon,lat)`
    pub fn to_point_text(&self) -> String {
        format!("({},{})", self.longitude, self.latitude)
    }

    /// Parse the textual point form, tolerating surrounding whitespace
    pub fn parse_point_text(s: &str) -> Option<Self> {
        let inner = s.trim().strip_prefix('(')?.strip_suffix(')')?;
        let (x, y) = inner.split_once(',')?;
        let longitude: f64 = x.trim().parse().ok()?;
        let latitude: f64 = y.trim().parse().ok()?;
        Some(Self { latitude, longitude })
    }
}

// ============================================================================
// Farm Assets
// ============================================================================

/// A monitored offshore wind turbine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Turbine {
    pub id: String,
    pub name: String,
    pub position: Position,
    /// Instantaneous power output (MW)
    pub power: f64,
    /// Wind speed at nacelle height (m/s)
    pub wind_speed: f64,
    /// Nacelle temperature (deg C)
    pub temperature: f64,
    /// Relative humidity (%)
    pub humidity: f64,
    pub status: AssetStatus,
}

impl Turbine {
    /// New turbine with zeroed telemetry, awaiting its first readings
    pub fn new(id: impl Into<String>, name: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            position,
            power: 0.0,
            wind_speed: 0.0,
            temperature: 0.0,
            humidity: 0.0,
            status: AssetStatus::Normal,
        }
    }

    /// Apply a fresh telemetry reading in place
    pub fn apply_telemetry(&mut self, t: &Telemetry) {
        self.power = t.power;
        self.wind_speed = t.wind_speed;
        self.temperature = t.temperature;
        self.humidity = t.humidity;
    }
}

/// An offshore collector substation
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Substation {
    pub id: String,
    pub name: String,
    pub position: Position,
    /// Rated capacity (MW)
    pub capacity: f64,
    /// Current load (% of capacity)
    pub load: f64,
}

impl Substation {
    pub fn new(id: impl Into<String>, name: impl Into<String>, position: Position) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            position,
            capacity: 0.0,
            load: 0.0,
        }
    }
}

/// A cable run between two assets
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Connection {
    pub id: i64,
    pub from: AssetRef,
    pub to: AssetRef,
    pub status: AssetStatus,
    /// Cable classification: "turbine-turbine" or "turbine-substation",
    /// derived from the endpoint kinds (see [`AssetRef::connection_kind`])
    #[serde(rename = "type")]
    pub kind: String,
}

impl Connection {
    /// Whether either endpoint is the given turbine
    pub fn touches_turbine(&self, turbine_id: &str) -> bool {
        let hit = |r: &AssetRef| r.is_turbine() && r.id() == turbine_id;
        hit(&self.from) || hit(&self.to)
    }

    /// Whether either endpoint is the given asset
    pub fn touches(&self, asset: &AssetRef) -> bool {
        &self.from == asset || &self.to == asset
    }
}

/// Fields needed to create a connection; the id is assigned on insert
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewConnection {
    pub from: AssetRef,
    pub to: AssetRef,
    pub status: AssetStatus,
    #[serde(rename = "type")]
    pub kind: String,
}

// ============================================================================
// Telemetry
// ============================================================================

/// One instantaneous set of readings for a turbine
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct Telemetry {
    pub power: f64,
    pub wind_speed: f64,
    pub temperature: f64,
    pub humidity: f64,
}

// ============================================================================
// Health Scoring
// ============================================================================

/// Qualitative health band derived from the numeric score
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    #[default]
    Good,
    Warning,
    Critical,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            HealthStatus::Good => "good",
            HealthStatus::Warning => "warning",
            HealthStatus::Critical => "critical",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "good" => Some(HealthStatus::Good),
            "warning" => Some(HealthStatus::Warning),
            "critical" => Some(HealthStatus::Critical),
            _ => None,
        }
    }
}

impl std::fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Computed health assessment for one turbine
///
/// `issues` lists the human-readable findings behind the deductions, in the
/// order they were evaluated (status, then efficiency, then temperature).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthScore {
    /// 0-100, higher is healthier
    pub score: i32,
    pub status: HealthStatus,
    pub issues: Vec<String>,
}

/// One recorded health assessment, as persisted per turbine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct HealthSample {
    pub turbine_id: String,
    pub score: i32,
    pub status: HealthStatus,
    pub issues: Vec<String>,
    pub recorded_at: DateTime<Utc>,
}

impl HealthSample {
    /// Pair a computed score with its turbine and timestamp for recording
    pub fn from_score(turbine_id: impl Into<String>, score: &HealthScore, at: DateTime<Utc>) -> Self {
        Self {
            turbine_id: turbine_id.into(),
            score: score.score,
            status: score.status,
            issues: score.issues.clone(),
            recorded_at: at,
        }
    }
}

// ============================================================================
// Power History & Events
// ============================================================================

/// One recorded power reading with its expected envelope
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PowerSample {
    pub turbine_id: String,
    pub power: f64,
    pub expected_power: f64,
    pub upper_limit: f64,
    pub lower_limit: f64,
    pub recorded_at: DateTime<Utc>,
}

/// One operator-visible event in a turbine's log
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TurbineEvent {
    pub turbine_id: String,
    pub event: String,
    /// 1 = most urgent; see [`AssetStatus::event_priority`]
    pub priority: i32,
    pub created_at: DateTime<Utc>,
}

// ============================================================================
// Maintenance Alerts
// ============================================================================

/// Why a maintenance alert was raised
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    /// Raised automatically when a turbine's health score drops too low
    HealthScore,
    /// Planned maintenance window
    Scheduled,
    /// Manually raised urgent intervention
    Emergency,
}

impl AlertType {
    pub fn as_str(&self) -> &'static str {
        match self {
            AlertType::HealthScore => "health_score",
            AlertType::Scheduled => "scheduled",
            AlertType::Emergency => "emergency",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "health_score" => Some(AlertType::HealthScore),
            "scheduled" => Some(AlertType::Scheduled),
            "emergency" => Some(AlertType::Emergency),
            _ => None,
        }
    }
}

impl std::fmt::Display for AlertType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Workflow state of a maintenance alert
///
/// Alerts only ever move forward: pending -> in_progress -> completed.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default, Hash)]
#[serde(rename_all = "snake_case")]
pub enum MaintenanceStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl MaintenanceStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MaintenanceStatus::Pending => "pending",
            MaintenanceStatus::InProgress => "in_progress",
            MaintenanceStatus::Completed => "completed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(MaintenanceStatus::Pending),
            "in_progress" => Some(MaintenanceStatus::InProgress),
            "completed" => Some(MaintenanceStatus::Completed),
            _ => None,
        }
    }

    /// Next workflow state, or None once completed
    pub fn next(&self) -> Option<Self> {
        match self {
            MaintenanceStatus::Pending => Some(MaintenanceStatus::InProgress),
            MaintenanceStatus::InProgress => Some(MaintenanceStatus::Completed),
            MaintenanceStatus::Completed => None,
        }
    }
}

impl std::fmt::Display for MaintenanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// A maintenance work item against a turbine
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct MaintenanceAlert {
    pub id: i64,
    pub turbine_id: String,
    pub alert_type: AlertType,
    pub status: MaintenanceStatus,
    pub description: String,
    /// Score that triggered the alert, for health-score alerts
    pub health_score: Option<i32>,
    pub assigned_to: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Fields needed to open a new alert; id and timestamp are assigned on insert
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NewAlert {
    pub turbine_id: String,
    pub alert_type: AlertType,
    pub status: MaintenanceStatus,
    pub description: String,
    pub health_score: Option<i32>,
    pub assigned_to: Option<String>,
}
