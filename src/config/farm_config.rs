//! Farm Configuration - deployment-tunable values as TOML
//!
//! Every section implements `Default`, so a missing or partial config file
//! degrades cleanly to the built-in values.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{info, warn};

// ============================================================================
// Top-Level Config
// ============================================================================

/// Root configuration for a farm deployment.
///
/// Load with `FarmConfig::load()` which searches:
/// 1. `$WINDWARD_CONFIG` env var
/// 2. `./farm_config.toml`
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct FarmConfig {
    /// Farm identification
    #[serde(default)]
    pub farm: FarmInfo,

    /// HTTP server configuration
    #[serde(default)]
    pub server: ServerConfig,

    /// Database client configuration
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Telemetry simulator tuning
    #[serde(default)]
    pub simulation: SimulationConfig,

    /// History serving limits and load debounce
    #[serde(default)]
    pub history: HistoryConfig,
}

impl FarmConfig {
    /// Load configuration using the standard search order:
    /// 1. `$WINDWARD_CONFIG` environment variable
    /// 2. `./farm_config.toml` in the current working directory
    /// 3. Built-in defaults
    pub fn load() -> Self {
        // 1. Check env var
        if let Ok(path) = std::env::var("WINDWARD_CONFIG") {
            let p = PathBuf::from(&path);
            if p.exists() {
                match Self::load_from_file(&p) {
                    Ok(config) => {
                        info!(path = %p.display(), farm = %config.farm.name, "Loaded farm config from WINDWARD_CONFIG");
                        return config;
                    }
                    Err(e) => {
                        warn!(path = %p.display(), error = %e, "Failed to load config from WINDWARD_CONFIG, falling back");
                    }
                }
            } else {
                warn!(path = %path, "WINDWARD_CONFIG points to non-existent file, falling back");
            }
        }

        // 2. Check ./farm_config.toml
        let local = PathBuf::from("farm_config.toml");
        if local.exists() {
            match Self::load_from_file(&local) {
                Ok(config) => {
                    info!(farm = %config.farm.name, "Loaded farm config from ./farm_config.toml");
                    return config;
                }
                Err(e) => {
                    warn!(error = %e, "Failed to load ./farm_config.toml, using defaults");
                }
            }
        }

        // 3. Defaults
        info!("No farm_config.toml found — using built-in defaults");
        Self::default()
    }

    /// Load from a specific TOML file path.
    pub fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents =
            std::fs::read_to_string(path).map_err(|e| ConfigError::Io(path.to_path_buf(), e))?;
        let config: Self =
            toml::from_str(&contents).map_err(|e| ConfigError::Parse(path.to_path_buf(), e))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate semantic consistency of loaded values.
    ///
    /// - Pool sizes, intervals, and tick counts must be > 0
    /// - The default history page size must not exceed the maximum
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut errors: Vec<String> = Vec::new();

        if self.database.max_connections == 0 {
            errors.push("database.max_connections must be > 0".to_string());
        }
        if self.database.acquire_timeout_secs == 0 {
            errors.push("database.acquire_timeout_secs must be > 0".to_string());
        }
        if self.simulation.interval_secs == 0 {
            errors.push("simulation.interval_secs must be > 0".to_string());
        }
        if self.simulation.record_every_ticks == 0 {
            errors.push("simulation.record_every_ticks must be > 0".to_string());
        }
        if self.history.default_limit == 0 {
            errors.push("history.default_limit must be > 0".to_string());
        }
        if self.history.default_limit > self.history.max_limit {
            errors.push(format!(
                "history.default_limit ({}) must not exceed history.max_limit ({})",
                self.history.default_limit, self.history.max_limit
            ));
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(ConfigError::Validation(errors))
        }
    }
}

// ============================================================================
// Error Type
// ============================================================================

#[derive(Debug)]
pub enum ConfigError {
    Io(PathBuf, std::io::Error),
    Parse(PathBuf, toml::de::Error),
    Validation(Vec<String>),
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::Io(path, e) => write!(f, "Config I/O error ({}): {}", path.display(), e),
            ConfigError::Parse(path, e) => {
                write!(f, "Config parse error ({}): {}", path.display(), e)
            }
            ConfigError::Validation(errors) => {
                writeln!(f, "Config validation failed:")?;
                for e in errors {
                    writeln!(f, "  - {}", e)?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ConfigError {}

// ============================================================================
// Farm Info
// ============================================================================

/// Identification metadata — not used for logic, but appears in logs and the
/// farm summary.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FarmInfo {
    #[serde(default = "default_farm_name")]
    pub name: String,
    #[serde(default = "default_operator")]
    pub operator: String,
}

fn default_farm_name() -> String {
    "Horns Rev Demo".to_string()
}

fn default_operator() -> String {
    "unassigned".to_string()
}

impl Default for FarmInfo {
    fn default() -> Self {
        Self {
            name: default_farm_name(),
            operator: default_operator(),
        }
    }
}

// ============================================================================
// Server Config
// ============================================================================

/// HTTP server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// HTTP server bind address.
    ///
    /// Can be overridden by the `--addr` CLI flag.
    #[serde(default = "default_server_addr")]
    pub addr: String,
}

fn default_server_addr() -> String {
    "0.0.0.0:8080".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            addr: default_server_addr(),
        }
    }
}

// ============================================================================
// Database Config
// ============================================================================

/// Database client configuration.
///
/// The connection URL is usually supplied via the `DATABASE_URL` environment
/// variable; a value here takes precedence when set.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    /// Connection URL; falls back to `$DATABASE_URL` when absent.
    #[serde(default)]
    pub url: Option<String>,
    /// Connection pool size.
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// Seconds to wait for a pooled connection before failing the query.
    #[serde(default = "default_acquire_timeout_secs")]
    pub acquire_timeout_secs: u64,
}

fn default_max_connections() -> u32 {
    5
}

fn default_acquire_timeout_secs() -> u64 {
    5
}

impl DatabaseConfig {
    /// Effective connection URL: explicit config wins, then `$DATABASE_URL`.
    pub fn effective_url(&self) -> Option<String> {
        self.url
            .clone()
            .or_else(|| std::env::var("DATABASE_URL").ok())
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: None,
            max_connections: default_max_connections(),
            acquire_timeout_secs: default_acquire_timeout_secs(),
        }
    }
}

// ============================================================================
// Simulation Config
// ============================================================================

/// Telemetry simulator tuning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimulationConfig {
    /// Whether the simulator task runs at all.
    #[serde(default = "default_sim_enabled")]
    pub enabled: bool,
    /// Seconds between telemetry ticks.
    #[serde(default = "default_sim_interval_secs")]
    pub interval_secs: u64,
    /// Persist telemetry, record history, and re-score every N ticks;
    /// other ticks only refresh the live view.
    #[serde(default = "default_record_every_ticks")]
    pub record_every_ticks: u32,
    /// Fixed RNG seed for reproducible runs; random when absent.
    #[serde(default)]
    pub seed: Option<u64>,
}

fn default_sim_enabled() -> bool {
    true
}

fn default_sim_interval_secs() -> u64 {
    5
}

fn default_record_every_ticks() -> u32 {
    6
}

impl Default for SimulationConfig {
    fn default() -> Self {
        Self {
            enabled: default_sim_enabled(),
            interval_secs: default_sim_interval_secs(),
            record_every_ticks: default_record_every_ticks(),
            seed: None,
        }
    }
}

// ============================================================================
// History Config
// ============================================================================

/// History serving limits and load debounce.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HistoryConfig {
    /// Rows returned when the client does not pass a limit.
    #[serde(default = "default_history_limit")]
    pub default_limit: u32,
    /// Hard cap on requested limits.
    #[serde(default = "default_history_max_limit")]
    pub max_limit: u32,
    /// Milliseconds a history load waits for the selection to settle before
    /// querying the store.
    #[serde(default = "default_debounce_ms")]
    pub debounce_ms: u64,
}

fn default_history_limit() -> u32 {
    50
}

fn default_history_max_limit() -> u32 {
    500
}

fn default_debounce_ms() -> u64 {
    250
}

impl Default for HistoryConfig {
    fn default() -> Self {
        Self {
            default_limit: default_history_limit(),
            max_limit: default_history_max_limit(),
            debounce_ms: default_debounce_ms(),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
