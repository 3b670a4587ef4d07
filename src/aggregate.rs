//! Farm-wide aggregation
//!
//! Reduces the asset collections to the headline numbers the dashboard shows:
//! status counts, total output, and fleet means. Pure functions over slices;
//! the in-memory state calls these on demand.

use serde::{Deserialize, Serialize};

use crate::types::{AssetStatus, Connection, Substation, Turbine};

/// Turbine counts per operational status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct StatusCounts {
    pub normal: usize,
    pub warning: usize,
    pub error: usize,
}

/// Headline numbers for the whole farm
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct FarmSummary {
    pub turbines: usize,
    pub substations: usize,
    pub connections: usize,
    pub status_counts: StatusCounts,
    /// Sum of instantaneous output across all turbines (MW)
    pub total_power_mw: f64,
    pub avg_power_mw: f64,
    pub avg_wind_speed_ms: f64,
    pub avg_temperature_c: f64,
    pub avg_humidity_pct: f64,
}

/// Reduce the farm to its summary
///
/// Means divide by `max(count, 1)` so an empty farm reports zeros instead of
/// NaN on a freshly provisioned deployment.
pub fn summarize(
    turbines: &[Turbine],
    substations: &[Substation],
    connections: &[Connection],
) -> FarmSummary {
    let mut counts = StatusCounts::default();
    let mut total_power = 0.0;
    let mut total_wind = 0.0;
    let mut total_temp = 0.0;
    let mut total_humidity = 0.0;

    for turbine in turbines {
        match turbine.status {
            AssetStatus::Normal => counts.normal += 1,
            AssetStatus::Warning => counts.warning += 1,
            AssetStatus::Error => counts.error += 1,
        }
        total_power += turbine.power;
        total_wind += turbine.wind_speed;
        total_temp += turbine.temperature;
        total_humidity += turbine.humidity;
    }

    let divisor = turbines.len().max(1) as f64;

    FarmSummary {
        turbines: turbines.len(),
        substations: substations.len(),
        connections: connections.len(),
        status_counts: counts,
        total_power_mw: total_power,
        avg_power_mw: total_power / divisor,
        avg_wind_speed_ms: total_wind / divisor,
        avg_temperature_c: total_temp / divisor,
        avg_humidity_pct: total_humidity / divisor,
    }
}
