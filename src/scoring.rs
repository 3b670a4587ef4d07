//! Turbine health scoring
//!
//! Produces a 0-100 health score per turbine from its operational status and
//! latest telemetry. Scoring is a pure deduction model:
//!
//! - Start at 100
//! - Deduct for a degraded status (error worse than warning)
//! - Deduct for low power conversion efficiency against nameplate output
//! - Deduct for elevated nacelle temperature
//!
//! Each deduction contributes a human-readable finding; findings are reported
//! in evaluation order (status, then efficiency, then temperature) so the
//! dashboard issue list reads the same way every time.

use crate::types::{AssetStatus, HealthScore, HealthStatus, Turbine};

// ============================================================================
// Scoring Thresholds
// ============================================================================

/// Thresholds and deduction weights for the health model
pub mod thresholds {
    /// Nameplate turbine output used as the efficiency reference (MW)
    pub const EXPECTED_POWER_MW: f64 = 8.0;
    /// Width of the power-curve chart band around nameplate output, as a
    /// fraction of it. Recorded with every power history sample.
    pub const POWER_BAND_FRACTION: f64 = 0.1;

    /// Efficiency (% of nameplate) below which output counts as low
    pub const EFFICIENCY_LOW_PCT: f64 = 60.0;
    /// Efficiency (% of nameplate) below which output counts as reduced
    pub const EFFICIENCY_REDUCED_PCT: f64 = 80.0;

    /// Nacelle temperature (deg C) above which heat is a serious finding
    pub const TEMPERATURE_HIGH_C: f64 = 35.0;
    /// Nacelle temperature (deg C) above which heat is worth noting
    pub const TEMPERATURE_ELEVATED_C: f64 = 30.0;

    /// Deduction for a turbine in error state
    pub const DEDUCT_STATUS_ERROR: i32 = 40;
    /// Deduction for a turbine flagged for maintenance
    pub const DEDUCT_STATUS_WARNING: i32 = 20;
    /// Deduction for low efficiency
    pub const DEDUCT_EFFICIENCY_LOW: i32 = 20;
    /// Deduction for reduced efficiency
    pub const DEDUCT_EFFICIENCY_REDUCED: i32 = 10;
    /// Deduction for high temperature
    pub const DEDUCT_TEMPERATURE_HIGH: i32 = 15;
    /// Deduction for slightly elevated temperature
    pub const DEDUCT_TEMPERATURE_ELEVATED: i32 = 5;

    /// Minimum score for the "good" band
    pub const BAND_GOOD_MIN: i32 = 80;
    /// Minimum score for the "warning" band; below is "critical"
    pub const BAND_WARNING_MIN: i32 = 60;
}

// ============================================================================
// Scoring
// ============================================================================

/// Compute the health score for one turbine reading
///
/// Pure function of (status, power, temperature); wind speed and humidity do
/// not enter the model. The score is clamped to 0 so downstream consumers can
/// rely on the 0-100 range whatever weights are configured above.
pub fn calculate_health_score(status: AssetStatus, power_mw: f64, temperature_c: f64) -> HealthScore {
    use thresholds::*;

    let mut deductions = 0;
    let mut issues = Vec::new();

    match status {
        AssetStatus::Error => {
            deductions += DEDUCT_STATUS_ERROR;
            issues.push("Turbine in error state".to_string());
        }
        AssetStatus::Warning => {
            deductions += DEDUCT_STATUS_WARNING;
            issues.push("Turbine needs maintenance".to_string());
        }
        AssetStatus::Normal => {}
    }

    let efficiency = power_mw / EXPECTED_POWER_MW * 100.0;
    if efficiency < EFFICIENCY_LOW_PCT {
        deductions += DEDUCT_EFFICIENCY_LOW;
        issues.push("Low power generation efficiency".to_string());
    } else if efficiency < EFFICIENCY_REDUCED_PCT {
        deductions += DEDUCT_EFFICIENCY_REDUCED;
        issues.push("Reduced power generation".to_string());
    }

    if temperature_c > TEMPERATURE_HIGH_C {
        deductions += DEDUCT_TEMPERATURE_HIGH;
        issues.push("High temperature detected".to_string());
    } else if temperature_c > TEMPERATURE_ELEVATED_C {
        deductions += DEDUCT_TEMPERATURE_ELEVATED;
        issues.push("Temperature slightly elevated".to_string());
    }

    let score = (100 - deductions).max(0);

    HealthScore {
        score,
        status: band(score),
        issues,
    }
}

/// Score a turbine from its current state and telemetry
pub fn score_turbine(turbine: &Turbine) -> HealthScore {
    calculate_health_score(turbine.status, turbine.power, turbine.temperature)
}

fn band(score: i32) -> HealthStatus {
    if score >= thresholds::BAND_GOOD_MIN {
        HealthStatus::Good
    } else if score >= thresholds::BAND_WARNING_MIN {
        HealthStatus::Warning
    } else {
        HealthStatus::Critical
    }
}
