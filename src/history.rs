//! History loading with debounce and supersede
//!
//! Operators flick between turbines faster than the store can answer, and a
//! late response for a previously selected turbine must never overwrite the
//! panel for the current one. Each history stream tracks a generation
//! counter: a load captures the generation at entry, waits out a short
//! debounce so rapid reselections collapse, and checks the counter both
//! before and after the store query. A load that is no longer current
//! reports [`HistoryError::Superseded`] instead of data.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

use crate::store::{Store, StoreError};
use crate::types::{HealthSample, PowerSample};

/// History load errors
#[derive(Debug, thiserror::Error)]
pub enum HistoryError {
    /// A newer selection started while this load was in flight
    #[error("superseded by a newer selection")]
    Superseded,
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Monotonic per-stream generation counter
///
/// `begin` stamps a new load; `is_current` answers whether a stamped load is
/// still the latest. Any later `begin` invalidates earlier stamps.
#[derive(Debug, Default)]
struct Generation(AtomicU64);

impl Generation {
    fn begin(&self) -> u64 {
        self.0.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn is_current(&self, stamp: u64) -> bool {
        self.0.load(Ordering::SeqCst) == stamp
    }
}

/// Debounced, supersede-aware reader for per-turbine history
pub struct HistoryLoader {
    store: Arc<dyn Store>,
    power_generation: Generation,
    health_generation: Generation,
}

impl HistoryLoader {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            power_generation: Generation::default(),
            health_generation: Generation::default(),
        }
    }

    /// Load recent power samples for a turbine, newest first
    pub async fn load_power(
        &self,
        turbine_id: &str,
        limit: u32,
        debounce: Duration,
    ) -> Result<Vec<PowerSample>, HistoryError> {
        let stamp = self.power_generation.begin();

        tokio::time::sleep(debounce).await;
        if !self.power_generation.is_current(stamp) {
            debug!(turbine_id, stamp, "Power history load superseded during debounce");
            return Err(HistoryError::Superseded);
        }

        let rows = self.store.load_power_history(turbine_id, limit).await?;

        if !self.power_generation.is_current(stamp) {
            debug!(turbine_id, stamp, "Power history load superseded during query");
            return Err(HistoryError::Superseded);
        }
        Ok(rows)
    }

    /// Load recent health samples for a turbine, newest first
    pub async fn load_health(
        &self,
        turbine_id: &str,
        limit: u32,
        debounce: Duration,
    ) -> Result<Vec<HealthSample>, HistoryError> {
        let stamp = self.health_generation.begin();

        tokio::time::sleep(debounce).await;
        if !self.health_generation.is_current(stamp) {
            debug!(turbine_id, stamp, "Health history load superseded during debounce");
            return Err(HistoryError::Superseded);
        }

        let rows = self.store.load_health_history(turbine_id, limit).await?;

        if !self.health_generation.is_current(stamp) {
            debug!(turbine_id, stamp, "Health history load superseded during query");
            return Err(HistoryError::Superseded);
        }
        Ok(rows)
    }
}
