//! Telemetry Simulator
//!
//! Background task that walks every turbine's sensor readings with small
//! Gaussian steps, so the dashboard shows live data without real hardware
//! on the wire. Most ticks only refresh the in-memory view; every Nth tick
//! (configurable) the readings are persisted, a power-curve sample is
//! recorded, and the turbine is re-scored.

use std::sync::Arc;
use std::time::Duration;

use rand::prelude::*;
use rand_distr::{Distribution, Normal};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::config::SimulationConfig;
use crate::controller::FarmController;
use crate::scoring::thresholds::{EXPECTED_POWER_MW, POWER_BAND_FRACTION};
use crate::types::{AssetStatus, PowerSample, Telemetry, Turbine};

// ============================================================================
// Walk Parameters
// ============================================================================

/// Per-tick step (std dev) for wind speed, m/s
const WIND_STEP_STD: f64 = 0.8;
/// Per-tick step for power output, MW
const POWER_STEP_STD: f64 = 0.35;
/// Per-tick step for nacelle temperature, degrees C
const TEMPERATURE_STEP_STD: f64 = 0.4;
/// Per-tick step for ambient humidity, percentage points
const HUMIDITY_STEP_STD: f64 = 1.5;

/// Wind speed ceiling, m/s (cut-out region)
const MAX_WIND_SPEED_MS: f64 = 30.0;
/// Nacelle temperature floor, degrees C
const MIN_TEMPERATURE_C: f64 = -5.0;
/// Nacelle temperature ceiling, degrees C
const MAX_TEMPERATURE_C: f64 = 45.0;
/// Humidity floor, percent
const MIN_HUMIDITY_PCT: f64 = 20.0;
/// Humidity ceiling, percent
const MAX_HUMIDITY_PCT: f64 = 100.0;

// ============================================================================
// Simulator
// ============================================================================

/// Walks turbine telemetry and periodically records history and health.
pub struct TelemetrySimulator {
    controller: Arc<FarmController>,
    rng: StdRng,
    interval: Duration,
    record_every_ticks: u64,
    ticks: u64,

    // Normal distributions
    wind_step: Normal<f64>,
    power_step: Normal<f64>,
    temperature_step: Normal<f64>,
    humidity_step: Normal<f64>,
}

impl TelemetrySimulator {
    pub fn new(controller: Arc<FarmController>, config: &SimulationConfig) -> Self {
        let rng = match config.seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };

        Self {
            controller,
            rng,
            interval: Duration::from_secs(config.interval_secs),
            record_every_ticks: u64::from(config.record_every_ticks.max(1)),
            ticks: 0,
            wind_step: Normal::new(0.0, WIND_STEP_STD).unwrap(),
            power_step: Normal::new(0.0, POWER_STEP_STD).unwrap(),
            temperature_step: Normal::new(0.0, TEMPERATURE_STEP_STD).unwrap(),
            humidity_step: Normal::new(0.0, HUMIDITY_STEP_STD).unwrap(),
        }
    }

    /// Drive the simulator until the cancellation token fires.
    pub async fn run(mut self, cancel_token: CancellationToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            record_every_ticks = self.record_every_ticks,
            "[Simulator] Started"
        );

        let mut ticker = tokio::time::interval(self.interval);
        loop {
            tokio::select! {
                _ = cancel_token.cancelled() => {
                    info!("[Simulator] Received shutdown signal, stopping");
                    return;
                }
                _ = ticker.tick() => {
                    self.tick().await;
                }
            }
        }
    }

    /// One simulation step across the whole farm.
    async fn tick(&mut self) {
        self.ticks += 1;
        let record = self.ticks % self.record_every_ticks == 0;

        let turbines: Vec<Turbine> = {
            let state = self.controller.state();
            let snapshot = state.read().await;
            snapshot.turbines().to_vec()
        };
        if turbines.is_empty() {
            return;
        }

        for turbine in &turbines {
            let telemetry = self.step(turbine);
            if record {
                self.record(&turbine.id, &telemetry).await;
            } else if !self.controller.apply_telemetry(&turbine.id, &telemetry).await {
                // turbine deleted between the snapshot and this update
                debug!(turbine_id = %turbine.id, "[Simulator] Skipped reading for removed turbine");
            }
        }

        if record {
            debug!(
                tick = self.ticks,
                turbines = turbines.len(),
                "[Simulator] Recorded telemetry, power curve, and health"
            );
        }
    }

    /// One Gaussian step for every sensor on a turbine.
    ///
    /// Turbines in error state produce no power until the fault clears;
    /// their environmental readings keep walking.
    fn step(&mut self, turbine: &Turbine) -> Telemetry {
        let wind_speed = (turbine.wind_speed + self.wind_step.sample(&mut self.rng))
            .clamp(0.0, MAX_WIND_SPEED_MS);
        let power = if turbine.status == AssetStatus::Error {
            0.0
        } else {
            (turbine.power + self.power_step.sample(&mut self.rng))
                .clamp(0.0, EXPECTED_POWER_MW * (1.0 + POWER_BAND_FRACTION))
        };
        let temperature = (turbine.temperature + self.temperature_step.sample(&mut self.rng))
            .clamp(MIN_TEMPERATURE_C, MAX_TEMPERATURE_C);
        let humidity = (turbine.humidity + self.humidity_step.sample(&mut self.rng))
            .clamp(MIN_HUMIDITY_PCT, MAX_HUMIDITY_PCT);

        Telemetry {
            power,
            wind_speed,
            temperature,
            humidity,
        }
    }

    /// Persist a reading, record a power-curve sample, and re-score the turbine.
    ///
    /// Failures are logged and skipped; the next record tick tries again.
    async fn record(&self, turbine_id: &str, telemetry: &Telemetry) {
        if let Err(e) = self.controller.record_telemetry(turbine_id, telemetry).await {
            warn!(turbine_id = %turbine_id, error = %e, "[Simulator] Failed to persist telemetry");
            return;
        }

        let sample = PowerSample {
            turbine_id: turbine_id.to_string(),
            power: telemetry.power,
            expected_power: EXPECTED_POWER_MW,
            upper_limit: EXPECTED_POWER_MW * (1.0 + POWER_BAND_FRACTION),
            lower_limit: EXPECTED_POWER_MW * (1.0 - POWER_BAND_FRACTION),
            recorded_at: chrono::Utc::now(),
        };
        if let Err(e) = self.controller.store().insert_power_sample(&sample).await {
            warn!(turbine_id = %turbine_id, error = %e, "[Simulator] Failed to record power sample");
        }

        if let Err(e) = self.controller.evaluate_turbine(turbine_id).await {
            warn!(turbine_id = %turbine_id, error = %e, "[Simulator] Health evaluation failed");
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state::FarmState;
    use crate::store::{MemoryStore, Store};
    use crate::types::Position;
    use tokio::sync::RwLock;

    fn sim_config(interval_secs: u64, record_every_ticks: u32, seed: u64) -> SimulationConfig {
        SimulationConfig {
            enabled: true,
            interval_secs,
            record_every_ticks,
            seed: Some(seed),
        }
    }

    async fn controller_with_turbine(status: AssetStatus) -> Arc<FarmController> {
        let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
        let state = Arc::new(RwLock::new(FarmState::new()));
        let ctl = Arc::new(FarmController::new(store, state));

        ctl.add_turbine("T-01", "Alpha 1", Position::new(55.53, 7.9))
            .await
            .unwrap();
        ctl.record_telemetry(
            "T-01",
            &Telemetry {
                power: 6.5,
                wind_speed: 11.0,
                temperature: 21.0,
                humidity: 74.0,
            },
        )
        .await
        .unwrap();
        if status != AssetStatus::Normal {
            ctl.set_turbine_status("T-01", status).await.unwrap();
        }
        ctl
    }

    async fn view_turbine(ctl: &FarmController, id: &str) -> Turbine {
        let state = ctl.state();
        let state = state.read().await;
        state.turbine(id).cloned().unwrap()
    }

    #[tokio::test]
    async fn test_step_keeps_readings_in_range() {
        let ctl = controller_with_turbine(AssetStatus::Normal).await;
        let mut sim = TelemetrySimulator::new(Arc::clone(&ctl), &sim_config(5, 6, 42));

        let mut turbine = view_turbine(&ctl, "T-01").await;
        // push the readings to the edges and keep walking
        turbine.wind_speed = 29.9;
        turbine.power = 8.7;
        turbine.temperature = 44.9;
        turbine.humidity = 99.5;

        for _ in 0..500 {
            let t = sim.step(&turbine);
            assert!((0.0..=MAX_WIND_SPEED_MS).contains(&t.wind_speed));
            assert!((0.0..=EXPECTED_POWER_MW * (1.0 + POWER_BAND_FRACTION)).contains(&t.power));
            assert!((MIN_TEMPERATURE_C..=MAX_TEMPERATURE_C).contains(&t.temperature));
            assert!((MIN_HUMIDITY_PCT..=MAX_HUMIDITY_PCT).contains(&t.humidity));
            turbine.apply_telemetry(&t);
        }
    }

    #[tokio::test]
    async fn test_error_turbine_produces_no_power() {
        let ctl = controller_with_turbine(AssetStatus::Error).await;
        let mut sim = TelemetrySimulator::new(Arc::clone(&ctl), &sim_config(5, 6, 42));

        let turbine = view_turbine(&ctl, "T-01").await;
        for _ in 0..20 {
            assert_eq!(sim.step(&turbine).power, 0.0);
        }
    }

    #[tokio::test]
    async fn test_view_only_tick_skips_the_store() {
        let ctl = controller_with_turbine(AssetStatus::Normal).await;
        // record_every_ticks high enough that the first ticks never persist
        let mut sim = TelemetrySimulator::new(Arc::clone(&ctl), &sim_config(5, 100, 42));

        sim.tick().await;

        let stored = &ctl.store().load_turbines().await.unwrap()[0];
        let viewed = view_turbine(&ctl, "T-01").await;
        // store still holds the seeded reading, the view has walked away
        assert_eq!(stored.power, 6.5);
        assert_eq!(stored.wind_speed, 11.0);
        assert!(
            viewed.wind_speed != stored.wind_speed
                || viewed.temperature != stored.temperature
                || viewed.humidity != stored.humidity
        );
        // only the commissioning backfill is on disk, nothing from the tick
        let power = ctl.store().load_power_history("T-01", 50).await.unwrap();
        assert_eq!(power.len() as i64, crate::controller::SEED_HISTORY_HOURS);
        assert!(ctl.store().load_health_history("T-01", 10).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_record_tick_persists_and_scores() {
        let ctl = controller_with_turbine(AssetStatus::Normal).await;
        // record on every tick
        let mut sim = TelemetrySimulator::new(Arc::clone(&ctl), &sim_config(5, 1, 42));

        sim.tick().await;
        // the health sample insert is spawned; let it land
        tokio::task::yield_now().await;

        let stored = &ctl.store().load_turbines().await.unwrap()[0];
        let viewed = view_turbine(&ctl, "T-01").await;
        assert_eq!(stored.power, viewed.power);
        assert_eq!(stored.wind_speed, viewed.wind_speed);

        // 24 backfilled rows from commissioning plus the one this tick wrote,
        // newest first, so the tick's sample leads the list
        let power = ctl.store().load_power_history("T-01", 50).await.unwrap();
        assert_eq!(power.len() as i64, crate::controller::SEED_HISTORY_HOURS + 1);
        assert_eq!(power[0].expected_power, EXPECTED_POWER_MW);
        assert_eq!(power[0].upper_limit, 8.8);
        assert_eq!(power[0].lower_limit, 7.2);
        assert_eq!(power[0].power, viewed.power);

        let health = ctl.store().load_health_history("T-01", 10).await.unwrap();
        assert_eq!(health.len(), 1);
    }

    #[tokio::test]
    async fn test_record_tick_raises_alert_for_tripped_turbine() {
        let ctl = controller_with_turbine(AssetStatus::Error).await;
        let mut sim = TelemetrySimulator::new(Arc::clone(&ctl), &sim_config(5, 1, 42));

        sim.tick().await;

        // error deduction + zero output efficiency deduction = score 40
        let alerts = ctl.alerts_for_turbine("T-01").await.unwrap();
        assert_eq!(alerts.len(), 1);
        assert_eq!(alerts[0].description, "Low health score detected: 40");
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_cancellation() {
        let ctl = controller_with_turbine(AssetStatus::Normal).await;
        let sim = TelemetrySimulator::new(Arc::clone(&ctl), &sim_config(5, 100, 42));

        let token = CancellationToken::new();
        let handle = tokio::spawn(sim.run(token.clone()));

        // first tick fires immediately, then every 5s
        tokio::time::sleep(Duration::from_secs(12)).await;
        token.cancel();
        handle.await.unwrap();

        let viewed = view_turbine(&ctl, "T-01").await;
        assert!(
            viewed.wind_speed != 11.0
                || viewed.temperature != 21.0
                || viewed.humidity != 74.0
        );
    }
}
