//! Windward - Offshore Wind Farm Monitoring
//!
//! Backend service for the wind-farm monitoring dashboard: asset registry,
//! live telemetry, turbine health scoring, and maintenance alerting.
//!
//! # Usage
//!
//! ```bash
//! # Against PostgreSQL (DATABASE_URL or [database].url in farm_config.toml)
//! cargo run --release
//!
//! # No database: volatile in-memory store with a demo layout
//! cargo run --release -- --memory --seed-demo
//! ```
//!
//! # Environment Variables
//!
//! - `DATABASE_URL`: PostgreSQL connection string
//! - `WINDWARD_CONFIG`: Path to a TOML config file
//! - `WINDWARD_CORS_ORIGINS`: Comma-separated allowed CORS origins (dev only)
//! - `RUST_LOG`: Logging level (default: info)

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use windward::api::{create_app, ApiContext};
use windward::config::{self, FarmConfig, SimulationConfig};
use windward::controller::FarmController;
use windward::sim::TelemetrySimulator;
use windward::state::{FarmState, ServiceStatus};
use windward::store::{MemoryStore, PgStore, Store};

// ============================================================================
// CLI Arguments
// ============================================================================

#[derive(Parser, Debug)]
#[command(name = "windward")]
#[command(about = "Offshore wind farm monitoring backend")]
#[command(version)]
struct CliArgs {
    /// Override the server address (default: "0.0.0.0:8080")
    #[arg(short, long)]
    addr: Option<String>,

    /// Run against a volatile in-memory store instead of PostgreSQL
    #[arg(long)]
    memory: bool,

    /// Populate an empty farm with a small demo layout on startup
    #[arg(long)]
    seed_demo: bool,

    /// Fix the telemetry simulator's RNG seed for reproducible runs
    #[arg(long, value_name = "SEED")]
    sim_seed: Option<u64>,
}

// ============================================================================
// Task Names
// ============================================================================

/// Names for supervised background tasks.
#[derive(Debug, Clone, Copy)]
enum TaskName {
    HttpServer,
    Simulator,
}

impl std::fmt::Display for TaskName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskName::HttpServer => write!(f, "HttpServer"),
            TaskName::Simulator => write!(f, "Simulator"),
        }
    }
}

// ============================================================================
// Store Selection
// ============================================================================

/// Open the configured store backend and prepare it for use.
async fn build_store(use_memory: bool) -> Result<Arc<dyn Store>> {
    if use_memory {
        info!("✓ Store: volatile in-memory backend (--memory)");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let db = &config::get().database;
    let url = match &db.url {
        Some(url) => url.clone(),
        None => std::env::var("DATABASE_URL").context(
            "DATABASE_URL not set and [database].url absent; pass --memory to run without PostgreSQL",
        )?,
    };

    let store = PgStore::connect(&url, db.max_connections, db.acquire_timeout_secs)
        .await
        .context("Failed to connect to PostgreSQL")?;
    store
        .migrate()
        .await
        .context("Failed to run database migrations")?;
    info!("✓ Store: PostgreSQL backend ready");
    Ok(Arc::new(store))
}

// ============================================================================
// Task Spawning
// ============================================================================

/// Spawn the HTTP server task into the JoinSet.
fn spawn_http_server(
    task_set: &mut JoinSet<Result<TaskName>>,
    listener: tokio::net::TcpListener,
    app: axum::Router,
    cancel_token: CancellationToken,
) {
    task_set.spawn(async move {
        info!("[HttpServer] Task starting");

        let result = axum::serve(listener, app)
            .with_graceful_shutdown(async move {
                cancel_token.cancelled().await;
                info!("[HttpServer] Received shutdown signal");
            })
            .await;

        match result {
            Ok(()) => {
                info!("[HttpServer] Graceful shutdown complete");
                Ok(TaskName::HttpServer)
            }
            Err(e) => {
                error!("[HttpServer] Server error: {}", e);
                Err(anyhow::anyhow!("HTTP server error: {}", e))
            }
        }
    });
}

/// Spawn the telemetry simulator task into the JoinSet.
fn spawn_simulator(
    task_set: &mut JoinSet<Result<TaskName>>,
    controller: Arc<FarmController>,
    sim_config: &SimulationConfig,
    cancel_token: CancellationToken,
) {
    let simulator = TelemetrySimulator::new(controller, sim_config);
    task_set.spawn(async move {
        simulator.run(cancel_token).await;
        Ok(TaskName::Simulator)
    });
}

// ============================================================================
// Supervisor
// ============================================================================

/// Run the supervisor loop: monitor tasks, degrade or cancel on failure.
///
/// A task returning an error is fatal. A task that exits cleanly while no
/// shutdown is in flight leaves the service up but marked degraded.
async fn run_supervisor(
    task_set: &mut JoinSet<Result<TaskName>>,
    state: Arc<RwLock<FarmState>>,
    cancel_token: CancellationToken,
) -> Result<()> {
    info!("Supervisor: all tasks spawned, monitoring");

    loop {
        tokio::select! {
            _ = cancel_token.cancelled() => {
                info!("Supervisor: shutdown signal received");
                break;
            }
            result = task_set.join_next() => {
                match result {
                    Some(Ok(Ok(task_name))) => {
                        if cancel_token.is_cancelled() {
                            info!("Supervisor: task {} completed normally", task_name);
                        } else {
                            warn!("Supervisor: task {} exited unexpectedly, service degraded", task_name);
                            state.write().await.status = ServiceStatus::Degraded;
                        }
                    }
                    Some(Ok(Err(e))) => {
                        error!("Supervisor: task failed: {}", e);
                        state.write().await.status = ServiceStatus::Degraded;
                        cancel_token.cancel();
                        return Err(e);
                    }
                    Some(Err(e)) => {
                        error!("Supervisor: task panicked: {}", e);
                        state.write().await.status = ServiceStatus::Degraded;
                        cancel_token.cancel();
                        return Err(anyhow::anyhow!("Task panicked: {}", e));
                    }
                    None => {
                        info!("Supervisor: all tasks completed");
                        break;
                    }
                }
            }
        }
    }

    // Drain remaining tasks so their shutdown logs land before exit
    while let Some(result) = task_set.join_next().await {
        match result {
            Ok(Ok(task_name)) => info!("Supervisor: task {} stopped", task_name),
            Ok(Err(e)) => warn!("Supervisor: task error during shutdown: {}", e),
            Err(e) => warn!("Supervisor: task panicked during shutdown: {}", e),
        }
    }

    Ok(())
}

// ============================================================================
// Main Entry Point
// ============================================================================

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with_target(false)
        .init();

    let args = CliArgs::parse();

    // Load farm configuration
    let mut farm_config = FarmConfig::load();
    if let Some(seed) = args.sim_seed {
        farm_config.simulation.seed = Some(seed);
    }
    let server_addr = args
        .addr
        .clone()
        .unwrap_or_else(|| farm_config.server.addr.clone());

    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("  Windward - Offshore Wind Farm Monitoring");
    info!("  Farm: {} | Operator: {}", farm_config.farm.name, farm_config.farm.operator);
    info!("━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━━");
    info!("");

    config::init(farm_config);

    // Store, shared view, controller
    let store = build_store(args.memory).await?;
    let state = Arc::new(RwLock::new(FarmState::new()));
    let controller = Arc::new(FarmController::new(store, Arc::clone(&state)));

    controller
        .load_farm()
        .await
        .context("Failed to load farm from store")?;

    if args.seed_demo {
        controller
            .seed_demo()
            .await
            .context("Failed to seed demo farm")?;
    }

    // HTTP app and listener
    let app = create_app(ApiContext::new(Arc::clone(&controller)));
    let listener = tokio::net::TcpListener::bind(&server_addr)
        .await
        .with_context(|| format!("Failed to bind to {}", server_addr))?;
    info!("✓ HTTP server listening on {}", server_addr);
    info!("");
    info!("🎯 Dashboard API available at: http://{}/api/v1", server_addr);
    info!("");

    // Graceful shutdown via Ctrl+C
    let cancel_token = CancellationToken::new();
    let shutdown_token = cancel_token.clone();
    tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("🛑 Received Ctrl+C, initiating shutdown...");
        shutdown_token.cancel();
    });

    let mut task_set: JoinSet<Result<TaskName>> = JoinSet::new();

    // Task 1: HTTP server
    spawn_http_server(&mut task_set, listener, app, cancel_token.clone());

    // Task 2: Telemetry simulator
    let sim_config = &config::get().simulation;
    if sim_config.enabled {
        spawn_simulator(
            &mut task_set,
            Arc::clone(&controller),
            sim_config,
            cancel_token.clone(),
        );
    } else {
        info!("Telemetry simulator disabled in config");
    }

    run_supervisor(&mut task_set, state, cancel_token).await?;

    info!("");
    info!("✓ Windward shutdown complete");
    Ok(())
}
