//! Server binary for the world turn clock.
//!
//! Wires the turn clock, the `PostgreSQL` turn store and the HTTP API
//! together and serves until the process is terminated.
//!
//! # Startup Sequence
//!
//! 1. Load configuration from `wts-config.yaml` (or `WTS_CONFIG`)
//! 2. Initialize structured logging (tracing)
//! 3. Build the phase schedule and turn clock
//! 4. Connect to `PostgreSQL` and run migrations
//! 5. Serve the HTTP API

mod error;

use std::path::PathBuf;
use std::sync::Arc;

use tracing::info;
use tracing_subscriber::EnvFilter;
use wts_api::{AppState, ServerConfig};
use wts_core::config::LoggingConfig;
use wts_core::{ConfiguredSchedule, GameConfig, TurnClock, TurnStore};
use wts_db::{PgTurnStore, PostgresPool};

use crate::error::AppError;

/// Default configuration file, relative to the working directory.
const DEFAULT_CONFIG_PATH: &str = "wts-config.yaml";

/// Application entry point.
///
/// # Errors
///
/// Returns an error if any initialization step or the server fails.
#[tokio::main]
async fn main() -> Result<(), AppError> {
    // 1. Load configuration.
    let (config, config_found) = load_config()?;

    // 2. Initialize structured logging.
    init_tracing(&config.logging);
    info!("wts-server starting");
    if !config_found {
        info!("Config file not found, using defaults");
    }
    info!(
        default_phase_minutes = config.clock.default_phase_minutes,
        phase_overrides = config.clock.phase_minutes.len(),
        first_turn_bonus_minutes = config.clock.first_turn_bonus_minutes,
        api_port = config.infrastructure.api_port,
        "Configuration loaded"
    );

    // 3. Build the clock.
    let schedule = ConfiguredSchedule::from_config(&config.clock)?;
    let clock = TurnClock::new(Arc::new(schedule));

    // 4. Connect to PostgreSQL.
    let pool = PostgresPool::connect(&config.infrastructure).await?;
    pool.run_migrations().await?;

    let store: Arc<dyn TurnStore> = Arc::new(PgTurnStore::new(pool.pool().clone(), clock.clone()));

    // 5. Serve.
    let server_config = ServerConfig::from_infrastructure(&config.infrastructure);
    let state = Arc::new(AppState::new(store, clock));
    let result = wts_api::start_server(&server_config, state).await;

    pool.close().await;
    result?;

    info!("wts-server stopped");
    Ok(())
}

/// Load configuration from `WTS_CONFIG` or `wts-config.yaml`.
///
/// A missing file is not an error: defaults are used, with environment
/// overrides still applied. The flag reports whether a file was read.
fn load_config() -> Result<(GameConfig, bool), AppError> {
    let config_path = std::env::var_os("WTS_CONFIG")
        .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from);
    if config_path.exists() {
        Ok((GameConfig::from_file(&config_path)?, true))
    } else {
        Ok((GameConfig::parse("")?, false))
    }
}

/// Install the global tracing subscriber.
///
/// `RUST_LOG` wins over the configured level when set.
fn init_tracing(logging: &LoggingConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);

    if logging.json {
        builder.json().init();
    } else {
        builder.init();
    }
}
