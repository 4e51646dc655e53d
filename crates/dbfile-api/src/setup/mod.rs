//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod storage;
pub mod validation;

use crate::state::AppState;
use anyhow::{Context, Result};
use dbfile_core::{Config, StorageBackend};
use std::sync::Arc;

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router)> {
    crate::telemetry::init_telemetry()
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    // Fail fast on misconfiguration
    validation::validate_config(&config).context("Configuration validation failed")?;
    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    let pool = match config.storage_backend() {
        StorageBackend::Postgres => Some(database::setup_database(&config).await?),
        StorageBackend::Memory => None,
    };

    let backends = storage::setup_storage(&config, pool.as_ref())?;
    let state = Arc::new(AppState::new(config.clone(), backends, pool));

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router))
}
