//! Application setup and initialization

pub mod database;
pub mod routes;
pub mod server;
pub mod services;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use hrdesk_core::Config;
use std::sync::Arc;

pub use services::{BackgroundJobs, ReportBackends};

/// Initialize the entire application
pub async fn initialize_app(config: Config) -> Result<(Arc<AppState>, axum::Router, BackgroundJobs)> {
    // Fail fast on misconfiguration
    config.validate().context("Configuration validation failed")?;

    crate::telemetry::init_telemetry(config.log_format())
        .map_err(|e| anyhow::anyhow!("Failed to initialize telemetry: {}", e))?;

    tracing::info!(
        environment = %config.environment(),
        "Configuration loaded and validated successfully"
    );

    let pool = database::setup_database(&config).await?;
    let storage = storage::setup_storage(&config).await?;

    let backends = ReportBackends::postgres(pool, storage, &config);
    let (state, background) = services::build_state(&config, backends);

    let router = routes::setup_routes(&config, state.clone())?;

    Ok((state, router, background))
}
