//! CLI command implementations

pub mod agents;
pub mod contracts;
pub mod export;
pub mod ingest;
pub mod jobs;
pub mod reconcile;
pub mod serve;
pub mod status;
pub mod update;

use anyhow::{Context, Result};
use sqlx::PgPool;
use vitrina_core::VitrinaConfig;
use vitrina_server::create_pool;

/// Load config and open the pool - the preamble every command shares.
pub async fn connect() -> Result<(VitrinaConfig, PgPool)> {
    let config = VitrinaConfig::from_env().context("configuration error")?;
    let pool = create_pool(&config.database_url)
        .await
        .context("failed to connect to database")?;
    Ok((config, pool))
}
