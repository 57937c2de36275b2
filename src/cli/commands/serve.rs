//! Implementation of the `absence-tracker serve` command.

use anyhow::{Context, Result};
use clap::Args;
use std::sync::Arc;
use tracing::{info, warn};

use crate::adapters::absences_http::AbsencesHttpServer;
use crate::domain::models::Config;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::portal::PortalAbsenceSource;
use crate::services::{RefreshPolicy, SnapshotCache};

#[derive(Args, Debug)]
pub struct ServeArgs {
    /// Address to bind, overriding server.host
    #[arg(long)]
    pub host: Option<String>,

    /// Port to listen on, overriding server.port
    #[arg(short, long)]
    pub port: Option<u16>,
}

pub async fn execute(args: ServeArgs, mut config: Config) -> Result<()> {
    ConfigLoader::require_credentials(&config)?;

    if let Some(host) = args.host {
        config.server.host = host;
    }
    if let Some(port) = args.port {
        config.server.port = port;
    }

    let source =
        PortalAbsenceSource::from_config(&config.portal).context("Failed to build portal client")?;
    let policy = RefreshPolicy::from(&config.cache);
    let cache = Arc::new(SnapshotCache::new(Arc::new(source), policy));

    info!(
        refresh_interval_secs = config.cache.refresh_interval_secs,
        error_backoff_secs = config.cache.error_backoff_secs,
        profile_override = config.portal.profile_override().is_some(),
        "starting absence tracker"
    );

    AbsencesHttpServer::new(cache, config.server)
        .serve_with_shutdown(shutdown_signal())
        .await
        .context("HTTP server failed")?;

    info!("absence tracker stopped");
    Ok(())
}

async fn shutdown_signal() {
    match tokio::signal::ctrl_c().await {
        Ok(()) => info!("shutdown signal received"),
        Err(err) => {
            warn!(error = %err, "failed to listen for shutdown signal");
            std::future::pending::<()>().await;
        }
    }
}
