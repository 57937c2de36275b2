//! Implementation of the `absence-tracker fetch` command.

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::{Config, Snapshot};
use crate::domain::ports::AbsenceSource;
use crate::infrastructure::config::ConfigLoader;
use crate::infrastructure::portal::PortalAbsenceSource;

#[derive(Args, Debug)]
pub struct FetchArgs {
    /// Study profile id, skipping profile auto-detection
    #[arg(long)]
    pub profile_id: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct FetchOutput {
    pub snapshot: Snapshot,
}

impl CommandOutput for FetchOutput {
    fn to_human(&self) -> String {
        let mut lines = vec![format!("Total absences: {}", self.snapshot.total_used())];
        for (course, usage) in self.snapshot.per_course() {
            lines.push(format!("  {course}: {}", usage.used));
        }
        lines.push(format!(
            "Last updated: {}",
            self.snapshot.last_updated().to_rfc3339()
        ));
        lines.join("\n")
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.snapshot).unwrap_or_default()
    }
}

pub async fn execute(args: FetchArgs, config: Config, json_mode: bool) -> Result<()> {
    ConfigLoader::require_credentials(&config)?;

    let mut portal = config.portal;
    if let Some(profile_id) = args.profile_id {
        portal.profile_id = Some(profile_id);
    }

    let source = PortalAbsenceSource::from_config(&portal).context("Failed to build portal client")?;
    let snapshot = source
        .fetch_snapshot()
        .await
        .context("Failed to resolve absence totals")?;

    output(&FetchOutput { snapshot }, json_mode);
    Ok(())
}
