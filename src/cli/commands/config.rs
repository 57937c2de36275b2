//! Implementation of the `absence-tracker config` command.

use anyhow::Result;
use serde::Serialize;

use crate::cli::output::{output, CommandOutput};
use crate::domain::models::Config;

#[derive(Debug, Serialize)]
#[serde(transparent)]
pub struct ConfigOutput {
    pub config: Config,
}

impl ConfigOutput {
    /// Wrap `config` with the portal password redacted
    pub fn redacted(config: Config) -> Self {
        let portal = config.portal.redacted();
        Self {
            config: Config { portal, ..config },
        }
    }
}

impl CommandOutput for ConfigOutput {
    fn to_human(&self) -> String {
        serde_yaml::to_string(&self.config).unwrap_or_default()
    }

    fn to_json(&self) -> serde_json::Value {
        serde_json::to_value(&self.config).unwrap_or_default()
    }
}

pub fn execute(config: Config, json_mode: bool) -> Result<()> {
    output(&ConfigOutput::redacted(config), json_mode);
    Ok(())
}
