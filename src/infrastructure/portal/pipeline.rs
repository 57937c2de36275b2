use async_trait::async_trait;
use std::sync::Arc;

use crate::domain::errors::PipelineError;
use crate::domain::models::{Credentials, PortalConfig, Snapshot};
use crate::domain::ports::AbsenceSource;

use super::client::PortalClient;

/// [`AbsenceSource`] backed by the live portal.
///
/// Credentials and the optional profile override are fixed at construction.
#[derive(Debug, Clone)]
pub struct PortalAbsenceSource {
    client: Arc<PortalClient>,
    credentials: Credentials,
    profile_override: Option<String>,
}

impl PortalAbsenceSource {
    pub fn new(
        client: Arc<PortalClient>,
        credentials: Credentials,
        profile_override: Option<String>,
    ) -> Self {
        Self {
            client,
            credentials,
            profile_override,
        }
    }

    /// Build the client and source from the portal configuration
    pub fn from_config(config: &PortalConfig) -> anyhow::Result<Self> {
        let client = PortalClient::new(config)?;
        Ok(Self::new(
            Arc::new(client),
            config.credentials(),
            config.profile_override().map(str::to_string),
        ))
    }
}

#[async_trait]
impl AbsenceSource for PortalAbsenceSource {
    async fn fetch_snapshot(&self) -> Result<Snapshot, PipelineError> {
        self.client
            .run(&self.credentials, self.profile_override.as_deref())
            .await
    }
}
