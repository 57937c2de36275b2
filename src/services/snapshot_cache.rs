//! Refresh cache in front of the absence pipeline.
//!
//! Readers never wait on the network. A stale read tries to take the single
//! refresh permit without blocking; whoever gets it runs the pipeline, every
//! other concurrent reader is served whatever snapshot is already published.
//! After a failed refresh no new attempt is made until the backoff window has
//! elapsed.

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::PipelineError;
use crate::domain::models::{CacheConfig, Snapshot, UnavailableReason};
use crate::domain::ports::AbsenceSource;

/// Staleness and backoff windows.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RefreshPolicy {
    /// A snapshot older than this is refreshed on the next read
    pub refresh_interval: Duration,
    /// After a failure, no refresh is attempted for this long
    pub error_backoff: Duration,
}

impl RefreshPolicy {
    pub fn new(refresh_interval: Duration, error_backoff: Duration) -> Self {
        Self {
            refresh_interval,
            error_backoff,
        }
    }
}

impl Default for RefreshPolicy {
    fn default() -> Self {
        Self::from(&CacheConfig::default())
    }
}

impl From<&CacheConfig> for RefreshPolicy {
    fn from(config: &CacheConfig) -> Self {
        let secs = |value: u64| {
            i64::try_from(value)
                .ok()
                .and_then(Duration::try_seconds)
                .unwrap_or(Duration::MAX)
        };
        Self::new(
            secs(config.refresh_interval_secs),
            secs(config.error_backoff_secs),
        )
    }
}

/// Result of a cache read that did not fail.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    Ready(Arc<Snapshot>),
    Unavailable(UnavailableReason),
}

impl CacheLookup {
    pub fn snapshot(&self) -> Option<&Arc<Snapshot>> {
        match self {
            Self::Ready(snapshot) => Some(snapshot),
            Self::Unavailable(_) => None,
        }
    }
}

/// Failure surfaced to the caller that triggered a refresh.
#[derive(Debug, Error)]
pub enum RefreshError {
    #[error(transparent)]
    Pipeline(#[from] PipelineError),

    #[error("refresh task aborted: {0}")]
    Aborted(String),
}

/// Point-in-time view of the cache bookkeeping, for health reporting.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CacheStatus {
    pub has_data: bool,
    pub last_success: Option<DateTime<Utc>>,
    pub last_failure: Option<DateTime<Utc>>,
    pub refresh_in_flight: bool,
}

#[derive(Debug, Clone, Default)]
struct CacheState {
    snapshot: Option<Arc<Snapshot>>,
    last_success: Option<DateTime<Utc>>,
    last_failure: Option<DateTime<Utc>>,
}

enum Decision {
    Serve,
    Backoff,
    Refresh,
}

impl CacheState {
    fn decide(&self, policy: &RefreshPolicy, now: DateTime<Utc>) -> Decision {
        if let Some(failed_at) = self.last_failure {
            if now - failed_at < policy.error_backoff {
                return Decision::Backoff;
            }
        }

        let stale = match (&self.snapshot, self.last_success) {
            (Some(_), Some(refreshed_at)) => now - refreshed_at > policy.refresh_interval,
            _ => true,
        };

        if stale {
            Decision::Refresh
        } else {
            Decision::Serve
        }
    }

    fn lookup(&self, when_empty: UnavailableReason) -> CacheLookup {
        self.snapshot
            .clone()
            .map_or(CacheLookup::Unavailable(when_empty), CacheLookup::Ready)
    }
}

/// Single-flight refresh cache over an [`AbsenceSource`].
pub struct SnapshotCache {
    source: Arc<dyn AbsenceSource>,
    policy: RefreshPolicy,
    refresh_permit: Arc<Mutex<()>>,
    state: Arc<RwLock<CacheState>>,
}

impl SnapshotCache {
    pub fn new(source: Arc<dyn AbsenceSource>, policy: RefreshPolicy) -> Self {
        Self {
            source,
            policy,
            refresh_permit: Arc::new(Mutex::new(())),
            state: Arc::new(RwLock::new(CacheState::default())),
        }
    }

    /// Current snapshot, refreshing first when it is missing or stale.
    pub async fn get_snapshot(&self) -> Result<CacheLookup, RefreshError> {
        self.get_snapshot_at(Utc::now()).await
    }

    /// [`Self::get_snapshot`] evaluated against an explicit wall-clock time.
    #[instrument(skip(self))]
    pub async fn get_snapshot_at(&self, now: DateTime<Utc>) -> Result<CacheLookup, RefreshError> {
        let decision = self.state.read().await.decide(&self.policy, now);

        match decision {
            Decision::Backoff => {
                debug!("refresh suppressed by error backoff");
                return Ok(self.state.read().await.lookup(UnavailableReason::Backoff));
            }
            Decision::Serve => {}
            Decision::Refresh => match Arc::clone(&self.refresh_permit).try_lock_owned() {
                Ok(permit) => {
                    // Another caller may have finished a refresh between our
                    // read and taking the permit.
                    let decision = self.state.read().await.decide(&self.policy, now);
                    match decision {
                        Decision::Refresh => self.refresh(permit, now).await?,
                        Decision::Backoff => {
                            return Ok(self.state.read().await.lookup(UnavailableReason::Backoff));
                        }
                        Decision::Serve => {}
                    }
                }
                Err(_) => debug!("refresh already in flight, serving cached state"),
            },
        }

        Ok(self.state.read().await.lookup(UnavailableReason::NoDataYet))
    }

    /// Bookkeeping snapshot for health endpoints.
    pub async fn status(&self) -> CacheStatus {
        let state = self.state.read().await;
        CacheStatus {
            has_data: state.snapshot.is_some(),
            last_success: state.last_success,
            last_failure: state.last_failure,
            refresh_in_flight: self.refresh_permit.try_lock().is_err(),
        }
    }

    /// Run the pipeline while holding `permit`.
    ///
    /// The run happens on its own task so it completes even if the calling
    /// request is dropped. The pipeline itself runs on an inner task; its
    /// outcome, panics included, is recorded before the permit is released.
    async fn refresh(
        &self,
        permit: tokio::sync::OwnedMutexGuard<()>,
        now: DateTime<Utc>,
    ) -> Result<(), RefreshError> {
        let source = Arc::clone(&self.source);
        let state = Arc::clone(&self.state);

        info!("refreshing absence snapshot");
        let task = tokio::spawn(async move {
            let _permit = permit;
            let outcome = match tokio::spawn(async move { source.fetch_snapshot().await }).await {
                Ok(outcome) => outcome.map_err(RefreshError::Pipeline),
                Err(join_err) => Err(RefreshError::Aborted(join_err.to_string())),
            };

            let mut state = state.write().await;
            match outcome {
                Ok(snapshot) => {
                    info!(
                        total_used = snapshot.total_used(),
                        courses = snapshot.per_course().len(),
                        "absence snapshot refreshed"
                    );
                    state.snapshot = Some(Arc::new(snapshot));
                    state.last_success = Some(now);
                    state.last_failure = None;
                    Ok(())
                }
                Err(RefreshError::Pipeline(err)) => {
                    warn!(
                        error = %err,
                        kind = err.kind(),
                        step = %err.step(),
                        "absence refresh failed, backing off"
                    );
                    state.last_failure = Some(now);
                    Err(RefreshError::Pipeline(err))
                }
                Err(err) => {
                    warn!(error = %err, "absence refresh task aborted, backing off");
                    state.last_failure = Some(now);
                    Err(err)
                }
            }
        });

        task.await
            .unwrap_or_else(|join_err| Err(RefreshError::Aborted(join_err.to_string())))
    }
}
