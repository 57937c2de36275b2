//! Absence Tracker - cached student absence totals
//!
//! Resolves a student's absence totals from a third-party student portal and
//! serves them from a single-flight refresh cache with error backoff.
//!
//! # Architecture
//!
//! This crate follows Clean Architecture / Hexagonal Architecture principles:
//!
//! - **Domain Layer** (`domain`): Wire types, snapshot model, errors and ports
//! - **Service Layer** (`services`): Profile/period selection, aggregation, refresh cache
//! - **Infrastructure Layer** (`infrastructure`): Portal client, configuration, logging
//! - **Adapters** (`adapters`): HTTP surface
//! - **CLI Layer** (`cli`): Command-line interface
//!
//! # Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use absence_tracker::{ConfigLoader, PortalAbsenceSource, RefreshPolicy, SnapshotCache};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = ConfigLoader::load()?;
//!     let source = PortalAbsenceSource::from_config(&config.portal)?;
//!     let cache = SnapshotCache::new(Arc::new(source), RefreshPolicy::from(&config.cache));
//!     let lookup = cache.get_snapshot().await?;
//!     Ok(())
//! }
//! ```

pub mod adapters;
pub mod cli;
pub mod domain;
pub mod infrastructure;
pub mod services;

// Re-export commonly used types for convenience
pub use domain::models::{Config, Credentials, Snapshot, UnavailableReason};
pub use domain::ports::AbsenceSource;
pub use domain::{PipelineError, PipelineResult, PipelineStep, UpstreamFailure};
pub use infrastructure::config::{ConfigError, ConfigLoader};
pub use infrastructure::portal::{PortalAbsenceSource, PortalClient};
pub use services::{CacheLookup, CacheStatus, RefreshError, RefreshPolicy, SnapshotCache};
