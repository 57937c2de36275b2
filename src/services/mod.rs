//! Service layer
//!
//! Selection and aggregation rules applied to upstream data, plus the
//! refresh cache that fronts the pipeline.

pub mod absence_aggregator;
pub mod period_selector;
pub mod profile_selector;
pub mod snapshot_cache;

pub use absence_aggregator::{aggregate, extract_absences, summarize};
pub use period_selector::select_period_id;
pub use profile_selector::select_profile_id;
pub use snapshot_cache::{CacheLookup, CacheStatus, RefreshError, RefreshPolicy, SnapshotCache};
