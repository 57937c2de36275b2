//! Current study period selection.
//!
//! The period whose date range contains `now` wins; ties go to the first such
//! period in input order. Without a containing period the one with the latest
//! `dateFrom` is used, again keeping the earliest in input order on ties.
//! Periods lacking `dateFrom` rank below every dated period, so a collection
//! with no dated periods at all yields its first entry.

use chrono::{DateTime, Utc};

use crate::domain::errors::PipelineError;
use crate::domain::models::{AcademicPeriod, OpaqueId};

/// Pick the period id to fetch progress for.
pub fn select_period_id(
    periods: &[AcademicPeriod],
    now: DateTime<Utc>,
) -> Result<OpaqueId, PipelineError> {
    let candidates: Vec<(&OpaqueId, &AcademicPeriod)> = periods
        .iter()
        .filter_map(|period| period.id.as_ref().map(|id| (id, period)))
        .collect();

    if let Some((id, _)) = candidates.iter().find(|(_, period)| period.contains(now)) {
        return Ok((*id).clone());
    }

    let mut latest: Option<(&OpaqueId, Option<DateTime<Utc>>)> = None;
    for &(id, period) in &candidates {
        let from = period.date_from();
        match latest {
            // `None < Some(_)` for Option, matching "undated ranks lowest"
            Some((_, best)) if from <= best => {}
            _ => latest = Some((id, from)),
        }
    }

    latest
        .map(|(id, _)| id.clone())
        .ok_or(PipelineError::NoPeriodsAvailable)
}
