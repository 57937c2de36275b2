use chrono::{DateTime, Utc};
use serde::Serialize;
use std::collections::BTreeMap;
use std::fmt;

/// Round to two decimal places.
pub fn round2(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

/// One module's absences, attributed to a course.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AbsenceEntry {
    pub course: String,
    pub value: f64,
}

impl AbsenceEntry {
    pub fn new(course: impl Into<String>, value: f64) -> Self {
        Self {
            course: course.into(),
            value,
        }
    }
}

/// Per-course usage as exposed to consumers: `{"used": 4.5}`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CourseUsage {
    pub used: f64,
}

/// Aggregated absence totals at a point in time.
///
/// Immutable once built; the cache replaces it wholesale.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Snapshot {
    total_used: f64,
    per_course: BTreeMap<String, CourseUsage>,
    last_updated: DateTime<Utc>,
}

impl Snapshot {
    /// Build a snapshot from unrounded per-course sums.
    ///
    /// Every course value is rounded to two decimals and the total is the
    /// rounded sum of those rounded values, so `total_used` always matches
    /// the per-course figures a consumer sees.
    pub fn from_course_totals(totals: BTreeMap<String, f64>, last_updated: DateTime<Utc>) -> Self {
        let per_course: BTreeMap<String, CourseUsage> = totals
            .into_iter()
            .map(|(course, used)| (course, CourseUsage { used: round2(used) }))
            .collect();
        let total_used = round2(per_course.values().map(|usage| usage.used).sum());

        Self {
            total_used,
            per_course,
            last_updated,
        }
    }

    pub fn total_used(&self) -> f64 {
        self.total_used
    }

    pub fn per_course(&self) -> &BTreeMap<String, CourseUsage> {
        &self.per_course
    }

    pub fn used_for(&self, course: &str) -> Option<f64> {
        self.per_course.get(course).map(|usage| usage.used)
    }

    pub fn last_updated(&self) -> DateTime<Utc> {
        self.last_updated
    }
}

/// Why the cache could not hand out a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    /// A refresh failed recently and no snapshot was ever fetched
    Backoff,
    /// Nothing fetched yet and no refresh could run on this call
    NoDataYet,
}

impl UnavailableReason {
    /// Message exposed on the consumer surface
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Backoff => "temporary backoff",
            Self::NoDataYet => "no data yet",
        }
    }
}

impl fmt::Display for UnavailableReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
