//! Progress document to snapshot aggregation.

use chrono::{DateTime, Utc};
use std::collections::BTreeMap;

use crate::domain::models::{AbsenceEntry, ProgressDocument, Snapshot};

/// Label used for modules carrying neither a name nor a module title.
pub const UNKNOWN_COURSE: &str = "unknown";

/// Extract one entry per module with a strictly positive absence count.
pub fn extract_absences(document: &ProgressDocument) -> Vec<AbsenceEntry> {
    document
        .modules()
        .iter()
        .filter(|module| module.absence_count() > 0.0)
        .map(|module| {
            AbsenceEntry::new(
                module.course_label().unwrap_or(UNKNOWN_COURSE),
                module.absence_count(),
            )
        })
        .collect()
}

/// Group entries by course and build the snapshot stamped with `at`.
///
/// Entries with a non-positive value are ignored. Each group is summed in
/// ascending value order so the result does not depend on input order.
pub fn summarize(entries: &[AbsenceEntry], at: DateTime<Utc>) -> Snapshot {
    let mut grouped: BTreeMap<String, Vec<f64>> = BTreeMap::new();
    for entry in entries.iter().filter(|entry| entry.value > 0.0) {
        grouped
            .entry(entry.course.clone())
            .or_default()
            .push(entry.value);
    }

    let totals: BTreeMap<String, f64> = grouped
        .into_iter()
        .map(|(course, mut values)| {
            values.sort_by(f64::total_cmp);
            (course, values.iter().sum::<f64>())
        })
        .collect();

    Snapshot::from_course_totals(totals, at)
}

/// Extract and summarize in one go.
pub fn aggregate(document: &ProgressDocument, at: DateTime<Utc>) -> Snapshot {
    summarize(&extract_absences(document), at)
}
