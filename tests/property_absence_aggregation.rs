use absence_tracker::domain::models::portal::DateRange;
use absence_tracker::domain::models::{round2, AbsenceEntry, AcademicPeriod, OpaqueId};
use absence_tracker::services::{select_period_id, summarize};
use chrono::{DateTime, Duration, TimeZone, Utc};
use proptest::prelude::*;

const COURSES: [&str; 4] = ["Math", "Art", "History", "Physics"];

fn at() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2025, 11, 15, 10, 0, 0).unwrap()
}

fn entry_strategy() -> impl Strategy<Value = AbsenceEntry> {
    let value = prop_oneof![
        (-4i32..20).prop_map(|halves| f64::from(halves) * 0.5),
        -10.0f64..10.0,
    ];
    (0usize..COURSES.len(), value).prop_map(|(course, value)| AbsenceEntry::new(COURSES[course], value))
}

fn period_strategy() -> impl Strategy<Value = AcademicPeriod> {
    let day_offset = prop::option::of(-400i64..400);
    (prop::option::of("[a-z0-9]{1,6}"), day_offset.clone(), day_offset).prop_map(
        |(id, from, to)| AcademicPeriod {
            id: id.map(OpaqueId::new),
            academic_convergence: Some(DateRange {
                date_from: from.map(|days| at() + Duration::days(days)),
                date_to: to.map(|days| at() + Duration::days(days)),
            }),
        },
    )
}

proptest! {
    /// Property: Aggregation does not depend on the order modules arrive in
    #[test]
    fn prop_summarize_is_order_independent(
        (entries, shuffled) in prop::collection::vec(entry_strategy(), 0..25)
            .prop_flat_map(|entries| (Just(entries.clone()), Just(entries).prop_shuffle()))
    ) {
        prop_assert_eq!(summarize(&entries, at()), summarize(&shuffled, at()));
    }

    /// Property: The total is exactly the rounded sum of the per-course values
    #[test]
    fn prop_total_matches_per_course(entries in prop::collection::vec(entry_strategy(), 0..25)) {
        let snapshot = summarize(&entries, at());
        let per_course_sum: f64 = snapshot.per_course().values().map(|usage| usage.used).sum();

        prop_assert_eq!(snapshot.total_used().to_bits(), round2(per_course_sum).to_bits());
    }

    /// Property: Only courses with positive absences appear, each with a positive value
    #[test]
    fn prop_only_positive_courses(entries in prop::collection::vec(entry_strategy(), 0..25)) {
        let snapshot = summarize(&entries, at());

        for (course, usage) in snapshot.per_course() {
            prop_assert!(entries.iter().any(|entry| &entry.course == course && entry.value > 0.0));
            prop_assert!(usage.used >= 0.0);
        }
        for entry in entries.iter().filter(|entry| entry.value > 0.0) {
            prop_assert!(snapshot.per_course().contains_key(&entry.course));
        }
    }

    /// Property: The selected period is a known id, and a containing period always wins
    #[test]
    fn prop_period_selection(periods in prop::collection::vec(period_strategy(), 0..12)) {
        let ids: Vec<&OpaqueId> = periods.iter().filter_map(|period| period.id.as_ref()).collect();

        match select_period_id(&periods, at()) {
            Ok(selected) => {
                prop_assert!(ids.contains(&&selected));
                let first_containing = periods
                    .iter()
                    .find(|period| period.id.is_some() && period.contains(at()));
                if let Some(period) = first_containing {
                    prop_assert_eq!(period.id.as_ref(), Some(&selected));
                }
            }
            Err(_) => prop_assert!(ids.is_empty()),
        }
    }
}
