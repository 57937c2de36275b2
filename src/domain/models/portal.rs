//! Wire types for the student portal APIs.
//!
//! Upstream payloads are loosely shaped: most fields can be missing, null or
//! typed inconsistently (ids come back as strings or numbers). Every field is
//! therefore optional here and the fallback rules live in explicit methods.

use chrono::{DateTime, NaiveDate, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;

/// Identifier whose structure is owned by the portal.
///
/// Accepts JSON strings and numbers; empty strings deserialize as absent.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct OpaqueId(String);

impl OpaqueId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OpaqueId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OpaqueId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawId {
    Text(String),
    Number(serde_json::Number),
}

fn opaque_id<'de, D>(deserializer: D) -> Result<Option<OpaqueId>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<RawId> = Option::deserialize(deserializer)?;
    Ok(match raw {
        Some(RawId::Text(text)) if !text.is_empty() => Some(OpaqueId(text)),
        Some(RawId::Number(number)) => Some(OpaqueId(number.to_string())),
        _ => None,
    })
}

/// Parse an upstream timestamp into UTC.
///
/// RFC 3339 values keep their offset; naive date-times and bare dates are taken as UTC.
pub fn parse_timestamp(value: &str) -> Option<DateTime<Utc>> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }
    if let Ok(parsed) = DateTime::parse_from_rfc3339(value) {
        return Some(parsed.with_timezone(&Utc));
    }
    if let Ok(naive) = NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S%.f") {
        return Some(naive.and_utc());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .and_then(|date| date.and_hms_opt(0, 0, 0))
        .map(|naive| naive.and_utc())
}

fn lenient_timestamp<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(deserializer)?;
    Ok(raw.as_deref().and_then(|value| {
        let parsed = parse_timestamp(value);
        if parsed.is_none() {
            tracing::debug!(value, "ignoring unparseable period timestamp");
        }
        parsed
    }))
}

/// Response of the "who am I" endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WhoAmI {
    /// Alias of the student record; this is the subject identity
    #[serde(default, deserialize_with = "opaque_id")]
    pub same_as: Option<OpaqueId>,
}

/// Response of the academic-review endpoint.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct AcademicReview {
    #[serde(default)]
    pub profiles: Option<Vec<StudyProfile>>,
}

impl AcademicReview {
    pub fn into_profiles(self) -> Vec<StudyProfile> {
        self.profiles.unwrap_or_default()
    }
}

/// Candidate study profile returned by the academic review.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyProfile {
    #[serde(default)]
    pub active_profile: Option<bool>,

    #[serde(default, deserialize_with = "opaque_id")]
    pub id: Option<OpaqueId>,

    #[serde(default)]
    pub study: Option<StudyRecord>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StudyRecord {
    #[serde(default, deserialize_with = "opaque_id")]
    pub trainee_registration_number: Option<OpaqueId>,

    #[serde(default, deserialize_with = "opaque_id")]
    pub assigned_profile_id: Option<OpaqueId>,
}

impl StudyProfile {
    pub fn is_active(&self) -> bool {
        self.active_profile.unwrap_or(false)
    }

    pub fn registration_number(&self) -> Option<&str> {
        self.study
            .as_ref()
            .and_then(|study| study.trainee_registration_number.as_ref())
            .map(OpaqueId::as_str)
    }

    /// The profile's own id, falling back to `study.assignedProfileId`.
    pub fn resolved_id(&self) -> Option<&OpaqueId> {
        self.id.as_ref().or_else(|| {
            self.study
                .as_ref()
                .and_then(|study| study.assigned_profile_id.as_ref())
        })
    }
}

/// A study period of one profile.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AcademicPeriod {
    #[serde(default, deserialize_with = "opaque_id")]
    pub id: Option<OpaqueId>,

    #[serde(default)]
    pub academic_convergence: Option<DateRange>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateRange {
    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub date_from: Option<DateTime<Utc>>,

    #[serde(default, deserialize_with = "lenient_timestamp")]
    pub date_to: Option<DateTime<Utc>>,
}

impl AcademicPeriod {
    pub fn date_from(&self) -> Option<DateTime<Utc>> {
        self.academic_convergence.as_ref().and_then(|r| r.date_from)
    }

    pub fn date_to(&self) -> Option<DateTime<Utc>> {
        self.academic_convergence.as_ref().and_then(|r| r.date_to)
    }

    /// True only when both bounds exist and `from <= now <= to`.
    pub fn contains(&self, now: DateTime<Utc>) -> bool {
        match (self.date_from(), self.date_to()) {
            (Some(from), Some(to)) => from <= now && now <= to,
            _ => false,
        }
    }
}

/// Progress document for one period.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProgressDocument {
    #[serde(default)]
    pub modules: Option<Vec<ProgressModule>>,
}

impl ProgressDocument {
    pub fn modules(&self) -> &[ProgressModule] {
        self.modules.as_deref().unwrap_or_default()
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProgressModule {
    #[serde(default)]
    pub name: Option<String>,

    #[serde(default)]
    pub absences: Option<AbsenceCounter>,

    #[serde(default)]
    pub study_period_module: Option<StudyPeriodModule>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct AbsenceCounter {
    #[serde(default)]
    pub absences: Option<f64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudyPeriodModule {
    #[serde(default)]
    pub module: Option<ModuleInfo>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ModuleInfo {
    #[serde(default)]
    pub title: Option<String>,
}

impl ProgressModule {
    /// Own non-empty `name`, else `studyPeriodModule.module.title`.
    pub fn course_label(&self) -> Option<&str> {
        self.name
            .as_deref()
            .filter(|name| !name.is_empty())
            .or_else(|| {
                self.study_period_module
                    .as_ref()
                    .and_then(|spm| spm.module.as_ref())
                    .and_then(|module| module.title.as_deref())
                    .filter(|title| !title.is_empty())
            })
    }

    /// Absence count, zero when missing.
    pub fn absence_count(&self) -> f64 {
        self.absences
            .as_ref()
            .and_then(|counter| counter.absences)
            .unwrap_or(0.0)
    }
}
