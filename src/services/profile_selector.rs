//! Study profile selection rules.

use crate::domain::errors::PipelineError;
use crate::domain::models::{OpaqueId, StudyProfile};

/// Pick the study profile id belonging to `username`.
///
/// The first profile that is active and whose registration number equals
/// `username` exactly is selected. Its own id wins over the nested assigned
/// profile id. A matching profile that carries neither id does not stop the
/// search; later candidates are still considered.
pub fn select_profile_id(
    profiles: &[StudyProfile],
    username: &str,
) -> Result<OpaqueId, PipelineError> {
    if profiles.is_empty() {
        return Err(PipelineError::NoProfilesReturned);
    }

    profiles
        .iter()
        .filter(|profile| profile.is_active())
        .filter(|profile| profile.registration_number() == Some(username))
        .find_map(StudyProfile::resolved_id)
        .cloned()
        .ok_or(PipelineError::ProfileNotMatched)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn profiles(value: serde_json::Value) -> Vec<StudyProfile> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_empty_collection() {
        assert_eq!(
            select_profile_id(&[], "s1"),
            Err(PipelineError::NoProfilesReturned)
        );
    }

    #[test]
    fn test_requires_active_and_username_match() {
        let candidates = profiles(json!([
            {"activeProfile": false, "id": "inactive", "study": {"traineeRegistrationNumber": "s1"}},
            {"activeProfile": true, "id": "other-user", "study": {"traineeRegistrationNumber": "s2"}},
            {"activeProfile": true, "id": "mine", "study": {"traineeRegistrationNumber": "s1"}}
        ]));
        assert_eq!(
            select_profile_id(&candidates, "s1"),
            Ok(OpaqueId::new("mine"))
        );
    }

    #[test]
    fn test_username_match_is_case_sensitive() {
        let candidates = profiles(json!([
            {"activeProfile": true, "id": "p", "study": {"traineeRegistrationNumber": "S1"}}
        ]));
        assert_eq!(
            select_profile_id(&candidates, "s1"),
            Err(PipelineError::ProfileNotMatched)
        );
    }

    #[test]
    fn test_falls_back_to_assigned_profile_id() {
        let candidates = profiles(json!([
            {"activeProfile": true, "study": {"traineeRegistrationNumber": "s1", "assignedProfileId": "assigned"}}
        ]));
        assert_eq!(
            select_profile_id(&candidates, "s1"),
            Ok(OpaqueId::new("assigned"))
        );
    }

    #[test]
    fn test_match_without_any_id_is_not_matched() {
        let candidates = profiles(json!([
            {"activeProfile": true, "study": {"traineeRegistrationNumber": "s1"}}
        ]));
        assert_eq!(
            select_profile_id(&candidates, "s1"),
            Err(PipelineError::ProfileNotMatched)
        );
    }

    #[test]
    fn test_skips_idless_match_for_later_candidate() {
        let candidates = profiles(json!([
            {"activeProfile": true, "study": {"traineeRegistrationNumber": "s1"}},
            {"activeProfile": true, "id": 9, "study": {"traineeRegistrationNumber": "s1"}}
        ]));
        assert_eq!(select_profile_id(&candidates, "s1"), Ok(OpaqueId::new("9")));
    }
}
