//! Domain errors for the absence resolution pipeline.

use reqwest::StatusCode;
use std::fmt;
use thiserror::Error;

/// The five dependent steps of a pipeline run, used to tag upstream failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PipelineStep {
    /// Login form fetch and credential submission
    CredentialExchange,
    /// "Who am I" lookup
    IdentityResolution,
    /// Academic review lookup for the study profile
    ProfileResolution,
    /// Study periods lookup
    PeriodResolution,
    /// Progress document fetch
    ProgressFetch,
}

impl PipelineStep {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::CredentialExchange => "credential_exchange",
            Self::IdentityResolution => "identity_resolution",
            Self::ProfileResolution => "profile_resolution",
            Self::PeriodResolution => "period_resolution",
            Self::ProgressFetch => "progress_fetch",
        }
    }
}

impl fmt::Display for PipelineStep {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// What went wrong talking to the upstream system during a single step.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpstreamFailure {
    /// Upstream answered with a non-success status
    Status(StatusCode),
    /// The bounded request timeout elapsed
    Timeout,
    /// Connection, TLS or protocol error
    Transport(String),
    /// Response body could not be decoded
    InvalidBody(String),
}

impl UpstreamFailure {
    /// HTTP status observed, if the request got that far
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status(status) => Some(*status),
            _ => None,
        }
    }

    /// Classify a reqwest error raised while sending or decoding.
    pub fn from_reqwest(err: &reqwest::Error) -> Self {
        if err.is_timeout() {
            Self::Timeout
        } else if let Some(status) = err.status() {
            Self::Status(status)
        } else if err.is_decode() {
            Self::InvalidBody(err.to_string())
        } else {
            Self::Transport(err.to_string())
        }
    }
}

impl fmt::Display for UpstreamFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Status(status) => write!(f, "HTTP {status}"),
            Self::Timeout => f.write_str("request timed out"),
            Self::Transport(msg) => write!(f, "transport error: {msg}"),
            Self::InvalidBody(msg) => write!(f, "invalid response body: {msg}"),
        }
    }
}

/// Errors that abort a pipeline run. The first one encountered wins.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PipelineError {
    #[error("Login form not found (status={status}, url={url})")]
    AuthFormNotFound { status: StatusCode, url: String },

    #[error("Login submission did not redirect (status={status})")]
    AuthRedirectMissing { status: StatusCode },

    #[error("No access_token in login redirect")]
    AuthTokenMissing,

    #[error("sameAs not found in identity response")]
    IdentityFieldMissing,

    #[error("No profiles found in academic-review response")]
    NoProfilesReturned,

    #[error("No active study profile matches the registration number")]
    ProfileNotMatched,

    #[error("No study periods available for profile")]
    NoPeriodsAvailable,

    #[error("Upstream request failed during {step}: {failure}")]
    UpstreamRequestFailed {
        step: PipelineStep,
        failure: UpstreamFailure,
    },
}

impl PipelineError {
    pub fn upstream(step: PipelineStep, failure: UpstreamFailure) -> Self {
        Self::UpstreamRequestFailed { step, failure }
    }

    /// Short machine-readable kind, used in logs and the HTTP surface
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AuthFormNotFound { .. } => "auth_form_not_found",
            Self::AuthRedirectMissing { .. } => "auth_redirect_missing",
            Self::AuthTokenMissing => "auth_token_missing",
            Self::IdentityFieldMissing => "identity_field_missing",
            Self::NoProfilesReturned => "no_profiles_returned",
            Self::ProfileNotMatched => "profile_not_matched",
            Self::NoPeriodsAvailable => "no_periods_available",
            Self::UpstreamRequestFailed { .. } => "upstream_request_failed",
        }
    }

    /// The step that produced this error
    pub fn step(&self) -> PipelineStep {
        match self {
            Self::AuthFormNotFound { .. }
            | Self::AuthRedirectMissing { .. }
            | Self::AuthTokenMissing => PipelineStep::CredentialExchange,
            Self::IdentityFieldMissing => PipelineStep::IdentityResolution,
            Self::NoProfilesReturned | Self::ProfileNotMatched => PipelineStep::ProfileResolution,
            Self::NoPeriodsAvailable => PipelineStep::PeriodResolution,
            Self::UpstreamRequestFailed { step, .. } => *step,
        }
    }
}

pub type PipelineResult<T> = Result<T, PipelineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_step_of_each_error() {
        assert_eq!(
            PipelineError::AuthTokenMissing.step(),
            PipelineStep::CredentialExchange
        );
        assert_eq!(
            PipelineError::IdentityFieldMissing.step(),
            PipelineStep::IdentityResolution
        );
        assert_eq!(
            PipelineError::ProfileNotMatched.step(),
            PipelineStep::ProfileResolution
        );
        assert_eq!(
            PipelineError::NoPeriodsAvailable.step(),
            PipelineStep::PeriodResolution
        );
        let err = PipelineError::upstream(
            PipelineStep::ProgressFetch,
            UpstreamFailure::Status(StatusCode::BAD_GATEWAY),
        );
        assert_eq!(err.step(), PipelineStep::ProgressFetch);
    }

    #[test]
    fn test_upstream_error_display() {
        let err = PipelineError::upstream(
            PipelineStep::PeriodResolution,
            UpstreamFailure::Status(StatusCode::NOT_FOUND),
        );
        assert_eq!(
            err.to_string(),
            "Upstream request failed during period_resolution: HTTP 404 Not Found"
        );

        let err = PipelineError::upstream(PipelineStep::IdentityResolution, UpstreamFailure::Timeout);
        assert_eq!(
            err.to_string(),
            "Upstream request failed during identity_resolution: request timed out"
        );
    }

    #[test]
    fn test_failure_status() {
        assert_eq!(
            UpstreamFailure::Status(StatusCode::UNAUTHORIZED).status(),
            Some(StatusCode::UNAUTHORIZED)
        );
        assert_eq!(UpstreamFailure::Timeout.status(), None);
    }

    #[test]
    fn test_kind_strings() {
        assert_eq!(PipelineError::NoProfilesReturned.kind(), "no_profiles_returned");
        assert_eq!(
            PipelineError::AuthRedirectMissing {
                status: StatusCode::OK
            }
            .kind(),
            "auth_redirect_missing"
        );
    }
}
