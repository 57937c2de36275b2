//! Common test utilities for integration tests
//!
//! A wiremock-backed fake of the identity provider and the portal APIs,
//! plus fixtures shared across test files.

#![allow(dead_code)]

use absence_tracker::domain::models::PortalConfig;
use chrono::{Duration, Utc};
use serde_json::{json, Value};
use wiremock::matchers::{body_string_contains, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const USERNAME: &str = "s1234";
pub const PASSWORD: &str = "hunter2";
pub const TOKEN: &str = "tok-123";
pub const SUBJECT: &str = "u-77";
pub const PROFILE: &str = "prof-9";
pub const PERIOD: &str = "per-2";

pub const AUTH_PATH: &str = "/auth/realms/R/protocol/openid-connect/auth";
pub const LOGIN_ACTION_PATH: &str = "/auth/realms/R/login-actions/authenticate";
pub const WHO_AM_I_PATH: &str = "/api/users/me/";

pub fn academic_review_path(subject: &str) -> String {
    format!("/athena-conductor/rest/persons/students/{subject}/academic-review")
}

pub fn periods_path(profile: &str) -> String {
    format!("/athena-conductor/rest/study-profiles/{profile}/periods")
}

pub fn progress_path(period: &str) -> String {
    format!("/athena-conductor/rest/study-profiles/periods/{period}/progress")
}

/// Login page with a relative, entity-encoded action and hidden fields
pub fn login_page() -> String {
    format!(
        r#"<html><body>
<form id="kc-form-login" action="{LOGIN_ACTION_PATH}?session_code=abc&amp;execution=e1" method="post">
  <input type="text" name="username" value="">
  <input type="password" name="password">
  <input type="hidden" name="credentialId" value="cred-1">
  <input type="submit" name="login" value="Sign In">
</form>
</body></html>"#
    )
}

pub fn token_redirect() -> String {
    format!(
        "https://portal.example.edu/cb/index.html#state=s1&access_token={TOKEN}&token_type=Bearer"
    )
}

pub fn profiles_body() -> Value {
    json!({
        "profiles": [
            { "activeProfile": false, "id": "old", "study": { "traineeRegistrationNumber": USERNAME } },
            { "activeProfile": true, "id": "someone-else", "study": { "traineeRegistrationNumber": "s9999" } },
            { "activeProfile": true, "id": PROFILE, "study": { "traineeRegistrationNumber": USERNAME } }
        ]
    })
}

/// Two periods; only `PERIOD` contains the current time
pub fn periods_body() -> Value {
    let now = Utc::now();
    json!([
        {
            "id": "per-1",
            "academicConvergence": {
                "dateFrom": (now - Duration::days(200)).to_rfc3339(),
                "dateTo": (now - Duration::days(100)).to_rfc3339()
            }
        },
        {
            "id": PERIOD,
            "academicConvergence": {
                "dateFrom": (now - Duration::days(30)).to_rfc3339(),
                "dateTo": (now + Duration::days(30)).to_rfc3339()
            }
        }
    ])
}

pub fn progress_body() -> Value {
    json!({
        "modules": [
            { "name": "Math", "absences": { "absences": 2 } },
            { "name": "", "absences": { "absences": 1.5 },
              "studyPeriodModule": { "module": { "title": "Math" } } },
            { "name": "Art", "absences": { "absences": 1 } },
            { "name": "History", "absences": { "absences": 0 } },
            { "name": "Music" }
        ]
    })
}

/// Fake portal: identity provider plus REST APIs on one mock server
pub struct MockPortal {
    pub server: MockServer,
}

impl MockPortal {
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    pub fn config(&self) -> PortalConfig {
        PortalConfig {
            username: USERNAME.to_string(),
            password: PASSWORD.to_string(),
            auth_url: format!(
                "{}{AUTH_PATH}?response_type=token&client_id=portal",
                self.server.uri()
            ),
            api_base_url: self.server.uri(),
            request_timeout_secs: 1,
            ..PortalConfig::default()
        }
    }

    pub async fn mount_login_page(&self, template: ResponseTemplate) {
        Mock::given(method("GET"))
            .and(path(AUTH_PATH))
            .respond_with(template)
            .mount(&self.server)
            .await;
    }

    pub async fn mount_login_submit(&self, template: ResponseTemplate) {
        Mock::given(method("POST"))
            .and(path(LOGIN_ACTION_PATH))
            .and(body_string_contains(format!("username={USERNAME}")))
            .and(body_string_contains(format!("password={PASSWORD}")))
            .respond_with(template)
            .mount(&self.server)
            .await;
    }

    /// Login page plus a submission answering with the token redirect
    pub async fn mount_login(&self) {
        self.mount_login_page(ResponseTemplate::new(200).set_body_string(login_page()))
            .await;
        self.mount_login_submit(
            ResponseTemplate::new(302).insert_header("Location", token_redirect().as_str()),
        )
        .await;
    }

    pub async fn mount_api(&self, http_method: &str, api_path: &str, template: ResponseTemplate) {
        Mock::given(method(http_method))
            .and(path(api_path))
            .and(header("authorization", format!("Bearer {TOKEN}").as_str()))
            .respond_with(template)
            .mount(&self.server)
            .await;
    }

    pub async fn mount_who_am_i(&self, body: Value) {
        self.mount_api("GET", WHO_AM_I_PATH, json_response(body))
            .await;
    }

    pub async fn mount_profiles(&self, body: Value) {
        self.mount_api("POST", &academic_review_path(SUBJECT), json_response(body))
            .await;
    }

    pub async fn mount_periods(&self, profile: &str, body: Value) {
        self.mount_api("GET", &periods_path(profile), json_response(body))
            .await;
    }

    pub async fn mount_progress(&self, body: Value) {
        self.mount_api("GET", &progress_path(PERIOD), json_response(body))
            .await;
    }

    /// Every step answering successfully
    pub async fn mount_happy_path(&self) {
        self.mount_login().await;
        self.mount_who_am_i(json!({ "sameAs": SUBJECT })).await;
        self.mount_profiles(profiles_body()).await;
        self.mount_periods(PROFILE, periods_body()).await;
        self.mount_progress(progress_body()).await;
    }
}

pub fn json_response(body: Value) -> ResponseTemplate {
    ResponseTemplate::new(200).set_body_json(body)
}

/// Setup test logging
///
/// Initializes tracing subscriber for test output.
pub fn setup_test_logging() {
    use tracing_subscriber::fmt;

    let _ = fmt()
        .with_test_writer()
        .with_max_level(tracing::Level::DEBUG)
        .try_init();
}
