//! Portal HTTP client running the five-step resolution pipeline.
//!
//! Every run gets its own cookie jar and two reqwest clients sharing it: one
//! that follows redirects (login page, API calls) and one that does not (the
//! login form submission, whose redirect carries the access token). Nothing
//! from a run outlives it.

use chrono::Utc;
use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT, LOCATION};
use reqwest::{redirect, Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::domain::errors::{PipelineError, PipelineResult, PipelineStep, UpstreamFailure};
use crate::domain::models::{
    AcademicPeriod, AcademicReview, AccessToken, Credentials, OpaqueId, PortalConfig,
    ProgressDocument, Snapshot, WhoAmI,
};
use crate::domain::ports::LoginFormParser;
use crate::infrastructure::logging::SecretScrubber;
use crate::services::{aggregate, select_period_id, select_profile_id};

use super::endpoints::PortalEndpoints;
use super::login_form::HtmlFormParser;
use super::token::extract_access_token;

const USERNAME_FIELD: &str = "username";
const PASSWORD_FIELD: &str = "password";
const JSON_CONTENT: &str = "application/json";
const BODY_SNIPPET_CHARS: usize = 200;

/// Clients of a single pipeline run, sharing one cookie jar.
struct PortalSession {
    browser: Client,
    submit: Client,
}

/// Client for the student portal and its identity provider.
pub struct PortalClient {
    endpoints: PortalEndpoints,
    timeout: Duration,
    user_agent: String,
    form_parser: Arc<dyn LoginFormParser>,
    scrubber: SecretScrubber,
}

impl fmt::Debug for PortalClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortalClient")
            .field("endpoints", &self.endpoints)
            .field("timeout", &self.timeout)
            .field("user_agent", &self.user_agent)
            .finish_non_exhaustive()
    }
}

impl PortalClient {
    /// Create a client from the portal configuration
    pub fn new(config: &PortalConfig) -> anyhow::Result<Self> {
        let endpoints = PortalEndpoints::new(&config.auth_url, &config.api_base_url)?;
        Ok(Self {
            endpoints,
            timeout: Duration::from_secs(config.request_timeout_secs),
            user_agent: config.user_agent.clone(),
            form_parser: Arc::new(HtmlFormParser),
            scrubber: SecretScrubber::new(),
        })
    }

    /// Replace the login form parser
    pub fn with_form_parser(mut self, form_parser: Arc<dyn LoginFormParser>) -> Self {
        self.form_parser = form_parser;
        self
    }

    /// Run the full pipeline once and return freshly computed totals.
    ///
    /// Steps run strictly in order and the first failure aborts the run.
    /// With a profile override, profile resolution issues no request.
    #[instrument(skip_all, fields(profile_override = profile_override.is_some()))]
    pub async fn run(
        &self,
        credentials: &Credentials,
        profile_override: Option<&str>,
    ) -> PipelineResult<Snapshot> {
        let session = self.session()?;

        let token = self.exchange_credentials(&session, credentials).await?;
        let subject = self.resolve_identity(&session, &token).await?;
        let profile = match profile_override {
            Some(profile) => {
                debug!(profile, "using configured study profile");
                OpaqueId::new(profile)
            }
            None => {
                self.resolve_profile(&session, &token, &subject, credentials.username())
                    .await?
            }
        };
        let period = self.resolve_period(&session, &token, &profile).await?;
        let document = self.fetch_progress(&session, &token, &period).await?;

        let snapshot = aggregate(&document, Utc::now());
        info!(
            total_used = snapshot.total_used(),
            courses = snapshot.per_course().len(),
            "absence totals resolved"
        );
        Ok(snapshot)
    }

    #[instrument(skip_all)]
    async fn exchange_credentials(
        &self,
        session: &PortalSession,
        credentials: &Credentials,
    ) -> PipelineResult<AccessToken> {
        let step = PipelineStep::CredentialExchange;

        let page = self
            .send(step, session.browser.get(self.endpoints.auth_url().clone()))
            .await?;
        let status = page.status();
        if !status.is_success() {
            return Err(self.reject(step, page).await);
        }
        let page_url = page.url().clone();
        let html = page.text().await.map_err(|err| self.failed(step, &err))?;

        let Some(mut form) = self.form_parser.parse(&html) else {
            warn!(
                %status,
                url = %page_url,
                body = %self.scrubber.snippet(&html, BODY_SNIPPET_CHARS),
                "login form not found"
            );
            return Err(PipelineError::AuthFormNotFound {
                status,
                url: page_url.to_string(),
            });
        };

        let action = page_url.join(&form.action).map_err(|err| {
            warn!(error = %err, "login form action is not a usable URL");
            PipelineError::AuthFormNotFound {
                status,
                url: page_url.to_string(),
            }
        })?;

        form.set_field(USERNAME_FIELD, credentials.username());
        form.set_field(PASSWORD_FIELD, credentials.password());
        debug!(
            action = %self.scrubber.scrub(action.as_str()),
            fields = form.fields.len(),
            "submitting login form"
        );

        let response = self
            .send(step, session.submit.post(action).form(&form.fields))
            .await?;
        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            return Err(self.reject(step, response).await);
        }

        let location = response
            .headers()
            .get(LOCATION)
            .and_then(|value| value.to_str().ok())
            .filter(|_| status.is_redirection())
            .map(str::to_string);
        let Some(location) = location else {
            warn!(%status, "login submission did not redirect");
            return Err(PipelineError::AuthRedirectMissing { status });
        };

        let token = extract_access_token(&location).ok_or_else(|| {
            warn!(
                location = %self.scrubber.scrub(&location),
                "login redirect carried no access token"
            );
            PipelineError::AuthTokenMissing
        })?;

        debug!("access token obtained");
        Ok(AccessToken::new(token))
    }

    #[instrument(skip_all)]
    async fn resolve_identity(
        &self,
        session: &PortalSession,
        token: &AccessToken,
    ) -> PipelineResult<OpaqueId> {
        let request = session.browser.get(self.endpoints.who_am_i());
        let who_am_i: WhoAmI = self
            .fetch_json(PipelineStep::IdentityResolution, request, token)
            .await?;

        let subject = who_am_i.same_as.ok_or(PipelineError::IdentityFieldMissing)?;
        debug!(%subject, "subject identity resolved");
        Ok(subject)
    }

    #[instrument(skip_all, fields(%subject))]
    async fn resolve_profile(
        &self,
        session: &PortalSession,
        token: &AccessToken,
        subject: &OpaqueId,
        username: &str,
    ) -> PipelineResult<OpaqueId> {
        let request = session
            .browser
            .post(self.endpoints.academic_review(subject))
            .json(&serde_json::json!({}));
        let review: AcademicReview = self
            .fetch_json(PipelineStep::ProfileResolution, request, token)
            .await?;

        let profiles = review.into_profiles();
        let profile = select_profile_id(&profiles, username)?;
        debug!(candidates = profiles.len(), %profile, "study profile resolved");
        Ok(profile)
    }

    #[instrument(skip_all, fields(%profile))]
    async fn resolve_period(
        &self,
        session: &PortalSession,
        token: &AccessToken,
        profile: &OpaqueId,
    ) -> PipelineResult<OpaqueId> {
        let request = session.browser.get(self.endpoints.periods(profile));
        let periods: Option<Vec<AcademicPeriod>> = self
            .fetch_json(PipelineStep::PeriodResolution, request, token)
            .await?;

        let periods = periods.unwrap_or_default();
        let period = select_period_id(&periods, Utc::now())?;
        debug!(candidates = periods.len(), %period, "study period resolved");
        Ok(period)
    }

    #[instrument(skip_all, fields(%period))]
    async fn fetch_progress(
        &self,
        session: &PortalSession,
        token: &AccessToken,
        period: &OpaqueId,
    ) -> PipelineResult<ProgressDocument> {
        let request = session.browser.get(self.endpoints.progress(period));
        let document: ProgressDocument = self
            .fetch_json(PipelineStep::ProgressFetch, request, token)
            .await?;

        debug!(modules = document.modules().len(), "progress document fetched");
        Ok(document)
    }

    fn session(&self) -> PipelineResult<PortalSession> {
        let jar = Arc::new(Jar::default());
        Ok(PortalSession {
            browser: self.http_client(&jar, redirect::Policy::default())?,
            submit: self.http_client(&jar, redirect::Policy::none())?,
        })
    }

    fn http_client(&self, jar: &Arc<Jar>, policy: redirect::Policy) -> PipelineResult<Client> {
        Client::builder()
            .cookie_provider(Arc::clone(jar))
            .redirect(policy)
            .timeout(self.timeout)
            .user_agent(self.user_agent.as_str())
            .build()
            .map_err(|err| self.failed(PipelineStep::CredentialExchange, &err))
    }

    /// Authorized JSON call; non-success statuses and undecodable bodies fail the step.
    async fn fetch_json<T: DeserializeOwned>(
        &self,
        step: PipelineStep,
        request: RequestBuilder,
        token: &AccessToken,
    ) -> PipelineResult<T> {
        let request = request
            .bearer_auth(token.secret())
            .header(ACCEPT, JSON_CONTENT);
        let response = self.send(step, request).await?;
        if !response.status().is_success() {
            return Err(self.reject(step, response).await);
        }

        let body = response.text().await.map_err(|err| self.failed(step, &err))?;
        serde_json::from_str(&body).map_err(|err| {
            warn!(
                %step,
                error = %err,
                body = %self.scrubber.snippet(&body, BODY_SNIPPET_CHARS),
                "undecodable upstream response"
            );
            PipelineError::upstream(step, UpstreamFailure::InvalidBody(err.to_string()))
        })
    }

    async fn send(&self, step: PipelineStep, request: RequestBuilder) -> PipelineResult<Response> {
        request.send().await.map_err(|err| self.failed(step, &err))
    }

    /// Log an error-status response and turn it into a step failure
    async fn reject(&self, step: PipelineStep, response: Response) -> PipelineError {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        warn!(
            %step,
            %status,
            body = %self.scrubber.snippet(&body, BODY_SNIPPET_CHARS),
            "upstream returned an error status"
        );
        PipelineError::upstream(step, UpstreamFailure::Status(status))
    }

    fn failed(&self, step: PipelineStep, err: &reqwest::Error) -> PipelineError {
        let failure = match UpstreamFailure::from_reqwest(err) {
            UpstreamFailure::Transport(msg) => UpstreamFailure::Transport(self.scrubber.scrub(&msg)),
            UpstreamFailure::InvalidBody(msg) => {
                UpstreamFailure::InvalidBody(self.scrubber.scrub(&msg))
            }
            other => other,
        };
        warn!(%step, %failure, "upstream request failed");
        PipelineError::upstream(step, failure)
    }
}
