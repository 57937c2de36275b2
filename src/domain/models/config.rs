use serde::{Deserialize, Deserializer, Serialize};
use std::fmt;
use std::path::PathBuf;

use super::credentials::Credentials;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct Config {
    /// Portal credentials and endpoints
    #[serde(default)]
    pub portal: PortalConfig,

    /// Refresh cache timing
    #[serde(default)]
    pub cache: CacheConfig,

    /// HTTP surface
    #[serde(default)]
    pub server: ServerConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Upstream portal configuration
#[derive(Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct PortalConfig {
    /// Portal username (also the trainee registration number)
    #[serde(default, deserialize_with = "scalar_string")]
    pub username: String,

    /// Portal password
    #[serde(default, deserialize_with = "scalar_string")]
    pub password: String,

    /// Study profile id override; skips profile auto-detection when set
    #[serde(default, deserialize_with = "optional_scalar_string")]
    pub profile_id: Option<String>,

    /// Identity provider authorization URL serving the login form
    #[serde(default = "default_auth_url")]
    pub auth_url: String,

    /// Base URL of the portal REST APIs
    #[serde(default = "default_api_base_url")]
    pub api_base_url: String,

    /// Timeout applied to every upstream request, in seconds
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// User-Agent sent upstream
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

/// Registration numbers and profile ids are often written unquoted.
#[derive(Deserialize)]
#[serde(untagged)]
enum Scalar {
    Text(String),
    Number(serde_json::Number),
}

impl From<Scalar> for String {
    fn from(scalar: Scalar) -> Self {
        match scalar {
            Scalar::Text(text) => text,
            Scalar::Number(number) => number.to_string(),
        }
    }
}

fn scalar_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Scalar::deserialize(deserializer).map(String::from)
}

fn optional_scalar_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Scalar>::deserialize(deserializer)?.map(String::from))
}

fn default_auth_url() -> String {
    concat!(
        "https://sis.anatolia.edu.gr/auth/realms/Anatolia/protocol/openid-connect/auth",
        "?response_type=token",
        "&client_id=athena-act-student-portal",
        "&redirect_uri=https%3A%2F%2Fportal.student.act.edu%2Fauth%2Fopenid%2Fcallback%2Findex.html"
    )
    .to_string()
}

fn default_api_base_url() -> String {
    "https://api.anatolia.edu.gr".to_string()
}

const fn default_request_timeout_secs() -> u64 {
    10
}

fn default_user_agent() -> String {
    concat!("absence-tracker/", env!("CARGO_PKG_VERSION")).to_string()
}

impl Default for PortalConfig {
    fn default() -> Self {
        Self {
            username: String::new(),
            password: String::new(),
            profile_id: None,
            auth_url: default_auth_url(),
            api_base_url: default_api_base_url(),
            request_timeout_secs: default_request_timeout_secs(),
            user_agent: default_user_agent(),
        }
    }
}

impl fmt::Debug for PortalConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PortalConfig")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .field("profile_id", &self.profile_id)
            .field("auth_url", &self.auth_url)
            .field("api_base_url", &self.api_base_url)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("user_agent", &self.user_agent)
            .finish()
    }
}

impl PortalConfig {
    /// Copy with the password blanked out, for display
    pub fn redacted(&self) -> Self {
        Self {
            password: if self.password.is_empty() {
                String::new()
            } else {
                "[REDACTED]".to_string()
            },
            ..self.clone()
        }
    }

    pub fn credentials(&self) -> Credentials {
        Credentials::new(self.username.clone(), self.password.clone())
    }

    /// Profile override, ignoring blank values
    pub fn profile_override(&self) -> Option<&str> {
        self.profile_id
            .as_deref()
            .map(str::trim)
            .filter(|id| !id.is_empty())
    }
}

/// Refresh cache timing
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct CacheConfig {
    /// Snapshot age after which a read triggers a refresh
    #[serde(default = "default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,

    /// Cooldown after a failed refresh during which no refresh is attempted
    #[serde(default = "default_error_backoff_secs")]
    pub error_backoff_secs: u64,
}

const fn default_refresh_interval_secs() -> u64 {
    1800
}

const fn default_error_backoff_secs() -> u64 {
    300
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            refresh_interval_secs: default_refresh_interval_secs(),
            error_backoff_secs: default_error_backoff_secs(),
        }
    }
}

/// HTTP server configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

const fn default_port() -> u16 {
    5002
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Console format
    #[serde(default)]
    pub format: LogFormat,

    /// Directory for JSON log files; console only when unset
    #[serde(default)]
    pub log_dir: Option<PathBuf>,

    /// Rotation policy for log files
    #[serde(default)]
    pub rotation: RotationPolicy,
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
            log_dir: None,
            rotation: RotationPolicy::default(),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    Json,
    #[default]
    Pretty,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum RotationPolicy {
    #[default]
    Daily,
    Hourly,
    Never,
}
