use anyhow::{Context, Result};
use figment::providers::{Env, Format, Serialized, Yaml};
use figment::Figment;
use std::path::Path;
use thiserror::Error;

use crate::domain::models::config::Config;
use crate::infrastructure::logging::parse_log_level;
use crate::infrastructure::portal::{EndpointError, PortalEndpoints};

/// Project-local configuration directory
pub const CONFIG_DIR: &str = ".absence-tracker";

const ENV_PREFIX: &str = "ABSENCE_TRACKER_";

/// Environment variables of the standalone service, mapped onto config keys
const LEGACY_ENV: [(&str, &str); 3] = [
    ("PORTAL_USERNAME", "portal.username"),
    ("PORTAL_PASSWORD", "portal.password"),
    ("STUDY_PROFILE_ID", "portal.profile_id"),
];

/// Prefixed variables taken verbatim instead of through figment's value parsing
const VERBATIM_ENV: [(&str, &str); 3] = [
    ("ABSENCE_TRACKER_PORTAL__USERNAME", "portal.username"),
    ("ABSENCE_TRACKER_PORTAL__PASSWORD", "portal.password"),
    ("ABSENCE_TRACKER_PORTAL__PROFILE_ID", "portal.profile_id"),
];

/// Configuration error types
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Missing portal {0}. Set portal.{0} or the matching environment variable")]
    MissingCredential(&'static str),

    #[error("Invalid refresh_interval_secs: 0. Must be at least 1")]
    InvalidRefreshInterval,

    #[error("Invalid request_timeout_secs: 0. Must be at least 1")]
    InvalidRequestTimeout,

    #[error("Invalid portal endpoint: {0}")]
    InvalidEndpoint(#[from] EndpointError),

    #[error("Invalid log level: {0}. Must be one of: trace, debug, info, warn, error")]
    InvalidLogLevel(String),
}

/// Configuration loader with hierarchical merging
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration with hierarchical merging
    ///
    /// Precedence (lowest to highest):
    /// 1. Programmatic defaults (Serialized)
    /// 2. .absence-tracker/config.yaml (project config)
    /// 3. .absence-tracker/local.yaml (project local overrides, optional)
    /// 4. PORTAL_USERNAME, PORTAL_PASSWORD, STUDY_PROFILE_ID
    /// 5. Environment variables (ABSENCE_TRACKER_* prefix, highest priority)
    pub fn load() -> Result<Config> {
        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(Path::new(CONFIG_DIR).join("config.yaml")))
            .merge(Yaml::file(Path::new(CONFIG_DIR).join("local.yaml")));

        let config: Config = with_env(figment)
            .extract()
            .context("Failed to extract configuration from figment")?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Load configuration from a specific file; environment overrides still apply
    pub fn load_from_file(path: impl AsRef<Path>) -> Result<Config> {
        let path = path.as_ref();
        if !path.exists() {
            anyhow::bail!("Config file not found: {}", path.display());
        }

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(path));

        let config: Config = with_env(figment)
            .extract()
            .with_context(|| format!("Failed to load config from {}", path.display()))?;

        Self::validate(&config)?;
        Ok(config)
    }

    /// Validate configuration after loading
    pub fn validate(config: &Config) -> Result<(), ConfigError> {
        if config.cache.refresh_interval_secs == 0 {
            return Err(ConfigError::InvalidRefreshInterval);
        }

        if config.portal.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidRequestTimeout);
        }

        PortalEndpoints::new(&config.portal.auth_url, &config.portal.api_base_url)?;

        if parse_log_level(&config.logging.level).is_err() {
            return Err(ConfigError::InvalidLogLevel(config.logging.level.clone()));
        }

        Ok(())
    }

    /// Commands that talk to the portal need both credentials
    pub fn require_credentials(config: &Config) -> Result<(), ConfigError> {
        if config.portal.username.trim().is_empty() {
            return Err(ConfigError::MissingCredential("username"));
        }
        if config.portal.password.is_empty() {
            return Err(ConfigError::MissingCredential("password"));
        }
        Ok(())
    }
}

/// Layer environment overrides on top of file configuration.
///
/// Credentials and the profile id are merged as the exact strings that were
/// set; other prefixed variables go through figment's value parsing.
fn with_env(figment: Figment) -> Figment {
    let verbatim_keys: Vec<&str> = VERBATIM_ENV.iter().map(|(_, key)| *key).collect();
    let figment = merge_verbatim(figment, &LEGACY_ENV).merge(
        Env::prefixed(ENV_PREFIX)
            .split("__")
            .ignore(&verbatim_keys),
    );
    merge_verbatim(figment, &VERBATIM_ENV)
}

fn merge_verbatim(figment: Figment, vars: &[(&str, &str)]) -> Figment {
    vars.iter()
        .fold(figment, |figment, (var, key)| match std::env::var(var) {
            Ok(value) if !value.is_empty() => figment.merge((*key, value)),
            _ => figment,
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn yaml_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{contents}").unwrap();
        file.flush().unwrap();
        file
    }

    const NO_ENV: [(&str, Option<&str>); 7] = [
        ("PORTAL_USERNAME", None),
        ("PORTAL_PASSWORD", None),
        ("STUDY_PROFILE_ID", None),
        ("ABSENCE_TRACKER_PORTAL__USERNAME", None),
        ("ABSENCE_TRACKER_PORTAL__PASSWORD", None),
        ("ABSENCE_TRACKER_PORTAL__PROFILE_ID", None),
        ("ABSENCE_TRACKER_CACHE__REFRESH_INTERVAL_SECS", None),
    ];

    #[test]
    fn test_default_config_is_valid() {
        let config = Config::default();
        ConfigLoader::validate(&config).expect("Default config should be valid");
        assert!(matches!(
            ConfigLoader::require_credentials(&config),
            Err(ConfigError::MissingCredential("username"))
        ));
    }

    #[test]
    fn test_load_from_file() {
        let file = yaml_file(
            r"
portal:
  username: s1234
  password: hunter2
  profile_id: '  '
cache:
  refresh_interval_secs: 60
logging:
  level: debug
  format: json
",
        );

        let config =
            temp_env::with_vars(NO_ENV, || ConfigLoader::load_from_file(file.path())).unwrap();

        assert_eq!(config.portal.username, "s1234");
        assert_eq!(config.portal.profile_override(), None);
        assert_eq!(config.cache.refresh_interval_secs, 60);
        assert_eq!(config.cache.error_backoff_secs, 300, "Default should persist");
        assert_eq!(config.logging.level, "debug");
        ConfigLoader::require_credentials(&config).unwrap();
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let result = ConfigLoader::load_from_file("/nonexistent/absence-tracker.yaml");
        assert!(result.is_err());
    }

    #[test]
    fn test_legacy_env_overrides_file() {
        let file = yaml_file("portal:\n  username: from-file\n  password: file-pass\n");

        let config = temp_env::with_vars(
            [
                ("PORTAL_USERNAME", Some("20231234")),
                ("PORTAL_PASSWORD", Some("env-pass")),
                ("STUDY_PROFILE_ID", Some("777")),
                ("ABSENCE_TRACKER_PORTAL__USERNAME", None),
                ("ABSENCE_TRACKER_PORTAL__PASSWORD", None),
                ("ABSENCE_TRACKER_PORTAL__PROFILE_ID", None),
                ("ABSENCE_TRACKER_CACHE__REFRESH_INTERVAL_SECS", None),
            ],
            || ConfigLoader::load_from_file(file.path()),
        )
        .unwrap();

        assert_eq!(config.portal.username, "20231234");
        assert_eq!(config.portal.password, "env-pass");
        assert_eq!(config.portal.profile_override(), Some("777"));
    }

    #[test]
    fn test_numeric_username_in_file() {
        let file = yaml_file("portal:\n  username: 20231234\n  password: file-pass\n");

        let config =
            temp_env::with_vars(NO_ENV, || ConfigLoader::load_from_file(file.path())).unwrap();

        assert_eq!(config.portal.username, "20231234");
    }

    #[test]
    fn test_prefixed_env_wins_over_legacy_env() {
        let file = yaml_file("portal:\n  password: file-pass\n");

        let config = temp_env::with_vars(
            [
                ("PORTAL_USERNAME", Some("legacy-user")),
                ("PORTAL_PASSWORD", None),
                ("STUDY_PROFILE_ID", None),
                ("ABSENCE_TRACKER_PORTAL__USERNAME", Some("prefixed-user")),
                ("ABSENCE_TRACKER_PORTAL__PASSWORD", None),
                ("ABSENCE_TRACKER_PORTAL__PROFILE_ID", None),
                ("ABSENCE_TRACKER_CACHE__REFRESH_INTERVAL_SECS", Some("90")),
            ],
            || ConfigLoader::load_from_file(file.path()),
        )
        .unwrap();

        assert_eq!(config.portal.username, "prefixed-user");
        assert_eq!(config.cache.refresh_interval_secs, 90);
    }

    #[test]
    fn test_prefixed_credentials_are_kept_verbatim() {
        let file = yaml_file("portal:\n  username: from-file\n");

        let config = temp_env::with_vars(
            [
                ("PORTAL_USERNAME", Some("legacy-user")),
                ("PORTAL_PASSWORD", None),
                ("STUDY_PROFILE_ID", None),
                ("ABSENCE_TRACKER_PORTAL__USERNAME", Some("0123456")),
                ("ABSENCE_TRACKER_PORTAL__PASSWORD", Some("true")),
                ("ABSENCE_TRACKER_PORTAL__PROFILE_ID", Some("[x]")),
                ("ABSENCE_TRACKER_CACHE__REFRESH_INTERVAL_SECS", Some("90")),
            ],
            || ConfigLoader::load_from_file(file.path()),
        )
        .unwrap();

        assert_eq!(config.portal.username, "0123456");
        assert_eq!(config.portal.password, "true");
        assert_eq!(config.portal.profile_override(), Some("[x]"));
        assert_eq!(config.cache.refresh_interval_secs, 90);
    }

    #[test]
    fn test_validate_zero_refresh_interval() {
        let mut config = Config::default();
        config.cache.refresh_interval_secs = 0;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidRefreshInterval)
        ));
    }

    #[test]
    fn test_validate_zero_timeout() {
        let mut config = Config::default();
        config.portal.request_timeout_secs = 0;

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidRequestTimeout)
        ));
    }

    #[test]
    fn test_validate_bad_url() {
        let mut config = Config::default();
        config.portal.api_base_url = "not a url".to_string();

        assert!(matches!(
            ConfigLoader::validate(&config),
            Err(ConfigError::InvalidEndpoint(_))
        ));
    }

    #[test]
    fn test_validate_invalid_log_level() {
        let mut config = Config::default();
        config.logging.level = "invalid".to_string();

        match ConfigLoader::validate(&config) {
            Err(ConfigError::InvalidLogLevel(level)) => assert_eq!(level, "invalid"),
            other => panic!("Expected InvalidLogLevel error, got {other:?}"),
        }
    }

    #[test]
    fn test_require_credentials_password() {
        let mut config = Config::default();
        config.portal.username = "s1".to_string();

        assert!(matches!(
            ConfigLoader::require_credentials(&config),
            Err(ConfigError::MissingCredential("password"))
        ));
    }

    #[test]
    fn test_hierarchical_merging() {
        let base_file = yaml_file("cache:\n  refresh_interval_secs: 100\n  error_backoff_secs: 10\n");
        let override_file = yaml_file("cache:\n  refresh_interval_secs: 200\n");

        let config: Config = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Yaml::file(base_file.path()))
            .merge(Yaml::file(override_file.path()))
            .extract()
            .unwrap();

        assert_eq!(config.cache.refresh_interval_secs, 200, "Override should win");
        assert_eq!(
            config.cache.error_backoff_secs, 10,
            "Base value should persist when not overridden"
        );
    }
}
