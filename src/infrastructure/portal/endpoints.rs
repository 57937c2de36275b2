use thiserror::Error;
use url::Url;

use crate::domain::models::OpaqueId;

const WHO_AM_I_QUERY: &str = "$top=1&$skip=0&$count=false";

#[derive(Debug, Error)]
pub enum EndpointError {
    #[error("Invalid {name} URL '{value}': {source}")]
    Invalid {
        name: &'static str,
        value: String,
        #[source]
        source: url::ParseError,
    },

    #[error("{name} URL '{value}' cannot be used as a base URL")]
    NotABase { name: &'static str, value: String },
}

/// URLs of every upstream call the pipeline makes.
#[derive(Debug, Clone)]
pub struct PortalEndpoints {
    auth_url: Url,
    api_base: Url,
}

impl PortalEndpoints {
    pub fn new(auth_url: &str, api_base_url: &str) -> Result<Self, EndpointError> {
        let auth_url = parse("auth", auth_url)?;
        let api_base = parse("api base", api_base_url)?;
        if api_base.cannot_be_a_base() {
            return Err(EndpointError::NotABase {
                name: "api base",
                value: api_base_url.to_string(),
            });
        }
        Ok(Self { auth_url, api_base })
    }

    /// Identity provider page serving the login form
    pub fn auth_url(&self) -> &Url {
        &self.auth_url
    }

    pub fn who_am_i(&self) -> Url {
        let mut url = self.api_url(&["api", "users", "me", ""]);
        url.set_query(Some(WHO_AM_I_QUERY));
        url
    }

    pub fn academic_review(&self, student: &OpaqueId) -> Url {
        self.api_url(&[
            "athena-conductor",
            "rest",
            "persons",
            "students",
            student.as_str(),
            "academic-review",
        ])
    }

    pub fn periods(&self, study_profile: &OpaqueId) -> Url {
        self.api_url(&[
            "athena-conductor",
            "rest",
            "study-profiles",
            study_profile.as_str(),
            "periods",
        ])
    }

    pub fn progress(&self, period: &OpaqueId) -> Url {
        self.api_url(&[
            "athena-conductor",
            "rest",
            "study-profiles",
            "periods",
            period.as_str(),
            "progress",
        ])
    }

    fn api_url(&self, segments: &[&str]) -> Url {
        let mut url = self.api_base.clone();
        url.set_query(None);
        // checked in `new`
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }
}

fn parse(name: &'static str, value: &str) -> Result<Url, EndpointError> {
    Url::parse(value).map_err(|source| EndpointError::Invalid {
        name,
        value: value.to_string(),
        source,
    })
}
