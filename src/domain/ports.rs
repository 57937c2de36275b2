use async_trait::async_trait;

use super::errors::PipelineError;
use super::models::Snapshot;

/// Source of fresh absence snapshots.
///
/// The refresh cache only knows this contract; the portal pipeline is the
/// production implementation. Implementations do no caching or retrying of
/// their own.
#[async_trait]
pub trait AbsenceSource: Send + Sync {
    /// Run one full resolution and return the resulting snapshot
    ///
    /// # Returns
    /// * `Ok(Snapshot)` - freshly computed totals
    /// * `Err(PipelineError)` - the first failure encountered; nothing partial is returned
    async fn fetch_snapshot(&self) -> Result<Snapshot, PipelineError>;
}

/// A login form scraped from the identity provider's HTML page.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoginForm {
    /// Raw `action` attribute, entity-decoded; may be relative
    pub action: String,
    /// Every named input with its default value, in document order
    pub fields: Vec<(String, String)>,
}

impl LoginForm {
    /// Replace the value of `name`, or append it when the form lacks the field
    pub fn set_field(&mut self, name: &str, value: &str) {
        match self.fields.iter_mut().find(|(field, _)| field == name) {
            Some((_, existing)) => *existing = value.to_string(),
            None => self.fields.push((name.to_string(), value.to_string())),
        }
    }

    pub fn field(&self, name: &str) -> Option<&str> {
        self.fields
            .iter()
            .find(|(field, _)| field == name)
            .map(|(_, value)| value.as_str())
    }
}

/// Extracts the login form from an HTML page.
///
/// Returns `None` when the page has no form or the form has no action.
pub trait LoginFormParser: Send + Sync {
    fn parse(&self, html: &str) -> Option<LoginForm>;
}
