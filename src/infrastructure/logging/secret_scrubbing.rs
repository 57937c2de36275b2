use regex::Regex;
use std::fmt;

/// Redacts credentials and tokens from upstream text before it is logged.
#[derive(Clone)]
pub struct SecretScrubber {
    bearer_pattern: Regex,
    access_token_pattern: Regex,
    json_secret_pattern: Regex,
    form_password_pattern: Regex,
}

impl SecretScrubber {
    /// Create a new secret scrubber
    pub fn new() -> Self {
        Self {
            // Bearer tokens in Authorization headers
            bearer_pattern: Regex::new(r"Bearer\s+[a-zA-Z0-9\-_\.~+/]+=*").unwrap(),
            // Implicit-flow redirect fragments and query strings
            access_token_pattern: Regex::new(r"(access_token|id_token|refresh_token|code)=[^&\s#]+")
                .unwrap(),
            // JSON fields holding secrets
            json_secret_pattern: Regex::new(
                r#""(password|access_token|refresh_token|id_token|token|secret)"\s*:\s*"[^"]*""#,
            )
            .unwrap(),
            // Form-encoded password fields
            form_password_pattern: Regex::new(r"password=[^&\s]+").unwrap(),
        }
    }

    /// Scrub a message of sensitive data
    pub fn scrub(&self, message: &str) -> String {
        let scrubbed = self
            .bearer_pattern
            .replace_all(message, "Bearer [TOKEN_REDACTED]");
        let scrubbed = self
            .access_token_pattern
            .replace_all(&scrubbed, "$1=[REDACTED]");
        let scrubbed = self
            .json_secret_pattern
            .replace_all(&scrubbed, r#""$1":"[REDACTED]""#);
        self.form_password_pattern
            .replace_all(&scrubbed, "password=[REDACTED]")
            .into_owned()
    }

    /// First `max_chars` characters of `body`, single-lined and scrubbed
    pub fn snippet(&self, body: &str, max_chars: usize) -> String {
        let head: String = body.chars().take(max_chars).collect();
        self.scrub(&head.replace(['\n', '\r'], " "))
    }
}

impl Default for SecretScrubber {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for SecretScrubber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecretScrubber").finish()
    }
}
