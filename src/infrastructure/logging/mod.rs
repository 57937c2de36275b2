//! Logging infrastructure
//!
//! Structured logging using tracing and tracing-subscriber:
//! - JSON or pretty console output on stderr
//! - Optional rotating file output
//! - Secret scrubbing for upstream text

pub mod logger;
pub mod secret_scrubbing;

pub use logger::{parse_log_level, LoggerImpl};
pub use secret_scrubbing::SecretScrubber;
