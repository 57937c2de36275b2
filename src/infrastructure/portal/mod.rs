//! Student portal integration
//!
//! - Endpoint URLs of the identity provider and the portal APIs
//! - Login form scraping and access token extraction
//! - The HTTP client that runs the resolution pipeline

pub mod client;
pub mod endpoints;
pub mod login_form;
pub mod pipeline;
pub mod token;

pub use client::PortalClient;
pub use endpoints::{EndpointError, PortalEndpoints};
pub use login_form::HtmlFormParser;
pub use pipeline::PortalAbsenceSource;
pub use token::extract_access_token;
