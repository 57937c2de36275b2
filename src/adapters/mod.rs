//! Adapters exposing the service to consumers.

pub mod absences_http;

pub use absences_http::{router, AbsencesHttpServer, AbsencesState};
