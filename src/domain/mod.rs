//! Domain layer
//!
//! Core data model, error taxonomy and the ports the pipeline and cache are
//! wired through.

pub mod errors;
pub mod models;
pub mod ports;

pub use errors::{PipelineError, PipelineResult, PipelineStep, UpstreamFailure};
