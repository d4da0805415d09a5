//! Veil Core — span model, error taxonomy, configuration.

pub mod config;
pub mod error;
pub mod span;

pub use config::{DataPaths, DetectorBackend, FailurePolicy, LlmSettings, VeilConfig};
pub use error::{Error, Result};
pub use span::Span;
