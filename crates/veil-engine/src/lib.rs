//! Veil Engine — detection span resolution, placeholder synthesis, and the
//! anonymize/de-anonymize orchestration around the mapping store.

pub mod engine;
pub mod placeholder;
pub mod provider;
pub mod resolver;

pub use engine::AnonymizationEngine;
pub use provider::{
    provider_from_config, AnonymizationProvider, AnonymizationResult, PromptedProvider, SpanProvider,
};
pub use resolver::resolve_spans;
