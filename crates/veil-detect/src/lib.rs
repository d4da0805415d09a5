//! Veil Detect — pluggable entity detection backends.
//!
//! Every backend produces [`Span`]s in char offsets against the exact input
//! text. The prompted extractor is the odd one out: an LLM rewrites the text
//! itself, so it returns a finished text/mapping pair instead of spans (see
//! `prompted`).

pub mod analyzer;
pub mod heuristic;
pub mod prompted;
pub mod statistical;

use async_trait::async_trait;
use veil_core::{Result, Span};

/// A detection backend: text in, candidate spans out.
///
/// Spans may overlap and may carry low scores; overlap elimination and
/// confidence filtering happen downstream in the resolver.
#[async_trait]
pub trait Detector: Send + Sync {
    async fn detect(&self, text: &str) -> Result<Vec<Span>>;

    /// Backend name for logs and the status endpoint.
    fn name(&self) -> &'static str;
}

pub use analyzer::AnalyzerClient;
pub use heuristic::HeuristicDetector;
pub use prompted::{ExtractionOutcome, PromptedExtractor};
pub use statistical::StatisticalDetector;
