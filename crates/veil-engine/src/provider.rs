//! The anonymization seam: text in, rewritten text plus mappings out.
//!
//! Span detectors all go through [`SpanProvider`], which runs the
//! detect -> resolve -> synthesize pipeline. The prompted extractor produces
//! a finished rewrite on its own, so it implements the trait directly.

use async_trait::async_trait;
use tracing::debug;
use veil_core::{DetectorBackend, Error, Result, VeilConfig};
use veil_detect::{
    AnalyzerClient, Detector, HeuristicDetector, PromptedExtractor, StatisticalDetector,
};

use crate::placeholder::synthesize;
use crate::resolver::resolve_spans;

/// Rewritten text and the placeholder -> original pairs behind it.
#[derive(Debug, Clone)]
pub struct AnonymizationResult {
    pub anonymized_text: String,
    pub mappings: Vec<(String, String)>,
}

#[async_trait]
pub trait AnonymizationProvider: Send + Sync {
    async fn anonymize(&self, text: &str) -> Result<AnonymizationResult>;

    fn name(&self) -> &'static str;
}

/// Pipeline provider over any span detector.
pub struct SpanProvider<D: Detector> {
    detector: D,
    min_score: f64,
}

impl<D: Detector> SpanProvider<D> {
    pub fn new(detector: D, min_score: f64) -> Self {
        Self {
            detector,
            min_score,
        }
    }
}

#[async_trait]
impl<D: Detector> AnonymizationProvider for SpanProvider<D> {
    async fn anonymize(&self, text: &str) -> Result<AnonymizationResult> {
        let spans = self.detector.detect(text).await?;
        let resolved = resolve_spans(spans, self.min_score);
        debug!(
            detector = self.detector.name(),
            spans = resolved.len(),
            "Resolved detection spans"
        );
        let (anonymized_text, mappings) = synthesize(text, &resolved);
        Ok(AnonymizationResult {
            anonymized_text,
            mappings,
        })
    }

    fn name(&self) -> &'static str {
        self.detector.name()
    }
}

/// LLM-backed provider; the model does the rewriting itself.
pub struct PromptedProvider {
    extractor: PromptedExtractor,
}

impl PromptedProvider {
    pub fn new(extractor: PromptedExtractor) -> Self {
        Self { extractor }
    }
}

#[async_trait]
impl AnonymizationProvider for PromptedProvider {
    async fn anonymize(&self, text: &str) -> Result<AnonymizationResult> {
        let outcome = self.extractor.extract(text).await?;
        Ok(AnonymizationResult {
            anonymized_text: outcome.anonymized_text,
            mappings: outcome.mappings.into_iter().collect(),
        })
    }

    fn name(&self) -> &'static str {
        "prompted"
    }
}

/// Build the provider the configuration selects.
pub fn provider_from_config(config: &VeilConfig) -> Result<Box<dyn AnonymizationProvider>> {
    let provider: Box<dyn AnonymizationProvider> = match config.detector {
        DetectorBackend::Heuristic => Box::new(SpanProvider::new(
            HeuristicDetector::new(),
            config.min_score,
        )),
        DetectorBackend::Statistical => Box::new(SpanProvider::new(
            StatisticalDetector::new(),
            config.min_score,
        )),
        DetectorBackend::Prompted => {
            Box::new(PromptedProvider::new(PromptedExtractor::new(&config.llm)))
        }
        DetectorBackend::Analyzer => {
            let url = config.analyzer_url.as_deref().ok_or_else(|| {
                Error::Config("analyzer backend selected but no analyzer URL set".to_string())
            })?;
            Box::new(SpanProvider::new(AnalyzerClient::new(url), config.min_score))
        }
    };
    Ok(provider)
}
