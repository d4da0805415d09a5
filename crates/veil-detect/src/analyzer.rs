//! Remote analyzer service client.
//!
//! Talks to an external analyzer over HTTP and adapts its results to
//! [`Span`]s. The service reports char offsets against the submitted text;
//! offsets are still re-validated here since the analyzer runs out of
//! process and its view of the text cannot be assumed to match ours.

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use veil_core::{Error, Result, Span};

use crate::Detector;

/// Results below this confidence are dropped before span resolution.
const SCORE_THRESHOLD: f64 = 0.70;

#[derive(Deserialize)]
struct AnalyzerResult {
    entity_type: String,
    start: usize,
    end: usize,
    score: f64,
}

pub struct AnalyzerClient {
    client: Client,
    base_url: String,
}

impl AnalyzerClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }
}

#[async_trait]
impl Detector for AnalyzerClient {
    async fn detect(&self, text: &str) -> Result<Vec<Span>> {
        let url = format!("{}/analyze", self.base_url);
        let body = json!({
            "text": text,
            "language": "en",
        });

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Detection(format!("analyzer request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Detection(format!("analyzer error {status}: {body}")));
        }

        let results: Vec<AnalyzerResult> = response
            .json()
            .await
            .map_err(|e| Error::Detection(format!("analyzer response decode failed: {e}")))?;

        debug!("Analyzer returned {} results", results.len());
        Ok(adapt_results(text, results))
    }

    fn name(&self) -> &'static str {
        "analyzer"
    }
}

/// Filter by confidence and drop results whose offsets do not fit the text.
fn adapt_results(text: &str, results: Vec<AnalyzerResult>) -> Vec<Span> {
    let char_count = text.chars().count();
    let mut spans = Vec::with_capacity(results.len());

    for r in results {
        if r.score < SCORE_THRESHOLD {
            continue;
        }
        if r.start >= r.end || r.end > char_count {
            warn!(
                entity_type = %r.entity_type,
                start = r.start,
                end = r.end,
                "Skipping analyzer result with invalid offsets"
            );
            continue;
        }
        match Span::new(r.start, r.end, &r.entity_type, r.score) {
            Ok(span) => spans.push(span),
            Err(e) => warn!("Skipping analyzer result: {e}"),
        }
    }
    spans
}
