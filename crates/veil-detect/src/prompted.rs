//! LLM-prompted extraction.
//!
//! Unlike the span detectors, the model rewrites the whole document itself
//! and reports which placeholder stands for which original value. The
//! extractor's job is transport plus parsing the model's two-part reply:
//! an `Anonymized Text:` section and a fenced JSON mapping block.
//!
//! Model output is untrusted. A reply that does not follow the expected
//! shape degrades to "use the raw reply, no mappings" instead of failing
//! the call; only transport and HTTP errors surface as errors.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::Regex;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, warn};
use veil_core::{Error, LlmSettings, Result};

/// Rewritten text plus the placeholder -> original value table the model
/// reported. `mappings` is empty when the reply could not be parsed.
#[derive(Debug, Clone)]
pub struct ExtractionOutcome {
    pub anonymized_text: String,
    pub mappings: BTreeMap<String, String>,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

static ANONYMIZED_SECTION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)Anonymized Text:\s*(.*?)\s*(?:```json|$)").unwrap()
});

static JSON_BLOCK_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?s)```json\s*(\{.*?\})\s*```").unwrap());

/// Client for a local generate endpoint that rewrites text in one shot.
pub struct PromptedExtractor {
    client: Client,
    base_url: String,
    model: String,
}

impl PromptedExtractor {
    pub fn new(settings: &LlmSettings) -> Self {
        Self {
            client: Client::new(),
            base_url: settings.base_url.trim_end_matches('/').to_string(),
            model: settings.model.clone(),
        }
    }

    /// Ask the model to rewrite `text` with placeholders.
    pub async fn extract(&self, text: &str) -> Result<ExtractionOutcome> {
        let body = json!({
            "model": self.model,
            "prompt": build_prompt(text),
            "stream": false,
        });

        let url = format!("{}/api/generate", self.base_url);
        debug!("Prompted extraction via {} with model {}", url, self.model);

        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| Error::Detection(format!("LLM request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(Error::Detection(format!("LLM error {status}: {body}")));
        }

        let generated: GenerateResponse = response
            .json()
            .await
            .map_err(|e| Error::Detection(format!("LLM response decode failed: {e}")))?;

        Ok(parse_reply(&generated.response))
    }
}

fn build_prompt(text: &str) -> String {
    format!(
        "You are an anonymization assistant. Replace every piece of personal \
         data in the text below (names, email addresses, phone numbers, \
         addresses, identification numbers, organizations) with numbered \
         placeholders of the form [[TYPE_N]], for example [[PERSON_1]] or \
         [[EMAIL_1]]. Reuse the same placeholder for repeated values.\n\n\
         Reply in exactly this format:\n\n\
         Anonymized Text:\n\
         <the rewritten text>\n\n\
         ```json\n\
         {{\"[[PERSON_1]]\": \"original value\"}}\n\
         ```\n\n\
         Text:\n{text}"
    )
}

/// Parse the model reply; fall back to the raw reply with no mappings when
/// either section is missing or the JSON does not decode.
fn parse_reply(reply: &str) -> ExtractionOutcome {
    let anonymized = ANONYMIZED_SECTION_RE
        .captures(reply)
        .and_then(|c| c.get(1))
        .map(|m| m.as_str().to_string());

    let mappings = JSON_BLOCK_RE
        .captures(reply)
        .and_then(|c| c.get(1))
        .and_then(|m| serde_json::from_str::<BTreeMap<String, String>>(m.as_str()).ok());

    match (anonymized, mappings) {
        (Some(text), Some(raw)) => ExtractionOutcome {
            anonymized_text: text,
            mappings: raw
                .into_iter()
                .map(|(k, v)| (normalize_placeholder(&k), v))
                .collect(),
        },
        (Some(text), None) => {
            warn!("LLM reply had no parseable mapping block");
            ExtractionOutcome {
                anonymized_text: text,
                mappings: BTreeMap::new(),
            }
        }
        _ => {
            warn!("LLM reply did not follow the expected format");
            ExtractionOutcome {
                anonymized_text: reply.trim().to_string(),
                mappings: BTreeMap::new(),
            }
        }
    }
}

/// Models sometimes emit bare keys like `PERSON_1`; stored placeholders are
/// always bracketed so lookup and replacement agree.
fn normalize_placeholder(key: &str) -> String {
    let key = key.trim();
    if key.starts_with("[[") && key.ends_with("]]") {
        key.to_string()
    } else {
        format!("[[{key}]]")
    }
}
