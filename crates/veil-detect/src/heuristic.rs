//! Heuristic pattern detector — compiled regexes, no external dependency.
//!
//! Low recall (no names, no free-form addresses), high precision on
//! structured identifiers. Deterministic for a given input.

use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use veil_core::span::byte_to_char_offset;
use veil_core::{Result, Span};

use crate::Detector;

// Compiled once, reused across calls.
static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}").unwrap());
static PHONE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?:\+?\d{1,3}[-.\s]?)?\(?\d{3}\)?[-.\s]?\d{3}[-.\s]?\d{4}").unwrap());
static SSN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b\d{3}-\d{2}-\d{4}\b").unwrap());
static CC_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(?:\d{4}[-\s]?){3}\d{4}\b").unwrap());
static IPV4_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"\b(?:(?:25[0-5]|2[0-4]\d|[01]?\d\d?)\.){3}(?:25[0-5]|2[0-4]\d|[01]?\d\d?)\b")
        .unwrap()
});
static IBAN_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b[A-Z]{2}\d{2}(?:\s?[A-Z0-9]{4}){3,7}\b").unwrap());

/// Regex/dictionary entity detector.
pub struct HeuristicDetector;

impl HeuristicDetector {
    pub fn new() -> Self {
        Self
    }

    fn patterns() -> [(&'static str, &'static Lazy<Regex>, f64); 6] {
        [
            ("EMAIL", &EMAIL_RE, 0.95),
            ("SSN", &SSN_RE, 0.90),
            ("CREDIT_CARD", &CC_RE, 0.95),
            ("IBAN", &IBAN_RE, 0.90),
            ("PHONE", &PHONE_RE, 0.75),
            ("IP_ADDRESS", &IPV4_RE, 0.80),
        ]
    }
}

impl Default for HeuristicDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Detector for HeuristicDetector {
    async fn detect(&self, text: &str) -> Result<Vec<Span>> {
        let mut spans = Vec::new();

        for (entity_type, regex, score) in Self::patterns() {
            for m in regex.find_iter(text) {
                match entity_type {
                    // Card candidates must pass the Luhn check; the pattern
                    // alone also matches phone-like digit runs.
                    "CREDIT_CARD" if !is_valid_luhn(m.as_str()) => continue,
                    // Dotted version numbers look like IPs.
                    "IP_ADDRESS" if is_likely_version_number(m.as_str()) => continue,
                    _ => {}
                }

                // Regex offsets are bytes; spans carry char positions.
                let start = byte_to_char_offset(text, m.start());
                let end = byte_to_char_offset(text, m.end());
                spans.push(Span::new(start, end, entity_type, score)?);
            }
        }

        Ok(spans)
    }

    fn name(&self) -> &'static str {
        "heuristic"
    }
}

/// Luhn checksum for card number candidates.
fn is_valid_luhn(candidate: &str) -> bool {
    let digits: Vec<u32> = candidate.chars().filter_map(|c| c.to_digit(10)).collect();
    if digits.len() < 13 || digits.len() > 19 {
        return false;
    }

    let checksum: u32 = digits
        .iter()
        .rev()
        .enumerate()
        .map(|(idx, &digit)| {
            if idx % 2 == 1 {
                let doubled = digit * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                digit
            }
        })
        .sum();

    checksum % 10 == 0
}

/// Dotted quads with leading/trailing zeros are usually version strings.
fn is_likely_version_number(candidate: &str) -> bool {
    let parts: Vec<&str> = candidate.split('.').collect();
    if parts.len() != 4 {
        return false;
    }
    let zero_count = parts.iter().filter(|&&p| p == "0").count();
    parts[0] == "0" || parts[3] == "0" || zero_count >= 2
}
