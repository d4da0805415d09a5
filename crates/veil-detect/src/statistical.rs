//! Statistical NER pipeline — typed classifiers over tokenized text.
//!
//! The text is tokenized into (token, char-range) pairs once, and each
//! classifier works in token indices. Token spans are converted back to char
//! offsets through the token table, which is the only place the two offset
//! units meet.
//!
//! Any state a classifier learns from the document (surnames seen in full
//! names, for instance) lives in a per-call context built inside `detect`.
//! Nothing carries over between calls, so one document can never bias the
//! spans found in the next.

use std::collections::HashSet;

use async_trait::async_trait;
use once_cell::sync::Lazy;
use veil_core::{Result, Span};

use crate::Detector;

/// A token with its half-open char range in the source text.
#[derive(Debug, Clone)]
struct Token {
    text: String,
    start: usize,
    end: usize,
}

/// A candidate in token indices, before conversion to char offsets.
struct TokenSpan {
    start_token: usize,
    end_token: usize,
    entity_type: &'static str,
    score: f64,
}

static PERSON_TITLES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["Mr", "Mr.", "Mrs", "Mrs.", "Ms", "Ms.", "Dr", "Dr.", "Prof", "Prof."]
        .into_iter()
        .collect()
});

static LOCATION_CUES: Lazy<HashSet<&'static str>> =
    Lazy::new(|| ["in", "at", "from", "near", "to"].into_iter().collect());

static ORG_SUFFIXES: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    ["Inc", "Inc.", "Corp", "Corp.", "LLC", "Ltd", "Ltd.", "GmbH", "Co", "Co.", "AG", "S.p.A."]
        .into_iter()
        .collect()
});

// Common sentence-initial words that look like proper nouns but aren't.
static STOPWORDS: Lazy<HashSet<&'static str>> = Lazy::new(|| {
    [
        "The", "A", "An", "This", "That", "These", "Those", "It", "He", "She", "They", "We",
        "You", "I", "My", "His", "Her", "Their", "Our", "On", "In", "At", "For", "With", "And",
        "But", "Or", "If", "When", "While", "After", "Before",
    ]
    .into_iter()
    .collect()
});

/// Tokenized-text detector with person/location/organization classifiers.
pub struct StatisticalDetector;

impl StatisticalDetector {
    pub fn new() -> Self {
        Self
    }
}

impl Default for StatisticalDetector {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl Detector for StatisticalDetector {
    async fn detect(&self, text: &str) -> Result<Vec<Span>> {
        let tokens = tokenize(text);
        if tokens.is_empty() {
            return Ok(Vec::new());
        }

        // Per-call adaptive context, discarded when this function returns.
        let mut ctx = DocumentContext::default();

        let mut candidates = classify_persons(&tokens, &mut ctx);
        candidates.extend(classify_adaptive_surnames(&tokens, &ctx));
        candidates.extend(classify_locations(&tokens));
        candidates.extend(classify_organizations(&tokens));

        let mut spans = Vec::with_capacity(candidates.len());
        for c in candidates {
            let last = &tokens[c.end_token];
            let start = tokens[c.start_token].start;
            let end = last.end - trailing_punct_len(&last.text);
            spans.push(Span::new(start, end, c.entity_type, c.score)?);
        }
        Ok(spans)
    }

    fn name(&self) -> &'static str {
        "statistical"
    }
}

/// Surnames learned from full names earlier in the same document.
#[derive(Default)]
struct DocumentContext {
    surnames: HashSet<String>,
    /// Token indices already claimed by the person classifier.
    claimed: HashSet<usize>,
}

/// Whitespace tokenization with char-accurate ranges; trailing punctuation
/// stays attached so ORG_SUFFIXES can match "Inc.".
fn tokenize(text: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut current_start = None;
    let mut current = String::new();

    for (idx, ch) in text.chars().enumerate() {
        if ch.is_whitespace() {
            if let Some(start) = current_start.take() {
                tokens.push(Token {
                    text: std::mem::take(&mut current),
                    start,
                    end: idx,
                });
            }
        } else {
            if current_start.is_none() {
                current_start = Some(idx);
            }
            current.push(ch);
        }
    }
    if let Some(start) = current_start {
        let end = start + current.chars().count();
        tokens.push(Token {
            text: current,
            start,
            end,
        });
    }
    tokens
}

/// Token text with trailing sentence punctuation stripped.
fn word(token: &Token) -> &str {
    token.text.trim_end_matches(['.', ',', '!', '?', ';', ':'])
}

fn trailing_punct_len(text: &str) -> usize {
    text.chars()
        .rev()
        .take_while(|c| matches!(c, '.' | ',' | '!' | '?' | ';' | ':'))
        .count()
}

/// Punctuation that terminates a capitalized run after its token.
fn closes_run(token: &Token) -> bool {
    token.text.ends_with(['.', '!', '?', ',', ';', ':'])
}

fn is_capitalized(token: &Token) -> bool {
    let w = word(token);
    w.len() > 1
        && w.chars().next().is_some_and(|c| c.is_uppercase())
        && w.chars().skip(1).any(|c| c.is_lowercase())
}

/// Persons: a title followed by capitalized tokens, or a run of two or more
/// capitalized non-stopword tokens. Learned surnames go into the context.
fn classify_persons(tokens: &[Token], ctx: &mut DocumentContext) -> Vec<TokenSpan> {
    let mut out = Vec::new();
    let mut i = 0;

    while i < tokens.len() {
        let titled = PERSON_TITLES.contains(word(&tokens[i]));
        let name_start = if titled { i + 1 } else { i };

        let mut j = name_start;
        while j < tokens.len()
            && is_capitalized(&tokens[j])
            && !STOPWORDS.contains(word(&tokens[j]))
            && !ORG_SUFFIXES.contains(word(&tokens[j]))
        {
            j += 1;
            // Punctuation after a token closes the name run.
            if closes_run(&tokens[j - 1]) {
                break;
            }
        }
        let run = j - name_start;

        // A title vouches for a single token; otherwise require two.
        let matched = if titled { run >= 1 } else { run >= 2 };

        if matched {
            let score = if titled { 0.90 } else { 0.80 };
            out.push(TokenSpan {
                start_token: name_start,
                end_token: j - 1,
                entity_type: "PERSON",
                score,
            });
            for k in name_start..j {
                ctx.claimed.insert(k);
            }
            if run >= 2 {
                ctx.surnames.insert(word(&tokens[j - 1]).to_string());
            }
            i = j;
        } else {
            i += 1;
        }
    }
    out
}

/// Lone occurrences of surnames already seen in this document.
fn classify_adaptive_surnames(tokens: &[Token], ctx: &DocumentContext) -> Vec<TokenSpan> {
    let mut out = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if ctx.claimed.contains(&i) {
            continue;
        }
        if is_capitalized(token) && ctx.surnames.contains(word(token)) {
            out.push(TokenSpan {
                start_token: i,
                end_token: i,
                entity_type: "PERSON",
                score: 0.75,
            });
        }
    }
    out
}

/// Locations: capitalized token(s) after a location cue, mid-sentence.
fn classify_locations(tokens: &[Token]) -> Vec<TokenSpan> {
    let mut out = Vec::new();
    for i in 0..tokens.len().saturating_sub(1) {
        if !LOCATION_CUES.contains(tokens[i].text.as_str()) {
            continue;
        }
        let mut j = i + 1;
        while j < tokens.len() && is_capitalized(&tokens[j]) && !STOPWORDS.contains(word(&tokens[j]))
        {
            j += 1;
            if closes_run(&tokens[j - 1]) {
                break;
            }
        }
        if j > i + 1 {
            out.push(TokenSpan {
                start_token: i + 1,
                end_token: j - 1,
                entity_type: "LOCATION",
                score: 0.72,
            });
        }
    }
    out
}

/// Organizations: capitalized run ending in a legal-form suffix.
fn classify_organizations(tokens: &[Token]) -> Vec<TokenSpan> {
    let mut out = Vec::new();
    for (i, token) in tokens.iter().enumerate() {
        if !ORG_SUFFIXES.contains(word(token)) {
            continue;
        }
        // Walk back over the capitalized name part, never across punctuation.
        let mut start = i;
        while start > 0
            && is_capitalized(&tokens[start - 1])
            && !closes_run(&tokens[start - 1])
            && !STOPWORDS.contains(word(&tokens[start - 1]))
        {
            start -= 1;
        }
        if start < i {
            out.push(TokenSpan {
                start_token: start,
                end_token: i,
                entity_type: "ORGANIZATION",
                score: 0.85,
            });
        }
    }
    out
}
