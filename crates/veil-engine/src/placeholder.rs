//! Placeholder synthesis and text rewriting.

use std::collections::HashMap;

use tracing::warn;
use veil_core::Span;

/// Replace each resolved span with a `[[TYPE_N]]` token.
///
/// Spans are spliced in descending start order so replacements never shift
/// the offsets of spans still waiting. That is also the order the
/// per-entity-type counters are assigned in. Counters live only for this
/// call; two calls over the same text always produce the same tokens.
///
/// Expects the resolver's output: sorted ascending, non-overlapping.
pub fn synthesize(text: &str, spans: &[Span]) -> (String, Vec<(String, String)>) {
    let mut result = text.to_string();
    let mut counters: HashMap<String, usize> = HashMap::new();
    let mut mappings = Vec::with_capacity(spans.len());

    for span in spans.iter().rev() {
        let (range, original) = match (span.byte_range(text), span.slice(text)) {
            (Some(range), Some(original)) => (range, original.to_string()),
            _ => {
                warn!(
                    start = span.start,
                    end = span.end,
                    "Skipping span outside text bounds"
                );
                continue;
            }
        };

        let counter = counters
            .entry(span.entity_type.to_uppercase())
            .and_modify(|c| *c += 1)
            .or_insert(1);
        let placeholder = format!("[[{}_{}]]", span.entity_type.to_uppercase(), counter);

        result.replace_range(range, &placeholder);
        mappings.push((placeholder, original));
    }

    (result, mappings)
}
