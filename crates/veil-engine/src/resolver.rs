//! Span overlap resolution.

use veil_core::Span;

/// Reduce detector output to an ordered, non-overlapping subset.
///
/// Spans below `min_score` are dropped first. The rest are sorted by start
/// ascending with longer spans winning ties, then walked greedily: a span is
/// kept only if it begins at or after the end of the last kept span. Not
/// globally optimal, but deterministic for identical detector output.
pub fn resolve_spans(mut spans: Vec<Span>, min_score: f64) -> Vec<Span> {
    spans.retain(|s| s.score >= min_score);
    spans.sort_by(|a, b| {
        a.start
            .cmp(&b.start)
            .then_with(|| b.char_len().cmp(&a.char_len()))
    });

    let mut kept: Vec<Span> = Vec::with_capacity(spans.len());
    for span in spans {
        match kept.last() {
            Some(last) if span.start < last.end => {}
            _ => kept.push(span),
        }
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn span(start: usize, end: usize, entity_type: &str, score: f64) -> Span {
        Span::new(start, end, entity_type, score).unwrap()
    }

    #[test]
    fn test_overlapping_spans_keep_first() {
        let resolved = resolve_spans(
            vec![span(3, 8, "PERSON", 0.9), span(0, 5, "EMAIL", 0.9)],
            0.0,
        );
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].start, 0);
        assert_eq!(resolved[0].entity_type, "EMAIL");
    }

    #[test]
    fn test_same_start_prefers_longer() {
        let resolved = resolve_spans(
            vec![span(0, 3, "PERSON", 0.9), span(0, 7, "PERSON", 0.9)],
            0.0,
        );
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].end, 7);
    }

    #[test]
    fn test_low_score_dropped() {
        let resolved = resolve_spans(
            vec![span(0, 4, "PERSON", 0.50), span(10, 14, "EMAIL", 0.95)],
            0.70,
        );
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].entity_type, "EMAIL");
    }

    #[test]
    fn test_adjacent_spans_both_kept() {
        // Half-open ranges: [0,5) and [5,9) do not overlap.
        let resolved = resolve_spans(
            vec![span(0, 5, "PERSON", 0.9), span(5, 9, "PERSON", 0.9)],
            0.0,
        );
        assert_eq!(resolved.len(), 2);
    }

    #[test]
    fn test_output_sorted_and_disjoint() {
        let resolved = resolve_spans(
            vec![
                span(20, 25, "EMAIL", 0.9),
                span(0, 6, "PERSON", 0.9),
                span(4, 10, "PHONE", 0.9),
                span(8, 15, "LOCATION", 0.9),
            ],
            0.0,
        );
        for pair in resolved.windows(2) {
            assert!(pair[0].end <= pair[1].start);
        }
    }

    #[test]
    fn test_empty_input() {
        assert!(resolve_spans(Vec::new(), 0.70).is_empty());
    }

    #[test]
    fn test_deterministic_under_input_order() {
        let a = vec![
            span(0, 6, "PERSON", 0.9),
            span(4, 10, "PHONE", 0.9),
            span(8, 15, "LOCATION", 0.9),
            span(20, 25, "EMAIL", 0.9),
        ];
        let mut b = a.clone();
        b.reverse();
        assert_eq!(resolve_spans(a, 0.70), resolve_spans(b, 0.70));
    }
}
