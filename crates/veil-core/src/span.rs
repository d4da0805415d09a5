//! Detected entity spans.
//!
//! All span offsets are Unicode scalar (char) positions, half-open. Detectors
//! that produce byte or token offsets must convert at their own boundary;
//! substitution slices by char position, so a byte/char mix-up would corrupt
//! any text containing multi-byte characters.

use serde::{Deserialize, Serialize};
use std::ops::Range;

use crate::error::{Error, Result};

/// A detected sensitive span: half-open char range, type tag, confidence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Span {
    pub start: usize,
    pub end: usize,
    pub entity_type: String,
    pub score: f64,
}

impl Span {
    /// Create a span, validating `start < end` and `score` in `[0, 1]`.
    pub fn new(start: usize, end: usize, entity_type: impl Into<String>, score: f64) -> Result<Self> {
        if start >= end {
            return Err(Error::Detection(format!(
                "invalid span: start {} >= end {}",
                start, end
            )));
        }
        if !(0.0..=1.0).contains(&score) {
            return Err(Error::Detection(format!(
                "invalid span score: {}",
                score
            )));
        }
        Ok(Self {
            start,
            end,
            entity_type: entity_type.into(),
            score,
        })
    }

    /// Span length in chars.
    pub fn char_len(&self) -> usize {
        self.end - self.start
    }

    /// Resolve this span's char offsets to a byte range in `text`.
    ///
    /// Returns None if the span extends past the end of the text. This is the
    /// re-validation barrier for detectors whose offsets come from a remote
    /// service or a tokenizer: a span that doesn't land on real positions is
    /// dropped rather than spliced.
    pub fn byte_range(&self, text: &str) -> Option<Range<usize>> {
        char_range_to_bytes(text, self.start, self.end)
    }

    /// The text this span covers, or None if it doesn't fit `text`.
    pub fn slice<'t>(&self, text: &'t str) -> Option<&'t str> {
        self.byte_range(text).map(|r| &text[r])
    }
}

/// Convert a half-open char range to a byte range in `text`.
pub fn char_range_to_bytes(text: &str, start: usize, end: usize) -> Option<Range<usize>> {
    if start >= end {
        return None;
    }
    let mut byte_start = None;
    let mut byte_end = None;
    for (char_idx, (byte_idx, _)) in text.char_indices().enumerate() {
        if char_idx == start {
            byte_start = Some(byte_idx);
        }
        if char_idx == end {
            byte_end = Some(byte_idx);
            break;
        }
    }
    if byte_end.is_none() && end == text.chars().count() {
        byte_end = Some(text.len());
    }
    match (byte_start, byte_end) {
        (Some(s), Some(e)) => Some(s..e),
        _ => None,
    }
}

/// Convert a byte offset (known to be a char boundary) to a char offset.
pub fn byte_to_char_offset(text: &str, byte_offset: usize) -> usize {
    text[..byte_offset].chars().count()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_span_validation() {
        assert!(Span::new(0, 5, "PERSON", 0.9).is_ok());
        assert!(Span::new(5, 5, "PERSON", 0.9).is_err());
        assert!(Span::new(6, 5, "PERSON", 0.9).is_err());
        assert!(Span::new(0, 5, "PERSON", 1.5).is_err());
    }

    #[test]
    fn test_byte_range_ascii() {
        let span = Span::new(6, 11, "PERSON", 0.9).unwrap();
        assert_eq!(span.slice("Hello World"), Some("World"));
    }

    #[test]
    fn test_byte_range_multibyte() {
        // "café " is 5 chars but 6 bytes; the name starts at char 5.
        let text = "café Müller";
        let span = Span::new(5, 11, "PERSON", 0.9).unwrap();
        assert_eq!(span.slice(text), Some("Müller"));
    }

    #[test]
    fn test_byte_range_out_of_bounds() {
        let span = Span::new(3, 40, "PERSON", 0.9).unwrap();
        assert_eq!(span.byte_range("short"), None);
    }

    #[test]
    fn test_range_to_text_end() {
        let text = "naïve";
        let range = char_range_to_bytes(text, 0, 5).unwrap();
        assert_eq!(&text[range], "naïve");
    }

    #[test]
    fn test_byte_to_char_offset() {
        let text = "café Müller";
        assert_eq!(byte_to_char_offset(text, 0), 0);
        // 'é' is 2 bytes; 'M' sits at byte 6 but char 5.
        assert_eq!(byte_to_char_offset(text, 6), 5);
    }
}
