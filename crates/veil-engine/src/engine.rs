//! Anonymization orchestration and exact de-anonymization.

use std::sync::Arc;

use tracing::{debug, info, warn};
use veil_core::{Error, FailurePolicy, Result};
use veil_store::MappingStore;

use crate::provider::AnonymizationProvider;

pub struct AnonymizationEngine {
    provider: Box<dyn AnonymizationProvider>,
    store: Arc<MappingStore>,
    failure_policy: FailurePolicy,
}

impl AnonymizationEngine {
    pub fn new(
        provider: Box<dyn AnonymizationProvider>,
        store: Arc<MappingStore>,
        failure_policy: FailurePolicy,
    ) -> Self {
        Self {
            provider,
            store,
            failure_policy,
        }
    }

    pub fn backend_name(&self) -> &'static str {
        self.provider.name()
    }

    /// Anonymize `text` and persist the resulting mappings for the session.
    ///
    /// Persistence and the returned text are one unit of work: if saving
    /// fails, the caller never sees the rewritten text. Blank input is a
    /// no-op.
    pub async fn anonymize(&self, text: &str, session_id: &str) -> Result<String> {
        if text.trim().is_empty() {
            return Ok(text.to_string());
        }

        let output = match self.provider.anonymize(text).await {
            Ok(output) => output,
            Err(e) => match self.failure_policy {
                FailurePolicy::Abort => {
                    return Err(Error::Anonymization(format!(
                        "{} backend failed: {}",
                        self.provider.name(),
                        e
                    )))
                }
                FailurePolicy::Passthrough => {
                    warn!(
                        backend = self.provider.name(),
                        "Detection failed, passing text through unmodified: {}", e
                    );
                    return Ok(text.to_string());
                }
            },
        };

        if !output.mappings.is_empty() {
            self.store.save_mappings(session_id, &output.mappings)?;
        }
        info!(
            session_id,
            mappings = output.mappings.len(),
            backend = self.provider.name(),
            "Anonymized document"
        );
        Ok(output.anonymized_text)
    }

    /// Replace every stored placeholder in `text` with its original value.
    ///
    /// A session with no mappings returns the input unchanged. Replacement
    /// is literal whole-token substitution; the `[[...]]` delimiters make it
    /// impossible for one placeholder to be a substring of another.
    pub fn deanonymize(&self, text: &str, session_id: &str) -> Result<String> {
        let mappings = self.store.find_by_session(session_id)?;
        if mappings.is_empty() {
            return Ok(text.to_string());
        }

        let mut result = text.to_string();
        for mapping in &mappings {
            result = result.replace(&mapping.placeholder, &mapping.original_value);
        }
        debug!(
            session_id,
            mappings = mappings.len(),
            "De-anonymized response"
        );
        Ok(result)
    }

    /// Drop all mappings a session holds. Idempotent.
    pub fn clear_session(&self, session_id: &str) -> Result<usize> {
        let deleted = self.store.delete_by_session(session_id)?;
        info!(session_id, deleted, "Cleared session mappings");
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::provider::SpanProvider;
    use async_trait::async_trait;
    use tempfile::TempDir;
    use veil_core::Span;
    use veil_detect::Detector;

    /// Emits fixed spans regardless of input.
    struct FixedDetector(Vec<Span>);

    #[async_trait]
    impl Detector for FixedDetector {
        async fn detect(&self, _text: &str) -> Result<Vec<Span>> {
            Ok(self.0.clone())
        }

        fn name(&self) -> &'static str {
            "fixed"
        }
    }

    struct FailingDetector;

    #[async_trait]
    impl Detector for FailingDetector {
        async fn detect(&self, _text: &str) -> Result<Vec<Span>> {
            Err(Error::Detection("backend unreachable".to_string()))
        }

        fn name(&self) -> &'static str {
            "failing"
        }
    }

    fn span(start: usize, end: usize, entity_type: &str, score: f64) -> Span {
        Span::new(start, end, entity_type, score).unwrap()
    }

    fn engine_with<D: Detector + 'static>(
        detector: D,
        policy: FailurePolicy,
    ) -> (TempDir, AnonymizationEngine) {
        let dir = TempDir::new().unwrap();
        let store = Arc::new(MappingStore::open(dir.path()).unwrap());
        let engine = AnonymizationEngine::new(
            Box::new(SpanProvider::new(detector, 0.70)),
            store,
            policy,
        );
        (dir, engine)
    }

    #[tokio::test]
    async fn test_round_trip() {
        let text = "Hello World, this is Marco.";
        let (_dir, engine) = engine_with(
            FixedDetector(vec![span(21, 26, "PERSON", 0.99)]),
            FailurePolicy::Abort,
        );

        let anonymized = engine.anonymize(text, "s1").await.unwrap();
        assert_eq!(anonymized, "Hello World, this is [[PERSON_1]].");

        let restored = engine.deanonymize(&anonymized, "s1").unwrap();
        assert_eq!(restored, text);
    }

    #[tokio::test]
    async fn test_blank_input_is_noop() {
        let (_dir, engine) = engine_with(
            FixedDetector(vec![span(0, 1, "PERSON", 0.99)]),
            FailurePolicy::Abort,
        );
        assert_eq!(engine.anonymize("", "s1").await.unwrap(), "");
        assert_eq!(engine.anonymize("   \n", "s1").await.unwrap(), "   \n");
        assert!(engine.store.find_by_session("s1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_low_score_span_produces_no_placeholder() {
        let text = "Maybe Marco, maybe not.";
        let (_dir, engine) = engine_with(
            FixedDetector(vec![span(6, 11, "PERSON", 0.50)]),
            FailurePolicy::Abort,
        );
        let anonymized = engine.anonymize(text, "s1").await.unwrap();
        assert_eq!(anonymized, text);
        assert!(engine.store.find_by_session("s1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_detection_failure_aborts_by_default() {
        let (_dir, engine) = engine_with(FailingDetector, FailurePolicy::Abort);
        let err = engine.anonymize("some text", "s1").await.unwrap_err();
        assert!(matches!(err, Error::Anonymization(_)));
        assert!(engine.store.find_by_session("s1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_detection_failure_passthrough_returns_original() {
        let (_dir, engine) = engine_with(FailingDetector, FailurePolicy::Passthrough);
        let text = "some text";
        assert_eq!(engine.anonymize(text, "s1").await.unwrap(), text);
    }

    #[tokio::test]
    async fn test_deanonymize_without_mappings_is_identity() {
        let (_dir, engine) = engine_with(FixedDetector(Vec::new()), FailurePolicy::Abort);
        let text = "the [[PERSON_1]] token stays as-is";
        assert_eq!(engine.deanonymize(text, "unknown").unwrap(), text);
    }

    #[tokio::test]
    async fn test_repeated_placeholder_replaced_everywhere() {
        let text = "Marco here.";
        let (_dir, engine) = engine_with(
            FixedDetector(vec![span(0, 5, "PERSON", 0.99)]),
            FailurePolicy::Abort,
        );
        engine.anonymize(text, "s1").await.unwrap();

        let echoed = "[[PERSON_1]] said that [[PERSON_1]] agrees.";
        let restored = engine.deanonymize(echoed, "s1").unwrap();
        assert_eq!(restored, "Marco said that Marco agrees.");
    }

    #[tokio::test]
    async fn test_clear_session_removes_mappings() {
        let text = "Marco here.";
        let (_dir, engine) = engine_with(
            FixedDetector(vec![span(0, 5, "PERSON", 0.99)]),
            FailurePolicy::Abort,
        );
        engine.anonymize(text, "s1").await.unwrap();

        assert_eq!(engine.clear_session("s1").unwrap(), 1);
        assert_eq!(engine.clear_session("s1").unwrap(), 0);
        assert!(engine.store.find_by_session("s1").unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_sessions_do_not_share_mappings() {
        let text = "Anna here.";
        let (_dir, engine) = engine_with(
            FixedDetector(vec![span(0, 4, "PERSON", 0.99)]),
            FailurePolicy::Abort,
        );
        engine.anonymize(text, "s1").await.unwrap();

        // A different session must not see s1's originals.
        let echoed = "[[PERSON_1]] waves.";
        assert_eq!(engine.deanonymize(echoed, "s2").unwrap(), echoed);
    }
}
