//! Wiring and response-shape tests.
//!
//! Builds the same engine + store stack `AppState` assembles and drives a
//! full document round trip through it, then pins the JSON shapes the HTTP
//! surface documents.

use std::sync::Arc;

use tempfile::TempDir;
use veil_core::{DataPaths, DetectorBackend, FailurePolicy, LlmSettings, VeilConfig};
use veil_engine::{provider_from_config, AnonymizationEngine};
use veil_store::MappingStore;

fn test_config(dir: &TempDir) -> VeilConfig {
    VeilConfig {
        port: 0,
        data_paths: DataPaths::new(dir.path()).unwrap(),
        detector: DetectorBackend::Heuristic,
        min_score: 0.70,
        max_value_len: 1024,
        failure_policy: FailurePolicy::Abort,
        analyzer_url: None,
        llm: LlmSettings::default(),
    }
}

#[tokio::test]
async fn test_engine_store_wiring_round_trip() {
    let dir = TempDir::new().unwrap();
    let config = test_config(&dir);

    let store = Arc::new(
        MappingStore::open(&config.data_paths.mappings)
            .unwrap()
            .with_max_value_len(config.max_value_len),
    );
    let provider = provider_from_config(&config).unwrap();
    let engine = AnonymizationEngine::new(provider, store.clone(), config.failure_policy);

    let text = "Invoice sent to billing@acme.example from 10.0.0.12.";
    let anonymized = engine.anonymize(text, "session-a").await.unwrap();
    assert!(!anonymized.contains("billing@acme.example"));
    assert!(anonymized.contains("[[EMAIL_1]]"));

    let mappings = store.find_by_session("session-a").unwrap();
    assert!(!mappings.is_empty());

    let restored = engine.deanonymize(&anonymized, "session-a").unwrap();
    assert_eq!(restored, text);

    assert_eq!(engine.clear_session("session-a").unwrap(), mappings.len());
    assert!(store.find_by_session("session-a").unwrap().is_empty());
}

/// The document endpoint responds with
/// `{ session_id, anonymized_text, mapping_count }`.
#[test]
fn test_document_response_shape() {
    let doc = serde_json::json!({
        "session_id": "7ce3cbf7-24ca-4b6e-a7f5-8f0a47a9f3f0",
        "anonymized_text": "Contact [[EMAIL_1]] please.",
        "mapping_count": 1,
    });
    assert!(doc["session_id"].is_string());
    assert!(doc["anonymized_text"].is_string());
    assert!(doc["mapping_count"].is_number());
}

/// The status endpoint responds with backend name plus counts only — no
/// mapping contents.
#[test]
fn test_status_response_shape() {
    let status = serde_json::json!({
        "status": "ok",
        "backend": "heuristic",
        "active_sessions": 2,
        "stored_sessions": 2,
        "stored_mappings": 9,
    });
    assert!(status["backend"].is_string());
    assert!(status["active_sessions"].is_number());
    assert!(status["stored_mappings"].is_number());
    assert!(status.get("mappings").is_none());
}
