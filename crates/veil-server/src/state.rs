//! Shared application state.

use std::sync::Arc;

use veil_core::{Result, VeilConfig};
use veil_engine::{provider_from_config, AnonymizationEngine};
use veil_store::MappingStore;

use crate::sessions::SessionRegistry;

/// Shared application state accessible from all route handlers.
pub struct AppState {
    pub config: VeilConfig,
    pub store: Arc<MappingStore>,
    pub engine: AnonymizationEngine,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(config: VeilConfig) -> Result<Self> {
        let store = Arc::new(
            MappingStore::open(&config.data_paths.mappings)?
                .with_max_value_len(config.max_value_len),
        );
        let provider = provider_from_config(&config)?;
        let engine = AnonymizationEngine::new(provider, store.clone(), config.failure_policy);

        Ok(Self {
            config,
            store,
            engine,
            sessions: SessionRegistry::new(),
        })
    }
}
