//! Store row types.

use serde::{Deserialize, Serialize};

/// One persisted placeholder -> original value association.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlaceholderMapping {
    pub id: i64,
    pub session_id: String,
    pub placeholder: String,
    pub original_value: String,
    /// Unix millis.
    pub created_at: i64,
}

/// Aggregate counts for the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MappingStats {
    pub session_count: i64,
    pub mapping_count: i64,
}
