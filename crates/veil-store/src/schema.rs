//! Database schema SQL.

/// Placeholder mapping table.
///
/// The UNIQUE constraint on (session_id, placeholder) is what makes
/// de-anonymization deterministic: a placeholder can never point at two
/// different originals within one session.
pub const SCHEMA_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS placeholder_mappings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    session_id TEXT NOT NULL,
    placeholder TEXT NOT NULL,
    original_value TEXT NOT NULL,
    created_at INTEGER NOT NULL,
    UNIQUE(session_id, placeholder)
);

CREATE INDEX IF NOT EXISTS idx_mappings_session ON placeholder_mappings(session_id);
CREATE INDEX IF NOT EXISTS idx_mappings_session_original
    ON placeholder_mappings(session_id, original_value);
"#;
