//! SQLite-backed mapping store.
//!
//! One table, session-scoped. Writes for a single anonymization call go
//! through one transaction so a failed call leaves no partial mappings
//! behind.

use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::{params, Connection, OptionalExtension};
use tracing::{debug, info};

use crate::schema::SCHEMA_SQL;
use crate::types::{MappingStats, PlaceholderMapping};
use veil_core::{Error, Result};

/// Default bound on original value length, in chars.
pub const MAX_VALUE_LEN: usize = 1024;

pub struct MappingStore {
    conn: Mutex<Connection>,
    db_path: PathBuf,
    max_value_len: usize,
}

impl MappingStore {
    /// Open or create the store. `db_dir` is the mappings directory; the
    /// file will be `db_dir/veil.db`.
    pub fn open(db_dir: impl AsRef<Path>) -> Result<Self> {
        let db_dir = db_dir.as_ref();
        std::fs::create_dir_all(db_dir).map_err(|e| Error::Storage(e.to_string()))?;
        let db_path = db_dir.join("veil.db");

        let conn = Self::create_connection(&db_path)?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| Error::Database(format!("Schema init failed: {}", e)))?;

        let store = Self {
            conn: Mutex::new(conn),
            db_path,
            max_value_len: MAX_VALUE_LEN,
        };

        let stats = store.stats()?;
        info!(
            "MappingStore initialized: {} sessions, {} mappings, path={}",
            stats.session_count,
            stats.mapping_count,
            store.db_path.display()
        );
        Ok(store)
    }

    /// Override the original-value length bound.
    pub fn with_max_value_len(mut self, max_value_len: usize) -> Self {
        self.max_value_len = max_value_len;
        self
    }

    fn create_connection(db_path: &Path) -> Result<Connection> {
        let conn = Connection::open(db_path).map_err(|e| Error::Database(e.to_string()))?;
        conn.execute_batch(
            "PRAGMA journal_mode = WAL;
             PRAGMA foreign_keys = ON;
             PRAGMA synchronous = NORMAL;",
        )
        .map_err(|e| Error::Database(e.to_string()))?;
        Ok(conn)
    }

    /// Persist a batch of mappings for one session, all or nothing.
    ///
    /// A placeholder that already exists for the session, or an original
    /// value longer than the configured length bound, rejects the whole
    /// batch.
    pub fn save_mappings(
        &self,
        session_id: &str,
        mappings: &[(String, String)],
    ) -> Result<usize> {
        if mappings.is_empty() {
            return Ok(0);
        }
        for (placeholder, original) in mappings {
            if original.chars().count() > self.max_value_len {
                return Err(Error::Storage(format!(
                    "original value for {} exceeds {} chars",
                    placeholder, self.max_value_len
                )));
            }
        }

        let now = now_millis();
        let mut conn = self.conn.lock();
        let tx = conn
            .transaction()
            .map_err(|e| Error::Database(e.to_string()))?;

        for (placeholder, original) in mappings {
            tx.prepare_cached(
                "INSERT INTO placeholder_mappings (session_id, placeholder, original_value, created_at)
                 VALUES (?1, ?2, ?3, ?4)",
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .execute(params![session_id, placeholder, original, now])
            .map_err(|e| {
                if e.to_string().contains("UNIQUE constraint") {
                    Error::Conflict(format!(
                        "placeholder {} already mapped in session {}",
                        placeholder, session_id
                    ))
                } else {
                    Error::Database(e.to_string())
                }
            })?;
        }

        tx.commit().map_err(|e| Error::Database(e.to_string()))?;
        debug!("Saved {} mappings for session {}", mappings.len(), session_id);
        Ok(mappings.len())
    }

    /// All mappings for a session, oldest first.
    pub fn find_by_session(&self, session_id: &str) -> Result<Vec<PlaceholderMapping>> {
        let conn = self.conn.lock();
        let mut stmt = conn
            .prepare_cached(
                "SELECT id, session_id, placeholder, original_value, created_at
                 FROM placeholder_mappings WHERE session_id = ?1 ORDER BY id",
            )
            .map_err(|e| Error::Database(e.to_string()))?;
        let rows = stmt
            .query_map(params![session_id], row_to_mapping)
            .map_err(|e| Error::Database(e.to_string()))?
            .collect::<std::result::Result<Vec<_>, _>>()
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(rows)
    }

    /// Single mapping lookup by exact placeholder.
    pub fn find_by_session_and_placeholder(
        &self,
        session_id: &str,
        placeholder: &str,
    ) -> Result<Option<PlaceholderMapping>> {
        let conn = self.conn.lock();
        let row = conn
            .prepare_cached(
                "SELECT id, session_id, placeholder, original_value, created_at
                 FROM placeholder_mappings WHERE session_id = ?1 AND placeholder = ?2",
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![session_id, placeholder], row_to_mapping)
            .optional()
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(row)
    }

    /// Delete every mapping a session holds. Idempotent; returns the count
    /// actually removed.
    pub fn delete_by_session(&self, session_id: &str) -> Result<usize> {
        let conn = self.conn.lock();
        let deleted = conn
            .prepare_cached("DELETE FROM placeholder_mappings WHERE session_id = ?1")
            .map_err(|e| Error::Database(e.to_string()))?
            .execute(params![session_id])
            .map_err(|e| Error::Database(e.to_string()))?;
        debug!("Deleted {} mappings for session {}", deleted, session_id);
        Ok(deleted)
    }

    pub fn count_for_session(&self, session_id: &str) -> Result<i64> {
        let conn = self.conn.lock();
        let count = conn
            .prepare_cached("SELECT COUNT(*) FROM placeholder_mappings WHERE session_id = ?1")
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row(params![session_id], |row| row.get(0))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(count)
    }

    pub fn stats(&self) -> Result<MappingStats> {
        let conn = self.conn.lock();
        let (session_count, mapping_count) = conn
            .prepare_cached(
                "SELECT COUNT(DISTINCT session_id), COUNT(*) FROM placeholder_mappings",
            )
            .map_err(|e| Error::Database(e.to_string()))?
            .query_row([], |row| Ok((row.get(0)?, row.get(1)?)))
            .map_err(|e| Error::Database(e.to_string()))?;
        Ok(MappingStats {
            session_count,
            mapping_count,
        })
    }
}

fn row_to_mapping(row: &rusqlite::Row<'_>) -> rusqlite::Result<PlaceholderMapping> {
    Ok(PlaceholderMapping {
        id: row.get(0)?,
        session_id: row.get(1)?,
        placeholder: row.get(2)?,
        original_value: row.get(3)?,
        created_at: row.get(4)?,
    })
}

fn now_millis() -> i64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn open_store() -> (TempDir, MappingStore) {
        let dir = TempDir::new().unwrap();
        let store = MappingStore::open(dir.path()).unwrap();
        (dir, store)
    }

    fn pair(placeholder: &str, original: &str) -> (String, String) {
        (placeholder.to_string(), original.to_string())
    }

    #[test]
    fn test_save_and_find() {
        let (_dir, store) = open_store();
        store
            .save_mappings(
                "s1",
                &[pair("[[PERSON_1]]", "Anna Verdi"), pair("[[EMAIL_1]]", "a@b.com")],
            )
            .unwrap();

        let rows = store.find_by_session("s1").unwrap();
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].placeholder, "[[PERSON_1]]");
        assert_eq!(rows[0].original_value, "Anna Verdi");
    }

    #[test]
    fn test_sessions_are_isolated() {
        let (_dir, store) = open_store();
        store
            .save_mappings("s1", &[pair("[[PERSON_1]]", "Anna")])
            .unwrap();
        store
            .save_mappings("s2", &[pair("[[PERSON_1]]", "Marco")])
            .unwrap();

        let s1 = store.find_by_session("s1").unwrap();
        let s2 = store.find_by_session("s2").unwrap();
        assert_eq!(s1[0].original_value, "Anna");
        assert_eq!(s2[0].original_value, "Marco");
    }

    #[test]
    fn test_duplicate_placeholder_is_conflict() {
        let (_dir, store) = open_store();
        store
            .save_mappings("s1", &[pair("[[PERSON_1]]", "Anna")])
            .unwrap();
        let err = store
            .save_mappings("s1", &[pair("[[PERSON_1]]", "Marco")])
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
    }

    #[test]
    fn test_failed_batch_leaves_nothing_behind() {
        let (_dir, store) = open_store();
        store
            .save_mappings("s1", &[pair("[[PERSON_1]]", "Anna")])
            .unwrap();

        // Second entry collides, so the first must not be persisted either.
        let err = store
            .save_mappings(
                "s1",
                &[pair("[[EMAIL_1]]", "a@b.com"), pair("[[PERSON_1]]", "Marco")],
            )
            .unwrap_err();
        assert!(matches!(err, Error::Conflict(_)));
        assert_eq!(store.count_for_session("s1").unwrap(), 1);
    }

    #[test]
    fn test_oversized_value_rejected() {
        let (_dir, store) = open_store();
        let long = "x".repeat(MAX_VALUE_LEN + 1);
        let err = store
            .save_mappings("s1", &[pair("[[NOTE_1]]", &long)])
            .unwrap_err();
        assert!(matches!(err, Error::Storage(_)));
        assert_eq!(store.count_for_session("s1").unwrap(), 0);
    }

    #[test]
    fn test_value_at_limit_accepted() {
        let (_dir, store) = open_store();
        let exact = "x".repeat(MAX_VALUE_LEN);
        store
            .save_mappings("s1", &[pair("[[NOTE_1]]", &exact)])
            .unwrap();
        assert_eq!(store.count_for_session("s1").unwrap(), 1);
    }

    #[test]
    fn test_find_by_placeholder() {
        let (_dir, store) = open_store();
        store
            .save_mappings("s1", &[pair("[[PERSON_1]]", "Anna")])
            .unwrap();

        let found = store
            .find_by_session_and_placeholder("s1", "[[PERSON_1]]")
            .unwrap();
        assert_eq!(found.unwrap().original_value, "Anna");

        let missing = store
            .find_by_session_and_placeholder("s1", "[[PERSON_2]]")
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn test_delete_is_idempotent() {
        let (_dir, store) = open_store();
        store
            .save_mappings("s1", &[pair("[[PERSON_1]]", "Anna")])
            .unwrap();

        assert_eq!(store.delete_by_session("s1").unwrap(), 1);
        assert_eq!(store.delete_by_session("s1").unwrap(), 0);
        assert!(store.find_by_session("s1").unwrap().is_empty());
    }

    #[test]
    fn test_stats() {
        let (_dir, store) = open_store();
        store
            .save_mappings("s1", &[pair("[[PERSON_1]]", "Anna"), pair("[[EMAIL_1]]", "a@b")])
            .unwrap();
        store
            .save_mappings("s2", &[pair("[[PERSON_1]]", "Marco")])
            .unwrap();

        let stats = store.stats().unwrap();
        assert_eq!(stats.session_count, 2);
        assert_eq!(stats.mapping_count, 3);
    }
}
