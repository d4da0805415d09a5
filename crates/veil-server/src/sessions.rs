//! Session registry — sliding-TTL bookkeeping around the mapping store.
//!
//! The registry tracks which sessions exist and holds the latest anonymized
//! document for each; the mappings themselves live in the store. Original
//! document text is never kept here.

use std::collections::HashMap;

use chrono::{DateTime, Duration, Utc};
use parking_lot::RwLock;
use serde::Serialize;
use tracing::info;

const DEFAULT_TTL_MINUTES: i64 = 60;
const DEFAULT_MAX_SESSIONS: usize = 100;

#[derive(Debug, Clone, Serialize)]
pub struct Session {
    pub id: String,
    #[serde(rename = "createdAt")]
    pub created_at: String,
    #[serde(rename = "expiresAt")]
    pub expires_at: String,
    /// Latest anonymized document text, if one was uploaded.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub document: Option<String>,
}

struct SessionEntry {
    session: Session,
    expires: DateTime<Utc>,
}

pub struct SessionRegistry {
    sessions: RwLock<HashMap<String, SessionEntry>>,
    max_sessions: usize,
    ttl: Duration,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            max_sessions: DEFAULT_MAX_SESSIONS,
            ttl: Duration::minutes(DEFAULT_TTL_MINUTES),
        }
    }

    pub fn create(&self) -> Session {
        let now = Utc::now();
        let expires = now + self.ttl;
        let session = Session {
            id: uuid::Uuid::new_v4().to_string(),
            created_at: now.to_rfc3339(),
            expires_at: expires.to_rfc3339(),
            document: None,
        };

        let mut sessions = self.sessions.write();
        if sessions.len() >= self.max_sessions {
            // Evict the oldest session to stay under the cap.
            if let Some(oldest) = sessions
                .values()
                .min_by_key(|e| e.session.created_at.clone())
                .map(|e| e.session.id.clone())
            {
                sessions.remove(&oldest);
                info!(session_id = %oldest, "Evicted oldest session");
            }
        }
        sessions.insert(
            session.id.clone(),
            SessionEntry {
                session: session.clone(),
                expires,
            },
        );
        session
    }

    /// Look up a live session, sliding its expiry forward. Expired entries
    /// are dropped on access.
    pub fn get(&self, id: &str) -> Option<Session> {
        let mut sessions = self.sessions.write();
        let now = Utc::now();
        match sessions.get_mut(id) {
            Some(entry) if entry.expires > now => {
                entry.expires = now + self.ttl;
                entry.session.expires_at = entry.expires.to_rfc3339();
                Some(entry.session.clone())
            }
            Some(_) => {
                sessions.remove(id);
                None
            }
            None => None,
        }
    }

    pub fn set_document(&self, id: &str, anonymized: String) {
        let mut sessions = self.sessions.write();
        if let Some(entry) = sessions.get_mut(id) {
            entry.session.document = Some(anonymized);
        }
    }

    pub fn remove(&self, id: &str) -> bool {
        self.sessions.write().remove(id).is_some()
    }

    pub fn len(&self) -> usize {
        self.sessions.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.read().is_empty()
    }
}

impl Default for SessionRegistry {
    fn default() -> Self {
        Self::new()
    }
}
