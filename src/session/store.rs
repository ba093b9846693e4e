//! Expiring session storage keyed by phone number

use super::codec;
use super::state::SessionState;
use crate::db::{Database, DbError};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};
use thiserror::Error;

pub const SESSION_KEY_PREFIX: &str = "ussd:state:";

/// Idle timeout applied on every write
pub const DEFAULT_SESSION_TTL: Duration = Duration::from_secs(8 * 60);

pub fn session_key(phone_number: &str) -> String {
    format!("{SESSION_KEY_PREFIX}{phone_number}")
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error(transparent)]
    Database(#[from] DbError),
    #[error("Failed to encode session: {0}")]
    Encode(#[from] serde_json::Error),
    #[error("Session backend error: {0}")]
    Backend(String),
}

/// Fetch, store and delete one conversation's state
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// The stored state in its concrete shape, or `None` when absent, expired or corrupt
    async fn load(&self, phone_number: &str) -> Result<Option<SessionState>, StoreError>;

    /// Persist the state and refresh its idle timeout
    async fn save(&self, state: &SessionState) -> Result<(), StoreError>;

    async fn delete(&self, phone_number: &str) -> Result<(), StoreError>;
}

#[async_trait]
impl<T: SessionStore + ?Sized> SessionStore for Arc<T> {
    async fn load(&self, phone_number: &str) -> Result<Option<SessionState>, StoreError> {
        (**self).load(phone_number).await
    }

    async fn save(&self, state: &SessionState) -> Result<(), StoreError> {
        (**self).save(state).await
    }

    async fn delete(&self, phone_number: &str) -> Result<(), StoreError> {
        (**self).delete(phone_number).await
    }
}

// ============================================================================
// SQLite backend
// ============================================================================

/// Sessions in the `ussd_sessions` table of the application database
#[derive(Clone)]
pub struct SqliteSessionStore {
    db: Database,
    ttl: Duration,
}

impl SqliteSessionStore {
    pub fn new(db: Database, ttl: Duration) -> Self {
        Self { db, ttl }
    }
}

#[async_trait]
impl SessionStore for SqliteSessionStore {
    async fn load(&self, phone_number: &str) -> Result<Option<SessionState>, StoreError> {
        let raw = self
            .db
            .get_session_value(&session_key(phone_number), Utc::now())?;
        Ok(raw.as_deref().and_then(codec::decode))
    }

    async fn save(&self, state: &SessionState) -> Result<(), StoreError> {
        let value = codec::encode(state)?;
        let ttl = chrono::Duration::from_std(self.ttl)
            .map_err(|e| StoreError::Backend(format!("invalid session ttl: {e}")))?;
        let now = Utc::now();
        self.db
            .put_session_value(&session_key(&state.phone_number), &value, now + ttl, now)?;
        Ok(())
    }

    async fn delete(&self, phone_number: &str) -> Result<(), StoreError> {
        self.db.delete_session_value(&session_key(phone_number))?;
        Ok(())
    }
}

// ============================================================================
// In-process backend
// ============================================================================

/// Process-local sessions. Values are stored encoded so they go through the
/// same codec as the persistent backends.
pub struct MemorySessionStore {
    entries: Mutex<HashMap<String, (String, Instant)>>,
    ttl: Duration,
}

impl MemorySessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
            ttl,
        }
    }

    /// Raw stored value, for inspecting what a backend would hold
    #[cfg(test)]
    pub fn raw(&self, phone_number: &str) -> Option<String> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&session_key(phone_number))
            .map(|(value, _)| value.clone())
    }

    #[cfg(test)]
    pub fn stored_count(&self) -> usize {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .len()
    }

    #[cfg(test)]
    pub fn put_raw(&self, phone_number: &str, value: &str) {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(
                session_key(phone_number),
                (value.to_string(), Instant::now() + self.ttl),
            );
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, phone_number: &str) -> Result<Option<SessionState>, StoreError> {
        let key = session_key(phone_number);
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        match entries.get(&key) {
            Some((value, expires_at)) if *expires_at > Instant::now() => {
                Ok(codec::decode(value))
            }
            Some(_) => {
                entries.remove(&key);
                Ok(None)
            }
            None => Ok(None),
        }
    }

    async fn save(&self, state: &SessionState) -> Result<(), StoreError> {
        let value = codec::encode(state)?;
        let now = Instant::now();
        let mut entries = self.entries.lock().unwrap_or_else(PoisonError::into_inner);
        entries.insert(session_key(&state.phone_number), (value, now + self.ttl));
        // Callers that never dial back are only reclaimed here
        entries.retain(|_, (_, expires_at)| *expires_at > now);
        Ok(())
    }

    async fn delete(&self, phone_number: &str) -> Result<(), StoreError> {
        self.entries
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&session_key(phone_number));
        Ok(())
    }
}
