//! Session Result Store — holds the last analysis and the live optimized CV
//! for each results view. In-memory only; entries expire after a period of
//! inactivity, the way a browser session would.
//!
//! The mutex is held only for map operations, never across an await.
//! Regeneration is single-flight per session via `RegenerationTicket`.

pub mod handlers;

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::{DateTime, Duration, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::debug;
use uuid::Uuid;

use crate::models::analysis::AnalysisResult;

#[derive(Debug, Error, PartialEq)]
pub enum SessionError {
    #[error("Session {0} not found")]
    NotFound(Uuid),

    #[error("A regeneration is already in progress for session {0}")]
    Busy(Uuid),
}

#[derive(Debug, Clone)]
struct Session {
    result: AnalysisResult,
    optimized_cv: String,
    regenerating: bool,
    created_at: DateTime<Utc>,
    last_accessed_at: DateTime<Utc>,
}

/// Read-only copy of a session handed to callers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session_id: Uuid,
    pub result: AnalysisResult,
    #[serde(rename = "optimizedCV")]
    pub optimized_cv: String,
    pub regenerating: bool,
    pub created_at: DateTime<Utc>,
}

#[derive(Clone, Default)]
pub struct SessionStore {
    inner: Arc<Mutex<HashMap<Uuid, Session>>>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<Uuid, Session>> {
        // No operation leaves the map half-updated, so a poisoned lock is still usable.
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Starts a new session seeded from `result`.
    pub fn create(&self, result: AnalysisResult) -> Uuid {
        let id = Uuid::new_v4();
        let now = Utc::now();
        self.lock().insert(
            id,
            Session {
                optimized_cv: result.optimized_cv.clone(),
                result,
                regenerating: false,
                created_at: now,
                last_accessed_at: now,
            },
        );
        debug!("Session {id} created");
        id
    }

    /// Discards the previous analysis of `id` in favour of `result`.
    pub fn replace(&self, id: Uuid, result: AnalysisResult) -> Result<(), SessionError> {
        let mut sessions = self.lock();
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        if session.regenerating {
            return Err(SessionError::Busy(id));
        }
        session.optimized_cv = result.optimized_cv.clone();
        session.result = result;
        session.last_accessed_at = Utc::now();
        Ok(())
    }

    pub fn get(&self, id: Uuid) -> Result<SessionSnapshot, SessionError> {
        let mut sessions = self.lock();
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        session.last_accessed_at = Utc::now();
        Ok(SessionSnapshot {
            session_id: id,
            result: session.result.clone(),
            optimized_cv: session.optimized_cv.clone(),
            regenerating: session.regenerating,
            created_at: session.created_at,
        })
    }

    /// Applies a user edit to the live CV text.
    pub fn update_cv(&self, id: Uuid, optimized_cv: String) -> Result<(), SessionError> {
        let mut sessions = self.lock();
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        if session.regenerating {
            return Err(SessionError::Busy(id));
        }
        session.optimized_cv = optimized_cv;
        session.last_accessed_at = Utc::now();
        Ok(())
    }

    /// Claims the session's single regeneration slot.
    pub fn begin_regeneration(&self, id: Uuid) -> Result<RegenerationTicket, SessionError> {
        let mut sessions = self.lock();
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        if session.regenerating {
            return Err(SessionError::Busy(id));
        }
        session.regenerating = true;
        session.last_accessed_at = Utc::now();
        Ok(RegenerationTicket {
            store: self.clone(),
            id,
            current_cv: session.optimized_cv.clone(),
            released: false,
        })
    }

    pub fn clear(&self, id: Uuid) -> Result<(), SessionError> {
        self.lock()
            .remove(&id)
            .map(|_| debug!("Session {id} cleared"))
            .ok_or(SessionError::NotFound(id))
    }

    /// Drops sessions idle for longer than `ttl`. Returns how many were removed.
    pub fn purge_expired(&self, ttl: Duration) -> usize {
        let cutoff = Utc::now() - ttl;
        let mut sessions = self.lock();
        let before = sessions.len();
        sessions.retain(|_, s| s.regenerating || s.last_accessed_at > cutoff);
        before - sessions.len()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    fn finish_regeneration(&self, id: Uuid, new_cv: Option<String>) -> Result<(), SessionError> {
        let mut sessions = self.lock();
        let session = sessions.get_mut(&id).ok_or(SessionError::NotFound(id))?;
        session.regenerating = false;
        if let Some(cv) = new_cv {
            session.optimized_cv = cv;
            session.last_accessed_at = Utc::now();
        }
        Ok(())
    }
}

/// Exclusive right to replace one session's CV. Dropping it without
/// `commit` releases the slot and leaves the previous text untouched.
pub struct RegenerationTicket {
    store: SessionStore,
    id: Uuid,
    current_cv: String,
    released: bool,
}

impl RegenerationTicket {
    /// The CV text as it was when the ticket was issued.
    pub fn current_cv(&self) -> &str {
        &self.current_cv
    }

    /// Replaces the session's CV wholesale and releases the slot.
    pub fn commit(mut self, new_cv: String) -> Result<(), SessionError> {
        self.released = true;
        self.store.finish_regeneration(self.id, Some(new_cv))
    }
}

impl Drop for RegenerationTicket {
    fn drop(&mut self) {
        if self.released {
            return;
        }
        // Session may have been cleared meanwhile; nothing to release then.
        let _ = self.store.finish_regeneration(self.id, None);
    }
}
