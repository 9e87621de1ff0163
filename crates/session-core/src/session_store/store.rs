use std::time::Instant;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::state::SessionState;
use crate::errors::{Result, SessionError};
use crate::types::{SessionId, SessionStatus};

/// Session storage keyed by session id.
///
/// Uses DashMap for lock-free concurrent access; values are cloned out so
/// callers never hold a reference into the map.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<SessionId, SessionState>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self {
            sessions: DashMap::new(),
        }
    }

    /// Insert a new session. Rejects duplicate ids.
    pub fn insert(&self, session: SessionState) -> Result<()> {
        let session_id = session.session_id.clone();
        if self.sessions.contains_key(&session_id) {
            return Err(SessionError::InvalidInput(format!(
                "session {session_id} already exists"
            )));
        }
        self.sessions.insert(session_id.clone(), session);
        info!(session_id = %session_id, "created session");
        Ok(())
    }

    /// Snapshot of a session by id.
    pub fn get(&self, session_id: &SessionId) -> Option<SessionState> {
        self.sessions
            .get(session_id)
            .map(|entry| entry.value().clone())
    }

    /// Remove a session, returning its final state.
    pub fn remove(&self, session_id: &SessionId) -> Option<SessionState> {
        let removed = self.sessions.remove(session_id).map(|(_, state)| state);
        if removed.is_some() {
            info!(session_id = %session_id, "removed session");
        }
        removed
    }

    /// Set the status of a session. Missing ids are a no-op.
    pub fn set_status(&self, session_id: &SessionId, status: SessionStatus) {
        if let Some(mut entry) = self.sessions.get_mut(session_id) {
            debug!(session_id = %session_id, from = %entry.status, to = %status, "status change");
            entry.status = status;
        }
    }

    /// Apply a successful transport open: connected, attempt counter reset.
    pub fn mark_connected(&self, session_id: &SessionId) -> bool {
        match self.sessions.get_mut(session_id) {
            Some(mut entry) => {
                entry.status = SessionStatus::Connected;
                entry.reconnect_attempts = 0;
                entry.last_activity_at = Instant::now();
                true
            }
            None => false,
        }
    }

    /// Record a scheduled reconnect: back to connecting with the attempt
    /// counter at `attempt`.
    pub fn begin_reconnect(&self, session_id: &SessionId, attempt: u32) {
        if let Some(mut entry) = self.sessions.get_mut(session_id) {
            entry.status = SessionStatus::Connecting;
            entry.reconnect_attempts = attempt;
        }
    }

    /// Record a provider activity observation.
    pub fn record_activity(&self, session_id: &SessionId, activity_level: f32) {
        if let Some(mut entry) = self.sessions.get_mut(session_id) {
            entry.activity_level = activity_level;
            entry.last_activity_at = Instant::now();
        }
    }

    /// Snapshots of all sessions.
    pub fn list(&self) -> Vec<SessionState> {
        self.sessions
            .iter()
            .map(|entry| entry.value().clone())
            .collect()
    }

    /// All session ids currently stored.
    pub fn ids(&self) -> Vec<SessionId> {
        self.sessions.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.sessions.len()
    }

    /// Per-status counts.
    pub fn stats(&self) -> SessionStats {
        let mut stats = SessionStats::default();
        for entry in self.sessions.iter() {
            stats.total += 1;
            match entry.value().status {
                SessionStatus::Connecting => stats.connecting += 1,
                SessionStatus::Connected => stats.connected += 1,
                SessionStatus::Disconnected => stats.disconnected += 1,
                SessionStatus::Error => stats.error += 1,
            }
        }
        stats
    }

    /// Drop all session state.
    pub fn clear(&self) {
        self.sessions.clear();
        info!("cleared all session state");
    }
}

/// Session statistics.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionStats {
    pub total: usize,
    pub connecting: usize,
    pub connected: usize,
    pub disconnected: usize,
    pub error: usize,
}
