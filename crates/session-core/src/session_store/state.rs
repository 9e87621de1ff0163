use std::time::{Duration, Instant};

use crate::types::{SessionConfig, SessionId, SessionStatus};

/// Complete state of one session.
///
/// Mutated only by the owning manager; callers receive clones as read-only
/// snapshots.
#[derive(Debug, Clone)]
pub struct SessionState {
    pub session_id: SessionId,
    pub status: SessionStatus,

    /// Provider-side connection identifier.
    pub connection_id: String,
    /// Opaque address used to (re)establish the transport.
    pub endpoint: String,

    /// Scheduled reconnects since the last successful open.
    pub reconnect_attempts: u32,

    /// Last provider-reported activity level, for delta detection.
    pub activity_level: f32,

    /// Immutable creation parameters, forwarded to the provider.
    pub config: SessionConfig,

    pub created_at: Instant,
    pub last_activity_at: Instant,
}

impl SessionState {
    /// Create a new session in the connecting state.
    pub fn new(
        session_id: SessionId,
        connection_id: String,
        endpoint: String,
        config: SessionConfig,
    ) -> Self {
        let now = Instant::now();
        Self {
            session_id,
            status: SessionStatus::Connecting,
            connection_id,
            endpoint,
            reconnect_attempts: 0,
            activity_level: 0.0,
            config,
            created_at: now,
            last_activity_at: now,
        }
    }

    /// Total time since creation.
    pub fn session_duration(&self) -> Duration {
        Instant::now() - self.created_at
    }

    /// Time since the last observed provider activity.
    pub fn idle_time(&self) -> Duration {
        Instant::now() - self.last_activity_at
    }
}
