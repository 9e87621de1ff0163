use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Why a session left the `Connected`/`Connecting` states for good.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DisconnectReason {
    /// Explicit teardown requested by the caller.
    Destroyed,
    /// The session outlived its configured maximum duration or the provider
    /// reported expiry.
    Expired,
}

impl std::fmt::Display for DisconnectReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DisconnectReason::Destroyed => write!(f, "destroyed"),
            DisconnectReason::Expired => write!(f, "expired"),
        }
    }
}

/// All state-change notifications published by the orchestration core.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum OrchestratorEvent {
    /// A session was created and is connecting.
    SessionCreated { session_id: String },

    /// The session transport opened; the session is live.
    SessionConnected { session_id: String },

    /// A reconnect was scheduled after a non-intentional transport close.
    SessionReconnectAttempt {
        session_id: String,
        /// 1-based attempt number out of the configured budget.
        attempt: u32,
        /// Backoff delay before the attempt fires.
        delay: Duration,
    },

    /// Provider-side activity level moved past the configured threshold.
    SessionActivity {
        session_id: String,
        activity_level: f32,
    },

    /// The session hit its lifetime limit or the provider reported expiry.
    SessionExpired { session_id: String },

    /// Terminal teardown; the session no longer exists in the manager.
    SessionDisconnected {
        session_id: String,
        reason: DisconnectReason,
    },

    /// Transport or provider failure left the session in the error state.
    SessionError { session_id: String, message: String },

    /// Progress tick for a running task.
    TaskProgress { task_id: String, progress: u8 },

    /// Terminal success for a task.
    TaskSucceeded { task_id: String, result_ref: String },

    /// Terminal failure for a task (provider failure, cancellation, expiry).
    TaskFailed { task_id: String, error: String },

    /// The task hit its lifetime limit and is being disposed.
    TaskExpired { task_id: String },
}

impl OrchestratorEvent {
    /// Subscription key for this event.
    pub fn kind(&self) -> EventKind {
        match self {
            OrchestratorEvent::SessionCreated { .. } => EventKind::SessionCreated,
            OrchestratorEvent::SessionConnected { .. } => EventKind::SessionConnected,
            OrchestratorEvent::SessionReconnectAttempt { .. } => EventKind::SessionReconnectAttempt,
            OrchestratorEvent::SessionActivity { .. } => EventKind::SessionActivity,
            OrchestratorEvent::SessionExpired { .. } => EventKind::SessionExpired,
            OrchestratorEvent::SessionDisconnected { .. } => EventKind::SessionDisconnected,
            OrchestratorEvent::SessionError { .. } => EventKind::SessionError,
            OrchestratorEvent::TaskProgress { .. } => EventKind::TaskProgress,
            OrchestratorEvent::TaskSucceeded { .. } => EventKind::TaskSucceeded,
            OrchestratorEvent::TaskFailed { .. } => EventKind::TaskFailed,
            OrchestratorEvent::TaskExpired { .. } => EventKind::TaskExpired,
        }
    }

    /// The session or task this event is about.
    pub fn subject_id(&self) -> &str {
        match self {
            OrchestratorEvent::SessionCreated { session_id }
            | OrchestratorEvent::SessionConnected { session_id }
            | OrchestratorEvent::SessionReconnectAttempt { session_id, .. }
            | OrchestratorEvent::SessionActivity { session_id, .. }
            | OrchestratorEvent::SessionExpired { session_id }
            | OrchestratorEvent::SessionDisconnected { session_id, .. }
            | OrchestratorEvent::SessionError { session_id, .. } => session_id,
            OrchestratorEvent::TaskProgress { task_id, .. }
            | OrchestratorEvent::TaskSucceeded { task_id, .. }
            | OrchestratorEvent::TaskFailed { task_id, .. }
            | OrchestratorEvent::TaskExpired { task_id } => task_id,
        }
    }
}

/// Event type tags used as subscription keys.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    SessionCreated,
    SessionConnected,
    SessionReconnectAttempt,
    SessionActivity,
    SessionExpired,
    SessionDisconnected,
    SessionError,
    TaskProgress,
    TaskSucceeded,
    TaskFailed,
    TaskExpired,
}

impl EventKind {
    /// Stable string form of the tag.
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::SessionCreated => "session_created",
            EventKind::SessionConnected => "session_connected",
            EventKind::SessionReconnectAttempt => "session_reconnect_attempt",
            EventKind::SessionActivity => "session_activity",
            EventKind::SessionExpired => "session_expired",
            EventKind::SessionDisconnected => "session_disconnected",
            EventKind::SessionError => "session_error",
            EventKind::TaskProgress => "task_progress",
            EventKind::TaskSucceeded => "task_succeeded",
            EventKind::TaskFailed => "task_failed",
            EventKind::TaskExpired => "task_expired",
        }
    }
}

impl std::fmt::Display for EventKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An event as delivered to subscribers, stamped at publish time.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct BusEvent {
    pub timestamp: DateTime<Utc>,
    pub event: OrchestratorEvent,
}

impl BusEvent {
    /// Subscription key of the wrapped event.
    pub fn kind(&self) -> EventKind {
        self.event.kind()
    }

    /// Subject id of the wrapped event.
    pub fn subject_id(&self) -> &str {
        self.event.subject_id()
    }
}
