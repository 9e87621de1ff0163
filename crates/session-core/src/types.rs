use std::time::Duration;

use avlink_infra_common::backoff::BackoffConfig;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique session identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(pub String);

impl SessionId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        Self(format!("sess-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for SessionId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Where a session currently is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    /// Created, or reconnecting after a transport loss.
    Connecting,
    /// Transport open and live.
    Connected,
    /// Terminal: torn down or expired.
    Disconnected,
    /// Terminal unless a scheduled reconnect revives it.
    Error,
}

impl std::fmt::Display for SessionStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            SessionStatus::Connecting => "connecting",
            SessionStatus::Connected => "connected",
            SessionStatus::Disconnected => "disconnected",
            SessionStatus::Error => "error",
        };
        f.write_str(s)
    }
}

/// Immutable creation parameters, opaque to this layer.
///
/// The payload is forwarded verbatim to the provider's `open_connection`;
/// the manager never inspects it.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    pub params: serde_json::Value,
}

impl SessionConfig {
    pub fn new(params: serde_json::Value) -> Self {
        Self { params }
    }
}

/// Tuning for a [`SessionManager`](crate::SessionManager) instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionManagerConfig {
    /// Reconnect schedule: base/max delay and attempt budget.
    pub reconnect_backoff: BackoffConfig,

    /// Interval of the provider status-polling loop.
    pub poll_interval: Duration,

    /// Absolute session lifetime measured from creation.
    pub max_session_duration: Duration,

    /// Minimum activity-level delta that triggers an activity event.
    pub activity_threshold: f32,
}

impl Default for SessionManagerConfig {
    fn default() -> Self {
        Self {
            reconnect_backoff: BackoffConfig::default(),
            poll_interval: Duration::from_secs(5),
            max_session_duration: Duration::from_secs(600),
            activity_threshold: 0.1,
        }
    }
}
