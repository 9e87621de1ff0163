//! Provider capability consumed by the session manager.
//!
//! The host application binds this trait to a concrete transport. The
//! manager only reacts to its effects: connection handles, status
//! snapshots, and transport events. A failed (re)connect surfaces as a
//! `Closed` transport event and a genuine open as `Opened`, matching
//! socket-callback semantics; `open_transport` itself only errors on
//! immediate failures such as a rejected configuration.

use async_trait::async_trait;
use avlink_infra_common::ProviderError;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::types::SessionConfig;

/// Handle returned by `open_connection`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionInfo {
    /// Provider-side identifier used for status queries and teardown.
    pub connection_id: String,
    /// Opaque address used to (re)establish the transport.
    pub endpoint: String,
}

/// Provider-side view of a connection.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    Active,
    Expired,
}

/// Snapshot returned by `query_connection_status`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub activity_level: f32,
    pub last_activity_at: Option<DateTime<Utc>>,
}

/// Event emitted by an open transport.
#[derive(Clone, Debug, PartialEq)]
pub enum TransportEvent {
    /// The transport finished opening and is live.
    Opened,
    /// The transport closed. `intentional` distinguishes caller-initiated
    /// teardown from losses that are eligible for reconnection.
    Closed { intentional: bool, reason: String },
    /// Transport-level failure; the session parks in the error state.
    Error { message: String },
}

/// Event stream of one transport attempt.
#[derive(Debug)]
pub struct TransportHandle {
    pub events: mpsc::UnboundedReceiver<TransportEvent>,
}

impl TransportHandle {
    /// Build a handle plus the sender the provider feeds events into.
    pub fn channel() -> (mpsc::UnboundedSender<TransportEvent>, Self) {
        let (tx, rx) = mpsc::unbounded_channel();
        (tx, Self { events: rx })
    }
}

/// External capability performing the actual connection work.
///
/// All methods may fail with a generic [`ProviderError`]; no richer
/// contract is assumed.
#[async_trait]
pub trait SessionProvider: Send + Sync {
    /// Allocate a provider-side connection for a new session.
    async fn open_connection(&self, config: &SessionConfig)
        -> Result<ConnectionInfo, ProviderError>;

    /// Tear down a provider-side connection.
    async fn close_connection(&self, connection_id: &str) -> Result<(), ProviderError>;

    /// Query liveness and activity of a connection.
    async fn query_connection_status(
        &self,
        connection_id: &str,
    ) -> Result<ConnectionStatus, ProviderError>;

    /// Begin opening the transport to `endpoint`.
    ///
    /// The returned handle reports the outcome asynchronously via
    /// [`TransportEvent`]s.
    async fn open_transport(&self, endpoint: &str) -> Result<TransportHandle, ProviderError>;
}
