//! Session lifecycle manager.
//!
//! Owns the set of live sessions and every timer attached to them. Each
//! session gets a status-polling loop and an absolute lifetime timer at
//! creation; transport watchers and reconnect timers come and go with the
//! connection. All handles live in a per-session runtime entry that is
//! removed together with the session state, so a torn-down session holds
//! no timers.

mod connection;
mod monitor;

use std::sync::Arc;

use avlink_infra_common::events::{DisconnectReason, EventBus, OrchestratorEvent};
use dashmap::DashMap;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::errors::{Result, SessionError};
use crate::provider::SessionProvider;
use crate::session_store::{SessionState, SessionStats, SessionStore};
use crate::types::{SessionConfig, SessionId, SessionManagerConfig, SessionStatus};

/// Spawned tasks belonging to one session.
struct SessionRuntime {
    poll_task: JoinHandle<()>,
    lifetime_task: JoinHandle<()>,
    transport_task: Option<JoinHandle<()>>,
    reconnect_task: Option<JoinHandle<()>>,
}

impl SessionRuntime {
    fn abort_all(&self) {
        self.poll_task.abort();
        self.lifetime_task.abort();
        if let Some(task) = &self.transport_task {
            task.abort();
        }
        if let Some(task) = &self.reconnect_task {
            task.abort();
        }
    }

    /// A connect or scheduled reconnect is currently in flight.
    fn connect_in_flight(&self) -> bool {
        self.transport_task.is_some() || self.reconnect_task.is_some()
    }
}

struct ManagerInner {
    config: SessionManagerConfig,
    provider: Arc<dyn SessionProvider>,
    store: SessionStore,
    runtime: DashMap<SessionId, SessionRuntime>,
    bus: Arc<EventBus>,
}

/// Manages the full lifecycle of zero or more concurrent sessions.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct SessionManager {
    inner: Arc<ManagerInner>,
}

impl SessionManager {
    /// Create a manager over the given provider and shared event bus.
    pub fn new(
        provider: Arc<dyn SessionProvider>,
        bus: Arc<EventBus>,
        config: SessionManagerConfig,
    ) -> Self {
        Self {
            inner: Arc::new(ManagerInner {
                config,
                provider,
                store: SessionStore::new(),
                runtime: DashMap::new(),
                bus,
            }),
        }
    }

    pub fn config(&self) -> &SessionManagerConfig {
        &self.inner.config
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.inner.bus
    }

    /// Create a new session.
    ///
    /// Calls the provider to allocate a connection, stores the session in
    /// the connecting state, starts its polling loop and lifetime timer,
    /// and emits `SessionCreated`. Provider failure is returned to the
    /// caller; nothing is stored in that case.
    pub async fn create_session(&self, config: SessionConfig) -> Result<SessionState> {
        let connection = self.inner.provider.open_connection(&config).await?;

        let session_id = SessionId::new();
        let state = SessionState::new(
            session_id.clone(),
            connection.connection_id,
            connection.endpoint,
            config,
        );
        self.inner.store.insert(state.clone())?;

        let poll_task = self.spawn_poll_loop(session_id.clone());
        let lifetime_task = self.spawn_lifetime_timer(session_id.clone());
        self.inner.runtime.insert(
            session_id.clone(),
            SessionRuntime {
                poll_task,
                lifetime_task,
                transport_task: None,
                reconnect_task: None,
            },
        );

        self.publish(OrchestratorEvent::SessionCreated {
            session_id: session_id.to_string(),
        });
        Ok(state)
    }

    /// Open the transport for a session.
    ///
    /// Rejected when the session is unknown, already connected, has a
    /// connect or reconnect in flight, or is parked in the error state
    /// (reconnection from there is only scheduled internally). A transport
    /// failure after this point is surfaced as the session's `Error` status
    /// plus a broadcast event, not as a returned error.
    pub async fn connect(&self, session_id: &SessionId) -> Result<()> {
        let session = self
            .inner
            .store
            .get(session_id)
            .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;

        match session.status {
            SessionStatus::Connected => {
                return Err(SessionError::AlreadyConnected(session_id.to_string()));
            }
            SessionStatus::Error => {
                return Err(SessionError::InvalidTransition(format!(
                    "session {session_id} is in the error state"
                )));
            }
            SessionStatus::Disconnected => {
                return Err(SessionError::NotFound(session_id.to_string()));
            }
            SessionStatus::Connecting => {}
        }

        {
            let runtime = self
                .inner
                .runtime
                .get(session_id)
                .ok_or_else(|| SessionError::NotFound(session_id.to_string()))?;
            if runtime.connect_in_flight() {
                return Err(SessionError::AlreadyConnected(session_id.to_string()));
            }
        }

        self.establish(session_id.clone()).await;
        Ok(())
    }

    /// Read-only snapshot of a session.
    pub fn get_status(&self, session_id: &SessionId) -> Option<SessionState> {
        self.inner.store.get(session_id)
    }

    /// Snapshots of all sessions.
    pub fn list_sessions(&self) -> Vec<SessionState> {
        self.inner.store.list()
    }

    pub fn session_count(&self) -> usize {
        self.inner.store.count()
    }

    /// Per-status session counts.
    pub fn stats(&self) -> SessionStats {
        self.inner.store.stats()
    }

    /// Tear down a session: stop its timers, close the provider-side
    /// connection (best-effort), emit `SessionDisconnected`, remove state.
    ///
    /// Idempotent; destroying an unknown or already-destroyed session is a
    /// silent no-op and emits nothing.
    pub async fn destroy(&self, session_id: &SessionId) {
        self.destroy_with_reason(session_id, DisconnectReason::Destroyed)
            .await;
    }

    /// Tear down every session.
    pub async fn destroy_all(&self) {
        for session_id in self.inner.store.ids() {
            self.destroy(&session_id).await;
        }
    }

    pub(crate) async fn destroy_with_reason(
        &self,
        session_id: &SessionId,
        reason: DisconnectReason,
    ) {
        // Runtime entry first: no timer may outlive the state it watches.
        if let Some((_, runtime)) = self.inner.runtime.remove(session_id) {
            runtime.abort_all();
        }
        let Some(session) = self.inner.store.remove(session_id) else {
            return;
        };

        if let Err(error) = self
            .inner
            .provider
            .close_connection(&session.connection_id)
            .await
        {
            warn!(session_id = %session_id, %error, "provider teardown failed");
        }

        self.publish(OrchestratorEvent::SessionDisconnected {
            session_id: session_id.to_string(),
            reason,
        });
        info!(session_id = %session_id, %reason, "session destroyed");
    }

    pub(crate) fn publish(&self, event: OrchestratorEvent) {
        self.inner.bus.publish(event);
    }
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("sessions", &self.inner.store.count())
            .finish()
    }
}
