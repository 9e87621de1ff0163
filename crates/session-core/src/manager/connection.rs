//! Transport establishment, the per-connection event watcher, and
//! backoff-scheduled reconnection.

use avlink_infra_common::events::OrchestratorEvent;
use tracing::{debug, info, warn};

use super::SessionManager;
use crate::provider::{TransportEvent, TransportHandle};
use crate::types::{SessionId, SessionStatus};

impl SessionManager {
    /// Open the transport for `session_id` and hand the event stream to a
    /// watcher task. An immediate open failure parks the session in the
    /// error state; the outcome of a started open arrives as transport
    /// events.
    pub(crate) async fn establish(&self, session_id: SessionId) {
        let Some(session) = self.inner.store.get(&session_id) else {
            return;
        };
        debug!(session_id = %session_id, endpoint = %session.endpoint, "opening transport");

        match self.inner.provider.open_transport(&session.endpoint).await {
            Ok(handle) => {
                let manager = self.clone();
                let watcher_id = session_id.clone();
                let task =
                    tokio::spawn(async move { manager.run_transport_watcher(watcher_id, handle).await });
                match self.inner.runtime.get_mut(&session_id) {
                    Some(mut runtime) => runtime.transport_task = Some(task),
                    // Destroyed while the open was in flight.
                    None => task.abort(),
                }
            }
            Err(error) => {
                warn!(session_id = %session_id, %error, "transport open failed");
                self.inner.store.set_status(&session_id, SessionStatus::Error);
                self.publish(OrchestratorEvent::SessionError {
                    session_id: session_id.to_string(),
                    message: error.to_string(),
                });
            }
        }
    }

    /// Consume transport events for one connection attempt.
    ///
    /// Reconnection is scheduled only from the non-intentional close
    /// branch; the error branch parks the session without retrying, so the
    /// two branches can never both schedule for the same loss.
    async fn run_transport_watcher(self, session_id: SessionId, mut handle: TransportHandle) {
        while let Some(event) = handle.events.recv().await {
            match event {
                TransportEvent::Opened => {
                    if self.inner.store.mark_connected(&session_id) {
                        info!(session_id = %session_id, "transport opened");
                        self.publish(OrchestratorEvent::SessionConnected {
                            session_id: session_id.to_string(),
                        });
                    }
                }
                TransportEvent::Error { message } => {
                    warn!(session_id = %session_id, %message, "transport error");
                    self.inner.store.set_status(&session_id, SessionStatus::Error);
                    self.publish(OrchestratorEvent::SessionError {
                        session_id: session_id.to_string(),
                        message,
                    });
                    break;
                }
                TransportEvent::Closed {
                    intentional: true,
                    reason,
                } => {
                    debug!(session_id = %session_id, %reason, "transport closed intentionally");
                    break;
                }
                TransportEvent::Closed {
                    intentional: false,
                    reason,
                } => {
                    self.handle_connection_loss(&session_id, &reason);
                    break;
                }
            }
        }

        if let Some(mut runtime) = self.inner.runtime.get_mut(&session_id) {
            runtime.transport_task = None;
        }
    }

    /// React to a non-intentional transport close: schedule a reconnect
    /// while budget remains, otherwise park the session in the error state.
    fn handle_connection_loss(&self, session_id: &SessionId, reason: &str) {
        let Some(session) = self.inner.store.get(session_id) else {
            return;
        };

        let backoff = &self.inner.config.reconnect_backoff;
        let attempts = session.reconnect_attempts;
        if attempts >= backoff.max_attempts {
            warn!(session_id = %session_id, attempts, "reconnect budget exhausted");
            self.inner.store.set_status(session_id, SessionStatus::Error);
            self.publish(OrchestratorEvent::SessionError {
                session_id: session_id.to_string(),
                message: format!(
                    "reconnect budget exhausted after {attempts} attempts (close: {reason})"
                ),
            });
            return;
        }

        let delay = backoff.delay_for(attempts);
        let attempt = attempts + 1;
        self.inner.store.begin_reconnect(session_id, attempt);
        info!(session_id = %session_id, attempt, ?delay, %reason, "scheduling reconnect");
        self.publish(OrchestratorEvent::SessionReconnectAttempt {
            session_id: session_id.to_string(),
            attempt,
            delay,
        });

        let manager = self.clone();
        let reconnect_id = session_id.clone();
        let task = tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            if let Some(mut runtime) = manager.inner.runtime.get_mut(&reconnect_id) {
                runtime.reconnect_task = None;
            } else {
                // Destroyed while the reconnect was pending.
                return;
            }
            manager.establish(reconnect_id).await;
        });

        if let Some(mut runtime) = self.inner.runtime.get_mut(session_id) {
            runtime.reconnect_task = Some(task);
        } else {
            task.abort();
        }
    }
}
