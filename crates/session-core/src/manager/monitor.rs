//! Per-session monitoring: the provider status-polling loop and the
//! absolute lifetime timer.

use avlink_infra_common::events::{DisconnectReason, OrchestratorEvent};
use tokio::task::JoinHandle;
use tokio::time::{interval, sleep, MissedTickBehavior};
use tracing::{debug, info};

use super::SessionManager;
use crate::provider::ConnectionState;
use crate::types::{SessionId, SessionStatus};

impl SessionManager {
    /// Periodically query provider-side status for one session.
    ///
    /// A failed query waits for the next scheduled tick; missed ticks are
    /// skipped, never retried mid-interval.
    pub(crate) fn spawn_poll_loop(&self, session_id: SessionId) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            let mut ticker = interval(manager.inner.config.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first interval tick completes immediately; swallow it so
            // polling starts one full interval after creation.
            ticker.tick().await;

            loop {
                ticker.tick().await;
                let Some(session) = manager.inner.store.get(&session_id) else {
                    break;
                };

                let status = match manager
                    .inner
                    .provider
                    .query_connection_status(&session.connection_id)
                    .await
                {
                    Ok(status) => status,
                    Err(error) => {
                        debug!(session_id = %session_id, %error, "status poll failed");
                        continue;
                    }
                };

                if status.state == ConnectionState::Expired {
                    info!(session_id = %session_id, "provider reported expiry");
                    manager.publish(OrchestratorEvent::SessionExpired {
                        session_id: session_id.to_string(),
                    });
                    let destroyer = manager.clone();
                    let expired_id = session_id.clone();
                    // Teardown aborts this loop, so it runs on its own task.
                    tokio::spawn(async move {
                        destroyer
                            .destroy_with_reason(&expired_id, DisconnectReason::Expired)
                            .await;
                    });
                    break;
                }

                let delta = (status.activity_level - session.activity_level).abs();
                manager
                    .inner
                    .store
                    .record_activity(&session_id, status.activity_level);
                if delta > manager.inner.config.activity_threshold {
                    manager.publish(OrchestratorEvent::SessionActivity {
                        session_id: session_id.to_string(),
                        activity_level: status.activity_level,
                    });
                }
            }
        })
    }

    /// Fire once at `created_at + max_session_duration` and expire the
    /// session if it is still around.
    pub(crate) fn spawn_lifetime_timer(&self, session_id: SessionId) -> JoinHandle<()> {
        let manager = self.clone();
        tokio::spawn(async move {
            sleep(manager.inner.config.max_session_duration).await;

            let Some(session) = manager.inner.store.get(&session_id) else {
                return;
            };
            if session.status == SessionStatus::Disconnected {
                return;
            }

            info!(session_id = %session_id, "session lifetime reached");
            manager.publish(OrchestratorEvent::SessionExpired {
                session_id: session_id.to_string(),
            });
            let destroyer = manager.clone();
            // Teardown aborts this timer task, so it runs on its own task.
            tokio::spawn(async move {
                destroyer
                    .destroy_with_reason(&session_id, DisconnectReason::Expired)
                    .await;
            });
        })
    }
}
