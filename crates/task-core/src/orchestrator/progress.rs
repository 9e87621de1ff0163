//! Progress loop for asynchronous runs.
//!
//! Provider-reported progress is authoritative; when the provider never
//! reports, simulated increments keep the caller's display moving. Neither
//! path may reach 100 on its own: only a real completion does.

use rand::Rng;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

use avlink_infra_common::events::OrchestratorEvent;

use super::TaskOrchestrator;
use crate::types::{TaskId, TaskStatus};

/// Ceiling for simulated increments.
const SIMULATED_PROGRESS_CAP: u8 = 95;

/// Ceiling for provider-reported values while the run is still live.
const REPORTED_PROGRESS_CAP: u8 = 99;

impl TaskOrchestrator {
    /// Emit a `TaskProgress` event on every tick until the task leaves the
    /// running state.
    pub(super) fn spawn_progress_loop(
        &self,
        task_id: TaskId,
        mut reported: watch::Receiver<u8>,
    ) -> JoinHandle<()> {
        let orchestrator = self.clone();
        tokio::spawn(async move {
            let config = &orchestrator.inner.config;
            let mut ticker = interval(config.progress_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

            loop {
                ticker.tick().await;
                let Some(task) = orchestrator.inner.store.get(&task_id) else {
                    break;
                };
                if task.status != TaskStatus::Running {
                    break;
                }

                let provider_reported = *reported.borrow_and_update();
                let next = if provider_reported > task.progress {
                    provider_reported.min(REPORTED_PROGRESS_CAP)
                } else {
                    let hi = config.simulated_step_max.max(config.simulated_step_min);
                    let step = rand::thread_rng().gen_range(config.simulated_step_min..=hi);
                    task.progress
                        .saturating_add(step)
                        .min(SIMULATED_PROGRESS_CAP)
                };

                let Some(applied) = orchestrator.inner.store.record_progress(&task_id, next)
                else {
                    break;
                };
                orchestrator.publish(OrchestratorEvent::TaskProgress {
                    task_id: task_id.to_string(),
                    progress: applied,
                });
            }
        })
    }
}
