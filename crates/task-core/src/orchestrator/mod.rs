//! Task orchestrator.
//!
//! Owns the set of in-flight tasks and every timer attached to them. Each
//! task gets an absolute disposal timer at initialization; the progress
//! loop and execution task come and go with a run. All handles live in a
//! per-task runtime entry that is removed together with the task state.

mod progress;

use std::sync::Arc;

use avlink_infra_common::events::{EventBus, OrchestratorEvent};
use dashmap::DashMap;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::sleep;
use tracing::{debug, info};

use crate::errors::{Result, TaskError};
use crate::provider::MediaProvider;
use crate::task_store::{TaskState, TaskStats, TaskStore};
use crate::types::{
    validate_resource_ref, DetectedEntity, ProcessingStatus, TaskFailure, TaskId,
    TaskOrchestratorConfig, TaskParameters,
};

/// Spawned tasks belonging to one orchestrated task.
struct TaskRuntime {
    disposal_task: JoinHandle<()>,
    progress_task: Option<JoinHandle<()>>,
    execution_task: Option<JoinHandle<()>>,
}

impl TaskRuntime {
    fn abort_all(&self) {
        self.disposal_task.abort();
        if let Some(task) = &self.progress_task {
            task.abort();
        }
        if let Some(task) = &self.execution_task {
            task.abort();
        }
    }
}

struct OrchestratorInner {
    config: TaskOrchestratorConfig,
    provider: Arc<dyn MediaProvider>,
    store: TaskStore,
    runtime: DashMap<TaskId, TaskRuntime>,
    bus: Arc<EventBus>,
}

/// Manages zero or more concurrent asynchronous jobs, each independent.
///
/// Cheap to clone; clones share the same state.
#[derive(Clone)]
pub struct TaskOrchestrator {
    inner: Arc<OrchestratorInner>,
}

impl TaskOrchestrator {
    /// Create an orchestrator over the given provider and shared event bus.
    pub fn new(
        provider: Arc<dyn MediaProvider>,
        bus: Arc<EventBus>,
        config: TaskOrchestratorConfig,
    ) -> Self {
        Self {
            inner: Arc::new(OrchestratorInner {
                config,
                provider,
                store: TaskStore::new(),
                runtime: DashMap::new(),
                bus,
            }),
        }
    }

    pub fn config(&self) -> &TaskOrchestratorConfig {
        &self.inner.config
    }

    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.inner.bus
    }

    /// Create a new pending task for `resource_ref` and schedule its
    /// automatic disposal.
    pub fn initialize_task(&self, resource_ref: &str) -> Result<ProcessingStatus> {
        validate_resource_ref(resource_ref)?;

        let task_id = TaskId::new();
        let state = TaskState::new(task_id.clone(), resource_ref.to_string());
        let snapshot = state.snapshot();
        self.inner.store.insert(state)?;

        let disposal_task = self.spawn_disposal_timer(task_id.clone());
        self.inner.runtime.insert(
            task_id,
            TaskRuntime {
                disposal_task,
                progress_task: None,
                execution_task: None,
            },
        );
        Ok(snapshot)
    }

    /// Run the provider's detection phase and store the ordered results on
    /// the task. Does not change the task's status.
    pub async fn detect_entities(&self, task_id: &TaskId) -> Result<Vec<DetectedEntity>> {
        let task = self
            .inner
            .store
            .get(task_id)
            .ok_or_else(|| TaskError::NotFound(task_id.to_string()))?;

        let entities = self.inner.provider.detect(&task.resource_ref).await?;
        self.inner
            .store
            .set_detections(task_id, entities.clone());
        Ok(entities)
    }

    /// Run a task synchronously: validate, execute, await the outcome.
    ///
    /// Returns the terminal snapshot either way; this variant never leaves
    /// the task running. Parameter validation happens before any provider
    /// call.
    pub async fn start_task(
        &self,
        task_id: &TaskId,
        parameters: TaskParameters,
    ) -> Result<ProcessingStatus> {
        let task = self.begin_run(task_id, &parameters)?;

        match self
            .inner
            .provider
            .execute(&task.resource_ref, &parameters, None)
            .await
        {
            Ok(result_ref) => self.finalize_success(task_id, result_ref),
            Err(error) => {
                self.finalize_failure(task_id, TaskFailure::Provider(error.to_string()))
            }
        }

        self.get_status(task_id)
            .ok_or_else(|| TaskError::NotFound(task_id.to_string()))
    }

    /// Start a task asynchronously: validate, mark running, start the
    /// progress loop, and hand execution to the provider in the background.
    ///
    /// The returned snapshot shows the task running; completion arrives as
    /// a `TaskSucceeded`/`TaskFailed` event, exactly one per run.
    pub fn start_task_async(
        &self,
        task_id: &TaskId,
        parameters: TaskParameters,
    ) -> Result<ProcessingStatus> {
        let task = self.begin_run(task_id, &parameters)?;

        let (progress_tx, progress_rx) = watch::channel(self.inner.config.initial_progress);
        let progress_task = self.spawn_progress_loop(task_id.clone(), progress_rx);

        let orchestrator = self.clone();
        let execution_id = task_id.clone();
        let execution_task = tokio::spawn(async move {
            let outcome = orchestrator
                .inner
                .provider
                .execute(&task.resource_ref, &parameters, Some(progress_tx))
                .await;
            match outcome {
                Ok(result_ref) => orchestrator.finalize_success(&execution_id, result_ref),
                Err(error) => orchestrator
                    .finalize_failure(&execution_id, TaskFailure::Provider(error.to_string())),
            }
        });

        match self.inner.runtime.get_mut(task_id) {
            Some(mut runtime) => {
                runtime.progress_task = Some(progress_task);
                runtime.execution_task = Some(execution_task);
            }
            None => {
                // Cleaned up between the guard and here.
                progress_task.abort();
                execution_task.abort();
            }
        }

        self.get_status(task_id)
            .ok_or_else(|| TaskError::NotFound(task_id.to_string()))
    }

    /// Cancel a running task.
    ///
    /// Idempotent; returns `false` when the task is unknown or has no
    /// active processing. Provider work already issued is not retracted;
    /// its eventual completion is discarded.
    pub fn cancel_task(&self, task_id: &TaskId) -> bool {
        if !self.inner.store.fail(task_id, TaskFailure::Cancelled) {
            return false;
        }
        self.stop_progress_loop(task_id);
        info!(task_id = %task_id, "task cancelled");
        self.publish(OrchestratorEvent::TaskFailed {
            task_id: task_id.to_string(),
            error: TaskFailure::Cancelled.to_string(),
        });
        true
    }

    /// Read-only snapshot of a task.
    pub fn get_status(&self, task_id: &TaskId) -> Option<ProcessingStatus> {
        self.inner.store.get(task_id).map(|task| task.snapshot())
    }

    /// Full state of a task, including detections and parameters.
    pub fn get_task(&self, task_id: &TaskId) -> Option<TaskState> {
        self.inner.store.get(task_id)
    }

    pub fn task_count(&self) -> usize {
        self.inner.store.count()
    }

    /// Per-status task counts.
    pub fn stats(&self) -> TaskStats {
        self.inner.store.stats()
    }

    /// Stop a task's timers and loops and remove its state. Idempotent.
    pub fn cleanup(&self, task_id: &TaskId) {
        if let Some((_, runtime)) = self.inner.runtime.remove(task_id) {
            runtime.abort_all();
        }
        if self.inner.store.remove(task_id).is_some() {
            info!(task_id = %task_id, "task cleaned up");
        }
    }

    /// Clean up every task.
    pub fn cleanup_all(&self) {
        for task_id in self.inner.store.ids() {
            self.cleanup(&task_id);
        }
    }

    /// Shared validation and state entry for both start variants: the task
    /// must exist, parameters must be valid, and only a pending task may
    /// start a run (a second start on a running or finished id is
    /// rejected, never an overwrite).
    fn begin_run(&self, task_id: &TaskId, parameters: &TaskParameters) -> Result<TaskState> {
        parameters.validate()?;
        self.inner.store.begin_run(
            task_id,
            parameters.clone(),
            self.inner.config.initial_progress,
        )
    }

    fn finalize_success(&self, task_id: &TaskId, result_ref: String) {
        if !self.inner.store.complete(task_id, result_ref.clone()) {
            debug!(task_id = %task_id, "discarding completion for task no longer running");
            return;
        }
        self.stop_progress_loop(task_id);
        info!(task_id = %task_id, %result_ref, "task succeeded");
        self.publish(OrchestratorEvent::TaskSucceeded {
            task_id: task_id.to_string(),
            result_ref,
        });
    }

    fn finalize_failure(&self, task_id: &TaskId, failure: TaskFailure) {
        let message = failure.to_string();
        if !self.inner.store.fail(task_id, failure) {
            debug!(task_id = %task_id, "discarding failure for task no longer running");
            return;
        }
        self.stop_progress_loop(task_id);
        info!(task_id = %task_id, error = %message, "task failed");
        self.publish(OrchestratorEvent::TaskFailed {
            task_id: task_id.to_string(),
            error: message,
        });
    }

    /// Abort the progress loop and drop run handles for a finished run.
    fn stop_progress_loop(&self, task_id: &TaskId) {
        if let Some(mut runtime) = self.inner.runtime.get_mut(task_id) {
            if let Some(task) = runtime.progress_task.take() {
                task.abort();
            }
            runtime.execution_task = None;
        }
    }

    /// Fire once at `created_at + max_task_duration` and dispose of the
    /// task if it is still around, whatever its status.
    fn spawn_disposal_timer(&self, task_id: TaskId) -> JoinHandle<()> {
        let orchestrator = self.clone();
        tokio::spawn(async move {
            sleep(orchestrator.inner.config.max_task_duration).await;
            if orchestrator.inner.store.get(&task_id).is_none() {
                return;
            }
            info!(task_id = %task_id, "task lifetime reached");
            orchestrator.publish(OrchestratorEvent::TaskExpired {
                task_id: task_id.to_string(),
            });
            orchestrator.cleanup(&task_id);
        })
    }

    pub(crate) fn publish(&self, event: OrchestratorEvent) {
        self.inner.bus.publish(event);
    }
}

impl std::fmt::Debug for TaskOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskOrchestrator")
            .field("tasks", &self.inner.store.count())
            .finish()
    }
}
