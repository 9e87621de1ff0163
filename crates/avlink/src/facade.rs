//! Orchestration facade composing the session manager and task
//! orchestrator over one shared event bus.

use std::sync::Arc;

use avlink_infra_common::events::{BusEvent, EventBus, EventKind, Subscription};
use avlink_session_core::{
    SessionConfig, SessionId, SessionManager, SessionManagerConfig, SessionProvider, SessionState,
};
use avlink_task_core::{
    DetectedEntity, MediaProvider, ProcessingStatus, TaskId, TaskOrchestrator,
    TaskOrchestratorConfig, TaskParameters,
};
use serde::{Deserialize, Serialize};
use tracing::info;

/// Tuning for both managers.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    /// Session manager tuning.
    pub session: SessionManagerConfig,
    /// Task orchestrator tuning.
    pub task: TaskOrchestratorConfig,
}

/// The externally consumed entry point.
///
/// Constructed once at the composition root; the event bus and both
/// managers are owned here and injected, never ambient. Cheap to clone.
#[derive(Clone, Debug)]
pub struct Orchestrator {
    bus: Arc<EventBus>,
    sessions: SessionManager,
    tasks: TaskOrchestrator,
}

impl Orchestrator {
    /// Build the orchestration core over the given provider capabilities.
    pub fn new(
        session_provider: Arc<dyn SessionProvider>,
        media_provider: Arc<dyn MediaProvider>,
        config: OrchestratorConfig,
    ) -> Self {
        let bus = Arc::new(EventBus::new());
        let sessions = SessionManager::new(session_provider, Arc::clone(&bus), config.session);
        let tasks = TaskOrchestrator::new(media_provider, Arc::clone(&bus), config.task);
        info!("orchestrator initialized");
        Self {
            bus,
            sessions,
            tasks,
        }
    }

    /// The shared event bus.
    pub fn event_bus(&self) -> &Arc<EventBus> {
        &self.bus
    }

    /// Register a handler for events of `kind`.
    pub fn subscribe<F>(&self, kind: EventKind, handler: F) -> Subscription
    where
        F: Fn(&BusEvent) + Send + Sync + 'static,
    {
        self.bus.subscribe(kind, handler)
    }

    /// Remove a previously registered handler.
    pub fn unsubscribe(&self, subscription: &Subscription) {
        self.bus.unsubscribe(subscription)
    }

    /// The underlying session manager.
    pub fn sessions(&self) -> &SessionManager {
        &self.sessions
    }

    /// The underlying task orchestrator.
    pub fn tasks(&self) -> &TaskOrchestrator {
        &self.tasks
    }

    // ===== Session surface =====

    /// Create a new session. See [`SessionManager::create_session`].
    pub async fn create_session(
        &self,
        config: SessionConfig,
    ) -> avlink_session_core::Result<SessionState> {
        self.sessions.create_session(config).await
    }

    /// Open the transport for a session. See [`SessionManager::connect`].
    pub async fn connect_session(&self, session_id: &SessionId) -> avlink_session_core::Result<()> {
        self.sessions.connect(session_id).await
    }

    /// Read-only snapshot of a session.
    pub fn get_session_status(&self, session_id: &SessionId) -> Option<SessionState> {
        self.sessions.get_status(session_id)
    }

    /// Snapshots of all sessions.
    pub fn list_sessions(&self) -> Vec<SessionState> {
        self.sessions.list_sessions()
    }

    /// Tear down a session. Idempotent.
    pub async fn destroy_session(&self, session_id: &SessionId) {
        self.sessions.destroy(session_id).await
    }

    // ===== Task surface =====

    /// Create a new pending task. See [`TaskOrchestrator::initialize_task`].
    pub fn initialize_task(
        &self,
        resource_ref: &str,
    ) -> avlink_task_core::Result<ProcessingStatus> {
        self.tasks.initialize_task(resource_ref)
    }

    /// Run the detection phase for a task.
    pub async fn detect_entities(
        &self,
        task_id: &TaskId,
    ) -> avlink_task_core::Result<Vec<DetectedEntity>> {
        self.tasks.detect_entities(task_id).await
    }

    /// Run a task synchronously to its terminal state.
    pub async fn start_task(
        &self,
        task_id: &TaskId,
        parameters: TaskParameters,
    ) -> avlink_task_core::Result<ProcessingStatus> {
        self.tasks.start_task(task_id, parameters).await
    }

    /// Start a task asynchronously; completion arrives on the event bus.
    pub fn start_task_async(
        &self,
        task_id: &TaskId,
        parameters: TaskParameters,
    ) -> avlink_task_core::Result<ProcessingStatus> {
        self.tasks.start_task_async(task_id, parameters)
    }

    /// Read-only snapshot of a task.
    pub fn get_task_status(&self, task_id: &TaskId) -> Option<ProcessingStatus> {
        self.tasks.get_status(task_id)
    }

    /// Cancel a running task; `false` when there was nothing to cancel.
    pub fn cancel_task(&self, task_id: &TaskId) -> bool {
        self.tasks.cancel_task(task_id)
    }

    /// Remove a task and stop its timers. Idempotent.
    pub fn cleanup_task(&self, task_id: &TaskId) {
        self.tasks.cleanup(task_id)
    }

    /// Tear down every session and task.
    pub async fn shutdown(&self) {
        info!("orchestrator shutting down");
        self.sessions.destroy_all().await;
        self.tasks.cleanup_all();
    }
}
