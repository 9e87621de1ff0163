use std::time::{Duration, Instant};

use crate::types::{
    DetectedEntity, ProcessingStatus, TaskFailure, TaskId, TaskParameters, TaskStatus,
};

/// Complete state of one task.
///
/// Mutated only by the owning orchestrator; callers receive
/// [`ProcessingStatus`] snapshots.
#[derive(Debug, Clone)]
pub struct TaskState {
    pub task_id: TaskId,

    /// Input media reference; immutable once set.
    pub resource_ref: String,

    /// Ordered detection results; empty until populated.
    pub detected_entities: Vec<DetectedEntity>,

    /// Execution parameters; immutable once a run starts.
    pub parameters: Option<TaskParameters>,

    pub status: TaskStatus,

    /// 0–100; monotonically non-decreasing while running, 100 exactly on
    /// success.
    pub progress: u8,

    /// Set only on success.
    pub result_ref: Option<String>,

    /// Set only on failure.
    pub error: Option<TaskFailure>,

    pub created_at: Instant,
    pub updated_at: Instant,
}

impl TaskState {
    /// Create a new task in the pending state.
    pub fn new(task_id: TaskId, resource_ref: String) -> Self {
        let now = Instant::now();
        Self {
            task_id,
            resource_ref,
            detected_entities: Vec::new(),
            parameters: None,
            status: TaskStatus::Pending,
            progress: 0,
            result_ref: None,
            error: None,
            created_at: now,
            updated_at: now,
        }
    }

    /// Read-only snapshot for callers.
    pub fn snapshot(&self) -> ProcessingStatus {
        ProcessingStatus {
            task_id: self.task_id.to_string(),
            status: self.status,
            progress: self.progress,
            result_ref: self.result_ref.clone(),
            error: self.error.clone(),
        }
    }

    /// Total time since initialization.
    pub fn task_duration(&self) -> Duration {
        Instant::now() - self.created_at
    }
}
