use std::time::Instant;

use dashmap::DashMap;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use super::state::TaskState;
use crate::errors::{Result, TaskError};
use crate::types::{DetectedEntity, TaskFailure, TaskId, TaskParameters, TaskStatus};

/// Task storage keyed by task id.
///
/// Uses DashMap for lock-free concurrent access; values are cloned out so
/// callers never hold a reference into the map. The terminal-state guards
/// on `complete`/`fail` make late provider completions safe to ignore.
#[derive(Debug, Default)]
pub struct TaskStore {
    tasks: DashMap<TaskId, TaskState>,
}

impl TaskStore {
    pub fn new() -> Self {
        Self {
            tasks: DashMap::new(),
        }
    }

    /// Insert a new task. Rejects duplicate ids.
    pub fn insert(&self, task: TaskState) -> Result<()> {
        let task_id = task.task_id.clone();
        if self.tasks.contains_key(&task_id) {
            return Err(TaskError::InvalidResource(format!(
                "task {task_id} already exists"
            )));
        }
        self.tasks.insert(task_id.clone(), task);
        info!(task_id = %task_id, "created task");
        Ok(())
    }

    /// Snapshot of a task by id.
    pub fn get(&self, task_id: &TaskId) -> Option<TaskState> {
        self.tasks.get(task_id).map(|entry| entry.value().clone())
    }

    /// Remove a task, returning its final state.
    pub fn remove(&self, task_id: &TaskId) -> Option<TaskState> {
        let removed = self.tasks.remove(task_id).map(|(_, state)| state);
        if removed.is_some() {
            info!(task_id = %task_id, "removed task");
        }
        removed
    }

    /// Store detection results. Missing ids are a no-op.
    pub fn set_detections(&self, task_id: &TaskId, entities: Vec<DetectedEntity>) {
        if let Some(mut entry) = self.tasks.get_mut(task_id) {
            debug!(task_id = %task_id, count = entities.len(), "stored detections");
            entry.detected_entities = entities;
            entry.updated_at = Instant::now();
        }
    }

    /// Begin a run: parameters pinned, status running, progress at
    /// `initial_progress`.
    ///
    /// The pending check happens under the entry lock, so two concurrent
    /// starts on one id cannot both succeed.
    pub fn begin_run(
        &self,
        task_id: &TaskId,
        parameters: TaskParameters,
        initial_progress: u8,
    ) -> Result<TaskState> {
        let mut entry = self
            .tasks
            .get_mut(task_id)
            .ok_or_else(|| TaskError::NotFound(task_id.to_string()))?;
        if entry.status != TaskStatus::Pending {
            return Err(TaskError::AlreadyStarted(task_id.to_string()));
        }
        entry.parameters = Some(parameters);
        entry.status = TaskStatus::Running;
        entry.progress = initial_progress;
        entry.updated_at = Instant::now();
        Ok(entry.clone())
    }

    /// Record a progress observation for a running task.
    ///
    /// Progress never decreases; the stored value is the max of the current
    /// and proposed values. Returns the effective progress, or `None` when
    /// the task is missing or not running.
    pub fn record_progress(&self, task_id: &TaskId, progress: u8) -> Option<u8> {
        let mut entry = self.tasks.get_mut(task_id)?;
        if entry.status != TaskStatus::Running {
            return None;
        }
        entry.progress = entry.progress.max(progress);
        entry.updated_at = Instant::now();
        Some(entry.progress)
    }

    /// Finalize a running task as succeeded. Returns `false` when the task
    /// is missing or no longer running (late completions are discarded).
    pub fn complete(&self, task_id: &TaskId, result_ref: String) -> bool {
        match self.tasks.get_mut(task_id) {
            Some(mut entry) if entry.status == TaskStatus::Running => {
                entry.status = TaskStatus::Succeeded;
                entry.progress = 100;
                entry.result_ref = Some(result_ref);
                entry.updated_at = Instant::now();
                true
            }
            _ => false,
        }
    }

    /// Finalize a running task as failed. Returns `false` when the task is
    /// missing or no longer running.
    pub fn fail(&self, task_id: &TaskId, failure: TaskFailure) -> bool {
        match self.tasks.get_mut(task_id) {
            Some(mut entry) if entry.status == TaskStatus::Running => {
                entry.status = TaskStatus::Failed;
                entry.error = Some(failure);
                entry.updated_at = Instant::now();
                true
            }
            _ => false,
        }
    }

    /// All task ids currently stored.
    pub fn ids(&self) -> Vec<TaskId> {
        self.tasks.iter().map(|entry| entry.key().clone()).collect()
    }

    pub fn count(&self) -> usize {
        self.tasks.len()
    }

    /// Per-status counts.
    pub fn stats(&self) -> TaskStats {
        let mut stats = TaskStats::default();
        for entry in self.tasks.iter() {
            stats.total += 1;
            match entry.value().status {
                TaskStatus::Pending => stats.pending += 1,
                TaskStatus::Running => stats.running += 1,
                TaskStatus::Succeeded => stats.succeeded += 1,
                TaskStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    /// Drop all task state.
    pub fn clear(&self) {
        self.tasks.clear();
        info!("cleared all task state");
    }
}

/// Task statistics.
#[derive(Debug, Default, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskStats {
    pub total: usize,
    pub pending: usize,
    pub running: usize,
    pub succeeded: usize,
    pub failed: usize,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored_task(store: &TaskStore) -> TaskId {
        let task_id = TaskId::new();
        store
            .insert(TaskState::new(task_id.clone(), "media/in.mp4".to_string()))
            .unwrap();
        task_id
    }

    #[test]
    fn progress_is_monotonic_while_running() {
        let store = TaskStore::new();
        let task_id = stored_task(&store);
        store.begin_run(&task_id, TaskParameters::new("swap"), 10).unwrap();

        assert_eq!(store.record_progress(&task_id, 40), Some(40));
        assert_eq!(store.record_progress(&task_id, 25), Some(40));
        assert_eq!(store.record_progress(&task_id, 41), Some(41));
    }

    #[test]
    fn progress_ignored_unless_running() {
        let store = TaskStore::new();
        let task_id = stored_task(&store);

        assert_eq!(store.record_progress(&task_id, 40), None);

        store.begin_run(&task_id, TaskParameters::new("swap"), 10).unwrap();
        assert!(store.complete(&task_id, "media/out.mp4".to_string()));
        assert_eq!(store.record_progress(&task_id, 40), None);
    }

    #[test]
    fn complete_sets_invariants_and_guards_terminal_states() {
        let store = TaskStore::new();
        let task_id = stored_task(&store);
        store.begin_run(&task_id, TaskParameters::new("swap"), 10).unwrap();

        assert!(store.complete(&task_id, "media/out.mp4".to_string()));
        let task = store.get(&task_id).unwrap();
        assert_eq!(task.status, TaskStatus::Succeeded);
        assert_eq!(task.progress, 100);
        assert_eq!(task.result_ref.as_deref(), Some("media/out.mp4"));
        assert!(task.error.is_none());

        // A late failure after success is discarded.
        assert!(!store.fail(&task_id, TaskFailure::Provider("late".to_string())));
        assert!(!store.complete(&task_id, "media/again.mp4".to_string()));
    }

    #[test]
    fn fail_records_failure_without_touching_progress() {
        let store = TaskStore::new();
        let task_id = stored_task(&store);
        store.begin_run(&task_id, TaskParameters::new("swap"), 10).unwrap();
        store.record_progress(&task_id, 55);

        assert!(store.fail(&task_id, TaskFailure::Cancelled));
        let task = store.get(&task_id).unwrap();
        assert_eq!(task.status, TaskStatus::Failed);
        assert_eq!(task.error, Some(TaskFailure::Cancelled));
        assert_eq!(task.progress, 55);
        assert!(task.result_ref.is_none());
    }
}
