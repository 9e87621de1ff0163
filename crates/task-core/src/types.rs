use std::time::Duration;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::errors::{Result, TaskError};

/// Unique task identifier.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TaskId(pub String);

impl TaskId {
    /// Generate a fresh identifier.
    pub fn new() -> Self {
        Self(format!("task-{}", Uuid::new_v4()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for TaskId {
    fn from(value: &str) -> Self {
        Self(value.to_string())
    }
}

impl From<String> for TaskId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Where a task currently is in its lifecycle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Running,
    Succeeded,
    Failed,
}

impl TaskStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, TaskStatus::Succeeded | TaskStatus::Failed)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            TaskStatus::Pending => "pending",
            TaskStatus::Running => "running",
            TaskStatus::Succeeded => "succeeded",
            TaskStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Why a task failed. Cancellation and expiry are distinguished from
/// provider failures so callers can tell them apart.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskFailure {
    Cancelled,
    Expired,
    Provider(String),
}

impl std::fmt::Display for TaskFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskFailure::Cancelled => write!(f, "cancelled"),
            TaskFailure::Expired => write!(f, "expired"),
            TaskFailure::Provider(message) => write!(f, "{message}"),
        }
    }
}

/// Half-open time window in seconds within the source media.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct TimeRange {
    pub start: f64,
    pub end: f64,
}

/// Normalized region within a frame.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct BoundingRegion {
    pub x: f32,
    pub y: f32,
    pub width: f32,
    pub height: f32,
}

/// One entity found by the provider's detection phase.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DetectedEntity {
    pub id: String,
    pub time_range: Option<TimeRange>,
    pub bounding_region: Option<BoundingRegion>,
    pub confidence: f32,
}

/// Validated execution parameters; immutable once a run starts.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TaskParameters {
    /// Transformation to perform, e.g. `"swap"` or `"dub"`. Required.
    pub operation: String,

    /// Detected entity the transformation targets, when it targets one.
    pub entity_id: Option<String>,

    /// Window of the source media to process; whole input when absent.
    pub time_range: Option<TimeRange>,

    /// Opaque provider options, forwarded verbatim.
    #[serde(default)]
    pub options: serde_json::Value,
}

impl TaskParameters {
    pub fn new(operation: impl Into<String>) -> Self {
        Self {
            operation: operation.into(),
            entity_id: None,
            time_range: None,
            options: serde_json::Value::Null,
        }
    }

    /// Check required fields and the time-range bounds.
    pub fn validate(&self) -> Result<()> {
        if self.operation.trim().is_empty() {
            return Err(TaskError::InvalidParameters(
                "operation is required".to_string(),
            ));
        }
        if let Some(entity_id) = &self.entity_id {
            if entity_id.is_empty() {
                return Err(TaskError::InvalidParameters(
                    "entity id must not be empty".to_string(),
                ));
            }
        }
        if let Some(range) = &self.time_range {
            if !range.start.is_finite() || !range.end.is_finite() {
                return Err(TaskError::InvalidParameters(
                    "time range bounds must be finite".to_string(),
                ));
            }
            if range.start < 0.0 {
                return Err(TaskError::InvalidParameters(format!(
                    "time range start must be non-negative, got {}",
                    range.start
                )));
            }
            if range.end <= range.start {
                return Err(TaskError::InvalidParameters(format!(
                    "time range end ({}) must be after start ({})",
                    range.end, range.start
                )));
            }
        }
        Ok(())
    }
}

/// Read-only processing snapshot returned to callers.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ProcessingStatus {
    pub task_id: String,
    pub status: TaskStatus,
    pub progress: u8,
    pub result_ref: Option<String>,
    pub error: Option<TaskFailure>,
}

/// Tuning for a [`TaskOrchestrator`](crate::TaskOrchestrator) instance.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct TaskOrchestratorConfig {
    /// Absolute task lifetime measured from initialization; disposal fires
    /// at this point regardless of status.
    pub max_task_duration: Duration,

    /// Interval of the progress loop for asynchronous runs.
    pub progress_interval: Duration,

    /// Progress value a run starts at.
    pub initial_progress: u8,

    /// Smallest simulated progress increment per tick.
    pub simulated_step_min: u8,

    /// Largest simulated progress increment per tick.
    pub simulated_step_max: u8,
}

impl Default for TaskOrchestratorConfig {
    fn default() -> Self {
        Self {
            max_task_duration: Duration::from_secs(900),
            progress_interval: Duration::from_millis(500),
            initial_progress: 10,
            simulated_step_min: 5,
            simulated_step_max: 15,
        }
    }
}

/// Check a resource reference is a well-formed address.
pub(crate) fn validate_resource_ref(resource_ref: &str) -> Result<()> {
    if resource_ref.is_empty() {
        return Err(TaskError::InvalidResource(
            "resource reference must not be empty".to_string(),
        ));
    }
    if resource_ref.chars().any(char::is_whitespace) {
        return Err(TaskError::InvalidResource(format!(
            "resource reference must not contain whitespace: {resource_ref:?}"
        )));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn resource_ref_rejects_empty_and_whitespace() {
        assert!(validate_resource_ref("").is_err());
        assert!(validate_resource_ref("video 1.mp4").is_err());
        assert!(validate_resource_ref(" leading").is_err());
        assert!(validate_resource_ref("media/video-1.mp4").is_ok());
        assert!(validate_resource_ref("https://cdn.test/v/1").is_ok());
    }

    #[test]
    fn parameters_require_operation() {
        assert!(TaskParameters::new("swap").validate().is_ok());
        assert!(TaskParameters::new("").validate().is_err());
        assert!(TaskParameters::new("   ").validate().is_err());
    }

    #[test]
    fn time_range_bounds_are_checked() {
        let mut params = TaskParameters::new("swap");

        params.time_range = Some(TimeRange { start: 5.0, end: 2.0 });
        assert!(params.validate().is_err());

        params.time_range = Some(TimeRange {
            start: -1.0,
            end: 2.0,
        });
        assert!(params.validate().is_err());

        params.time_range = Some(TimeRange { start: 3.0, end: 3.0 });
        assert!(params.validate().is_err());

        params.time_range = Some(TimeRange { start: 0.0, end: 9.5 });
        assert!(params.validate().is_ok());
    }

    #[test]
    fn empty_entity_id_is_rejected() {
        let mut params = TaskParameters::new("swap");
        params.entity_id = Some(String::new());
        assert!(params.validate().is_err());

        params.entity_id = Some("entity-1".to_string());
        assert!(params.validate().is_ok());
    }
}
