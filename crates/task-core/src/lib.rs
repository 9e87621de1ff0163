//! Asynchronous task orchestration for avlink.
//!
//! A task is a bounded unit of work with a terminal success/failure
//! outcome: a media-transformation job driven through `Pending → Running →
//! {Succeeded | Failed}`. [`TaskOrchestrator`] owns the set of in-flight
//! tasks and drives detection, parameter validation, execution, progress
//! reporting, cancellation, and timeout-based disposal. The actual
//! detection and execution work is delegated to a [`MediaProvider`]
//! capability supplied by the host application.

pub mod errors;
pub mod orchestrator;
pub mod provider;
pub mod task_store;
pub mod types;

pub use errors::{Result, TaskError};
pub use orchestrator::TaskOrchestrator;
pub use provider::MediaProvider;
pub use task_store::{TaskState, TaskStats, TaskStore};
pub use types::{
    BoundingRegion, DetectedEntity, ProcessingStatus, TaskFailure, TaskId, TaskOrchestratorConfig,
    TaskParameters, TaskStatus, TimeRange,
};
