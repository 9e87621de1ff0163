//! # avlink - asynchronous session & task orchestration
//!
//! avlink is the orchestration core for applications that hold long-lived
//! bidirectional sessions to an external real-time service (e.g. a live
//! voice or avatar channel) while driving long-running asynchronous jobs
//! (e.g. a multi-stage media transformation) to a terminal outcome.
//!
//! ## Overview
//!
//! The library is composed of three member crates plus this facade:
//!
//! - **Infra Common**: event bus, backoff policy, shared error types
//! - **Session Core**: session lifecycle management with reconnection,
//!   status polling, and timeout enforcement
//! - **Task Core**: task orchestration with detection, validation,
//!   progress reporting, cancellation, and disposal
//!
//! ## Quick Start
//!
//! ```no_run
//! use std::sync::Arc;
//! use avlink::{Orchestrator, OrchestratorConfig};
//! # use avlink::session_core::SessionProvider;
//! # use avlink::task_core::MediaProvider;
//! # fn providers() -> (Arc<dyn SessionProvider>, Arc<dyn MediaProvider>) { unimplemented!() }
//!
//! let (session_provider, media_provider) = providers();
//! let orchestrator = Orchestrator::new(
//!     session_provider,
//!     media_provider,
//!     OrchestratorConfig::default(),
//! );
//! // orchestrator.create_session(...), orchestrator.initialize_task(...)
//! ```
//!
//! ## Module Structure
//!
//! - [`infra_common`]: event bus and backoff policy
//! - [`session_core`]: session lifecycle management
//! - [`task_core`]: task orchestration

#![deny(missing_docs)]
#![warn(rust_2018_idioms)]

// Re-export member crates as modules
pub use avlink_infra_common as infra_common;
pub use avlink_session_core as session_core;
pub use avlink_task_core as task_core;

mod facade;

pub use facade::{Orchestrator, OrchestratorConfig};

pub mod prelude {
    //! Common imports for avlink applications.

    pub use crate::facade::{Orchestrator, OrchestratorConfig};
    pub use crate::infra_common::backoff::BackoffConfig;
    pub use crate::infra_common::events::{
        BusEvent, DisconnectReason, EventBus, EventKind, OrchestratorEvent, Subscription,
    };
    pub use crate::infra_common::ProviderError;
    pub use crate::session_core::{
        SessionConfig, SessionId, SessionManager, SessionManagerConfig, SessionProvider,
        SessionState, SessionStatus, TransportEvent, TransportHandle,
    };
    pub use crate::task_core::{
        DetectedEntity, MediaProvider, ProcessingStatus, TaskFailure, TaskId, TaskOrchestrator,
        TaskOrchestratorConfig, TaskParameters, TaskStatus, TimeRange,
    };
}

/// The version of the avlink library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
/// The description of the avlink library
pub const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");
