//! Event system for the avlink orchestration core.
//!
//! Both managers publish state-change notifications onto one shared
//! [`EventBus`]. Events are immutable, fire-and-forget values; delivery is
//! best-effort, in-process, and synchronous within a single publish call.
//! The full event vocabulary lives here so the session and task crates share
//! one definition instead of each inventing their own.

mod bus;
mod types;

pub use bus::{EventBus, EventHandler, Subscription};
pub use types::{BusEvent, DisconnectReason, EventKind, OrchestratorEvent};
