//! Common infrastructure for the avlink orchestration core.
//!
//! This crate provides the pieces shared by the session and task layers:
//!
//! - [`events`]: the in-process event bus and the orchestration event
//!   vocabulary published by both managers
//! - [`backoff`]: the exponential backoff policy used for reconnection
//! - [`ProviderError`]: the one failure shape assumed of external provider
//!   capabilities

pub mod backoff;
pub mod errors;
pub mod events;

pub use backoff::{delay, BackoffConfig};
pub use errors::ProviderError;
pub use events::{
    BusEvent, DisconnectReason, EventBus, EventKind, OrchestratorEvent, Subscription,
};
