//! Session lifecycle management for avlink.
//!
//! A session is a long-lived, reconnectable logical channel to an external
//! real-time service. [`SessionManager`] owns the set of live sessions and
//! drives each one through `Connecting → Connected → Disconnected`, with
//! automatic backoff-scheduled reconnection on non-intentional transport
//! closes, a status-polling loop, and an absolute lifetime timer per
//! session. The actual network work is delegated to a [`SessionProvider`]
//! capability supplied by the host application.

pub mod errors;
pub mod manager;
pub mod provider;
pub mod session_store;
pub mod types;

pub use errors::{Result, SessionError};
pub use manager::SessionManager;
pub use provider::{
    ConnectionInfo, ConnectionState, ConnectionStatus, SessionProvider, TransportEvent,
    TransportHandle,
};
pub use session_store::{SessionState, SessionStats, SessionStore};
pub use types::{SessionConfig, SessionId, SessionManagerConfig, SessionStatus};
