//! Provider capability consumed by the task orchestrator.
//!
//! The host application binds this trait to a concrete media backend. The
//! orchestrator only reacts to its effects: detection results, execution
//! outcomes, and optionally reported progress.

use async_trait::async_trait;
use avlink_infra_common::ProviderError;
use tokio::sync::watch;

use crate::types::{DetectedEntity, TaskParameters};

/// External capability performing the actual detection and execution work.
///
/// All methods may fail with a generic [`ProviderError`]; no richer
/// contract is assumed.
#[async_trait]
pub trait MediaProvider: Send + Sync {
    /// Find entities in the referenced resource.
    async fn detect(&self, resource_ref: &str) -> Result<Vec<DetectedEntity>, ProviderError>;

    /// Run the transformation; may be long-running. Returns a reference to
    /// the produced result.
    ///
    /// Providers that report real progress send 0–100 values into
    /// `progress`; the orchestrator treats reported values as authoritative
    /// and simulates increments only when none arrive. Providers without
    /// progress reporting ignore the channel entirely.
    async fn execute(
        &self,
        resource_ref: &str,
        parameters: &TaskParameters,
        progress: Option<watch::Sender<u8>>,
    ) -> Result<String, ProviderError>;
}
