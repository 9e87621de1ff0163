//! End-to-end demo against in-process mock providers: opens a live
//! session, runs a transformation task, and prints the events as they
//! arrive.
//!
//! Run with: `cargo run --example live_demo`

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use avlink::prelude::*;
use avlink::session_core::{ConnectionInfo, ConnectionState, ConnectionStatus};
use tokio::sync::watch;
use tokio::time::sleep;

struct DemoSessionProvider;

#[async_trait]
impl SessionProvider for DemoSessionProvider {
    async fn open_connection(
        &self,
        _config: &SessionConfig,
    ) -> Result<ConnectionInfo, ProviderError> {
        Ok(ConnectionInfo {
            connection_id: "conn-demo".to_string(),
            endpoint: "wss://demo.local/live".to_string(),
        })
    }

    async fn close_connection(&self, _connection_id: &str) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn query_connection_status(
        &self,
        _connection_id: &str,
    ) -> Result<ConnectionStatus, ProviderError> {
        Ok(ConnectionStatus {
            state: ConnectionState::Active,
            activity_level: 0.8,
            last_activity_at: None,
        })
    }

    async fn open_transport(&self, _endpoint: &str) -> Result<TransportHandle, ProviderError> {
        let (tx, handle) = TransportHandle::channel();
        let _ = tx.send(TransportEvent::Opened);
        Ok(handle)
    }
}

struct DemoMediaProvider;

#[async_trait]
impl MediaProvider for DemoMediaProvider {
    async fn detect(&self, _resource_ref: &str) -> Result<Vec<DetectedEntity>, ProviderError> {
        Ok(vec![DetectedEntity {
            id: "character-1".to_string(),
            time_range: Some(TimeRange {
                start: 0.0,
                end: 30.0,
            }),
            bounding_region: None,
            confidence: 0.95,
        }])
    }

    async fn execute(
        &self,
        _resource_ref: &str,
        _parameters: &TaskParameters,
        progress: Option<watch::Sender<u8>>,
    ) -> Result<String, ProviderError> {
        // Report real progress in three stages.
        for value in [30u8, 60, 90] {
            if let Some(tx) = &progress {
                let _ = tx.send(value);
            }
            sleep(Duration::from_millis(400)).await;
        }
        Ok("media/video-1.swapped.mp4".to_string())
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("avlink_session_core=info".parse()?)
                .add_directive("avlink_task_core=info".parse()?),
        )
        .init();

    let config = OrchestratorConfig {
        task: TaskOrchestratorConfig {
            progress_interval: Duration::from_millis(200),
            ..TaskOrchestratorConfig::default()
        },
        ..OrchestratorConfig::default()
    };
    let orchestrator = Orchestrator::new(
        Arc::new(DemoSessionProvider),
        Arc::new(DemoMediaProvider),
        config,
    );

    // Print every event as it arrives.
    for kind in [
        EventKind::SessionCreated,
        EventKind::SessionConnected,
        EventKind::SessionDisconnected,
        EventKind::TaskProgress,
        EventKind::TaskSucceeded,
        EventKind::TaskFailed,
    ] {
        orchestrator.subscribe(kind, |event| {
            println!("[EVENT] {:?}", event.event);
        });
    }

    println!("[DEMO] Creating live session...");
    let session = orchestrator.create_session(SessionConfig::default()).await?;
    orchestrator.connect_session(&session.session_id).await?;
    sleep(Duration::from_millis(100)).await;

    println!("[DEMO] Running transformation task...");
    let task = orchestrator.initialize_task("media/video-1.mp4")?;
    let task_id = TaskId::from(task.task_id);
    let entities = orchestrator.detect_entities(&task_id).await?;
    println!("[DEMO] Detected {} entities", entities.len());

    let mut params = TaskParameters::new("swap");
    params.entity_id = entities.first().map(|e| e.id.clone());
    orchestrator.start_task_async(&task_id, params)?;

    // Wait for the run to finish.
    sleep(Duration::from_secs(2)).await;
    let outcome = orchestrator.get_task_status(&task_id).unwrap();
    println!(
        "[DEMO] Task finished: {} ({}%) -> {:?}",
        outcome.status, outcome.progress, outcome.result_ref
    );

    orchestrator.shutdown().await;
    println!("[DEMO] Done");
    Ok(())
}
