//! System integration verification.
//!
//! Verifies that the facade wires both managers onto one bus and that a
//! full session + task flow runs end to end against mock providers.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use avlink::prelude::*;
use tokio::sync::watch;
use tokio::time::sleep;

struct LoopbackSessionProvider;

#[async_trait]
impl SessionProvider for LoopbackSessionProvider {
    async fn open_connection(
        &self,
        _config: &SessionConfig,
    ) -> Result<avlink::session_core::ConnectionInfo, ProviderError> {
        Ok(avlink::session_core::ConnectionInfo {
            connection_id: "conn-int".to_string(),
            endpoint: "wss://provider.test/live".to_string(),
        })
    }

    async fn close_connection(&self, _connection_id: &str) -> Result<(), ProviderError> {
        Ok(())
    }

    async fn query_connection_status(
        &self,
        _connection_id: &str,
    ) -> Result<avlink::session_core::ConnectionStatus, ProviderError> {
        Ok(avlink::session_core::ConnectionStatus {
            state: avlink::session_core::ConnectionState::Active,
            activity_level: 0.0,
            last_activity_at: None,
        })
    }

    async fn open_transport(&self, _endpoint: &str) -> Result<TransportHandle, ProviderError> {
        let (tx, handle) = TransportHandle::channel();
        let _ = tx.send(TransportEvent::Opened);
        Ok(handle)
    }
}

struct LoopbackMediaProvider;

#[async_trait]
impl MediaProvider for LoopbackMediaProvider {
    async fn detect(&self, _resource_ref: &str) -> Result<Vec<DetectedEntity>, ProviderError> {
        Ok(vec![DetectedEntity {
            id: "character-1".to_string(),
            time_range: Some(TimeRange {
                start: 0.0,
                end: 4.2,
            }),
            bounding_region: None,
            confidence: 0.9,
        }])
    }

    async fn execute(
        &self,
        _resource_ref: &str,
        _parameters: &TaskParameters,
        _progress: Option<watch::Sender<u8>>,
    ) -> Result<String, ProviderError> {
        sleep(Duration::from_millis(30)).await;
        Ok("media/out.mp4".to_string())
    }
}

fn orchestrator() -> Orchestrator {
    let config = OrchestratorConfig {
        task: TaskOrchestratorConfig {
            progress_interval: Duration::from_millis(10),
            ..TaskOrchestratorConfig::default()
        },
        ..OrchestratorConfig::default()
    };
    Orchestrator::new(
        Arc::new(LoopbackSessionProvider),
        Arc::new(LoopbackMediaProvider),
        config,
    )
}

#[tokio::test]
async fn full_system_flow() {
    let orchestrator = orchestrator();
    let seen = Arc::new(Mutex::new(Vec::new()));
    for kind in [
        EventKind::SessionCreated,
        EventKind::SessionConnected,
        EventKind::SessionDisconnected,
        EventKind::TaskProgress,
        EventKind::TaskSucceeded,
    ] {
        let seen = Arc::clone(&seen);
        orchestrator.subscribe(kind, move |event| {
            seen.lock().unwrap().push(event.kind());
        });
    }

    // Session flow
    let session = orchestrator
        .create_session(SessionConfig::default())
        .await
        .unwrap();
    orchestrator.connect_session(&session.session_id).await.unwrap();
    sleep(Duration::from_millis(50)).await;
    assert_eq!(
        orchestrator
            .get_session_status(&session.session_id)
            .unwrap()
            .status,
        SessionStatus::Connected
    );
    assert_eq!(orchestrator.list_sessions().len(), 1);

    // Task flow
    let task = orchestrator.initialize_task("media/video-1.mp4").unwrap();
    let task_id = TaskId::from(task.task_id);
    let entities = orchestrator.detect_entities(&task_id).await.unwrap();
    assert_eq!(entities.len(), 1);

    let mut params = TaskParameters::new("swap");
    params.entity_id = Some(entities[0].id.clone());
    orchestrator.start_task_async(&task_id, params).unwrap();
    sleep(Duration::from_millis(200)).await;

    let outcome = orchestrator.get_task_status(&task_id).unwrap();
    assert_eq!(outcome.status, TaskStatus::Succeeded);
    assert_eq!(outcome.progress, 100);

    // Both managers published onto the one shared bus.
    {
        let seen = seen.lock().unwrap();
        assert!(seen.contains(&EventKind::SessionCreated));
        assert!(seen.contains(&EventKind::SessionConnected));
        assert!(seen.contains(&EventKind::TaskSucceeded));
    }

    // Shutdown tears everything down.
    orchestrator.shutdown().await;
    assert!(orchestrator.list_sessions().is_empty());
    assert!(orchestrator.get_task_status(&task_id).is_none());
    assert!(seen
        .lock()
        .unwrap()
        .contains(&EventKind::SessionDisconnected));
}

#[tokio::test]
async fn sync_task_flow_through_facade() {
    let orchestrator = orchestrator();

    let task = orchestrator.initialize_task("media/video-2.mp4").unwrap();
    let task_id = TaskId::from(task.task_id);

    let outcome = orchestrator
        .start_task(&task_id, TaskParameters::new("dub"))
        .await
        .unwrap();
    assert_eq!(outcome.status, TaskStatus::Succeeded);
    assert_eq!(outcome.result_ref.as_deref(), Some("media/out.mp4"));

    orchestrator.cleanup_task(&task_id);
    assert!(orchestrator.get_task_status(&task_id).is_none());
}

#[tokio::test]
async fn failures_are_isolated_per_entity() {
    let orchestrator = orchestrator();

    let task_a = orchestrator.initialize_task("media/a.mp4").unwrap();
    let task_b = orchestrator.initialize_task("media/b.mp4").unwrap();
    let id_a = TaskId::from(task_a.task_id);
    let id_b = TaskId::from(task_b.task_id);

    orchestrator
        .start_task_async(&id_a, TaskParameters::new("swap"))
        .unwrap();
    assert!(orchestrator.cancel_task(&id_a));

    // Cancelling A leaves B fully operational.
    let outcome = orchestrator
        .start_task(&id_b, TaskParameters::new("swap"))
        .await
        .unwrap();
    assert_eq!(outcome.status, TaskStatus::Succeeded);

    let failed = orchestrator.get_task_status(&id_a).unwrap();
    assert_eq!(failed.status, TaskStatus::Failed);
    assert_eq!(failed.error, Some(TaskFailure::Cancelled));
}
