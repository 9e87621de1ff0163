//! Task orchestration tests against a scripted mock provider.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use avlink_infra_common::events::{BusEvent, EventBus, EventKind, OrchestratorEvent};
use avlink_infra_common::ProviderError;
use avlink_task_core::{
    BoundingRegion, DetectedEntity, MediaProvider, TaskError, TaskFailure, TaskId,
    TaskOrchestrator, TaskOrchestratorConfig, TaskParameters, TaskStatus, TimeRange,
};
use tokio::sync::watch;
use tokio::time::sleep;

struct MockMediaProvider {
    fail_detect: bool,
    entities: Vec<DetectedEntity>,
    fail_execute: bool,
    execute_delay: Duration,
    /// Progress values played into the watch channel before the delay.
    progress_script: Vec<u8>,
    execute_calls: AtomicUsize,
}

impl MockMediaProvider {
    fn new() -> Self {
        Self {
            fail_detect: false,
            entities: sample_entities(),
            fail_execute: false,
            execute_delay: Duration::from_millis(50),
            progress_script: Vec::new(),
            execute_calls: AtomicUsize::new(0),
        }
    }

    fn execute_calls(&self) -> usize {
        self.execute_calls.load(Ordering::SeqCst)
    }
}

fn sample_entities() -> Vec<DetectedEntity> {
    vec![
        DetectedEntity {
            id: "character-1".to_string(),
            time_range: Some(TimeRange {
                start: 0.0,
                end: 12.5,
            }),
            bounding_region: Some(BoundingRegion {
                x: 0.1,
                y: 0.2,
                width: 0.3,
                height: 0.5,
            }),
            confidence: 0.97,
        },
        DetectedEntity {
            id: "character-2".to_string(),
            time_range: None,
            bounding_region: None,
            confidence: 0.61,
        },
    ]
}

#[async_trait]
impl MediaProvider for MockMediaProvider {
    async fn detect(&self, _resource_ref: &str) -> Result<Vec<DetectedEntity>, ProviderError> {
        if self.fail_detect {
            return Err(ProviderError::new("detector unavailable"));
        }
        Ok(self.entities.clone())
    }

    async fn execute(
        &self,
        _resource_ref: &str,
        _parameters: &TaskParameters,
        progress: Option<watch::Sender<u8>>,
    ) -> Result<String, ProviderError> {
        self.execute_calls.fetch_add(1, Ordering::SeqCst);
        if let Some(tx) = progress {
            for value in &self.progress_script {
                let _ = tx.send(*value);
                sleep(Duration::from_millis(5)).await;
            }
        }
        sleep(self.execute_delay).await;
        if self.fail_execute {
            return Err(ProviderError::new("transform failed"));
        }
        Ok("media/out.mp4".to_string())
    }
}

const TASK_KINDS: [EventKind; 4] = [
    EventKind::TaskProgress,
    EventKind::TaskSucceeded,
    EventKind::TaskFailed,
    EventKind::TaskExpired,
];

fn record_task_events(bus: &EventBus) -> Arc<Mutex<Vec<BusEvent>>> {
    let recorded = Arc::new(Mutex::new(Vec::new()));
    for kind in TASK_KINDS {
        let recorded = Arc::clone(&recorded);
        bus.subscribe(kind, move |event| {
            recorded.lock().unwrap().push(event.clone());
        });
    }
    recorded
}

fn count_kind(events: &[BusEvent], kind: EventKind) -> usize {
    events.iter().filter(|e| e.kind() == kind).count()
}

fn progress_values(events: &[BusEvent]) -> Vec<u8> {
    events
        .iter()
        .filter_map(|e| match &e.event {
            OrchestratorEvent::TaskProgress { progress, .. } => Some(*progress),
            _ => None,
        })
        .collect()
}

fn test_config() -> TaskOrchestratorConfig {
    TaskOrchestratorConfig {
        max_task_duration: Duration::from_secs(60),
        progress_interval: Duration::from_millis(10),
        ..TaskOrchestratorConfig::default()
    }
}

fn orchestrator_with(
    provider: MockMediaProvider,
    config: TaskOrchestratorConfig,
) -> (TaskOrchestrator, Arc<MockMediaProvider>, Arc<EventBus>) {
    let provider = Arc::new(provider);
    let bus = Arc::new(EventBus::new());
    let orchestrator = TaskOrchestrator::new(provider.clone(), bus.clone(), config);
    (orchestrator, provider, bus)
}

#[tokio::test]
async fn initialize_validates_resource_ref() {
    let (orchestrator, _provider, _bus) = orchestrator_with(MockMediaProvider::new(), test_config());

    assert!(matches!(
        orchestrator.initialize_task(""),
        Err(TaskError::InvalidResource(_))
    ));
    assert!(matches!(
        orchestrator.initialize_task("video 1.mp4"),
        Err(TaskError::InvalidResource(_))
    ));
    assert_eq!(orchestrator.task_count(), 0);

    let status = orchestrator.initialize_task("media/video-1.mp4").unwrap();
    assert_eq!(status.status, TaskStatus::Pending);
    assert_eq!(status.progress, 0);
    assert!(status.result_ref.is_none());
    assert!(status.error.is_none());
    assert_eq!(orchestrator.task_count(), 1);
}

#[tokio::test]
async fn detect_entities_stores_ordered_results() {
    let (orchestrator, _provider, _bus) = orchestrator_with(MockMediaProvider::new(), test_config());

    assert!(matches!(
        orchestrator.detect_entities(&TaskId::from("task-missing")).await,
        Err(TaskError::NotFound(_))
    ));

    let status = orchestrator.initialize_task("media/video-1.mp4").unwrap();
    let task_id = TaskId::from(status.task_id.clone());
    let entities = orchestrator.detect_entities(&task_id).await.unwrap();

    assert_eq!(entities.len(), 2);
    assert_eq!(entities[0].id, "character-1");

    let task = orchestrator.get_task(&task_id).unwrap();
    assert_eq!(task.detected_entities, entities);
    assert_eq!(task.status, TaskStatus::Pending);
}

#[tokio::test]
async fn detect_entities_surfaces_provider_failure() {
    let mut provider = MockMediaProvider::new();
    provider.fail_detect = true;
    let (orchestrator, _provider, _bus) = orchestrator_with(provider, test_config());

    let status = orchestrator.initialize_task("media/video-1.mp4").unwrap();
    let task_id = TaskId::from(status.task_id);
    assert!(matches!(
        orchestrator.detect_entities(&task_id).await,
        Err(TaskError::Provider(_))
    ));
}

#[tokio::test]
async fn start_task_runs_to_success() {
    let (orchestrator, provider, bus) = orchestrator_with(MockMediaProvider::new(), test_config());
    let events = record_task_events(&bus);

    let status = orchestrator.initialize_task("media/video-1.mp4").unwrap();
    let task_id = TaskId::from(status.task_id);

    let outcome = orchestrator
        .start_task(&task_id, TaskParameters::new("swap"))
        .await
        .unwrap();

    assert_eq!(outcome.status, TaskStatus::Succeeded);
    assert_eq!(outcome.progress, 100);
    assert_eq!(outcome.result_ref.as_deref(), Some("media/out.mp4"));
    assert!(outcome.error.is_none());
    assert_eq!(provider.execute_calls(), 1);

    let events = events.lock().unwrap();
    assert_eq!(count_kind(&events, EventKind::TaskSucceeded), 1);
    assert_eq!(count_kind(&events, EventKind::TaskFailed), 0);
}

#[tokio::test]
async fn start_task_surfaces_provider_failure_as_terminal_state() {
    let mut provider = MockMediaProvider::new();
    provider.fail_execute = true;
    let (orchestrator, _provider, bus) = orchestrator_with(provider, test_config());
    let events = record_task_events(&bus);

    let status = orchestrator.initialize_task("media/video-1.mp4").unwrap();
    let task_id = TaskId::from(status.task_id);

    let outcome = orchestrator
        .start_task(&task_id, TaskParameters::new("swap"))
        .await
        .unwrap();

    assert_eq!(outcome.status, TaskStatus::Failed);
    assert!(matches!(outcome.error, Some(TaskFailure::Provider(_))));
    assert_ne!(outcome.progress, 100);

    let events = events.lock().unwrap();
    assert_eq!(count_kind(&events, EventKind::TaskFailed), 1);
    assert_eq!(count_kind(&events, EventKind::TaskSucceeded), 0);
}

#[tokio::test]
async fn invalid_time_range_is_rejected_before_provider_call() {
    let (orchestrator, provider, _bus) = orchestrator_with(MockMediaProvider::new(), test_config());

    let status = orchestrator.initialize_task("media/video-1.mp4").unwrap();
    let task_id = TaskId::from(status.task_id);

    let mut params = TaskParameters::new("swap");
    params.time_range = Some(TimeRange { start: 5.0, end: 2.0 });

    assert!(matches!(
        orchestrator.start_task(&task_id, params).await,
        Err(TaskError::InvalidParameters(_))
    ));
    assert_eq!(provider.execute_calls(), 0);

    let current = orchestrator.get_status(&task_id).unwrap();
    assert_eq!(current.status, TaskStatus::Pending);
}

#[tokio::test]
async fn second_start_on_same_task_is_rejected() {
    let mut provider = MockMediaProvider::new();
    provider.execute_delay = Duration::from_millis(200);
    let (orchestrator, _provider, _bus) = orchestrator_with(provider, test_config());

    let status = orchestrator.initialize_task("media/video-1.mp4").unwrap();
    let task_id = TaskId::from(status.task_id);

    orchestrator
        .start_task_async(&task_id, TaskParameters::new("swap"))
        .unwrap();
    assert!(matches!(
        orchestrator.start_task_async(&task_id, TaskParameters::new("swap")),
        Err(TaskError::AlreadyStarted(_))
    ));

    // Terminal states do not re-enter running either.
    sleep(Duration::from_millis(400)).await;
    assert_eq!(
        orchestrator.get_status(&task_id).unwrap().status,
        TaskStatus::Succeeded
    );
    assert!(matches!(
        orchestrator
            .start_task(&task_id, TaskParameters::new("swap"))
            .await,
        Err(TaskError::AlreadyStarted(_))
    ));
}

#[tokio::test]
async fn async_run_succeeds_with_single_terminal_event() {
    let mut provider = MockMediaProvider::new();
    provider.execute_delay = Duration::from_millis(60);
    let (orchestrator, _provider, bus) = orchestrator_with(provider, test_config());
    let events = record_task_events(&bus);

    let status = orchestrator.initialize_task("media/video-1.mp4").unwrap();
    let task_id = TaskId::from(status.task_id);

    let started = orchestrator
        .start_task_async(&task_id, TaskParameters::new("swap"))
        .unwrap();
    assert_eq!(started.status, TaskStatus::Running);
    assert_eq!(started.progress, orchestrator.config().initial_progress);

    sleep(Duration::from_millis(250)).await;

    let outcome = orchestrator.get_status(&task_id).unwrap();
    assert_eq!(outcome.status, TaskStatus::Succeeded);
    assert_eq!(outcome.progress, 100);
    assert_eq!(outcome.result_ref.as_deref(), Some("media/out.mp4"));

    let events = events.lock().unwrap();
    assert_eq!(count_kind(&events, EventKind::TaskSucceeded), 1);
    assert_eq!(count_kind(&events, EventKind::TaskFailed), 0);
    assert!(count_kind(&events, EventKind::TaskProgress) >= 1);

    let progress = progress_values(&events);
    let mut sorted = progress.clone();
    sorted.sort_unstable();
    assert_eq!(progress, sorted, "progress must never decrease");
    assert!(progress.iter().all(|p| *p < 100));
}

#[tokio::test]
async fn provider_reported_progress_is_authoritative() {
    let mut provider = MockMediaProvider::new();
    provider.execute_delay = Duration::from_millis(100);
    provider.progress_script = vec![60];
    let config = TaskOrchestratorConfig {
        simulated_step_min: 1,
        simulated_step_max: 1,
        ..test_config()
    };
    let (orchestrator, _provider, bus) = orchestrator_with(provider, config);
    let events = record_task_events(&bus);

    let status = orchestrator.initialize_task("media/video-1.mp4").unwrap();
    let task_id = TaskId::from(status.task_id);
    orchestrator
        .start_task_async(&task_id, TaskParameters::new("swap"))
        .unwrap();
    sleep(Duration::from_millis(300)).await;

    // Simulated 1-point steps could not have reached 60 before completion;
    // only the provider-reported value can.
    let progress = progress_values(&events.lock().unwrap());
    assert!(progress.contains(&60), "reported value not applied: {progress:?}");
}

#[tokio::test]
async fn cancel_task_semantics() {
    let mut provider = MockMediaProvider::new();
    provider.execute_delay = Duration::from_millis(200);
    let (orchestrator, _provider, bus) = orchestrator_with(provider, test_config());
    let events = record_task_events(&bus);

    // Unknown and pending tasks have no active processing.
    assert!(!orchestrator.cancel_task(&TaskId::from("task-missing")));
    let status = orchestrator.initialize_task("media/video-1.mp4").unwrap();
    let task_id = TaskId::from(status.task_id);
    assert!(!orchestrator.cancel_task(&task_id));

    orchestrator
        .start_task_async(&task_id, TaskParameters::new("swap"))
        .unwrap();
    sleep(Duration::from_millis(40)).await;

    assert!(orchestrator.cancel_task(&task_id));
    // Idempotent: a second cancel finds nothing running.
    assert!(!orchestrator.cancel_task(&task_id));

    let current = orchestrator.get_status(&task_id).unwrap();
    assert_eq!(current.status, TaskStatus::Failed);
    assert_eq!(current.error, Some(TaskFailure::Cancelled));

    // Progress events stop after cancellation.
    let progress_after_cancel = count_kind(&events.lock().unwrap(), EventKind::TaskProgress);
    sleep(Duration::from_millis(80)).await;
    assert_eq!(
        count_kind(&events.lock().unwrap(), EventKind::TaskProgress),
        progress_after_cancel
    );

    // The provider completion arrives later and is discarded.
    sleep(Duration::from_millis(200)).await;
    let current = orchestrator.get_status(&task_id).unwrap();
    assert_eq!(current.status, TaskStatus::Failed);
    assert_eq!(current.error, Some(TaskFailure::Cancelled));
    assert_ne!(current.progress, 100);

    let events = events.lock().unwrap();
    assert_eq!(count_kind(&events, EventKind::TaskFailed), 1);
    assert_eq!(count_kind(&events, EventKind::TaskSucceeded), 0);
}

#[tokio::test]
async fn cleanup_is_idempotent() {
    let (orchestrator, _provider, _bus) = orchestrator_with(MockMediaProvider::new(), test_config());

    let status = orchestrator.initialize_task("media/video-1.mp4").unwrap();
    let task_id = TaskId::from(status.task_id);

    orchestrator.cleanup(&task_id);
    orchestrator.cleanup(&task_id);
    assert!(orchestrator.get_status(&task_id).is_none());
    assert_eq!(orchestrator.task_count(), 0);
}

#[tokio::test]
async fn cleanup_all_removes_every_task() {
    let (orchestrator, _provider, _bus) = orchestrator_with(MockMediaProvider::new(), test_config());

    orchestrator.initialize_task("media/a.mp4").unwrap();
    orchestrator.initialize_task("media/b.mp4").unwrap();
    orchestrator.initialize_task("media/c.mp4").unwrap();
    assert_eq!(orchestrator.task_count(), 3);

    orchestrator.cleanup_all();
    assert_eq!(orchestrator.task_count(), 0);
}

#[tokio::test]
async fn disposal_timer_expires_idle_task() {
    let config = TaskOrchestratorConfig {
        max_task_duration: Duration::from_millis(50),
        ..test_config()
    };
    let (orchestrator, _provider, bus) = orchestrator_with(MockMediaProvider::new(), config);
    let events = record_task_events(&bus);

    let status = orchestrator.initialize_task("media/video-1.mp4").unwrap();
    let task_id = TaskId::from(status.task_id);
    sleep(Duration::from_millis(200)).await;

    assert!(orchestrator.get_status(&task_id).is_none());
    assert_eq!(
        count_kind(&events.lock().unwrap(), EventKind::TaskExpired),
        1
    );
}
