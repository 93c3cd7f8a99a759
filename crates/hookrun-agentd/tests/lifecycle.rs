use std::{
    collections::HashMap,
    net::SocketAddr,
    path::PathBuf,
    sync::{Arc, Mutex},
    time::Duration,
};

use axum::{
    Router,
    extract::{Path, State},
    http::StatusCode,
    routing::post,
};
use tokio_util::sync::CancellationToken;

use hookrun_agentd::{AgentConfig, FATAL_EXIT_CODE, exit_code, run};
use hookrun_core::{Bridge, BridgeConfig, BridgeExit, ConsumeMode, CoreError};
use hookrun_exec::ProcRunner;
use hookrun_model::{
    HandleError, TAG_WEBHOOK_FAIL, TAG_WEBHOOK_START, TAG_WEBHOOK_SUCCESS, Task,
};
use hookrun_notify::WebhookNotifier;
use hookrun_queue::{MemoryQueue, QueueBackend, QueueError, SpoolQueue};

/// Hit counter per webhook name.
#[derive(Clone, Default)]
struct Hooks(Arc<Mutex<HashMap<String, usize>>>);

impl Hooks {
    fn hits(&self, name: &str) -> usize {
        self.0.lock().unwrap().get(name).copied().unwrap_or(0)
    }
}

async fn hook(State(hooks): State<Hooks>, Path((name, code)): Path<(String, u16)>) -> StatusCode {
    *hooks.0.lock().unwrap().entry(name).or_default() += 1;
    StatusCode::from_u16(code).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR)
}

/// Webhook server: `POST /{name}/{status}` counts a hit for `name` and answers `status`.
async fn webhook_server() -> (SocketAddr, Hooks) {
    let hooks = Hooks::default();
    let app = Router::new()
        .route("/{name}/{code}", post(hook))
        .with_state(hooks.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (addr, hooks)
}

fn scratch_path() -> PathBuf {
    std::env::temp_dir().join(format!("hookrun-e2e-{}", uuid::Uuid::new_v4()))
}

async fn single_shot(queue: &MemoryQueue, retry: bool) -> Result<BridgeExit, CoreError> {
    let notifier = WebhookNotifier::new(Duration::from_secs(5)).unwrap();
    let config = BridgeConfig::new("jobs")
        .with_mode(ConsumeMode::SingleShot)
        .with_retry(retry);

    Bridge::new(Arc::new(queue.clone()), config, ProcRunner::new(), notifier)
        .run_with_context(CancellationToken::new())
        .await
}

#[tokio::test]
async fn successful_command_notifies_start_and_success() {
    let (addr, hooks) = webhook_server().await;
    let queue = MemoryQueue::new(["jobs"]);
    queue
        .publish(
            "jobs",
            Task::new("echo hi")
                .with_tag(TAG_WEBHOOK_START, format!("http://{addr}/start/200"))
                .with_tag(TAG_WEBHOOK_SUCCESS, format!("http://{addr}/success/200")),
        )
        .await
        .unwrap();

    let exit = single_shot(&queue, true).await.unwrap();

    assert_eq!(exit, BridgeExit::Stopped);
    assert_eq!(hooks.hits("start"), 1);
    assert_eq!(hooks.hits("success"), 1);
    assert!(queue.is_empty("jobs"));
}

#[tokio::test]
async fn failed_command_notifies_fail_and_requeues() {
    let (addr, hooks) = webhook_server().await;
    let queue = MemoryQueue::new(["jobs"]);
    queue
        .publish(
            "jobs",
            Task::new("exit 1").with_tag(TAG_WEBHOOK_FAIL, format!("http://{addr}/fail/200")),
        )
        .await
        .unwrap();

    let err = single_shot(&queue, true).await.unwrap_err();

    assert!(matches!(
        err,
        CoreError::Queue(QueueError::Handler(HandleError::ProcessFailed(_)))
    ));
    assert_eq!(hooks.hits("fail"), 1);
    let pending = queue.pending("jobs");
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].attempts, 1);
}

#[tokio::test]
async fn failed_command_without_retry_is_dropped() {
    let queue = MemoryQueue::new(["jobs"]);
    queue.publish("jobs", Task::new("false")).await.unwrap();

    let err = single_shot(&queue, false).await.unwrap_err();

    assert!(matches!(
        err,
        CoreError::Queue(QueueError::Handler(HandleError::ProcessFailed(_)))
    ));
    assert!(queue.is_empty("jobs"));
}

#[tokio::test]
async fn start_bad_request_aborts_before_running() {
    let (addr, hooks) = webhook_server().await;
    let path = scratch_path();
    let queue = MemoryQueue::new(["jobs"]);
    queue
        .publish(
            "jobs",
            Task::new(format!("touch {}", path.display()))
                .with_tag(TAG_WEBHOOK_START, format!("http://{addr}/start/400"))
                .with_tag(TAG_WEBHOOK_FAIL, format!("http://{addr}/fail/200")),
        )
        .await
        .unwrap();

    let err = single_shot(&queue, true).await.unwrap_err();

    assert!(matches!(
        err,
        CoreError::Queue(QueueError::Handler(HandleError::AbortSignaled))
    ));
    assert!(!path.exists());
    assert_eq!(hooks.hits("start"), 1);
    assert_eq!(hooks.hits("fail"), 0);
    assert!(queue.is_empty("jobs"));
}

#[tokio::test]
async fn start_server_error_requeues_without_running() {
    let (addr, hooks) = webhook_server().await;
    let path = scratch_path();
    let queue = MemoryQueue::new(["jobs"]);
    queue
        .publish(
            "jobs",
            Task::new(format!("touch {}", path.display()))
                .with_tag(TAG_WEBHOOK_START, format!("http://{addr}/start/503")),
        )
        .await
        .unwrap();

    let err = single_shot(&queue, false).await.unwrap_err();

    assert!(matches!(
        err,
        CoreError::Queue(QueueError::Handler(HandleError::NotifyTransportFailed(_)))
    ));
    assert!(!path.exists());
    assert_eq!(hooks.hits("start"), 1);
    assert_eq!(queue.len("jobs"), 1);
}

#[tokio::test]
async fn success_webhook_failure_does_not_requeue() {
    let (addr, hooks) = webhook_server().await;
    let path = scratch_path();
    let queue = MemoryQueue::new(["jobs"]);
    queue
        .publish(
            "jobs",
            Task::new(format!("touch {}", path.display()))
                .with_tag(TAG_WEBHOOK_SUCCESS, format!("http://{addr}/success/500")),
        )
        .await
        .unwrap();

    let exit = single_shot(&queue, true).await.unwrap();

    assert_eq!(exit, BridgeExit::Stopped);
    assert!(path.exists());
    assert_eq!(hooks.hits("success"), 1);
    assert!(queue.is_empty("jobs"));
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn cancel_during_execution_kills_child_and_stops() {
    for retry in [true, false] {
        let (addr, hooks) = webhook_server().await;
        let queue = MemoryQueue::new(["jobs"]);
        queue
            .publish(
                "jobs",
                Task::new("sleep 30")
                    .with_tag(TAG_WEBHOOK_START, format!("http://{addr}/start/200"))
                    .with_tag(TAG_WEBHOOK_FAIL, format!("http://{addr}/fail/200")),
            )
            .await
            .unwrap();

        let notifier = WebhookNotifier::new(Duration::from_secs(5)).unwrap();
        let config = BridgeConfig::new("jobs")
            .with_mode(ConsumeMode::Continuous)
            .with_retry(retry);
        let bridge = Bridge::new(Arc::new(queue.clone()), config, ProcRunner::new(), notifier);

        let ctx = CancellationToken::new();
        let handle = tokio::spawn(bridge.run_with_context(ctx.clone()));

        for _ in 0..200 {
            if hooks.hits("start") == 1 {
                break;
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        assert_eq!(hooks.hits("start"), 1);
        tokio::time::sleep(Duration::from_millis(100)).await;

        let started = std::time::Instant::now();
        ctx.cancel();
        let exit = tokio::time::timeout(Duration::from_secs(5), handle)
            .await
            .expect("bridge did not stop after cancel")
            .unwrap()
            .unwrap();

        assert_eq!(exit, BridgeExit::Stopped);
        assert!(started.elapsed() < Duration::from_secs(5));
        assert_eq!(hooks.hits("fail"), 1);
        assert_eq!(hooks.hits("success"), 0);

        let pending = queue.pending("jobs");
        if retry {
            assert_eq!(pending.len(), 1);
            assert_eq!(pending[0].attempts, 1);
        } else {
            assert!(pending.is_empty());
        }
    }
}

#[tokio::test]
async fn run_consumes_a_spool_topic() {
    let spool = tempfile::tempdir().unwrap();
    let path = scratch_path();
    let topics = vec!["jobs".to_string()];

    let producer = SpoolQueue::open(spool.path(), &topics).await.unwrap();
    producer
        .publish("jobs", Task::new(format!("touch {}", path.display())))
        .await
        .unwrap();

    let cfg = AgentConfig {
        queue: "jobs".into(),
        backend: "spool".parse().unwrap(),
        spool_dir: spool.path().to_path_buf(),
        retry: true,
        single_shot: true,
        die_if_idle: false,
        max_idle: Duration::from_secs(60),
        webhook_timeout: Duration::from_secs(5),
        log_level: "info".into(),
        log_format: "text".parse().unwrap(),
    };
    cfg.validate().unwrap();

    let res = run(&cfg, &CancellationToken::new()).await;

    assert_eq!(exit_code(&res), 0);
    assert!(path.exists());
    let _ = std::fs::remove_file(&path);
}

#[tokio::test]
async fn run_reports_fatal_exit_for_failed_single_shot() {
    let spool = tempfile::tempdir().unwrap();
    let topics = vec!["jobs".to_string()];

    let producer = SpoolQueue::open(spool.path(), &topics).await.unwrap();
    producer.publish("jobs", Task::new("false")).await.unwrap();

    let cfg = AgentConfig {
        queue: "jobs".into(),
        backend: "spool".parse().unwrap(),
        spool_dir: spool.path().to_path_buf(),
        retry: false,
        single_shot: true,
        die_if_idle: false,
        max_idle: Duration::from_secs(60),
        webhook_timeout: Duration::from_secs(5),
        log_level: "info".into(),
        log_format: "text".parse().unwrap(),
    };

    let res = run(&cfg, &CancellationToken::new()).await;

    assert_eq!(exit_code(&res), FATAL_EXIT_CODE);
}
