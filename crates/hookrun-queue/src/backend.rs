use std::{fmt, path::PathBuf, str::FromStr, sync::Arc, time::Duration};

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::info;

use hookrun_model::{Task, Verdict};

use crate::{error::QueueError, memory::MemoryQueue, spool::SpoolQueue};

/// Consumer side of the queue contract.
///
/// Invoked once per delivered task. The returned [`Verdict`] decides whether the backend
/// redelivers the task (`requeue = true`) or acknowledges it.
#[async_trait]
pub trait TaskHandler: Send + Sync + 'static {
    async fn handle(&self, task: &Task) -> Verdict;
}

/// Connection to a queue backend.
#[async_trait]
pub trait QueueBackend: Send + Sync + 'static {
    /// Which backend this connection talks to.
    fn kind(&self) -> BackendKind;

    /// Enqueue a task on `topic`.
    async fn publish(&self, topic: &str, task: Task) -> Result<(), QueueError>;

    /// Hand deliveries from `topic` to `handler`, one at a time, until `cancel` fires.
    ///
    /// Returns `Ok(())` on cancellation.
    async fn subscribe(
        &self,
        cancel: &CancellationToken,
        topic: &str,
        handler: &dyn TaskHandler,
    ) -> Result<(), QueueError>;

    /// Wait for a single delivery from `topic` and hand it to `handler`.
    ///
    /// Returns `Ok(())` if `cancel` fires before a task arrives, and
    /// [`QueueError::Handler`] when the handler's verdict carries an error.
    async fn pop(
        &self,
        cancel: &CancellationToken,
        topic: &str,
        handler: &dyn TaskHandler,
    ) -> Result<(), QueueError>;

    /// Release the connection. Idempotent.
    async fn disconnect(&self);
}

/// Backend selector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BackendKind {
    /// In-process FIFO; tasks live as long as the process.
    Memory,
    /// Directory of JSON files, one per task.
    Spool,
}

impl BackendKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            BackendKind::Memory => "memory",
            BackendKind::Spool => "spool",
        }
    }
}

impl fmt::Display for BackendKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BackendKind {
    type Err = QueueError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(BackendKind::Memory),
            "spool" => Ok(BackendKind::Spool),
            _ => Err(QueueError::UnknownBackend(s.to_string())),
        }
    }
}

/// Backend-specific connection settings.
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Root directory of the spool backend; one subdirectory per topic.
    pub spool_dir: PathBuf,
    /// How often the spool backend rescans an empty topic directory.
    pub poll_interval: Duration,
    /// Delay before a requeued task becomes visible again.
    pub redelivery_delay: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            spool_dir: PathBuf::from("/var/spool/hookrun"),
            poll_interval: Duration::from_millis(500),
            redelivery_delay: Duration::from_secs(1),
        }
    }
}

/// Open a connection to the selected backend, declaring the topics it will serve.
pub async fn connect(
    kind: BackendKind,
    topics: &[String],
    opts: &ConnectOptions,
) -> Result<Arc<dyn QueueBackend>, QueueError> {
    let backend: Arc<dyn QueueBackend> = match kind {
        BackendKind::Memory => Arc::new(
            MemoryQueue::new(topics.iter().cloned()).with_redelivery_delay(opts.redelivery_delay),
        ),
        BackendKind::Spool => Arc::new(
            SpoolQueue::open(&opts.spool_dir, topics)
                .await?
                .with_poll_interval(opts.poll_interval)
                .with_redelivery_delay(opts.redelivery_delay),
        ),
    };
    info!(backend = %kind, topics = ?topics, "queue connected");
    Ok(backend)
}
