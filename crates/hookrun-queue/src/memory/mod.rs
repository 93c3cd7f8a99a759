//! In-process queue backend.
//!
//! Tasks live in a per-topic FIFO for the lifetime of the process. Useful for tests and for
//! embedding a producer and the bridge in one binary.

use std::{
    collections::{HashMap, VecDeque},
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, Ordering},
    },
    time::Duration,
};

use async_trait::async_trait;
use tokio::sync::Notify;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use hookrun_model::Task;

use crate::{
    backend::{BackendKind, QueueBackend, TaskHandler},
    delivery::{self, Delivery},
    error::QueueError,
};

/// In-memory queue connection.
///
/// Cloning yields another handle to the same queue. The redelivery delay belongs to the
/// handle that settles a delivery, not to the shared queue.
#[derive(Clone)]
pub struct MemoryQueue {
    inner: Arc<Inner>,
    redelivery_delay: Duration,
}

struct Inner {
    topics: Mutex<HashMap<String, VecDeque<Task>>>,
    available: Notify,
    closed: AtomicBool,
}

impl MemoryQueue {
    /// Create a queue serving the given topics.
    pub fn new<I, S>(topics: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let topics = topics
            .into_iter()
            .map(|t| (t.into(), VecDeque::new()))
            .collect();

        Self {
            inner: Arc::new(Inner {
                topics: Mutex::new(topics),
                available: Notify::new(),
                closed: AtomicBool::new(false),
            }),
            redelivery_delay: Duration::ZERO,
        }
    }

    /// Delay tasks requeued through this handle before they become visible again.
    pub fn with_redelivery_delay(mut self, delay: Duration) -> Self {
        self.redelivery_delay = delay;
        self
    }

    /// Number of tasks waiting on `topic`.
    pub fn len(&self, topic: &str) -> usize {
        let topics = self.inner.topics.lock().unwrap();
        topics.get(topic).map(VecDeque::len).unwrap_or(0)
    }

    pub fn is_empty(&self, topic: &str) -> bool {
        self.len(topic) == 0
    }

    /// Snapshot of the tasks waiting on `topic`, head first.
    pub fn pending(&self, topic: &str) -> Vec<Task> {
        let topics = self.inner.topics.lock().unwrap();
        topics
            .get(topic)
            .map(|q| q.iter().cloned().collect())
            .unwrap_or_default()
    }

    fn push(&self, topic: &str, task: Task) -> Result<(), QueueError> {
        let mut topics = self.inner.topics.lock().unwrap();
        let queue = topics
            .get_mut(topic)
            .ok_or_else(|| QueueError::UnknownTopic(topic.to_string()))?;
        queue.push_back(task);
        drop(topics);

        self.inner.available.notify_waiters();
        Ok(())
    }

    fn take(&self, topic: &str) -> Result<Option<Task>, QueueError> {
        let mut topics = self.inner.topics.lock().unwrap();
        let queue = topics
            .get_mut(topic)
            .ok_or_else(|| QueueError::UnknownTopic(topic.to_string()))?;
        Ok(queue.pop_front())
    }

    fn ensure_open(&self) -> Result<(), QueueError> {
        if self.inner.closed.load(Ordering::Acquire) {
            return Err(QueueError::Disconnected);
        }
        Ok(())
    }
}

#[async_trait]
impl Delivery for MemoryQueue {
    type Claim = ();

    async fn next(
        &self,
        cancel: &CancellationToken,
        topic: &str,
    ) -> Result<Option<(Task, ())>, QueueError> {
        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            self.ensure_open()?;

            let notified = self.inner.available.notified();
            tokio::pin!(notified);
            notified.as_mut().enable();

            if let Some(task) = self.take(topic)? {
                trace!(target: "hookrun.queue.memory", topic, task = %task.display_id(), "claimed");
                return Ok(Some((task, ())));
            }

            tokio::select! {
                _ = cancel.cancelled() => return Ok(None),
                _ = &mut notified => {}
            }
        }
    }

    async fn settle(
        &self,
        topic: &str,
        mut task: Task,
        _claim: (),
        requeue: bool,
    ) -> Result<(), QueueError> {
        if !requeue {
            return Ok(());
        }
        task.attempts += 1;

        let delay = self.redelivery_delay;
        if delay.is_zero() {
            return self.push(topic, task);
        }

        debug!(target: "hookrun.queue.memory", topic, delay_ms = delay.as_millis() as u64, "redelivery scheduled");
        let queue = self.clone();
        let topic = topic.to_string();
        tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = queue.push(&topic, task);
        });
        Ok(())
    }
}

#[async_trait]
impl QueueBackend for MemoryQueue {
    fn kind(&self) -> BackendKind {
        BackendKind::Memory
    }

    async fn publish(&self, topic: &str, mut task: Task) -> Result<(), QueueError> {
        self.ensure_open()?;
        if task.id.is_none() {
            task.id = Some(uuid::Uuid::new_v4().to_string());
        }
        self.push(topic, task)
    }

    async fn subscribe(
        &self,
        cancel: &CancellationToken,
        topic: &str,
        handler: &dyn TaskHandler,
    ) -> Result<(), QueueError> {
        delivery::subscribe(self, cancel, topic, handler).await
    }

    async fn pop(
        &self,
        cancel: &CancellationToken,
        topic: &str,
        handler: &dyn TaskHandler,
    ) -> Result<(), QueueError> {
        delivery::pop(self, cancel, topic, handler).await
    }

    async fn disconnect(&self) {
        if !self.inner.closed.swap(true, Ordering::AcqRel) {
            debug!(target: "hookrun.queue.memory", "disconnected");
            self.inner.available.notify_waiters();
        }
    }
}
