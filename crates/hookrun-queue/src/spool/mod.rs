//! Directory-backed queue backend.
//!
//! Layout: `<root>/<topic>/<micros>-<seq>-<id>.json`, one task per file. File names sort in
//! publication order, so the lexicographically smallest `*.json` is the head of the queue.
//! `<micros>` is the wall-clock time at which the file becomes visible to consumers.
//!
//! - claim: rename `<name>.json` to `<name>.claimed`
//! - acknowledge: delete the claimed file
//! - requeue: write the task (with `attempts + 1`) under a name stamped `now + redelivery
//!   delay`, delete the claim
//!
//! Claims left behind by a crash are restored on [`SpoolQueue::open`], so a task is never
//! lost between claim and settle (at-least-once).
//! Producers in any language can enqueue by atomically renaming a `*.json` file into a
//! topic directory.

use std::{
    path::{Path, PathBuf},
    sync::atomic::{AtomicBool, AtomicU64, Ordering},
    time::{Duration, SystemTime, UNIX_EPOCH},
};

use async_trait::async_trait;
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, trace, warn};

use hookrun_model::Task;

use crate::{
    backend::{BackendKind, QueueBackend, TaskHandler},
    delivery::{self, Delivery},
    error::QueueError,
};

const TASK_EXT: &str = "json";
const CLAIMED_EXT: &str = "claimed";
const INVALID_EXT: &str = "invalid";

/// Spool directory connection.
pub struct SpoolQueue {
    root: PathBuf,
    topics: Vec<String>,
    poll_interval: Duration,
    redelivery_delay: Duration,
    seq: AtomicU64,
    closed: AtomicBool,
}

impl SpoolQueue {
    /// Open the spool rooted at `root`, creating topic directories as needed and restoring
    /// stale claims.
    pub async fn open(root: impl AsRef<Path>, topics: &[String]) -> Result<Self, QueueError> {
        let root = root.as_ref().to_path_buf();
        for topic in topics {
            let dir = root.join(topic);
            fs::create_dir_all(&dir).await?;
            let restored = restore_claims(&dir).await?;
            if restored > 0 {
                info!(target: "hookrun.queue.spool", topic, restored, "restored unsettled claims");
            }
        }

        Ok(Self {
            root,
            topics: topics.to_vec(),
            poll_interval: Duration::from_millis(500),
            redelivery_delay: Duration::ZERO,
            seq: AtomicU64::new(0),
            closed: AtomicBool::new(false),
        })
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    /// Keep requeued tasks out of reach of consumers for `delay`.
    pub fn with_redelivery_delay(mut self, delay: Duration) -> Self {
        self.redelivery_delay = delay;
        self
    }

    /// Directory holding the tasks of `topic`.
    pub fn topic_dir(&self, topic: &str) -> Result<PathBuf, QueueError> {
        if !self.topics.iter().any(|t| t == topic) {
            return Err(QueueError::UnknownTopic(topic.to_string()));
        }
        Ok(self.root.join(topic))
    }

    fn ensure_open(&self) -> Result<(), QueueError> {
        if self.closed.load(Ordering::Acquire) {
            return Err(QueueError::Disconnected);
        }
        Ok(())
    }

    /// Sortable file stem: visibility time in wall-clock micros, a per-connection sequence,
    /// and the task id.
    fn next_stem(&self, id: &str, delay: Duration) -> String {
        let micros = now_micros().saturating_add(delay.as_micros());
        let seq = self.seq.fetch_add(1, Ordering::Relaxed);
        let id: String = id
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        format!("{micros:020}-{seq:08}-{id}")
    }

    async fn write_task(
        &self,
        dir: &Path,
        task: &Task,
        delay: Duration,
    ) -> Result<PathBuf, QueueError> {
        let id = task.id.as_deref().unwrap_or("task");
        let stem = self.next_stem(id, delay);
        let tmp = dir.join(format!(".{stem}.tmp"));
        let dst = dir.join(format!("{stem}.{TASK_EXT}"));

        let bytes = serde_json::to_vec(task)?;
        fs::write(&tmp, bytes).await?;
        fs::rename(&tmp, &dst).await?;
        Ok(dst)
    }

    /// Try to claim the oldest visible task in `dir`.
    async fn claim_head(&self, dir: &Path) -> Result<Option<(Task, PathBuf)>, QueueError> {
        let now = now_micros();
        for path in list_tasks(dir).await? {
            if file_micros(&path).is_some_and(|at| at > now) {
                continue;
            }
            let claimed = path.with_extension(CLAIMED_EXT);
            match fs::rename(&path, &claimed).await {
                Ok(()) => {}
                // Claimed by another consumer in the meantime.
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => continue,
                Err(e) => return Err(e.into()),
            }

            let bytes = fs::read(&claimed).await?;
            match serde_json::from_slice::<Task>(&bytes) {
                Ok(mut task) => {
                    if task.id.is_none() {
                        task.id = file_id(&claimed);
                    }
                    return Ok(Some((task, claimed)));
                }
                Err(e) => {
                    let aside = claimed.with_extension(INVALID_EXT);
                    warn!(
                        target: "hookrun.queue.spool",
                        file = %claimed.display(),
                        error = %e,
                        "unparseable task moved aside"
                    );
                    fs::rename(&claimed, &aside).await?;
                }
            }
        }
        Ok(None)
    }
}

#[async_trait]
impl Delivery for SpoolQueue {
    type Claim = PathBuf;

    async fn next(
        &self,
        cancel: &CancellationToken,
        topic: &str,
    ) -> Result<Option<(Task, PathBuf)>, QueueError> {
        let dir = self.topic_dir(topic)?;
        loop {
            if cancel.is_cancelled() {
                return Ok(None);
            }
            self.ensure_open()?;

            if let Some((task, claimed)) = self.claim_head(&dir).await? {
                trace!(target: "hookrun.queue.spool", topic, file = %claimed.display(), "claimed");
                return Ok(Some((task, claimed)));
            }

            tokio::select! {
                _ = cancel.cancelled() => return Ok(None),
                _ = tokio::time::sleep(self.poll_interval) => {}
            }
        }
    }

    async fn settle(
        &self,
        topic: &str,
        mut task: Task,
        claim: PathBuf,
        requeue: bool,
    ) -> Result<(), QueueError> {
        if requeue {
            task.attempts += 1;
            let dir = self.topic_dir(topic)?;
            let path = self.write_task(&dir, &task, self.redelivery_delay).await?;
            debug!(
                target: "hookrun.queue.spool",
                topic,
                file = %path.display(),
                delay_ms = self.redelivery_delay.as_millis() as u64,
                "task requeued"
            );
        }
        fs::remove_file(&claim).await?;
        Ok(())
    }
}

#[async_trait]
impl QueueBackend for SpoolQueue {
    fn kind(&self) -> BackendKind {
        BackendKind::Spool
    }

    async fn publish(&self, topic: &str, mut task: Task) -> Result<(), QueueError> {
        self.ensure_open()?;
        let dir = self.topic_dir(topic)?;
        if task.id.is_none() {
            task.id = Some(uuid::Uuid::new_v4().to_string());
        }
        let path = self.write_task(&dir, &task, Duration::ZERO).await?;
        trace!(target: "hookrun.queue.spool", topic, file = %path.display(), "published");
        Ok(())
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
        if !self.closed.swap(true, Ordering::AcqRel) {
            debug!(target: "hookrun.queue.spool", root = %self.root.display(), "disconnected");
        }
    }
}

/// `*.json` files in `dir`, oldest first.
async fn list_tasks(dir: &Path) -> Result<Vec<PathBuf>, QueueError> {
    let mut entries = fs::read_dir(dir).await?;
    let mut out = Vec::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if has_ext(&path, TASK_EXT) {
            out.push(path);
        }
    }
    out.sort();
    Ok(out)
}

async fn restore_claims(dir: &Path) -> Result<usize, QueueError> {
    let mut entries = fs::read_dir(dir).await?;
    let mut restored = 0;
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if has_ext(&path, CLAIMED_EXT) {
            fs::rename(&path, path.with_extension(TASK_EXT)).await?;
            restored += 1;
        }
    }
    Ok(restored)
}

fn has_ext(path: &Path, ext: &str) -> bool {
    path.extension().and_then(|e| e.to_str()) == Some(ext)
}

fn now_micros() -> u128 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_micros())
        .unwrap_or_default()
}

/// Visibility time embedded in a spool file name; `None` for names written by hand.
fn file_micros(path: &Path) -> Option<u128> {
    let stem = path.file_stem()?.to_str()?;
    stem.split('-').next()?.parse().ok()
}

/// Task id embedded in a spool file name (`<micros>-<seq>-<id>.<ext>`).
fn file_id(path: &Path) -> Option<String> {
    let stem = path.file_stem()?.to_str()?;
    stem.splitn(3, '-').nth(2).map(str::to_string)
}
