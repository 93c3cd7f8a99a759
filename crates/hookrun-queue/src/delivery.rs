//! Delivery loop shared by all backends.
//!
//! A backend only knows how to claim the next task of a topic and how to settle a claim
//! (acknowledge or hand back). Dispatching to the handler and the subscribe/pop semantics
//! live here so every backend behaves the same.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::debug;

use hookrun_model::{Task, Verdict};

use crate::{backend::TaskHandler, error::QueueError};

#[async_trait]
pub(crate) trait Delivery: Send + Sync {
    /// Backend handle for a claimed task, needed to settle it.
    type Claim: Send + Sync;

    /// Claim the next task on `topic`, waiting until one is available.
    ///
    /// Returns `None` once `cancel` fires.
    async fn next(
        &self,
        cancel: &CancellationToken,
        topic: &str,
    ) -> Result<Option<(Task, Self::Claim)>, QueueError>;

    /// Acknowledge (`requeue = false`) or hand back (`requeue = true`) a claimed task.
    async fn settle(
        &self,
        topic: &str,
        task: Task,
        claim: Self::Claim,
        requeue: bool,
    ) -> Result<(), QueueError>;
}

/// Claim one task, run the handler and settle the claim with its verdict.
pub(crate) async fn deliver_one<D: Delivery>(
    backend: &D,
    cancel: &CancellationToken,
    topic: &str,
    handler: &dyn TaskHandler,
) -> Result<Option<Verdict>, QueueError> {
    let Some((task, claim)) = backend.next(cancel, topic).await? else {
        return Ok(None);
    };

    let verdict = handler.handle(&task).await;
    let task_id = task.display_id().to_string();
    backend.settle(topic, task, claim, verdict.requeue).await?;

    debug!(target: "hookrun.queue", topic, task = %task_id, requeue = verdict.requeue, "delivery settled");
    Ok(Some(verdict))
}

pub(crate) async fn subscribe<D: Delivery>(
    backend: &D,
    cancel: &CancellationToken,
    topic: &str,
    handler: &dyn TaskHandler,
) -> Result<(), QueueError> {
    debug!(target: "hookrun.queue", topic, "subscribed");
    while deliver_one(backend, cancel, topic, handler).await?.is_some() {}
    debug!(target: "hookrun.queue", topic, "subscription cancelled");
    Ok(())
}

pub(crate) async fn pop<D: Delivery>(
    backend: &D,
    cancel: &CancellationToken,
    topic: &str,
    handler: &dyn TaskHandler,
) -> Result<(), QueueError> {
    match deliver_one(backend, cancel, topic, handler).await? {
        Some(Verdict {
            error: Some(err), ..
        }) => Err(QueueError::Handler(err)),
        _ => Ok(()),
    }
}
