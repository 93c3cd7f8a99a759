//! Task lifecycle state machine.
//!
//! One delivery goes through:
//!
//! ```text
//! Starting ──skipped/acknowledged──▶ Running ──ok──▶ Notifying(success) ──▶ Done (requeue=false)
//!    │                                  └──err──▶ Notifying(fail)    ──▶ Done (requeue=retry)
//!    ├──badRequest──▶ Aborted (requeue=false, AbortSignaled)
//!    └──serverFailed─▶ Aborted (requeue=true,  NotifyTransportFailed)
//! ```
//!
//! The start notification is the only one allowed to influence the verdict: nothing has
//! happened yet when it is sent. Success and fail notifications are sent after the command
//! already ran; their failures are logged and never change the verdict.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};

use hookrun_model::{HandleError, LifecycleEvent, Task, Verdict};
use hookrun_queue::TaskHandler;

use crate::{
    notifier::{Notifier, NotifyOutcome},
    runner::Runner,
    state::BusyFlag,
};

pub struct Orchestrator<R, N> {
    runner: R,
    notifier: N,
    busy: BusyFlag,
    cancel: CancellationToken,
    retry: bool,
}

impl<R, N> Orchestrator<R, N>
where
    R: Runner,
    N: Notifier,
{
    /// Create an orchestrator whose commands are bound to `cancel`.
    ///
    /// Failed commands are requeued unless [`Orchestrator::with_retry`] says otherwise.
    pub fn new(runner: R, notifier: N, cancel: CancellationToken) -> Self {
        Self {
            runner,
            notifier,
            busy: BusyFlag::new(),
            cancel,
            retry: true,
        }
    }

    /// Requeue policy for tasks whose command failed.
    pub fn with_retry(mut self, retry: bool) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_busy_flag(mut self, busy: BusyFlag) -> Self {
        self.busy = busy;
        self
    }

    /// Handle to the busy state, for the idle watchdog.
    pub fn busy_flag(&self) -> BusyFlag {
        self.busy.clone()
    }

    pub fn runner(&self) -> &R {
        &self.runner
    }

    pub fn notifier(&self) -> &N {
        &self.notifier
    }

    /// Drive one delivery through the lifecycle and decide its verdict.
    #[instrument(level = "debug", skip(self, task), fields(task = %task.display_id()))]
    pub async fn handle_task(&self, task: &Task) -> Verdict {
        let _busy = self.busy.enter();
        info!(body = %task.body, attempts = task.attempts, "task received");

        if let Err(verdict) = self.signal_start(task).await {
            return verdict;
        }

        debug!(runner = self.runner.name(), "running command");
        match self.runner.run(&self.cancel, &task.body).await {
            Ok(()) => {
                info!("task completed");
                self.signal_outcome(LifecycleEvent::Success, task).await;
                Verdict::done()
            }
            Err(e) => {
                error!(task = ?task, error = %e, requeue = self.retry, "task failed");
                self.signal_outcome(LifecycleEvent::Fail, task).await;
                Verdict::failed(HandleError::ProcessFailed(e.to_string()), self.retry)
            }
        }
    }

    /// Start notification; `Err` carries the verdict of an aborted delivery.
    async fn signal_start(&self, task: &Task) -> Result<(), Verdict> {
        match self.notifier.notify(LifecycleEvent::Start, task).await {
            NotifyOutcome::Skipped | NotifyOutcome::Acknowledged => Ok(()),
            NotifyOutcome::BadRequest => {
                info!(task = ?task, "abort signal received; task will not run");
                Err(Verdict::drop_with(HandleError::AbortSignaled))
            }
            NotifyOutcome::ServerFailed(reason) => {
                error!(task = ?task, %reason, "start webhook failed; will requeue");
                Err(Verdict::requeue_with(HandleError::NotifyTransportFailed(
                    reason,
                )))
            }
        }
    }

    /// Best-effort success/fail notification. Never affects the verdict.
    async fn signal_outcome(&self, event: LifecycleEvent, task: &Task) {
        match self.notifier.notify(event, task).await {
            NotifyOutcome::Skipped | NotifyOutcome::Acknowledged => {}
            NotifyOutcome::BadRequest => {
                warn!(task = ?task, %event, "webhook rejected notification");
            }
            NotifyOutcome::ServerFailed(reason) => {
                error!(task = ?task, %event, %reason, "error sending webhook");
            }
        }
    }
}

#[async_trait]
impl<R, N> TaskHandler for Orchestrator<R, N>
where
    R: Runner,
    N: Notifier,
{
    async fn handle(&self, task: &Task) -> Verdict {
        self.handle_task(task).await
    }
}
