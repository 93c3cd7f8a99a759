//! Delivery loop: wires the queue, the orchestrator, the idle watchdog and the shutdown
//! coordinator together for one topic.

use std::{sync::Arc, time::Duration};

use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use hookrun_queue::QueueBackend;

use crate::{
    error::CoreError,
    notifier::Notifier,
    orchestrator::Orchestrator,
    runner::Runner,
    shutdown,
    watchdog::{IdleWatchdog, WatchdogExit},
};

/// How deliveries are consumed. Fixed for the lifetime of a bridge.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsumeMode {
    /// Subscribe and handle deliveries until shutdown.
    Continuous,
    /// Handle exactly one delivery, then stop.
    SingleShot,
}

#[derive(Debug, Clone)]
pub struct BridgeConfig {
    pub topic: String,
    pub mode: ConsumeMode,
    /// Requeue tasks whose command failed.
    pub retry: bool,
    /// Idle window of the watchdog; `None` disables it.
    pub idle_window: Option<Duration>,
}

impl BridgeConfig {
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            mode: ConsumeMode::Continuous,
            retry: true,
            idle_window: None,
        }
    }

    pub fn with_mode(mut self, mode: ConsumeMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_retry(mut self, retry: bool) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_idle_window(mut self, window: Option<Duration>) -> Self {
        self.idle_window = window;
        self
    }
}

/// Why the bridge returned.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BridgeExit {
    /// Shutdown was requested, or the single delivery was handled.
    Stopped,
    /// The idle watchdog fired. The caller is expected to exit right away.
    Idle,
}

pub struct Bridge<R, N> {
    queue: Arc<dyn QueueBackend>,
    config: BridgeConfig,
    runner: R,
    notifier: N,
}

impl<R, N> Bridge<R, N>
where
    R: Runner,
    N: Notifier,
{
    pub fn new(queue: Arc<dyn QueueBackend>, config: BridgeConfig, runner: R, notifier: N) -> Self {
        Self {
            queue,
            config,
            runner,
            notifier,
        }
    }

    /// Run until SIGINT/SIGTERM, cancellation of `root`, the end of a single-shot delivery,
    /// or the idle watchdog.
    pub async fn run(self, root: &CancellationToken) -> Result<BridgeExit, CoreError> {
        let ctx = shutdown::with_termination_signals(root);
        self.run_with_context(ctx).await
    }

    /// Same as [`Bridge::run`] with an already derived context.
    ///
    /// `ctx` is cancelled before returning; the queue connection is released by then,
    /// except on [`BridgeExit::Idle`] where nothing is waited for.
    pub async fn run_with_context(self, ctx: CancellationToken) -> Result<BridgeExit, CoreError> {
        let Bridge {
            queue,
            config,
            runner,
            notifier,
        } = self;

        let release = shutdown::release_on_cancel(&ctx, Arc::clone(&queue));
        let orchestrator =
            Orchestrator::new(runner, notifier, ctx.clone()).with_retry(config.retry);

        let idle = CancellationToken::new();
        if let Some(window) = config.idle_window {
            let watchdog = IdleWatchdog::new(orchestrator.busy_flag(), window);
            let ctx = ctx.clone();
            let idle = idle.clone();
            tokio::spawn(async move {
                if watchdog.watch(&ctx).await == WatchdogExit::Idle {
                    idle.cancel();
                }
            });
        }

        info!(
            topic = %config.topic,
            backend = %queue.kind(),
            mode = ?config.mode,
            retry = config.retry,
            "listening on queue"
        );

        let delivery = async {
            match config.mode {
                ConsumeMode::Continuous => queue.subscribe(&ctx, &config.topic, &orchestrator).await,
                ConsumeMode::SingleShot => queue.pop(&ctx, &config.topic, &orchestrator).await,
            }
        };

        let res = tokio::select! {
            res = delivery => res,
            _ = idle.cancelled() => return Ok(BridgeExit::Idle),
        };

        ctx.cancel();
        if let Err(e) = release.await {
            debug!(error = %e, "release listener did not finish");
        }

        res?;
        Ok(BridgeExit::Stopped)
    }
}
