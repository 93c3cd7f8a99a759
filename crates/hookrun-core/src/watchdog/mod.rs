//! Idle-exit watchdog.
//!
//! Meant for ephemeral hosting where an idle consumer only costs money: when no delivery was
//! handled for a whole window, the process is torn down without a graceful shutdown.

use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{trace, warn};

use crate::state::BusyFlag;

/// Exit status used when the process is terminated for being idle.
pub const IDLE_EXIT_CODE: i32 = 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WatchdogExit {
    /// A full window passed without any delivery being handled or in flight.
    Idle,
    /// The context was cancelled first.
    Cancelled,
}

pub struct IdleWatchdog {
    busy: BusyFlag,
    window: Duration,
}

impl IdleWatchdog {
    pub fn new(busy: BusyFlag, window: Duration) -> Self {
        Self { busy, window }
    }

    /// Sleep one window at a time until the orchestrator is found idle.
    ///
    /// Idle means: not handling a task now, and no task finished since the previous check.
    pub async fn watch(&self, cancel: &CancellationToken) -> WatchdogExit {
        let mut last_handled = self.busy.handled();
        loop {
            tokio::select! {
                _ = cancel.cancelled() => return WatchdogExit::Cancelled,
                _ = tokio::time::sleep(self.window) => {}
            }

            let handled = self.busy.handled();
            if !self.busy.is_busy() && handled == last_handled {
                warn!(
                    window_ms = self.window.as_millis() as u64,
                    handled, "no task handled within idle window"
                );
                return WatchdogExit::Idle;
            }
            trace!(handled, busy = self.busy.is_busy(), "watchdog: still active");
            last_handled = handled;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test(start_paused = true)]
    async fn fires_after_idle_window() {
        let watchdog = IdleWatchdog::new(BusyFlag::new(), Duration::from_secs(30));
        let exit = watchdog.watch(&CancellationToken::new()).await;
        assert_eq!(exit, WatchdogExit::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn does_not_fire_while_busy() {
        let busy = BusyFlag::new();
        let watchdog = IdleWatchdog::new(busy.clone(), Duration::from_secs(10));
        let cancel = CancellationToken::new();

        let guard = busy.enter();
        let handle = {
            let cancel = cancel.clone();
            tokio::spawn(async move { watchdog.watch(&cancel).await })
        };

        // Three full windows with a task in flight.
        tokio::time::sleep(Duration::from_secs(35)).await;
        assert!(!handle.is_finished());

        // The task finishes: one more window counts the completion, the next one is idle.
        drop(guard);
        let exit = handle.await.unwrap();
        assert_eq!(exit, WatchdogExit::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn completed_task_resets_the_window() {
        let busy = BusyFlag::new();
        let watchdog = IdleWatchdog::new(busy.clone(), Duration::from_secs(10));
        let cancel = CancellationToken::new();

        let handle = {
            let cancel = cancel.clone();
            tokio::spawn(async move { watchdog.watch(&cancel).await })
        };

        // A short task between two checks.
        tokio::time::sleep(Duration::from_secs(5)).await;
        drop(busy.enter());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert!(!handle.is_finished());

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(handle.await.unwrap(), WatchdogExit::Idle);
    }

    #[tokio::test(start_paused = true)]
    async fn cancellation_stops_watching() {
        let watchdog = IdleWatchdog::new(BusyFlag::new(), Duration::from_secs(60));
        let cancel = CancellationToken::new();
        cancel.cancel();
        assert_eq!(watchdog.watch(&cancel).await, WatchdogExit::Cancelled);
    }
}
