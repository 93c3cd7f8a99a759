use thiserror::Error;

/// Why the handling of a task did not complete successfully.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum HandleError {
    /// The start webhook answered `400 Bad Request`: the receiver vetoed execution.
    #[error("start webhook requested abort")]
    AbortSignaled,
    /// A webhook was unreachable, timed out, or answered with an unexpected status.
    #[error("webhook notification failed: {0}")]
    NotifyTransportFailed(String),
    /// The command was missing, could not be spawned, exited non-zero, or was cancelled.
    #[error("process failed: {0}")]
    ProcessFailed(String),
    /// A lifecycle event name outside `start`, `success`, `fail`.
    #[error("unknown lifecycle event: {0}")]
    UnknownLifecycleEvent(String),
}
