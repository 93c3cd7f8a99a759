use async_trait::async_trait;

use hookrun_model::{LifecycleEvent, Task};

/// Classified result of a lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NotifyOutcome {
    /// The task has no webhook for this event; nothing was sent.
    Skipped,
    /// The receiver answered with a 2xx status.
    Acknowledged,
    /// The receiver answered `400 Bad Request`.
    BadRequest,
    /// Transport failure or any other status, with a short reason.
    ServerFailed(String),
}

impl NotifyOutcome {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotifyOutcome::Skipped => "skipped",
            NotifyOutcome::Acknowledged => "acknowledged",
            NotifyOutcome::BadRequest => "badRequest",
            NotifyOutcome::ServerFailed(_) => "serverFailed",
        }
    }
}

/// Delivers lifecycle notifications for a task.
///
/// The classification does not depend on `event`; only the caller's reaction does.
#[async_trait]
pub trait Notifier: Send + Sync + 'static {
    async fn notify(&self, event: LifecycleEvent, task: &Task) -> NotifyOutcome;
}
