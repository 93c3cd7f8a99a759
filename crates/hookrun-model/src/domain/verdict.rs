use crate::HandleError;

/// Decision returned to the queue backend for one delivery.
///
/// `requeue = true` asks the backend to deliver the task again;
/// `requeue = false` acknowledges it and removes it from the queue.
#[derive(Debug)]
pub struct Verdict {
    pub requeue: bool,
    pub error: Option<HandleError>,
}

impl Verdict {
    /// Task handled successfully; acknowledge it.
    pub fn done() -> Self {
        Self {
            requeue: false,
            error: None,
        }
    }

    /// Task handling failed; acknowledge it without redelivery.
    pub fn drop_with(error: HandleError) -> Self {
        Self {
            requeue: false,
            error: Some(error),
        }
    }

    /// Task handling failed; hand it back for redelivery.
    pub fn requeue_with(error: HandleError) -> Self {
        Self {
            requeue: true,
            error: Some(error),
        }
    }

    /// Task handling failed; redeliver only if `retry` is set.
    pub fn failed(error: HandleError, retry: bool) -> Self {
        Self {
            requeue: retry,
            error: Some(error),
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}
