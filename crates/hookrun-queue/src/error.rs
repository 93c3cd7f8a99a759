use thiserror::Error;

use hookrun_model::HandleError;

#[derive(Error, Debug)]
pub enum QueueError {
    #[error("unknown queue backend: {0} (expected: memory|spool)")]
    UnknownBackend(String),

    #[error("topic was not declared on connect: {0}")]
    UnknownTopic(String),

    #[error("queue connection is closed")]
    Disconnected,

    #[error("queue io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("failed to encode task: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("task handler failed: {0}")]
    Handler(#[from] HandleError),
}
