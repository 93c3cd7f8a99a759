use thiserror::Error;

use hookrun_queue::QueueError;

#[derive(Debug, Error)]
pub enum CoreError {
    #[error("queue error: {0}")]
    Queue(#[from] QueueError),
}
