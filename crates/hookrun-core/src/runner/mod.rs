use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Error)]
pub enum RunnerError {
    #[error("invalid command line: {0}")]
    InvalidCommand(String),
    #[error("execution failed: {0}")]
    Failed(String),
    #[error("cancelled")]
    Cancelled,
}

/// Executes a task's command line.
///
/// Implementations must bind the lifetime of whatever they start to `cancel`:
/// once the token fires the work is stopped and [`RunnerError::Cancelled`] is returned.
#[async_trait]
pub trait Runner: Send + Sync + 'static {
    /// Short name used in logs.
    fn name(&self) -> &'static str;

    /// Run `command_line` to completion.
    ///
    /// `Ok(())` only if the command started and exited successfully.
    async fn run(&self, cancel: &CancellationToken, command_line: &str) -> Result<(), RunnerError>;
}
