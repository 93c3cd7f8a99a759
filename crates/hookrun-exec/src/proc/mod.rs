use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace};

use hookrun_core::{Runner, RunnerError};

use crate::{
    error::{ExecError, ExecResult},
    util::{cmd_program, kill_graceful, split_command_line},
};

/// Runs a task's command line as a child process.
///
/// The child inherits stdout and stderr, so its output shows up interleaved with ours.
/// It is killed when the cancellation token fires or the future is dropped.
#[derive(Debug, Clone)]
pub struct ProcRunner {
    name: &'static str,
}

impl Default for ProcRunner {
    fn default() -> Self {
        Self::new()
    }
}

impl ProcRunner {
    pub fn new() -> Self {
        Self { name: "proc" }
    }

    pub fn with_name(mut self, name: &'static str) -> Self {
        self.name = name;
        self
    }

    /// Spawn `command_line` and wait for it, killing it on cancellation.
    pub async fn exec(&self, cancel: &CancellationToken, command_line: &str) -> ExecResult<()> {
        let (program, args) = split_command_line(command_line)?;
        trace!(target: "hookrun.exec.proc", %program, ?args, "spawn");

        let mut child = cmd_program(program, &args)
            .spawn()
            .map_err(|e| ExecError::Spawn(format!("{program}: {e}")))?;

        tokio::select! {
            status = child.wait() => {
                let status = status?;
                if status.success() {
                    debug!(target: "hookrun.exec.proc", %program, "exit success");
                    return Ok(());
                }
                match status.code() {
                    Some(code) => Err(ExecError::NonZeroExit { code }),
                    None => Err(ExecError::KilledBySignal),
                }
            }
            _ = cancel.cancelled() => {
                debug!(target: "hookrun.exec.proc", %program, "cancelled; killing child");
                let _ = kill_graceful(&mut child).await;
                Err(ExecError::Cancelled)
            }
        }
    }
}

#[async_trait]
impl Runner for ProcRunner {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn run(&self, cancel: &CancellationToken, command_line: &str) -> Result<(), RunnerError> {
        self.exec(cancel, command_line).await.map_err(RunnerError::from)
    }
}
