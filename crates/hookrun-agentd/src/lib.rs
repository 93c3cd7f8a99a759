//! Wiring of the `hookrun` binary: queue connection, runner, notifier and the delivery loop.

pub mod config;
pub use config::{AgentConfig, ConfigError};

use std::slice;

use anyhow::Context;
use tokio_util::sync::CancellationToken;
use tracing::info;

use hookrun_core::{Bridge, BridgeExit};
use hookrun_exec::ProcRunner;
use hookrun_notify::WebhookNotifier;
use hookrun_queue::connect;

pub use hookrun_core::IDLE_EXIT_CODE;

/// Exit status for fatal queue errors, including the task error of a single-shot run.
pub const FATAL_EXIT_CODE: i32 = 1;
/// Exit status for invalid configuration; matches clap's usage errors.
pub const USAGE_EXIT_CODE: i32 = 2;

/// Connect to the configured queue and consume it until shutdown.
///
/// Handles SIGINT/SIGTERM itself; `root` allows an embedding caller to stop it too.
pub async fn run(cfg: &AgentConfig, root: &CancellationToken) -> anyhow::Result<BridgeExit> {
    let queue = connect(cfg.backend, slice::from_ref(&cfg.queue), &cfg.connect_options())
        .await
        .with_context(|| format!("connecting to {} backend", cfg.backend))?;

    let notifier = WebhookNotifier::new(cfg.webhook_timeout).context("building webhook client")?;
    let runner = ProcRunner::new();

    let exit = Bridge::new(queue, cfg.bridge_config(), runner, notifier)
        .run(root)
        .await?;
    info!(exit = ?exit, "bridge stopped");
    Ok(exit)
}

/// Process exit status for the outcome of [`run`].
pub fn exit_code(res: &anyhow::Result<BridgeExit>) -> i32 {
    match res {
        Ok(BridgeExit::Stopped) => 0,
        Ok(BridgeExit::Idle) => IDLE_EXIT_CODE,
        Err(_) => FATAL_EXIT_CODE,
    }
}
