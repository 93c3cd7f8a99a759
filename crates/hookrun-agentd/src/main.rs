use clap::Parser;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use hookrun_agentd::{AgentConfig, USAGE_EXIT_CODE, exit_code, run};
use hookrun_core::BridgeExit;
use hookrun_observe::logger_init;

#[tokio::main]
async fn main() {
    let cfg = AgentConfig::parse();
    if let Err(e) = cfg.validate() {
        eprintln!("hookrun: {e}");
        std::process::exit(USAGE_EXIT_CODE);
    }
    if let Err(e) = logger_init(&cfg.logger_config()) {
        eprintln!("hookrun: {e}");
        std::process::exit(USAGE_EXIT_CODE);
    }
    info!(version = env!("CARGO_PKG_VERSION"), "hookrun starting");

    let res = run(&cfg, &CancellationToken::new()).await;
    match &res {
        Ok(BridgeExit::Stopped) => info!("shutdown complete"),
        Ok(BridgeExit::Idle) => warn!(max_idle = ?cfg.max_idle, "idle for too long; exiting"),
        Err(e) => error!(error = ?e, "fatal"),
    }
    std::process::exit(exit_code(&res));
}
