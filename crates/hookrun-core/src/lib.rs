pub mod error;
pub use error::CoreError;

pub mod runner;
pub use runner::{Runner, RunnerError};

pub mod notifier;
pub use notifier::{Notifier, NotifyOutcome};

pub mod state;
pub use state::{BusyFlag, BusyGuard};

pub mod orchestrator;
pub use orchestrator::Orchestrator;

pub mod watchdog;
pub use watchdog::{IDLE_EXIT_CODE, IdleWatchdog, WatchdogExit};

pub mod shutdown;

pub mod bridge;
pub use bridge::{Bridge, BridgeConfig, BridgeExit, ConsumeMode};
