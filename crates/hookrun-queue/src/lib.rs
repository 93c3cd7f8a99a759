mod error;
pub use error::QueueError;

mod backend;
pub use backend::{BackendKind, ConnectOptions, QueueBackend, TaskHandler, connect};

mod delivery;

pub mod memory;
pub use memory::MemoryQueue;

pub mod spool;
pub use spool::SpoolQueue;
