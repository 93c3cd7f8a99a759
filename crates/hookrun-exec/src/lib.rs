mod error;
pub use error::{ExecError, ExecResult};

mod util;
pub use util::split_command_line;

pub mod proc;
pub use proc::ProcRunner;

pub mod prelude {
    pub use crate::ProcRunner;
    pub use crate::error::{ExecError, ExecResult};
}
