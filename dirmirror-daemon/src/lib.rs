//! Periodic runner: logging setup plus a scheduler that repeats sync passes
//! until ctrl-c.

mod error;
pub mod logging;
mod scheduler;

pub use error::DaemonError;
pub use scheduler::{start_blocking, RunReport, Scheduler};
