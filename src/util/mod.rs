//! Shared utilities

pub mod config;
pub mod context;
pub mod fs;
pub mod hash;
pub mod process;
pub mod shell;

pub use config::Config;
pub use context::StagingContext;
pub use process::{Executor, ProcessBuilder, ProcessError, SystemExecutor};
pub use shell::Shell;
