//! Build pipeline pieces: dependency population, hooks, command
//! composition, toolchain installation and GOPATH layout.

pub mod command;
pub mod deps;
pub mod gopath;
pub mod hooks;
pub mod toolchain;

pub use command::{compose, GoInstall};
pub use deps::{DependencyFetcher, DependencyStep};
pub use gopath::{GoEnv, Workspace};
pub use hooks::{HookPhase, HookRunner, HookState};
