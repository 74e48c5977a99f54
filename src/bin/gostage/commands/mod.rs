//! Command implementations

pub mod detect;
pub mod plan;
pub mod resolve;
pub mod stage;

use std::path::Path;

use gostage::util::context::{default_cache_dir, StagingContext};
use gostage::util::shell::{Shell, ShellMode, Verbosity};

use crate::cli::{BuildpackArgs, MessageFormat};

pub fn shell(format: MessageFormat, debug: bool) -> Shell {
    let mode = match format {
        MessageFormat::Human => ShellMode::Human,
        MessageFormat::Json => ShellMode::Json,
    };
    let verbosity = if debug {
        Verbosity::Debug
    } else {
        Verbosity::Normal
    };
    Shell::stdout(mode, verbosity)
}

/// Build the staging context for an app from the directory flags.
pub fn staging_context(app: &Path, dirs: BuildpackArgs) -> StagingContext {
    let cache_dir = dirs.cache_dir.unwrap_or_else(default_cache_dir);
    let deps_dir = dirs.deps_dir.unwrap_or_else(|| cache_dir.join("deps"));
    StagingContext::new(app, cache_dir, deps_dir, dirs.buildpack_dir).with_process_env()
}
