//! Vendor tree population.
//!
//! Decides which dependency manager, if any, runs before the build and runs
//! it. Vendored layouts never start a process and never ask for a tool, so
//! they cannot reach the network.

use std::path::{Path, PathBuf};

use crate::core::error::DependencyFetchError;
use crate::core::strategy::{Detection, Strategy};
use crate::util::process::{Executor, ProcessBuilder};
use crate::util::shell::Shell;

/// Notice printed when glide is skipped for a populated `vendor/`.
pub const GLIDE_SKIP_NOTICE: &str =
    "Note: skipping (glide install) due to non-empty vendor directory.";

/// What the dependency step does for a detected strategy.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyStep {
    /// Nothing to do.
    None,
    /// Nothing to do, but tell the user why.
    Skip { notice: &'static str },
    /// Run a dependency manager.
    Run {
        tool: &'static str,
        args: Vec<&'static str>,
    },
}

/// Map a detection to its dependency step.
pub fn dependency_step(detection: &Detection) -> DependencyStep {
    match detection.strategy {
        Strategy::GlideVendored => DependencyStep::Skip {
            notice: GLIDE_SKIP_NOTICE,
        },
        Strategy::Glide => DependencyStep::Run {
            tool: "glide",
            args: vec!["install"],
        },
        Strategy::Dep if detection.metadata.has_lockfile => DependencyStep::Run {
            tool: "dep",
            args: vec!["ensure", "-vendor-only"],
        },
        Strategy::Dep => DependencyStep::Run {
            tool: "dep",
            args: vec!["ensure"],
        },
        _ => DependencyStep::None,
    }
}

/// Runs the dependency step of a staging run.
pub struct DependencyFetcher<'a> {
    executor: &'a dyn Executor,
    shell: &'a Shell,
}

impl<'a> DependencyFetcher<'a> {
    pub fn new(executor: &'a dyn Executor, shell: &'a Shell) -> Self {
        DependencyFetcher { executor, shell }
    }

    /// Populate `vendor/` for the detected strategy.
    ///
    /// `locate_tool` is only called when a tool must actually run.
    /// `prepare` applies the staging environment to the tool process.
    pub fn populate(
        &self,
        detection: &Detection,
        workdir: &Path,
        locate_tool: impl FnOnce(&str) -> Result<PathBuf, DependencyFetchError>,
        prepare: impl FnOnce(ProcessBuilder) -> ProcessBuilder,
    ) -> Result<(), DependencyFetchError> {
        match dependency_step(detection) {
            DependencyStep::None => {
                tracing::debug!("no dependency step for {}", detection.strategy);
                Ok(())
            }
            DependencyStep::Skip { notice } => {
                self.shell.info(notice);
                Ok(())
            }
            DependencyStep::Run { tool, args } => {
                let program = locate_tool(tool)?;
                let process = prepare(ProcessBuilder::new(program).args(&args).cwd(workdir));

                self.shell.step(format_args!("Running: {} {}", tool, args.join(" ")));
                self.executor
                    .run(&process, self.shell)
                    .map(|_| ())
                    .map_err(|source| DependencyFetchError::Tool {
                        tool: tool.to_string(),
                        source,
                    })
            }
        }
    }
}
