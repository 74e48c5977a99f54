//! User hook scripts around the compile step.
//!
//! ```text
//! Idle -> BeforeHookRunning -> BuildRunning -> AfterHookRunning -> Done
//!              |                    |                 |
//!              +--------------------+-----------------+--> Failed
//! ```
//!
//! Hooks of one phase run sequentially in configured order. The first
//! failure moves the runner to `Failed`, which it never leaves.

use std::fmt;
use std::path::{Path, PathBuf};

use crate::core::error::{HookError, StagingError};
use crate::util::process::{Executor, ProcessBuilder};
use crate::util::shell::Shell;

/// Hook phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookPhase {
    BeforeCompile,
    AfterCompile,
}

impl HookPhase {
    /// Position of the phase in the staging run, as shown in debug output.
    fn ordinal(&self) -> u8 {
        match self {
            HookPhase::BeforeCompile => 1,
            HookPhase::AfterCompile => 2,
        }
    }
}

impl fmt::Display for HookPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            HookPhase::BeforeCompile => f.write_str("BeforeCompile"),
            HookPhase::AfterCompile => f.write_str("AfterCompile"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HookState {
    Idle,
    BeforeHookRunning,
    BuildRunning,
    AfterHookRunning,
    Done,
    Failed,
}

/// Runs before/after hooks around a build step.
pub struct HookRunner<'a> {
    state: HookState,
    before: Vec<PathBuf>,
    after: Vec<PathBuf>,
    executor: &'a dyn Executor,
    shell: &'a Shell,
    debug: bool,
    prepare: Box<dyn Fn(ProcessBuilder) -> ProcessBuilder + 'a>,
}

impl<'a> HookRunner<'a> {
    pub fn new(
        before: Vec<PathBuf>,
        after: Vec<PathBuf>,
        executor: &'a dyn Executor,
        shell: &'a Shell,
    ) -> Self {
        HookRunner {
            state: HookState::Idle,
            before,
            after,
            executor,
            shell,
            debug: false,
            prepare: Box::new(|p| p),
        }
    }

    /// Print the phase markers even when the shell is not in debug mode.
    pub fn with_debug(mut self, debug: bool) -> Self {
        self.debug = debug;
        self
    }

    /// Set how hook processes are configured (environment, cwd, timeout).
    pub fn with_prepare(mut self, prepare: impl Fn(ProcessBuilder) -> ProcessBuilder + 'a) -> Self {
        self.prepare = Box::new(prepare);
        self
    }

    pub fn state(&self) -> HookState {
        self.state
    }

    /// Run before hooks, the build, then after hooks.
    pub fn run<T>(
        &mut self,
        build: impl FnOnce() -> Result<T, StagingError>,
    ) -> Result<T, StagingError> {
        if self.state != HookState::Idle {
            return Err(anyhow::anyhow!("hook runner cannot restart from {:?}", self.state).into());
        }

        self.state = HookState::BeforeHookRunning;
        if let Err(err) = self.run_phase(HookPhase::BeforeCompile) {
            self.state = HookState::Failed;
            return Err(err.into());
        }

        self.state = HookState::BuildRunning;
        let output = match build() {
            Ok(output) => output,
            Err(err) => {
                self.state = HookState::Failed;
                return Err(err);
            }
        };

        self.state = HookState::AfterHookRunning;
        if let Err(err) = self.run_phase(HookPhase::AfterCompile) {
            self.state = HookState::Failed;
            return Err(err.into());
        }

        self.state = HookState::Done;
        Ok(output)
    }

    fn run_phase(&self, phase: HookPhase) -> Result<(), HookError> {
        self.shell
            .debug_when(self.debug, format_args!("HOOKS {}: {}", phase.ordinal(), phase));

        let scripts = match phase {
            HookPhase::BeforeCompile => &self.before,
            HookPhase::AfterCompile => &self.after,
        };
        for script in scripts {
            self.run_script(phase, script)?;
        }
        Ok(())
    }

    fn run_script(&self, phase: HookPhase, script: &Path) -> Result<(), HookError> {
        if !script.is_file() {
            return Err(HookError::Missing {
                path: script.to_path_buf(),
            });
        }

        let process = if is_executable(script) {
            ProcessBuilder::new(script)
        } else {
            ProcessBuilder::new("sh").arg(script)
        };
        let process = (self.prepare)(process);

        tracing::info!("running {} hook {}", phase, script.display());
        self.executor
            .run(&process, self.shell)
            .map(|_| ())
            .map_err(|source| HookError::Failed {
                phase: phase.to_string(),
                path: script.to_path_buf(),
                source,
            })
    }
}

#[cfg(unix)]
fn is_executable(path: &Path) -> bool {
    use std::os::unix::fs::PermissionsExt;
    std::fs::metadata(path)
        .map(|m| m.permissions().mode() & 0o111 != 0)
        .unwrap_or(false)
}

#[cfg(not(unix))]
fn is_executable(_path: &Path) -> bool {
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::error::BuildError;
    use crate::test_support::{MockExecutor, MockProcessOutput};
    use crate::util::process::ProcessError;
    use crate::util::shell::Verbosity;
    use std::cell::Cell;
    use tempfile::TempDir;

    fn scripts(dir: &Path, names: &[&str]) -> Vec<PathBuf> {
        names
            .iter()
            .map(|n| {
                let path = dir.join(n);
                std::fs::write(&path, "#!/bin/sh\necho hook\n").unwrap();
                path
            })
            .collect()
    }

    fn compile_failure() -> StagingError {
        BuildError::Compile(ProcessError::Failed {
            command: "go install".into(),
            code: Some(2),
            output: String::new(),
        })
        .into()
    }

    #[test]
    fn test_order_and_debug_lines() {
        let tmp = TempDir::new().unwrap();
        let before = scripts(tmp.path(), &["b1.sh", "b2.sh"]);
        let after = scripts(tmp.path(), &["a1.sh"]);
        let executor = MockExecutor::new();
        executor.set_default(MockProcessOutput::success(""));
        let (shell, capture) = Shell::captured(Verbosity::Debug);

        let built = Cell::new(false);
        let mut runner = HookRunner::new(before, after, &executor, &shell);
        runner
            .run(|| {
                assert_eq!(executor.calls().len(), 2);
                built.set(true);
                Ok(())
            })
            .unwrap();

        assert!(built.get());
        assert_eq!(runner.state(), HookState::Done);
        let calls = executor.calls();
        assert_eq!(calls.len(), 3);
        assert!(calls[0].ends_with("b1.sh"));
        assert!(calls[1].ends_with("b2.sh"));
        assert!(calls[2].ends_with("a1.sh"));

        let out = capture.contents();
        let first = out.find("HOOKS 1: BeforeCompile").unwrap();
        let second = out.find("HOOKS 2: AfterCompile").unwrap();
        assert!(first < second);
    }

    #[test]
    fn test_debug_lines_hidden_without_debug() {
        let executor = MockExecutor::new();
        let (shell, capture) = Shell::captured(Verbosity::Normal);
        HookRunner::new(vec![], vec![], &executor, &shell)
            .run(|| Ok(()))
            .unwrap();
        assert!(!capture.contents().contains("HOOKS"));
    }

    #[test]
    fn test_debug_flag_prints_phase_markers() {
        let executor = MockExecutor::new();
        let (shell, capture) = Shell::captured(Verbosity::Normal);
        HookRunner::new(vec![], vec![], &executor, &shell)
            .with_debug(true)
            .run(|| Ok(()))
            .unwrap();

        let out = capture.contents();
        assert!(out.contains("DEBUG: HOOKS 1: BeforeCompile"));
        assert!(out.contains("DEBUG: HOOKS 2: AfterCompile"));
    }

    #[test]
    fn test_failed_before_hook_skips_build() {
        let tmp = TempDir::new().unwrap();
        let before = scripts(tmp.path(), &["b1.sh", "b2.sh"]);
        let after = scripts(tmp.path(), &["a1.sh"]);
        let executor = MockExecutor::new();
        executor.expect_contains("b1.sh", MockProcessOutput::failure(3, "boom"));
        executor.set_default(MockProcessOutput::success(""));
        let (shell, _) = Shell::captured(Verbosity::Normal);

        let mut runner = HookRunner::new(before, after, &executor, &shell);
        let err = runner
            .run(|| -> Result<(), StagingError> { panic!("build must not run") })
            .unwrap_err();

        assert!(matches!(err, StagingError::Hook(HookError::Failed { .. })));
        assert_eq!(runner.state(), HookState::Failed);
        assert_eq!(executor.calls().len(), 1);
    }

    #[test]
    fn test_failed_build_skips_after_hook() {
        let tmp = TempDir::new().unwrap();
        let after = scripts(tmp.path(), &["a1.sh"]);
        let executor = MockExecutor::new();
        let (shell, _) = Shell::captured(Verbosity::Normal);

        let mut runner = HookRunner::new(vec![], after, &executor, &shell);
        let err = runner.run(|| -> Result<(), StagingError> { Err(compile_failure()) });

        assert!(matches!(err, Err(StagingError::Build(_))));
        assert_eq!(runner.state(), HookState::Failed);
        assert!(executor.calls().is_empty());

        let again = runner.run(|| Ok(()));
        assert!(again.is_err());
        assert_eq!(runner.state(), HookState::Failed);
    }

    #[test]
    fn test_missing_script() {
        let executor = MockExecutor::new();
        let (shell, _) = Shell::captured(Verbosity::Normal);
        let mut runner =
            HookRunner::new(vec![PathBuf::from("/nonexistent/hook.sh")], vec![], &executor, &shell);
        let err = runner.run(|| Ok(())).unwrap_err();
        assert!(err.to_string().contains("hook script not found"));
    }

    #[test]
    fn test_prepare_is_applied() {
        let tmp = TempDir::new().unwrap();
        let before = scripts(tmp.path(), &["env.sh"]);
        let executor = MockExecutor::new();
        executor.set_default(MockProcessOutput::success(""));
        let (shell, _) = Shell::captured(Verbosity::Normal);

        HookRunner::new(before, vec![], &executor, &shell)
            .with_prepare(|p| p.cwd("/work").env("GOPATH", "/gopath"))
            .run(|| Ok(()))
            .unwrap();

        let process = executor.processes().pop().unwrap();
        assert_eq!(process.get_cwd(), Some(Path::new("/work")));
        assert_eq!(process.get_env("GOPATH"), Some("/gopath"));
    }
}
