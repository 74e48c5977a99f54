//! Test utilities and mocks for gostage unit tests.
//!
//! This module provides mock implementations for the two seams a staging
//! run crosses: process execution and artifact transport.
//!
//! # Example
//!
//! ```rust,ignore
//! use gostage::test_support::{MockExecutor, MockProcessOutput};
//!
//! #[test]
//! fn test_example() {
//!     let exec = MockExecutor::new();
//!     exec.expect("/deps/bin/glide install", MockProcessOutput::success("[INFO] done"));
//!
//!     // Hand `&exec` to the code under test...
//! }
//! ```

pub mod fixtures;

use std::collections::HashMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};

use crate::core::error::FetchError;
use crate::sources::Transport;
use crate::util::process::{Executor, ProcessBuilder, ProcessError, ProcessOutput};
use crate::util::shell::Shell;

// Re-export fixtures for convenience
pub use fixtures::*;

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Mock process output for testing command execution.
#[derive(Debug, Clone)]
pub struct MockProcessOutput {
    /// Exit status code (0 = success).
    pub status: i32,
    /// Standard output.
    pub stdout: String,
    /// Standard error.
    pub stderr: String,
}

impl MockProcessOutput {
    /// Create a successful output with the given stdout.
    pub fn success(stdout: impl Into<String>) -> Self {
        MockProcessOutput {
            status: 0,
            stdout: stdout.into(),
            stderr: String::new(),
        }
    }

    /// Create a failure output with the given stderr and status code.
    pub fn failure(status: i32, stderr: impl Into<String>) -> Self {
        MockProcessOutput {
            status,
            stdout: String::new(),
            stderr: stderr.into(),
        }
    }

    /// Check if the process succeeded.
    pub fn success_status(&self) -> bool {
        self.status == 0
    }

    fn lines(&self) -> impl Iterator<Item = &str> {
        self.stdout.lines().chain(self.stderr.lines())
    }
}

impl Default for MockProcessOutput {
    fn default() -> Self {
        MockProcessOutput::success("")
    }
}

/// Pattern for matching commands in MockExecutor.
#[derive(Debug, Clone)]
pub enum CommandPattern {
    /// Exact match on full command string.
    Exact(String),
    /// Match if command starts with prefix.
    StartsWith(String),
    /// Match if command contains substring.
    Contains(String),
}

impl CommandPattern {
    /// Check if this pattern matches the given command.
    pub fn matches(&self, cmd: &str) -> bool {
        match self {
            CommandPattern::Exact(s) => cmd == s,
            CommandPattern::StartsWith(s) => cmd.starts_with(s),
            CommandPattern::Contains(s) => cmd.contains(s),
        }
    }
}

#[derive(Debug, Default)]
struct MockState {
    expectations: Vec<(CommandPattern, MockProcessOutput)>,
    processes: Vec<ProcessBuilder>,
    default_output: Option<MockProcessOutput>,
}

/// Mock process executor for testing command execution.
///
/// Commands are matched against expectations in the order they were added;
/// the first match wins. Unmatched commands fall back to the default
/// output, or fail to spawn when there is none.
#[derive(Debug, Default)]
pub struct MockExecutor {
    state: Mutex<MockState>,
}

impl MockExecutor {
    /// Create a new mock executor.
    pub fn new() -> Self {
        MockExecutor::default()
    }

    fn push(&self, pattern: CommandPattern, output: MockProcessOutput) -> &Self {
        lock(&self.state).expectations.push((pattern, output));
        self
    }

    /// Add an expectation for an exact command match.
    pub fn expect(&self, cmd: &str, output: MockProcessOutput) -> &Self {
        self.push(CommandPattern::Exact(cmd.to_string()), output)
    }

    /// Add an expectation for a command starting with a prefix.
    pub fn expect_prefix(&self, prefix: &str, output: MockProcessOutput) -> &Self {
        self.push(CommandPattern::StartsWith(prefix.to_string()), output)
    }

    /// Add an expectation for a command containing a substring.
    pub fn expect_contains(&self, substring: &str, output: MockProcessOutput) -> &Self {
        self.push(CommandPattern::Contains(substring.to_string()), output)
    }

    /// Set a default output for commands that don't match any expectation.
    pub fn set_default(&self, output: MockProcessOutput) -> &Self {
        lock(&self.state).default_output = Some(output);
        self
    }

    /// All commands that were run, as displayed to the user.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.state)
            .processes
            .iter()
            .map(ProcessBuilder::display_command)
            .collect()
    }

    /// All processes that were run, with their environment.
    pub fn processes(&self) -> Vec<ProcessBuilder> {
        lock(&self.state).processes.clone()
    }
}

impl Executor for MockExecutor {
    fn run(&self, process: &ProcessBuilder, shell: &Shell) -> Result<ProcessOutput, ProcessError> {
        let command = process.display_command();
        let output = {
            let mut state = lock(&self.state);
            state.processes.push(process.clone());
            state
                .expectations
                .iter()
                .find(|(pattern, _)| pattern.matches(&command))
                .map(|(_, output)| output.clone())
                .or_else(|| state.default_output.clone())
        };

        let Some(output) = output else {
            return Err(ProcessError::Spawn {
                command,
                source: std::io::Error::new(std::io::ErrorKind::NotFound, "unexpected command"),
            });
        };

        let mut captured = String::new();
        for line in output.lines() {
            shell.passthrough(line);
            captured.push_str(line);
            captured.push('\n');
        }

        if !output.success_status() {
            return Err(ProcessError::Failed {
                command,
                code: Some(output.status),
                output: captured,
            });
        }
        Ok(ProcessOutput {
            code: Some(0),
            output: captured,
        })
    }
}

/// Transport that serves fixed bytes and records every URL it was asked for.
#[derive(Debug, Default)]
pub struct RecordingTransport {
    default_body: Vec<u8>,
    bodies: HashMap<String, Vec<u8>>,
    calls: Mutex<Vec<String>>,
}

impl RecordingTransport {
    /// Serve `body` for every URL without a specific response.
    pub fn new(body: impl Into<Vec<u8>>) -> Self {
        RecordingTransport {
            default_body: body.into(),
            ..Default::default()
        }
    }

    /// Serve `body` for one URL.
    pub fn with_body(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.bodies.insert(url.to_string(), body.into());
        self
    }

    /// URLs fetched so far, in order.
    pub fn calls(&self) -> Vec<String> {
        lock(&self.calls).clone()
    }
}

impl Transport for RecordingTransport {
    fn fetch(&self, url: &str, dest: &Path, shell: &Shell) -> Result<(), FetchError> {
        lock(&self.calls).push(url.to_string());
        shell.info(format_args!("Download [{}]", url));
        let body = self.bodies.get(url).unwrap_or(&self.default_body);
        std::fs::write(dest, body).map_err(|e| FetchError::io(dest, e))
    }
}

/// Transport that fails every request; proves a path never touches it.
#[derive(Debug, Default, Clone, Copy)]
pub struct FailingTransport;

impl Transport for FailingTransport {
    fn fetch(&self, url: &str, _dest: &Path, _shell: &Shell) -> Result<(), FetchError> {
        Err(FetchError::HttpStatus {
            url: url.to_string(),
            status: 503,
        })
    }
}

/// Assertion helpers for testing.
pub mod assertions {
    /// Assert that a result is Err and return the error.
    pub fn assert_err<T: std::fmt::Debug, E>(result: Result<T, E>) -> E {
        match result {
            Ok(v) => panic!("expected Err, got Ok: {:?}", v),
            Err(e) => e,
        }
    }

    /// Assert that captured output contains `needles` in order.
    pub fn assert_in_order(output: &str, needles: &[&str]) {
        let mut from = 0;
        for needle in needles {
            match output[from..].find(needle) {
                Some(idx) => from += idx + needle.len(),
                None => panic!("expected `{}` after offset {} in:\n{}", needle, from, output),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::util::shell::Verbosity;

    #[test]
    fn test_mock_executor_basic() {
        let exec = MockExecutor::new();
        exec.expect("go version", MockProcessOutput::success("go version go1.12.3"));
        exec.expect_prefix("glide", MockProcessOutput::failure(1, "boom"));
        let (shell, capture) = Shell::captured(Verbosity::Normal);

        let out = exec
            .run(&ProcessBuilder::new("go").arg("version"), &shell)
            .unwrap();
        assert_eq!(out.output, "go version go1.12.3\n");
        assert!(capture.contents().contains("go version go1.12.3"));

        let err = exec
            .run(&ProcessBuilder::new("glide").arg("install"), &shell)
            .unwrap_err();
        assert_eq!(err.output(), "boom\n");
        assert_eq!(exec.calls(), vec!["go version", "glide install"]);
    }

    #[test]
    fn test_mock_executor_unexpected() {
        let exec = MockExecutor::new();
        let (shell, _) = Shell::captured(Verbosity::Normal);
        let result = exec.run(&ProcessBuilder::new("unknown"), &shell);
        assert!(matches!(result, Err(ProcessError::Spawn { .. })));
    }

    #[test]
    fn test_recording_transport() {
        let tmp = tempfile::TempDir::new().unwrap();
        let transport = RecordingTransport::new(b"default".to_vec()).with_body("https://x/a", "a");
        let (shell, _) = Shell::captured(Verbosity::Normal);

        transport.fetch("https://x/a", &tmp.path().join("a"), &shell).unwrap();
        transport.fetch("https://x/b", &tmp.path().join("b"), &shell).unwrap();
        assert_eq!(std::fs::read(tmp.path().join("a")).unwrap(), b"a");
        assert_eq!(std::fs::read(tmp.path().join("b")).unwrap(), b"default");
        assert_eq!(transport.calls(), vec!["https://x/a", "https://x/b"]);
    }

    #[test]
    fn test_assert_in_order() {
        assertions::assert_in_order("one two three", &["one", "three"]);
    }
}
