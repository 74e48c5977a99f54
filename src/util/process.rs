//! Subprocess execution utilities.
//!
//! Every external tool a staging run launches (the Go toolchain, vendor
//! tools, user hooks) goes through [`ProcessBuilder`] and an [`Executor`].
//! Output is forwarded line by line to the staging shell as it arrives, and
//! each invocation carries a hard wall-clock timeout.

use std::collections::HashMap;
use std::ffi::OsStr;
use std::io::{self, BufRead, BufReader, Read};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use thiserror::Error;
use wait_timeout::ChildExt;

use crate::util::shell::Shell;

/// Poll interval used while waiting on a process without a deadline.
const IDLE_POLL: Duration = Duration::from_secs(60);

/// Failure of an external process.
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn `{command}`")]
    Spawn {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("failed while waiting for `{command}`")]
    Wait {
        command: String,
        #[source]
        source: io::Error,
    },

    #[error("`{command}` timed out after {secs} seconds")]
    TimedOut { command: String, secs: u64 },

    #[error("`{command}` failed with exit code {}", display_code(.code))]
    Failed {
        command: String,
        code: Option<i32>,
        output: String,
    },
}

fn display_code(code: &Option<i32>) -> String {
    code.map(|c| c.to_string())
        .unwrap_or_else(|| "(signal)".to_string())
}

impl ProcessError {
    /// Output captured before the failure, if any.
    pub fn output(&self) -> &str {
        match self {
            ProcessError::Failed { output, .. } => output,
            _ => "",
        }
    }
}

/// Result of a finished process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessOutput {
    pub code: Option<i32>,
    /// Interleaved stdout and stderr lines.
    pub output: String,
}

impl ProcessOutput {
    pub fn success(&self) -> bool {
        self.code == Some(0)
    }
}

/// Builder for subprocess execution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProcessBuilder {
    program: PathBuf,
    args: Vec<String>,
    env: HashMap<String, String>,
    env_remove: Vec<String>,
    cwd: Option<PathBuf>,
    timeout: Option<Duration>,
}

impl ProcessBuilder {
    /// Create a new process builder for the given program.
    pub fn new(program: impl AsRef<Path>) -> Self {
        ProcessBuilder {
            program: program.as_ref().to_path_buf(),
            args: Vec::new(),
            env: HashMap::new(),
            env_remove: Vec::new(),
            cwd: None,
            timeout: None,
        }
    }

    /// Add a single argument.
    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_string_lossy().into_owned());
        self
    }

    /// Add multiple arguments.
    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args.extend(
            args.into_iter()
                .map(|s| s.as_ref().to_string_lossy().into_owned()),
        );
        self
    }

    /// Set an environment variable.
    pub fn env(mut self, key: impl AsRef<str>, value: impl AsRef<str>) -> Self {
        self.env
            .insert(key.as_ref().to_string(), value.as_ref().to_string());
        self
    }

    /// Remove an environment variable.
    pub fn env_remove(mut self, key: impl AsRef<str>) -> Self {
        self.env_remove.push(key.as_ref().to_string());
        self
    }

    /// Set the working directory.
    pub fn cwd(mut self, cwd: impl AsRef<Path>) -> Self {
        self.cwd = Some(cwd.as_ref().to_path_buf());
        self
    }

    /// Kill the process if it runs longer than `timeout`.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    /// Get the program path.
    pub fn get_program(&self) -> &Path {
        &self.program
    }

    /// Get the arguments.
    pub fn get_args(&self) -> &[String] {
        &self.args
    }

    /// Get an environment variable set on this builder.
    pub fn get_env(&self, key: &str) -> Option<&str> {
        self.env.get(key).map(String::as_str)
    }

    pub fn get_cwd(&self) -> Option<&Path> {
        self.cwd.as_deref()
    }

    pub fn get_timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Build the Command.
    fn build_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);

        for (key, value) in &self.env {
            cmd.env(key, value);
        }

        for key in &self.env_remove {
            cmd.env_remove(key);
        }

        if let Some(ref cwd) = self.cwd {
            cmd.current_dir(cwd);
        }

        cmd
    }

    /// Run the process, handing each output line to `on_line` as it arrives.
    ///
    /// Returns the finished process regardless of its exit code; only spawn
    /// failures and timeouts are errors here.
    pub fn exec_streaming(
        &self,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<ProcessOutput, ProcessError> {
        let command = self.display_command();
        let mut cmd = self.build_command();
        cmd.stdin(Stdio::null());
        cmd.stdout(Stdio::piped());
        cmd.stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|source| ProcessError::Spawn {
            command: command.clone(),
            source,
        })?;

        let (tx, rx) = mpsc::channel();
        let mut readers = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            readers.push(spawn_reader(stdout, tx.clone()));
        }
        if let Some(stderr) = child.stderr.take() {
            readers.push(spawn_reader(stderr, tx.clone()));
        }
        drop(tx);

        let deadline = self.timeout.map(|t| Instant::now() + t);
        let mut output = String::new();

        loop {
            let wait = match deadline {
                Some(d) => d.saturating_duration_since(Instant::now()),
                None => IDLE_POLL,
            };
            if deadline.is_some() && wait.is_zero() {
                return Err(self.kill_timed_out(&mut child, command));
            }

            match rx.recv_timeout(wait) {
                Ok(line) => {
                    on_line(&line);
                    output.push_str(&line);
                    output.push('\n');
                }
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }

        let status = match deadline {
            Some(d) => {
                let remaining = d.saturating_duration_since(Instant::now());
                match child.wait_timeout(remaining) {
                    Ok(Some(status)) => status,
                    Ok(None) => return Err(self.kill_timed_out(&mut child, command)),
                    Err(source) => return Err(ProcessError::Wait { command, source }),
                }
            }
            None => child
                .wait()
                .map_err(|source| ProcessError::Wait {
                    command: command.clone(),
                    source,
                })?,
        };

        for reader in readers {
            let _ = reader.join();
        }

        Ok(ProcessOutput {
            code: status.code(),
            output,
        })
    }

    /// Run the process and require a zero exit code.
    pub fn exec_and_check(
        &self,
        on_line: &mut dyn FnMut(&str),
    ) -> Result<ProcessOutput, ProcessError> {
        let out = self.exec_streaming(on_line)?;
        if !out.success() {
            return Err(ProcessError::Failed {
                command: self.display_command(),
                code: out.code,
                output: out.output,
            });
        }
        Ok(out)
    }

    fn kill_timed_out(&self, child: &mut Child, command: String) -> ProcessError {
        let _ = child.kill();
        let _ = child.wait();
        ProcessError::TimedOut {
            command,
            secs: self.timeout.map(|t| t.as_secs()).unwrap_or_default(),
        }
    }

    /// Display the command the way it is logged to the user.
    pub fn display_command(&self) -> String {
        let mut parts = vec![self.program.display().to_string()];
        parts.extend(self.args.iter().map(|a| quote_arg(a)));
        parts.join(" ")
    }
}

/// Quote an argument for display if it contains whitespace.
pub fn quote_arg(arg: &str) -> String {
    if arg.is_empty() || arg.chars().any(char::is_whitespace) {
        format!("'{}'", arg.replace('\'', r"'\''"))
    } else {
        arg.to_string()
    }
}

fn spawn_reader<R: Read + Send + 'static>(pipe: R, tx: Sender<String>) -> JoinHandle<()> {
    thread::spawn(move || {
        let reader = BufReader::new(pipe);
        for line in reader.lines().map_while(Result::ok) {
            if tx.send(line).is_err() {
                break;
            }
        }
    })
}

/// Runs external processes on behalf of a staging run.
///
/// Implementations must only return `Ok` for a zero exit status.
pub trait Executor: Send + Sync {
    fn run(&self, process: &ProcessBuilder, shell: &Shell) -> Result<ProcessOutput, ProcessError>;
}

/// Executor that spawns real processes and streams their output verbatim.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemExecutor;

impl Executor for SystemExecutor {
    fn run(&self, process: &ProcessBuilder, shell: &Shell) -> Result<ProcessOutput, ProcessError> {
        tracing::debug!("exec: {}", process.display_command());
        process.exec_and_check(&mut |line| shell.passthrough(line))
    }
}

/// Find an executable in PATH.
pub fn find_executable(name: &str) -> Option<PathBuf> {
    which::which(name).ok()
}

/// Prepend a directory to a PATH-style value.
pub fn prepend_path(dir: &Path, existing: Option<&str>) -> String {
    match existing {
        Some(rest) if !rest.is_empty() => format!("{}:{}", dir.display(), rest),
        _ => dir.display().to_string(),
    }
}
