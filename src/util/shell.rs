//! Staging transcript output.
//!
//! The Shell is the single log sink of a staging run. Everything the user
//! sees while their app stages goes through it, in the line format the
//! platform's staging log expects:
//!
//! ```text
//! -----> Installing go 1.12.3
//!        Download [https://example.com/go1.12.3.linux-amd64.tar.gz]
//!        **WARNING** something worth knowing
//!        **ERROR** Unable to determine Go version to install: no match found for 99.99.99
//! ```
//!
//! In JSON mode each message is emitted as one JSON object per line instead.
//! Every message is also mirrored as a `tracing` event.

use std::fmt::Display;
use std::io::{self, Write};
use std::sync::{Arc, Mutex};

/// Shell output mode - Human and Json are mutually exclusive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShellMode {
    /// Buildpack-style transcript lines.
    #[default]
    Human,
    /// Machine-readable JSON output only.
    Json,
}

/// Output verbosity level.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only
    Quiet,
    #[default]
    Normal,
    /// Debug lines are shown (`BP_DEBUG`, `--verbose`)
    Debug,
}

/// Kind of a transcript line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    Step,
    Info,
    Warning,
    Error,
    Debug,
    /// Verbatim output of an external process.
    Output,
}

impl Status {
    fn as_str(&self) -> &'static str {
        match self {
            Status::Step => "step",
            Status::Info => "info",
            Status::Warning => "warning",
            Status::Error => "error",
            Status::Debug => "debug",
            Status::Output => "output",
        }
    }

    fn prefix(&self) -> &'static str {
        match self {
            Status::Step => "-----> ",
            Status::Info | Status::Output => "       ",
            Status::Warning => "       **WARNING** ",
            Status::Error => "       **ERROR** ",
            Status::Debug => "       DEBUG: ",
        }
    }
}

/// In-memory copy of everything a shell printed.
#[derive(Debug, Clone, Default)]
pub struct Capture {
    buf: Arc<Mutex<Vec<u8>>>,
}

impl Capture {
    /// Everything written so far.
    pub fn contents(&self) -> String {
        let buf = self.buf.lock().unwrap_or_else(|e| e.into_inner());
        String::from_utf8_lossy(&buf).into_owned()
    }
}

impl Write for Capture {
    fn write(&mut self, data: &[u8]) -> io::Result<usize> {
        let mut buf = self.buf.lock().unwrap_or_else(|e| e.into_inner());
        buf.extend_from_slice(data);
        Ok(data.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

/// Central sink for all staging output.
pub struct Shell {
    mode: ShellMode,
    verbosity: Verbosity,
    out: Mutex<Box<dyn Write + Send>>,
}

impl std::fmt::Debug for Shell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Shell")
            .field("mode", &self.mode)
            .field("verbosity", &self.verbosity)
            .finish_non_exhaustive()
    }
}

impl Shell {
    /// Create a shell writing to stdout.
    pub fn stdout(mode: ShellMode, verbosity: Verbosity) -> Self {
        Shell::with_writer(mode, verbosity, Box::new(io::stdout()))
    }

    /// Create a shell writing to an arbitrary sink.
    pub fn with_writer(mode: ShellMode, verbosity: Verbosity, out: Box<dyn Write + Send>) -> Self {
        Shell {
            mode,
            verbosity,
            out: Mutex::new(out),
        }
    }

    /// Create a human-mode shell that records its output in memory.
    pub fn captured(verbosity: Verbosity) -> (Self, Capture) {
        let capture = Capture::default();
        let shell = Shell::with_writer(ShellMode::Human, verbosity, Box::new(capture.clone()));
        (shell, capture)
    }

    pub fn mode(&self) -> ShellMode {
        self.mode
    }

    pub fn verbosity(&self) -> Verbosity {
        self.verbosity
    }

    /// Check if debug lines are printed.
    pub fn is_debug(&self) -> bool {
        self.verbosity == Verbosity::Debug
    }

    /// Start a new section of the transcript.
    pub fn step(&self, msg: impl Display) {
        let msg = msg.to_string();
        tracing::info!("{}", msg);
        self.print(Status::Step, &msg);
    }

    pub fn info(&self, msg: impl Display) {
        let msg = msg.to_string();
        tracing::info!("{}", msg);
        self.print(Status::Info, &msg);
    }

    pub fn warn(&self, msg: impl Display) {
        let msg = msg.to_string();
        tracing::warn!("{}", msg);
        self.print(Status::Warning, &msg);
    }

    /// Print an error line. Printed in every verbosity.
    pub fn error(&self, msg: impl Display) {
        let msg = msg.to_string();
        tracing::error!("{}", msg);
        self.print(Status::Error, &msg);
    }

    pub fn debug(&self, msg: impl Display) {
        self.debug_when(false, msg);
    }

    /// Print a debug line if `enabled` is set or the shell is in debug mode.
    pub fn debug_when(&self, enabled: bool, msg: impl Display) {
        let msg = msg.to_string();
        tracing::debug!("{}", msg);
        if enabled || self.is_debug() {
            self.print(Status::Debug, &msg);
        }
    }

    /// Forward one line of external process output unchanged.
    pub fn passthrough(&self, line: &str) {
        tracing::trace!(target: "gostage::process", "{}", line);
        self.print(Status::Output, line);
    }

    fn print(&self, status: Status, msg: &str) {
        if self.verbosity == Verbosity::Quiet && status != Status::Error {
            return;
        }

        let line = match self.mode {
            ShellMode::Human => format!("{}{}", status.prefix(), msg),
            ShellMode::Json => serde_json::json!({
                "reason": status.as_str(),
                "message": msg,
            })
            .to_string(),
        };

        let mut out = self.out.lock().unwrap_or_else(|e| e.into_inner());
        // A broken stdout must not abort staging.
        let _ = writeln!(out, "{}", line);
        let _ = out.flush();
    }
}
