//! Staging failures.
//!
//! Every fatal path of a staging run ends in exactly one [`StagingError`].
//! Its `Display` output is the canonical, greppable line shown to the user;
//! any detail (tool output, I/O causes) hangs off the error chain.

use std::path::PathBuf;

use thiserror::Error;

use crate::resolver::VersionResolutionError;
use crate::util::process::ProcessError;

/// Companion line printed after the `.godir` deprecation error.
pub const GODIR_HELP: &str =
    "See https://github.com/tools/godep or https://github.com/Masterminds/glide for usage information.";

/// The application tree does not describe a buildable layout.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DetectionError {
    #[error(
        "Deprecated, .godir file found! Please update to supported Godep or Glide dependency managers."
    )]
    LegacyGodir,

    #[error("vendor/ directory does not exist.")]
    MissingVendor,

    #[error("To use {manager} set the $GOPACKAGENAME")]
    MissingPackageName { manager: String },

    #[error("Unable to determine the dependency strategy: no Go sources or dependency markers found")]
    Undetermined,

    #[error("failed to parse {}: {message}", path.display())]
    Marker { path: PathBuf, message: String },
}

impl DetectionError {
    pub fn missing_package_name(manager: impl Into<String>) -> Self {
        DetectionError::MissingPackageName {
            manager: manager.into(),
        }
    }
}

/// An artifact could not be made available locally.
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("{url} is not in the buildpack cache")]
    NotCached { url: String },

    #[error("failed to download {url}")]
    Request {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("failed to download {url}: HTTP {status}")]
    HttpStatus { url: String, status: u16 },

    #[error("failed to store {}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("checksum mismatch for {url}: expected {expected}, got {actual}")]
    ChecksumMismatch {
        url: String,
        expected: String,
        actual: String,
    },

    #[error("unsupported artifact reference: {url}")]
    Unsupported { url: String },
}

impl FetchError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        FetchError::Io {
            path: path.into(),
            source,
        }
    }
}

/// A dependency manager failed to populate `vendor/`.
#[derive(Debug, Error)]
pub enum DependencyFetchError {
    #[error("{tool} is not available in the manifest or on PATH")]
    ToolNotFound { tool: String },

    #[error("failed to install {tool}")]
    ToolInstall {
        tool: String,
        #[source]
        source: FetchError,
    },

    #[error("failed to unpack {tool}")]
    ToolUnpack {
        tool: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("{tool} failed")]
    Tool {
        tool: String,
        #[source]
        source: ProcessError,
    },
}

/// A user hook script failed.
#[derive(Debug, Error)]
pub enum HookError {
    #[error("hook script not found: {}", path.display())]
    Missing { path: PathBuf },

    #[error("{phase} hook {} failed", path.display())]
    Failed {
        phase: String,
        path: PathBuf,
        #[source]
        source: ProcessError,
    },
}

/// Compiling the application failed.
#[derive(Debug, Error)]
pub enum BuildError {
    #[error("failed to install the go toolchain")]
    Toolchain(#[source] anyhow::Error),

    #[error("failed to prepare the GOPATH workspace")]
    Workspace(#[source] anyhow::Error),

    #[error("go install failed")]
    Compile(#[source] ProcessError),
}

/// Any fatal failure of a staging run.
#[derive(Debug, Error)]
pub enum StagingError {
    #[error("Unable to determine Go version to install: {0}")]
    Version(#[from] VersionResolutionError),

    #[error(transparent)]
    Detection(#[from] DetectionError),

    #[error(transparent)]
    Fetch(#[from] FetchError),

    #[error(transparent)]
    DependencyFetch(#[from] DependencyFetchError),

    #[error(transparent)]
    Hook(#[from] HookError),

    #[error(transparent)]
    Build(#[from] BuildError),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl StagingError {
    /// The single line that identifies this failure to the user.
    pub fn canonical_message(&self) -> String {
        self.to_string()
    }

    /// Optional line printed after the canonical message.
    pub fn help(&self) -> Option<&'static str> {
        match self {
            StagingError::Detection(DetectionError::LegacyGodir) => Some(GODIR_HELP),
            _ => None,
        }
    }

    /// Output of the external process behind this failure, if any.
    pub fn process_output(&self) -> Option<&str> {
        let process = match self {
            StagingError::DependencyFetch(DependencyFetchError::Tool { source, .. }) => source,
            StagingError::Hook(HookError::Failed { source, .. }) => source,
            StagingError::Build(BuildError::Compile(source)) => source,
            _ => return None,
        };
        Some(process.output()).filter(|o| !o.is_empty())
    }

    /// Short machine-readable category.
    pub fn kind(&self) -> &'static str {
        match self {
            StagingError::Version(_) => "version",
            StagingError::Detection(_) => "detection",
            StagingError::Fetch(_) => "fetch",
            StagingError::DependencyFetch(_) => "dependency-fetch",
            StagingError::Hook(_) => "hook",
            StagingError::Build(_) => "build",
            StagingError::Other(_) => "internal",
        }
    }
}
