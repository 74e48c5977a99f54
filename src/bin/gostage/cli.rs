//! CLI definitions using clap.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, ValueEnum};

/// gostage - staging-time decisions for Go applications
#[derive(Parser)]
#[command(name = "gostage")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Output format for staging messages
    #[arg(long, global = true, value_enum, default_value_t = MessageFormat::Human)]
    pub message_format: MessageFormat,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum MessageFormat {
    Human,
    Json,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Stage an application: install go, fetch dependencies and compile
    Stage(StageArgs),

    /// Print the dependency strategy of an application
    Detect(DetectArgs),

    /// Resolve a go version constraint against a manifest
    Resolve(ResolveArgs),

    /// Print the build plan of an application as JSON without building
    Plan(PlanArgs),
}

/// Directories shared by commands that run against a buildpack.
#[derive(Args)]
pub struct BuildpackArgs {
    /// Buildpack root holding manifest.toml
    #[arg(long, env = "GOSTAGE_BUILDPACK_DIR")]
    pub buildpack_dir: PathBuf,

    /// Artifact cache directory
    #[arg(long, env = "GOSTAGE_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// Directory for installed toolchains (defaults to <cache-dir>/deps)
    #[arg(long, env = "GOSTAGE_DEPS_DIR")]
    pub deps_dir: Option<PathBuf>,
}

#[derive(Args)]
pub struct StageArgs {
    /// Application directory
    pub app: PathBuf,

    #[command(flatten)]
    pub dirs: BuildpackArgs,

    /// Serve artifacts only from the buildpack's packaged dependencies
    #[arg(long)]
    pub cached: bool,
}

#[derive(Args)]
pub struct DetectArgs {
    /// Application directory
    pub app: PathBuf,
}

#[derive(Args)]
pub struct ResolveArgs {
    /// Version constraint (`1.12.3`, `1.12.x`, `1.12`); latest when omitted
    pub constraint: Option<String>,

    /// Toolchain manifest
    #[arg(long)]
    pub manifest: PathBuf,
}

#[derive(Args)]
pub struct PlanArgs {
    /// Application directory
    pub app: PathBuf,

    #[command(flatten)]
    pub dirs: BuildpackArgs,
}
