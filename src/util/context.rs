//! Per-run context for staging operations.
//!
//! Provides the directories and environment a staging run works with. The
//! environment is captured once into an explicit map so that nothing in the
//! pipeline reads process environment variables ad hoc.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::LazyLock;

use anyhow::{Context, Result};
use directories::ProjectDirs;

/// Project directories for gostage
static PROJECT_DIRS: LazyLock<Option<ProjectDirs>> =
    LazyLock::new(|| ProjectDirs::from("com", "gostage", "gostage"));

/// Directories and environment of one staging run.
#[derive(Debug, Clone)]
pub struct StagingContext {
    /// Application source tree; also receives the compiled `bin/`
    build_dir: PathBuf,

    /// Artifact cache (downloaded toolchains and tools)
    cache_dir: PathBuf,

    /// Scratch area for installed toolchains outside the final image
    deps_dir: PathBuf,

    /// Buildpack root holding `manifest.toml`, `config.toml` and, for a
    /// cached buildpack, the `dependencies/` artifact cache
    buildpack_dir: PathBuf,

    /// Environment variables visible to the staging run
    env: HashMap<String, String>,
}

impl StagingContext {
    pub fn new(
        build_dir: impl Into<PathBuf>,
        cache_dir: impl Into<PathBuf>,
        deps_dir: impl Into<PathBuf>,
        buildpack_dir: impl Into<PathBuf>,
    ) -> Self {
        StagingContext {
            build_dir: build_dir.into(),
            cache_dir: cache_dir.into(),
            deps_dir: deps_dir.into(),
            buildpack_dir: buildpack_dir.into(),
            env: HashMap::new(),
        }
    }

    /// Replace the environment map.
    pub fn with_env(mut self, env: HashMap<String, String>) -> Self {
        self.env = env;
        self
    }

    /// Capture the current process environment.
    pub fn with_process_env(self) -> Self {
        self.with_env(std::env::vars().collect())
    }

    pub fn build_dir(&self) -> &Path {
        &self.build_dir
    }

    pub fn cache_dir(&self) -> &Path {
        &self.cache_dir
    }

    pub fn deps_dir(&self) -> &Path {
        &self.deps_dir
    }

    pub fn buildpack_dir(&self) -> &Path {
        &self.buildpack_dir
    }

    pub fn env(&self) -> &HashMap<String, String> {
        &self.env
    }

    /// The buildpack's toolchain manifest.
    pub fn manifest_path(&self) -> PathBuf {
        self.buildpack_dir.join("manifest.toml")
    }

    /// Artifacts shipped inside a cached buildpack.
    pub fn packaged_dependencies_dir(&self) -> PathBuf {
        self.buildpack_dir.join("dependencies")
    }

    /// Ensure the writable directories of the run exist.
    pub fn ensure_dirs(&self) -> Result<()> {
        for dir in [&self.cache_dir, &self.deps_dir] {
            std::fs::create_dir_all(dir)
                .with_context(|| format!("failed to create directory: {}", dir.display()))?;
        }
        Ok(())
    }
}

/// Default artifact cache location when none is given.
pub fn default_cache_dir() -> PathBuf {
    PROJECT_DIRS
        .as_ref()
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("gostage-cache"))
}
