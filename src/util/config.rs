//! Configuration support for gostage.
//!
//! Configuration is layered, highest precedence last:
//! - Buildpack: `<buildpack>/config.toml` - defaults shipped with the buildpack
//! - Project: `<app>/.gostage/config.toml` - app-specific overrides
//! - Environment: `GOVERSION`, `GOPACKAGENAME`, `GO_INSTALL_PACKAGE_SPEC`,
//!   `GO_LINKER_SYMBOL`/`GO_LINKER_VALUE`
//!
//! Every field is optional in the files so that a layer only overrides what
//! it actually sets. Defaults are applied by the accessors.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Default build tags passed to `go install`.
pub const DEFAULT_TAGS: &[&str] = &["cloudfoundry"];

/// Default `-buildmode`.
pub const DEFAULT_BUILDMODE: &str = "pie";

/// Default wall-clock limit for each external process.
pub const DEFAULT_TIMEOUT_SECS: u64 = 900;

/// gostage configuration.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Toolchain and package selection
    pub go: GoConfig,

    /// `go install` flags
    pub build: BuildConfig,

    /// User hook scripts
    pub hooks: HooksConfig,

    /// Staging run limits
    pub staging: StagingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GoConfig {
    /// Version constraint (`1.12.3`, `1.12.x`, `1.12`)
    pub version: Option<String>,

    /// Import path of the main package (`GOPACKAGENAME`)
    pub package_name: Option<String>,

    /// Packages to install, overriding the computed default
    pub install_packages: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildConfig {
    pub tags: Option<Vec<String>>,
    pub buildmode: Option<String>,
    pub ldflags: Option<Vec<String>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HooksConfig {
    /// Scripts run before compilation, relative to the app root
    pub before_compile: Option<Vec<PathBuf>>,

    /// Scripts run after a successful compilation
    pub after_compile: Option<Vec<PathBuf>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StagingConfig {
    pub timeout_secs: Option<u64>,

    /// Serve artifacts only from the buildpack cache
    pub cached: Option<bool>,
}

impl Config {
    /// Load configuration from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read config: {}", path.display()))?;

        toml::from_str(&contents)
            .with_context(|| format!("failed to parse config: {}", path.display()))
    }

    /// Merge another config into this one (other takes precedence).
    pub fn merge(&mut self, other: Config) {
        self.go.version = other.go.version.or(self.go.version.take());
        self.go.package_name = other.go.package_name.or(self.go.package_name.take());
        self.go.install_packages = other
            .go
            .install_packages
            .or(self.go.install_packages.take());

        self.build.tags = other.build.tags.or(self.build.tags.take());
        self.build.buildmode = other.build.buildmode.or(self.build.buildmode.take());
        self.build.ldflags = other.build.ldflags.or(self.build.ldflags.take());

        self.hooks.before_compile = other
            .hooks
            .before_compile
            .or(self.hooks.before_compile.take());
        self.hooks.after_compile = other
            .hooks
            .after_compile
            .or(self.hooks.after_compile.take());

        self.staging.timeout_secs = other.staging.timeout_secs.or(self.staging.timeout_secs);
        self.staging.cached = other.staging.cached.or(self.staging.cached);
    }

    /// Apply the buildpack's recognised environment variables on top.
    pub fn apply_env(&mut self, env: &HashMap<String, String>) {
        if let Some(version) = env_value(env, "GOVERSION") {
            self.go.version = Some(version.to_string());
        }

        if let Some(name) = env_value(env, "GOPACKAGENAME") {
            self.go.package_name = Some(name.to_string());
        }

        if let Some(spec) = env_value(env, "GO_INSTALL_PACKAGE_SPEC") {
            self.go.install_packages =
                Some(spec.split_whitespace().map(str::to_string).collect());
        }

        let symbol = env_value(env, "GO_LINKER_SYMBOL");
        let value = env_value(env, "GO_LINKER_VALUE");
        match (symbol, value) {
            (Some(symbol), Some(value)) => {
                self.build.ldflags = Some(vec![format!("-X {}={}", symbol, value)]);
            }
            (Some(_), None) | (None, Some(_)) => {
                tracing::warn!(
                    "GO_LINKER_SYMBOL and GO_LINKER_VALUE must both be set; ignoring linker flags"
                );
            }
            (None, None) => {}
        }
    }

    /// Build tags, defaulting to `cloudfoundry`.
    pub fn tags(&self) -> Vec<String> {
        self.build
            .tags
            .clone()
            .unwrap_or_else(|| DEFAULT_TAGS.iter().map(|t| t.to_string()).collect())
    }

    /// Build mode, defaulting to `pie`. An empty value disables the flag.
    pub fn buildmode(&self) -> Option<String> {
        match &self.build.buildmode {
            Some(mode) if mode.is_empty() => None,
            Some(mode) => Some(mode.clone()),
            None => Some(DEFAULT_BUILDMODE.to_string()),
        }
    }

    pub fn ldflags(&self) -> Vec<String> {
        self.build.ldflags.clone().unwrap_or_default()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.staging.timeout_secs.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    pub fn cached(&self) -> bool {
        self.staging.cached.unwrap_or(false)
    }
}

/// Look up a non-empty environment value.
pub fn env_value<'a>(env: &'a HashMap<String, String>, key: &str) -> Option<&'a str> {
    env.get(key)
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
}

/// Interpret an environment toggle. Accepts `true` and `1`.
pub fn env_flag(env: &HashMap<String, String>, key: &str) -> bool {
    env_value(env, key)
        .map(|v| v.eq_ignore_ascii_case("true") || v == "1")
        .unwrap_or(false)
}

/// Load merged configuration from the buildpack and project locations,
/// then apply the environment.
pub fn load_config(
    buildpack_path: &Path,
    project_path: &Path,
    env: &HashMap<String, String>,
) -> Result<Config> {
    let mut config = Config::default();

    if buildpack_path.exists() {
        config.merge(Config::load(buildpack_path)?);
    }

    if project_path.exists() {
        config.merge(Config::load(project_path)?);
    }

    config.apply_env(env);
    Ok(config)
}

/// Get the buildpack config path (`<buildpack>/config.toml`).
pub fn buildpack_config_path(buildpack_dir: &Path) -> PathBuf {
    buildpack_dir.join("config.toml")
}

/// Get the project config path (`<app>/.gostage/config.toml`).
pub fn project_config_path(app_root: &Path) -> PathBuf {
    app_root.join(".gostage").join("config.toml")
}
