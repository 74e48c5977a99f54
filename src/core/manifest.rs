//! Buildpack dependency manifest (`manifest.toml`).
//!
//! Lists every artifact the buildpack can install: Go toolchains and the
//! vendor tools (`glide`, `dep`). Entries are ordered as written; version
//! selection never depends on that order.
//!
//! ```toml
//! [[dependencies]]
//! name = "go"
//! version = "1.12.3"
//! uri = "https://dl.google.com/go/go1.12.3.linux-amd64.tar.gz"
//! sha256 = "3924819eed16e55114f02d25d03e77c916ec40b7fd15c8acb5838b63135b03df"
//! ```

use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use url::Url;

use crate::resolver::version::parse_version_lenient;

/// Name of the Go toolchain dependency.
pub const GO: &str = "go";

/// One installable artifact.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ManifestEntry {
    pub name: String,
    pub version: String,
    pub uri: String,
    #[serde(default)]
    pub sha256: Option<String>,
}

impl ManifestEntry {
    /// Parsed download reference.
    pub fn url(&self) -> Result<Url> {
        Url::parse(&self.uri)
            .with_context(|| format!("invalid uri for {} {}: {}", self.name, self.version, self.uri))
    }

    /// File name the artifact is stored under.
    pub fn file_name(&self) -> String {
        self.url()
            .ok()
            .and_then(|u| {
                u.path_segments()
                    .and_then(|mut s| s.next_back().map(str::to_string))
            })
            .filter(|s| !s.is_empty())
            .unwrap_or_else(|| format!("{}-{}", self.name, self.version))
    }

    /// Whether the artifact is a gzip-compressed tarball.
    pub fn is_tarball(&self) -> bool {
        let name = self.file_name();
        name.ends_with(".tar.gz") || name.ends_with(".tgz")
    }
}

/// The ordered list of artifacts available for installation.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolchainManifest {
    #[serde(default)]
    pub dependencies: Vec<ManifestEntry>,
}

impl ToolchainManifest {
    /// Load a manifest from a file.
    pub fn load(path: &Path) -> Result<Self> {
        let contents = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read manifest: {}", path.display()))?;
        Self::parse(&contents)
            .with_context(|| format!("failed to parse manifest: {}", path.display()))
    }

    pub fn parse(contents: &str) -> Result<Self> {
        Ok(toml::from_str(contents)?)
    }

    pub fn new(dependencies: Vec<ManifestEntry>) -> Self {
        ToolchainManifest { dependencies }
    }

    /// Versions listed for a dependency, in manifest order.
    pub fn versions(&self, name: &str) -> Vec<&str> {
        self.dependencies
            .iter()
            .filter(|d| d.name == name)
            .map(|d| d.version.as_str())
            .collect()
    }

    /// Find the entry for an exact version.
    pub fn entry(&self, name: &str, version: &str) -> Option<&ManifestEntry> {
        self.dependencies
            .iter()
            .find(|d| d.name == name && d.version == version)
    }

    /// The numerically greatest entry for a dependency.
    pub fn latest(&self, name: &str) -> Option<&ManifestEntry> {
        self.dependencies
            .iter()
            .filter(|d| d.name == name)
            .filter_map(|d| parse_version_lenient(&d.version).map(|v| (v, d)))
            .max_by(|(a, _), (b, _)| a.cmp(b))
            .map(|(_, d)| d)
    }
}
