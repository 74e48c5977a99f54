//! Read-only view of a pushed application tree.

use std::path::{Path, PathBuf};

use crate::util::config::Config;
use crate::util::fs::is_non_empty_dir;

/// Marker files consulted during strategy detection.
pub mod marker {
    pub const GODIR: &str = ".godir";
    pub const GO_MOD: &str = "go.mod";
    pub const GO_SUM: &str = "go.sum";
    pub const VENDOR: &str = "vendor";
    pub const GOPKG_TOML: &str = "Gopkg.toml";
    pub const GOPKG_LOCK: &str = "Gopkg.lock";
    pub const GLIDE_YAML: &str = "glide.yaml";
    pub const GLIDE_LOCK: &str = "glide.lock";
    pub const GODEPS_JSON: &str = "Godeps/Godeps.json";
    pub const GODEPS_WORKSPACE: &str = "Godeps/_workspace";
    pub const VENDOR_JSON: &str = "vendor.json";
    pub const VENDOR_VENDOR_JSON: &str = "vendor/vendor.json";
    pub const PROCFILE: &str = "Procfile";
}

/// An application source directory plus the user's explicit overrides.
///
/// The tree is never modified through this type.
#[derive(Debug, Clone)]
pub struct AppTree {
    root: PathBuf,
    package_name: Option<String>,
    install_packages: Option<Vec<String>>,
}

impl AppTree {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        AppTree {
            root: root.into(),
            package_name: None,
            install_packages: None,
        }
    }

    /// Create a view carrying the overrides from the merged configuration.
    pub fn from_config(root: impl Into<PathBuf>, config: &Config) -> Self {
        AppTree::new(root)
            .with_package_name(config.go.package_name.clone())
            .with_install_packages(config.go.install_packages.clone())
    }

    pub fn with_package_name(mut self, name: Option<String>) -> Self {
        self.package_name = name.filter(|n| !n.trim().is_empty());
        self
    }

    pub fn with_install_packages(mut self, packages: Option<Vec<String>>) -> Self {
        self.install_packages = packages.filter(|p| !p.is_empty());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn package_name(&self) -> Option<&str> {
        self.package_name.as_deref()
    }

    pub fn install_packages(&self) -> Option<&[String]> {
        self.install_packages.as_deref()
    }

    /// Resolve a path relative to the tree root.
    pub fn path(&self, rel: &str) -> PathBuf {
        self.root.join(rel)
    }

    /// Check whether a marker file or directory exists.
    pub fn has(&self, rel: &str) -> bool {
        self.path(rel).exists()
    }

    pub fn has_dir(&self, rel: &str) -> bool {
        self.path(rel).is_dir()
    }

    /// `vendor/` exists and contains at least one entry.
    pub fn vendor_populated(&self) -> bool {
        is_non_empty_dir(&self.path(marker::VENDOR))
    }

    /// Top-level Go source files, excluding tests, sorted by name.
    pub fn top_level_go_files(&self) -> Vec<PathBuf> {
        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return Vec::new();
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(|e| e.ok())
            .map(|e| e.path())
            .filter(|p| p.is_file())
            .filter(|p| {
                p.file_name()
                    .and_then(|n| n.to_str())
                    .is_some_and(|n| n.ends_with(".go") && !n.ends_with("_test.go"))
            })
            .collect();
        files.sort();
        files
    }

    /// The tree holds exactly one top-level Go file and no subpackages
    /// other than `vendor/`.
    pub fn is_single_file(&self) -> bool {
        if self.top_level_go_files().len() != 1 {
            return false;
        }

        let Ok(entries) = std::fs::read_dir(&self.root) else {
            return false;
        };
        !entries.filter_map(|e| e.ok()).any(|e| {
            let path = e.path();
            let name = e.file_name();
            let name = name.to_string_lossy();
            path.is_dir()
                && name != marker::VENDOR
                && !name.starts_with('.')
                && contains_go_source(&path)
        })
    }

    /// Read the `web:` entry of a `Procfile`, if any.
    pub fn procfile_web(&self) -> Option<String> {
        let contents = std::fs::read_to_string(self.path(marker::PROCFILE)).ok()?;
        contents.lines().find_map(|line| {
            let (kind, command) = line.split_once(':')?;
            (kind.trim() == "web")
                .then(|| command.trim().to_string())
                .filter(|c| !c.is_empty())
        })
    }
}

fn contains_go_source(dir: &Path) -> bool {
    walkdir::WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .any(|e| e.file_type().is_file() && e.path().extension().is_some_and(|ext| ext == "go"))
}
