//! The resolved decisions of one staging run.

use std::path::{Path, PathBuf};

use serde::Serialize;

use super::strategy::{Strategy, StrategyMetadata};

/// Where the GOPATH used for the build lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum GopathLayout {
    /// A throwaway directory; the app is copied into `src/<import path>`.
    Temporary,
    /// The app directory itself; the app is moved into `src/<import path>`.
    InImage,
}

/// Where the Go toolchain is installed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum ToolchainPlacement {
    /// Under the staging dependencies directory; not part of the image.
    Staging,
    /// Under `<app>/.gostage/go`, with a profile script for runtime.
    InImage,
}

/// Path decisions derived from the environment toggles.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Layout {
    pub gopath: GopathLayout,
    pub toolchain: ToolchainPlacement,
    /// Directory the toolchain's parent is placed in; the version is appended.
    pub toolchain_root: PathBuf,
}

impl Layout {
    /// Final `GOROOT` for a toolchain version.
    pub fn toolchain_dir(&self, version: &str) -> PathBuf {
        match self.toolchain {
            ToolchainPlacement::Staging => self.toolchain_root.join(format!("go{}", version)),
            ToolchainPlacement::InImage => self.toolchain_root.clone(),
        }
    }
}

/// Everything needed to install the toolchain and build the app.
///
/// Built once per staging run and never modified afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BuildPlan {
    pub go_version: String,
    pub strategy: Strategy,
    pub metadata: StrategyMetadata,
    /// Import path of the main package (module path for module builds).
    pub import_path: String,
    pub install_packages: Vec<String>,
    pub tags: Vec<String>,
    pub buildmode: Option<String>,
    pub ldflags: Vec<String>,
    pub layout: Layout,
    pub toolchain_dir: PathBuf,
    pub before_compile: Vec<PathBuf>,
    pub after_compile: Vec<PathBuf>,
    pub binary_name: String,
    pub start_command: String,
}

impl BuildPlan {
    /// Directory `go install` writes binaries to.
    pub fn bin_dir(&self, build_dir: &Path) -> PathBuf {
        build_dir.join("bin")
    }
}

/// Successful outcome of a staging run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StagingResult {
    pub go_version: String,
    pub strategy: Strategy,
    pub binary_path: PathBuf,
    pub start_command: String,
}

/// Name of the binary produced for the first install package.
///
/// `.` and `./...` name the package at the import path itself.
pub fn binary_name(install_packages: &[String], import_path: &str) -> String {
    let first = install_packages.first().map(String::as_str).unwrap_or(".");
    let first = first.trim_end_matches("/...");
    let package = match first {
        "." | "..." | "" => import_path,
        other => other,
    };
    package
        .trim_end_matches('/')
        .rsplit('/')
        .next()
        .filter(|s| !s.is_empty() && *s != ".")
        .unwrap_or("app")
        .to_string()
}

/// The process command used to start the app.
pub fn start_command(procfile_web: Option<String>, binary: &str) -> String {
    procfile_web.unwrap_or_else(|| format!("./bin/{}", binary))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pkgs(p: &[&str]) -> Vec<String> {
        p.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_binary_name() {
        assert_eq!(binary_name(&pkgs(&["."]), "github.com/org/api"), "api");
        assert_eq!(binary_name(&pkgs(&["./..."]), "github.com/org/api"), "api");
        assert_eq!(binary_name(&[], "example.com/web/"), "web");
        assert_eq!(binary_name(&pkgs(&["./cmd/app"]), "github.com/org/api"), "app");
        assert_eq!(
            binary_name(&pkgs(&["github.com/full/path/cmd/server", "./cmd/other"]), "x"),
            "server"
        );
        assert_eq!(binary_name(&pkgs(&["./cmd/..."]), "x"), "cmd");
    }

    #[test]
    fn test_start_command() {
        assert_eq!(start_command(None, "api"), "./bin/api");
        assert_eq!(start_command(Some("./bin/api -v".into()), "api"), "./bin/api -v");
    }

    #[test]
    fn test_toolchain_dir() {
        let staging = Layout {
            gopath: GopathLayout::Temporary,
            toolchain: ToolchainPlacement::Staging,
            toolchain_root: PathBuf::from("/deps"),
        };
        assert_eq!(staging.toolchain_dir("1.12.3"), PathBuf::from("/deps/go1.12.3"));

        let image = Layout {
            toolchain: ToolchainPlacement::InImage,
            toolchain_root: PathBuf::from("/app/.gostage/go"),
            ..staging
        };
        assert_eq!(image.toolchain_dir("1.12.3"), PathBuf::from("/app/.gostage/go"));
    }
}
