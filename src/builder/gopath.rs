//! GOPATH workspace preparation.
//!
//! GOPATH-style strategies need the app at `$GOPATH/src/<import path>`.
//! With a temporary GOPATH the app is copied there and the original tree is
//! left untouched; with the GOPATH in the image the app directory itself
//! becomes the GOPATH and its contents are moved under `src/`.
//! Module builds run in place with a temporary GOPATH for the module cache.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tempfile::TempDir;

use crate::core::plan::{BuildPlan, GopathLayout};
use crate::util::fs::{copy_dir_filtered, move_contents_into};
use crate::util::process::{prepend_path, ProcessBuilder};

/// Entries of the app directory that stay in place when it becomes a GOPATH.
///
/// The app's own `bin/` moves with the rest of the source; `GOBIN` is
/// recreated at the app root by the build.
pub const KEEP_IN_PLACE: &[&str] = &[".profile.d", ".gostage"];

/// A prepared build workspace.
#[derive(Debug)]
pub struct Workspace {
    /// First `GOPATH` entry.
    pub gopath: PathBuf,
    /// Full `GOPATH` value, including a godep workspace when present.
    pub gopath_value: String,
    /// Directory the build and hooks run in.
    pub workdir: PathBuf,
    pub gobin: PathBuf,
    _temp: Option<TempDir>,
}

/// Lay out the workspace for a plan.
pub fn prepare(plan: &BuildPlan, build_dir: &Path) -> Result<Workspace> {
    let gobin = plan.bin_dir(build_dir);

    if plan.strategy.is_module() {
        let temp = TempDir::new().context("failed to create temporary GOPATH")?;
        let gopath = temp.path().to_path_buf();
        return Ok(Workspace {
            gopath_value: gopath.display().to_string(),
            gopath,
            workdir: build_dir.to_path_buf(),
            gobin,
            _temp: Some(temp),
        });
    }

    let import_rel = Path::new("src").join(&plan.import_path);
    let (gopath, workdir, temp) = match plan.layout.gopath {
        GopathLayout::Temporary => {
            let temp = TempDir::new().context("failed to create temporary GOPATH")?;
            let workdir = temp.path().join(&import_rel);
            let skip = |rel: &Path| rel.starts_with(".gostage");
            copy_dir_filtered(build_dir, &workdir, &skip).with_context(|| {
                format!("failed to copy app into GOPATH at {}", workdir.display())
            })?;
            (temp.path().to_path_buf(), workdir, Some(temp))
        }
        GopathLayout::InImage => {
            let workdir = move_contents_into(build_dir, &import_rel, KEEP_IN_PLACE)
                .with_context(|| format!("failed to move app into {}", import_rel.display()))?;
            (build_dir.to_path_buf(), workdir, None)
        }
    };

    let gopath_value = if plan.metadata.has_godep_workspace {
        let godep = workdir.join("Godeps").join("_workspace");
        format!("{}:{}", godep.display(), gopath.display())
    } else {
        gopath.display().to_string()
    };

    tracing::debug!(
        "GOPATH={} workdir={}",
        gopath_value,
        workdir.display()
    );

    Ok(Workspace {
        gopath,
        gopath_value,
        workdir,
        gobin,
        _temp: temp,
    })
}

/// Environment shared by every process of a staging run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GoEnv {
    pub goroot: PathBuf,
    pub gopath: String,
    pub gobin: PathBuf,
    pub path: String,
    pub module_mode: bool,
    pub vendor_modules: bool,
}

impl GoEnv {
    pub fn new(
        goroot: &Path,
        workspace: &Workspace,
        tool_bin: &Path,
        base_path: Option<&str>,
        plan: &BuildPlan,
    ) -> Self {
        let path = prepend_path(tool_bin, base_path);
        let path = prepend_path(&goroot.join("bin"), Some(&path));
        GoEnv {
            goroot: goroot.to_path_buf(),
            gopath: workspace.gopath_value.clone(),
            gobin: workspace.gobin.clone(),
            path,
            module_mode: plan.strategy.is_module(),
            vendor_modules: plan.strategy == crate::core::strategy::Strategy::GoModulesVendored,
        }
    }

    pub fn go_binary(&self) -> PathBuf {
        super::toolchain::go_binary(&self.goroot)
    }

    /// Apply this environment to a process.
    pub fn apply(&self, process: ProcessBuilder) -> ProcessBuilder {
        let process = process
            .env("GOROOT", self.goroot.display().to_string())
            .env("GOPATH", &self.gopath)
            .env("GOBIN", self.gobin.display().to_string())
            .env("PATH", &self.path)
            .env("GO111MODULE", if self.module_mode { "on" } else { "off" });

        if self.vendor_modules {
            process.env("GOFLAGS", "-mod=vendor")
        } else {
            process.env_remove("GOFLAGS")
        }
    }
}
