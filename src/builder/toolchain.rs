//! Toolchain and vendor tool installation from fetched artifacts.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use walkdir::WalkDir;

use crate::sources::archive::extract_tarball;
use crate::util::fs::remove_dir_all_if_exists;

/// Leading directory of official Go release tarballs.
const GO_TARBALL_PREFIX: &str = "go";

/// Path of the `go` binary inside a `GOROOT`.
pub fn go_binary(goroot: &Path) -> PathBuf {
    goroot.join("bin").join("go")
}

/// Check for a complete toolchain at `goroot`.
pub fn is_installed(goroot: &Path) -> bool {
    go_binary(goroot).is_file()
}

/// Extract a Go release tarball so that `goroot/bin/go` exists.
pub fn install_toolchain(archive: &Path, goroot: &Path) -> Result<()> {
    remove_dir_all_if_exists(goroot)?;
    extract_tarball(archive, goroot, Some(GO_TARBALL_PREFIX))
        .with_context(|| format!("failed to extract go toolchain into {}", goroot.display()))?;

    if !is_installed(goroot) {
        bail!(
            "toolchain archive {} does not contain bin/go",
            archive.display()
        );
    }
    tracing::debug!("installed go toolchain at {}", goroot.display());
    Ok(())
}

/// Install a single-binary tool into `bin_dir`.
///
/// The artifact is either the binary itself or a tarball containing a file
/// named after the tool somewhere inside it.
pub fn install_tool(artifact: &Path, is_tarball: bool, bin_dir: &Path, name: &str) -> Result<PathBuf> {
    std::fs::create_dir_all(bin_dir)
        .with_context(|| format!("failed to create directory: {}", bin_dir.display()))?;
    let dest = bin_dir.join(name);

    if is_tarball {
        let unpacked = tempfile::tempdir().context("failed to create extraction directory")?;
        extract_tarball(artifact, unpacked.path(), None)?;
        let found = WalkDir::new(unpacked.path())
            .into_iter()
            .filter_map(|e| e.ok())
            .find(|e| e.file_type().is_file() && e.file_name() == name)
            .map(|e| e.into_path());
        let Some(found) = found else {
            bail!("{} does not contain a `{}` binary", artifact.display(), name);
        };
        std::fs::copy(&found, &dest)
            .with_context(|| format!("failed to install {}", dest.display()))?;
    } else {
        std::fs::copy(artifact, &dest)
            .with_context(|| format!("failed to install {}", dest.display()))?;
    }

    make_executable(&dest)?;
    Ok(dest)
}

#[cfg(unix)]
fn make_executable(path: &Path) -> Result<()> {
    use std::os::unix::fs::PermissionsExt;
    std::fs::set_permissions(path, std::fs::Permissions::from_mode(0o755))
        .with_context(|| format!("failed to make {} executable", path.display()))
}

#[cfg(not(unix))]
fn make_executable(_path: &Path) -> Result<()> {
    Ok(())
}
