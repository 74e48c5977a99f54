//! Filesystem utilities.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use walkdir::WalkDir;

/// Recursively copy a directory, skipping any entry for which `skip`
/// returns true (paths are relative to `src`).
pub fn copy_dir_filtered(src: &Path, dst: &Path, skip: &dyn Fn(&Path) -> bool) -> Result<()> {
    ensure_dir(dst)?;

    let walker = WalkDir::new(src).min_depth(1).into_iter().filter_entry(|e| {
        e.path()
            .strip_prefix(src)
            .map(|rel| !skip(rel))
            .unwrap_or(true)
    });

    for entry in walker {
        let entry = entry.with_context(|| format!("failed to walk {}", src.display()))?;
        let rel = entry.path().strip_prefix(src)?;
        let target = dst.join(rel);
        let ty = entry.file_type();

        if ty.is_dir() {
            ensure_dir(&target)?;
        } else if ty.is_symlink() {
            copy_symlink(entry.path(), &target)?;
        } else {
            fs::copy(entry.path(), &target).with_context(|| {
                format!(
                    "failed to copy {} to {}",
                    entry.path().display(),
                    target.display()
                )
            })?;
        }
    }
    Ok(())
}

#[cfg(unix)]
fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    let target = fs::read_link(src)
        .with_context(|| format!("failed to read symlink: {}", src.display()))?;
    std::os::unix::fs::symlink(&target, dst)
        .with_context(|| format!("failed to create symlink: {}", dst.display()))
}

#[cfg(not(unix))]
fn copy_symlink(src: &Path, dst: &Path) -> Result<()> {
    fs::copy(src, dst)
        .with_context(|| format!("failed to copy {} to {}", src.display(), dst.display()))?;
    Ok(())
}

/// Move every top-level entry of `dir` (except those named in `keep`) into
/// `dir/<dest_rel>`.
///
/// Used to relocate an app into a GOPATH rooted at the app directory itself.
pub fn move_contents_into(dir: &Path, dest_rel: &Path, keep: &[&str]) -> Result<PathBuf> {
    let staging = tempfile::Builder::new()
        .prefix(".gostage-move")
        .tempdir_in(dir)
        .with_context(|| format!("failed to create staging dir in {}", dir.display()))?;
    let staging_name = staging.path().file_name().map(|n| n.to_os_string());

    for entry in list_dir(dir)? {
        let Some(name) = entry.file_name() else {
            continue;
        };
        if staging_name.as_deref() == Some(name) {
            continue;
        }
        if name.to_str().is_some_and(|n| keep.contains(&n)) {
            continue;
        }
        let to = staging.path().join(name);
        fs::rename(&entry, &to).with_context(|| {
            format!("failed to move {} to {}", entry.display(), to.display())
        })?;
    }

    let dest = dir.join(dest_rel);
    if let Some(parent) = dest.parent() {
        ensure_dir(parent)?;
    }
    let staged = staging.keep();
    fs::rename(&staged, &dest)
        .with_context(|| format!("failed to move app into {}", dest.display()))?;
    Ok(dest)
}

/// List the entries of a directory, sorted.
pub fn list_dir(dir: &Path) -> Result<Vec<PathBuf>> {
    let mut entries = fs::read_dir(dir)
        .with_context(|| format!("failed to read directory: {}", dir.display()))?
        .map(|e| e.map(|e| e.path()))
        .collect::<std::io::Result<Vec<_>>>()
        .with_context(|| format!("failed to read directory: {}", dir.display()))?;
    entries.sort();
    Ok(entries)
}

/// Check whether `dir` is a directory with at least one entry.
pub fn is_non_empty_dir(dir: &Path) -> bool {
    fs::read_dir(dir)
        .map(|mut entries| entries.next().is_some())
        .unwrap_or(false)
}

/// Remove a directory and all its contents, if it exists.
pub fn remove_dir_all_if_exists(path: &Path) -> Result<()> {
    if path.exists() {
        fs::remove_dir_all(path)
            .with_context(|| format!("failed to remove directory: {}", path.display()))?;
    }
    Ok(())
}

/// Ensure a directory exists, creating it if necessary.
pub fn ensure_dir(path: &Path) -> Result<()> {
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("failed to create directory: {}", path.display()))?;
    }
    Ok(())
}

/// Write a string to a file, creating parent directories if needed.
pub fn write_string(path: &Path, contents: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        ensure_dir(parent)?;
    }
    fs::write(path, contents)
        .with_context(|| format!("failed to write file: {}", path.display()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_copy_dir_filtered_skips() {
        let tmp = TempDir::new().unwrap();
        let src = tmp.path().join("src");
        fs::create_dir_all(src.join("vendor/a")).unwrap();
        fs::create_dir_all(src.join(".git")).unwrap();
        fs::write(src.join("main.go"), "package main").unwrap();
        fs::write(src.join("vendor/a/a.go"), "package a").unwrap();
        fs::write(src.join(".git/HEAD"), "ref").unwrap();

        let dst = tmp.path().join("dst");
        copy_dir_filtered(&src, &dst, &|rel| rel == Path::new(".git")).unwrap();

        assert!(dst.join("main.go").exists());
        assert!(dst.join("vendor/a/a.go").exists());
        assert!(!dst.join(".git").exists());
    }

    #[test]
    fn test_move_contents_into() {
        let tmp = TempDir::new().unwrap();
        let app = tmp.path();
        fs::write(app.join("main.go"), "package main").unwrap();
        fs::create_dir_all(app.join(".profile.d")).unwrap();

        let dest = move_contents_into(app, Path::new("src/example.com/app"), &[".profile.d"])
            .unwrap();

        assert_eq!(dest, app.join("src/example.com/app"));
        assert!(dest.join("main.go").exists());
        assert!(!app.join("main.go").exists());
        assert!(app.join(".profile.d").exists());
        assert!(!list_dir(app).unwrap().iter().any(|p| p
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with(".gostage-move"))));
    }

    #[test]
    fn test_is_non_empty_dir() {
        let tmp = TempDir::new().unwrap();
        let vendor = tmp.path().join("vendor");
        assert!(!is_non_empty_dir(&vendor));
        fs::create_dir(&vendor).unwrap();
        assert!(!is_non_empty_dir(&vendor));
        fs::write(vendor.join("modules.txt"), "").unwrap();
        assert!(is_non_empty_dir(&vendor));
    }
}
