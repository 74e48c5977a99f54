//! Tarball extraction.

use std::fs::File;
use std::path::{Component, Path, PathBuf};

use anyhow::{bail, Context, Result};
use flate2::read::GzDecoder;
use tar::Archive;

/// Extract a `.tar.gz` file into `dest`.
///
/// When `strip_prefix` is given, entries under that leading directory are
/// placed directly in `dest` (`go/bin/go` becomes `bin/go` for `"go"`) and
/// the prefix directory entry itself is skipped.
pub fn extract_tarball(archive: &Path, dest: &Path, strip_prefix: Option<&str>) -> Result<()> {
    let file = File::open(archive)
        .with_context(|| format!("failed to open archive: {}", archive.display()))?;
    let mut archive_reader = Archive::new(GzDecoder::new(file));

    std::fs::create_dir_all(dest)
        .with_context(|| format!("failed to create destination directory: {}", dest.display()))?;

    for entry in archive_reader
        .entries()
        .with_context(|| format!("failed to read entries of {}", archive.display()))?
    {
        let mut entry = entry.context("failed to read tarball entry")?;
        let entry_path = entry.path().context("failed to get entry path")?.into_owned();

        let Some(relative) = output_relative(&entry_path, strip_prefix) else {
            continue;
        };
        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::RootDir | Component::Prefix(_)))
        {
            bail!(
                "tarball entry escapes destination directory: {}",
                entry_path.display()
            );
        }

        let output_path = dest.join(&relative);
        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create directory: {}", parent.display()))?;
        }

        let entry_type = entry.header().entry_type();
        match entry_type {
            tar::EntryType::Directory => {
                std::fs::create_dir_all(&output_path).with_context(|| {
                    format!("failed to create directory: {}", output_path.display())
                })?;
            }
            tar::EntryType::Regular
            | tar::EntryType::Continuous
            | tar::EntryType::Link
            | tar::EntryType::Symlink => {
                entry.unpack(&output_path).with_context(|| {
                    format!("failed to extract file: {}", output_path.display())
                })?;
            }
            _ => {
                tracing::debug!(
                    "skipping unsupported entry type {:?}: {}",
                    entry_type,
                    entry_path.display()
                );
            }
        }
    }

    Ok(())
}

fn output_relative(entry_path: &Path, strip_prefix: Option<&str>) -> Option<PathBuf> {
    let normalized: PathBuf = entry_path
        .components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect();

    let relative = match strip_prefix {
        Some(prefix) => {
            let prefix = Path::new(prefix.trim_end_matches('/'));
            match normalized.strip_prefix(prefix) {
                Ok(rest) => rest.to_path_buf(),
                Err(_) => normalized,
            }
        }
        None => normalized,
    };

    (!relative.as_os_str().is_empty()).then_some(relative)
}
