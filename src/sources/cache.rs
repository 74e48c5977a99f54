//! Artifact cache gateway.
//!
//! Resolves an artifact reference to a local file. Artifacts live at
//! `<root>/<key>/<file name>` where the key is derived from the URL.
//!
//! In offline mode the only source is the buildpack's packaged dependency
//! directory (same layout); the transport is never called and a miss is
//! fatal. In online mode every reference is fetched through the transport
//! once per gateway; later and concurrent requests for the same key wait
//! for that fetch and reuse its file.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::core::error::FetchError;
use crate::core::manifest::ManifestEntry;
use crate::util::hash::{sha256_file, short_hash};
use crate::util::shell::Shell;

use super::transport::Transport;

/// A reference to a downloadable artifact.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactRef {
    pub url: String,
    pub file_name: String,
    pub sha256: Option<String>,
}

impl ArtifactRef {
    pub fn new(url: impl Into<String>, file_name: impl Into<String>) -> Self {
        ArtifactRef {
            url: url.into(),
            file_name: file_name.into(),
            sha256: None,
        }
    }

    pub fn with_sha256(mut self, sha256: Option<String>) -> Self {
        self.sha256 = sha256.filter(|s| !s.is_empty());
        self
    }

    /// Deterministic cache key for this reference.
    pub fn cache_key(&self) -> String {
        short_hash(&self.url)
    }

    /// Location of the artifact under a cache root.
    pub fn path_in(&self, root: &Path) -> PathBuf {
        root.join(self.cache_key()).join(&self.file_name)
    }
}

impl From<&ManifestEntry> for ArtifactRef {
    fn from(entry: &ManifestEntry) -> Self {
        ArtifactRef::new(entry.uri.clone(), entry.file_name()).with_sha256(entry.sha256.clone())
    }
}

/// Where artifacts may come from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CacheMode {
    /// Fetch through the transport.
    Online,
    /// Serve only from a packaged dependency directory.
    Offline { packaged: PathBuf },
}

/// Shared gateway between staging runs and the artifact transport.
pub struct ArtifactCache {
    root: PathBuf,
    mode: CacheMode,
    transport: Arc<dyn Transport>,
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    populated: Mutex<HashSet<String>>,
}

impl std::fmt::Debug for ArtifactCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ArtifactCache")
            .field("root", &self.root)
            .field("mode", &self.mode)
            .finish_non_exhaustive()
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl ArtifactCache {
    pub fn new(root: impl Into<PathBuf>, mode: CacheMode, transport: Arc<dyn Transport>) -> Self {
        ArtifactCache {
            root: root.into(),
            mode,
            transport,
            locks: Mutex::new(HashMap::new()),
            populated: Mutex::new(HashSet::new()),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn mode(&self) -> &CacheMode {
        &self.mode
    }

    pub fn is_offline(&self) -> bool {
        matches!(self.mode, CacheMode::Offline { .. })
    }

    /// Check for a cached copy without fetching anything.
    pub fn is_cached(&self, artifact: &ArtifactRef) -> bool {
        match &self.mode {
            CacheMode::Offline { packaged } => artifact.path_in(packaged).is_file(),
            CacheMode::Online => lock(&self.populated).contains(&artifact.cache_key()),
        }
    }

    /// Resolve an artifact to a local file.
    pub fn fetch(&self, artifact: &ArtifactRef, shell: &Shell) -> Result<PathBuf, FetchError> {
        let key = artifact.cache_key();
        let key_lock = lock(&self.locks)
            .entry(key.clone())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let result = {
            let _guard = lock(&key_lock);
            match &self.mode {
                CacheMode::Offline { packaged } => self.fetch_offline(artifact, packaged, shell),
                CacheMode::Online => self.fetch_online(artifact, &key, shell),
            }
        };
        self.release(&key, key_lock);
        result
    }

    /// Drop the per-key lock once no other caller is waiting on it.
    fn release(&self, key: &str, key_lock: Arc<Mutex<()>>) {
        let mut locks = lock(&self.locks);
        if Arc::strong_count(&key_lock) == 2 {
            locks.remove(key);
        }
    }

    fn fetch_offline(
        &self,
        artifact: &ArtifactRef,
        packaged: &Path,
        shell: &Shell,
    ) -> Result<PathBuf, FetchError> {
        let source = artifact.path_in(packaged);
        if !source.is_file() {
            tracing::debug!("cache miss for {} at {}", artifact.url, source.display());
            return Err(FetchError::NotCached {
                url: artifact.url.clone(),
            });
        }

        tracing::debug!("cache hit for {}", artifact.url);
        shell.info(format_args!("Copy [{}]", source.display()));
        verify_checksum(artifact, &source)?;
        Ok(source)
    }

    fn fetch_online(
        &self,
        artifact: &ArtifactRef,
        key: &str,
        shell: &Shell,
    ) -> Result<PathBuf, FetchError> {
        let dest = artifact.path_in(&self.root);
        if lock(&self.populated).contains(key) && dest.is_file() {
            tracing::debug!("reusing {} fetched earlier in this run", artifact.url);
            return Ok(dest);
        }

        let dir = self.root.join(key);
        std::fs::create_dir_all(&dir).map_err(|e| FetchError::io(&dir, e))?;

        let partial = dir.join(format!("{}.partial", artifact.file_name));
        let fetched = self
            .transport
            .fetch(&artifact.url, &partial, shell)
            .and_then(|()| verify_checksum(artifact, &partial));
        if let Err(err) = fetched {
            let _ = std::fs::remove_file(&partial);
            return Err(err);
        }

        std::fs::rename(&partial, &dest).map_err(|e| FetchError::io(&dest, e))?;
        lock(&self.populated).insert(key.to_string());
        tracing::debug!("stored {} at {}", artifact.url, dest.display());
        Ok(dest)
    }
}

fn verify_checksum(artifact: &ArtifactRef, path: &Path) -> Result<(), FetchError> {
    let Some(expected) = &artifact.sha256 else {
        return Ok(());
    };

    let actual = sha256_file(path).map_err(|e| {
        FetchError::io(
            path,
            std::io::Error::other(e.to_string()),
        )
    })?;
    if !actual.eq_ignore_ascii_case(expected) {
        return Err(FetchError::ChecksumMismatch {
            url: artifact.url.clone(),
            expected: expected.clone(),
            actual,
        });
    }

    tracing::debug!("checksum verified for {}", artifact.url);
    Ok(())
}
