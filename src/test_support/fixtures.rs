//! Test fixtures for common test scenarios.
//!
//! [`AppFixture`] describes an application tree and materializes it into a
//! fresh temporary directory on every [`AppFixture::build`], so one
//! description can be extended and reused across cases. [`Buildpack`]
//! provides a buildpack directory with a toolchain manifest whose artifacts
//! are real (tiny) tarballs.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use flate2::write::GzEncoder;
use flate2::Compression;
use tempfile::TempDir;

use crate::core::app_tree::AppTree;
use crate::core::manifest::{ManifestEntry, ToolchainManifest, GO};
use crate::sources::ArtifactRef;
use crate::util::context::StagingContext;
use crate::util::hash::sha256_bytes;

use super::RecordingTransport;

/// Description of an application source tree.
#[derive(Debug, Clone, Default)]
pub struct AppFixture {
    files: BTreeMap<PathBuf, String>,
    dirs: Vec<PathBuf>,
    package_name: Option<String>,
    install_packages: Option<Vec<String>>,
}

impl AppFixture {
    pub fn new() -> Self {
        AppFixture::default()
    }

    /// Add a file, creating parent directories as needed.
    pub fn file(mut self, rel: impl AsRef<Path>, contents: &str) -> Self {
        self.files
            .insert(rel.as_ref().to_path_buf(), contents.to_string());
        self
    }

    /// Add an (empty) directory.
    pub fn dir(mut self, rel: impl AsRef<Path>) -> Self {
        self.dirs.push(rel.as_ref().to_path_buf());
        self
    }

    /// Simulate `GOPACKAGENAME`.
    pub fn package_name(mut self, name: &str) -> Self {
        self.package_name = Some(name.to_string());
        self
    }

    /// Simulate `GO_INSTALL_PACKAGE_SPEC`.
    pub fn install_packages(mut self, packages: &[&str]) -> Self {
        self.install_packages = Some(packages.iter().map(|p| p.to_string()).collect());
        self
    }

    /// Write the tree into a new temporary directory.
    pub fn build(&self) -> BuiltApp {
        let tmp = TempDir::new().expect("failed to create temp dir");
        for dir in &self.dirs {
            std::fs::create_dir_all(tmp.path().join(dir)).expect("failed to create dir");
        }
        for (rel, contents) in &self.files {
            let path = tmp.path().join(rel);
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).expect("failed to create dir");
            }
            std::fs::write(&path, contents).expect("failed to write file");
        }

        let tree = AppTree::new(tmp.path())
            .with_package_name(self.package_name.clone())
            .with_install_packages(self.install_packages.clone());
        BuiltApp { _tmp: tmp, tree }
    }
}

/// A materialized [`AppFixture`]. Dropping it removes the tree.
#[derive(Debug)]
pub struct BuiltApp {
    _tmp: TempDir,
    tree: AppTree,
}

impl BuiltApp {
    pub fn root(&self) -> &Path {
        self.tree.root()
    }

    pub fn tree(&self) -> &AppTree {
        &self.tree
    }
}

/// Gzipped tarball bytes holding `entries` (`path`, `contents`).
pub fn tarball_bytes(entries: &[(&str, &str)]) -> Vec<u8> {
    let encoder = GzEncoder::new(Vec::new(), Compression::fast());
    let mut builder = tar::Builder::new(encoder);
    for (path, contents) in entries {
        let mut header = tar::Header::new_gnu();
        header.set_size(contents.len() as u64);
        header.set_mode(0o755);
        header.set_cksum();
        builder
            .append_data(&mut header, path, contents.as_bytes())
            .expect("failed to append tar entry");
    }
    builder
        .into_inner()
        .and_then(|encoder| encoder.finish())
        .expect("failed to finish tarball")
}

/// Write a gzipped tarball holding `entries` to `path`.
pub fn write_tarball(path: &Path, entries: &[(&str, &str)]) {
    std::fs::write(path, tarball_bytes(entries)).expect("failed to write tarball");
}

const ARTIFACT_HOST: &str = "https://buildpacks.example.com/dependencies";

/// A buildpack directory with a manifest, plus cache and deps directories.
#[derive(Debug)]
pub struct Buildpack {
    tmp: TempDir,
    go_tarball: Vec<u8>,
    tools: Vec<(String, String)>,
    manifest: ToolchainManifest,
}

impl Buildpack {
    /// A buildpack offering the given go versions.
    pub fn new(go_versions: &[&str]) -> Self {
        let go_tarball = tarball_bytes(&[
            ("go/bin/go", "#!/bin/sh\necho go\n"),
            ("go/VERSION", "go"),
        ]);
        let sha256 = Some(sha256_bytes(&go_tarball));
        let dependencies = go_versions
            .iter()
            .map(|v| ManifestEntry {
                name: GO.to_string(),
                version: v.to_string(),
                uri: format!("{}/go/go{}.linux-amd64.tar.gz", ARTIFACT_HOST, v),
                sha256: sha256.clone(),
            })
            .collect();

        let buildpack = Buildpack {
            tmp: TempDir::new().expect("failed to create temp dir"),
            go_tarball,
            tools: Vec::new(),
            manifest: ToolchainManifest::new(dependencies),
        };
        buildpack.write_manifest();
        buildpack
    }

    /// Offer a single-binary vendor tool.
    pub fn with_tool(mut self, name: &str, version: &str) -> Self {
        let body = format!("#!/bin/sh\necho {}\n", name);
        self.manifest.dependencies.push(ManifestEntry {
            name: name.to_string(),
            version: version.to_string(),
            uri: format!("{}/{}/{}-{}", ARTIFACT_HOST, name, name, version),
            sha256: Some(sha256_bytes(body.as_bytes())),
        });
        self.tools.push((name.to_string(), body));
        self.write_manifest();
        self
    }

    /// Ship every manifest artifact inside the buildpack.
    pub fn packaged(self) -> Self {
        let packaged = self.buildpack_dir().join("dependencies");
        for entry in &self.manifest.dependencies {
            let path = ArtifactRef::from(entry).path_in(&packaged);
            std::fs::create_dir_all(path.parent().expect("artifact has a parent"))
                .expect("failed to create dir");
            std::fs::write(&path, self.body(entry)).expect("failed to write artifact");
        }
        self
    }

    pub fn buildpack_dir(&self) -> PathBuf {
        self.tmp.path().join("buildpack")
    }

    /// A staging context for an app, sharing this buildpack's cache and deps.
    pub fn context(&self, build_dir: &Path) -> StagingContext {
        StagingContext::new(
            build_dir,
            self.tmp.path().join("cache"),
            self.tmp.path().join("deps"),
            self.buildpack_dir(),
        )
    }

    pub fn go_tarball(&self) -> Vec<u8> {
        self.go_tarball.clone()
    }

    /// A transport serving this buildpack's artifacts.
    pub fn transport(&self) -> RecordingTransport {
        self.manifest
            .dependencies
            .iter()
            .fold(RecordingTransport::new(self.go_tarball()), |t, entry| {
                t.with_body(&entry.uri, self.body(entry))
            })
    }

    fn body(&self, entry: &ManifestEntry) -> Vec<u8> {
        self.tools
            .iter()
            .find(|(name, _)| *name == entry.name)
            .map(|(_, body)| body.as_bytes().to_vec())
            .unwrap_or_else(|| self.go_tarball.clone())
    }

    fn write_manifest(&self) {
        let dir = self.buildpack_dir();
        std::fs::create_dir_all(&dir).expect("failed to create dir");
        let contents = toml::to_string(&self.manifest).expect("manifest serializes");
        std::fs::write(dir.join("manifest.toml"), contents).expect("failed to write manifest");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_fixture_builds_fresh_trees() {
        let app = AppFixture::new()
            .file("vendor/a/a.go", "package a")
            .dir("Godeps/_workspace")
            .package_name("example.com/app");

        let first = app.build();
        let second = app.build();
        assert_ne!(first.root(), second.root());
        assert!(first.root().join("vendor/a/a.go").is_file());
        assert!(first.root().join("Godeps/_workspace").is_dir());
        assert_eq!(first.tree().package_name(), Some("example.com/app"));
    }

    #[test]
    fn test_buildpack_manifest() {
        let buildpack = Buildpack::new(&["1.12.3"]).with_tool("dep", "0.5.4");
        let manifest =
            ToolchainManifest::load(&buildpack.buildpack_dir().join("manifest.toml")).unwrap();
        assert_eq!(manifest.versions(GO), vec!["1.12.3"]);
        assert_eq!(manifest.latest("dep").unwrap().version, "0.5.4");
    }
}
