//! Ordered strategy detection rules.
//!
//! Rules are evaluated top to bottom and the first whose predicate holds
//! classifies the tree. Classification may still fail: a rule that matches
//! owns the tree and its error is final.

use crate::core::app_tree::{marker, AppTree};
use crate::core::error::DetectionError;
use crate::core::strategy::{Detection, Strategy, StrategyMetadata};

use super::markers;

/// Manager name used in the `$GOPACKAGENAME` error for layouts without a tool.
pub const NATIVE_VENDORING: &str = "go native vendoring";

/// Package name used for single-file apps without an override.
pub const DEFAULT_SINGLE_FILE_PACKAGE: &str = "app";

/// One detection rule.
pub struct Rule {
    pub name: &'static str,
    pub matches: fn(&AppTree) -> bool,
    pub classify: fn(&AppTree) -> Result<Detection, DetectionError>,
}

impl std::fmt::Debug for Rule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Rule").field("name", &self.name).finish()
    }
}

/// Detection rules in evaluation order.
pub static RULES: &[Rule] = &[
    Rule {
        name: "godir",
        matches: |t| t.has(marker::GODIR),
        classify: |_| Err(DetectionError::LegacyGodir),
    },
    Rule {
        name: "go-modules",
        matches: |t| t.has(marker::GO_MOD),
        classify: classify_go_modules,
    },
    Rule {
        name: "dep",
        matches: |t| t.has(marker::GOPKG_TOML) || t.has(marker::GOPKG_LOCK),
        classify: classify_dep,
    },
    Rule {
        name: "glide",
        matches: |t| t.has(marker::GLIDE_YAML),
        classify: classify_glide,
    },
    Rule {
        name: "godep",
        matches: |t| t.has(marker::GODEPS_JSON),
        classify: classify_godep,
    },
    Rule {
        name: "govendor",
        matches: |t| t.has(marker::VENDOR_JSON) || t.has(marker::VENDOR_VENDOR_JSON),
        classify: classify_govendor,
    },
    Rule {
        name: "plain-vendor",
        matches: |t| t.vendor_populated() && !t.is_single_file(),
        classify: classify_plain_vendor,
    },
    Rule {
        name: "single-file",
        matches: AppTree::is_single_file,
        classify: classify_single_file,
    },
];

fn base_metadata(tree: &AppTree) -> StrategyMetadata {
    StrategyMetadata {
        vendor_populated: tree.vendor_populated(),
        import_path: tree.package_name().map(str::to_string),
        install_packages: tree.install_packages().map(<[String]>::to_vec),
        custom_install_spec: tree.install_packages().is_some(),
        ..Default::default()
    }
}

fn require_import_path(
    metadata: &StrategyMetadata,
    manager: &str,
) -> Result<(), DetectionError> {
    match metadata.import_path {
        Some(_) => Ok(()),
        None => Err(DetectionError::missing_package_name(manager)),
    }
}

fn classify_go_modules(tree: &AppTree) -> Result<Detection, DetectionError> {
    let go_mod = markers::read_go_mod(&tree.path(marker::GO_MOD))?;
    let mut metadata = base_metadata(tree);
    metadata.has_lockfile = tree.has(marker::GO_SUM);
    metadata.go_version = go_mod.go_version;
    metadata.import_path = metadata.import_path.or(go_mod.module);
    if metadata.install_packages.is_none() && !go_mod.install.is_empty() {
        metadata.install_packages = Some(go_mod.install);
    }
    require_import_path(&metadata, "go modules")?;

    let strategy = if metadata.vendor_populated {
        Strategy::GoModulesVendored
    } else {
        Strategy::GoModules
    };
    Ok(Detection::new(strategy, metadata))
}

fn classify_dep(tree: &AppTree) -> Result<Detection, DetectionError> {
    let mut metadata = base_metadata(tree);
    metadata.has_lockfile = tree.has(marker::GOPKG_LOCK);
    require_import_path(&metadata, "dep")?;

    let strategy = if metadata.vendor_populated {
        Strategy::DepVendored
    } else {
        Strategy::Dep
    };
    Ok(Detection::new(strategy, metadata))
}

fn classify_glide(tree: &AppTree) -> Result<Detection, DetectionError> {
    let glide = markers::read_glide(&tree.path(marker::GLIDE_YAML))?;
    let mut metadata = base_metadata(tree);
    metadata.has_lockfile = tree.has(marker::GLIDE_LOCK);
    metadata.import_path = metadata.import_path.or(glide.package);
    require_import_path(&metadata, "glide")?;

    let strategy = if metadata.vendor_populated {
        Strategy::GlideVendored
    } else {
        Strategy::Glide
    };
    Ok(Detection::new(strategy, metadata))
}

fn classify_godep(tree: &AppTree) -> Result<Detection, DetectionError> {
    let godeps = markers::read_godeps(&tree.path(marker::GODEPS_JSON))?;
    let mut metadata = base_metadata(tree);
    metadata.has_lockfile = true;
    metadata.has_godep_workspace = tree.has_dir(marker::GODEPS_WORKSPACE);

    if !metadata.has_godep_workspace && !tree.has_dir(marker::VENDOR) {
        return Err(DetectionError::MissingVendor);
    }

    metadata.import_path = metadata.import_path.or(godeps.import_path);
    metadata.go_version = godeps.go_version;
    if metadata.install_packages.is_none() && !godeps.packages.is_empty() {
        metadata.install_packages = Some(godeps.packages);
    }
    require_import_path(&metadata, "godep")?;

    Ok(Detection::new(Strategy::GodepWorkspace, metadata))
}

fn classify_govendor(tree: &AppTree) -> Result<Detection, DetectionError> {
    let path = [marker::VENDOR_JSON, marker::VENDOR_VENDOR_JSON]
        .into_iter()
        .map(|rel| tree.path(rel))
        .find(|p| p.is_file())
        .unwrap_or_else(|| tree.path(marker::VENDOR_JSON));
    let govendor = markers::read_govendor(&path)?;

    let mut metadata = base_metadata(tree);
    metadata.has_lockfile = true;
    metadata.import_path = metadata.import_path.or(govendor.root_path);
    require_import_path(&metadata, "govendor")?;

    Ok(Detection::new(Strategy::GovendorJson, metadata))
}

fn classify_plain_vendor(tree: &AppTree) -> Result<Detection, DetectionError> {
    let metadata = base_metadata(tree);
    require_import_path(&metadata, NATIVE_VENDORING)?;
    Ok(Detection::new(Strategy::PlainVendor, metadata))
}

fn classify_single_file(tree: &AppTree) -> Result<Detection, DetectionError> {
    let mut metadata = base_metadata(tree);

    if metadata.vendor_populated {
        require_import_path(&metadata, NATIVE_VENDORING)?;
        return Ok(Detection::new(Strategy::SingleFileVendored, metadata));
    }

    metadata.import_path = metadata
        .import_path
        .or_else(|| Some(DEFAULT_SINGLE_FILE_PACKAGE.to_string()));
    Ok(Detection::new(Strategy::SingleFileNoVendor, metadata))
}
