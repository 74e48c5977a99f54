//! Dependency management strategies.

use std::fmt;

use serde::Serialize;

/// The closed set of dependency-management layouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    GoModules,
    GoModulesVendored,
    Dep,
    DepVendored,
    Glide,
    GlideVendored,
    GodepWorkspace,
    GovendorJson,
    PlainVendor,
    SingleFileNoVendor,
    SingleFileVendored,
    LegacyDeprecated,
}

impl Strategy {
    pub const ALL: [Strategy; 12] = [
        Strategy::GoModules,
        Strategy::GoModulesVendored,
        Strategy::Dep,
        Strategy::DepVendored,
        Strategy::Glide,
        Strategy::GlideVendored,
        Strategy::GodepWorkspace,
        Strategy::GovendorJson,
        Strategy::PlainVendor,
        Strategy::SingleFileNoVendor,
        Strategy::SingleFileVendored,
        Strategy::LegacyDeprecated,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Strategy::GoModules => "go-modules",
            Strategy::GoModulesVendored => "go-modules-vendored",
            Strategy::Dep => "dep",
            Strategy::DepVendored => "dep-vendored",
            Strategy::Glide => "glide",
            Strategy::GlideVendored => "glide-vendored",
            Strategy::GodepWorkspace => "godep-workspace",
            Strategy::GovendorJson => "govendor-json",
            Strategy::PlainVendor => "plain-vendor",
            Strategy::SingleFileNoVendor => "single-file-no-vendor",
            Strategy::SingleFileVendored => "single-file-vendored",
            Strategy::LegacyDeprecated => "legacy-deprecated",
        }
    }

    /// Dependencies are already inside the tree.
    pub fn is_vendored(&self) -> bool {
        matches!(
            self,
            Strategy::GoModulesVendored
                | Strategy::DepVendored
                | Strategy::GlideVendored
                | Strategy::GovendorJson
                | Strategy::PlainVendor
                | Strategy::SingleFileVendored
        )
    }

    /// Built with module-aware `go install` rather than inside a GOPATH.
    pub fn is_module(&self) -> bool {
        matches!(self, Strategy::GoModules | Strategy::GoModulesVendored)
    }

    /// The external tool that populates `vendor/`, if any.
    pub fn vendor_tool(&self) -> Option<&'static str> {
        match self {
            Strategy::Dep => Some("dep"),
            Strategy::Glide => Some("glide"),
            _ => None,
        }
    }
}

impl fmt::Display for Strategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Facts gathered from the tree alongside the strategy tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct StrategyMetadata {
    /// A lockfile pins dependency versions (`Gopkg.lock`, `glide.lock`, `go.sum`).
    pub has_lockfile: bool,

    /// `vendor/` is a non-empty directory.
    pub vendor_populated: bool,

    /// `Godeps/_workspace` exists.
    pub has_godep_workspace: bool,

    /// Import path, from the package-name override or a marker file.
    pub import_path: Option<String>,

    /// Install packages, from the override or a marker file.
    pub install_packages: Option<Vec<String>>,

    /// Version constraint found in a marker file.
    pub go_version: Option<String>,

    /// Install packages came from the user's explicit configuration.
    pub custom_install_spec: bool,
}

/// Result of strategy detection. Immutable once produced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Detection {
    pub strategy: Strategy,
    pub metadata: StrategyMetadata,
}

impl Detection {
    pub fn new(strategy: Strategy, metadata: StrategyMetadata) -> Self {
        Detection { strategy, metadata }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_are_unique() {
        let mut names: Vec<_> = Strategy::ALL.iter().map(Strategy::as_str).collect();
        names.sort();
        names.dedup();
        assert_eq!(names.len(), Strategy::ALL.len());
    }

    #[test]
    fn test_serialized_tag_matches_display() {
        for strategy in Strategy::ALL {
            let json = serde_json::to_string(&strategy).unwrap();
            assert_eq!(json, format!("\"{}\"", strategy));
        }
    }

    #[test]
    fn test_vendor_tool_only_for_unvendored_managers() {
        assert_eq!(Strategy::Glide.vendor_tool(), Some("glide"));
        assert_eq!(Strategy::GlideVendored.vendor_tool(), None);
        assert!(Strategy::Dep.vendor_tool().is_some());
        assert!(Strategy::ALL
            .iter()
            .filter(|s| s.is_vendored())
            .all(|s| s.vendor_tool().is_none()));
    }
}
