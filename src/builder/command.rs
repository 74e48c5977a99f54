//! `go install` command composition.

use std::path::Path;

use serde::Serialize;

use crate::core::plan::BuildPlan;
use crate::core::strategy::{Strategy, StrategyMetadata};
use crate::util::process::{quote_arg, ProcessBuilder};

/// A composed `go install` invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GoInstall {
    pub tags: Vec<String>,
    pub buildmode: Option<String>,
    pub ldflags: Vec<String>,
    pub packages: Vec<String>,
}

impl GoInstall {
    /// Arguments following the `go` program name.
    pub fn args(&self) -> Vec<String> {
        let mut args = vec!["install".to_string()];

        let tags: Vec<&str> = self
            .tags
            .iter()
            .map(|t| t.trim())
            .filter(|t| !t.is_empty())
            .collect();
        if !tags.is_empty() {
            args.push("-tags".to_string());
            args.push(tags.join(","));
        }

        if let Some(mode) = self.buildmode.as_deref().filter(|m| !m.is_empty()) {
            args.push("-buildmode".to_string());
            args.push(mode.to_string());
        }

        let ldflags = self
            .ldflags
            .iter()
            .map(|f| f.trim())
            .filter(|f| !f.is_empty())
            .collect::<Vec<_>>()
            .join(" ");
        if !ldflags.is_empty() {
            args.push("-ldflags".to_string());
            args.push(ldflags);
        }

        args.extend(self.packages.iter().cloned());
        args
    }

    /// The command line exactly as logged to the user.
    pub fn display(&self) -> String {
        std::iter::once("go".to_string())
            .chain(self.args().iter().map(|a| quote_arg(a)))
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// A process running this command with the given `go` binary.
    pub fn to_process(&self, go: &Path) -> ProcessBuilder {
        ProcessBuilder::new(go).args(self.args())
    }
}

/// Default packages to install when none are configured.
///
/// Every strategy installs the package at its import path; module builds
/// use the module path.
pub fn default_install_packages(
    strategy: Strategy,
    metadata: &StrategyMetadata,
    import_path: &str,
) -> Vec<String> {
    match &metadata.install_packages {
        Some(packages) if !packages.is_empty() => packages.clone(),
        _ => {
            tracing::debug!("no install packages configured for {}, using import path", strategy);
            vec![import_path.to_string()]
        }
    }
}

/// Compose the build command for a plan.
pub fn compose(plan: &BuildPlan) -> GoInstall {
    let install = GoInstall {
        tags: plan.tags.clone(),
        buildmode: plan.buildmode.clone(),
        ldflags: plan.ldflags.clone(),
        packages: plan.install_packages.clone(),
    };
    tracing::trace!("composed build command: {}", install.display());
    install
}
