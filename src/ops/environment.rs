//! Environment toggles and the path layout they imply.

use std::collections::HashMap;
use std::path::Path;

use anyhow::Result;

use crate::core::plan::{BuildPlan, GopathLayout, Layout, ToolchainPlacement};
use crate::util::config::env_flag;
use crate::util::context::StagingContext;
use crate::util::fs::write_string;

pub const GO_SETUP_GOPATH_IN_IMAGE: &str = "GO_SETUP_GOPATH_IN_IMAGE";
pub const GO_INSTALL_TOOLS_IN_IMAGE: &str = "GO_INSTALL_TOOLS_IN_IMAGE";
pub const BP_DEBUG: &str = "BP_DEBUG";

/// Environment toggles, read once at the start of a staging run.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EnvToggles {
    pub gopath_in_image: bool,
    pub tools_in_image: bool,
    pub debug: bool,
}

impl EnvToggles {
    pub fn from_env(env: &HashMap<String, String>) -> Self {
        EnvToggles {
            gopath_in_image: env_flag(env, GO_SETUP_GOPATH_IN_IMAGE),
            tools_in_image: env_flag(env, GO_INSTALL_TOOLS_IN_IMAGE),
            debug: env_flag(env, BP_DEBUG),
        }
    }
}

/// Decide where the GOPATH and the toolchain live.
pub fn configure(toggles: &EnvToggles, ctx: &StagingContext) -> Layout {
    let gopath = if toggles.gopath_in_image {
        GopathLayout::InImage
    } else {
        GopathLayout::Temporary
    };

    let (toolchain, toolchain_root) = if toggles.tools_in_image {
        (
            ToolchainPlacement::InImage,
            ctx.build_dir().join(".gostage").join("go"),
        )
    } else {
        (ToolchainPlacement::Staging, ctx.deps_dir().to_path_buf())
    };

    let layout = Layout {
        gopath,
        toolchain,
        toolchain_root,
    };
    tracing::debug!(?layout, "configured staging layout");
    layout
}

/// Write `.profile.d` scripts for what was placed in the image.
pub fn write_profile_scripts(plan: &BuildPlan, build_dir: &Path) -> Result<()> {
    let profile_d = build_dir.join(".profile.d");

    if plan.layout.toolchain == ToolchainPlacement::InImage {
        let goroot = plan
            .toolchain_dir
            .strip_prefix(build_dir)
            .map(|rel| format!("$HOME/{}", rel.display()))
            .unwrap_or_else(|_| plan.toolchain_dir.display().to_string());
        write_string(
            &profile_d.join("go.sh"),
            &format!("export GOROOT={}\nexport PATH=$GOROOT/bin:$PATH\n", goroot),
        )?;
    }

    if plan.layout.gopath == GopathLayout::InImage && !plan.strategy.is_module() {
        write_string(
            &profile_d.join("gopath.sh"),
            "export GOPATH=$HOME\nexport PATH=$GOPATH/bin:$PATH\n",
        )?;
    }

    Ok(())
}
