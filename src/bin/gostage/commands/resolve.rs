//! `gostage resolve` command

use std::process::ExitCode;

use anyhow::Result;

use crate::cli::ResolveArgs;
use gostage::core::error::StagingError;
use gostage::core::manifest::{ToolchainManifest, GO};
use gostage::ops::stage::report_failure;
use gostage::resolver::resolve;
use gostage::util::shell::Shell;

pub fn execute(args: ResolveArgs, shell: &Shell) -> Result<ExitCode> {
    let manifest = ToolchainManifest::load(&args.manifest)?;

    match resolve(args.constraint.as_deref(), &manifest.versions(GO)) {
        Ok(version) => {
            println!("{}", version);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            report_failure(shell, &StagingError::from(err));
            Ok(ExitCode::FAILURE)
        }
    }
}
