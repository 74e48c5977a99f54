//! `gostage stage` command

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;

use crate::cli::StageArgs;
use gostage::ops::stage::{load_staging_config, stage, StageOptions};
use gostage::sources::HttpTransport;
use gostage::util::process::SystemExecutor;
use gostage::util::shell::Shell;

pub fn execute(args: StageArgs, shell: &Shell) -> Result<ExitCode> {
    anyhow::ensure!(
        args.app.is_dir(),
        "application directory does not exist: {}",
        args.app.display()
    );

    let ctx = super::staging_context(&args.app, args.dirs);
    let timeout = load_staging_config(&ctx)?.timeout();
    let transport = Arc::new(HttpTransport::new(timeout)?);

    let opts = StageOptions {
        cached: args.cached,
    };

    // Failures are already reported on the staging transcript.
    match stage(&ctx, &opts, transport, &SystemExecutor, shell) {
        Ok(result) => {
            tracing::debug!(binary = %result.binary_path.display(), "staging finished");
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            tracing::debug!(kind = err.kind(), "staging failed");
            Ok(ExitCode::FAILURE)
        }
    }
}
