//! `gostage plan` command

use std::process::ExitCode;
use std::sync::Arc;

use anyhow::Result;

use crate::cli::PlanArgs;
use gostage::ops::stage::{artifact_cache, load_staging_config, report_failure, Stager};
use gostage::sources::HttpTransport;
use gostage::util::process::SystemExecutor;
use gostage::util::shell::Shell;

pub fn execute(args: PlanArgs, shell: &Shell) -> Result<ExitCode> {
    anyhow::ensure!(
        args.app.is_dir(),
        "application directory does not exist: {}",
        args.app.display()
    );

    let ctx = super::staging_context(&args.app, args.dirs);
    let config = load_staging_config(&ctx)?;
    // Planning never fetches; the gateway is only needed to build a Stager.
    let transport = Arc::new(HttpTransport::new(config.timeout())?);
    let cache = artifact_cache(&ctx, config.cached(), transport);

    match Stager::new(&ctx, config, &cache, &SystemExecutor, shell).plan() {
        Ok(plan) => {
            println!("{}", serde_json::to_string_pretty(&plan)?);
            Ok(ExitCode::SUCCESS)
        }
        Err(err) => {
            report_failure(shell, &err);
            Ok(ExitCode::FAILURE)
        }
    }
}
