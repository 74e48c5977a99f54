//! `gostage detect` command

use std::collections::HashMap;
use std::process::ExitCode;

use anyhow::Result;

use crate::cli::DetectArgs;
use gostage::core::error::StagingError;
use gostage::core::AppTree;
use gostage::detect::detect;
use gostage::ops::stage::report_failure;
use gostage::util::config::Config;
use gostage::util::shell::{Shell, ShellMode};

pub fn execute(args: DetectArgs, shell: &Shell) -> Result<ExitCode> {
    anyhow::ensure!(
        args.app.is_dir(),
        "application directory does not exist: {}",
        args.app.display()
    );

    // Only the environment layer applies; there is no buildpack here.
    let env: HashMap<String, String> = std::env::vars().collect();
    let mut config = Config::default();
    config.apply_env(&env);

    let tree = AppTree::from_config(&args.app, &config);
    let detection = match detect(&tree) {
        Ok(detection) => detection,
        Err(err) => {
            report_failure(shell, &StagingError::from(err));
            return Ok(ExitCode::FAILURE);
        }
    };

    match shell.mode() {
        ShellMode::Json => println!("{}", serde_json::to_string(&detection)?),
        ShellMode::Human => {
            println!("{}", detection.strategy);
            if let Some(import_path) = &detection.metadata.import_path {
                println!("import path: {}", import_path);
            }
        }
    }
    Ok(ExitCode::SUCCESS)
}
