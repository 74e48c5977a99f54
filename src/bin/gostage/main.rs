//! gostage CLI - staging for Go applications

use std::collections::HashMap;
use std::process::ExitCode;

use anyhow::Result;
use clap::Parser;
use tracing_subscriber::EnvFilter;

mod cli;
mod commands;

use cli::{Cli, Commands};
use gostage::ops::environment::BP_DEBUG;
use gostage::util::config::env_flag;

fn main() -> ExitCode {
    match run() {
        Ok(code) => code,
        Err(e) => {
            eprintln!("error: {:#}", e);
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ExitCode> {
    // Parse CLI
    let cli = Cli::parse();

    let env: HashMap<String, String> = std::env::vars().collect();
    let debug = cli.verbose || env_flag(&env, BP_DEBUG);

    // Set up logging
    let filter = if debug {
        EnvFilter::new("gostage=debug")
    } else {
        EnvFilter::new("gostage=info")
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let shell = commands::shell(cli.message_format, debug);

    // Execute command
    match cli.command {
        Commands::Stage(args) => commands::stage::execute(args, &shell),
        Commands::Detect(args) => commands::detect::execute(args, &shell),
        Commands::Resolve(args) => commands::resolve::execute(args, &shell),
        Commands::Plan(args) => commands::plan::execute(args, &shell),
    }
}
