mod agents;
mod catalog;
mod cli;
mod config;
mod error;
mod installed;
mod repository;
mod utils;
mod workflow;

use clap::Parser;
use cli::{Cli, Commands};
use colored::Colorize;
use std::process;
use tracing_subscriber::EnvFilter;

const LOG_ENV: &str = "UPLIFT_LOG";

fn init_logging(verbose: bool) {
    let filter = EnvFilter::try_from_env(LOG_ENV)
        .unwrap_or_else(|_| EnvFilter::new(if verbose { "debug" } else { "warn" }));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let result = match cli.command {
        Commands::Check { id, json } => workflow::execute_check(&cli.path, &id, json),
        Commands::Upgrade {
            all: true,
            filter,
            dry_run,
            json,
            ..
        } => workflow::execute_upgrade_all(&cli.path, filter.as_deref(), dry_run, json),
        Commands::Upgrade { id, version, .. } => match id {
            Some(id) => workflow::execute_upgrade(&cli.path, &id, version.as_deref()),
            None => Err(error::UpliftError::Config(
                "A package id or --all is required".to_string(),
            )),
        },
        Commands::List => workflow::execute_list(&cli.path),
    };

    if let Err(e) = result {
        eprintln!("{} {}", "Error:".red().bold(), e);
        process::exit(e.code().exit_code());
    }
}
