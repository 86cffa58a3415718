//! `mytask` command-line client.
//!
//! # Responsibility
//! - Parse arguments, load configuration and start stderr logging.
//! - Hand off to `handlers::dispatch` and map failures to exit code 1.

mod commands;
mod handlers;

use clap::Parser;
use commands::Cli;
use mytask_core::{init_logging, AppConfig, LogSettings};

fn main() {
    let cli = Cli::parse();

    let config = match AppConfig::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            eprintln!("error: {err}");
            std::process::exit(1);
        }
    };

    match LogSettings::from_config(&config.logging, cli.log_level.as_deref()) {
        Ok(settings) => {
            if let Err(err) = init_logging(&settings) {
                eprintln!("warning: logging disabled: {err}");
            }
        }
        Err(err) => eprintln!("warning: logging disabled: {err}"),
    }

    if let Err(err) = handlers::dispatch(cli, config) {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}
