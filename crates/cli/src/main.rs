// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ovr - overround CLI
//!
//! Two entry points into the pipeline: `ovr harvest` runs the batch
//! harvest-and-store flow, `ovr watch` runs the live poll-and-compare
//! flow.

mod commands;
mod config;

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing::error;

use crate::config::Config;

#[derive(Parser)]
#[command(
    name = "ovr",
    version,
    about = "overround - multi-source odds harvesting and comparison"
)]
struct Cli {
    /// Path to the configuration file
    #[arg(long, global = true, default_value = "overround.toml", value_name = "FILE")]
    config: PathBuf,

    /// Override the data output directory
    #[arg(long, global = true, value_name = "DIR")]
    data_dir: Option<PathBuf>,

    /// Enable DEBUG logging
    #[arg(short = 'v', long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Harvest market data into the flat-file store
    Harvest(commands::harvest::HarvestArgs),
    /// Poll live odds and compare across sources
    Watch(commands::watch::WatchArgs),
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let mut config = match Config::load(&cli.config) {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "startup failed");
            return ExitCode::from(1);
        }
    };
    if let Some(data_dir) = cli.data_dir {
        config.data_dir = data_dir;
    }

    let outcome = match cli.command {
        Commands::Harvest(args) => commands::harvest::run(&config, &args).await,
        Commands::Watch(args) => commands::watch::run(&config, &args).await,
    };

    match outcome {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            error!(error = %e, "command failed");
            ExitCode::from(1)
        }
    }
}

fn setup_logging(verbose: bool) {
    let default_filter = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_filter));
    tracing_subscriber::fmt().with_env_filter(filter).init();
}
