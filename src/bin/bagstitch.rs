// SPDX-FileCopyrightText: 2026 ArcheBase
//
// SPDX-License-Identifier: MulanPSL-2.0

//! # Bagstitch CLI
//!
//! Command-line tool for split ROS1 bag recordings.
//!
//! ## Usage
//!
//! ```sh
//! # Group the bags of a directory into datasets
//! bagstitch scan /data/recordings
//!
//! # Aggregate metadata of one dataset
//! bagstitch meta run_2024-01-01-00-00-00_0.bag run_2024-01-01-00-05-00_1.bag
//!
//! # Replay every IMU topic in chronological order
//! bagstitch replay run_*.bag -s '*:sensor_msgs/Imu'
//! ```

mod cmd;
mod common;

use std::path::PathBuf;
use std::process;

use bagstitch::{BagError, Config};
use clap::{Parser, Subcommand};
use cmd::{MetaCmd, ReplayCmd, ScanCmd};
use common::Result;
use tracing_subscriber::EnvFilter;

/// Bagstitch - split ROS bag toolkit
///
/// Reassemble split recordings into datasets, validate their metadata, and
/// replay them in global timestamp order.
#[derive(Parser, Clone)]
#[command(name = "bagstitch")]
#[command(about = "Reassemble, validate and replay split ROS1 bag recordings", long_about = None)]
#[command(version = env!("CARGO_PKG_VERSION"))]
struct Cli {
    /// Configuration file (TOML)
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,

    /// Log at debug level (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands
#[derive(Subcommand, Clone)]
enum Commands {
    /// Group the bags of a directory into datasets
    Scan(ScanCmd),

    /// Aggregate and validate the metadata of one dataset
    Meta(MetaCmd),

    /// Stream a dataset in chronological order
    Replay(ReplayCmd),
}

fn init_logging(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn run(cli: Cli) -> Result<()> {
    let config = match &cli.config {
        Some(path) => Config::load_from(path)?,
        None => Config::load_default()?,
    };

    match cli.command {
        Commands::Scan(cmd) => cmd.run(&config),
        Commands::Meta(cmd) => cmd.run(&config),
        Commands::Replay(cmd) => cmd.run(&config),
    }
}

fn main() {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    if let Err(e) = run(cli) {
        eprintln!("Error: {e}");

        if let Some(err) = e.downcast_ref::<BagError>() {
            let fields = err
                .log_fields()
                .into_iter()
                .map(|(k, v)| format!("{k}={v}"))
                .collect::<Vec<_>>()
                .join(" ");
            tracing::debug!(fields = %fields, "error details");

            if err.is_integrity_fault() {
                eprintln!(
                    "Dataset '{}' failed an integrity check; its files disagree or are corrupt",
                    err.dataset().unwrap_or("?")
                );
                process::exit(2);
            }
        }
        process::exit(1);
    }
}
