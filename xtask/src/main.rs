// Licensed under the Apache-2.0 license

//! Developer tasks for the register file compiler workspace.

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use log::LevelFilter;
use simple_logger::SimpleLogger;

mod check;
mod emit;
mod map;

#[derive(Parser)]
#[command(
    name = "xtask",
    about = "Compile and inspect register file configurations",
    version
)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile a configuration and report what it contains.
    Check {
        /// JSON register file configuration.
        config: PathBuf,
    },
    /// Print the address map of a compiled configuration.
    Map {
        /// JSON register file configuration.
        config: PathBuf,
    },
    /// Compile a configuration and emit the IR as JSON.
    Emit {
        /// JSON register file configuration.
        config: PathBuf,
        /// Output file; stdout when absent.
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
}

fn main() -> Result<()> {
    SimpleLogger::new().with_level(LevelFilter::Info).init()?;
    let cli = Cli::parse();
    match cli.command {
        Commands::Check { config } => check::run(&config),
        Commands::Map { config } => map::run(&config),
        Commands::Emit { config, output } => emit::run(&config, output.as_deref()),
    }
}
