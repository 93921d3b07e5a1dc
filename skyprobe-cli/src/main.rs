//! SkyProbe CLI - Command-line interface
//!
//! One-shot collision checks, an HTTP server, and configuration management
//! for the SkyProbe library.

mod commands;
mod error;
mod runner;

use std::process::ExitCode;

use clap::{Parser, Subcommand};

use commands::check::CheckArgs;
use commands::config::ConfigCommands;
use commands::serve::ServeArgs;

#[derive(Debug, Parser)]
#[command(name = "skyprobe")]
#[command(version, about = "Collision proximity for probes over streamed 3D scenes", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Check a single position against a scene
    Check(CheckArgs),

    /// Serve the HTTP API over a shared scene
    Serve(ServeArgs),

    /// Create the configuration file with default settings
    Init,

    /// View or modify configuration settings
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match cli.command {
        Commands::Check(args) => commands::check::run(args),
        Commands::Serve(args) => commands::serve::run(args),
        Commands::Init => commands::init::run(),
        Commands::Config { command } => commands::config::run(command),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", console::style("error:").red().bold(), e);
            ExitCode::FAILURE
        }
    }
}
