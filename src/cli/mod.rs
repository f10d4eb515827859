//! CLI command definitions for mxm-config
//!
//! This module defines the CLI structure using clap's derive macros.
//! The main entry point is the `Cli` struct which contains subcommands.

pub mod install;
pub mod show;

use clap::{Parser, Subcommand};
use install::InstallArgs;
use show::ShowArgs;

/// Layered YAML configuration tools
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Enable verbose logging
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Logging output: 0/off, 1/stdout, 2/stderr (default), or filename
    #[arg(short, long, default_value = "2", global = true)]
    pub log: String,

    #[command(subcommand)]
    pub command: Command,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Install default configuration files for an application
    InstallConfig(InstallArgs),

    /// Print the merged configuration for an application
    Show(ShowArgs),
}
