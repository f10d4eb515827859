//! mxm-config command-line tool
//!
//! Installs default configuration files and prints merged configurations.

use anyhow::Result;
use clap::Parser;
use mxm_config::cli::install::run_install;
use mxm_config::cli::show::run_show;
use mxm_config::cli::{Cli, Command};
use mxm_config::logging::{LogTarget, init_logging};
use tracing::debug;

fn main() -> Result<()> {
    let cli = Cli::parse();

    // Initialize logging based on --log option
    init_logging(&LogTarget::parse(&cli.log), cli.verbose)?;
    debug!(command = ?cli.command, "starting");

    match cli.command {
        Command::InstallConfig(args) => {
            run_install(&args)?;
        }
        Command::Show(args) => {
            run_show(&args)?;
        }
    }

    Ok(())
}
