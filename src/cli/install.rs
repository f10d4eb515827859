//! `install-config` command: seed an application's config directory.

use crate::installer::{DefaultsMode, InstallOptions, InstallReport, install_config};
use anyhow::{Result, bail};
use clap::{Args, ValueEnum};
use std::fmt::Write as _;
use std::path::PathBuf;

/// Source of the default files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ModeArg {
    /// Copy from a directory given with --seed-root
    Seed,
    /// Copy from a seed set bundled with this tool (--pkg)
    #[default]
    Shipped,
    /// Create the app directory and a sentinel only
    Empty,
}

impl From<ModeArg> for DefaultsMode {
    fn from(mode: ModeArg) -> Self {
        match mode {
            ModeArg::Seed => DefaultsMode::Seed,
            ModeArg::Shipped => DefaultsMode::Shipped,
            ModeArg::Empty => DefaultsMode::Empty,
        }
    }
}

/// Arguments for the install-config command.
#[derive(Args, Debug)]
pub struct InstallArgs {
    /// Application id, e.g. mxm.datakraken
    #[arg(long)]
    pub app_id: String,

    /// Where the default files come from
    #[arg(long, value_enum, default_value_t = ModeArg::Shipped)]
    pub mode: ModeArg,

    /// Seed directory (required with --mode seed)
    #[arg(long)]
    pub seed_root: Option<PathBuf>,

    /// Bundled package name (required with --mode shipped)
    #[arg(long = "pkg")]
    pub package: Option<String>,

    /// Config root to install into (default: MXM_CONFIG_HOME or ~/.config/mxm)
    #[arg(long)]
    pub dest_root: Option<PathBuf>,

    /// Replace files that already exist
    #[arg(long)]
    pub overwrite: bool,

    /// Do not create the .initialized sentinel in empty mode
    #[arg(long)]
    pub no_sentinel: bool,

    /// Print the install report as JSON
    #[arg(long)]
    pub json: bool,
}

impl InstallArgs {
    fn to_options(&self) -> Result<InstallOptions> {
        match self.mode {
            ModeArg::Seed if self.seed_root.is_none() => {
                bail!("--seed-root is required when --mode seed")
            }
            ModeArg::Shipped if self.package.is_none() => {
                bail!("--pkg is required when --mode shipped")
            }
            _ => {}
        }
        Ok(InstallOptions {
            mode: self.mode.into(),
            seed_root: self.seed_root.clone(),
            shipped_package: self.package.clone(),
            dest_root: self.dest_root.clone(),
            overwrite: self.overwrite,
            create_sentinel: !self.no_sentinel,
        })
    }
}

/// Human-readable report: one line per action plus totals.
pub fn render_summary(report: &InstallReport) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "Installed '{}' ({} mode) into {}",
        report.app_id,
        report.mode,
        report.app_dir().display()
    );
    for file in &report.installed {
        let _ = writeln!(out, "  {:<8} {}", file.action, file.dest.display());
    }
    let _ = writeln!(
        out,
        "{} copied, {} created, {} skipped",
        report.copied_count(),
        report.created_count(),
        report.skipped_count()
    );
    out
}

/// Run the install-config command.
pub fn run_install(args: &InstallArgs) -> Result<InstallReport> {
    let options = args.to_options()?;
    let report = install_config(&args.app_id, &options)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        print!("{}", render_summary(&report));
    }
    Ok(report)
}
