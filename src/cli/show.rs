//! `show` command: print the merged configuration for an application.

use crate::config::{LoadOptions, load_config};
use anyhow::{Context, Result};
use clap::{Args, ValueEnum};
use serde_json::Value;
use std::path::PathBuf;

/// Output format for `show`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum)]
pub enum ShowFormat {
    #[default]
    Yaml,
    Json,
}

/// Arguments for the show command.
#[derive(Args, Debug)]
pub struct ShowArgs {
    /// Application id, e.g. mxm.datakraken
    #[arg(long)]
    pub app_id: String,

    /// Environment selector (default: MXM_ENV)
    #[arg(long)]
    pub env: Option<String>,

    /// Machine selector (default: MXM_MACHINE, then host name)
    #[arg(long)]
    pub machine: Option<String>,

    /// Profile selector (default: MXM_PROFILE)
    #[arg(long)]
    pub profile: Option<String>,

    /// Config root (default: MXM_CONFIG_HOME or ~/.config/mxm)
    #[arg(long)]
    pub root: Option<PathBuf>,

    /// Evaluate ${...} interpolations before printing
    #[arg(long)]
    pub resolve: bool,

    /// Output format
    #[arg(long, value_enum, default_value_t = ShowFormat::Yaml)]
    pub format: ShowFormat,
}

impl ShowArgs {
    fn to_options(&self) -> LoadOptions {
        LoadOptions {
            env: self.env.clone(),
            machine: self.machine.clone(),
            profile: self.profile.clone(),
            overrides: None,
            root: self.root.clone(),
            freeze: true,
            resolve: self.resolve,
        }
    }
}

/// Serialize `value` in the requested format.
pub fn render(value: &Value, format: ShowFormat) -> Result<String> {
    match format {
        ShowFormat::Yaml => serde_yaml::to_string(value).context("failed to render YAML"),
        ShowFormat::Json => {
            let mut out = serde_json::to_string_pretty(value).context("failed to render JSON")?;
            out.push('\n');
            Ok(out)
        }
    }
}

/// Load the configuration and return it rendered.
pub fn show_config(args: &ShowArgs) -> Result<String> {
    let tree = load_config(&args.app_id, &args.to_options())?;
    let value = tree.to_plain(args.resolve)?;
    render(&value, args.format)
}

/// Run the show command.
pub fn run_show(args: &ShowArgs) -> Result<()> {
    print!("{}", show_config(args)?);
    Ok(())
}
