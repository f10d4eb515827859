//! mxm-config: layered YAML configuration
//!
//! Loads an application's settings from `<root>/<app_id>/*.yaml`, merging the
//! default, environment, machine, profile and local layers plus caller
//! overrides into a [`ConfigTree`] with `${...}` interpolation and optional
//! read-only enforcement. The [`installer`] seeds those directories.
//!
//! ```no_run
//! use mxm_config::{LoadOptions, load_config};
//!
//! let options = LoadOptions::default().with_env("dev").with_profile("default");
//! let cfg = load_config("mxm.config", &options)?;
//! let db = cfg.get_str("paths.db")?;
//! # Ok::<(), mxm_config::ConfigError>(())
//! ```

pub mod cli;
pub mod config;
pub mod error;
pub mod ids;
pub mod installer;
pub mod logging;
pub mod paths;
pub mod resolvers;
pub mod selectors;

pub use config::{
    ConfigTree, Item, Layer, LoadOptions, SubconfigOptions, ViewOptions, load_config, make_subconfig,
    make_view, merge,
};
pub use error::{ConfigError, ErrorCode, Result};
pub use installer::{DefaultsMode, InstallOptions, InstallReport, install_config};
