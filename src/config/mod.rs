//! Layered configuration trees.
//!
//! A configuration is merged from up to six layers, later layers winning:
//! 1. **default** - `<root>/<app_id>/default.yaml` (required)
//! 2. **environment** - block selected by env name from `environment.yaml`
//! 3. **machine** - block selected by host name from `machine.yaml`
//! 4. **profile** - block selected by profile from `profile.yaml`
//! 5. **local** - `local.yaml`, unselected
//! 6. **overrides** - a mapping passed by the caller
//!
//! ## Merge Strategy
//! Mappings merge key by key. Sequences, scalars and explicit nulls in a later
//! layer replace the earlier value.
//!
//! ## Interpolation
//! String values may contain `${path.to.key}`, `${.sibling}` or
//! `${resolver:args}` expressions. They are evaluated when read, or once in
//! place via [`ConfigTree::resolve_all`].
//!
//! ## Environment Variables
//! - `MXM_CONFIG_HOME` - config root (default: `$XDG_CONFIG_HOME/mxm` or `~/.config/mxm`)
//! - `MXM_ENV` - environment selector
//! - `MXM_MACHINE` - machine selector (default: host name)
//! - `MXM_PROFILE` - profile selector (required unless passed explicitly)

mod helpers;
mod interpolation;
mod loader;
mod merge;
mod node;
mod tree;

pub use helpers::{SubconfigOptions, ViewOptions, make_subconfig, make_view};
pub use loader::{
    DEFAULT_FILE, ENVIRONMENT_FILE, LOCAL_FILE, LayerKind, LoadOptions, MACHINE_FILE, PROFILE_FILE,
    load_config, load_config_with_selectors, load_file, load_layer,
};
pub use merge::{Layer, deep_merge, deep_merge_all, merge};
pub use tree::{ConfigTree, Item};
