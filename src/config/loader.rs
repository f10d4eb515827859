//! Layer loading and the `load_config` entry point.
//!
//! An application's configuration lives in `<root>/<app_id>/`:
//!
//! | layer       | file               | shape                      |
//! |-------------|--------------------|----------------------------|
//! | default     | `default.yaml`     | mapping (required)         |
//! | environment | `environment.yaml` | mapping keyed by env name  |
//! | machine     | `machine.yaml`     | mapping keyed by host name |
//! | profile     | `profile.yaml`     | mapping keyed by profile   |
//! | local       | `local.yaml`       | mapping                    |
//!
//! Programmatic overrides are merged last.

use super::merge::{Layer, merge};
use super::node::value_kind;
use super::tree::ConfigTree;
use crate::error::{ConfigError, Result};
use crate::ids::validate_app_id;
use crate::paths::{app_dir, ensure_config_root};
use crate::resolvers::register_standard_resolvers;
use crate::selectors::{Selector, Selectors};
use serde_json::{Map, Value};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

pub const DEFAULT_FILE: &str = "default.yaml";
pub const ENVIRONMENT_FILE: &str = "environment.yaml";
pub const MACHINE_FILE: &str = "machine.yaml";
pub const PROFILE_FILE: &str = "profile.yaml";
pub const LOCAL_FILE: &str = "local.yaml";

/// Merge order of the layers, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum LayerKind {
    Default = 0,
    Environment = 1,
    Machine = 2,
    Profile = 3,
    Local = 4,
    Overrides = 5,
}

impl LayerKind {
    /// File backing this layer, if it is file-based.
    pub fn file_name(self) -> Option<&'static str> {
        match self {
            LayerKind::Default => Some(DEFAULT_FILE),
            LayerKind::Environment => Some(ENVIRONMENT_FILE),
            LayerKind::Machine => Some(MACHINE_FILE),
            LayerKind::Profile => Some(PROFILE_FILE),
            LayerKind::Local => Some(LOCAL_FILE),
            LayerKind::Overrides => None,
        }
    }
}

impl std::fmt::Display for LayerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LayerKind::Default => write!(f, "default"),
            LayerKind::Environment => write!(f, "environment"),
            LayerKind::Machine => write!(f, "machine"),
            LayerKind::Profile => write!(f, "profile"),
            LayerKind::Local => write!(f, "local"),
            LayerKind::Overrides => write!(f, "overrides"),
        }
    }
}

/// Options for [`load_config`].
#[derive(Debug, Clone)]
pub struct LoadOptions {
    /// Environment selector; falls back to `MXM_ENV`.
    pub env: Option<String>,
    /// Machine selector; falls back to `MXM_MACHINE`, then the host name.
    pub machine: Option<String>,
    /// Profile selector; falls back to `MXM_PROFILE`.
    pub profile: Option<String>,
    /// Mapping merged on top of every file layer.
    pub overrides: Option<Value>,
    /// Config root; defaults to [`config_root`](crate::paths::config_root).
    pub root: Option<PathBuf>,
    /// Make the merged tree read-only.
    pub freeze: bool,
    /// Resolve every interpolation eagerly after merging.
    pub resolve: bool,
}

impl Default for LoadOptions {
    fn default() -> Self {
        Self {
            env: None,
            machine: None,
            profile: None,
            overrides: None,
            root: None,
            freeze: true,
            resolve: false,
        }
    }
}

impl LoadOptions {
    pub fn with_env(mut self, env: impl Into<String>) -> Self {
        self.env = Some(env.into());
        self
    }

    pub fn with_machine(mut self, machine: impl Into<String>) -> Self {
        self.machine = Some(machine.into());
        self
    }

    pub fn with_profile(mut self, profile: impl Into<String>) -> Self {
        self.profile = Some(profile.into());
        self
    }

    pub fn with_overrides(mut self, overrides: Value) -> Self {
        self.overrides = Some(overrides);
        self
    }

    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    pub fn with_freeze(mut self, freeze: bool) -> Self {
        self.freeze = freeze;
        self
    }

    pub fn with_resolve(mut self, resolve: bool) -> Self {
        self.resolve = resolve;
        self
    }
}

/// Read and parse a YAML file, expanding merge keys. `Ok(None)` if it does
/// not exist.
fn read_yaml(path: &Path) -> Result<Option<Value>> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(ConfigError::io(path, e)),
    };
    if content.trim().is_empty() {
        return Ok(Some(Value::Null));
    }
    let parse_error = |source: serde_yaml::Error| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    };
    let mut document: serde_yaml::Value = serde_yaml::from_str(&content).map_err(parse_error)?;
    // `<<: *anchor` merge keys
    document.apply_merge().map_err(parse_error)?;
    serde_yaml::from_value::<Value>(document)
        .map(Some)
        .map_err(parse_error)
}

/// Coerce a parsed document into a mapping; null (empty file) becomes `{}`.
fn into_mapping(value: Value, what: impl Into<String>) -> Result<Map<String, Value>> {
    match value {
        Value::Null => Ok(Map::new()),
        Value::Object(map) => Ok(map),
        other => Err(ConfigError::type_mismatch(what, "mapping", value_kind(&other))),
    }
}

/// Load a single-level layer file.
///
/// A missing file is [`Layer::Absent`] unless `required`.
pub fn load_file(path: &Path, required: bool) -> Result<Layer> {
    match read_yaml(path)? {
        Some(value) => {
            let map = into_mapping(value, path.display().to_string())?;
            debug!(path = %path.display(), keys = map.len(), "loaded layer file");
            Ok(Layer::Present(Value::Object(map)))
        }
        None if required => Err(ConfigError::FileNotFound {
            path: path.to_path_buf(),
        }),
        None => {
            debug!(path = %path.display(), "layer file not found, skipping");
            Ok(Layer::Absent)
        }
    }
}

/// Load the block for `selector` from a two-level layer file.
///
/// A missing selector is [`Layer::Absent`] when it is the default sentinel and
/// `allow_default_skip` is set, or when the selector was inferred rather than
/// chosen. Otherwise it is [`ConfigError::UnknownSelector`].
pub fn load_layer(
    base_dir: &Path,
    file_name: &str,
    selector: &Selector,
    required: bool,
    allow_default_skip: bool,
) -> Result<Layer> {
    let path = base_dir.join(file_name);
    let layer = Path::new(file_name)
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| file_name.to_string());

    let Some(document) = read_yaml(&path)? else {
        if required {
            return Err(ConfigError::FileNotFound { path });
        }
        debug!(layer = %layer, path = %path.display(), "layer file not found, skipping");
        return Ok(Layer::Absent);
    };

    let blocks = into_mapping(document, path.display().to_string())?;
    match blocks.get(selector.name()) {
        Some(block) => {
            let block = into_mapping(block.clone(), format!("{layer}.{}", selector.name()))?;
            debug!(layer = %layer, selector = %selector, "loaded layer block");
            Ok(Layer::Present(Value::Object(block)))
        }
        None if (allow_default_skip && selector.is_default()) || selector.is_inferred() => {
            debug!(layer = %layer, selector = %selector, "no block for selector, skipping");
            Ok(Layer::Absent)
        }
        None => {
            let mut valid: Vec<String> = blocks.keys().cloned().collect();
            valid.sort();
            Err(ConfigError::UnknownSelector {
                layer,
                selector: selector.name().to_string(),
                path,
                valid,
            })
        }
    }
}

/// Load, merge and optionally freeze/resolve the configuration for `app_id`.
///
/// Selectors not given in `options` are taken from the `MXM_*` environment
/// variables (and the host name for the machine).
pub fn load_config(app_id: &str, options: &LoadOptions) -> Result<ConfigTree> {
    validate_app_id(app_id)?;
    let selectors = Selectors::resolve(
        options.env.as_deref(),
        options.machine.as_deref(),
        options.profile.as_deref(),
    )?;
    load_config_with_selectors(app_id, &selectors, options)
}

/// Like [`load_config`], with selectors already resolved.
///
/// The selector fields of `options` are ignored.
pub fn load_config_with_selectors(
    app_id: &str,
    selectors: &Selectors,
    options: &LoadOptions,
) -> Result<ConfigTree> {
    validate_app_id(app_id)?;
    register_standard_resolvers();
    let root = ensure_config_root(options.root.as_deref(), false)?;
    let base = app_dir(&root, app_id);

    let default_path = base.join(DEFAULT_FILE);
    let default = load_file(&default_path, false)?;
    if !default.is_present() {
        return Err(ConfigError::MissingDefaultLayer {
            context: format!("{} for app '{app_id}'", default_path.display()),
        });
    }

    let layers = [
        (LayerKind::Default, default),
        (
            LayerKind::Environment,
            load_layer(&base, ENVIRONMENT_FILE, &selectors.environment, false, false)?,
        ),
        (
            LayerKind::Machine,
            load_layer(&base, MACHINE_FILE, &selectors.machine, false, false)?,
        ),
        (
            LayerKind::Profile,
            load_layer(&base, PROFILE_FILE, &selectors.profile, false, true)?,
        ),
        (LayerKind::Local, load_file(&base.join(LOCAL_FILE), false)?),
        (LayerKind::Overrides, Layer::from(options.overrides.clone())),
    ];
    let applied: Vec<String> = layers
        .iter()
        .filter(|(_, layer)| layer.is_present())
        .map(|(kind, _)| kind.to_string())
        .collect();

    let tree = merge(layers.into_iter().map(|(_, layer)| layer))?;
    if options.freeze {
        tree.set_readonly(true);
    }
    if options.resolve {
        tree.resolve_all()?;
    }

    info!(
        app_id,
        env = %selectors.environment,
        machine = %selectors.machine,
        profile = %selectors.profile,
        layers = %applied.join(","),
        "loaded configuration"
    );
    Ok(tree)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use tempfile::TempDir;

    fn write(dir: &Path, name: &str, content: &str) {
        fs::write(dir.join(name), content).unwrap();
    }

    #[test]
    fn test_load_file_missing_and_required() {
        let temp = TempDir::new().unwrap();
        let path = temp.path().join("default.yaml");
        assert_eq!(load_file(&path, false).unwrap(), Layer::Absent);
        assert!(matches!(
            load_file(&path, true),
            Err(ConfigError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_load_file_empty_is_empty_mapping() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "local.yaml", "");
        write(temp.path(), "comments.yaml", "# nothing here\n");
        assert_eq!(
            load_file(&temp.path().join("local.yaml"), true).unwrap(),
            Layer::Present(json!({}))
        );
        assert_eq!(
            load_file(&temp.path().join("comments.yaml"), true).unwrap(),
            Layer::Present(json!({}))
        );
    }

    #[test]
    fn test_load_layer_expands_merge_keys_across_blocks() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            ENVIRONMENT_FILE,
            "dev: &dev\n  debug: true\n  workers: 1\nprod:\n  <<: *dev\n  debug: false\n",
        );
        let layer = load_layer(
            temp.path(),
            ENVIRONMENT_FILE,
            &Selector::explicit("prod"),
            true,
            false,
        )
        .unwrap();
        assert_eq!(layer, Layer::Present(json!({"debug": false, "workers": 1})));
    }

    #[test]
    fn test_load_file_parse_error() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "default.yaml", "a: [unclosed\n");
        assert!(matches!(
            load_file(&temp.path().join("default.yaml"), true),
            Err(ConfigError::Parse { .. })
        ));
    }

    #[test]
    fn test_load_file_rejects_scalar_document() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), "default.yaml", "just a string\n");
        assert!(matches!(
            load_file(&temp.path().join("default.yaml"), true),
            Err(ConfigError::TypeMismatch { .. })
        ));
    }

    #[test]
    fn test_load_layer_selects_block() {
        let temp = TempDir::new().unwrap();
        write(
            temp.path(),
            ENVIRONMENT_FILE,
            "dev:\n  level: debug\nprod:\n  level: warn\nempty:\n",
        );
        let layer = load_layer(temp.path(), ENVIRONMENT_FILE, &Selector::explicit("prod"), false, false)
            .unwrap();
        assert_eq!(layer, Layer::Present(json!({"level": "warn"})));
        let empty = load_layer(temp.path(), ENVIRONMENT_FILE, &Selector::explicit("empty"), false, false)
            .unwrap();
        assert_eq!(empty, Layer::Present(json!({})));
    }

    #[test]
    fn test_load_layer_unknown_selector_lists_sorted_keys() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), ENVIRONMENT_FILE, "prod: {}\ndev: {}\n");
        let err = load_layer(temp.path(), ENVIRONMENT_FILE, &Selector::explicit("staging"), false, false)
            .unwrap_err();
        match err {
            ConfigError::UnknownSelector {
                layer,
                selector,
                valid,
                ..
            } => {
                assert_eq!(layer, "environment");
                assert_eq!(selector, "staging");
                assert_eq!(valid, vec!["dev", "prod"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_load_layer_default_skip_applies_only_when_allowed() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), PROFILE_FILE, "research: {}\n");
        let default = Selector::explicit("default");
        assert_eq!(
            load_layer(temp.path(), PROFILE_FILE, &default, false, true).unwrap(),
            Layer::Absent
        );
        assert!(matches!(
            load_layer(temp.path(), PROFILE_FILE, &default, false, false),
            Err(ConfigError::UnknownSelector { .. })
        ));
    }

    #[test]
    fn test_load_layer_inferred_selector_is_lenient() {
        let temp = TempDir::new().unwrap();
        write(temp.path(), MACHINE_FILE, "wildling: {}\n");
        let inferred = Selector::inferred("some-laptop");
        assert_eq!(
            load_layer(temp.path(), MACHINE_FILE, &inferred, false, false).unwrap(),
            Layer::Absent
        );
    }

    #[test]
    fn test_load_layer_missing_file() {
        let temp = TempDir::new().unwrap();
        let sel = Selector::explicit("dev");
        assert_eq!(
            load_layer(temp.path(), ENVIRONMENT_FILE, &sel, false, false).unwrap(),
            Layer::Absent
        );
        assert!(matches!(
            load_layer(temp.path(), ENVIRONMENT_FILE, &sel, true, false),
            Err(ConfigError::FileNotFound { .. })
        ));
    }

    #[test]
    fn test_load_config_requires_default_file() {
        let temp = TempDir::new().unwrap();
        fs::create_dir_all(temp.path().join("demo")).unwrap();
        let selectors = Selectors::explicit("dev", "host", "default");
        let err = load_config_with_selectors(
            "demo",
            &selectors,
            &LoadOptions::default().with_root(temp.path()),
        )
        .unwrap_err();
        assert!(matches!(err, ConfigError::MissingDefaultLayer { .. }));
        assert!(err.to_string().contains("demo"));
    }

    #[test]
    fn test_layer_kind_order_and_display() {
        assert!(LayerKind::Default < LayerKind::Overrides);
        assert_eq!(LayerKind::Machine.to_string(), "machine");
        assert_eq!(LayerKind::Local.file_name(), Some(LOCAL_FILE));
        assert_eq!(LayerKind::Overrides.file_name(), None);
    }
}
