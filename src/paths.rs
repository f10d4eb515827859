//! Per-user configuration root discovery.
//!
//! Precedence:
//! 1. `MXM_CONFIG_HOME` -> `<dir>` (a leading `~` is expanded)
//! 2. `XDG_CONFIG_HOME` -> `<dir>/mxm`
//! 3. home directory   -> `<home>/.config/mxm`
//!
//! Empty variables count as unset.

use crate::error::{ConfigError, Result};
use std::path::{Path, PathBuf};
use tracing::debug;

pub const CONFIG_HOME_ENV: &str = "MXM_CONFIG_HOME";
pub const XDG_CONFIG_HOME_ENV: &str = "XDG_CONFIG_HOME";

/// Directory under `XDG_CONFIG_HOME` / `~/.config` holding all app configs.
pub const VENDOR_DIR: &str = "mxm";

/// Read a process environment variable, treating empty values as unset.
pub(crate) fn env_lookup(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}

/// Resolve the config root from the process environment.
pub fn config_root() -> Result<PathBuf> {
    config_root_with(env_lookup, dirs::home_dir())
}

/// Resolve the config root with an explicit environment lookup and home dir.
pub fn config_root_with(
    lookup: impl Fn(&str) -> Option<String>,
    home: Option<PathBuf>,
) -> Result<PathBuf> {
    let present = |key: &str| lookup(key).filter(|v| !v.is_empty());

    if let Some(dir) = present(CONFIG_HOME_ENV) {
        return Ok(expand_tilde(&dir, home.as_deref()));
    }
    if let Some(dir) = present(XDG_CONFIG_HOME_ENV) {
        return Ok(expand_tilde(&dir, home.as_deref()).join(VENDOR_DIR));
    }
    home.map(|h| h.join(".config").join(VENDOR_DIR))
        .ok_or(ConfigError::NoConfigRoot)
}

fn expand_tilde(raw: &str, home: Option<&Path>) -> PathBuf {
    match (raw, home) {
        ("~", Some(home)) => home.to_path_buf(),
        (_, Some(home)) if raw.starts_with("~/") => home.join(&raw[2..]),
        _ => PathBuf::from(raw),
    }
}

/// Return the config root, creating it if asked to.
///
/// `explicit` takes precedence over the environment.
pub fn ensure_config_root(explicit: Option<&Path>, create_if_missing: bool) -> Result<PathBuf> {
    let root = match explicit {
        Some(path) => path.to_path_buf(),
        None => config_root()?,
    };
    if create_if_missing && !root.exists() {
        debug!(path = %root.display(), "creating config root");
        std::fs::create_dir_all(&root).map_err(|e| ConfigError::io(&root, e))?;
    }
    Ok(root)
}

/// Directory holding one application's layer files.
pub fn app_dir(root: &Path, app_id: &str) -> PathBuf {
    root.join(app_id)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key: &str| map.get(key).cloned()
    }

    #[test]
    fn test_config_home_override_wins() {
        let root = config_root_with(
            lookup(&[("MXM_CONFIG_HOME", "/opt/cfg"), ("XDG_CONFIG_HOME", "/xdg")]),
            Some(PathBuf::from("/home/u")),
        )
        .unwrap();
        assert_eq!(root, PathBuf::from("/opt/cfg"));
    }

    #[test]
    fn test_config_home_expands_tilde() {
        let root = config_root_with(
            lookup(&[("MXM_CONFIG_HOME", "~/cfg")]),
            Some(PathBuf::from("/home/u")),
        )
        .unwrap();
        assert_eq!(root, PathBuf::from("/home/u/cfg"));
    }

    #[test]
    fn test_xdg_gets_vendor_dir() {
        let root = config_root_with(lookup(&[("XDG_CONFIG_HOME", "/xdg")]), None).unwrap();
        assert_eq!(root, PathBuf::from("/xdg/mxm"));
    }

    #[test]
    fn test_home_fallback_and_empty_values() {
        let root = config_root_with(
            lookup(&[("MXM_CONFIG_HOME", ""), ("XDG_CONFIG_HOME", "")]),
            Some(PathBuf::from("/home/u")),
        )
        .unwrap();
        assert_eq!(root, PathBuf::from("/home/u/.config/mxm"));
    }

    #[test]
    fn test_no_root_without_home() {
        assert!(matches!(
            config_root_with(lookup(&[]), None),
            Err(ConfigError::NoConfigRoot)
        ));
    }

    #[test]
    fn test_ensure_config_root_creates() {
        let temp = TempDir::new().unwrap();
        let target = temp.path().join("a").join("b");
        assert_eq!(ensure_config_root(Some(&target), false).unwrap(), target);
        assert!(!target.exists());
        ensure_config_root(Some(&target), true).unwrap();
        assert!(target.is_dir());
    }

    #[test]
    fn test_app_dir() {
        assert_eq!(
            app_dir(Path::new("/r"), "mxm.demo"),
            PathBuf::from("/r/mxm.demo")
        );
    }
}
