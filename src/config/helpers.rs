//! Constructors for standalone subconfigs and views onto a loaded tree.

use super::interpolation::resolve_in_place;
use super::node::{Node, split_path};
use super::tree::ConfigTree;
use crate::error::{ConfigError, Result};
use serde_json::Value;

/// Options for [`make_subconfig`].
#[derive(Debug, Clone, Copy)]
pub struct SubconfigOptions {
    pub readonly: bool,
    pub resolve: bool,
}

impl Default for SubconfigOptions {
    fn default() -> Self {
        Self {
            readonly: true,
            resolve: false,
        }
    }
}

/// Options for [`make_view`].
#[derive(Debug, Clone, Copy)]
pub struct ViewOptions {
    pub readonly: bool,
    pub resolve: bool,
}

impl Default for ViewOptions {
    fn default() -> Self {
        Self {
            readonly: true,
            resolve: false,
        }
    }
}

/// Build an independent tree from a plain mapping.
///
/// Interpolations are scoped to the new tree. Resolution happens before the
/// read-only flag is applied.
pub fn make_subconfig(mapping: Value, options: SubconfigOptions) -> Result<ConfigTree> {
    let tree = ConfigTree::from_value(mapping)?;
    if options.resolve {
        tree.resolve_all()?;
    }
    if options.readonly {
        tree.set_readonly(true);
    }
    Ok(tree)
}

/// A handle onto the mapping at `path` inside `tree`, sharing its storage.
///
/// With `resolve`, templates inside the view are evaluated in place against
/// the full tree, so `${...}` references outside the view still work. The
/// read-only flag is then set on the view node itself; ancestors keep theirs.
pub fn make_view(tree: &ConfigTree, path: &str, options: ViewOptions) -> Result<ConfigTree> {
    let handle = match tree.handle().navigate(&split_path(path))? {
        Node::Container(handle) if handle.is_mapping() => handle,
        other => return Err(ConfigError::type_mismatch(path, "mapping", other.kind())),
    };

    let view = ConfigTree::from_handle(handle);
    if options.resolve {
        resolve_in_place(view.handle(), &view.path())?;
    }
    view.set_readonly(options.readonly);
    Ok(view)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn tree() -> ConfigTree {
        ConfigTree::from_value(json!({
            "paths": {"base": "/data", "db": "${paths.base}/db"},
            "params": {"n": 1},
            "name": "demo",
            "list": [1, 2]
        }))
        .unwrap()
    }

    #[test]
    fn test_subconfig_defaults_to_readonly() {
        let sub = make_subconfig(json!({"a": 1}), SubconfigOptions::default()).unwrap();
        assert!(sub.is_readonly());
        assert!(sub.set("a", 2).unwrap_err().is_read_only());
    }

    #[test]
    fn test_subconfig_resolves_before_freezing() {
        let sub = make_subconfig(
            json!({"a": "x", "b": "${a}-y"}),
            SubconfigOptions {
                readonly: true,
                resolve: true,
            },
        )
        .unwrap();
        assert_eq!(sub.get("b").unwrap(), json!("x-y"));
        assert!(sub.is_readonly());
    }

    #[test]
    fn test_view_shares_storage() {
        let parent = tree();
        let view = make_view(
            &parent,
            "params",
            ViewOptions {
                readonly: false,
                resolve: false,
            },
        )
        .unwrap();
        view.set("n", 2).unwrap();
        assert_eq!(parent.get("params.n").unwrap(), json!(2));
        assert!(view.same_node(&parent.subtree("params").unwrap()));
    }

    #[test]
    fn test_readonly_view_leaves_parent_writable() {
        let parent = tree();
        let view = make_view(&parent, "params", ViewOptions::default()).unwrap();
        assert!(view.set("n", 5).unwrap_err().is_read_only());
        assert!(!parent.is_readonly());
        parent.set("name", "other").unwrap();
    }

    #[test]
    fn test_view_resolves_against_full_tree() {
        let parent = tree();
        let view = make_view(
            &parent,
            "paths",
            ViewOptions {
                readonly: true,
                resolve: true,
            },
        )
        .unwrap();
        assert_eq!(view.get("db").unwrap(), json!("/data/db"));
        assert_eq!(parent.get("paths.db").unwrap(), json!("/data/db"));
    }

    #[test]
    fn test_view_type_guard() {
        let parent = tree();
        assert!(matches!(
            make_view(&parent, "name", ViewOptions::default()),
            Err(ConfigError::TypeMismatch { .. })
        ));
        assert!(matches!(
            make_view(&parent, "list", ViewOptions::default()),
            Err(ConfigError::TypeMismatch { .. })
        ));
        assert!(matches!(
            make_view(&parent, "missing", ViewOptions::default()),
            Err(ConfigError::PathNotFound { .. })
        ));
    }
}
