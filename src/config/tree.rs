//! The public configuration tree handle.

use super::interpolation::{Evaluator, join, resolve_in_place};
use super::node::{Handle, Node, Strings, split_path, value_kind};
use crate::error::{ConfigError, Result};
use serde::{Serialize, Serializer};
use serde_json::Value;
use std::fmt;

/// A handle to a mapping node of a configuration tree.
///
/// Cloning a `ConfigTree` clones the handle, not the data: both clones see the
/// same storage, the same read-only state and the same interpolation root.
/// Use [`ConfigTree::to_plain`] to take an independent copy.
#[derive(Clone)]
pub struct ConfigTree {
    handle: Handle,
}

/// A child looked up through [`ConfigTree::attr`] / [`ConfigTree::item`].
///
/// Mapping children come back as shared trees; everything else is returned
/// as its resolved value.
#[derive(Debug, Clone)]
pub enum Item {
    Tree(ConfigTree),
    Value(Value),
}

impl ConfigTree {
    pub(crate) fn from_handle(handle: Handle) -> Self {
        Self { handle }
    }

    pub(crate) fn handle(&self) -> &Handle {
        &self.handle
    }

    /// An empty, mutable tree.
    pub fn empty() -> Self {
        Self::from_handle(Handle::root_mapping())
    }

    /// Build a fresh, mutable tree from a plain mapping.
    ///
    /// Strings containing `${` are kept as templates and evaluated on read.
    pub fn from_value(value: Value) -> Result<Self> {
        match Node::build(value, Default::default(), Strings::Interpolate) {
            Node::Container(handle) if handle.is_mapping() => Ok(Self::from_handle(handle)),
            other => Err(ConfigError::type_mismatch("", "mapping", other.kind())),
        }
    }

    /// Dotted path of this node from its root, empty for a root tree.
    pub fn path(&self) -> String {
        self.handle.locate().1.join(".")
    }

    /// Raw snapshot of the node at `path`; templates are returned unevaluated.
    pub fn get(&self, path: &str) -> Result<Value> {
        Ok(self.handle.navigate(&split_path(path))?.to_raw())
    }

    /// Fully resolved value of the node at `path`.
    pub fn resolve(&self, path: &str) -> Result<Value> {
        let node = self.handle.navigate(&split_path(path))?;
        let (root, base) = self.handle.locate();
        let absolute = join(&base.join("."), path);
        Evaluator::new(root).eval_node(&node, absolute.trim_end_matches('.'))
    }

    pub fn get_str(&self, path: &str) -> Result<String> {
        match self.resolve(path)? {
            Value::String(s) => Ok(s),
            other => Err(ConfigError::type_mismatch(path, "string", value_kind(&other))),
        }
    }

    pub fn get_i64(&self, path: &str) -> Result<i64> {
        let value = self.resolve(path)?;
        value
            .as_i64()
            .ok_or_else(|| ConfigError::type_mismatch(path, "integer", value_kind(&value)))
    }

    pub fn get_f64(&self, path: &str) -> Result<f64> {
        let value = self.resolve(path)?;
        value
            .as_f64()
            .ok_or_else(|| ConfigError::type_mismatch(path, "number", value_kind(&value)))
    }

    pub fn get_bool(&self, path: &str) -> Result<bool> {
        let value = self.resolve(path)?;
        value
            .as_bool()
            .ok_or_else(|| ConfigError::type_mismatch(path, "bool", value_kind(&value)))
    }

    /// Set the value at dotted `path`, creating intermediate mappings.
    ///
    /// Fails with [`ConfigError::ReadOnly`] if any container that would be
    /// modified is effectively read-only.
    pub fn set(&self, path: &str, value: impl Into<Value>) -> Result<()> {
        let segments = split_path(path);
        let Some((last, parents)) = segments.split_last() else {
            return Err(ConfigError::path_not_found(path));
        };

        let mut current = self.handle.clone();
        for (depth, segment) in parents.iter().enumerate() {
            let walked = segments[..=depth].join(".");
            current = match current.child(segment, &walked)? {
                Some(Node::Container(next)) => next,
                Some(Node::Leaf(_)) => {
                    return Err(ConfigError::type_mismatch(walked, "mapping or sequence", "scalar"));
                }
                None if current.is_mapping() => {
                    ensure_writable(&current, path)?;
                    let created = Handle::child_mapping(&current);
                    current.put_node(segment, Node::Container(created.clone()), &walked)?;
                    created
                }
                None => return Err(ConfigError::path_not_found(walked)),
            };
        }

        ensure_writable(&current, path)?;
        current.put(last, value.into(), Strings::Interpolate, path)
    }

    /// Attribute-style access to a direct child.
    pub fn attr(&self, key: &str) -> Result<Item> {
        self.lookup(key)
    }

    /// Item-style access to a direct child. Same semantics as [`Self::attr`].
    pub fn item(&self, key: &str) -> Result<Item> {
        self.lookup(key)
    }

    /// Attribute-style assignment to a direct child.
    pub fn set_attr(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.assign(key, value.into())
    }

    /// Item-style assignment to a direct child. Same semantics as [`Self::set_attr`].
    pub fn set_item(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.assign(key, value.into())
    }

    fn lookup(&self, key: &str) -> Result<Item> {
        match self.handle.child(key, key)? {
            Some(Node::Container(handle)) if handle.is_mapping() => {
                Ok(Item::Tree(Self::from_handle(handle)))
            }
            Some(_) => self.resolve_child(key).map(Item::Value),
            None => Err(ConfigError::path_not_found(key)),
        }
    }

    fn resolve_child(&self, key: &str) -> Result<Value> {
        let node = self
            .handle
            .child(key, key)?
            .ok_or_else(|| ConfigError::path_not_found(key))?;
        let (root, base) = self.handle.locate();
        Evaluator::new(root).eval_node(&node, &join(&base.join("."), key))
    }

    fn assign(&self, key: &str, value: Value) -> Result<()> {
        ensure_writable(&self.handle, key)?;
        self.handle.put(key, value, Strings::Interpolate, key)
    }

    /// A shared handle onto the mapping at `path`.
    pub fn subtree(&self, path: &str) -> Result<ConfigTree> {
        match self.handle.navigate(&split_path(path))? {
            Node::Container(handle) if handle.is_mapping() => Ok(Self::from_handle(handle)),
            other => Err(ConfigError::type_mismatch(path, "mapping", other.kind())),
        }
    }

    /// Keys of this mapping in insertion order.
    pub fn keys(&self) -> Vec<String> {
        self.handle.keys()
    }

    pub fn len(&self) -> usize {
        self.handle.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True if `path` names an existing node.
    pub fn contains(&self, path: &str) -> bool {
        self.handle.navigate(&split_path(path)).is_ok()
    }

    /// Effective read-only state, inherited from the nearest flagged ancestor.
    pub fn is_readonly(&self) -> bool {
        self.handle.effective_readonly()
    }

    /// Set the read-only flag on this node only. Ancestors are not touched.
    pub fn set_readonly(&self, readonly: bool) {
        self.handle.set_readonly(readonly);
    }

    /// Independent plain copy of the whole tree.
    pub fn to_plain(&self, resolve: bool) -> Result<Value> {
        if resolve {
            self.resolve("")
        } else {
            Ok(self.handle.to_raw())
        }
    }

    /// Evaluate every template below this node and store the results in place.
    pub fn resolve_all(&self) -> Result<()> {
        resolve_in_place(&self.handle, &self.path())
    }

    /// True if both handles refer to the same storage node.
    pub fn same_node(&self, other: &ConfigTree) -> bool {
        self.handle.ptr_eq(&other.handle)
    }
}

fn ensure_writable(handle: &Handle, path: &str) -> Result<()> {
    if handle.effective_readonly() {
        Err(ConfigError::read_only(path))
    } else {
        Ok(())
    }
}

impl fmt::Debug for ConfigTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ConfigTree")
            .field("readonly", &self.is_readonly())
            .field("value", &self.handle.to_raw())
            .finish()
    }
}

/// Serializes the raw snapshot (templates unevaluated).
impl Serialize for ConfigTree {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        self.handle.to_raw().serialize(serializer)
    }
}

impl Item {
    pub fn attr(&self, key: &str) -> Result<Item> {
        match self {
            Item::Tree(tree) => tree.attr(key),
            Item::Value(value) => Err(ConfigError::type_mismatch(key, "mapping", value_kind(value))),
        }
    }

    pub fn item(&self, key: &str) -> Result<Item> {
        self.attr(key)
    }

    pub fn set_attr(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        match self {
            Item::Tree(tree) => tree.set_attr(key, value),
            Item::Value(current) => Err(ConfigError::type_mismatch(key, "mapping", value_kind(current))),
        }
    }

    pub fn set_item(&self, key: &str, value: impl Into<Value>) -> Result<()> {
        self.set_attr(key, value)
    }

    pub fn as_tree(&self) -> Option<&ConfigTree> {
        match self {
            Item::Tree(tree) => Some(tree),
            Item::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Item::Value(value) => Some(value),
            Item::Tree(_) => None,
        }
    }

    /// Plain value; mapping children are fully resolved.
    pub fn into_value(self) -> Result<Value> {
        match self {
            Item::Tree(tree) => tree.to_plain(true),
            Item::Value(value) => Ok(value),
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        self.as_value().and_then(Value::as_str)
    }

    pub fn as_i64(&self) -> Option<i64> {
        self.as_value().and_then(Value::as_i64)
    }

    pub fn as_f64(&self) -> Option<f64> {
        self.as_value().and_then(Value::as_f64)
    }

    pub fn as_bool(&self) -> Option<bool> {
        self.as_value().and_then(Value::as_bool)
    }
}
