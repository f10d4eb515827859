//! Shared node storage for configuration trees.
//!
//! Containers (mappings and sequences) live behind `Arc<RwLock<_>>` handles so
//! that a view and its parent tree point at the same storage. Every container
//! keeps a weak back-reference to its parent, which is how the effective
//! read-only flag and the interpolation root are found.
//!
//! Guards are never held while calling back into another node's methods;
//! children are cloned out (cheap: leaves are small, containers are `Arc`s)
//! and the guard is dropped first.

use crate::error::{ConfigError, Result};
use indexmap::IndexMap;
use serde_json::{Map, Value};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, Weak};

/// Marker that starts an interpolation inside a string value.
pub(crate) const INTERPOLATION_OPEN: &str = "${";

/// Leaf value: either concrete or an unevaluated interpolation template.
#[derive(Debug, Clone)]
pub(crate) enum Leaf {
    /// Concrete scalar (never an array or object).
    Value(Value),
    /// Raw string containing at least one `${...}` expression.
    Template(String),
}

/// A node in the tree.
#[derive(Debug, Clone)]
pub(crate) enum Node {
    Leaf(Leaf),
    Container(Handle),
}

/// How string scalars are interpreted while building nodes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Strings {
    /// Strings containing `${` become templates.
    Interpolate,
    /// Strings are taken literally (used when storing already-resolved values).
    Literal,
}

#[derive(Debug)]
pub(crate) enum Body {
    Mapping(IndexMap<String, Node>),
    Sequence(Vec<Node>),
}

#[derive(Debug)]
pub(crate) struct Container {
    pub(crate) body: Body,
    /// Explicit read-only flag; `None` inherits from the parent.
    pub(crate) readonly: Option<bool>,
    pub(crate) parent: Weak<RwLock<Container>>,
}

/// Shared handle to a container node.
#[derive(Debug, Clone)]
pub(crate) struct Handle(Arc<RwLock<Container>>);

impl Node {
    /// Build a node (and any nested containers) from a plain value.
    pub(crate) fn build(value: Value, parent: Weak<RwLock<Container>>, strings: Strings) -> Node {
        match value {
            Value::Object(map) => {
                let handle = Handle::new(Body::Mapping(IndexMap::new()), parent);
                let weak = handle.downgrade();
                let entries: IndexMap<String, Node> = map
                    .into_iter()
                    .map(|(k, v)| (k, Node::build(v, weak.clone(), strings)))
                    .collect();
                handle.write().body = Body::Mapping(entries);
                Node::Container(handle)
            }
            Value::Array(items) => {
                let handle = Handle::new(Body::Sequence(Vec::new()), parent);
                let weak = handle.downgrade();
                let nodes: Vec<Node> = items
                    .into_iter()
                    .map(|v| Node::build(v, weak.clone(), strings))
                    .collect();
                handle.write().body = Body::Sequence(nodes);
                Node::Container(handle)
            }
            Value::String(s) if strings == Strings::Interpolate && s.contains(INTERPOLATION_OPEN) => {
                Node::Leaf(Leaf::Template(s))
            }
            scalar => Node::Leaf(Leaf::Value(scalar)),
        }
    }

    /// Human-readable kind, used in type mismatch errors.
    pub(crate) fn kind(&self) -> &'static str {
        match self {
            Node::Leaf(_) => "scalar",
            Node::Container(h) => h.kind(),
        }
    }

    /// Raw snapshot: templates are returned as their literal strings.
    pub(crate) fn to_raw(&self) -> Value {
        match self {
            Node::Leaf(Leaf::Value(v)) => v.clone(),
            Node::Leaf(Leaf::Template(raw)) => Value::String(raw.clone()),
            Node::Container(h) => h.to_raw(),
        }
    }
}

impl Handle {
    fn new(body: Body, parent: Weak<RwLock<Container>>) -> Self {
        Handle(Arc::new(RwLock::new(Container {
            body,
            readonly: None,
            parent,
        })))
    }

    /// Create a fresh root mapping with no parent.
    pub(crate) fn root_mapping() -> Self {
        Self::new(Body::Mapping(IndexMap::new()), Weak::new())
    }

    /// Create an empty mapping whose parent is `parent`.
    pub(crate) fn child_mapping(parent: &Handle) -> Self {
        Self::new(Body::Mapping(IndexMap::new()), parent.downgrade())
    }

    pub(crate) fn downgrade(&self) -> Weak<RwLock<Container>> {
        Arc::downgrade(&self.0)
    }

    pub(crate) fn read(&self) -> RwLockReadGuard<'_, Container> {
        self.0.read().unwrap_or_else(|e| e.into_inner())
    }

    pub(crate) fn write(&self) -> RwLockWriteGuard<'_, Container> {
        self.0.write().unwrap_or_else(|e| e.into_inner())
    }

    /// True when both handles point at the same storage.
    pub(crate) fn ptr_eq(&self, other: &Handle) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }

    pub(crate) fn is_mapping(&self) -> bool {
        matches!(self.read().body, Body::Mapping(_))
    }

    pub(crate) fn kind(&self) -> &'static str {
        match self.read().body {
            Body::Mapping(_) => "mapping",
            Body::Sequence(_) => "sequence",
        }
    }

    pub(crate) fn parent(&self) -> Option<Handle> {
        self.read().parent.upgrade().map(Handle)
    }

    pub(crate) fn set_readonly(&self, flag: bool) {
        self.write().readonly = Some(flag);
    }

    /// Nearest explicit flag walking up through the parents; `false` if none.
    pub(crate) fn effective_readonly(&self) -> bool {
        let mut current = self.clone();
        loop {
            let (flag, parent) = {
                let guard = current.read();
                (guard.readonly, guard.parent.upgrade())
            };
            if let Some(flag) = flag {
                return flag;
            }
            match parent {
                Some(parent) => current = Handle(parent),
                None => return false,
            }
        }
    }

    /// Look up a direct child by mapping key or sequence index.
    ///
    /// `path` is only used for error messages.
    pub(crate) fn child(&self, segment: &str, path: &str) -> Result<Option<Node>> {
        let guard = self.read();
        match &guard.body {
            Body::Mapping(entries) => Ok(entries.get(segment).cloned()),
            Body::Sequence(items) => {
                let index = parse_index(segment, path)?;
                Ok(items.get(index).cloned())
            }
        }
    }

    /// Clone out all children as `(key, node)` pairs; sequence keys are indices.
    pub(crate) fn children(&self) -> Vec<(String, Node)> {
        let guard = self.read();
        match &guard.body {
            Body::Mapping(entries) => entries
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
            Body::Sequence(items) => items
                .iter()
                .enumerate()
                .map(|(i, v)| (i.to_string(), v.clone()))
                .collect(),
        }
    }

    pub(crate) fn keys(&self) -> Vec<String> {
        self.children().into_iter().map(|(k, _)| k).collect()
    }

    pub(crate) fn len(&self) -> usize {
        match &self.read().body {
            Body::Mapping(entries) => entries.len(),
            Body::Sequence(items) => items.len(),
        }
    }

    /// Store `value` under `segment`, bypassing the read-only check.
    ///
    /// Mappings insert or overwrite (keeping key position); sequences only
    /// replace existing indices.
    pub(crate) fn put(&self, segment: &str, value: Value, strings: Strings, path: &str) -> Result<()> {
        let node = Node::build(value, self.downgrade(), strings);
        self.put_node(segment, node, path)
    }

    pub(crate) fn put_node(&self, segment: &str, node: Node, path: &str) -> Result<()> {
        let mut guard = self.write();
        match &mut guard.body {
            Body::Mapping(entries) => {
                entries.insert(segment.to_string(), node);
                Ok(())
            }
            Body::Sequence(items) => {
                let index = parse_index(segment, path)?;
                match items.get_mut(index) {
                    Some(slot) => {
                        *slot = node;
                        Ok(())
                    }
                    None => Err(ConfigError::path_not_found(path)),
                }
            }
        }
    }

    /// Navigate from this container along `segments`.
    pub(crate) fn navigate(&self, segments: &[&str]) -> Result<Node> {
        let mut node = Node::Container(self.clone());
        for (depth, segment) in segments.iter().enumerate() {
            let walked = segments[..=depth].join(".");
            node = match node {
                Node::Container(handle) => handle
                    .child(segment, &walked)?
                    .ok_or_else(|| ConfigError::path_not_found(walked.clone()))?,
                Node::Leaf(_) => {
                    return Err(ConfigError::type_mismatch(
                        segments[..depth].join("."),
                        "mapping or sequence",
                        "scalar",
                    ));
                }
            };
        }
        Ok(node)
    }

    /// Find the root container and this node's path from it.
    ///
    /// A container that was detached from its parent (its key overwritten)
    /// is treated as a root of its own.
    pub(crate) fn locate(&self) -> (Handle, Vec<String>) {
        let mut segments = Vec::new();
        let mut current = self.clone();
        while let Some(parent) = current.parent() {
            match parent.key_of(&current) {
                Some(key) => segments.push(key),
                None => break,
            }
            current = parent;
        }
        segments.reverse();
        (current, segments)
    }

    fn key_of(&self, child: &Handle) -> Option<String> {
        let is_child = |node: &Node| matches!(node, Node::Container(h) if h.ptr_eq(child));
        let guard = self.read();
        match &guard.body {
            Body::Mapping(entries) => entries
                .iter()
                .find(|(_, node)| is_child(node))
                .map(|(k, _)| k.clone()),
            Body::Sequence(items) => items.iter().position(is_child).map(|i| i.to_string()),
        }
    }

    pub(crate) fn to_raw(&self) -> Value {
        let children = self.children();
        if self.is_mapping() {
            let map: Map<String, Value> = children
                .into_iter()
                .map(|(k, node)| (k, node.to_raw()))
                .collect();
            Value::Object(map)
        } else {
            Value::Array(children.into_iter().map(|(_, node)| node.to_raw()).collect())
        }
    }
}

/// Split a dotted path into segments. The empty path has no segments.
pub(crate) fn split_path(path: &str) -> Vec<&str> {
    if path.is_empty() {
        Vec::new()
    } else {
        path.split('.').collect()
    }
}

fn parse_index(segment: &str, path: &str) -> Result<usize> {
    segment
        .parse::<usize>()
        .map_err(|_| ConfigError::type_mismatch(path, "sequence index", "key"))
}

/// Human-readable kind of a plain value.
pub(crate) fn value_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "sequence",
        Value::Object(_) => "mapping",
    }
}
