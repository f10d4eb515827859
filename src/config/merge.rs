//! Deep merge of configuration layers.
//!
//! Mappings are merged key by key; every other pair is replaced by the later
//! value, including sequences and explicit nulls.

use super::tree::ConfigTree;
use crate::error::{ConfigError, Result};
use serde_json::Value;
use tracing::debug;

/// One entry in a merge stack.
#[derive(Debug, Clone, PartialEq)]
pub enum Layer {
    /// A loaded mapping.
    Present(Value),
    /// A layer that does not apply (missing optional file or selector).
    Absent,
}

impl Layer {
    pub fn is_present(&self) -> bool {
        matches!(self, Layer::Present(_))
    }
}

impl From<Value> for Layer {
    fn from(value: Value) -> Self {
        Layer::Present(value)
    }
}

impl From<Option<Value>> for Layer {
    fn from(value: Option<Value>) -> Self {
        value.map_or(Layer::Absent, Layer::Present)
    }
}

/// Snapshot of a tree, templates left unevaluated.
impl From<&ConfigTree> for Layer {
    fn from(tree: &ConfigTree) -> Self {
        Layer::Present(tree.get("").unwrap_or_else(|_| Value::Object(Default::default())))
    }
}

/// Deep merge two values, with `overlay` taking precedence over `base`.
///
/// Keys already present in `base` keep their position.
///
/// ```
/// use serde_json::json;
/// use mxm_config::config::deep_merge;
///
/// let base = json!({"server": {"port": 8080, "host": "localhost"}, "features": ["a", "b"]});
/// let overlay = json!({"server": {"port": 9000}, "features": ["c"]});
/// assert_eq!(
///     deep_merge(base, overlay),
///     json!({"server": {"port": 9000, "host": "localhost"}, "features": ["c"]})
/// );
/// ```
pub fn deep_merge(base: Value, overlay: Value) -> Value {
    match (base, overlay) {
        (Value::Object(mut base_map), Value::Object(overlay_map)) => {
            for (key, overlay_value) in overlay_map {
                match base_map.get_mut(&key) {
                    Some(slot) => {
                        let base_value = slot.take();
                        *slot = deep_merge(base_value, overlay_value);
                    }
                    None => {
                        base_map.insert(key, overlay_value);
                    }
                }
            }
            Value::Object(base_map)
        }
        (_, overlay) => overlay,
    }
}

/// Merge multiple values in order, with later values taking precedence.
pub fn deep_merge_all(values: impl IntoIterator<Item = Value>) -> Value {
    values
        .into_iter()
        .fold(Value::Object(Default::default()), deep_merge)
}

/// Merge layers into a new, mutable tree.
///
/// The first layer is the default layer and must be present. Later absent
/// layers are skipped.
pub fn merge(layers: impl IntoIterator<Item = Layer>) -> Result<ConfigTree> {
    let mut layers = layers.into_iter();
    let base = match layers.next() {
        Some(Layer::Present(value)) => value,
        _ => {
            return Err(ConfigError::MissingDefaultLayer {
                context: "first merge layer is absent".into(),
            });
        }
    };
    require_mapping(&base, 0)?;

    let mut merged = base;
    for (offset, layer) in layers.enumerate() {
        let index = offset + 1;
        match layer {
            Layer::Present(value) => {
                require_mapping(&value, index)?;
                merged = deep_merge(merged, value);
            }
            Layer::Absent => debug!(layer = index, "skipping absent layer"),
        }
    }

    ConfigTree::from_value(merged)
}

fn require_mapping(value: &Value, index: usize) -> Result<()> {
    if value.is_object() {
        Ok(())
    } else {
        Err(ConfigError::type_mismatch(
            format!("layer {index}"),
            "mapping",
            super::node::value_kind(value),
        ))
    }
}
