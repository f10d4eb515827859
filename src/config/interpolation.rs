//! `${...}` expression parsing and evaluation.
//!
//! Supported forms:
//! - `${a.b.c}` absolute reference from the root of the tree
//! - `${.x}`, `${..x}` reference relative to the containing node
//! - `${name:arg1,arg2}` call to a registered resolver; args may be quoted and
//!   may themselves contain expressions
//! - `\${` a literal `${`
//!
//! A string that is exactly one expression evaluates to the referenced value
//! with its type. Anything else is rendered to a string.

use super::node::{Handle, Leaf, Node, Strings, split_path};
use crate::error::{ConfigError, Result};
use crate::resolvers;
use serde_json::{Map, Value};
use tracing::trace;

const OPEN: &str = "${";
const ESCAPED_OPEN: &str = "\\${";

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Segment {
    Text(String),
    Reference(String),
    Call { name: String, args: Vec<Vec<Segment>> },
}

/// Parse a template string into segments. Errors carry a short reason.
pub(crate) fn parse(raw: &str) -> std::result::Result<Vec<Segment>, String> {
    let mut segments = Vec::new();
    let mut text = String::new();
    let mut i = 0;

    while i < raw.len() {
        let rest = &raw[i..];
        if rest.starts_with(ESCAPED_OPEN) {
            text.push_str(OPEN);
            i += ESCAPED_OPEN.len();
        } else if rest.starts_with(OPEN) {
            let body_start = i + OPEN.len();
            let body_end = find_close(raw, body_start).ok_or("unterminated '${'")?;
            if !text.is_empty() {
                segments.push(Segment::Text(std::mem::take(&mut text)));
            }
            segments.push(parse_expression(&raw[body_start..body_end])?);
            i = body_end + 1;
        } else {
            let ch = rest.chars().next().ok_or("unexpected end of input")?;
            text.push(ch);
            i += ch.len_utf8();
        }
    }

    if !text.is_empty() {
        segments.push(Segment::Text(text));
    }
    Ok(segments)
}

/// Index of the `}` closing an expression whose body starts at `start`.
///
/// Quotes are honoured in resolver arguments, so `'a}b'` does not close it.
fn find_close(raw: &str, start: usize) -> Option<usize> {
    let bytes = raw.as_bytes();
    let mut depth = 1usize;
    let mut in_args = false;
    let mut quote: Option<u8> = None;
    let mut i = start;
    while i < bytes.len() {
        let b = bytes[i];
        if let Some(q) = quote {
            if b == q {
                quote = None;
            }
            i += 1;
            continue;
        }
        if bytes[i..].starts_with(ESCAPED_OPEN.as_bytes()) {
            i += ESCAPED_OPEN.len();
            continue;
        }
        if bytes[i..].starts_with(OPEN.as_bytes()) {
            depth += 1;
            i += OPEN.len();
            continue;
        }
        match b {
            b'}' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            b':' if depth == 1 => in_args = true,
            b'\'' | b'"' if depth == 1 && in_args => quote = Some(b),
            _ => {}
        }
        i += 1;
    }
    None
}

/// Byte offsets of `delim` at nesting depth zero.
fn top_level_positions(body: &str, delim: u8) -> Vec<usize> {
    let bytes = body.as_bytes();
    let mut depth = 0usize;
    let mut quote: Option<u8> = None;
    let mut found = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        match quote {
            Some(q) if b == q => quote = None,
            Some(_) => {}
            None => {
                if bytes[i..].starts_with(OPEN.as_bytes()) {
                    depth += 1;
                    i += OPEN.len();
                    continue;
                }
                match b {
                    b'}' if depth > 0 => depth -= 1,
                    b'\'' | b'"' if depth == 0 && delim == b',' => quote = Some(b),
                    _ if b == delim && depth == 0 => found.push(i),
                    _ => {}
                }
            }
        }
        i += 1;
    }
    found
}

fn parse_expression(body: &str) -> std::result::Result<Segment, String> {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return Err("empty expression".into());
    }

    if let Some(&colon) = top_level_positions(trimmed, b':').first() {
        let name = trimmed[..colon].trim();
        if !is_resolver_name(name) {
            return Err(format!("invalid resolver name '{name}'"));
        }
        let arg_str = &trimmed[colon + 1..];
        let mut args = Vec::new();
        if !arg_str.trim().is_empty() {
            let mut start = 0;
            let mut bounds = top_level_positions(arg_str, b',');
            bounds.push(arg_str.len());
            for end in bounds {
                let arg = unquote(arg_str[start..end].trim());
                args.push(parse(arg)?);
                start = end + 1;
            }
        }
        return Ok(Segment::Call {
            name: name.to_string(),
            args,
        });
    }

    if trimmed.contains(OPEN) {
        return Err("nested expressions are only allowed in resolver arguments".into());
    }
    if trimmed.chars().any(char::is_whitespace) {
        return Err(format!("invalid reference '{trimmed}'"));
    }
    Ok(Segment::Reference(trimmed.to_string()))
}

fn is_resolver_name(name: &str) -> bool {
    let mut chars = name.chars();
    matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || matches!(c, '_' | '.' | '-'))
}

fn unquote(arg: &str) -> &str {
    for q in ['"', '\''] {
        if arg.len() >= 2 && arg.starts_with(q) && arg.ends_with(q) {
            return &arg[1..arg.len() - 1];
        }
    }
    arg
}

fn stringify(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null => Some("null".into()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Number(n) => Some(n.to_string()),
        Value::Array(_) | Value::Object(_) => None,
    }
}

/// Evaluates templates against one root, tracking the in-flight paths so that
/// self-referencing chains are reported instead of recursing forever.
pub(crate) struct Evaluator {
    root: Handle,
    stack: Vec<String>,
}

impl Evaluator {
    pub(crate) fn new(root: Handle) -> Self {
        Self {
            root,
            stack: Vec::new(),
        }
    }

    /// Fully resolve `node`, located at absolute `path`.
    pub(crate) fn eval_node(&mut self, node: &Node, path: &str) -> Result<Value> {
        match node {
            Node::Leaf(Leaf::Value(v)) => Ok(v.clone()),
            Node::Leaf(Leaf::Template(raw)) => self.eval_template(raw, path),
            Node::Container(handle) => {
                let children = handle.children();
                let mapping = handle.is_mapping();
                let mut map = Map::new();
                let mut items = Vec::new();
                for (key, child) in children {
                    let value = self.eval_node(&child, &join(path, &key))?;
                    if mapping {
                        map.insert(key, value);
                    } else {
                        items.push(value);
                    }
                }
                Ok(if mapping {
                    Value::Object(map)
                } else {
                    Value::Array(items)
                })
            }
        }
    }

    fn eval_template(&mut self, raw: &str, path: &str) -> Result<Value> {
        if let Some(pos) = self.stack.iter().position(|p| p == path) {
            let mut chain = self.stack[pos..].to_vec();
            chain.push(path.to_string());
            return Err(ConfigError::InterpolationCycle { chain });
        }

        trace!(path, raw, "evaluating interpolation");
        self.stack.push(path.to_string());
        let result = self.render(raw, path);
        self.stack.pop();
        result
    }

    fn render(&mut self, raw: &str, path: &str) -> Result<Value> {
        let segments =
            parse(raw).map_err(|reason| ConfigError::invalid_interpolation(raw, path, reason))?;

        if let [single] = segments.as_slice() {
            if !matches!(single, Segment::Text(_)) {
                return self.eval_segment(single, raw, path);
            }
        }
        self.render_string(&segments, raw, path).map(Value::String)
    }

    fn render_string(&mut self, segments: &[Segment], raw: &str, path: &str) -> Result<String> {
        let mut out = String::new();
        for segment in segments {
            let value = self.eval_segment(segment, raw, path)?;
            let text = stringify(&value).ok_or_else(|| {
                ConfigError::invalid_interpolation(
                    raw,
                    path,
                    "cannot embed a mapping or sequence in a string",
                )
            })?;
            out.push_str(&text);
        }
        Ok(out)
    }

    fn eval_segment(&mut self, segment: &Segment, raw: &str, path: &str) -> Result<Value> {
        match segment {
            Segment::Text(text) => Ok(Value::String(text.clone())),
            Segment::Reference(reference) => {
                let target = self.reference_path(reference, raw, path)?;
                let node = self.root.navigate(&split_path(&target))?;
                self.eval_node(&node, &target)
            }
            Segment::Call { name, args } => {
                let resolver = resolvers::lookup(name).ok_or_else(|| ConfigError::UnknownResolver {
                    name: name.clone(),
                    path: path.to_string(),
                })?;
                let rendered = args
                    .iter()
                    .map(|arg| self.render_string(arg, raw, path))
                    .collect::<Result<Vec<_>>>()?;
                resolver(&rendered).map_err(|source| ConfigError::Resolver {
                    name: name.clone(),
                    path: path.to_string(),
                    source,
                })
            }
        }
    }

    /// Absolute dotted path for a reference written at `path`.
    fn reference_path(&self, reference: &str, raw: &str, path: &str) -> Result<String> {
        let rest = reference.trim_start_matches('.');
        let dots = reference.len() - rest.len();
        if dots == 0 {
            return Ok(reference.to_string());
        }

        let mut base: Vec<&str> = split_path(path);
        // The first dot names the node containing the leaf.
        for _ in 0..dots {
            if base.pop().is_none() {
                return Err(ConfigError::invalid_interpolation(
                    raw,
                    path,
                    "relative reference goes above the root",
                ));
            }
        }
        base.extend(split_path(rest));
        Ok(base.join("."))
    }
}

/// Append `key` to a dotted path.
pub(crate) fn join(prefix: &str, key: &str) -> String {
    if prefix.is_empty() {
        key.to_string()
    } else {
        format!("{prefix}.{key}")
    }
}

/// Replace every template below `handle` (at absolute `path`) with its value.
///
/// Read-only flags are not consulted: eager resolution is not a user mutation.
pub(crate) fn resolve_in_place(handle: &Handle, path: &str) -> Result<()> {
    let (root, _) = handle.locate();
    let mut evaluator = Evaluator::new(root);
    resolve_container(&mut evaluator, handle, path)
}

fn resolve_container(evaluator: &mut Evaluator, handle: &Handle, path: &str) -> Result<()> {
    for (key, child) in handle.children() {
        let child_path = join(path, &key);
        match &child {
            Node::Leaf(Leaf::Template(_)) => {
                let value = evaluator.eval_node(&child, &child_path)?;
                handle.put(&key, value, Strings::Literal, &child_path)?;
            }
            Node::Leaf(Leaf::Value(_)) => {}
            Node::Container(inner) => resolve_container(evaluator, inner, &child_path)?,
        }
    }
    Ok(())
}
