//! Process-wide registry of `${name:args}` interpolation resolvers.
//!
//! Registration is idempotent: the first function registered under a name
//! stays until [`clear`] removes it.

use anyhow::{Context, anyhow, bail};
use chrono::format::{Item, StrftimeItems};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::{Arc, LazyLock, RwLock};
use tracing::debug;

/// A resolver receives its already-interpolated string arguments.
pub type ResolverFn = Arc<dyn Fn(&[String]) -> anyhow::Result<Value> + Send + Sync>;

static REGISTRY: LazyLock<RwLock<HashMap<String, ResolverFn>>> =
    LazyLock::new(|| RwLock::new(HashMap::new()));

/// Names registered by [`register_standard_resolvers`].
pub const STANDARD_RESOLVERS: [&str; 4] = ["cwd", "home", "env", "timestamp"];

const DEFAULT_TIMESTAMP_FORMAT: &str = "%Y-%m-%dT%H:%M:%S";

/// Register `f` under `name`. Returns `false` (and keeps the existing
/// resolver) if the name is already taken.
pub fn register<F>(name: &str, f: F) -> bool
where
    F: Fn(&[String]) -> anyhow::Result<Value> + Send + Sync + 'static,
{
    let mut registry = REGISTRY.write().unwrap_or_else(|e| e.into_inner());
    if registry.contains_key(name) {
        return false;
    }
    debug!(name, "registering interpolation resolver");
    registry.insert(name.to_string(), Arc::new(f));
    true
}

pub fn has(name: &str) -> bool {
    REGISTRY
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .contains_key(name)
}

/// Remove a resolver. Returns `true` if one was registered.
pub fn clear(name: &str) -> bool {
    REGISTRY
        .write()
        .unwrap_or_else(|e| e.into_inner())
        .remove(name)
        .is_some()
}

/// All registered names, sorted.
pub fn registered_names() -> Vec<String> {
    let mut names: Vec<String> = REGISTRY
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .keys()
        .cloned()
        .collect();
    names.sort();
    names
}

pub(crate) fn lookup(name: &str) -> Option<ResolverFn> {
    REGISTRY
        .read()
        .unwrap_or_else(|e| e.into_inner())
        .get(name)
        .cloned()
}

/// Register `cwd`, `home`, `env` and `timestamp`. Safe to call repeatedly.
pub fn register_standard_resolvers() {
    register("cwd", cwd);
    register("home", home);
    register("env", env);
    register("timestamp", timestamp);
}

fn cwd(_args: &[String]) -> anyhow::Result<Value> {
    let dir = std::env::current_dir().context("current directory is unavailable")?;
    Ok(Value::String(dir.to_string_lossy().into_owned()))
}

fn home(_args: &[String]) -> anyhow::Result<Value> {
    let dir = dirs::home_dir().ok_or_else(|| anyhow!("home directory is unavailable"))?;
    Ok(Value::String(dir.to_string_lossy().into_owned()))
}

/// `${env:VAR}` or `${env:VAR,default}`; null when unset without a default.
fn env(args: &[String]) -> anyhow::Result<Value> {
    let Some(var) = args.first().filter(|v| !v.is_empty()) else {
        bail!("usage: ${{env:VAR[,default]}}");
    };
    Ok(env_value(std::env::var(var).ok(), args.get(1)))
}

fn env_value(found: Option<String>, default: Option<&String>) -> Value {
    match (found, default) {
        (Some(value), _) => Value::String(value),
        (None, Some(default)) => Value::String(default.clone()),
        (None, None) => Value::Null,
    }
}

/// `${timestamp:}` or `${timestamp:<strftime format>}` in local time.
fn timestamp(args: &[String]) -> anyhow::Result<Value> {
    let format = args
        .first()
        .map(String::as_str)
        .filter(|f| !f.is_empty())
        .unwrap_or(DEFAULT_TIMESTAMP_FORMAT);
    Ok(Value::String(format_now(format)?))
}

fn format_now(format: &str) -> anyhow::Result<String> {
    if StrftimeItems::new(format).any(|item| matches!(item, Item::Error)) {
        bail!("invalid timestamp format '{format}'");
    }
    Ok(chrono::Local::now().format(format).to_string())
}
