//! Environment, machine and profile selector resolution.

use crate::error::{ConfigError, Result};
use crate::paths::env_lookup;
use serde::Serialize;
use std::fmt;
use tracing::warn;

/// Sentinel selector name. A `default` profile with no block is skipped, and
/// the machine falls back to it when the host name is unknown.
pub const DEFAULT_SELECTOR: &str = "default";

pub const ENV_VAR: &str = "MXM_ENV";
pub const MACHINE_VAR: &str = "MXM_MACHINE";
pub const PROFILE_VAR: &str = "MXM_PROFILE";

/// Where a selector value came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SelectorOrigin {
    /// Passed by the caller.
    Explicit,
    /// Read from an `MXM_*` variable.
    Environment,
    /// Taken from the OS host name.
    Hostname,
    /// Nothing was configured; the default sentinel is used.
    Fallback,
}

/// A selector value plus its origin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selector {
    name: String,
    origin: SelectorOrigin,
}

impl Selector {
    pub fn new(name: impl Into<String>, origin: SelectorOrigin) -> Self {
        Self {
            name: name.into(),
            origin,
        }
    }

    pub fn explicit(name: impl Into<String>) -> Self {
        Self::new(name, SelectorOrigin::Explicit)
    }

    /// A selector guessed from the host rather than chosen.
    pub fn inferred(name: impl Into<String>) -> Self {
        Self::new(name, SelectorOrigin::Hostname)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn origin(&self) -> SelectorOrigin {
        self.origin
    }

    pub fn is_default(&self) -> bool {
        self.name == DEFAULT_SELECTOR
    }

    /// True when nobody chose this selector; missing blocks are then skipped.
    pub fn is_inferred(&self) -> bool {
        matches!(self.origin, SelectorOrigin::Hostname | SelectorOrigin::Fallback)
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.name)
    }
}

fn explicit_value(explicit: Option<&str>) -> Option<&str> {
    explicit.map(str::trim).filter(|s| !s.is_empty())
}

fn required_selector(
    explicit: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
    layer: &str,
    env_var: &str,
) -> Result<Selector> {
    if let Some(name) = explicit_value(explicit) {
        return Ok(Selector::explicit(name));
    }
    lookup(env_var)
        .filter(|v| !v.is_empty())
        .map(|v| Selector::new(v, SelectorOrigin::Environment))
        .ok_or_else(|| ConfigError::SelectorRequired {
            layer: layer.into(),
            env_var: env_var.into(),
        })
}

pub fn resolve_environment(explicit: Option<&str>) -> Result<Selector> {
    resolve_environment_with(explicit, env_lookup)
}

/// Explicit value, else `MXM_ENV`; there is no fallback.
pub fn resolve_environment_with(
    explicit: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Selector> {
    required_selector(explicit, lookup, "environment", ENV_VAR)
}

pub fn resolve_machine(explicit: Option<&str>) -> Selector {
    resolve_machine_with(explicit, env_lookup, system_hostname)
}

/// Explicit value, else `MXM_MACHINE`, else the host name.
pub fn resolve_machine_with(
    explicit: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
    hostname: impl FnOnce() -> Option<String>,
) -> Selector {
    if let Some(name) = explicit_value(explicit) {
        return Selector::explicit(name);
    }
    if let Some(name) = lookup(MACHINE_VAR).filter(|v| !v.is_empty()) {
        return Selector::new(name, SelectorOrigin::Environment);
    }
    match hostname().filter(|h| !h.is_empty()) {
        Some(host) => Selector::inferred(host),
        None => {
            warn!("could not determine host name, using '{DEFAULT_SELECTOR}' machine");
            Selector::new(DEFAULT_SELECTOR, SelectorOrigin::Fallback)
        }
    }
}

pub fn resolve_profile(explicit: Option<&str>) -> Result<Selector> {
    resolve_profile_with(explicit, env_lookup)
}

/// Explicit value, else `MXM_PROFILE`; there is no fallback.
pub fn resolve_profile_with(
    explicit: Option<&str>,
    lookup: impl Fn(&str) -> Option<String>,
) -> Result<Selector> {
    required_selector(explicit, lookup, "profile", PROFILE_VAR)
}

/// The OS host name, if it is valid UTF-8.
pub fn system_hostname() -> Option<String> {
    hostname::get().ok().and_then(|h| h.into_string().ok())
}

/// All three selectors for one load.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Selectors {
    pub environment: Selector,
    pub machine: Selector,
    pub profile: Selector,
}

impl Selectors {
    /// Resolve from explicit values and the process environment.
    pub fn resolve(env: Option<&str>, machine: Option<&str>, profile: Option<&str>) -> Result<Self> {
        Self::resolve_with(env, machine, profile, env_lookup, system_hostname)
    }

    pub fn resolve_with(
        env: Option<&str>,
        machine: Option<&str>,
        profile: Option<&str>,
        lookup: impl Fn(&str) -> Option<String>,
        hostname: impl FnOnce() -> Option<String>,
    ) -> Result<Self> {
        Ok(Self {
            environment: resolve_environment_with(env, &lookup)?,
            machine: resolve_machine_with(machine, &lookup, hostname),
            profile: resolve_profile_with(profile, &lookup)?,
        })
    }

    /// Three explicitly chosen selectors.
    pub fn explicit(
        environment: impl Into<String>,
        machine: impl Into<String>,
        profile: impl Into<String>,
    ) -> Self {
        Self {
            environment: Selector::explicit(environment),
            machine: Selector::explicit(machine),
            profile: Selector::explicit(profile),
        }
    }
}
