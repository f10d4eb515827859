//! Structured error types for configuration loading, access, and installation.

use serde::Serialize;
use std::path::PathBuf;
use thiserror::Error;

/// Error codes for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Loading errors
    MissingDefaultLayer,
    FileNotFound,
    UnknownSelector,
    SelectorRequired,
    NoConfigRoot,
    ParseError,
    IoError,

    // Access errors
    PathNotFound,
    TypeMismatch,
    ReadOnly,

    // Interpolation errors
    UnknownResolver,
    ResolverFailed,
    InterpolationCycle,
    InvalidInterpolation,

    // Installer / identity errors
    InvalidAppId,
    InvalidInstall,
    UnknownPackage,
}

/// Configuration error type.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The first (default) layer of a merge is absent.
    #[error("missing required default layer: {context}")]
    MissingDefaultLayer { context: String },

    /// A file that was required does not exist.
    #[error("file not found: {path}")]
    FileNotFound { path: PathBuf },

    /// A named selector has no block in an existing layer file.
    #[error("unknown {layer} '{selector}' in {path}; valid {layer}s: [{}]", .valid.join(", "))]
    UnknownSelector {
        layer: String,
        selector: String,
        path: PathBuf,
        valid: Vec<String>,
    },

    /// No configuration root could be determined (no override and no home directory).
    #[error("cannot determine config root: set MXM_CONFIG_HOME, XDG_CONFIG_HOME or HOME")]
    NoConfigRoot,

    /// A selector was neither given explicitly nor found in the environment.
    #[error("{layer} must be specified (argument or {env_var})")]
    SelectorRequired { layer: String, env_var: String },

    /// YAML could not be parsed.
    #[error("failed to parse config file '{path}': {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_yaml::Error,
    },

    /// Filesystem operation failed.
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A dotted path does not exist in the tree.
    #[error("key not found: '{path}'")]
    PathNotFound { path: String },

    /// A node has a different shape than the operation needs.
    #[error("type mismatch at '{path}': expected {expected}, found {found}")]
    TypeMismatch {
        path: String,
        expected: &'static str,
        found: &'static str,
    },

    /// Mutation attempted on a read-only node.
    #[error("cannot modify read-only config at '{path}'")]
    ReadOnly { path: String },

    /// An interpolation names a resolver that is not registered.
    #[error("unsupported interpolation resolver '{name}' at '{path}'")]
    UnknownResolver { name: String, path: String },

    /// A registered resolver returned an error.
    #[error("resolver '{name}' failed at '{path}': {source}")]
    Resolver {
        name: String,
        path: String,
        #[source]
        source: anyhow::Error,
    },

    /// An interpolation chain refers back to itself.
    #[error("interpolation cycle: {}", .chain.join(" -> "))]
    InterpolationCycle { chain: Vec<String> },

    /// An interpolation expression is malformed or cannot be evaluated.
    #[error("invalid interpolation '{expression}' at '{path}': {reason}")]
    InvalidInterpolation {
        expression: String,
        path: String,
        reason: String,
    },

    /// An application id does not match the allowed pattern.
    #[error("invalid app_id '{app_id}': use lowercase ASCII segments separated by '.', '_' or '-'")]
    InvalidAppId { app_id: String },

    /// Installer options are inconsistent.
    #[error("invalid install request: {0}")]
    InvalidInstall(String),

    /// No shipped seed set exists under the given package name.
    #[error("no shipped defaults for package '{0}'")]
    UnknownPackage(String),
}

impl ConfigError {
    /// Get the stable error code for this error.
    pub fn code(&self) -> ErrorCode {
        match self {
            ConfigError::MissingDefaultLayer { .. } => ErrorCode::MissingDefaultLayer,
            ConfigError::FileNotFound { .. } => ErrorCode::FileNotFound,
            ConfigError::UnknownSelector { .. } => ErrorCode::UnknownSelector,
            ConfigError::SelectorRequired { .. } => ErrorCode::SelectorRequired,
            ConfigError::NoConfigRoot => ErrorCode::NoConfigRoot,
            ConfigError::Parse { .. } => ErrorCode::ParseError,
            ConfigError::Io { .. } => ErrorCode::IoError,
            ConfigError::PathNotFound { .. } => ErrorCode::PathNotFound,
            ConfigError::TypeMismatch { .. } => ErrorCode::TypeMismatch,
            ConfigError::ReadOnly { .. } => ErrorCode::ReadOnly,
            ConfigError::UnknownResolver { .. } => ErrorCode::UnknownResolver,
            ConfigError::Resolver { .. } => ErrorCode::ResolverFailed,
            ConfigError::InterpolationCycle { .. } => ErrorCode::InterpolationCycle,
            ConfigError::InvalidInterpolation { .. } => ErrorCode::InvalidInterpolation,
            ConfigError::InvalidAppId { .. } => ErrorCode::InvalidAppId,
            ConfigError::InvalidInstall(_) => ErrorCode::InvalidInstall,
            ConfigError::UnknownPackage(_) => ErrorCode::UnknownPackage,
        }
    }

    // Convenience constructors

    pub fn path_not_found(path: impl Into<String>) -> Self {
        Self::PathNotFound { path: path.into() }
    }

    pub fn type_mismatch(path: impl Into<String>, expected: &'static str, found: &'static str) -> Self {
        Self::TypeMismatch {
            path: path.into(),
            expected,
            found,
        }
    }

    pub fn read_only(path: impl Into<String>) -> Self {
        Self::ReadOnly { path: path.into() }
    }

    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    pub fn invalid_interpolation(
        expression: impl Into<String>,
        path: impl Into<String>,
        reason: impl Into<String>,
    ) -> Self {
        Self::InvalidInterpolation {
            expression: expression.into(),
            path: path.into(),
            reason: reason.into(),
        }
    }

    /// True for errors raised by a mutation against a frozen node.
    pub fn is_read_only(&self) -> bool {
        matches!(self, ConfigError::ReadOnly { .. })
    }

    /// True for "not found" style errors (missing key, missing file).
    pub fn is_not_found(&self) -> bool {
        matches!(
            self,
            ConfigError::PathNotFound { .. }
                | ConfigError::FileNotFound { .. }
                | ConfigError::MissingDefaultLayer { .. }
        )
    }
}

/// Result type for configuration operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
