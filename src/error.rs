//! Error taxonomy for the configuration engine.

use serde::Serialize;
use std::fmt;
use std::path::{Path, PathBuf};

/// Error kinds for programmatic error handling.
#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorKind {
    NotFound,
    Malformed,
    SchemaViolation,
    VaultUnavailable,
    EnvManagedConflict,
    RemoteFetchFailure,
    AmbiguousTarget,
    InvalidPath,
    Cancelled,
    Io,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::NotFound => "not found",
            ErrorKind::Malformed => "malformed",
            ErrorKind::SchemaViolation => "schema violation",
            ErrorKind::VaultUnavailable => "vault unavailable",
            ErrorKind::EnvManagedConflict => "managed by environment",
            ErrorKind::RemoteFetchFailure => "remote fetch failure",
            ErrorKind::AmbiguousTarget => "ambiguous target",
            ErrorKind::InvalidPath => "invalid path",
            ErrorKind::Cancelled => "cancelled",
            ErrorKind::Io => "io",
        };
        f.write_str(name)
    }
}

/// Errors raised by the configuration engine.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{what} not found: {name}")]
    NotFound { what: &'static str, name: String },

    #[error("failed to parse {source_name}: {reason}\n{raw}")]
    Malformed {
        source_name: String,
        reason: String,
        raw: String,
    },

    #[error("{location}: {message}")]
    SchemaViolation { location: String, message: String },

    #[error("credential vault unavailable: {0}")]
    VaultUnavailable(String),

    #[error(
        "property {path} is managed by environment variables: ${var} is set. \
         Unset {var} or update the variable instead of the configuration"
    )]
    EnvManagedConflict { path: String, var: String },

    #[error("failed to fetch {url}: {reason}")]
    RemoteFetchFailure {
        url: String,
        status: Option<u16>,
        reason: String,
    },

    #[error("cannot resolve a target file for the {layer} layer: {reason}")]
    AmbiguousTarget { layer: String, reason: String },

    #[error("invalid property path {path}: {reason}")]
    InvalidPath { path: String, reason: String },

    #[error("operation cancelled: {0}")]
    Cancelled(String),

    #[error("failed to {op} {}: {source}", .path.display())]
    Io {
        op: &'static str,
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl ConfigError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            ConfigError::NotFound { .. } => ErrorKind::NotFound,
            ConfigError::Malformed { .. } => ErrorKind::Malformed,
            ConfigError::SchemaViolation { .. } => ErrorKind::SchemaViolation,
            ConfigError::VaultUnavailable(_) => ErrorKind::VaultUnavailable,
            ConfigError::EnvManagedConflict { .. } => ErrorKind::EnvManagedConflict,
            ConfigError::RemoteFetchFailure { .. } => ErrorKind::RemoteFetchFailure,
            ConfigError::AmbiguousTarget { .. } => ErrorKind::AmbiguousTarget,
            ConfigError::InvalidPath { .. } => ErrorKind::InvalidPath,
            ConfigError::Cancelled(_) => ErrorKind::Cancelled,
            ConfigError::Io { .. } => ErrorKind::Io,
        }
    }

    // Convenience constructors

    pub fn not_found(what: &'static str, name: impl Into<String>) -> Self {
        ConfigError::NotFound {
            what,
            name: name.into(),
        }
    }

    pub fn malformed(
        source_name: impl Into<String>,
        raw: impl Into<String>,
        reason: impl fmt::Display,
    ) -> Self {
        ConfigError::Malformed {
            source_name: source_name.into(),
            reason: reason.to_string(),
            raw: raw.into(),
        }
    }

    pub fn io(op: &'static str, path: &Path, source: std::io::Error) -> Self {
        ConfigError::Io {
            op,
            path: path.to_path_buf(),
            source,
        }
    }

    pub fn invalid_path(path: &str, reason: impl Into<String>) -> Self {
        ConfigError::InvalidPath {
            path: path.to_string(),
            reason: reason.into(),
        }
    }

    pub fn ambiguous(layer: impl fmt::Display, reason: impl Into<String>) -> Self {
        ConfigError::AmbiguousTarget {
            layer: layer.to_string(),
            reason: reason.into(),
        }
    }

    pub fn fetch(url: &str, status: Option<u16>, reason: impl Into<String>) -> Self {
        ConfigError::RemoteFetchFailure {
            url: url.to_string(),
            status,
            reason: reason.into(),
        }
    }
}

/// A non-fatal condition surfaced to the caller for display.
#[derive(Debug, Clone, Serialize, PartialEq, Eq)]
pub struct Warning {
    pub kind: ErrorKind,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub location: Option<String>,
}

impl Warning {
    pub fn new(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
            location: None,
        }
    }

    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    pub fn schema(location: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorKind::SchemaViolation, message).with_location(location)
    }

    pub fn vault(message: impl Into<String>) -> Self {
        Self::new(ErrorKind::VaultUnavailable, message)
    }
}

impl From<ConfigError> for Warning {
    fn from(err: ConfigError) -> Self {
        let location = match &err {
            ConfigError::SchemaViolation { location, .. } => Some(location.clone()),
            ConfigError::Io { path, .. } => Some(path.display().to_string()),
            _ => None,
        };
        Self {
            kind: err.kind(),
            message: err.to_string(),
            location,
        }
    }
}

impl fmt::Display for Warning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "{}: {}", location, self.message),
            None => write!(f, "{}", self.message),
        }
    }
}

/// Result type for engine operations.
pub type Result<T> = std::result::Result<T, ConfigError>;
