//! Centralized error types for agentdx
//!
//! A `thiserror`-based taxonomy used throughout the codebase instead of
//! ad-hoc `anyhow::Error`. Each variant carries a machine-readable `kind()`
//! tag so the CLI's `--json` mode can emit `{"error": ..., "kind": ...}`.

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for agentdx operations.
#[derive(Error, Debug)]
pub enum AgentdxError {
    /// Project config is missing, malformed, or names an unrecognized mode.
    #[error("configuration error: {message}")]
    Config { message: String },

    /// Project slug normalization failed (e.g. empty result).
    #[error("slug error: {message}")]
    Slug { message: String },

    /// The `docker` CLI binary could not be located or invoked.
    #[error("docker unavailable: {message}")]
    DockerUnavailable { message: String },

    /// The configured host port is already bound by another process.
    #[error("port {port} already in use: {message}")]
    PortInUse { port: u16, message: String },

    /// The Postgres container failed to start or exited unexpectedly.
    #[error("container error: {message}")]
    Container { message: String },

    /// The container is running but not yet accepting connections.
    #[error("store not ready: {message}")]
    NotReady { message: String },

    /// Could not establish a Postgres connection.
    #[error("connect error: {message}")]
    Connect {
        message: String,
        #[source]
        source: Option<sqlx::Error>,
    },

    /// Schema creation/migration failed.
    #[error("schema error: {message}")]
    Schema { message: String },

    /// A read or write against the FTS/symbol store failed.
    #[error("store error: {message}")]
    Store { message: String },

    /// A malformed or unsupported search query.
    #[error("query error: {message}")]
    Query { message: String },

    /// Filesystem walk failed.
    #[error("scan error: {path} - {message}")]
    Scan { path: PathBuf, message: String },

    /// Ignore-pattern compilation failed.
    #[error("ignore error: {message}")]
    Ignore { message: String },

    /// Symbol store corruption or I/O failure.
    #[error("symbol store error: {message}")]
    SymbolStore { message: String },

    /// Daemon lifecycle error (spawn, PID file, stale lock, ...).
    #[error("daemon error: {message}")]
    Daemon { message: String },

    /// Generic I/O error with path context.
    #[error("I/O error: {path} - {message}")]
    Io { path: PathBuf, message: String },
}

impl AgentdxError {
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    pub fn slug(message: impl Into<String>) -> Self {
        Self::Slug {
            message: message.into(),
        }
    }

    pub fn docker_unavailable(message: impl Into<String>) -> Self {
        Self::DockerUnavailable {
            message: message.into(),
        }
    }

    pub fn port_in_use(port: u16, message: impl Into<String>) -> Self {
        Self::PortInUse {
            port,
            message: message.into(),
        }
    }

    pub fn container(message: impl Into<String>) -> Self {
        Self::Container {
            message: message.into(),
        }
    }

    pub fn not_ready(message: impl Into<String>) -> Self {
        Self::NotReady {
            message: message.into(),
        }
    }

    pub fn connect(message: impl Into<String>) -> Self {
        Self::Connect {
            message: message.into(),
            source: None,
        }
    }

    pub fn schema(message: impl Into<String>) -> Self {
        Self::Schema {
            message: message.into(),
        }
    }

    pub fn store(message: impl Into<String>) -> Self {
        Self::Store {
            message: message.into(),
        }
    }

    pub fn query(message: impl Into<String>) -> Self {
        Self::Query {
            message: message.into(),
        }
    }

    pub fn scan(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Scan {
            path: path.into(),
            message: message.into(),
        }
    }

    pub fn ignore(message: impl Into<String>) -> Self {
        Self::Ignore {
            message: message.into(),
        }
    }

    pub fn symbol_store(message: impl Into<String>) -> Self {
        Self::SymbolStore {
            message: message.into(),
        }
    }

    pub fn daemon(message: impl Into<String>) -> Self {
        Self::Daemon {
            message: message.into(),
        }
    }

    pub fn io(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Io {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Machine-readable tag for `--json` error output.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Config { .. } => "ConfigError",
            Self::Slug { .. } => "SlugError",
            Self::DockerUnavailable { .. } => "DockerUnavailable",
            Self::PortInUse { .. } => "PortInUse",
            Self::Container { .. } => "ContainerError",
            Self::NotReady { .. } => "NotReady",
            Self::Connect { .. } => "ConnectError",
            Self::Schema { .. } => "SchemaError",
            Self::Store { .. } => "StoreError",
            Self::Query { .. } => "QueryError",
            Self::Scan { .. } => "ScanError",
            Self::Ignore { .. } => "IgnoreError",
            Self::SymbolStore { .. } => "SymbolStoreError",
            Self::Daemon { .. } => "DaemonError",
            Self::Io { .. } => "IoError",
        }
    }

    /// Whether this error represents a semantic/query-level failure that
    /// should still exit 0 in `--json` mode (vs. a startup failure).
    pub fn is_semantic(&self) -> bool {
        matches!(self, Self::Query { .. } | Self::NotReady { .. })
    }
}

impl From<std::io::Error> for AgentdxError {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            path: PathBuf::new(),
            message: err.to_string(),
        }
    }
}

impl From<sqlx::Error> for AgentdxError {
    fn from(err: sqlx::Error) -> Self {
        Self::Connect {
            message: err.to_string(),
            source: Some(err),
        }
    }
}

/// Result type alias for agentdx operations.
pub type Result<T> = std::result::Result<T, AgentdxError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = AgentdxError::config("bad mode");
        assert!(err.to_string().contains("configuration error"));
        assert_eq!(err.kind(), "ConfigError");
    }

    #[test]
    fn test_semantic_vs_startup() {
        assert!(AgentdxError::query("bad syntax").is_semantic());
        assert!(!AgentdxError::container("exited").is_semantic());
    }

    #[test]
    fn test_port_in_use_message() {
        let err = AgentdxError::port_in_use(5433, "already bound");
        assert!(err.to_string().contains("5433"));
        assert_eq!(err.kind(), "PortInUse");
    }
}
