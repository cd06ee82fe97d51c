//! Central constants for agentdx configuration
//!
//! All string literals for paths, filenames, and configuration should be defined here
//! to avoid duplication and ensure consistency across the codebase.

use std::sync::atomic::AtomicBool;

/// Name of the project state directory, created under the project root
pub const STATE_DIR_NAME: &str = ".agentdx";

/// Name of the YAML config file inside the state directory
pub const CONFIG_FILE_NAME: &str = "config.yaml";

/// Name of the Docker Compose file agentdx writes/reads for the Postgres container
pub const COMPOSE_FILE_NAME: &str = "compose.yaml";

/// Name of the daemon PID file inside the state directory
pub const PID_FILE_NAME: &str = "agentdx.pid";

/// Name of the symbol store file inside the state directory
pub const SYMBOLS_FILE_NAME: &str = "symbols.bin";

/// Directory name for daemon logs inside the state directory
pub const LOG_DIR_NAME: &str = "logs";

/// Base log file name (rotated as agentdx.log, agentdx.log.1, ...)
pub const LOG_FILE_NAME: &str = "agentdx.log";

pub const DEFAULT_LOG_MAX_SIZE_MB: usize = 50;
pub const DEFAULT_LOG_MAX_FILES: usize = 5;
pub const DEFAULT_LOG_RETENTION_DAYS: i64 = 14;

/// File watcher debounce time in milliseconds
pub const DEFAULT_FSW_DEBOUNCE_MS: u64 = 2000;

/// Lock file name to indicate an active writer instance
/// This prevents multiple processes from writing to the same project concurrently.
pub const WRITER_LOCK_FILE: &str = ".writer.lock";

/// Default Postgres container image
pub const DEFAULT_PG_IMAGE: &str = "postgres:16-alpine";

/// Default Postgres port exposed on the host
pub const DEFAULT_PG_PORT: u16 = 5433;

/// Chunk size, in lines, for the fixed-window chunker
pub const DEFAULT_CHUNK_LINES: usize = 60;

/// Overlap, in lines, between successive chunks
pub const DEFAULT_CHUNK_OVERLAP_LINES: usize = 10;

/// Directories and files that should always be excluded from indexing,
/// in addition to whatever .gitignore/.agentdxignore specify.
pub const ALWAYS_EXCLUDED: &[&str] = &[
    // agentdx's own state
    ".agentdx",
    // Version control
    ".git",
    ".svn",
    ".hg",
    // Build artifacts
    "node_modules",
    "target",
    "dist",
    "build",
    "out",
    // Python
    "__pycache__",
    ".pytest_cache",
    ".tox",
    "venv",
    ".venv",
    // Ruby
    "vendor",
    ".bundle",
    // Java
    ".gradle",
    ".m2",
    // IDE
    ".idea",
    ".vscode",
    ".vs",
    // Other
    "coverage",
    ".nyc_output",
    ".cache",
];

/// Set by the CTRL-C handler on first press; a second press forces exit.
pub static SHUTDOWN_REQUESTED: AtomicBool = AtomicBool::new(false);
