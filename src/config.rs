//! Project configuration: defaults, `.agentdx/config.yaml`, and env overrides.
//!
//! Precedence mirrors the daemon config loader this crate started from:
//! built-in defaults, then the on-disk YAML file, then environment
//! variables. CLI flags are applied by the caller on top of the loaded
//! `Config`.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::constants::{
    CONFIG_FILE_NAME, DEFAULT_CHUNK_LINES, DEFAULT_CHUNK_OVERLAP_LINES, DEFAULT_FSW_DEBOUNCE_MS,
    DEFAULT_PG_IMAGE, DEFAULT_PG_PORT, STATE_DIR_NAME,
};
use crate::error::{AgentdxError, Result};

/// Options for the auto-managed Postgres container.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ContainerOptions {
    pub image: String,
    pub container_name: String,
    pub port: u16,
    pub volume_name: String,
}

impl ContainerOptions {
    fn defaults(slug: &str) -> Self {
        Self {
            image: DEFAULT_PG_IMAGE.to_string(),
            container_name: format!("agentdx-{slug}"),
            port: DEFAULT_PG_PORT,
            volume_name: format!("agentdx-{slug}-data"),
        }
    }
}

/// Full project configuration, round-tripped to `.agentdx/config.yaml`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// Human-provided project name, before slugging.
    pub project_name: String,
    /// Normalized project slug (lowercase, `_`-separated, idempotent).
    pub slug: String,
    pub container: ContainerOptions,
    /// Size, in lines, of each chunk written to the FTS store.
    pub chunk_lines: usize,
    /// Overlap, in lines, between successive chunks.
    pub chunk_overlap_lines: usize,
    /// Debounce window for the file watcher, in milliseconds.
    pub debounce_ms: u64,
    /// Extra ignore patterns beyond .gitignore / always-excluded dirs.
    #[serde(default)]
    pub ignore_extra: Vec<String>,
}

impl Config {
    /// Build a fresh default config for a project rooted at `root`.
    pub fn new_default(root: &Path) -> Result<Self> {
        let project_name = root
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("project")
            .to_string();
        let slug = normalize_slug(&project_name)?;
        Ok(Self {
            container: ContainerOptions::defaults(&slug),
            project_name,
            slug,
            chunk_lines: DEFAULT_CHUNK_LINES,
            chunk_overlap_lines: DEFAULT_CHUNK_OVERLAP_LINES,
            debounce_ms: DEFAULT_FSW_DEBOUNCE_MS,
            ignore_extra: Vec::new(),
        })
    }

    pub fn state_dir(root: &Path) -> PathBuf {
        root.join(STATE_DIR_NAME)
    }

    pub fn config_path(root: &Path) -> PathBuf {
        Self::state_dir(root).join(CONFIG_FILE_NAME)
    }

    /// Load config from `.agentdx/config.yaml`, applying env-var overrides.
    /// Fails closed on an unrecognized shape rather than silently coercing.
    pub fn load(root: &Path) -> Result<Self> {
        let path = Self::config_path(root);
        let raw = std::fs::read_to_string(&path)
            .map_err(|e| AgentdxError::config(format!("reading {}: {e}", path.display())))?;
        let mut config: Config = serde_yaml::from_str(&raw)
            .map_err(|e| AgentdxError::config(format!("parsing {}: {e}", path.display())))?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Persist this config to `.agentdx/config.yaml`, creating the state
    /// directory if needed.
    pub fn save(&self, root: &Path) -> Result<()> {
        let dir = Self::state_dir(root);
        std::fs::create_dir_all(&dir)
            .map_err(|e| AgentdxError::config(format!("creating {}: {e}", dir.display())))?;
        let yaml = serde_yaml::to_string(self)
            .map_err(|e| AgentdxError::config(format!("serializing config: {e}")))?;
        std::fs::write(Self::config_path(root), yaml)
            .map_err(|e| AgentdxError::config(format!("writing config: {e}")))
    }

    fn apply_env_overrides(&mut self) {
        if let Ok(port) = std::env::var("AGENTDX_PG_PORT") {
            if let Ok(port) = port.parse() {
                self.container.port = port;
            }
        }
        if let Ok(name) = std::env::var("AGENTDX_PG_CONTAINER_NAME") {
            self.container.container_name = name;
        }
        if let Ok(image) = std::env::var("AGENTDX_PG_IMAGE") {
            self.container.image = image;
        }
        if let Ok(ms) = std::env::var("AGENTDX_DEBOUNCE_MS") {
            if let Ok(ms) = ms.parse() {
                self.debounce_ms = ms;
            }
        }
    }
}

/// Normalize a project name into a slug: lowercase, `-`/space -> `_`,
/// strip non-alphanumeric/underscore characters, collapse repeated `_`,
/// trim leading/trailing `_`. Idempotent: `normalize_slug(normalize_slug(s)) == normalize_slug(s)`.
pub fn normalize_slug(input: &str) -> Result<String> {
    let lowered = input.to_lowercase();
    let mut collapsed = String::with_capacity(lowered.len());
    let mut last_was_underscore = false;
    for ch in lowered.chars() {
        let mapped = match ch {
            '-' | ' ' => Some('_'),
            c if c.is_ascii_alphanumeric() || c == '_' => Some(c),
            _ => None,
        };
        match mapped {
            Some('_') => {
                if !last_was_underscore {
                    collapsed.push('_');
                }
                last_was_underscore = true;
            }
            Some(c) => {
                collapsed.push(c);
                last_was_underscore = false;
            }
            None => {}
        }
    }
    let trimmed = collapsed.trim_matches('_').to_string();
    if trimmed.is_empty() {
        return Err(AgentdxError::slug(format!(
            "'{input}' normalizes to an empty slug"
        )));
    }
    Ok(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_slug_basic() {
        assert_eq!(normalize_slug("My Project").unwrap(), "my_project");
        assert_eq!(normalize_slug("my-project").unwrap(), "my_project");
        assert_eq!(normalize_slug("  weird!! Name--").unwrap(), "weird_name");
    }

    #[test]
    fn test_normalize_slug_idempotent() {
        let once = normalize_slug("Some -- Weird  Name!!").unwrap();
        let twice = normalize_slug(&once).unwrap();
        assert_eq!(once, twice);
    }

    #[test]
    fn test_normalize_slug_empty_is_error() {
        assert!(normalize_slug("!!!").is_err());
        assert!(normalize_slug("---").is_err());
    }

    #[test]
    fn test_config_new_default() {
        let dir = std::path::Path::new("/tmp/my-cool-project");
        let config = Config::new_default(dir).unwrap();
        assert_eq!(config.slug, "my_cool_project");
        assert_eq!(config.container.container_name, "agentdx-my_cool_project");
    }
}
