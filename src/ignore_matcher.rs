//! Shared ignore-pattern matching used by the scanner, watcher, and indexer.
//!
//! Wraps an `ignore::gitignore::Gitignore` built from the project's
//! `.gitignore`, `.agentdxignore`, and the built-in always-excluded list,
//! so all three collaborators agree on what counts as "in scope" without
//! re-walking the tree.

use std::path::Path;

use ignore::gitignore::{Gitignore, GitignoreBuilder};

use crate::constants::ALWAYS_EXCLUDED;
use crate::error::{AgentdxError, Result};

pub struct IgnoreMatcher {
    root: std::path::PathBuf,
    gitignore: Gitignore,
}

impl IgnoreMatcher {
    /// Build a matcher for `root`, layering `.gitignore`, `.agentdxignore`,
    /// and any extra patterns from config on top of the always-excluded list.
    pub fn new(root: impl Into<std::path::PathBuf>, extra_patterns: &[String]) -> Result<Self> {
        let root = root.into();
        let mut builder = GitignoreBuilder::new(&root);

        for name in ALWAYS_EXCLUDED {
            builder
                .add_line(None, name)
                .map_err(|e| AgentdxError::ignore(format!("built-in pattern '{name}': {e}")))?;
        }

        let gitignore_path = root.join(".gitignore");
        if gitignore_path.is_file() {
            if let Some(err) = builder.add(&gitignore_path) {
                return Err(AgentdxError::ignore(format!(
                    "reading {}: {err}",
                    gitignore_path.display()
                )));
            }
        }

        let agentdxignore_path = root.join(".agentdxignore");
        if agentdxignore_path.is_file() {
            if let Some(err) = builder.add(&agentdxignore_path) {
                return Err(AgentdxError::ignore(format!(
                    "reading {}: {err}",
                    agentdxignore_path.display()
                )));
            }
        }

        for pattern in extra_patterns {
            builder
                .add_line(None, pattern)
                .map_err(|e| AgentdxError::ignore(format!("extra pattern '{pattern}': {e}")))?;
        }

        let gitignore = builder
            .build()
            .map_err(|e| AgentdxError::ignore(format!("compiling ignore rules: {e}")))?;

        Ok(Self { root, gitignore })
    }

    /// True if `path` should be skipped during scanning/watching.
    pub fn is_ignored(&self, path: &Path, is_dir: bool) -> bool {
        self.gitignore.matched(path, is_dir).is_ignore()
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_always_excluded() {
        let dir = TempDir::new().unwrap();
        let matcher = IgnoreMatcher::new(dir.path(), &[]).unwrap();
        assert!(matcher.is_ignored(&dir.path().join("node_modules"), true));
        assert!(matcher.is_ignored(&dir.path().join(".git"), true));
        assert!(!matcher.is_ignored(&dir.path().join("src"), true));
    }

    #[test]
    fn test_gitignore_file_respected() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join(".gitignore"), "*.log\nbuild_output/\n").unwrap();
        let matcher = IgnoreMatcher::new(dir.path(), &[]).unwrap();
        assert!(matcher.is_ignored(&dir.path().join("debug.log"), false));
        assert!(matcher.is_ignored(&dir.path().join("build_output"), true));
        assert!(!matcher.is_ignored(&dir.path().join("main.rs"), false));
    }

    #[test]
    fn test_extra_patterns() {
        let dir = TempDir::new().unwrap();
        let matcher = IgnoreMatcher::new(dir.path(), &["*.generated.rs".to_string()]).unwrap();
        assert!(matcher.is_ignored(&dir.path().join("foo.generated.rs"), false));
    }
}
