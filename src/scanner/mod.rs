//! Filesystem scanner: walks a project root, honoring the ignore matcher,
//! and returns the set of indexable files with basic metadata.

use std::collections::HashMap;
use std::path::PathBuf;

use ignore::WalkBuilder;
use tracing::{debug, warn};

use crate::constants::ALWAYS_EXCLUDED;
use crate::error::{AgentdxError, Result};

mod binary;
mod language;

pub use binary::is_binary_file;
pub use language::Language;

/// Information about a discovered file.
#[derive(Debug, Clone)]
pub struct FileInfo {
    pub path: PathBuf,
    pub language: Language,
    pub size: u64,
}

/// Statistics about a completed walk.
#[derive(Debug, Default, Clone)]
pub struct WalkStats {
    pub total_files: usize,
    pub indexable_files: usize,
    pub skipped_binary: usize,
    pub files_by_language: HashMap<Language, usize>,
    pub total_size_bytes: u64,
}

impl WalkStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_file(&mut self, file: &FileInfo) {
        self.indexable_files += 1;
        self.total_size_bytes += file.size;
        *self.files_by_language.entry(file.language).or_insert(0) += 1;
    }

    pub fn add_skipped_binary(&mut self) {
        self.skipped_binary += 1;
    }

    pub fn total_size_mb(&self) -> f64 {
        self.total_size_bytes as f64 / (1024.0 * 1024.0)
    }

    pub fn print_summary(&self) {
        debug!("Scan complete: {} total, {} indexable, {} skipped, {:.2} MB",
            self.total_files, self.indexable_files, self.skipped_binary, self.total_size_mb());
    }
}

/// Walks a project root respecting `.gitignore` and `.agentdxignore`.
pub struct Scanner {
    root: PathBuf,
    respect_gitignore: bool,
}

impl Scanner {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            respect_gitignore: true,
        }
    }

    /// Walk the tree, returning discovered files and summary stats.
    pub fn walk(&self) -> Result<(Vec<FileInfo>, WalkStats)> {
        let mut files = Vec::new();
        let mut stats = WalkStats::new();

        debug!("Starting scan in: {}", self.root.display());

        let mut builder = WalkBuilder::new(&self.root);
        builder
            .git_ignore(self.respect_gitignore)
            .git_global(self.respect_gitignore)
            .git_exclude(self.respect_gitignore)
            .hidden(true)
            .add_custom_ignore_filename(".agentdxignore")
            .filter_entry(|entry| {
                if entry.depth() == 0 {
                    return true;
                }
                if let Some(name) = entry.file_name().to_str() {
                    if ALWAYS_EXCLUDED.contains(&name) {
                        debug!("Excluding directory: {}", entry.path().display());
                        return false;
                    }
                }
                true
            });

        for result in builder.build() {
            match result {
                Ok(entry) => {
                    stats.total_files += 1;

                    let file_type = entry.file_type();
                    if file_type.is_none() || !file_type.unwrap().is_file() {
                        continue;
                    }

                    let path = entry.path();

                    if is_binary_file(path) {
                        stats.add_skipped_binary();
                        continue;
                    }

                    let language = Language::from_path(path);
                    if !language.is_indexable() {
                        stats.add_skipped_binary();
                        continue;
                    }

                    let size = entry.metadata().ok().map(|m| m.len()).unwrap_or(0);

                    let file_info = FileInfo {
                        path: path.to_path_buf(),
                        language,
                        size,
                    };

                    stats.add_file(&file_info);
                    files.push(file_info);
                }
                Err(err) => {
                    warn!("Error walking file: {}", err);
                }
            }
        }

        stats.print_summary();

        Ok((files, stats))
    }

    /// Walk files, returning just the paths.
    pub fn walk_paths(&self) -> Result<Vec<PathBuf>> {
        let (files, _) = self.walk()?;
        Ok(files.into_iter().map(|f| f.path).collect())
    }

    pub fn read_file(path: &std::path::Path) -> Result<String> {
        std::fs::read_to_string(path)
            .map_err(|e| AgentdxError::scan(path, format!("reading file: {e}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_scanner_basic() {
        let dir = TempDir::new().unwrap();

        fs::write(dir.path().join("test.rs"), "fn main() {}").unwrap();
        fs::write(dir.path().join("test.py"), "print('hello')").unwrap();
        fs::write(dir.path().join("README.md"), "# Test").unwrap();

        let scanner = Scanner::new(dir.path());
        let (files, stats) = scanner.walk().unwrap();

        assert_eq!(files.len(), 3);
        assert_eq!(stats.indexable_files, 3);
    }

    #[test]
    fn test_skip_binary_files() {
        let dir = TempDir::new().unwrap();

        fs::write(dir.path().join("test.txt"), "hello world").unwrap();
        let bin_path = dir.path().join("test.bin");
        fs::write(&bin_path, [0u8, 1, 2, 3, 255]).unwrap();

        let scanner = Scanner::new(dir.path());
        let (files, stats) = scanner.walk().unwrap();

        assert_eq!(files.len(), 1);
        assert!(stats.skipped_binary > 0);
    }

    #[test]
    fn test_excluded_directories() {
        let dir = TempDir::new().unwrap();

        let node_modules = dir.path().join("node_modules");
        fs::create_dir(&node_modules).unwrap();
        fs::write(node_modules.join("package.js"), "test").unwrap();
        fs::write(dir.path().join("index.js"), "test").unwrap();

        let scanner = Scanner::new(dir.path());
        let (files, _) = scanner.walk().unwrap();

        assert_eq!(files.len(), 1);
        assert_eq!(files[0].path.file_name().unwrap(), "index.js");
    }
}
