//! Orchestrates scan → chunk → extract → store, for both a one-shot full
//! index and per-file incremental updates driven by the watcher.
//!
//! A single-writer invariant is enforced with an exclusive file lock on
//! `.agentdx/.writer.lock`, so a `watch` daemon and a concurrent `index
//! --force` never interleave writes to the same project.

use std::collections::HashSet;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use fs2::FileExt;
use tracing::{info, warn};

use crate::chunker::{self, Chunker, WindowChunker};
use crate::config::Config;
use crate::constants::WRITER_LOCK_FILE;
use crate::error::{AgentdxError, Result};
use crate::extractor::get_extractor;
use crate::fts::{ChunkRecord, FtsStore};
use crate::ignore_matcher::IgnoreMatcher;
use crate::scanner::Scanner;
use crate::symbols::SymbolStore;

#[derive(Debug, Clone, Default)]
pub struct IndexStats {
    pub files_indexed: usize,
    pub files_skipped: usize,
    pub files_removed: usize,
    pub chunks_written: usize,
    pub symbols_found: usize,
    pub duration_ms: u128,
}

/// Progress reported at each file boundary during a full index run.
#[derive(Debug, Clone)]
pub struct IndexProgress {
    pub current: usize,
    pub total: usize,
    pub current_file: String,
}

/// Holds an exclusive OS-level lock for its lifetime; dropping it releases
/// the lock, matching the teacher's `.writer.lock` discipline.
pub struct WriterLock {
    _file: File,
}

impl WriterLock {
    pub fn acquire(state_dir: &Path) -> Result<Self> {
        std::fs::create_dir_all(state_dir)
            .map_err(|e| AgentdxError::io(state_dir, e.to_string()))?;
        let lock_path = state_dir.join(WRITER_LOCK_FILE);
        let file = File::create(&lock_path).map_err(|e| AgentdxError::io(&lock_path, e.to_string()))?;
        file.try_lock_exclusive().map_err(|_| {
            AgentdxError::daemon("another agentdx process is already writing to this project".to_string())
        })?;
        Ok(Self { _file: file })
    }
}

pub struct Indexer {
    root: PathBuf,
    chunker: WindowChunker,
    fts: Arc<FtsStore>,
    symbols: Arc<SymbolStore>,
    ignore: IgnoreMatcher,
}

impl Indexer {
    pub fn new(
        root: impl Into<PathBuf>,
        config: &Config,
        fts: Arc<FtsStore>,
        symbols: Arc<SymbolStore>,
    ) -> Result<Self> {
        let root = root.into();
        let ignore = IgnoreMatcher::new(&root, &config.ignore_extra)?;
        Ok(Self {
            chunker: WindowChunker::new(config.chunk_lines, config.chunk_overlap_lines)?,
            root,
            fts,
            symbols,
            ignore,
        })
    }

    fn relative_path(&self, path: &Path) -> String {
        path.strip_prefix(&self.root)
            .unwrap_or(path)
            .to_string_lossy()
            .replace('\\', "/")
    }

    /// Scan the whole tree and (re)index every file found, guarded by the
    /// single-writer lock. Equivalent to `index_all_with_progress` with a
    /// no-op progress callback.
    pub async fn full_index(&self, state_dir: &Path) -> Result<IndexStats> {
        self.index_all_with_progress(state_dir, |_| {}).await
    }

    /// Scan the whole tree and (re)index every file found, reporting
    /// progress at each file boundary, then reconcile deletions: any file
    /// the store still has a record for but that is no longer on disk is
    /// removed from both stores.
    pub async fn index_all_with_progress<F>(
        &self,
        state_dir: &Path,
        mut progress_cb: F,
    ) -> Result<IndexStats>
    where
        F: FnMut(IndexProgress),
    {
        let started = Instant::now();
        let _lock = WriterLock::acquire(state_dir)?;

        let scanner = Scanner::new(&self.root);
        let (mut files, _walk_stats) = scanner.walk()?;
        files.sort_by(|a, b| a.path.cmp(&b.path));

        let total = files.len();
        let mut stats = IndexStats::default();
        let mut seen_paths: HashSet<String> = HashSet::new();

        for (i, file) in files.iter().enumerate() {
            let relative = self.relative_path(&file.path);
            progress_cb(IndexProgress {
                current: i + 1,
                total,
                current_file: relative.clone(),
            });

            match self.index_file(&file.path).await {
                Ok((chunks, symbols)) => {
                    stats.files_indexed += 1;
                    stats.chunks_written += chunks;
                    stats.symbols_found += symbols;
                    seen_paths.insert(relative);
                }
                Err(e) => {
                    warn!("Failed to index {}: {e}", file.path.display());
                    stats.files_skipped += 1;
                }
            }
        }

        stats.files_removed = self.reconcile_deletions(&seen_paths).await?;

        stats.duration_ms = started.elapsed().as_millis();
        info!(
            "Full index complete: {} files, {} chunks, {} symbols, {} removed in {}ms",
            stats.files_indexed, stats.chunks_written, stats.symbols_found, stats.files_removed, stats.duration_ms
        );
        Ok(stats)
    }

    /// Remove store entries for files that are indexed but no longer
    /// present on disk (deleted while the daemon wasn't running, or since
    /// the last full index). Returns the number of files removed.
    async fn reconcile_deletions(&self, seen: &HashSet<String>) -> Result<usize> {
        let indexed = self.fts.list_files_with_stats().await?;
        let mut removed = 0;
        for file in indexed {
            if !seen.contains(&file.path) {
                self.fts.delete_file(&file.path).await?;
                self.symbols.remove_file(&file.path).await?;
                removed += 1;
            }
        }
        Ok(removed)
    }

    /// Index (or re-index) a single file: chunk it into the FTS store and
    /// run symbol/reference extraction. Returns (chunks written, symbols found).
    pub async fn index_file(&self, path: &Path) -> Result<(usize, usize)> {
        if self.ignore.is_ignored(path, false) {
            return Ok((0, 0));
        }

        let content = Scanner::read_file(path)?;
        let relative = self.relative_path(path);

        let chunks = self.chunker.chunk_text(&relative, &content);
        let records: Vec<ChunkRecord> = chunks
            .iter()
            .map(|chunk| ChunkRecord {
                path: relative.clone(),
                start_line: chunk.start_line as i32,
                end_line: chunk.end_line as i32,
                kind: "window".to_string(),
                content: chunker::apply_storage_banner(&relative, &chunk.content),
                hash: chunk.hash.clone(),
            })
            .collect();
        self.fts.upsert_file(&relative, &records).await?;

        let language = crate::scanner::Language::from_path(path);
        let symbol_count = if let Some(extractor) = get_extractor(language) {
            let extraction = extractor.extract(&content);
            let count = extraction.symbols.len();
            self.symbols.update_file(&relative, &extraction).await?;
            count
        } else {
            self.symbols.remove_file(&relative).await?;
            0
        };

        Ok((chunks.len(), symbol_count))
    }

    /// Remove a deleted file from both stores.
    pub async fn remove_file(&self, path: &Path) -> Result<()> {
        let relative = self.relative_path(path);
        self.fts.delete_file(&relative).await?;
        self.symbols.remove_file(&relative).await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_writer_lock_rejects_second_holder() {
        let dir = tempfile::tempdir().unwrap();
        let _first = WriterLock::acquire(dir.path()).unwrap();
        let second = WriterLock::acquire(dir.path());
        assert!(second.is_err());
    }

    #[test]
    fn test_writer_lock_released_on_drop() {
        let dir = tempfile::tempdir().unwrap();
        {
            let _first = WriterLock::acquire(dir.path()).unwrap();
        }
        let second = WriterLock::acquire(dir.path());
        assert!(second.is_ok());
    }
}
