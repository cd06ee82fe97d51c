//! Fixed-size overlapping line-window chunker.
//!
//! AST-accurate chunking is out of scope; chunks are plain line windows
//! with a configurable overlap so a match near a window boundary still
//! surfaces in the neighboring chunk.

use sha2::{Digest, Sha256};

use crate::error::{AgentdxError, Result};

/// Represents a chunk of code with metadata.
#[derive(Debug, Clone)]
pub struct Chunk {
    /// The actual content of the chunk.
    pub content: String,
    /// Starting line number (1-indexed, inclusive).
    pub start_line: usize,
    /// Ending line number (1-indexed, inclusive).
    pub end_line: usize,
    /// Kind of chunk.
    pub kind: ChunkKind,
    /// File path this chunk belongs to (project-relative, forward slashes).
    pub path: String,
    /// Content hash, used for change detection and dedup.
    pub hash: String,
}

impl Chunk {
    pub fn new(content: String, start_line: usize, end_line: usize, kind: ChunkKind, path: String) -> Self {
        let hash = Self::compute_hash(&content);
        Self {
            content,
            start_line,
            end_line,
            kind,
            path,
            hash,
        }
    }

    /// Compute SHA-256 hash of content for dedup/change-detection.
    pub fn compute_hash(content: &str) -> String {
        let mut hasher = Sha256::new();
        hasher.update(content.as_bytes());
        format!("{:x}", hasher.finalize())
    }

    pub fn line_count(&self) -> usize {
        self.end_line.saturating_sub(self.start_line) + 1
    }

    pub fn size_bytes(&self) -> usize {
        self.content.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChunkKind {
    /// A fixed-size line window (the only kind this chunker produces).
    Window,
}

/// Trait for chunking strategies, kept so the indexer can be tested against
/// a fake chunker without depending on the concrete line-window algorithm.
pub trait Chunker: Send + Sync {
    fn chunk_text(&self, path: &str, content: &str) -> Vec<Chunk>;
}

/// Splits file content into overlapping fixed-size line windows.
pub struct WindowChunker {
    pub window_lines: usize,
    pub overlap_lines: usize,
}

impl WindowChunker {
    /// Construct a chunker with the given window size and overlap, both in
    /// lines. Fails with `ConfigError` if `overlap >= window_lines`, per the
    /// chunker's documented contract, rather than silently clamping.
    pub fn new(window_lines: usize, overlap_lines: usize) -> Result<Self> {
        if window_lines == 0 {
            return Err(AgentdxError::config("chunk window size must be at least 1 line"));
        }
        if overlap_lines >= window_lines {
            return Err(AgentdxError::config(format!(
                "chunk overlap ({overlap_lines}) must be less than window size ({window_lines})"
            )));
        }
        Ok(Self {
            window_lines,
            overlap_lines,
        })
    }
}

impl Default for WindowChunker {
    fn default() -> Self {
        Self::new(
            crate::constants::DEFAULT_CHUNK_LINES,
            crate::constants::DEFAULT_CHUNK_OVERLAP_LINES,
        )
        .expect("default chunk window/overlap constants are valid")
    }
}

/// Prefix chunk content with a storage banner naming its file, so a
/// path-qualified term still matches a chunk whose body never mentions its
/// own filename.
pub fn apply_storage_banner(path: &str, content: &str) -> String {
    format!("File: {path}\n\n{content}")
}

/// Strip a storage banner back off for presentation. A no-op if `content`
/// was never banner-prefixed with this `path`.
pub fn strip_storage_banner(path: &str, content: &str) -> String {
    let banner = format!("File: {path}\n\n");
    content.strip_prefix(banner.as_str()).unwrap_or(content).to_string()
}

impl Chunker for WindowChunker {
    fn chunk_text(&self, path: &str, content: &str) -> Vec<Chunk> {
        let lines: Vec<&str> = content.lines().collect();
        if lines.is_empty() {
            return Vec::new();
        }

        let stride = self.window_lines - self.overlap_lines;
        let mut chunks = Vec::new();
        let mut start = 0usize;

        loop {
            let end = (start + self.window_lines).min(lines.len());
            let window = lines[start..end].join("\n");
            chunks.push(Chunk::new(
                window,
                start + 1,
                end,
                ChunkKind::Window,
                path.to_string(),
            ));

            if end >= lines.len() {
                break;
            }
            start += stride;
        }

        chunks
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_window_for_short_file() {
        let chunker = WindowChunker::new(10, 2).unwrap();
        let content = "a\nb\nc\n";
        let chunks = chunker.chunk_text("f.rs", content);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].start_line, 1);
        assert_eq!(chunks[0].end_line, 3);
    }

    #[test]
    fn test_overlap_between_windows() {
        let chunker = WindowChunker::new(5, 2).unwrap();
        let content = (1..=12).map(|i| i.to_string()).collect::<Vec<_>>().join("\n");
        let chunks = chunker.chunk_text("f.rs", &content);

        assert!(chunks.len() > 1);
        for pair in chunks.windows(2) {
            let overlap = pair[0].end_line as i64 - pair[1].start_line as i64 + 1;
            assert_eq!(overlap, 2);
        }
        assert_eq!(chunks.last().unwrap().end_line, 12);
    }

    #[test]
    fn test_empty_file_produces_no_chunks() {
        let chunker = WindowChunker::default();
        assert!(chunker.chunk_text("empty.rs", "").is_empty());
    }

    #[test]
    fn test_hash_changes_with_content() {
        let a = Chunk::compute_hash("foo");
        let b = Chunk::compute_hash("bar");
        assert_ne!(a, b);
        assert_eq!(a, Chunk::compute_hash("foo"));
    }

    #[test]
    fn test_overlap_equal_to_window_is_config_error() {
        let err = WindowChunker::new(5, 5).unwrap_err();
        assert_eq!(err.kind(), "ConfigError");
    }

    #[test]
    fn test_overlap_greater_than_window_is_config_error() {
        assert!(WindowChunker::new(5, 9).is_err());
    }

    #[test]
    fn test_storage_banner_roundtrip() {
        let banner = apply_storage_banner("src/lib.rs", "fn main() {}");
        assert!(banner.starts_with("File: src/lib.rs\n\n"));
        assert_eq!(strip_storage_banner("src/lib.rs", &banner), "fn main() {}");
    }

    #[test]
    fn test_strip_storage_banner_is_noop_without_banner() {
        assert_eq!(strip_storage_banner("src/lib.rs", "fn main() {}"), "fn main() {}");
    }
}
