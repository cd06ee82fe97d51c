//! Full-text search module backed by PostgreSQL `tsvector`/`tsquery`.
//!
//! Replaces local BM25 indexing with a server-side GIN index so the store
//! can be shared across the CLI and the watch daemon without file-locking
//! concerns.

mod postgres_store;

pub use postgres_store::{BackendStatus, ChunkRecord, FileStat, FtsHit, FtsStats, FtsStore};
