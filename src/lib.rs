pub mod booster;
pub mod chunker;
pub mod cli;
pub mod config;
pub mod constants;
pub mod container;
pub mod daemon;
pub mod error;
pub mod extractor;
pub mod fts;
pub mod ignore_matcher;
pub mod indexer;
pub mod logger;
pub mod output;
pub mod scanner;
pub mod search;
pub mod symbols;
pub mod watch;

pub use booster::{BoostedHit, Booster};
pub use chunker::{Chunk, ChunkKind, Chunker, WindowChunker};
pub use config::Config;
pub use error::{AgentdxError, Result};
pub use fts::{ChunkRecord, FtsHit, FtsStats, FtsStore};
pub use scanner::{FileInfo, Language, Scanner, WalkStats};
pub use symbols::{Symbol, SymbolStore, TraceMode};
