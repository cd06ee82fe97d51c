//! Symbol store: an arena/table of declarations plus a call-edge list,
//! queried by name and traversed with a bounded BFS for `trace`.
//!
//! Persisted as a single bincode file under `.agentdx/symbols.bin`,
//! written with a write-temp-then-rename so a crash mid-write never
//! corrupts the on-disk copy (the same technique the log rotator uses
//! for its own renames, generalized to a single-file atomic replace).

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tokio::sync::RwLock;

use crate::error::{AgentdxError, Result};
use crate::extractor::ExtractionResult;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Symbol {
    pub id: u32,
    pub name: String,
    pub kind: String,
    pub file: String,
    pub line: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CallEdge {
    pub caller: u32,
    pub callee: u32,
    pub line: usize,
}

/// A call whose callee name did not resolve to a known symbol — kept so
/// `trace` results can report "calls an unresolved name" rather than
/// silently dropping it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnresolvedCall {
    pub caller: u32,
    pub callee_name: String,
    pub line: usize,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct SymbolTableData {
    symbols: Vec<Symbol>,
    edges: Vec<CallEdge>,
    unresolved: Vec<UnresolvedCall>,
    next_id: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceMode {
    Callers,
    Callees,
}

#[derive(Debug, Clone, Serialize)]
pub struct TraceHop {
    pub symbol: Symbol,
    pub depth: usize,
    pub via_line: usize,
}

struct Inner {
    data: SymbolTableData,
    by_name_file: HashMap<(String, String), u32>,
    by_name: HashMap<String, Vec<u32>>,
    outgoing: HashMap<u32, Vec<(u32, usize)>>,
    incoming: HashMap<u32, Vec<(u32, usize)>>,
}

impl Inner {
    fn rebuild_indexes(data: SymbolTableData) -> Self {
        let mut by_name_file = HashMap::new();
        let mut by_name: HashMap<String, Vec<u32>> = HashMap::new();
        for sym in &data.symbols {
            by_name_file.insert((sym.name.clone(), sym.file.clone()), sym.id);
            by_name.entry(sym.name.clone()).or_default().push(sym.id);
        }
        let mut outgoing: HashMap<u32, Vec<(u32, usize)>> = HashMap::new();
        let mut incoming: HashMap<u32, Vec<(u32, usize)>> = HashMap::new();
        for edge in &data.edges {
            outgoing
                .entry(edge.caller)
                .or_default()
                .push((edge.callee, edge.line));
            incoming
                .entry(edge.callee)
                .or_default()
                .push((edge.caller, edge.line));
        }
        Self {
            data,
            by_name_file,
            by_name,
            outgoing,
            incoming,
        }
    }
}

/// Crash-safe, in-process symbol table with a bounded BFS traversal.
pub struct SymbolStore {
    path: PathBuf,
    inner: RwLock<Inner>,
}

impl SymbolStore {
    /// Open the store at `path`, loading it if it exists or starting
    /// empty otherwise.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        let data = if path.exists() {
            let bytes = std::fs::read(&path)
                .map_err(|e| AgentdxError::symbol_store(format!("reading {}: {e}", path.display())))?;
            bincode::deserialize(&bytes)
                .map_err(|e| AgentdxError::symbol_store(format!("decoding {}: {e}", path.display())))?
        } else {
            SymbolTableData::default()
        };

        Ok(Self {
            path,
            inner: RwLock::new(Inner::rebuild_indexes(data)),
        })
    }

    /// Replace all symbols/edges previously recorded for `file` with the
    /// freshly extracted ones, then persist.
    pub async fn update_file(&self, file: &str, extraction: &ExtractionResult) -> Result<()> {
        let mut guard = self.inner.write().await;

        let old_ids: Vec<u32> = guard
            .data
            .symbols
            .iter()
            .filter(|s| s.file == file)
            .map(|s| s.id)
            .collect();
        guard.data.symbols.retain(|s| s.file != file);
        guard
            .data
            .edges
            .retain(|e| !old_ids.contains(&e.caller) && !old_ids.contains(&e.callee));
        guard.data.unresolved.retain(|u| !old_ids.contains(&u.caller));

        let mut local_ids: HashMap<String, u32> = HashMap::new();
        for sym in &extraction.symbols {
            let id = guard.data.next_id;
            guard.data.next_id += 1;
            local_ids.insert(sym.name.clone(), id);
            guard.data.symbols.push(Symbol {
                id,
                name: sym.name.clone(),
                kind: sym.kind.as_str().to_string(),
                file: file.to_string(),
                line: sym.line,
            });
        }

        // Build a lookup across the whole store (post file-symbols-added)
        // so calls can resolve to symbols declared in other files too.
        let mut global_by_name: HashMap<String, Vec<u32>> = HashMap::new();
        for sym in &guard.data.symbols {
            global_by_name.entry(sym.name.clone()).or_default().push(sym.id);
        }

        for call in &extraction.calls {
            let Some(caller_name) = &call.caller else {
                continue;
            };
            let Some(&caller_id) = local_ids.get(caller_name) else {
                continue;
            };

            match global_by_name.get(&call.callee) {
                Some(callee_ids) => {
                    for &callee_id in callee_ids {
                        guard.data.edges.push(CallEdge {
                            caller: caller_id,
                            callee: callee_id,
                            line: call.line,
                        });
                    }
                }
                None => {
                    guard.data.unresolved.push(UnresolvedCall {
                        caller: caller_id,
                        callee_name: call.callee.clone(),
                        line: call.line,
                    });
                }
            }
        }

        let rebuilt = std::mem::replace(&mut guard.data, SymbolTableData::default());
        *guard = Inner::rebuild_indexes(rebuilt);

        self.persist_locked(&guard).await
    }

    /// Drop everything recorded for `file` (used when a watched file is deleted).
    pub async fn remove_file(&self, file: &str) -> Result<()> {
        let mut guard = self.inner.write().await;
        let old_ids: Vec<u32> = guard
            .data
            .symbols
            .iter()
            .filter(|s| s.file == file)
            .map(|s| s.id)
            .collect();
        guard.data.symbols.retain(|s| s.file != file);
        guard
            .data
            .edges
            .retain(|e| !old_ids.contains(&e.caller) && !old_ids.contains(&e.callee));
        guard.data.unresolved.retain(|u| !old_ids.contains(&u.caller));

        let rebuilt = std::mem::replace(&mut guard.data, SymbolTableData::default());
        *guard = Inner::rebuild_indexes(rebuilt);
        self.persist_locked(&guard).await
    }

    pub async fn find_by_name(&self, name: &str) -> Vec<Symbol> {
        let guard = self.inner.read().await;
        guard
            .by_name
            .get(name)
            .map(|ids| {
                ids.iter()
                    .filter_map(|id| guard.data.symbols.iter().find(|s| s.id == *id).cloned())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Bounded BFS from every symbol matching `name`, in the requested
    /// direction, up to `max_depth` hops. Cycles are handled via a
    /// visited set so recursive call graphs terminate.
    pub async fn trace(&self, name: &str, mode: TraceMode, max_depth: usize) -> Vec<TraceHop> {
        let guard = self.inner.read().await;
        let Some(start_ids) = guard.by_name.get(name) else {
            return Vec::new();
        };

        let adjacency = match mode {
            TraceMode::Callers => &guard.incoming,
            TraceMode::Callees => &guard.outgoing,
        };

        let mut visited: std::collections::HashSet<u32> = start_ids.iter().copied().collect();
        let mut frontier: Vec<u32> = start_ids.clone();
        let mut hops = Vec::new();

        for depth in 1..=max_depth {
            let mut next_frontier = Vec::new();
            for &node in &frontier {
                let Some(edges) = adjacency.get(&node) else {
                    continue;
                };
                for &(neighbor, line) in edges {
                    if visited.contains(&neighbor) {
                        continue;
                    }
                    visited.insert(neighbor);
                    if let Some(sym) = guard.data.symbols.iter().find(|s| s.id == neighbor) {
                        hops.push(TraceHop {
                            symbol: sym.clone(),
                            depth,
                            via_line: line,
                        });
                    }
                    next_frontier.push(neighbor);
                }
            }
            if next_frontier.is_empty() {
                break;
            }
            frontier = next_frontier;
        }

        hops
    }

    /// Direct (depth-1) callers of every symbol named `name`, across all
    /// files. Unlike `trace`, this does not walk the graph further.
    pub async fn lookup_callers(&self, name: &str) -> Vec<TraceHop> {
        let guard = self.inner.read().await;
        let Some(ids) = guard.by_name.get(name) else {
            return Vec::new();
        };

        let mut hops = Vec::new();
        for &id in ids {
            let Some(edges) = guard.incoming.get(&id) else {
                continue;
            };
            for &(caller_id, line) in edges {
                if let Some(sym) = guard.data.symbols.iter().find(|s| s.id == caller_id) {
                    hops.push(TraceHop {
                        symbol: sym.clone(),
                        depth: 1,
                        via_line: line,
                    });
                }
            }
        }
        hops
    }

    /// Direct (depth-1) callees of the symbol named `name` declared in
    /// `file`. Disambiguates by file since several files can declare a
    /// symbol with the same name.
    pub async fn lookup_callees(&self, name: &str, file: &str) -> Vec<TraceHop> {
        let guard = self.inner.read().await;
        let Some(&id) = guard.by_name_file.get(&(name.to_string(), file.to_string())) else {
            return Vec::new();
        };

        let Some(edges) = guard.outgoing.get(&id) else {
            return Vec::new();
        };

        edges
            .iter()
            .filter_map(|&(callee_id, line)| {
                guard.data.symbols.iter().find(|s| s.id == callee_id).map(|sym| TraceHop {
                    symbol: sym.clone(),
                    depth: 1,
                    via_line: line,
                })
            })
            .collect()
    }

    pub async fn symbol_count(&self) -> usize {
        self.inner.read().await.data.symbols.len()
    }

    pub async fn edge_count(&self) -> usize {
        self.inner.read().await.data.edges.len()
    }

    async fn persist_locked(&self, guard: &Inner) -> Result<()> {
        let bytes = bincode::serialize(&guard.data)
            .map_err(|e| AgentdxError::symbol_store(format!("encoding store: {e}")))?;

        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| AgentdxError::symbol_store(format!("creating {}: {e}", parent.display())))?;
        }

        let tmp_path = tmp_path_for(&self.path);
        std::fs::write(&tmp_path, &bytes)
            .map_err(|e| AgentdxError::symbol_store(format!("writing {}: {e}", tmp_path.display())))?;
        std::fs::rename(&tmp_path, &self.path)
            .map_err(|e| AgentdxError::symbol_store(format!("renaming into {}: {e}", self.path.display())))?;

        Ok(())
    }
}

fn tmp_path_for(path: &Path) -> PathBuf {
    let mut tmp = path.as_os_str().to_os_string();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::extractor::{ExtractedCall, ExtractedSymbol, SymbolKind};
    use tempfile::TempDir;

    fn sample() -> ExtractionResult {
        ExtractionResult {
            symbols: vec![
                ExtractedSymbol { name: "outer".into(), kind: SymbolKind::Function, line: 1 },
                ExtractedSymbol { name: "inner".into(), kind: SymbolKind::Function, line: 5 },
            ],
            calls: vec![ExtractedCall {
                caller: Some("outer".into()),
                callee: "inner".into(),
                line: 2,
            }],
        }
    }

    #[tokio::test]
    async fn test_update_and_trace_callees() {
        let dir = TempDir::new().unwrap();
        let store = SymbolStore::open(dir.path().join("symbols.bin")).await.unwrap();
        store.update_file("a.rs", &sample()).await.unwrap();

        assert_eq!(store.symbol_count().await, 2);
        assert_eq!(store.edge_count().await, 1);

        let hops = store.trace("outer", TraceMode::Callees, 5).await;
        assert_eq!(hops.len(), 1);
        assert_eq!(hops[0].symbol.name, "inner");
    }

    #[tokio::test]
    async fn test_trace_callers() {
        let dir = TempDir::new().unwrap();
        let store = SymbolStore::open(dir.path().join("symbols.bin")).await.unwrap();
        store.update_file("a.rs", &sample()).await.unwrap();

        let hops = store.trace("inner", TraceMode::Callers, 5).await;
        assert_eq!(hops.len(), 1);
        assert_eq!(hops[0].symbol.name, "outer");
    }

    #[tokio::test]
    async fn test_unresolved_call_does_not_panic() {
        let dir = TempDir::new().unwrap();
        let store = SymbolStore::open(dir.path().join("symbols.bin")).await.unwrap();
        let extraction = ExtractionResult {
            symbols: vec![ExtractedSymbol { name: "f".into(), kind: SymbolKind::Function, line: 1 }],
            calls: vec![ExtractedCall { caller: Some("f".into()), callee: "unknown_fn".into(), line: 2 }],
        };
        store.update_file("a.rs", &extraction).await.unwrap();
        assert_eq!(store.edge_count().await, 0);
    }

    #[tokio::test]
    async fn test_remove_file_clears_symbols() {
        let dir = TempDir::new().unwrap();
        let store = SymbolStore::open(dir.path().join("symbols.bin")).await.unwrap();
        store.update_file("a.rs", &sample()).await.unwrap();
        store.remove_file("a.rs").await.unwrap();
        assert_eq!(store.symbol_count().await, 0);
        assert_eq!(store.edge_count().await, 0);
    }

    #[tokio::test]
    async fn test_persists_across_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("symbols.bin");
        {
            let store = SymbolStore::open(&path).await.unwrap();
            store.update_file("a.rs", &sample()).await.unwrap();
        }
        let reopened = SymbolStore::open(&path).await.unwrap();
        assert_eq!(reopened.symbol_count().await, 2);
    }

    #[tokio::test]
    async fn test_lookup_callers_is_direct_only() {
        let dir = TempDir::new().unwrap();
        let store = SymbolStore::open(dir.path().join("symbols.bin")).await.unwrap();
        store.update_file("a.rs", &sample()).await.unwrap();

        let hops = store.lookup_callers("inner").await;
        assert_eq!(hops.len(), 1);
        assert_eq!(hops[0].symbol.name, "outer");
        assert_eq!(hops[0].depth, 1);
    }

    #[tokio::test]
    async fn test_lookup_callees_disambiguates_by_file() {
        let dir = TempDir::new().unwrap();
        let store = SymbolStore::open(dir.path().join("symbols.bin")).await.unwrap();
        store.update_file("a.rs", &sample()).await.unwrap();

        let hops = store.lookup_callees("outer", "a.rs").await;
        assert_eq!(hops.len(), 1);
        assert_eq!(hops[0].symbol.name, "inner");

        assert!(store.lookup_callees("outer", "b.rs").await.is_empty());
    }

    #[tokio::test]
    async fn test_cycle_terminates_bfs() {
        let dir = TempDir::new().unwrap();
        let store = SymbolStore::open(dir.path().join("symbols.bin")).await.unwrap();
        let extraction = ExtractionResult {
            symbols: vec![
                ExtractedSymbol { name: "a".into(), kind: SymbolKind::Function, line: 1 },
                ExtractedSymbol { name: "b".into(), kind: SymbolKind::Function, line: 5 },
            ],
            calls: vec![
                ExtractedCall { caller: Some("a".into()), callee: "b".into(), line: 2 },
                ExtractedCall { caller: Some("b".into()), callee: "a".into(), line: 6 },
            ],
        };
        store.update_file("a.rs", &extraction).await.unwrap();

        let hops = store.trace("a", TraceMode::Callees, 10).await;
        // Must terminate, and must not revisit the starting node.
        assert!(hops.len() <= 2);
    }
}
