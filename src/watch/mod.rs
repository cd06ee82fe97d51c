//! Debounced filesystem watcher for incremental re-indexing.
//!
//! Wraps `notify-debouncer-full` the way the upstream watcher did, but adds
//! an explicit event-merge table on top of the debouncer's own coalescing:
//! create+modify collapse to modify, modify+delete collapse to delete, and
//! intermediate modifies for a path are dropped in favor of the terminal
//! event — a delete or rename is never dropped in favor of an earlier
//! modify.

use notify::{RecommendedWatcher, RecursiveMode, Watcher};
use notify_debouncer_full::{new_debouncer, DebounceEventResult, Debouncer, FileIdMap};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, Receiver};
use std::time::Duration;

use crate::error::{AgentdxError, Result};
use crate::ignore_matcher::IgnoreMatcher;
use crate::scanner::Language;

/// Normalize a path from notify events to a consistent format: strip the
/// Windows UNC prefix (`\\?\`) and convert backslashes to forward slashes.
fn normalize_event_path(path: &Path) -> PathBuf {
    let s = path.to_string_lossy();
    let s = s.strip_prefix(r"\\?\").unwrap_or(&s);
    PathBuf::from(s.replace('\\', "/"))
}

/// The kind of change a watched path underwent, after merging.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FileEvent {
    Created(PathBuf),
    Modified(PathBuf),
    Deleted(PathBuf),
}

impl FileEvent {
    fn path(&self) -> &Path {
        match self {
            FileEvent::Created(p) | FileEvent::Modified(p) | FileEvent::Deleted(p) => p,
        }
    }

    /// Merge two raw observations of the same path within a debounce
    /// window: a terminal delete always wins, otherwise the later event
    /// wins (which collapses create+modify into a single modify).
    fn merge(self, other: FileEvent) -> FileEvent {
        match (&self, &other) {
            (_, FileEvent::Deleted(_)) => other,
            (FileEvent::Deleted(_), _) => self,
            _ => other,
        }
    }
}

pub struct FileWatcher {
    root: PathBuf,
    ignore: IgnoreMatcher,
    debouncer: Option<Debouncer<RecommendedWatcher, FileIdMap>>,
    receiver: Option<Receiver<DebounceEventResult>>,
}

impl FileWatcher {
    pub fn new(root: PathBuf, ignore: IgnoreMatcher) -> Self {
        Self {
            root,
            ignore,
            debouncer: None,
            receiver: None,
        }
    }

    pub fn start(&mut self, debounce_ms: u64) -> Result<()> {
        let (tx, rx) = channel();

        let debouncer = new_debouncer(Duration::from_millis(debounce_ms), None, tx)
            .map_err(|e| AgentdxError::daemon(format!("starting file watcher: {e}")))?;

        self.receiver = Some(rx);
        self.debouncer = Some(debouncer);

        if let Some(ref mut debouncer) = self.debouncer {
            debouncer
                .watcher()
                .watch(&self.root, RecursiveMode::Recursive)
                .map_err(|e| AgentdxError::daemon(format!("watching {}: {e}", self.root.display())))?;
            debouncer
                .cache()
                .add_root(&self.root, RecursiveMode::Recursive);
        }

        Ok(())
    }

    pub fn is_started(&self) -> bool {
        self.debouncer.is_some()
    }

    pub fn stop(&mut self) {
        if let Some(ref mut debouncer) = self.debouncer {
            let _ = debouncer.watcher().unwatch(&self.root);
        }
        self.debouncer = None;
        self.receiver = None;
    }

    fn is_watchable(&self, path: &Path) -> bool {
        if self.ignore.is_ignored(path, path.is_dir()) {
            return false;
        }
        Language::from_path(path).is_indexable()
    }

    /// Block up to `timeout` for the first batch of events, then drain
    /// anything else immediately available, merging repeated observations
    /// of the same path per the create/modify/delete rules above.
    pub fn wait_for_events(&self, timeout: Duration) -> Vec<FileEvent> {
        let Some(ref receiver) = self.receiver else {
            return vec![];
        };

        let mut merged: HashMap<PathBuf, FileEvent> = HashMap::new();

        match receiver.recv_timeout(timeout) {
            Ok(result) => self.fold_result(result, &mut merged),
            Err(_) => return vec![],
        }

        while let Ok(result) = receiver.try_recv() {
            self.fold_result(result, &mut merged);
        }

        merged.into_values().collect()
    }

    /// Non-blocking drain, same merge semantics as `wait_for_events`.
    pub fn poll_events(&self) -> Vec<FileEvent> {
        let Some(ref receiver) = self.receiver else {
            return vec![];
        };

        let mut merged: HashMap<PathBuf, FileEvent> = HashMap::new();
        while let Ok(result) = receiver.try_recv() {
            self.fold_result(result, &mut merged);
        }
        merged.into_values().collect()
    }

    fn fold_result(&self, result: DebounceEventResult, merged: &mut HashMap<PathBuf, FileEvent>) {
        use notify::event::{ModifyKind, RenameMode};
        use notify::EventKind;

        match result {
            Ok(events) => {
                for event in events {
                    // A `RenameMode::Both` event carries the old and new
                    // paths together in `event.paths` as `[from, to]`; every
                    // other kind is handled per-path below.
                    if let EventKind::Modify(ModifyKind::Name(RenameMode::Both)) = event.kind {
                        if let [from, to] = event.paths.as_slice() {
                            let from_path = normalize_event_path(from);
                            self.insert(merged, from_path.clone(), FileEvent::Deleted(from_path));
                            let to_path = normalize_event_path(to);
                            if self.is_watchable(&to_path) {
                                self.insert(merged, to_path.clone(), FileEvent::Created(to_path));
                            }
                            continue;
                        }
                    }

                    for raw_path in &event.paths {
                        let path = normalize_event_path(raw_path);

                        let candidate = match event.kind {
                            EventKind::Modify(ModifyKind::Name(RenameMode::From)) => {
                                Some(FileEvent::Deleted(path.clone()))
                            }
                            EventKind::Modify(ModifyKind::Name(RenameMode::To)) => {
                                self.is_watchable(&path).then(|| FileEvent::Created(path.clone()))
                            }
                            EventKind::Create(_) => {
                                (self.is_watchable(&path) && raw_path.exists())
                                    .then(|| FileEvent::Created(path.clone()))
                            }
                            EventKind::Modify(_) => {
                                (self.is_watchable(&path) && raw_path.exists())
                                    .then(|| FileEvent::Modified(path.clone()))
                            }
                            EventKind::Remove(_) => Some(FileEvent::Deleted(path.clone())),
                            _ => None,
                        };

                        if let Some(candidate) = candidate {
                            self.insert(merged, path, candidate);
                        }
                    }
                }
            }
            Err(errors) => {
                for error in errors {
                    tracing::warn!("File watch error: {:?}", error);
                }
            }
        }
    }

    /// Insert a candidate event for `path` into `merged`, respecting the
    /// shared ignore check and the delete-wins merge rule. A rename's "from"
    /// path is always treated as a deletion here, even though it may no
    /// longer exist to be ignore-matched against; the ignore check below
    /// only gates genuinely new/modified content.
    fn insert(&self, merged: &mut HashMap<PathBuf, FileEvent>, path: PathBuf, candidate: FileEvent) {
        if !matches!(candidate, FileEvent::Deleted(_)) && self.ignore.is_ignored(&path, false) {
            return;
        }
        merged
            .entry(path)
            .and_modify(|existing| {
                *existing = existing.clone().merge(candidate.clone());
            })
            .or_insert(candidate);
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_delete_always_wins() {
        let modified = FileEvent::Modified(PathBuf::from("a.rs"));
        let deleted = FileEvent::Deleted(PathBuf::from("a.rs"));
        assert_eq!(modified.clone().merge(deleted.clone()), deleted);
        assert_eq!(deleted.merge(modified), FileEvent::Deleted(PathBuf::from("a.rs")));
    }

    #[test]
    fn test_merge_modify_then_modify_stays_modify() {
        let a = FileEvent::Modified(PathBuf::from("a.rs"));
        let b = FileEvent::Modified(PathBuf::from("a.rs"));
        assert_eq!(a.merge(b), FileEvent::Modified(PathBuf::from("a.rs")));
    }

    #[test]
    fn test_merge_created_then_deleted_is_deleted() {
        let created = FileEvent::Created(PathBuf::from("a.rs"));
        let deleted = FileEvent::Deleted(PathBuf::from("a.rs"));
        assert_eq!(created.merge(deleted.clone()), deleted);
    }

    #[test]
    fn test_merge_deleted_then_created_stays_deleted() {
        let deleted = FileEvent::Deleted(PathBuf::from("a.rs"));
        let created = FileEvent::Created(PathBuf::from("a.rs"));
        assert_eq!(deleted.clone().merge(created), deleted);
    }

    #[test]
    fn test_is_watchable_respects_ignore_and_extension() {
        let dir = tempfile::tempdir().unwrap();
        let ignore = IgnoreMatcher::new(dir.path(), &[]).unwrap();
        let watcher = FileWatcher::new(dir.path().to_path_buf(), ignore);

        assert!(!watcher.is_watchable(&dir.path().join("node_modules/foo.js")));
        assert!(!watcher.is_watchable(&dir.path().join("image.png")));
        assert!(watcher.is_watchable(&dir.path().join("src/main.rs")));
    }

    #[test]
    #[ignore = "requires actual filesystem events"]
    fn test_file_watcher_observes_creation() {
        let dir = tempfile::tempdir().unwrap();
        let ignore = IgnoreMatcher::new(dir.path(), &[]).unwrap();
        let mut watcher = FileWatcher::new(dir.path().to_path_buf(), ignore);
        watcher.start(100).unwrap();

        std::fs::write(dir.path().join("test.rs"), "fn main() {}").unwrap();

        let events = watcher.wait_for_events(Duration::from_millis(500));
        assert!(!events.is_empty());
    }
}
