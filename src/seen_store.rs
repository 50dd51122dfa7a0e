//! Persistent, bounded set of links that have already been delivered.
//!
//! All access goes through a [`SeenTransaction`]: the store lock is taken,
//! state is loaded, mutated in memory, written back atomically, and the lock
//! is released when the transaction drops. The lock only serialises callers
//! inside one process; separate processes sharing a state file need their own
//! coordination.

use std::collections::HashSet;
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use tempfile::NamedTempFile;

use crate::models::{RawRecord, SeenState};
use crate::Result;

pub const DEFAULT_BOUND: usize = 50;

/// Clones share the same lock, so a clone handed to a blocking task still
/// serialises with the original.
#[derive(Clone)]
pub struct SeenStore {
    path: PathBuf,
    lock: Arc<Mutex<()>>,
}

impl SeenStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            lock: Arc::new(Mutex::new(())),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Lock the store and load the current state.
    pub fn begin(&self) -> SeenTransaction<'_> {
        // A panic mid-transaction never leaves a half-written file behind, so
        // a poisoned lock is safe to reuse.
        let guard = self.lock.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        let state = read_state(&self.path);
        SeenTransaction::new(self, state, guard)
    }

    /// Snapshot of the persisted identifiers.
    pub fn load(&self) -> SeenState {
        self.begin().state.clone()
    }

    /// Replace the persisted state with an empty identifier list.
    pub fn reset(&self) -> Result<()> {
        let mut tx = self.begin();
        tx.clear();
        tx.commit(0)?;
        tracing::info!(path = %self.path.display(), "Seen state reset");
        Ok(())
    }

    /// Keep records whose link is non-empty and not yet seen, in input order,
    /// and fold their links into the persisted state (newest first, at most
    /// `bound` entries) before returning.
    pub fn filter_new(&self, records: Vec<RawRecord>, bound: usize) -> Result<Vec<RawRecord>> {
        let total = records.len();
        let mut tx = self.begin();
        let fresh: Vec<RawRecord> = records
            .into_iter()
            .filter(|record| tx.admit(&record.link))
            .collect();
        let persisted = tx.commit(bound)?;

        tracing::info!(
            total,
            fresh = fresh.len(),
            persisted = persisted.len(),
            "Seen-set filter applied"
        );
        Ok(fresh)
    }
}

/// Scoped read-modify-write over the seen state. Dropping without
/// [`commit`](SeenTransaction::commit) discards the changes.
pub struct SeenTransaction<'a> {
    store: &'a SeenStore,
    state: SeenState,
    known: HashSet<String>,
    admitted: Vec<String>,
    _guard: MutexGuard<'a, ()>,
}

impl<'a> SeenTransaction<'a> {
    fn new(store: &'a SeenStore, state: SeenState, guard: MutexGuard<'a, ()>) -> Self {
        let known = state.urls.iter().cloned().collect();
        Self {
            store,
            state,
            known,
            admitted: Vec::new(),
            _guard: guard,
        }
    }

    pub fn contains(&self, link: &str) -> bool {
        self.known.contains(link)
    }

    /// Mark `link` as seen. Returns false for empty or already known links,
    /// including links admitted earlier in this transaction.
    pub fn admit(&mut self, link: &str) -> bool {
        if link.is_empty() || !self.known.insert(link.to_string()) {
            return false;
        }
        self.admitted.push(link.to_string());
        true
    }

    pub fn clear(&mut self) {
        self.state.urls.clear();
        self.known.clear();
        self.admitted.clear();
    }

    /// Persist `admitted ++ previous`, truncated to `bound`, and release the lock.
    pub fn commit(mut self, bound: usize) -> Result<SeenState> {
        let mut urls = std::mem::take(&mut self.admitted);
        urls.append(&mut self.state.urls);
        urls.truncate(bound);

        let state = SeenState { urls };
        write_state(&self.store.path, &state)?;
        Ok(state)
    }
}

/// Missing, unreadable or malformed state reads as empty.
fn read_state(path: &Path) -> SeenState {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::debug!(path = %path.display(), "No seen state yet");
            return SeenState::default();
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Unreadable seen state, starting empty");
            return SeenState::default();
        }
    };

    match serde_json::from_str::<SeenState>(&content) {
        Ok(mut state) => {
            state.dedup();
            state
        }
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Malformed seen state, starting empty");
            SeenState::default()
        }
    }
}

/// Write via a temp file in the same directory, then rename over the target.
fn write_state(path: &Path, state: &SeenState) -> Result<()> {
    let dir = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&dir)?;

    let mut tmp = NamedTempFile::new_in(&dir)?;
    tmp.write_all(serde_json::to_string_pretty(state)?.as_bytes())?;
    tmp.flush()?;
    tmp.as_file_mut().sync_all()?;
    tmp.persist(path).map_err(|e| e.error)?;
    Ok(())
}
