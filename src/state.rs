//! Durable per-feed fetch timestamps.
//!
//! The store keeps the working map in memory behind a mutex so concurrent
//! feed tasks can [`record`](FetchStateStore::record) safely.  The on-disk
//! file is only ever replaced as a whole by [`commit`](FetchStateStore::commit):
//! the new map goes to `<path>.new` first and is then renamed over `<path>`.

use std::collections::BTreeMap;
use std::ffi::OsString;
use std::fs::{self, File};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};

use crate::error::StorageError;

/// Feed name → last successful fetch, in seconds since the Unix epoch (UTC).
pub type FetchState = BTreeMap<String, i64>;

pub struct FetchStateStore {
    path: PathBuf,
    state: Mutex<FetchState>,
}

impl FetchStateStore {
    /// Read the durable state at `path`.  A missing file is a first run and
    /// yields an empty map.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let state = match fs::read(&path) {
            Ok(bytes) => serde_json::from_slice(&bytes).map_err(|source| StorageError::Corrupt {
                path: path.clone(),
                source,
            })?,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                info!(path = %path.display(), "no fetch-state file yet, starting empty");
                FetchState::new()
            }
            Err(source) => return Err(StorageError::Io { path, source }),
        };
        Ok(Self {
            path,
            state: Mutex::new(state),
        })
    }

    /// Last recorded fetch for `feed`, `0` if never fetched.
    pub fn get(&self, feed: &str) -> i64 {
        self.lock().get(feed).copied().unwrap_or(0)
    }

    /// Consistent copy of the whole working map.
    pub fn snapshot(&self) -> FetchState {
        self.lock().clone()
    }

    /// Record a successful fetch in memory.  Nothing is durable until
    /// [`commit`](Self::commit).  Timestamps never move backwards.
    pub fn record(&self, feed: &str, ts: i64) {
        let mut state = self.lock();
        match state.get(feed) {
            Some(&prev) if prev > ts => {
                warn!(feed, prev, ts, "ignoring fetch time older than the recorded one");
            }
            _ => {
                state.insert(feed.to_string(), ts);
            }
        }
    }

    /// Replace the working map wholesale, discarding uncommitted records.
    pub fn restore(&self, state: FetchState) {
        *self.lock() = state;
    }

    /// Atomically replace the durable state with the current working map.
    pub fn commit(&self) -> Result<(), StorageError> {
        self.commit_with(|from, to| fs::rename(from, to))
    }

    /// [`commit`](Self::commit) with the final replace step supplied by the
    /// caller, so tests can fail it on purpose.
    fn commit_with<F>(&self, replace: F) -> Result<(), StorageError>
    where
        F: FnOnce(&Path, &Path) -> io::Result<()>,
    {
        let bytes = serde_json::to_vec(&self.snapshot())?;
        let tmp = self.tmp_path();

        write_synced(&tmp, &bytes).map_err(|source| StorageError::Io {
            path: tmp.clone(),
            source,
        })?;

        if let Err(source) = replace(&tmp, &self.path) {
            let _ = fs::remove_file(&tmp);
            return Err(StorageError::Io {
                path: self.path.clone(),
                source,
            });
        }

        sync_parent(&self.path);
        debug!(path = %self.path.display(), "fetch state committed");
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn tmp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(OsString::from)
            .unwrap_or_else(|| OsString::from("fetch_times"));
        name.push(".new");
        self.path.with_file_name(name)
    }

    // Every writer leaves the map whole, so a poisoned lock is still usable.
    fn lock(&self) -> MutexGuard<'_, FetchState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

fn write_synced(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(bytes)?;
    file.sync_all()
}

/// Persist the rename itself.  Best effort: not every platform lets a
/// directory be opened for syncing.
#[cfg(unix)]
fn sync_parent(path: &Path) {
    if let Some(dir) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        if let Ok(dir) = File::open(dir) {
            let _ = dir.sync_all();
        }
    }
}

#[cfg(not(unix))]
fn sync_parent(_path: &Path) {}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::thread;

    fn store_in(dir: &tempfile::TempDir) -> FetchStateStore {
        FetchStateStore::load(dir.path().join("fetch_times.json")).unwrap()
    }

    #[test]
    fn missing_file_is_empty_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert!(store.snapshot().is_empty());
        assert_eq!(store.get("anything"), 0);
    }

    #[test]
    fn corrupt_file_is_storage_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fetch_times.json");
        fs::write(&path, b"{not json").unwrap();

        let err = FetchStateStore::load(&path).err().unwrap();
        assert!(matches!(err, StorageError::Corrupt { .. }));
    }

    #[test]
    fn record_is_not_durable_until_commit() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.record("a", 100);

        assert_eq!(store.get("a"), 100);
        assert!(!store.path().exists());
    }

    #[test]
    fn record_never_moves_backwards() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.record("a", 200);
        store.record("a", 150);
        assert_eq!(store.get("a"), 200);

        store.record("a", 250);
        assert_eq!(store.get("a"), 250);
    }

    #[test]
    fn commit_then_reload_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.record("a", 1_700_000_000);
        store.record("b", 1_700_000_123);
        store.commit().unwrap();

        let reloaded = FetchStateStore::load(store.path()).unwrap();
        assert_eq!(reloaded.snapshot(), store.snapshot());
        assert!(!store.tmp_path().exists());
    }

    #[test]
    fn failed_replace_keeps_previous_durable_state() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.record("a", 10);
        store.commit().unwrap();
        let before = fs::read(store.path()).unwrap();

        store.record("a", 20);
        store.record("b", 30);
        let err = store
            .commit_with(|_, _| Err(io::Error::new(ErrorKind::Other, "crash before rename")))
            .unwrap_err();
        assert!(matches!(err, StorageError::Io { .. }));

        assert_eq!(fs::read(store.path()).unwrap(), before);
        assert!(!store.tmp_path().exists());

        let reloaded = FetchStateStore::load(store.path()).unwrap();
        assert_eq!(reloaded.get("a"), 10);
        assert_eq!(reloaded.get("b"), 0);
    }

    #[test]
    fn leftover_temp_file_is_never_read() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.record("a", 10);
        store.commit().unwrap();

        // A crash after writing the temp file but before the rename.
        fs::write(store.tmp_path(), br#"{"a": 99, "b": 1"#).unwrap();

        let reloaded = FetchStateStore::load(store.path()).unwrap();
        assert_eq!(reloaded.get("a"), 10);
        assert_eq!(reloaded.get("b"), 0);
    }

    #[test]
    fn restore_discards_uncommitted_records() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        store.record("a", 10);
        let checkpoint = store.snapshot();

        store.record("a", 20);
        store.record("b", 30);
        store.restore(checkpoint);

        assert_eq!(store.get("a"), 10);
        assert_eq!(store.get("b"), 0);
    }

    #[test]
    fn tmp_path_is_sibling_with_suffix() {
        let dir = tempfile::tempdir().unwrap();
        let store = store_in(&dir);
        assert_eq!(store.tmp_path(), dir.path().join("fetch_times.json.new"));
    }

    #[test]
    fn concurrent_records_are_all_kept() {
        let dir = tempfile::tempdir().unwrap();
        let store = Arc::new(store_in(&dir));

        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    for j in 0..100 {
                        store.record(&format!("feed-{i}"), j);
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }

        let snapshot = store.snapshot();
        assert_eq!(snapshot.len(), 8);
        assert!(snapshot.values().all(|&ts| ts == 99));
    }
}
