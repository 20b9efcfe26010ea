//! Durable storage for cache entries
//!
//! Layout under the persistence directory:
//! - `<sha256(key)>.json`: one file per entry holding `{key, entry, savedAt}`
//! - `_state.json`: full snapshot (entries, access order, sizes, counters)
//!   written once on `stop()` and consumed by the next `load()`
//!
//! Between a load and the next stop the per-entry files are the only record
//! of which keys exist, so a process that exits without `stop()` can never
//! resurrect a key deleted after the last snapshot.
//!
//! All writes happen on a dedicated writer thread fed by a bounded
//! crossbeam channel. Callers only ever `try_send`, so a slow disk can drop
//! writes (logged) but can never block or fail a cache operation.

use std::collections::{BTreeMap, BTreeSet};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, error, info, warn};

use crate::entry::CacheEntry;
use crate::error::{CacheError, Result};
use crate::stats::CounterSnapshot;

/// File name of the full-state snapshot
pub const STATE_FILE: &str = "_state.json";

const WRITER_POLL: Duration = Duration::from_millis(200);

/// Per-entry file contents
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct PersistedRecord {
    pub key: String,
    pub entry: CacheEntry,
    pub saved_at: i64,
}

/// `_state.json` contents
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct StateSnapshot {
    pub entries: BTreeMap<String, CacheEntry>,
    pub access_times: BTreeMap<String, u64>,
    pub sizes: BTreeMap<String, usize>,
    pub counters: CounterSnapshot,
    pub saved_at: i64,
}

/// What was found on disk at startup
#[derive(Debug, Default)]
pub(crate) struct LoadedState {
    pub entries: BTreeMap<String, CacheEntry>,
    pub access_times: BTreeMap<String, u64>,
    pub counters: Option<CounterSnapshot>,
    pub expired_dropped: usize,
}

enum PersistenceOp {
    Write(PersistedRecord),
    Remove(String),
    Shutdown(StateSnapshot),
}

/// File name for `key`
pub(crate) fn entry_file_name(key: &str) -> String {
    format!("{}.json", hex::encode(Sha256::digest(key.as_bytes())))
}

/// Background persistence for one cache instance
pub(crate) struct PersistenceLayer {
    dir: PathBuf,
    sender: Sender<PersistenceOp>,
    writer_handle: Mutex<Option<JoinHandle<()>>>,
    shutdown: Arc<AtomicBool>,
    dropped_writes: AtomicU64,
}

impl PersistenceLayer {
    /// Prepare `dir` and start the writer thread
    pub fn start(dir: PathBuf, queue_size: usize) -> Result<Self> {
        fs::create_dir_all(&dir)?;

        let (tx, rx) = bounded(queue_size);
        let shutdown = Arc::new(AtomicBool::new(false));

        let writer_dir = dir.clone();
        let writer_shutdown = shutdown.clone();
        let handle = std::thread::Builder::new()
            .name("cache-writer".to_string())
            .spawn(move || Self::writer_loop(writer_dir, rx, writer_shutdown))?;

        info!(dir = %dir.display(), queue_size, "Cache persistence started");

        Ok(Self {
            dir,
            sender: tx,
            writer_handle: Mutex::new(Some(handle)),
            shutdown,
            dropped_writes: AtomicU64::new(0),
        })
    }

    /// Queue a write of `entry`; never blocks
    pub fn enqueue_write(&self, key: &str, entry: &CacheEntry) {
        let record = PersistedRecord {
            key: key.to_string(),
            entry: entry.clone(),
            saved_at: chrono::Utc::now().timestamp_millis(),
        };
        self.offer(PersistenceOp::Write(record), key);
    }

    /// Queue removal of the file for `key`; never blocks
    pub fn enqueue_remove(&self, key: &str) {
        self.offer(PersistenceOp::Remove(key.to_string()), key);
    }

    /// Writes dropped because the queue was full or the writer had stopped
    pub fn dropped_writes(&self) -> u64 {
        self.dropped_writes.load(Ordering::Relaxed)
    }

    fn offer(&self, op: PersistenceOp, key: &str) {
        match self.sender.try_send(op) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => {
                self.dropped_writes.fetch_add(1, Ordering::Relaxed);
                warn!(key, "Cache persistence queue full, dropping update");
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped_writes.fetch_add(1, Ordering::Relaxed);
                warn!(key, "Cache persistence writer stopped, dropping update");
            }
        }
    }

    /// Read every persisted entry plus the snapshot, if any.
    ///
    /// Expired entries are dropped and their files deleted. Entries only the
    /// snapshot knows about get their file written here, then the snapshot is
    /// removed.
    pub fn load(&self, now_ms: i64) -> LoadedState {
        let mut loaded = LoadedState::default();

        let state_path = self.dir.join(STATE_FILE);
        if state_path.exists() {
            match fs::read(&state_path)
                .map_err(CacheError::from)
                .and_then(|bytes| serde_json::from_slice::<StateSnapshot>(&bytes).map_err(CacheError::from))
            {
                Ok(snapshot) => {
                    loaded.counters = Some(snapshot.counters);
                    loaded.access_times = snapshot.access_times;
                    loaded.entries = snapshot.entries;
                }
                Err(e) => warn!(path = %state_path.display(), error = %e, "Ignoring unreadable cache snapshot"),
            }
        }

        let dir_entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) => {
                error!(dir = %self.dir.display(), error = %e, "Failed to list cache directory");
                return loaded;
            }
        };

        let mut on_disk = BTreeSet::new();
        for dir_entry in dir_entries.flatten() {
            let path = dir_entry.path();
            let is_entry_file = path.extension().is_some_and(|ext| ext == "json")
                && path.file_name().is_some_and(|name| name != STATE_FILE);
            if !is_entry_file {
                continue;
            }

            let record = match fs::read(&path)
                .map_err(CacheError::from)
                .and_then(|bytes| serde_json::from_slice::<PersistedRecord>(&bytes).map_err(CacheError::from))
            {
                Ok(record) => record,
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Skipping unreadable cache entry file");
                    continue;
                }
            };

            on_disk.insert(record.key.clone());
            let newer = loaded
                .entries
                .get(&record.key)
                .map_or(true, |existing| record.entry.created_at >= existing.created_at);
            if newer {
                loaded.entries.insert(record.key, record.entry);
            }
        }

        let expired: Vec<String> = loaded
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired(now_ms))
            .map(|(key, _)| key.clone())
            .collect();
        for key in expired {
            loaded.entries.remove(&key);
            loaded.access_times.remove(&key);
            remove_file_quietly(&self.dir.join(entry_file_name(&key)));
            loaded.expired_dropped += 1;
        }

        // Snapshot-only entries are writes the queue dropped before the last stop
        let saved_at = chrono::Utc::now().timestamp_millis();
        for (key, entry) in loaded.entries.iter().filter(|(key, _)| !on_disk.contains(*key)) {
            let record = PersistedRecord {
                key: key.clone(),
                entry: entry.clone(),
                saved_at,
            };
            match serde_json::to_vec(&record) {
                Ok(bytes) => write_atomically(&self.dir.join(entry_file_name(key)), &bytes),
                Err(e) => error!(key = %key, error = %e, "Failed to encode cache entry"),
            }
        }
        loaded.access_times.retain(|key, _| loaded.entries.contains_key(key));
        if state_path.exists() {
            remove_file_quietly(&state_path);
        }

        info!(
            dir = %self.dir.display(),
            entries = loaded.entries.len(),
            expired_dropped = loaded.expired_dropped,
            "Loaded persisted cache state"
        );
        loaded
    }

    /// Flush queued writes, write the snapshot and join the writer thread
    pub async fn stop(&self, snapshot: StateSnapshot) -> Result<()> {
        let Some(handle) = self.writer_handle.lock().take() else {
            return Ok(());
        };

        let sender = self.sender.clone();
        let shutdown = self.shutdown.clone();
        let dir = self.dir.clone();

        tokio::task::spawn_blocking(move || {
            // Blocking send: the snapshot must not be dropped on a full queue
            if let Err(e) = sender.send(PersistenceOp::Shutdown(snapshot)) {
                if let PersistenceOp::Shutdown(snapshot) = e.into_inner() {
                    warn!("Cache writer already gone, writing snapshot inline");
                    write_state(&dir, &snapshot);
                }
            }
            shutdown.store(true, Ordering::SeqCst);
            handle
                .join()
                .map_err(|_| CacheError::Shutdown("cache writer thread panicked".to_string()))
        })
        .await
        .map_err(|e| CacheError::Shutdown(e.to_string()))??;

        info!(dir = %self.dir.display(), "Cache persistence stopped");
        Ok(())
    }

    fn writer_loop(dir: PathBuf, receiver: Receiver<PersistenceOp>, shutdown: Arc<AtomicBool>) {
        debug!(dir = %dir.display(), "Cache writer thread running");
        loop {
            match receiver.recv_timeout(WRITER_POLL) {
                Ok(PersistenceOp::Write(record)) => {
                    let path = dir.join(entry_file_name(&record.key));
                    match serde_json::to_vec(&record) {
                        Ok(bytes) => write_atomically(&path, &bytes),
                        Err(e) => error!(key = %record.key, error = %e, "Failed to encode cache entry"),
                    }
                }
                Ok(PersistenceOp::Remove(key)) => {
                    remove_file_quietly(&dir.join(entry_file_name(&key)));
                }
                Ok(PersistenceOp::Shutdown(snapshot)) => {
                    write_state(&dir, &snapshot);
                    break;
                }
                Err(RecvTimeoutError::Timeout) => {
                    if shutdown.load(Ordering::SeqCst) {
                        break;
                    }
                }
                Err(RecvTimeoutError::Disconnected) => break,
            }
        }
        debug!(dir = %dir.display(), "Cache writer thread exiting");
    }
}

impl Drop for PersistenceLayer {
    fn drop(&mut self) {
        // Writer drains what is queued, then exits on its next idle poll
        self.shutdown.store(true, Ordering::SeqCst);
    }
}

fn write_state(dir: &Path, snapshot: &StateSnapshot) {
    match serde_json::to_vec(snapshot) {
        Ok(bytes) => {
            write_atomically(&dir.join(STATE_FILE), &bytes);
            info!(entries = snapshot.entries.len(), "Wrote cache state snapshot");
        }
        Err(e) => error!(error = %e, "Failed to encode cache state snapshot"),
    }
}

fn write_atomically(path: &Path, bytes: &[u8]) {
    let temp = path.with_extension("tmp");
    let result = OpenOptions::new()
        .create(true)
        .write(true)
        .truncate(true)
        .open(&temp)
        .and_then(|mut file| {
            file.write_all(bytes)?;
            file.sync_all()
        })
        .and_then(|()| fs::rename(&temp, path));

    if let Err(e) = result {
        error!(path = %path.display(), error = %e, "Failed to persist cache file");
        let _ = fs::remove_file(&temp);
    }
}

fn remove_file_quietly(path: &Path) {
    if let Err(e) = fs::remove_file(path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!(path = %path.display(), error = %e, "Failed to remove cache file");
        }
    }
}
