//! JSON-file store.
//!
//! The whole map lives in one JSON object. Every write takes an exclusive lock
//! on a sidecar `.lock` file for the full read-modify-write cycle, then writes
//! a uniquely named temp file in the same directory and renames it over the
//! original. Concurrent writers (a second CLI invocation, a sync daemon) queue
//! on the lock instead of clobbering each other, and a crash leaves either the
//! old or the new map on disk. Reads take no lock: the rename is atomic, and
//! every read goes to disk so other processes' writes are seen immediately.

use std::collections::BTreeMap;
use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::sync::{Mutex, PoisonError};

use fs2::FileExt;
use tempfile::NamedTempFile;
use tracing::debug;

use super::{KeyValueStore, StorageKey, StoreError};

type Entries = BTreeMap<String, String>;

/// Store persisted as a JSON object at `path`.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    /// Serializes writers within this process before they queue on the file lock.
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open (lazily) a store at `path`. The file and its parent directory are
    /// created on first write.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn dir(&self) -> &Path {
        match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        }
    }

    fn load(&self) -> Result<Entries, StoreError> {
        match fs::read(&self.path) {
            Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(Entries::new()),
            Ok(bytes) => Ok(serde_json::from_slice(&bytes)?),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(Entries::new()),
            Err(e) => Err(e.into()),
        }
    }

    /// Exclusive cross-process lock; released when the returned file drops.
    fn lock(&self) -> Result<File, StoreError> {
        let lock = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.path.with_extension("lock"))?;
        lock.lock_exclusive()?;
        Ok(lock)
    }

    fn persist(&self, entries: &Entries) -> Result<(), StoreError> {
        let bytes = serde_json::to_vec_pretty(entries)?;
        // NamedTempFile is created owner-only on unix; the rename keeps the mode.
        let mut tmp = NamedTempFile::new_in(self.dir())?;
        tmp.write_all(&bytes)?;
        tmp.as_file().sync_all()?;
        tmp.persist(&self.path).map_err(|e| e.error)?;
        debug!(path = %self.path.display(), keys = entries.len(), "store persisted");
        Ok(())
    }

    fn update(&self, apply: impl FnOnce(&mut Entries)) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(PoisonError::into_inner);
        fs::create_dir_all(self.dir())?;
        let _lock = self.lock()?;

        let mut entries = self.load()?;
        apply(&mut entries);
        self.persist(&entries)
    }
}

impl KeyValueStore for FileStore {
    fn get(&self, key: StorageKey) -> Result<Option<String>, StoreError> {
        Ok(self.load()?.remove(key.as_str()))
    }

    fn write_batch(
        &self,
        set: &[(StorageKey, &str)],
        remove: &[StorageKey],
    ) -> Result<(), StoreError> {
        self.update(|map| {
            for key in remove {
                map.remove(key.as_str());
            }
            for (key, value) in set {
                map.insert(key.as_str().to_string(), (*value).to_string());
            }
        })
    }
}
