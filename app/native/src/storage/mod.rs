//! Durable key/value storage for access tokens.
//!
//! Values are opaque byte blobs. The file-backed store keeps them in a small
//! JSON object, base64-encoded, and rewrites the whole file on every change.
//! The in-memory copy only changes once the new file is on disk, so a failed
//! write leaves both views as they were.

mod watcher;

use std::collections::BTreeMap;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use parking_lot::Mutex;
use thiserror::Error;
pub use watcher::{PREFERENCES_DEBOUNCE_MS, PreferencesWatcher};

/// Errors raised by durable storage.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Failed to read preferences {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to write preferences {path}: {source}")]
    Write {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Malformed preferences file {path}: {reason}")]
    Malformed { path: PathBuf, reason: String },
}

/// Durable key/value storage.
///
/// Writes are independent per key; nothing spans multiple keys.
pub trait KeyValueStore: Send + Sync {
    /// Returns the value stored under `key`, if any.
    fn get(&self, key: &str) -> Option<Vec<u8>>;

    /// Stores `value` under `key`.
    ///
    /// # Errors
    ///
    /// Returns an error if the value could not be persisted.
    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError>;

    /// Removes `key`. Removing a missing key is not an error.
    ///
    /// # Errors
    ///
    /// Returns an error if the removal could not be persisted.
    fn remove(&self, key: &str) -> Result<(), StorageError>;

    /// Re-reads values another process may have written.
    ///
    /// # Errors
    ///
    /// Returns an error if the backing file cannot be read. The previously
    /// loaded values stay in place.
    fn reload(&self) -> Result<(), StorageError> { Ok(()) }
}

/// Store persisted as a JSON file of base64 values.
#[derive(Debug)]
pub struct JsonFileStore {
    path: PathBuf,
    entries: Mutex<BTreeMap<String, String>>,
}

impl JsonFileStore {
    /// Opens the store at `path`. A missing file is an empty store.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read or parsed.
    pub fn open(path: impl Into<PathBuf>) -> Result<Self, StorageError> {
        let path = path.into();
        let entries = read_entries(&path)?;
        Ok(Self { path, entries: Mutex::new(entries) })
    }

    /// Location of the backing file.
    #[must_use]
    pub fn path(&self) -> &Path { &self.path }

    fn persist(&self, entries: &BTreeMap<String, String>) -> Result<(), StorageError> {
        let write_err = |source: std::io::Error| StorageError::Write { path: self.path.clone(), source };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).map_err(write_err)?;
        }

        let json = serde_json::to_vec_pretty(entries).map_err(|err| StorageError::Malformed {
            path: self.path.clone(),
            reason: err.to_string(),
        })?;

        // Write to a sibling and rename so a crash never leaves half a file.
        let tmp = self.path.with_extension("json.tmp");
        let mut file = fs::File::create(&tmp).map_err(write_err)?;
        file.write_all(&json).map_err(write_err)?;
        file.sync_all().map_err(write_err)?;
        fs::rename(&tmp, &self.path).map_err(write_err)
    }
}

impl KeyValueStore for JsonFileStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> {
        let entries = self.entries.lock();
        let encoded = entries.get(key)?;
        match STANDARD.decode(encoded) {
            Ok(bytes) => Some(bytes),
            Err(err) => {
                tracing::warn!(key, error = %err, "ignoring undecodable preference value");
                None
            }
        }
    }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        let mut next = entries.clone();
        next.insert(key.to_string(), STANDARD.encode(value));
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock();
        if !entries.contains_key(key) {
            return Ok(());
        }
        let mut next = entries.clone();
        next.remove(key);
        self.persist(&next)?;
        *entries = next;
        Ok(())
    }

    fn reload(&self) -> Result<(), StorageError> {
        let fresh = read_entries(&self.path)?;
        *self.entries.lock() = fresh;
        Ok(())
    }
}

fn read_entries(path: &Path) -> Result<BTreeMap<String, String>, StorageError> {
    match fs::read(path) {
        Ok(bytes) if bytes.iter().all(u8::is_ascii_whitespace) => Ok(BTreeMap::new()),
        Ok(bytes) => serde_json::from_slice(&bytes).map_err(|err| StorageError::Malformed {
            path: path.to_path_buf(),
            reason: err.to_string(),
        }),
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
        Err(source) => Err(StorageError::Read { path: path.to_path_buf(), source }),
    }
}

/// Non-durable store, for tests and dry runs.
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    #[must_use]
    pub fn new() -> Self { Self::default() }

    /// Number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize { self.entries.lock().len() }

    #[must_use]
    pub fn is_empty(&self) -> bool { self.entries.lock().is_empty() }
}

impl KeyValueStore for MemoryStore {
    fn get(&self, key: &str) -> Option<Vec<u8>> { self.entries.lock().get(key).cloned() }

    fn set(&self, key: &str, value: &[u8]) -> Result<(), StorageError> {
        self.entries.lock().insert(key.to_string(), value.to_vec());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        self.entries.lock().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use tempfile::TempDir;

    use super::*;

    #[test]
    fn missing_file_is_empty_store() {
        let dir = TempDir::new().unwrap();
        let store = JsonFileStore::open(dir.path().join("prefs.json")).unwrap();
        assert!(store.get("lightModeBookmark").is_none());
    }

    #[test]
    fn values_survive_reopen() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("prefs.json");

        let store = JsonFileStore::open(&path).unwrap();
        store.set("darkModeBookmark", &[0, 159, 146, 150]).unwrap();
        drop(store);

        let reopened = JsonFileStore::open(&path).unwrap();
        assert_eq!(reopened.get("darkModeBookmark"), Some(vec![0, 159, 146, 150]));
    }

    #[test]
    fn remove_is_persisted() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");

        let store = JsonFileStore::open(&path).unwrap();
        store.set("lightModeBookmark", b"token").unwrap();
        store.remove("lightModeBookmark").unwrap();
        store.remove("lightModeBookmark").unwrap();

        let reopened = JsonFileStore::open(&path).unwrap();
        assert!(reopened.get("lightModeBookmark").is_none());
    }

    #[test]
    fn malformed_file_is_reported() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "{ not json").unwrap();

        let err = JsonFileStore::open(&path).unwrap_err();
        assert!(matches!(err, StorageError::Malformed { .. }));
    }

    #[test]
    fn empty_file_is_empty_store() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, "\n").unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert!(store.get("darkModeBookmark").is_none());
    }

    #[test]
    fn undecodable_value_reads_as_missing() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");
        fs::write(&path, r#"{"lightModeBookmark": "***"}"#).unwrap();

        let store = JsonFileStore::open(&path).unwrap();
        assert!(store.get("lightModeBookmark").is_none());
    }

    /// A store holding `lightModeBookmark` whose parent directory has since
    /// been replaced by a plain file, so every write fails.
    fn store_with_broken_parent(dir: &TempDir) -> JsonFileStore {
        let parent = dir.path().join("state");
        let store = JsonFileStore::open(parent.join("prefs.json")).unwrap();
        store.set("lightModeBookmark", b"kept").unwrap();

        fs::remove_dir_all(&parent).unwrap();
        fs::write(&parent, "not a directory").unwrap();
        store
    }

    #[test]
    fn failed_set_leaves_value_unchanged() {
        let dir = TempDir::new().unwrap();
        let store = store_with_broken_parent(&dir);

        assert!(matches!(store.set("darkModeBookmark", b"token"), Err(StorageError::Write { .. })));
        assert!(store.get("darkModeBookmark").is_none());
        assert_eq!(store.get("lightModeBookmark"), Some(b"kept".to_vec()));
    }

    #[test]
    fn failed_remove_keeps_value_readable() {
        let dir = TempDir::new().unwrap();
        let store = store_with_broken_parent(&dir);

        assert!(store.remove("lightModeBookmark").is_err());
        assert_eq!(store.get("lightModeBookmark"), Some(b"kept".to_vec()));
    }

    #[test]
    fn reload_sees_writes_from_another_handle() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");

        let agent = JsonFileStore::open(&path).unwrap();
        let cli = JsonFileStore::open(&path).unwrap();
        cli.set("darkModeBookmark", b"night").unwrap();

        assert!(agent.get("darkModeBookmark").is_none());
        agent.reload().unwrap();
        assert_eq!(agent.get("darkModeBookmark"), Some(b"night".to_vec()));
    }

    #[test]
    fn failed_reload_keeps_loaded_values() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("prefs.json");

        let store = JsonFileStore::open(&path).unwrap();
        store.set("lightModeBookmark", b"day").unwrap();
        fs::write(&path, "{ not json").unwrap();

        assert!(matches!(store.reload(), Err(StorageError::Malformed { .. })));
        assert_eq!(store.get("lightModeBookmark"), Some(b"day".to_vec()));
    }

    #[test]
    fn memory_store_round_trips() {
        let store = MemoryStore::new();
        store.set("k", b"v").unwrap();
        assert_eq!(store.get("k"), Some(b"v".to_vec()));
        store.remove("k").unwrap();
        assert!(store.is_empty());
    }
}
