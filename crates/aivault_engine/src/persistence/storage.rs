//! Save slot backends.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};

use tracing::{debug, instrument};

use crate::error::PersistenceError;

/// A single save slot.
pub trait SaveStorage: Send + Sync + std::fmt::Debug {
    /// Reads the slot. `Ok(None)` when empty.
    fn read(&self) -> Result<Option<String>, PersistenceError>;

    /// Replaces the slot contents.
    fn write(&self, contents: &str) -> Result<(), PersistenceError>;

    /// Whether the slot holds anything.
    fn exists(&self) -> bool;

    /// Empties the slot. Removing an empty slot is not an error.
    fn remove(&self) -> Result<(), PersistenceError>;
}

/// Save slot backed by one file, replaced atomically on write.
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    /// Slot at `path`. Parent directories are created on first write.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Location of the save file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let file_name = self
            .path
            .file_name()
            .and_then(|name| name.to_str())
            .unwrap_or("save.json");
        let tmp_name = format!("{file_name}.tmp");
        match self.path.parent() {
            Some(parent) => parent.join(tmp_name),
            None => PathBuf::from(tmp_name),
        }
    }
}

impl SaveStorage for FileStorage {
    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn read(&self) -> Result<Option<String>, PersistenceError> {
        match fs::read_to_string(&self.path) {
            Ok(contents) => Ok(Some(contents)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    #[instrument(skip(self, contents), fields(path = %self.path.display(), bytes = contents.len()))]
    fn write(&self, contents: &str) -> Result<(), PersistenceError> {
        if let Some(parent) = self.path.parent()
            && !parent.as_os_str().is_empty()
        {
            fs::create_dir_all(parent)?;
        }
        let tmp_path = self.temp_path();
        fs::write(&tmp_path, contents)?;
        if let Err(e) = fs::rename(&tmp_path, &self.path) {
            let _ = fs::remove_file(&tmp_path);
            return Err(e.into());
        }
        debug!("Save file replaced");
        Ok(())
    }

    fn exists(&self) -> bool {
        self.path.is_file()
    }

    #[instrument(skip(self), fields(path = %self.path.display()))]
    fn remove(&self) -> Result<(), PersistenceError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

/// In-memory save slot. Counts writes, which makes coalescing observable.
#[derive(Debug, Default)]
pub struct MemoryStorage {
    slot: Mutex<Option<String>>,
    writes: AtomicUsize,
}

impl MemoryStorage {
    /// Empty slot.
    pub fn new() -> Self {
        Self::default()
    }

    /// Slot pre-filled with `contents`.
    pub fn with_contents(contents: impl Into<String>) -> Self {
        Self {
            slot: Mutex::new(Some(contents.into())),
            writes: AtomicUsize::new(0),
        }
    }

    /// Number of successful writes.
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Option<String>>, PersistenceError> {
        self.slot
            .lock()
            .map_err(|_| PersistenceError::new("Save slot lock poisoned"))
    }
}

impl SaveStorage for MemoryStorage {
    fn read(&self) -> Result<Option<String>, PersistenceError> {
        Ok(self.lock()?.clone())
    }

    fn write(&self, contents: &str) -> Result<(), PersistenceError> {
        *self.lock()? = Some(contents.to_string());
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn exists(&self) -> bool {
        self.lock().map(|slot| slot.is_some()).unwrap_or(false)
    }

    fn remove(&self) -> Result<(), PersistenceError> {
        *self.lock()? = None;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_storage_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let storage = FileStorage::new(dir.path().join("saves").join("slot.json"));
        assert_eq!(storage.read().unwrap(), None);
        assert!(!storage.exists());

        storage.write("{\"a\":1}").unwrap();
        storage.write("{\"a\":2}").unwrap();
        assert_eq!(storage.read().unwrap().as_deref(), Some("{\"a\":2}"));
        assert!(!dir.path().join("saves").join("slot.json.tmp").exists());

        storage.remove().unwrap();
        storage.remove().unwrap();
        assert!(!storage.exists());
    }

    #[test]
    fn test_memory_storage_counts_writes() {
        let storage = MemoryStorage::new();
        storage.write("x").unwrap();
        storage.write("y").unwrap();
        assert_eq!(storage.write_count(), 2);
        assert_eq!(storage.read().unwrap().as_deref(), Some("y"));
    }
}
