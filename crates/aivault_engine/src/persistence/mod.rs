//! Save and load of the game state.
//!
//! Saves are redacted copies of the state tree. Loads merge the saved tree
//! onto the current defaults, so fields added after a save was written come
//! back with their default values.

mod storage;

pub use storage::{FileStorage, MemoryStorage, SaveStorage};

use serde_json::Value;
use tracing::{debug, info, instrument, warn};

use crate::error::PersistenceError;
use crate::store::{PathStore, deep_merge};

/// Paths written as `null` in every save.
pub const REDACTED_PATHS: &[&[&str]] = &[&["settings", "apiKey"]];

/// Reads and writes the save slot.
#[derive(Debug)]
pub struct PersistenceGateway {
    storage: Box<dyn SaveStorage>,
    defaults: Value,
}

impl PersistenceGateway {
    /// Gateway over `storage`, merging loads onto `defaults`.
    pub fn new(storage: Box<dyn SaveStorage>, defaults: Value) -> Self {
        Self { storage, defaults }
    }

    /// The default state loads are merged onto.
    pub fn defaults(&self) -> &Value {
        &self.defaults
    }

    /// Writes a redacted copy of `state`.
    #[instrument(skip(self, state))]
    pub fn save(&self, state: &Value) -> Result<(), PersistenceError> {
        let snapshot = redact(state.clone());
        let json = serde_json::to_string(&snapshot)?;
        self.storage.write(&json)?;
        debug!(bytes = json.len(), "Game saved");
        Ok(())
    }

    /// Saves, logging instead of returning failures.
    pub fn save_or_warn(&self, state: &Value) -> bool {
        match self.save(state) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to save game state");
                false
            }
        }
    }

    /// Replaces the store's state with the save merged onto the defaults.
    ///
    /// Returns `false` and leaves the store untouched when there is no save
    /// or it cannot be read.
    #[instrument(skip(self, store))]
    pub fn load(&self, store: &mut PathStore) -> bool {
        let raw = match self.storage.read() {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No save to load");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "Failed to read save");
                return false;
            }
        };
        let saved: Value = match serde_json::from_str(&raw) {
            Ok(saved @ Value::Object(_)) => saved,
            Ok(_) => {
                warn!("Save is not a JSON object; ignoring");
                return false;
            }
            Err(e) => {
                warn!(error = %e, "Failed to parse save");
                return false;
            }
        };
        store.restore(deep_merge(&self.defaults, &saved));
        info!("Game state loaded");
        true
    }

    /// Whether a save exists.
    pub fn has_save(&self) -> bool {
        self.storage.exists()
    }

    /// Deletes the save and resets the store to the defaults.
    #[instrument(skip(self, store))]
    pub fn clear_save(&self, store: &mut PathStore) {
        if let Err(e) = self.storage.remove() {
            warn!(error = %e, "Failed to remove save");
        }
        store.reset(self.defaults.clone());
        info!("Save cleared");
    }
}

fn redact(mut state: Value) -> Value {
    for path in REDACTED_PATHS {
        let Some((last, parents)) = path.split_last() else {
            continue;
        };
        let target = parents
            .iter()
            .try_fold(&mut state, |node, key| node.get_mut(*key));
        if let Some(Value::Object(map)) = target {
            map.insert((*last).to_string(), Value::Null);
        }
    }
    state
}
