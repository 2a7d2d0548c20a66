//! Persisted form store for resumable wizards.
//!
//! Two logical keys live in a [`KeyValueStore`]: `<prefix>.fields` holds the
//! JSON-serialized field map and `<prefix>.step` holds the step index as a
//! decimal string. Medium failures never reach the caller; they are logged
//! and treated as "nothing saved".

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use serde_json::Value;
use thiserror::Error;
use tracing::{debug, warn};

use super::types::{FieldMap, WizardSnapshot};

/// Errors from a persistence medium
#[derive(Error, Debug)]
pub enum StorageError {
    #[error("storage I/O failed for {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("storage file {0} is not a valid key-value document")]
    Corrupt(PathBuf),

    #[error("in-memory storage lock was poisoned")]
    Poisoned,
}

/// A string key-value medium that outlives the process (or the page, in
/// browser terms).
pub trait KeyValueStore: Send + Sync {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError>;
    fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
    fn remove(&self, key: &str) -> Result<(), StorageError>;
}

impl<T: KeyValueStore + ?Sized> KeyValueStore for Arc<T> {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        (**self).remove(key)
    }
}

/// In-process storage, mostly for tests
#[derive(Debug, Default)]
pub struct MemoryStorage {
    entries: Mutex<HashMap<String, String>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of keys currently held
    pub fn len(&self) -> usize {
        self.entries.lock().map(|e| e.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl KeyValueStore for MemoryStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        Ok(entries.get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.entries.lock().map_err(|_| StorageError::Poisoned)?;
        entries.remove(key);
        Ok(())
    }
}

/// Key-value document stored as a single JSON object on disk
#[derive(Debug, Clone)]
pub struct FileStorage {
    path: PathBuf,
}

impl FileStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_error(&self, source: std::io::Error) -> StorageError {
        StorageError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn read_all(&self) -> Result<HashMap<String, String>, StorageError> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let contents = fs::read_to_string(&self.path).map_err(|e| self.io_error(e))?;
        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }
        serde_json::from_str(&contents).map_err(|_| StorageError::Corrupt(self.path.clone()))
    }

    fn write_all(&self, entries: &HashMap<String, String>) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent).map_err(|e| self.io_error(e))?;
            }
        }
        let contents = serde_json::to_string_pretty(entries)
            .map_err(|_| StorageError::Corrupt(self.path.clone()))?;

        // Write to a sibling temp file first so a crash never leaves half a document
        let tmp_path = self.path.with_extension("json.tmp");
        fs::write(&tmp_path, contents).map_err(|e| self.io_error(e))?;
        fs::rename(&tmp_path, &self.path).map_err(|e| self.io_error(e))
    }

    /// Read entries for a mutation; a corrupt document is replaced.
    fn read_for_update(&self) -> Result<HashMap<String, String>, StorageError> {
        match self.read_all() {
            Err(StorageError::Corrupt(path)) => {
                warn!(path = %path.display(), "Replacing corrupt storage file");
                Ok(HashMap::new())
            }
            other => other,
        }
    }
}

impl KeyValueStore for FileStorage {
    fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        Ok(self.read_all()?.remove(key))
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut entries = self.read_for_update()?;
        entries.insert(key.to_string(), value.to_string());
        self.write_all(&entries)
    }

    fn remove(&self, key: &str) -> Result<(), StorageError> {
        let mut entries = self.read_for_update()?;
        if entries.remove(key).is_some() {
            self.write_all(&entries)?;
        }
        Ok(())
    }
}

/// Whether a value is worth persisting.
///
/// Empty strings, empty arrays/objects, `null`, `false` and zero are defaults.
pub fn is_meaningful(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(items) => !items.is_empty(),
        Value::Object(map) => !map.is_empty(),
    }
}

/// Whether any field in the map is meaningful
pub fn has_meaningful_value(fields: &FieldMap) -> bool {
    fields.values().any(is_meaningful)
}

/// Saves and restores a wizard's fields and step index
pub struct PersistedFormStore<S: KeyValueStore> {
    storage: S,
    fields_key: String,
    step_key: String,
}

impl<S: KeyValueStore> PersistedFormStore<S> {
    pub fn new(storage: S, key_prefix: &str) -> Self {
        Self {
            storage,
            fields_key: format!("{}.fields", key_prefix),
            step_key: format!("{}.step", key_prefix),
        }
    }

    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Read back the saved snapshot. Anything unreadable counts as unsaved.
    pub fn load(&self) -> Option<WizardSnapshot> {
        let raw_fields = match self.storage.get(&self.fields_key) {
            Ok(raw) => raw,
            Err(e) => {
                warn!(error = %e, "Failed to read saved wizard fields");
                return None;
            }
        };

        let fields = match raw_fields {
            Some(raw) => match serde_json::from_str::<FieldMap>(&raw) {
                Ok(fields) => Some(fields),
                Err(e) => {
                    warn!(error = %e, "Discarding unparseable wizard fields");
                    return None;
                }
            },
            None => None,
        };

        let step = match self.storage.get(&self.step_key) {
            Ok(Some(raw)) => match raw.trim().parse::<usize>() {
                Ok(step) => Some(step),
                Err(_) => {
                    warn!(value = %raw, "Discarding unparseable wizard step");
                    None
                }
            },
            Ok(None) => None,
            Err(e) => {
                warn!(error = %e, "Failed to read saved wizard step");
                None
            }
        };

        if fields.is_none() && step.is_none() {
            return None;
        }

        Some(WizardSnapshot {
            fields: fields.unwrap_or_default(),
            step,
        })
    }

    /// Persist the field map if it holds anything meaningful.
    ///
    /// Returns whether a write was attempted and succeeded.
    pub fn save(&self, fields: &FieldMap) -> bool {
        if !has_meaningful_value(fields) {
            debug!("Skipping save of all-default wizard fields");
            return false;
        }
        self.write_fields(fields)
    }

    /// Make `fields` the saved baseline, whatever it holds.
    pub fn replace(&self, fields: &FieldMap) -> bool {
        self.write_fields(fields)
    }

    fn write_fields(&self, fields: &FieldMap) -> bool {
        let serialized = match serde_json::to_string(fields) {
            Ok(s) => s,
            Err(e) => {
                warn!(error = %e, "Failed to serialize wizard fields");
                return false;
            }
        };

        match self.storage.set(&self.fields_key, &serialized) {
            Ok(()) => true,
            Err(e) => {
                warn!(error = %e, "Failed to save wizard fields");
                false
            }
        }
    }

    pub fn save_step(&self, index: usize) {
        if let Err(e) = self.storage.set(&self.step_key, &index.to_string()) {
            warn!(error = %e, step = index, "Failed to save wizard step");
        }
    }

    /// Forget both fields and step. Safe to call repeatedly.
    pub fn clear(&self) {
        for key in [&self.fields_key, &self.step_key] {
            if let Err(e) = self.storage.remove(key) {
                warn!(error = %e, key = %key, "Failed to clear wizard key");
            }
        }
    }
}
