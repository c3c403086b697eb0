//! Preference stores.
//!
//! `JsonPreferenceStore` persists to a single JSON object keyed by the
//! on-disk key names. Every `set`/`remove` writes through to disk.
//! `MemoryPreferenceStore` keeps everything in memory for tests.

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use tracing::{debug, info, warn};

use super::keys::PreferenceKey;
use super::types::PreferenceValue;
use crate::error::{AppMenuError, Result};

/// Notification that a key's stored value changed (set, removed or reloaded)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreferenceChange {
    pub key: PreferenceKey,
}

/// Process-wide key/value store for user settings
pub trait PreferenceStore: Send + Sync {
    fn get(&self, key: PreferenceKey) -> Option<PreferenceValue>;

    fn set(&self, key: PreferenceKey, value: PreferenceValue) -> Result<()>;

    fn remove(&self, key: PreferenceKey) -> Result<()>;

    /// Receive one `PreferenceChange` per effective modification.
    fn subscribe(&self) -> async_channel::Receiver<PreferenceChange>;

    fn get_bool(&self, key: PreferenceKey) -> Option<bool> {
        self.get(key).and_then(|v| v.as_bool())
    }

    fn get_int(&self, key: PreferenceKey) -> Option<i64> {
        self.get(key).and_then(|v| v.as_int())
    }

    fn get_data(&self, key: PreferenceKey) -> Option<Vec<u8>> {
        self.get(key).and_then(|v| v.as_data().map(<[u8]>::to_vec))
    }
}

type ValueMap = BTreeMap<PreferenceKey, PreferenceValue>;

/// Fan-out of change notifications to every live subscriber
#[derive(Default)]
struct ChangeNotifier {
    subscribers: Mutex<Vec<async_channel::Sender<PreferenceChange>>>,
}

impl ChangeNotifier {
    fn subscribe(&self) -> async_channel::Receiver<PreferenceChange> {
        let (tx, rx) = async_channel::unbounded();
        self.subscribers.lock().push(tx);
        rx
    }

    fn notify(&self, key: PreferenceKey) {
        let mut subscribers = self.subscribers.lock();
        subscribers.retain(|tx| tx.try_send(PreferenceChange { key }).is_ok());
        debug!(key = %key, subscribers = subscribers.len(), "Preference changed");
    }
}

/// Apply a set/remove to `values`; returns whether anything changed.
fn apply(values: &mut ValueMap, key: PreferenceKey, value: Option<PreferenceValue>) -> bool {
    match value {
        Some(value) => values.insert(key, value.clone()).as_ref() != Some(&value),
        None => values.remove(&key).is_some(),
    }
}

/// Keys whose values differ between two maps
fn changed_keys(old: &ValueMap, new: &ValueMap) -> Vec<PreferenceKey> {
    PreferenceKey::ALL
        .into_iter()
        .filter(|key| old.get(key) != new.get(key))
        .collect()
}

// ============================================================================
// JSON file store
// ============================================================================

/// Preferences persisted as a JSON object on disk
pub struct JsonPreferenceStore {
    path: PathBuf,
    values: Mutex<ValueMap>,
    notifier: ChangeNotifier,
}

impl JsonPreferenceStore {
    /// Open the store at `path`.
    ///
    /// A missing file is an empty store. A malformed file is logged and
    /// treated as empty; it is only overwritten on the next `set`.
    pub fn open(path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        let values = match read_values(&path) {
            Ok(values) => values,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Failed to read preferences, using defaults");
                ValueMap::new()
            }
        };
        info!(path = %path.display(), entries = values.len(), "Preferences loaded");

        Self {
            path,
            values: Mutex::new(values),
            notifier: ChangeNotifier::default(),
        }
    }

    /// Open the store at ~/.app-menu/preferences.json
    pub fn open_default() -> Self {
        Self::open(super::default_preferences_path())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file and notify subscribers about every key that differs.
    ///
    /// Returns the changed keys.
    pub fn reload(&self) -> Result<Vec<PreferenceKey>> {
        let fresh = read_values(&self.path)?;
        let changed = {
            let mut values = self.values.lock();
            let changed = changed_keys(&values, &fresh);
            *values = fresh;
            changed
        };
        for key in &changed {
            self.notifier.notify(*key);
        }
        if !changed.is_empty() {
            info!(path = %self.path.display(), changed = changed.len(), "Preferences reloaded");
        }
        Ok(changed)
    }

    fn update(&self, key: PreferenceKey, value: Option<PreferenceValue>) -> Result<()> {
        let changed = {
            let mut values = self.values.lock();
            let changed = apply(&mut values, key, value);
            if changed {
                write_values(&self.path, &values)?;
            }
            changed
        };
        if changed {
            self.notifier.notify(key);
        }
        Ok(())
    }
}

impl PreferenceStore for JsonPreferenceStore {
    fn get(&self, key: PreferenceKey) -> Option<PreferenceValue> {
        self.values.lock().get(&key).cloned()
    }

    fn set(&self, key: PreferenceKey, value: PreferenceValue) -> Result<()> {
        self.update(key, Some(value))
    }

    fn remove(&self, key: PreferenceKey) -> Result<()> {
        self.update(key, None)
    }

    fn subscribe(&self) -> async_channel::Receiver<PreferenceChange> {
        self.notifier.subscribe()
    }
}

fn read_values(path: &Path) -> Result<ValueMap> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(ValueMap::new()),
        Err(source) => {
            return Err(AppMenuError::PreferencesIo {
                path: path.to_path_buf(),
                source,
            })
        }
    };
    if content.trim().is_empty() {
        return Ok(ValueMap::new());
    }

    let raw: BTreeMap<String, serde_json::Value> = serde_json::from_str(&content)?;
    let mut values = ValueMap::new();
    for (name, json) in raw {
        let Ok(key) = name.parse::<PreferenceKey>() else {
            debug!(key = %name, "Ignoring unknown preference key");
            continue;
        };
        match serde_json::from_value::<PreferenceValue>(json) {
            Ok(value) if value.kind() == key.kind() => {
                values.insert(key, value);
            }
            Ok(value) => {
                warn!(key = %key, expected = ?key.kind(), found = ?value.kind(), "Ignoring mistyped preference");
            }
            Err(e) => {
                warn!(key = %key, error = %e, "Ignoring unparseable preference");
            }
        }
    }
    Ok(values)
}

fn write_values(path: &Path, values: &ValueMap) -> Result<()> {
    let io_err = |source| AppMenuError::PreferencesIo {
        path: path.to_path_buf(),
        source,
    };

    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).map_err(io_err)?;
    }

    let named: BTreeMap<&str, &PreferenceValue> =
        values.iter().map(|(k, v)| (k.as_str(), v)).collect();
    let content = serde_json::to_string_pretty(&named)?;

    // Write-then-rename so the watcher never sees a half-written file
    let tmp = path.with_extension("json.tmp");
    fs::write(&tmp, content).map_err(io_err)?;
    fs::rename(&tmp, path).map_err(io_err)?;
    Ok(())
}

// ============================================================================
// In-memory store
// ============================================================================

/// In-memory store with the same notification semantics as the JSON store
#[derive(Default)]
pub struct MemoryPreferenceStore {
    values: Mutex<ValueMap>,
    notifier: ChangeNotifier,
}

impl MemoryPreferenceStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style seeding for tests
    pub fn with(self, key: PreferenceKey, value: PreferenceValue) -> Self {
        self.values.lock().insert(key, value);
        self
    }
}

impl PreferenceStore for MemoryPreferenceStore {
    fn get(&self, key: PreferenceKey) -> Option<PreferenceValue> {
        self.values.lock().get(&key).cloned()
    }

    fn set(&self, key: PreferenceKey, value: PreferenceValue) -> Result<()> {
        let changed = apply(&mut self.values.lock(), key, Some(value));
        if changed {
            self.notifier.notify(key);
        }
        Ok(())
    }

    fn remove(&self, key: PreferenceKey) -> Result<()> {
        let changed = apply(&mut self.values.lock(), key, None);
        if changed {
            self.notifier.notify(key);
        }
        Ok(())
    }

    fn subscribe(&self) -> async_channel::Receiver<PreferenceChange> {
        self.notifier.subscribe()
    }
}
