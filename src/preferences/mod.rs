//! User preferences - persisted settings and change notifications
//!
//! This module provides:
//! - A process-wide key/value store (`PreferenceStore`) with explicit get/set
//! - A JSON-file implementation (~/.app-menu/preferences.json) and an
//!   in-memory one for tests
//! - A typed `Preferences` snapshot read once per scan
//! - A file watcher that turns external edits into change notifications
//!
//! # Module Structure
//!
//! - `keys` - The persisted key names
//! - `types` - Value types and the typed snapshot
//! - `store` - Store trait and implementations
//! - `watcher` - Reload-on-edit for the JSON store

mod keys;
mod store;
mod types;
pub mod watcher;

use std::path::PathBuf;

pub use keys::{PreferenceKey, UnknownPreferenceKey, ValueKind};
pub use store::{JsonPreferenceStore, MemoryPreferenceStore, PreferenceChange, PreferenceStore};
pub use types::{MenuBarOption, PreferenceValue, Preferences};

/// Environment variable that relocates every file App Menu writes
pub const APP_HOME_ENV: &str = "APP_MENU_HOME";

/// Root directory for App Menu's files (~/.app-menu unless overridden)
pub fn app_home_dir() -> PathBuf {
    if let Some(dir) = std::env::var_os(APP_HOME_ENV).filter(|v| !v.is_empty()) {
        return PathBuf::from(dir);
    }
    dirs::home_dir()
        .map(|h| h.join(".app-menu"))
        .unwrap_or_else(|| std::env::temp_dir().join("app-menu"))
}

/// Default location of the preferences file
pub fn default_preferences_path() -> PathBuf {
    app_home_dir().join("preferences.json")
}

#[cfg(test)]
#[path = "preferences_tests.rs"]
mod tests;
