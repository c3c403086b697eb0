//! Scoped access to one user-granted directory.
//!
//! The grant is captured once through a directory chooser, persisted as an
//! opaque token under `userSelectedDirectory`, and re-activated on each use.
//! A `DirectoryHandle` releases the scoped access exactly once when it is
//! dropped, on every exit path.
//!
//! ```ignore
//! let access = DirectoryAccess::native(store);
//! {
//!     let _grant = access.restore_access();
//!     let report = scanner.scan(prefs.show_web_apps);
//! } // access released here
//! ```

use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::{debug, error, info, warn};

use crate::error::{AppMenuError, ResultExt};
use crate::platform::{NativeBookmarks, NativeUrl};
use crate::preferences::{PreferenceKey, PreferenceStore, PreferenceValue};

/// Prompt shown by the directory chooser
pub const REQUEST_MESSAGE: &str = "Please grant access to the Applications directory";

/// A token resolved back into a directory
#[derive(Debug)]
pub struct ResolvedBookmark {
    pub path: PathBuf,
    /// The token still resolves but should be re-created
    pub is_stale: bool,
    native: Option<NativeUrl>,
}

impl ResolvedBookmark {
    pub fn new(path: impl Into<PathBuf>, is_stale: bool) -> Self {
        Self {
            path: path.into(),
            is_stale,
            native: None,
        }
    }

    pub(crate) fn with_native(mut self, native: NativeUrl) -> Self {
        self.native = Some(native);
        self
    }

    pub(crate) fn native(&self) -> Option<&NativeUrl> {
        self.native.as_ref()
    }
}

/// Creates, resolves and activates directory tokens
pub trait BookmarkBackend {
    fn create(&self, dir: &Path) -> crate::error::Result<Vec<u8>>;

    fn resolve(&self, token: &[u8]) -> crate::error::Result<ResolvedBookmark>;

    /// Begin scoped access; false if the platform refused.
    fn start_access(&self, bookmark: &ResolvedBookmark) -> bool;

    fn stop_access(&self, bookmark: &ResolvedBookmark);
}

/// Asks the user for a directory
pub trait DirectoryPicker {
    /// None when the user cancels.
    fn pick_directory(&self) -> Option<PathBuf>;
}

/// Native folder chooser
#[derive(Debug, Default, Clone, Copy)]
pub struct DialogPicker;

impl DirectoryPicker for DialogPicker {
    fn pick_directory(&self) -> Option<PathBuf> {
        let mut dialog = rfd::FileDialog::new().set_title(REQUEST_MESSAGE);
        if let Some(home) = crate::platform::user_home_dir() {
            dialog = dialog.set_directory(home.join("Applications"));
        }
        dialog.pick_folder()
    }
}

/// Live, access-enabled directory. Dropping it ends the scoped access.
#[must_use = "dropping the handle immediately ends directory access"]
pub struct DirectoryHandle<'a> {
    bookmark: ResolvedBookmark,
    backend: &'a dyn BookmarkBackend,
    accessing: bool,
}

impl DirectoryHandle<'_> {
    pub fn path(&self) -> &Path {
        &self.bookmark.path
    }

    /// Whether scoped access was actually activated
    pub fn is_accessing(&self) -> bool {
        self.accessing
    }

    /// End access now rather than at end of scope.
    pub fn release(self) {}
}

impl Drop for DirectoryHandle<'_> {
    fn drop(&mut self) {
        if self.accessing {
            self.accessing = false;
            self.backend.stop_access(&self.bookmark);
            debug!(path = %self.bookmark.path.display(), "Directory access released");
        }
    }
}

impl std::fmt::Debug for DirectoryHandle<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryHandle")
            .field("path", &self.bookmark.path)
            .field("accessing", &self.accessing)
            .finish()
    }
}

/// Obtains, restores and retracts the directory grant
pub struct DirectoryAccess {
    store: Arc<dyn PreferenceStore>,
    backend: Box<dyn BookmarkBackend>,
    /// Token written by the last renewal, until its change is acknowledged
    renewed: Mutex<Option<Vec<u8>>>,
}

impl DirectoryAccess {
    pub fn new(store: Arc<dyn PreferenceStore>, backend: Box<dyn BookmarkBackend>) -> Self {
        Self {
            store,
            backend,
            renewed: Mutex::new(None),
        }
    }

    /// Access backed by the operating system's bookmarks
    pub fn native(store: Arc<dyn PreferenceStore>) -> Self {
        Self::new(store, Box::new(NativeBookmarks))
    }

    /// Whether a token is currently persisted
    pub fn has_grant(&self) -> bool {
        self.store
            .get_data(PreferenceKey::UserSelectedDirectory)
            .is_some_and(|token| !token.is_empty())
    }

    /// Ask the user for a directory and persist a token for it.
    ///
    /// Returns None if the user cancels or the token cannot be created or
    /// stored. Nothing is persisted in either case.
    pub fn request_access(&self, picker: &dyn DirectoryPicker) -> Option<DirectoryHandle<'_>> {
        let Some(dir) = picker.pick_directory() else {
            info!(reason = %AppMenuError::UserCancelledGrant, "Directory access not granted");
            return None;
        };

        let token = match self.backend.create(&dir) {
            Ok(token) => token,
            Err(e) => {
                error!(path = %dir.display(), error = %e, "Error creating directory token");
                return None;
            }
        };

        if let Err(e) = self.store.set(
            PreferenceKey::UserSelectedDirectory,
            PreferenceValue::Data(token.clone()),
        ) {
            error!(path = %dir.display(), error = %e, "Failed to persist directory token");
            return None;
        }

        info!(path = %dir.display(), "Directory access granted");
        self.activate(&token)
    }

    /// Re-activate the persisted grant, if any.
    ///
    /// Activation failure is logged and the handle is still returned;
    /// callers already tolerate an unreadable directory.
    pub fn restore_access(&self) -> Option<DirectoryHandle<'_>> {
        let token = self.store.get_data(PreferenceKey::UserSelectedDirectory)?;
        if token.is_empty() {
            return None;
        }
        self.activate(&token)
    }

    /// Forget the persisted grant. Handles already in use are unaffected.
    pub fn retract_access(&self) -> crate::error::Result<()> {
        self.store.remove(PreferenceKey::UserSelectedDirectory)?;
        info!("Directory access retracted");
        Ok(())
    }

    /// Whether the stored token is the one the last renewal wrote.
    ///
    /// Clears the marker, so each renewal is acknowledged at most once. A
    /// token replaced or removed since then reports false.
    pub fn take_renewal(&self) -> bool {
        let Some(renewed) = self.renewed.lock().take() else {
            return false;
        };
        self.store
            .get_data(PreferenceKey::UserSelectedDirectory)
            .is_some_and(|current| current == renewed)
    }

    fn activate(&self, token: &[u8]) -> Option<DirectoryHandle<'_>> {
        let bookmark = match self.backend.resolve(token) {
            Ok(bookmark) => bookmark,
            Err(e) => {
                warn!(error = %e, "Error restoring directory token");
                return None;
            }
        };

        let accessing = self.backend.start_access(&bookmark);
        if !accessing {
            warn!(
                path = %bookmark.path.display(),
                "Failed to start accessing directory, continuing without scoped access"
            );
        }

        if bookmark.is_stale {
            self.renew(&bookmark, accessing);
        }

        Some(DirectoryHandle {
            bookmark,
            backend: self.backend.as_ref(),
            accessing,
        })
    }

    /// Replace a stale token with a fresh one for the same directory.
    fn renew(&self, bookmark: &ResolvedBookmark, accessing: bool) {
        let reason = AppMenuError::AccessTokenStale(bookmark.path.clone());
        warn!(reason = %reason, "Renewing directory token");
        if !accessing {
            // Creating a scoped token requires live access to the directory
            return;
        }
        let Some(fresh) = self.backend.create(&bookmark.path).warn_on_err() else {
            return;
        };
        *self.renewed.lock() = Some(fresh.clone());
        if self
            .store
            .set(
                PreferenceKey::UserSelectedDirectory,
                PreferenceValue::Data(fresh),
            )
            .warn_on_err()
            .is_some()
        {
            info!(path = %bookmark.path.display(), "Directory token renewed");
        } else {
            self.renewed.lock().take();
        }
    }
}
