use std::path::PathBuf;

use thiserror::Error;
use tracing::{error, warn};

/// Domain-specific errors for App Menu
///
/// None of these reach the user as a dialog. Discovery degrades to
/// "this item is excluded" and the error is logged.
#[derive(Error, Debug)]
pub enum AppMenuError {
    #[error("Directory unreadable: {path}: {source}")]
    DirectoryUnreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Bundle metadata unreadable for '{path}': {reason}")]
    BundleMetadataUnreadable { path: PathBuf, reason: String },

    #[error("Directory access token invalid: {0}")]
    AccessTokenInvalid(String),

    #[error("Directory access token is stale for {0}")]
    AccessTokenStale(PathBuf),

    #[error("User cancelled the directory access request")]
    UserCancelledGrant,

    #[error("Preferences I/O failed for '{path}': {source}")]
    PreferencesIo {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Preferences file is malformed: {0}")]
    PreferencesFormat(#[from] serde_json::Error),

    #[error("Failed to launch '{path}': {reason}")]
    Launch { path: PathBuf, reason: String },
}

pub type Result<T> = std::result::Result<T, AppMenuError>;

/// Extension trait for silent error logging with caller location tracking.
/// Use when the operation is recoverable and user doesn't need to know.
///
/// # Examples
///
/// ```ignore
/// use app_menu::error::ResultExt;
///
/// // Log and continue with defaults if the store can't be read
/// let store = JsonPreferenceStore::open(path).log_err();
///
/// // Log as warning for expected failures
/// let entries = fs::read_dir(dir).warn_on_err();
/// ```
pub trait ResultExt<T> {
    /// Log error with caller location and return None. Use for recoverable failures.
    fn log_err(self) -> Option<T>;
    /// Log as warning with caller location and return None. Use for expected failures.
    fn warn_on_err(self) -> Option<T>;
}

impl<T, E: std::fmt::Debug> ResultExt<T> for std::result::Result<T, E> {
    #[track_caller]
    fn log_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                error!(
                    error = ?error,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation failed"
                );
                None
            }
        }
    }

    #[track_caller]
    fn warn_on_err(self) -> Option<T> {
        match self {
            Ok(value) => Some(value),
            Err(error) => {
                let caller = std::panic::Location::caller();
                warn!(
                    error = ?error,
                    file = caller.file(),
                    line = caller.line(),
                    "Operation had warning"
                );
                None
            }
        }
    }
}
