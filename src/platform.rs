//! Platform primitives behind narrow, testable seams.
//!
//! - `user_home_dir` - home directory from the user record (not `$HOME`)
//! - `NativeBookmarks` - security-scoped bookmarks (NSURL on macOS,
//!   plain path tokens elsewhere)
//! - `icon_png` - rasterise an `AppIcon` handle to PNG bytes (macOS only)

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::bundle::AppIcon;
use crate::directory_access::{BookmarkBackend, ResolvedBookmark};
use crate::error::{AppMenuError, Result};

#[cfg(target_os = "macos")]
mod macos;

/// The current user's home directory as recorded in the user database.
///
/// `$HOME` is not consulted unless the record lookup fails.
pub fn user_home_dir() -> Option<PathBuf> {
    user_record_home().or_else(|| {
        debug!("User record lookup failed, falling back to dirs::home_dir");
        dirs::home_dir()
    })
}

#[cfg(unix)]
fn user_record_home() -> Option<PathBuf> {
    use std::ffi::{CStr, OsStr};
    use std::os::unix::ffi::OsStrExt;

    let mut buf = vec![0 as libc::c_char; 4096];
    // SAFETY: passwd is plain data; getpwuid_r fills it and points its
    // string fields into `buf`, which outlives every read below.
    unsafe {
        let mut pwd: libc::passwd = std::mem::zeroed();
        let mut result: *mut libc::passwd = std::ptr::null_mut();
        let rc = libc::getpwuid_r(
            libc::getuid(),
            &mut pwd,
            buf.as_mut_ptr(),
            buf.len(),
            &mut result,
        );
        if rc != 0 || result.is_null() || pwd.pw_dir.is_null() {
            return None;
        }
        let dir = CStr::from_ptr(pwd.pw_dir).to_bytes();
        if dir.is_empty() {
            return None;
        }
        Some(PathBuf::from(OsStr::from_bytes(dir)))
    }
}

#[cfg(not(unix))]
fn user_record_home() -> Option<PathBuf> {
    None
}

// ============================================================================
// Security-scoped bookmarks
// ============================================================================

/// Platform handle kept alive while a bookmark is resolved
#[derive(Debug)]
pub struct NativeUrl {
    #[cfg(target_os = "macos")]
    url: macos::RetainedUrl,
}

/// Bookmarks backed by the operating system
#[derive(Debug, Default, Clone, Copy)]
pub struct NativeBookmarks;

#[cfg(target_os = "macos")]
impl BookmarkBackend for NativeBookmarks {
    fn create(&self, dir: &Path) -> Result<Vec<u8>> {
        macos::create_bookmark(dir).map_err(AppMenuError::AccessTokenInvalid)
    }

    fn resolve(&self, token: &[u8]) -> Result<ResolvedBookmark> {
        let (url, path, is_stale) =
            macos::resolve_bookmark(token).map_err(AppMenuError::AccessTokenInvalid)?;
        Ok(ResolvedBookmark::new(path, is_stale).with_native(NativeUrl { url }))
    }

    fn start_access(&self, bookmark: &ResolvedBookmark) -> bool {
        match bookmark.native() {
            Some(native) => macos::start_accessing(&native.url),
            None => false,
        }
    }

    fn stop_access(&self, bookmark: &ResolvedBookmark) {
        if let Some(native) = bookmark.native() {
            macos::stop_accessing(&native.url);
        }
    }
}

/// Elsewhere a bookmark is the directory path itself. It is stale once
/// the directory disappears, and access is always granted.
#[cfg(not(target_os = "macos"))]
impl BookmarkBackend for NativeBookmarks {
    fn create(&self, dir: &Path) -> Result<Vec<u8>> {
        if !dir.is_dir() {
            return Err(AppMenuError::AccessTokenInvalid(format!(
                "{} is not a directory",
                dir.display()
            )));
        }
        Ok(path_to_bytes(dir))
    }

    fn resolve(&self, token: &[u8]) -> Result<ResolvedBookmark> {
        if token.is_empty() {
            return Err(AppMenuError::AccessTokenInvalid("empty token".into()));
        }
        let path = bytes_to_path(token);
        let is_stale = !path.is_dir();
        Ok(ResolvedBookmark::new(path, is_stale))
    }

    fn start_access(&self, _bookmark: &ResolvedBookmark) -> bool {
        true
    }

    fn stop_access(&self, _bookmark: &ResolvedBookmark) {}
}

#[cfg(all(unix, not(target_os = "macos")))]
fn path_to_bytes(path: &Path) -> Vec<u8> {
    use std::os::unix::ffi::OsStrExt;
    path.as_os_str().as_bytes().to_vec()
}

#[cfg(all(unix, not(target_os = "macos")))]
fn bytes_to_path(bytes: &[u8]) -> PathBuf {
    use std::ffi::OsStr;
    use std::os::unix::ffi::OsStrExt;
    PathBuf::from(OsStr::from_bytes(bytes))
}

#[cfg(not(unix))]
fn path_to_bytes(path: &Path) -> Vec<u8> {
    path.to_string_lossy().into_owned().into_bytes()
}

#[cfg(not(unix))]
fn bytes_to_path(bytes: &[u8]) -> PathBuf {
    PathBuf::from(String::from_utf8_lossy(bytes).into_owned())
}

// ============================================================================
// Icons
// ============================================================================

/// Rasterise an icon handle to a square PNG of `size` points.
///
/// A resource icon that fails to load falls back to the system's icon for
/// `bundle_path`.
#[cfg(target_os = "macos")]
pub fn icon_png(icon: &AppIcon, bundle_path: &Path, size: f64) -> Option<Vec<u8>> {
    macos::icon_png(icon, bundle_path, size)
}

#[cfg(not(target_os = "macos"))]
pub fn icon_png(_icon: &AppIcon, _bundle_path: &Path, _size: f64) -> Option<Vec<u8>> {
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[cfg(unix)]
    fn test_user_home_dir_is_absolute() {
        let home = user_home_dir().expect("user record should have a home directory");
        assert!(home.is_absolute(), "home should be absolute: {:?}", home);
    }

    #[test]
    #[cfg(all(unix, not(target_os = "macos")))]
    fn test_path_bookmark_round_trip_and_staleness() {
        let dir = tempfile::tempdir().unwrap();
        let backend = NativeBookmarks;

        let token = backend.create(dir.path()).unwrap();
        let resolved = backend.resolve(&token).unwrap();
        assert_eq!(resolved.path, dir.path());
        assert!(!resolved.is_stale);
        assert!(backend.start_access(&resolved));

        let gone = dir.path().to_path_buf();
        drop(dir);
        let resolved = backend.resolve(&token).unwrap();
        assert_eq!(resolved.path, gone);
        assert!(resolved.is_stale);
    }

    #[test]
    #[cfg(all(unix, not(target_os = "macos")))]
    fn test_path_bookmark_rejects_files_and_empty_tokens() {
        let file = tempfile::NamedTempFile::new().unwrap();
        assert!(NativeBookmarks.create(file.path()).is_err());
        assert!(NativeBookmarks.resolve(&[]).is_err());
    }
}
