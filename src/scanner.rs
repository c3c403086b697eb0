//! Application discovery
//!
//! Walks the configured directories for `.app` bundles. Failures are isolated
//! per directory: an unreadable directory is logged and skipped, and the
//! rest of the scan proceeds.
//!
//! ## Directories
//! - `/Applications`, `/System/Applications`, `~/Applications`
//! - browser web-app folders under `~/Applications` (kept in a separate set)
//! - the user-granted directory, when one is active

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::time::Instant;

use serde::Serialize;
use tracing::{debug, warn};

use crate::bundle::{inspect_bundle, is_bundle_name, DiscoveredApplication};
use crate::error::{AppMenuError, Result};
use crate::logging;

/// System-wide application directories
const SYSTEM_DIRECTORIES: &[&str] = &["/Applications", "/System/Applications"];

/// Browser-installed web apps, relative to `~/Applications`
pub const WEB_APP_FOLDERS: &[&str] = &[
    "Chrome Apps.localized",
    "Brave Browser Apps.localized",
    "Edge Apps.localized",
    "Opera Apps.localized",
    "Vivaldi Apps.localized",
];

/// Scans slower than this are logged as slow
const SLOW_SCAN_THRESHOLD_MS: u64 = 500;

/// Directories a scan reads from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanSources {
    pub base_dirs: Vec<PathBuf>,
    pub web_app_dirs: Vec<PathBuf>,
}

impl ScanSources {
    /// Standard directories for a user whose home is `home`.
    pub fn for_user(home: &Path) -> Self {
        let user_apps = home.join("Applications");
        let mut base_dirs: Vec<PathBuf> = SYSTEM_DIRECTORIES.iter().map(PathBuf::from).collect();
        base_dirs.push(user_apps.clone());

        Self {
            base_dirs,
            web_app_dirs: WEB_APP_FOLDERS.iter().map(|f| user_apps.join(f)).collect(),
        }
    }

    /// Standard directories for the current user.
    ///
    /// Without a home directory only the system directories are scanned.
    pub fn system() -> Self {
        match crate::platform::user_home_dir() {
            Some(home) => Self::for_user(&home),
            None => {
                warn!("No home directory for current user, scanning system directories only");
                Self {
                    base_dirs: SYSTEM_DIRECTORIES.iter().map(PathBuf::from).collect(),
                    web_app_dirs: Vec::new(),
                }
            }
        }
    }

    /// Add a primary directory unless it is already scanned.
    pub fn with_extra_dir(mut self, dir: &Path) -> Self {
        let wanted = canonical(dir);
        if self.base_dirs.iter().any(|d| canonical(d) == wanted) {
            debug!(directory = %dir.display(), "Granted directory already scanned");
        } else {
            self.base_dirs.push(dir.to_path_buf());
        }
        self
    }
}

fn canonical(path: &Path) -> PathBuf {
    fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf())
}

/// Result of one scan
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScanReport {
    pub primary: Vec<DiscoveredApplication>,
    pub web_apps: Vec<DiscoveredApplication>,
    /// Directories that could not be listed
    pub skipped_directories: Vec<PathBuf>,
}

/// Discovers installed applications
#[derive(Debug, Clone)]
pub struct AppScanner {
    sources: ScanSources,
}

impl AppScanner {
    pub fn new(sources: ScanSources) -> Self {
        Self { sources }
    }

    /// Scan every source directory.
    ///
    /// Web-app directories are only read when `include_web_apps` is set.
    /// Bundles found in more than one directory are reported once per
    /// directory.
    pub fn scan(&self, include_web_apps: bool) -> ScanReport {
        let start = Instant::now();
        let mut report = ScanReport::default();

        for dir in &self.sources.base_dirs {
            collect_into(dir, &mut report.primary, &mut report.skipped_directories);
        }

        if include_web_apps {
            for dir in &self.sources.web_app_dirs {
                collect_into(dir, &mut report.web_apps, &mut report.skipped_directories);
            }
        }

        let duration_ms = start.elapsed().as_millis() as u64;
        logging::log_scan_complete(
            report.primary.len(),
            report.web_apps.len(),
            report.skipped_directories.len(),
            duration_ms,
        );
        logging::log_perf("scan", duration_ms, SLOW_SCAN_THRESHOLD_MS);

        report
    }
}

fn collect_into(dir: &Path, apps: &mut Vec<DiscoveredApplication>, skipped: &mut Vec<PathBuf>) {
    match scan_directory(dir) {
        Ok(found) => {
            debug!(directory = %dir.display(), count = found.len(), "Scanned directory");
            apps.extend(found);
        }
        Err(e) => {
            if is_not_found(&e) {
                debug!(directory = %dir.display(), "Directory does not exist, skipping");
            } else {
                warn!(directory = %dir.display(), error = %e, "Failed to scan directory");
            }
            skipped.push(dir.to_path_buf());
        }
    }
}

fn is_not_found(err: &AppMenuError) -> bool {
    matches!(
        err,
        AppMenuError::DirectoryUnreadable { source, .. } if source.kind() == io::ErrorKind::NotFound
    )
}

/// List the bundles directly inside `dir`, in file-name order.
pub fn list_bundles(dir: &Path) -> Result<Vec<PathBuf>> {
    let entries = fs::read_dir(dir).map_err(|source| AppMenuError::DirectoryUnreadable {
        path: dir.to_path_buf(),
        source,
    })?;

    let mut bundles: Vec<PathBuf> = entries
        .flatten()
        .filter(|entry| is_bundle_name(&entry.file_name()))
        .map(|entry| entry.path())
        .filter(|path| path.is_dir())
        .collect();
    bundles.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(bundles)
}

/// Inspect every bundle directly inside `dir`.
pub fn scan_directory(dir: &Path) -> Result<Vec<DiscoveredApplication>> {
    Ok(list_bundles(dir)?
        .iter()
        .map(|bundle| inspect_bundle(bundle))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bundle::fixtures::{write_app, write_bare_bundle};
    use tempfile::tempdir;

    fn names(apps: &[DiscoveredApplication]) -> Vec<&str> {
        apps.iter().map(|a| a.display_name.as_str()).collect()
    }

    #[test]
    fn test_for_user_directories() {
        let sources = ScanSources::for_user(Path::new("/Users/me"));
        assert_eq!(
            sources.base_dirs,
            vec![
                PathBuf::from("/Applications"),
                PathBuf::from("/System/Applications"),
                PathBuf::from("/Users/me/Applications"),
            ]
        );
        assert_eq!(sources.web_app_dirs.len(), 5);
        assert_eq!(
            sources.web_app_dirs[0],
            PathBuf::from("/Users/me/Applications/Chrome Apps.localized")
        );
        assert!(sources
            .web_app_dirs
            .iter()
            .all(|d| d.starts_with("/Users/me/Applications")));
    }

    #[test]
    fn test_with_extra_dir_skips_duplicates() {
        let dir = tempdir().unwrap();
        let sources = ScanSources {
            base_dirs: vec![dir.path().to_path_buf()],
            web_app_dirs: vec![],
        };

        let same = sources.clone().with_extra_dir(&dir.path().join("."));
        assert_eq!(same.base_dirs.len(), 1);

        let other = tempdir().unwrap();
        let extended = sources.with_extra_dir(other.path());
        assert_eq!(extended.base_dirs.len(), 2);
        assert_eq!(extended.base_dirs[1], other.path());
    }

    #[test]
    fn test_only_bundles_are_listed_in_name_order() {
        let dir = tempdir().unwrap();
        write_bare_bundle(dir.path(), "Zed.app");
        write_bare_bundle(dir.path(), "Alpha.app");
        fs::create_dir(dir.path().join("Utilities")).unwrap();
        fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        fs::write(dir.path().join("Fake.app"), b"file, not a bundle").unwrap();

        let bundles = list_bundles(dir.path()).unwrap();
        let file_names: Vec<_> = bundles
            .iter()
            .map(|b| b.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(file_names, vec!["Alpha.app", "Zed.app"]);
    }

    #[test]
    fn test_unreadable_directory_does_not_hide_others() {
        let first = tempdir().unwrap();
        let third = tempdir().unwrap();
        write_app(first.path(), "Safari", "public.app-category.productivity");
        write_app(third.path(), "Xcode", "public.app-category.developer-tools");

        // A regular file cannot be listed as a directory
        let blocker = tempfile::NamedTempFile::new().unwrap();

        let scanner = AppScanner::new(ScanSources {
            base_dirs: vec![
                first.path().to_path_buf(),
                blocker.path().to_path_buf(),
                third.path().to_path_buf(),
            ],
            web_app_dirs: vec![],
        });

        let report = scanner.scan(false);
        assert_eq!(names(&report.primary), vec!["Safari", "Xcode"]);
        assert_eq!(report.skipped_directories, vec![blocker.path().to_path_buf()]);
    }

    #[test]
    fn test_missing_directory_is_skipped() {
        let present = tempdir().unwrap();
        write_app(present.path(), "Notes", "public.app-category.productivity");
        let missing = present.path().join("does-not-exist");

        let report = AppScanner::new(ScanSources {
            base_dirs: vec![missing.clone(), present.path().to_path_buf()],
            web_app_dirs: vec![],
        })
        .scan(false);

        assert_eq!(names(&report.primary), vec!["Notes"]);
        assert_eq!(report.skipped_directories, vec![missing]);
    }

    #[test]
    fn test_web_apps_are_kept_separate() {
        let apps = tempdir().unwrap();
        let web = tempdir().unwrap();
        write_app(apps.path(), "Maps", "public.app-category.navigation");
        write_app(web.path(), "Gmail", "");

        let scanner = AppScanner::new(ScanSources {
            base_dirs: vec![apps.path().to_path_buf()],
            web_app_dirs: vec![web.path().to_path_buf()],
        });

        let with_web = scanner.scan(true);
        assert_eq!(names(&with_web.primary), vec!["Maps"]);
        assert_eq!(names(&with_web.web_apps), vec!["Gmail"]);
        assert_eq!(with_web.web_apps[0].category, "Other");

        let without_web = scanner.scan(false);
        assert!(without_web.web_apps.is_empty());
    }

    #[test]
    fn test_same_directory_twice_is_not_deduplicated() {
        let dir = tempdir().unwrap();
        write_app(dir.path(), "Calendar", "public.app-category.productivity");

        let report = AppScanner::new(ScanSources {
            base_dirs: vec![dir.path().to_path_buf(), dir.path().to_path_buf()],
            web_app_dirs: vec![],
        })
        .scan(false);

        assert_eq!(report.primary.len(), 2);
        assert_eq!(report.primary[0].bundle_path, report.primary[1].bundle_path);
    }

    #[test]
    fn test_rescan_is_identical() {
        let dir = tempdir().unwrap();
        write_app(dir.path(), "Books", "public.app-category.books");
        write_app(dir.path(), "Chess", "public.app-category.board-games");

        let scanner = AppScanner::new(ScanSources {
            base_dirs: vec![dir.path().to_path_buf()],
            web_app_dirs: vec![],
        });
        assert_eq!(scanner.scan(false), scanner.scan(false));
    }
}
