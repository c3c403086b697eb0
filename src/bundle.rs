//! Application bundle inspection
//!
//! Reads `Contents/Info.plist` (XML or binary) from a `.app` bundle and
//! derives the values the menu needs. Unreadable metadata never drops the
//! bundle; it falls back to filename-derived defaults.

use std::ffi::OsStr;
use std::path::{Path, PathBuf};

use plist::Value;
use serde::Serialize;
use tracing::{debug, warn};

use crate::error::{AppMenuError, Result};
use crate::humanize::{humanize_category, humanize_file_stem, OTHER_CATEGORY};

/// Directory-name suffix that marks an application bundle
pub const BUNDLE_SUFFIX: &str = ".app";

/// Extension appended when looking up a declared icon resource
const ICON_FILE_EXTENSION: &str = "icns";

/// Last-resort display name
const UNKNOWN_APP: &str = "Unknown App";

/// Where an application's icon comes from
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum AppIcon {
    /// Icon file inside the bundle's Resources
    Resource(PathBuf),
    /// Ask the OS for its icon for the bundle path
    SystemGeneric,
}

/// An installed application found by the scanner
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscoveredApplication {
    /// Never empty
    pub display_name: String,
    /// Raw category identifier, `Other` when the bundle declares none
    pub category: String,
    pub bundle_id: Option<String>,
    pub icon: AppIcon,
    /// Absolute path to the `.app` directory; identity and launch target
    pub bundle_path: PathBuf,
}

impl DiscoveredApplication {
    /// Human-readable grouping key
    pub fn category_label(&self) -> String {
        humanize_category(&self.category)
    }
}

/// Whether a directory entry name looks like an application bundle
pub fn is_bundle_name(name: &OsStr) -> bool {
    name.to_str()
        .map(|n| n.ends_with(BUNDLE_SUFFIX))
        .unwrap_or(false)
}

/// Metadata fields read from Info.plist
#[derive(Debug, Default, Clone, PartialEq, Eq)]
struct InfoPlist {
    display_name: Option<String>,
    name: Option<String>,
    category: Option<String>,
    icon_file: Option<String>,
    bundle_id: Option<String>,
}

fn info_plist_path(bundle_path: &Path) -> PathBuf {
    bundle_path.join("Contents").join("Info.plist")
}

fn read_info_plist(bundle_path: &Path) -> Result<InfoPlist> {
    let path = info_plist_path(bundle_path);
    let value = Value::from_file(&path).map_err(|e| AppMenuError::BundleMetadataUnreadable {
        path: path.clone(),
        reason: e.to_string(),
    })?;
    let dict = value
        .as_dictionary()
        .ok_or_else(|| AppMenuError::BundleMetadataUnreadable {
            path: path.clone(),
            reason: "top-level value is not a dictionary".to_string(),
        })?;

    // Empty strings count as absent
    let string = |key: &str| {
        dict.get(key)
            .and_then(Value::as_string)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
    };

    Ok(InfoPlist {
        display_name: string("CFBundleDisplayName"),
        name: string("CFBundleName"),
        category: string("LSApplicationCategoryType"),
        icon_file: string("CFBundleIconFile"),
        bundle_id: string("CFBundleIdentifier"),
    })
}

/// Name derived from the bundle's directory name
fn fallback_name(bundle_path: &Path) -> String {
    let file_name = bundle_path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_default();
    let stem = file_name
        .strip_suffix(BUNDLE_SUFFIX)
        .unwrap_or(&file_name)
        .to_string();

    let humanized = humanize_file_stem(&stem);
    if !humanized.is_empty() {
        humanized
    } else if !stem.trim().is_empty() {
        stem
    } else {
        UNKNOWN_APP.to_string()
    }
}

/// Resolve the declared icon, trying `<name>.icns` before `<name>`.
fn resolve_icon(bundle_path: &Path, icon_file: Option<&str>) -> AppIcon {
    let Some(icon_file) = icon_file else {
        return AppIcon::SystemGeneric;
    };
    let resources = bundle_path.join("Contents").join("Resources");
    let with_extension = resources.join(format!("{}.{}", icon_file, ICON_FILE_EXTENSION));
    let as_declared = resources.join(icon_file);

    [with_extension, as_declared]
        .into_iter()
        .find(|candidate| candidate.is_file())
        .map(AppIcon::Resource)
        .unwrap_or(AppIcon::SystemGeneric)
}

/// Build the `DiscoveredApplication` for one bundle.
pub fn inspect_bundle(bundle_path: &Path) -> DiscoveredApplication {
    let info = match read_info_plist(bundle_path) {
        Ok(info) => info,
        Err(e) => {
            warn!(bundle = %bundle_path.display(), error = %e, "Using defaults for bundle");
            InfoPlist::default()
        }
    };

    let display_name = info
        .display_name
        .clone()
        .or_else(|| info.name.clone())
        .unwrap_or_else(|| fallback_name(bundle_path));

    let category = info
        .category
        .clone()
        .unwrap_or_else(|| OTHER_CATEGORY.to_string());

    let icon = resolve_icon(bundle_path, info.icon_file.as_deref());

    debug!(
        bundle = %bundle_path.display(),
        name = %display_name,
        category = %category,
        "Inspected bundle"
    );

    DiscoveredApplication {
        display_name,
        category,
        bundle_id: info.bundle_id,
        icon,
        bundle_path: bundle_path.to_path_buf(),
    }
}

#[cfg(test)]
pub(crate) mod fixtures {
    //! Builders for fake bundle trees

    use std::fs;
    use std::path::{Path, PathBuf};

    /// Create `<dir>/<name>` with an XML Info.plist holding `entries`.
    pub fn write_bundle(dir: &Path, name: &str, entries: &[(&str, &str)]) -> PathBuf {
        let bundle = dir.join(name);
        let contents = bundle.join("Contents");
        fs::create_dir_all(contents.join("Resources")).unwrap();

        let body: String = entries
            .iter()
            .map(|(k, v)| format!("    <key>{}</key>\n    <string>{}</string>\n", k, v))
            .collect();
        let xml = format!(
            "<?xml version=\"1.0\" encoding=\"UTF-8\"?>\n\
             <!DOCTYPE plist PUBLIC \"-//Apple//DTD PLIST 1.0//EN\" \"http://www.apple.com/DTDs/PropertyList-1.0.dtd\">\n\
             <plist version=\"1.0\">\n<dict>\n{}</dict>\n</plist>\n",
            body
        );
        fs::write(contents.join("Info.plist"), xml).unwrap();
        bundle
    }

    /// Create `<dir>/<name>` with no Info.plist at all.
    pub fn write_bare_bundle(dir: &Path, name: &str) -> PathBuf {
        let bundle = dir.join(name);
        fs::create_dir_all(bundle.join("Contents")).unwrap();
        bundle
    }

    /// An app in category `category` whose display name is `display_name`.
    pub fn write_app(dir: &Path, display_name: &str, category: &str) -> PathBuf {
        let file_name = format!("{}.app", display_name.replace(' ', ""));
        write_bundle(
            dir,
            &file_name,
            &[
                ("CFBundleName", display_name),
                ("LSApplicationCategoryType", category),
            ],
        )
    }
}
