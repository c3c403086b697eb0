//! Persisted preference keys.

use std::fmt;
use std::str::FromStr;

/// Every key App Menu persists.
///
/// The string forms are the on-disk names and must not change.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PreferenceKey {
    /// Security-scoped token for an extra Applications directory (data)
    UserSelectedDirectory,
    /// Status bar label mode: 0 = text, 1 = icon, 2 = text + icon (integer)
    MenuBarOption,
    /// Case-insensitive ordering inside groups (bool)
    CaseInsensitiveAppsSorting,
    /// Show the "Web Apps" group (bool)
    ShowWebApps,
    /// Recognised and persisted, no effect on scanning (bool)
    ListAppsFromSubDirsRecursively,
}

/// Shape of the value stored under a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Bool,
    Int,
    Data,
}

impl PreferenceKey {
    pub const ALL: [PreferenceKey; 5] = [
        PreferenceKey::UserSelectedDirectory,
        PreferenceKey::MenuBarOption,
        PreferenceKey::CaseInsensitiveAppsSorting,
        PreferenceKey::ShowWebApps,
        PreferenceKey::ListAppsFromSubDirsRecursively,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::UserSelectedDirectory => "userSelectedDirectory",
            Self::MenuBarOption => "menuBarOption",
            Self::CaseInsensitiveAppsSorting => "caseInsensitiveAppsSorting",
            Self::ShowWebApps => "showChromeApps",
            Self::ListAppsFromSubDirsRecursively => "listAppsFromSubDirsRecursively",
        }
    }

    /// Kebab-case alias accepted on the command line
    pub fn cli_name(&self) -> &'static str {
        match self {
            Self::UserSelectedDirectory => "user-selected-directory",
            Self::MenuBarOption => "menu-bar-option",
            Self::CaseInsensitiveAppsSorting => "case-insensitive-sorting",
            Self::ShowWebApps => "show-web-apps",
            Self::ListAppsFromSubDirsRecursively => "list-apps-recursively",
        }
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Self::UserSelectedDirectory => ValueKind::Data,
            Self::MenuBarOption => ValueKind::Int,
            Self::CaseInsensitiveAppsSorting
            | Self::ShowWebApps
            | Self::ListAppsFromSubDirsRecursively => ValueKind::Bool,
        }
    }
}

impl fmt::Display for PreferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Error returned when a string names no known key
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPreferenceKey(pub String);

impl fmt::Display for UnknownPreferenceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown preference key '{}'", self.0)
    }
}

impl std::error::Error for UnknownPreferenceKey {}

impl FromStr for PreferenceKey {
    type Err = UnknownPreferenceKey;

    /// Accepts either the on-disk name or the CLI alias.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        PreferenceKey::ALL
            .into_iter()
            .find(|key| key.as_str() == s || key.cli_name() == s)
            .ok_or_else(|| UnknownPreferenceKey(s.to_string()))
    }
}
