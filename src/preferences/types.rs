//! Preference value types and the typed snapshot used by the scanner.

use std::fmt;

use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use serde::{Deserialize, Serialize};

use super::keys::{PreferenceKey, ValueKind};
use super::store::PreferenceStore;

/// A stored preference value.
///
/// In JSON, booleans and integers are stored natively and data blobs as
/// base64 strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PreferenceValue {
    Bool(bool),
    Int(i64),
    Data(#[serde(with = "base64_bytes")] Vec<u8>),
}

impl PreferenceValue {
    pub fn kind(&self) -> ValueKind {
        match self {
            Self::Bool(_) => ValueKind::Bool,
            Self::Int(_) => ValueKind::Int,
            Self::Data(_) => ValueKind::Data,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    pub fn as_data(&self) -> Option<&[u8]> {
        match self {
            Self::Data(bytes) => Some(bytes),
            _ => None,
        }
    }

    /// Parse a command-line value for `key`.
    pub fn parse_for(key: PreferenceKey, raw: &str) -> Result<Self, String> {
        match key.kind() {
            ValueKind::Bool => match raw.trim().to_ascii_lowercase().as_str() {
                "true" | "1" | "yes" | "on" => Ok(Self::Bool(true)),
                "false" | "0" | "no" | "off" => Ok(Self::Bool(false)),
                other => Err(format!("'{}' is not a boolean", other)),
            },
            ValueKind::Int => raw
                .trim()
                .parse::<i64>()
                .map(Self::Int)
                .map_err(|e| format!("'{}' is not an integer: {}", raw, e)),
            ValueKind::Data => STANDARD
                .decode(raw.trim())
                .map(Self::Data)
                .map_err(|e| format!("'{}' is not base64: {}", raw, e)),
        }
    }
}

impl fmt::Display for PreferenceValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", b),
            Self::Int(i) => write!(f, "{}", i),
            Self::Data(bytes) => write!(f, "<{} bytes>", bytes.len()),
        }
    }
}

mod base64_bytes {
    use base64::engine::general_purpose::STANDARD;
    use base64::Engine as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S: Serializer>(bytes: &[u8], serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&STANDARD.encode(bytes))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<u8>, D::Error> {
        let encoded = String::deserialize(deserializer)?;
        STANDARD
            .decode(encoded.as_bytes())
            .map_err(serde::de::Error::custom)
    }
}

/// How the status bar item presents itself
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MenuBarOption {
    #[default]
    Text,
    Icon,
    TextAndIcon,
}

impl MenuBarOption {
    /// Unknown values fall back to the text label.
    pub fn from_raw(raw: i64) -> Self {
        match raw {
            1 => Self::Icon,
            2 => Self::TextAndIcon,
            _ => Self::Text,
        }
    }

    pub fn raw(self) -> i64 {
        match self {
            Self::Text => 0,
            Self::Icon => 1,
            Self::TextAndIcon => 2,
        }
    }
}

/// Snapshot of the preferences that shape a scan and the status item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Preferences {
    pub menu_bar_option: MenuBarOption,
    pub case_insensitive_sorting: bool,
    pub show_web_apps: bool,
}

impl Preferences {
    /// Read the current values; missing or mistyped entries use defaults.
    pub fn load(store: &dyn PreferenceStore) -> Self {
        Self {
            menu_bar_option: store
                .get_int(PreferenceKey::MenuBarOption)
                .map(MenuBarOption::from_raw)
                .unwrap_or_default(),
            case_insensitive_sorting: store
                .get_bool(PreferenceKey::CaseInsensitiveAppsSorting)
                .unwrap_or(false),
            show_web_apps: store.get_bool(PreferenceKey::ShowWebApps).unwrap_or(false),
        }
    }
}
