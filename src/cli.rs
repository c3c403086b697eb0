//! Command-line surface
//!
//! `app-menu` with no subcommand runs the menu bar item. The other
//! subcommands cover what a settings window would: inspecting the scan,
//! editing preferences and managing the directory grant. Preference writes
//! go through the same JSON store the running instance watches.

use std::io::Write;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};

use crate::controller::MenuController;
use crate::directory_access::{DirectoryAccess, DirectoryPicker};
use crate::menu_model::{MenuEntry, MenuTree};
use crate::preferences::{PreferenceKey, PreferenceStore, PreferenceValue};

#[derive(Parser, Debug)]
#[command(
    name = "app-menu",
    version,
    about = "Menu bar launcher for installed applications",
    long_about = "Lists installed applications grouped by category in a menu bar item.\n\n\
                  Run without a subcommand to start the menu bar item."
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum Command {
    /// Show the menu bar item (default).
    Run,

    /// Scan application directories and print the resulting menu.
    Scan {
        /// Print the menu tree as JSON.
        #[arg(long)]
        json: bool,
    },

    /// Read or change preferences.
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },

    /// Manage access to an extra Applications directory.
    Access {
        #[command(subcommand)]
        action: AccessAction,
    },
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum ConfigAction {
    /// Print one preference, or all of them.
    Get {
        /// Key name, e.g. `menuBarOption` or `menu-bar-option`.
        key: Option<PreferenceKey>,
    },

    /// Store a preference.
    ///
    /// Booleans accept true/false, integers are decimal, data is base64.
    Set { key: PreferenceKey, value: String },

    /// Remove a preference so its default applies.
    Unset { key: PreferenceKey },

    /// Print the preferences file location.
    Path,
}

#[derive(Subcommand, Debug, PartialEq, Eq)]
pub enum AccessAction {
    /// Choose a directory and store access to it.
    Grant,
    /// Forget the stored directory.
    Retract,
    /// Show whether a directory is granted.
    Status,
}

/// `app-menu scan`
pub fn run_scan(controller: &MenuController, json: bool, out: &mut dyn Write) -> Result<()> {
    let tree = controller.rebuild();
    if json {
        serde_json::to_writer_pretty(&mut *out, &tree).context("Failed to write menu JSON")?;
        writeln!(out)?;
    } else {
        out.write_all(render_outline(&tree).as_bytes())?;
    }
    Ok(())
}

/// Indented text view of a menu tree
pub fn render_outline(tree: &MenuTree) -> String {
    let mut text = String::new();
    for entry in &tree.entries {
        match entry {
            MenuEntry::Group(group) => {
                text.push_str(&format!("{} ({})\n", group.label, group.items.len()));
                for item in &group.items {
                    text.push_str(&format!("    {}  {}\n", item.title, item.bundle_path.display()));
                }
            }
            MenuEntry::Separator => text.push_str("----\n"),
            MenuEntry::Action { action } => {
                text.push_str(&format!("[{}]\n", action.title()));
            }
        }
    }
    text
}

/// `app-menu config ...`
pub fn run_config(
    store: &dyn PreferenceStore,
    preferences_path: &std::path::Path,
    action: &ConfigAction,
    out: &mut dyn Write,
) -> Result<()> {
    match action {
        ConfigAction::Get { key: Some(key) } => match store.get(*key) {
            Some(value) => writeln!(out, "{}", value)?,
            None => writeln!(out, "(unset)")?,
        },
        ConfigAction::Get { key: None } => {
            for key in PreferenceKey::ALL {
                let shown = store
                    .get(key)
                    .map(|v| v.to_string())
                    .unwrap_or_else(|| "(unset)".to_string());
                writeln!(out, "{} = {}", key, shown)?;
            }
        }
        ConfigAction::Set { key, value } => {
            let parsed = match PreferenceValue::parse_for(*key, value) {
                Ok(parsed) => parsed,
                Err(reason) => bail!("Invalid value for {}: {}", key, reason),
            };
            store
                .set(*key, parsed.clone())
                .with_context(|| format!("Failed to store {}", key))?;
            writeln!(out, "{} = {}", key, parsed)?;
        }
        ConfigAction::Unset { key } => {
            store
                .remove(*key)
                .with_context(|| format!("Failed to remove {}", key))?;
            writeln!(out, "{} unset", key)?;
        }
        ConfigAction::Path => writeln!(out, "{}", preferences_path.display())?,
    }
    Ok(())
}

/// `app-menu access ...`
pub fn run_access(
    access: &DirectoryAccess,
    picker: &dyn DirectoryPicker,
    action: &AccessAction,
    out: &mut dyn Write,
) -> Result<()> {
    match action {
        AccessAction::Grant => match access.request_access(picker) {
            Some(handle) => writeln!(out, "Granted {}", handle.path().display())?,
            None => bail!("No directory was granted"),
        },
        AccessAction::Retract => {
            access
                .retract_access()
                .context("Failed to remove directory access")?;
            writeln!(out, "Directory access removed")?;
        }
        AccessAction::Status => {
            if !access.has_grant() {
                writeln!(out, "No directory granted")?;
            } else {
                match access.restore_access() {
                    Some(handle) if handle.is_accessing() => {
                        writeln!(out, "Granted {}", handle.path().display())?
                    }
                    Some(handle) => writeln!(
                        out,
                        "Granted {} (access could not be activated)",
                        handle.path().display()
                    )?,
                    None => writeln!(out, "Granted directory could not be resolved")?,
                }
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directory_access::{BookmarkBackend, ResolvedBookmark};
    use crate::menu_model::MenuModelBuilder;
    use crate::preferences::MemoryPreferenceStore;
    use crate::scanner::ScanReport;
    use std::path::{Path, PathBuf};
    use std::sync::Arc;

    struct PathBackend;

    impl BookmarkBackend for PathBackend {
        fn create(&self, dir: &Path) -> crate::error::Result<Vec<u8>> {
            Ok(dir.to_string_lossy().into_owned().into_bytes())
        }

        fn resolve(&self, token: &[u8]) -> crate::error::Result<ResolvedBookmark> {
            Ok(ResolvedBookmark::new(
                String::from_utf8_lossy(token).into_owned(),
                false,
            ))
        }

        fn start_access(&self, _bookmark: &ResolvedBookmark) -> bool {
            true
        }

        fn stop_access(&self, _bookmark: &ResolvedBookmark) {}
    }

    struct Picks(Option<PathBuf>);

    impl DirectoryPicker for Picks {
        fn pick_directory(&self) -> Option<PathBuf> {
            self.0.clone()
        }
    }

    fn output(f: impl FnOnce(&mut Vec<u8>) -> Result<()>) -> String {
        let mut buf = Vec::new();
        f(&mut buf).unwrap();
        String::from_utf8(buf).unwrap()
    }

    #[test]
    fn test_parse_defaults_to_no_subcommand() {
        let cli = Cli::try_parse_from(["app-menu"]).unwrap();
        assert_eq!(cli.command, None);
    }

    #[test]
    fn test_parse_config_set_with_either_key_form() {
        let cli =
            Cli::try_parse_from(["app-menu", "config", "set", "show-web-apps", "true"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Config {
                action: ConfigAction::Set {
                    key: PreferenceKey::ShowWebApps,
                    value: "true".into()
                }
            })
        );

        let cli = Cli::try_parse_from(["app-menu", "config", "get", "menuBarOption"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Config {
                action: ConfigAction::Get {
                    key: Some(PreferenceKey::MenuBarOption)
                }
            })
        );

        assert!(Cli::try_parse_from(["app-menu", "config", "get", "colour"]).is_err());
    }

    #[test]
    fn test_parse_scan_and_access() {
        let cli = Cli::try_parse_from(["app-menu", "scan", "--json"]).unwrap();
        assert_eq!(cli.command, Some(Command::Scan { json: true }));

        let cli = Cli::try_parse_from(["app-menu", "access", "status"]).unwrap();
        assert_eq!(
            cli.command,
            Some(Command::Access {
                action: AccessAction::Status
            })
        );
    }

    #[test]
    fn test_config_set_get_unset() {
        let store = MemoryPreferenceStore::new();
        let path = Path::new("/tmp/preferences.json");

        let printed = output(|out| {
            run_config(
                &store,
                path,
                &ConfigAction::Set {
                    key: PreferenceKey::MenuBarOption,
                    value: "2".into(),
                },
                out,
            )
        });
        assert_eq!(printed, "menuBarOption = 2\n");
        assert_eq!(store.get_int(PreferenceKey::MenuBarOption), Some(2));

        let printed = output(|out| {
            run_config(
                &store,
                path,
                &ConfigAction::Get {
                    key: Some(PreferenceKey::MenuBarOption),
                },
                out,
            )
        });
        assert_eq!(printed, "2\n");

        output(|out| {
            run_config(
                &store,
                path,
                &ConfigAction::Unset {
                    key: PreferenceKey::MenuBarOption,
                },
                out,
            )
        });
        assert!(store.get(PreferenceKey::MenuBarOption).is_none());
    }

    #[test]
    fn test_config_set_rejects_mistyped_value() {
        let store = MemoryPreferenceStore::new();
        let mut out = Vec::new();
        let result = run_config(
            &store,
            Path::new("/tmp/preferences.json"),
            &ConfigAction::Set {
                key: PreferenceKey::ShowWebApps,
                value: "maybe".into(),
            },
            &mut out,
        );
        assert!(result.is_err());
        assert!(store.get(PreferenceKey::ShowWebApps).is_none());
    }

    #[test]
    fn test_config_get_all_lists_every_key() {
        let store = MemoryPreferenceStore::new()
            .with(PreferenceKey::ShowWebApps, PreferenceValue::Bool(true));
        let printed = output(|out| {
            run_config(
                &store,
                Path::new("/tmp/preferences.json"),
                &ConfigAction::Get { key: None },
                out,
            )
        });
        assert_eq!(printed.lines().count(), PreferenceKey::ALL.len());
        assert!(printed.contains("showChromeApps = true"));
        assert!(printed.contains("menuBarOption = (unset)"));
    }

    #[test]
    fn test_access_grant_status_retract() {
        let store = Arc::new(MemoryPreferenceStore::new());
        let access = DirectoryAccess::new(store, Box::new(PathBackend));
        let picker = Picks(Some(PathBuf::from("/Volumes/Apps")));

        let printed = output(|out| run_access(&access, &picker, &AccessAction::Status, out));
        assert_eq!(printed, "No directory granted\n");

        let printed = output(|out| run_access(&access, &picker, &AccessAction::Grant, out));
        assert_eq!(printed, "Granted /Volumes/Apps\n");

        let printed = output(|out| run_access(&access, &picker, &AccessAction::Status, out));
        assert_eq!(printed, "Granted /Volumes/Apps\n");

        output(|out| run_access(&access, &picker, &AccessAction::Retract, out));
        assert!(!access.has_grant());
    }

    #[test]
    fn test_access_grant_cancelled_is_error() {
        let store = Arc::new(MemoryPreferenceStore::new());
        let access = DirectoryAccess::new(store, Box::new(PathBackend));
        let mut out = Vec::new();
        assert!(run_access(&access, &Picks(None), &AccessAction::Grant, &mut out).is_err());
    }

    #[test]
    fn test_outline_lists_groups_and_actions() {
        let tree = MenuModelBuilder::default().build(&ScanReport::default());
        let text = render_outline(&tree);
        assert_eq!(
            text,
            "----\nAll (0)\n----\n[Refresh]\n[Settings]\n[About]\n[Quit]\n"
        );
    }
}
