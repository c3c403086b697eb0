//! Menu pipeline and command dispatch
//!
//! Preferences + directory grant → scan → `MenuTree`. Every scan and every
//! launch runs inside its own directory-access scope; nothing is cached
//! between rebuilds.

use std::path::Path;
use std::sync::Arc;

use tracing::{debug, error, info};

use crate::directory_access::DirectoryAccess;
use crate::error::Result;
use crate::launcher::{Launcher, SystemLauncher};
use crate::logging;
use crate::menu_model::{MenuCommand, MenuModelBuilder, MenuTree};
use crate::preferences::{PreferenceKey, PreferenceStore, Preferences};
use crate::scanner::{AppScanner, ScanReport, ScanSources};
use crate::status_item::StatusLabel;

pub const APP_NAME: &str = "App Menu";

const LICENSE_NOTICE: &str = "MIT License\n\nCopyright (c) 2024 Artur Barseghyan";

const CREDITS: &str =
    "The application icon has been taken from the amazing tabler icons \
     (https://github.com/tabler/tabler-icons), MIT licensed.";

/// Diagnostic lines appended to the About text
const ABOUT_LOG_TAIL: usize = 5;

/// What the host should do after a command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ControlFlowHint {
    Continue,
    /// Replace the presented menu
    Rebuilt(MenuTree),
    OpenSettings,
    ShowAbout,
    Quit,
}

/// How a preference change affects the running menu
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PreferenceEffect {
    None,
    UpdateStatusLabel(StatusLabel),
    Rebuild(MenuTree),
}

pub struct MenuController {
    store: Arc<dyn PreferenceStore>,
    access: DirectoryAccess,
    sources: ScanSources,
    launcher: Box<dyn Launcher>,
}

impl MenuController {
    pub fn new(
        store: Arc<dyn PreferenceStore>,
        access: DirectoryAccess,
        sources: ScanSources,
        launcher: Box<dyn Launcher>,
    ) -> Self {
        Self {
            store,
            access,
            sources,
            launcher,
        }
    }

    /// Controller over the OS: native bookmarks, standard directories,
    /// default launcher
    pub fn native(store: Arc<dyn PreferenceStore>) -> Self {
        let access = DirectoryAccess::native(store.clone());
        Self::new(
            store,
            access,
            ScanSources::system(),
            Box::new(SystemLauncher),
        )
    }

    pub fn preferences(&self) -> Preferences {
        Preferences::load(self.store.as_ref())
    }

    pub fn access(&self) -> &DirectoryAccess {
        &self.access
    }

    pub fn status_label(&self) -> StatusLabel {
        StatusLabel::for_option(self.preferences().menu_bar_option)
    }

    /// Scan with the current preferences and grant.
    pub fn scan(&self) -> ScanReport {
        self.scan_with(&self.preferences())
    }

    fn scan_with(&self, prefs: &Preferences) -> ScanReport {
        let grant = self.access.restore_access();
        let sources = match &grant {
            Some(handle) => self.sources.clone().with_extra_dir(handle.path()),
            None => self.sources.clone(),
        };
        AppScanner::new(sources).scan(prefs.show_web_apps)
    }

    /// Build a fresh tree from the filesystem.
    pub fn rebuild(&self) -> MenuTree {
        let prefs = self.preferences();
        let report = self.scan_with(&prefs);
        MenuModelBuilder::new(&prefs).build(&report)
    }

    /// Open an application inside a directory-access scope.
    pub fn launch(&self, bundle_path: &Path) -> Result<()> {
        let _grant = self.access.restore_access();
        self.launcher.launch(bundle_path)
    }

    pub fn dispatch(&self, command: &MenuCommand) -> ControlFlowHint {
        match command {
            MenuCommand::Launch(path) => {
                logging::log_menu_event("launch", Some(&path.display().to_string()));
                if let Err(e) = self.launch(path) {
                    error!(app_path = %path.display(), error = %e, "Launch failed");
                }
                ControlFlowHint::Continue
            }
            MenuCommand::Refresh => {
                logging::log_menu_event("refresh", None);
                ControlFlowHint::Rebuilt(self.rebuild())
            }
            MenuCommand::Settings => {
                logging::log_menu_event("settings", None);
                ControlFlowHint::OpenSettings
            }
            MenuCommand::About => {
                logging::log_menu_event("about", None);
                ControlFlowHint::ShowAbout
            }
            MenuCommand::Quit => {
                logging::log_menu_event("quit", None);
                ControlFlowHint::Quit
            }
        }
    }

    /// React to a preference written elsewhere (CLI, watcher).
    pub fn on_preference_change(&self, key: PreferenceKey) -> PreferenceEffect {
        info!(key = %key, "Preference changed");
        match key {
            PreferenceKey::MenuBarOption => {
                PreferenceEffect::UpdateStatusLabel(self.status_label())
            }
            PreferenceKey::UserSelectedDirectory if self.access.take_renewal() => {
                debug!("Directory token renewed during rebuild, menu is current");
                PreferenceEffect::None
            }
            PreferenceKey::CaseInsensitiveAppsSorting
            | PreferenceKey::ShowWebApps
            | PreferenceKey::UserSelectedDirectory => PreferenceEffect::Rebuild(self.rebuild()),
            PreferenceKey::ListAppsFromSubDirsRecursively => PreferenceEffect::None,
        }
    }
}

/// Text for the About dialog
pub fn about_text(recent_log: &[String]) -> String {
    let mut text = format!(
        "{} {}\n\n{}\n\n{}",
        APP_NAME,
        env!("CARGO_PKG_VERSION"),
        LICENSE_NOTICE,
        CREDITS
    );
    let tail = &recent_log[recent_log.len().saturating_sub(ABOUT_LOG_TAIL)..];
    if !tail.is_empty() {
        text.push_str("\n\nRecent activity:\n");
        text.push_str(&tail.join("\n"));
    }
    text
}

/// Show the About dialog (blocks until dismissed)
pub fn show_about() {
    rfd::MessageDialog::new()
        .set_title(format!("About {}", APP_NAME))
        .set_description(about_text(&logging::recent_lines()))
        .set_level(rfd::MessageLevel::Info)
        .set_buttons(rfd::MessageButtons::Ok)
        .show();
}

/// Open the preferences file in the user's default editor.
pub fn open_settings(path: &Path) -> anyhow::Result<()> {
    use anyhow::Context;

    if !path.exists() {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create {}", parent.display()))?;
        }
        std::fs::write(path, b"{}\n")
            .with_context(|| format!("Failed to create {}", path.display()))?;
    }
    open::that_detached(path).with_context(|| format!("Failed to open {}", path.display()))
}

#[cfg(test)]
#[path = "controller_tests.rs"]
mod tests;
