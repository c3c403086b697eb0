//! Declarative menu tree
//!
//! `MenuModelBuilder` turns a `ScanReport` into a `MenuTree`: category groups
//! in label order, an optional "Web Apps" group, an "All" group and the fixed
//! action block. The tree carries no toolkit types; every clickable entry is
//! identified by a `MenuCommand` that the presenter dispatches back.

use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use icu_collator::{Collator, CollatorOptions, Strength};
use serde::Serialize;
use tracing::warn;

use crate::bundle::{AppIcon, DiscoveredApplication};
use crate::preferences::Preferences;
use crate::scanner::ScanReport;

pub const WEB_APPS_LABEL: &str = "Web Apps";
pub const ALL_LABEL: &str = "All";

const LAUNCH_PREFIX: &str = "launch:";

/// Something the user can trigger from the menu
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "camelCase", tag = "type", content = "path")]
pub enum MenuCommand {
    Launch(PathBuf),
    Refresh,
    Settings,
    About,
    Quit,
}

impl MenuCommand {
    /// Stable string identifier, `launch:<bundle path>` for launches
    pub fn id(&self) -> String {
        match self {
            MenuCommand::Launch(path) => format!("{}{}", LAUNCH_PREFIX, path.display()),
            MenuCommand::Refresh => "refresh".to_string(),
            MenuCommand::Settings => "settings".to_string(),
            MenuCommand::About => "about".to_string(),
            MenuCommand::Quit => "quit".to_string(),
        }
    }

    /// Inverse of [`MenuCommand::id`]
    pub fn parse_id(id: &str) -> Option<Self> {
        if let Some(path) = id.strip_prefix(LAUNCH_PREFIX) {
            return (!path.is_empty()).then(|| MenuCommand::Launch(PathBuf::from(path)));
        }
        match id {
            "refresh" => Some(MenuCommand::Refresh),
            "settings" => Some(MenuCommand::Settings),
            "about" => Some(MenuCommand::About),
            "quit" => Some(MenuCommand::Quit),
            _ => None,
        }
    }
}

/// Fixed trailing actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MenuAction {
    Refresh,
    Settings,
    About,
    Quit,
}

impl MenuAction {
    pub const ALL: [MenuAction; 4] = [
        MenuAction::Refresh,
        MenuAction::Settings,
        MenuAction::About,
        MenuAction::Quit,
    ];

    pub fn title(self) -> &'static str {
        match self {
            MenuAction::Refresh => "Refresh",
            MenuAction::Settings => "Settings",
            MenuAction::About => "About",
            MenuAction::Quit => "Quit",
        }
    }

    /// Key equivalent shown next to the item (with the platform modifier)
    pub fn key_equivalent(self) -> Option<char> {
        match self {
            MenuAction::Quit => Some('q'),
            _ => None,
        }
    }

    pub fn command(self) -> MenuCommand {
        match self {
            MenuAction::Refresh => MenuCommand::Refresh,
            MenuAction::Settings => MenuCommand::Settings,
            MenuAction::About => MenuCommand::About,
            MenuAction::Quit => MenuCommand::Quit,
        }
    }
}

/// One launchable application
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuItem {
    pub title: String,
    pub bundle_path: PathBuf,
    pub icon: AppIcon,
}

impl MenuItem {
    fn from_app(app: &DiscoveredApplication) -> Self {
        Self {
            title: app.display_name.clone(),
            bundle_path: app.bundle_path.clone(),
            icon: app.icon.clone(),
        }
    }

    pub fn command(&self) -> MenuCommand {
        MenuCommand::Launch(self.bundle_path.clone())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum GroupKind {
    Category,
    WebApps,
    All,
}

/// A submenu of applications
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuGroup {
    pub label: String,
    pub kind: GroupKind,
    pub items: Vec<MenuItem>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase", tag = "type")]
pub enum MenuEntry {
    Group(MenuGroup),
    Separator,
    Action { action: MenuAction },
}

/// The complete menu, top to bottom
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MenuTree {
    pub entries: Vec<MenuEntry>,
}

impl MenuTree {
    pub fn groups(&self) -> impl Iterator<Item = &MenuGroup> {
        self.entries.iter().filter_map(|entry| match entry {
            MenuEntry::Group(group) => Some(group),
            _ => None,
        })
    }

    /// Groups of the given kind, in menu order
    pub fn groups_of(&self, kind: GroupKind) -> impl Iterator<Item = &MenuGroup> {
        self.groups().filter(move |group| group.kind == kind)
    }

    pub fn all_group(&self) -> Option<&MenuGroup> {
        self.groups_of(GroupKind::All).next()
    }

    pub fn web_apps_group(&self) -> Option<&MenuGroup> {
        self.groups_of(GroupKind::WebApps).next()
    }

    /// Every command reachable from the tree, in menu order
    pub fn iter_commands(&self) -> impl Iterator<Item = MenuCommand> + '_ {
        self.entries.iter().flat_map(|entry| -> Vec<MenuCommand> {
            match entry {
                MenuEntry::Group(group) => group.items.iter().map(MenuItem::command).collect(),
                MenuEntry::Separator => Vec::new(),
                MenuEntry::Action { action } => vec![action.command()],
            }
        })
    }
}

/// Display-name comparator
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    /// Byte order; uppercase sorts before lowercase
    #[default]
    Ordinal,
    CaseInsensitive,
}

impl SortOrder {
    pub fn from_case_insensitive(enabled: bool) -> Self {
        if enabled {
            SortOrder::CaseInsensitive
        } else {
            SortOrder::Ordinal
        }
    }
}

/// A `SortOrder` made ready for one build
enum NameComparator {
    Ordinal,
    /// Root-locale collation at secondary strength: accents count, case does not
    Collated(Collator),
    /// Used only if collation data cannot be loaded
    Lowercase,
}

impl NameComparator {
    fn new(order: SortOrder) -> Self {
        match order {
            SortOrder::Ordinal => NameComparator::Ordinal,
            SortOrder::CaseInsensitive => {
                let mut options = CollatorOptions::new();
                options.strength = Some(Strength::Secondary);
                match Collator::try_new(&Default::default(), options) {
                    Ok(collator) => NameComparator::Collated(collator),
                    Err(e) => {
                        warn!(error = ?e, "Collator unavailable, falling back to lowercase order");
                        NameComparator::Lowercase
                    }
                }
            }
        }
    }

    fn compare(&self, a: &str, b: &str) -> Ordering {
        match self {
            NameComparator::Ordinal => a.cmp(b),
            NameComparator::Collated(collator) => collator.compare(a, b),
            NameComparator::Lowercase => a.to_lowercase().cmp(&b.to_lowercase()),
        }
    }

    /// Stable: equal names keep discovery order
    fn sort(&self, items: &mut [MenuItem]) {
        items.sort_by(|a, b| self.compare(&a.title, &b.title));
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Ordinal => write!(f, "ordinal"),
            SortOrder::CaseInsensitive => write!(f, "case-insensitive"),
        }
    }
}

/// Builds a `MenuTree` from scan results
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct MenuModelBuilder {
    pub sort_order: SortOrder,
    pub show_web_apps: bool,
}

impl MenuModelBuilder {
    pub fn new(prefs: &Preferences) -> Self {
        Self {
            sort_order: SortOrder::from_case_insensitive(prefs.case_insensitive_sorting),
            show_web_apps: prefs.show_web_apps,
        }
    }

    pub fn build(&self, report: &ScanReport) -> MenuTree {
        let mut entries = Vec::new();
        let names = NameComparator::new(self.sort_order);

        // Keyed by humanized label so categories that humanize alike merge
        let mut by_label: BTreeMap<String, Vec<MenuItem>> = BTreeMap::new();
        for app in &report.primary {
            by_label
                .entry(app.category_label())
                .or_default()
                .push(MenuItem::from_app(app));
        }

        for (label, mut items) in by_label {
            names.sort(&mut items);
            entries.push(MenuEntry::Group(MenuGroup {
                label,
                kind: GroupKind::Category,
                items,
            }));
        }

        if self.show_web_apps && !report.web_apps.is_empty() {
            entries.push(MenuEntry::Separator);
            entries.push(MenuEntry::Group(flat_group(
                &names,
                WEB_APPS_LABEL,
                GroupKind::WebApps,
                &report.web_apps,
            )));
        }

        entries.push(MenuEntry::Separator);
        entries.push(MenuEntry::Group(flat_group(
            &names,
            ALL_LABEL,
            GroupKind::All,
            &report.primary,
        )));

        entries.push(MenuEntry::Separator);
        entries.extend(
            MenuAction::ALL
                .iter()
                .map(|&action| MenuEntry::Action { action }),
        );

        MenuTree { entries }
    }
}

fn flat_group(
    names: &NameComparator,
    label: &str,
    kind: GroupKind,
    apps: &[DiscoveredApplication],
) -> MenuGroup {
    let mut items: Vec<MenuItem> = apps.iter().map(MenuItem::from_app).collect();
    names.sort(&mut items);
    MenuGroup {
        label: label.to_string(),
        kind,
        items,
    }
}

#[cfg(test)]
#[path = "menu_model_tests.rs"]
mod tests;
