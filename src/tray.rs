//! Status bar presenter for App Menu
//!
//! Renders a `MenuTree` into a `tray-icon` menu. Every clickable item gets
//! the string id of its `MenuCommand`, so a `MenuEvent` maps straight back
//! to the command without a lookup table.

use std::collections::HashMap;
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing::debug;
use tray_icon::{
    menu::{
        accelerator::{Accelerator, Code, Modifiers},
        Icon as MenuIcon, IconMenuItem, Menu, MenuEvent, MenuId, MenuItem as NativeMenuItem,
        PredefinedMenuItem, Submenu,
    },
    Icon, TrayIcon, TrayIconBuilder,
};

use crate::menu_model::{MenuAction, MenuCommand, MenuEntry, MenuGroup, MenuItem, MenuTree};
use crate::platform;
use crate::status_item::{RasterIcon, StatusLabel, MENU_ICON_SIZE};

/// Owns the status bar item
pub struct TrayPresenter {
    tray_icon: TrayIcon,
}

impl TrayPresenter {
    /// Creates the status item showing `label` with `tree` as its menu
    ///
    /// # Errors
    /// Returns an error if the status icon cannot be rendered or the
    /// status item cannot be created.
    pub fn new(label: StatusLabel, tree: &MenuTree) -> Result<Self> {
        let menu = build_menu(tree)?;

        let mut builder = TrayIconBuilder::new()
            .with_tooltip(crate::controller::APP_NAME)
            .with_menu(Box::new(menu))
            .with_icon_as_template(true); // macOS: adapt to light/dark menu bar

        if let Some(title) = label.title {
            builder = builder.with_title(title);
        }
        if label.show_icon {
            builder = builder.with_icon(status_icon()?);
        }

        let tray_icon = builder.build().context("Failed to create tray icon")?;
        Ok(Self { tray_icon })
    }

    /// Re-render title and icon after `menuBarOption` changes
    pub fn apply_label(&self, label: StatusLabel) -> Result<()> {
        let icon = if label.show_icon {
            Some(status_icon()?)
        } else {
            None
        };
        self.tray_icon
            .set_icon(icon)
            .context("Failed to update status icon")?;
        #[cfg(target_os = "macos")]
        self.tray_icon.set_icon_as_template(true);
        self.tray_icon.set_title(label.title);
        debug!(title = ?label.title, icon = label.show_icon, "Status label applied");
        Ok(())
    }

    /// Replace the whole menu
    pub fn set_menu(&self, tree: &MenuTree) -> Result<()> {
        let menu = build_menu(tree)?;
        self.tray_icon.set_menu(Some(Box::new(menu)));
        Ok(())
    }

    /// The command a menu click refers to
    pub fn command_for(event: &MenuEvent) -> Option<MenuCommand> {
        MenuCommand::parse_id(&event.id.0)
    }
}

fn status_icon() -> Result<Icon> {
    let raster = RasterIcon::status_icon()?;
    Icon::from_rgba(raster.rgba, raster.width, raster.height)
        .context("Failed to create icon from RGBA data")
}

/// Application icons, rasterised once per bundle per build
#[derive(Default)]
struct IconCache {
    icons: HashMap<PathBuf, Option<MenuIcon>>,
}

impl IconCache {
    fn icon_for(&mut self, item: &MenuItem) -> Option<MenuIcon> {
        self.icons
            .entry(item.bundle_path.clone())
            .or_insert_with(|| {
                let png = platform::icon_png(&item.icon, &item.bundle_path, MENU_ICON_SIZE)?;
                let raster = RasterIcon::from_png(&png).ok()?;
                MenuIcon::from_rgba(raster.rgba, raster.width, raster.height).ok()
            })
            .clone()
    }
}

fn build_menu(tree: &MenuTree) -> Result<Menu> {
    let menu = Menu::new();
    let mut icons = IconCache::default();

    for entry in &tree.entries {
        match entry {
            MenuEntry::Group(group) => {
                let submenu = build_group(group, &mut icons)?;
                menu.append(&submenu)
                    .with_context(|| format!("Failed to add group {}", group.label))?;
            }
            MenuEntry::Separator => {
                menu.append(&PredefinedMenuItem::separator())
                    .context("Failed to add separator")?;
            }
            MenuEntry::Action { action } => {
                menu.append(&action_item(*action))
                    .with_context(|| format!("Failed to add {} item", action.title()))?;
            }
        }
    }

    Ok(menu)
}

fn build_group(group: &MenuGroup, icons: &mut IconCache) -> Result<Submenu> {
    let submenu = Submenu::new(&group.label, true);
    for item in &group.items {
        let native = IconMenuItem::with_id(
            MenuId::new(item.command().id()),
            &item.title,
            true,
            icons.icon_for(item),
            None,
        );
        submenu
            .append(&native)
            .with_context(|| format!("Failed to add {}", item.title))?;
    }
    Ok(submenu)
}

fn action_item(action: MenuAction) -> NativeMenuItem {
    let accelerator = action
        .key_equivalent()
        .and_then(key_code)
        .map(|code| Accelerator::new(Some(Modifiers::SUPER), code));
    NativeMenuItem::with_id(
        MenuId::new(action.command().id()),
        action.title(),
        true,
        accelerator,
    )
}

fn key_code(key: char) -> Option<Code> {
    match key.to_ascii_lowercase() {
        'q' => Some(Code::KeyQ),
        _ => None,
    }
}
