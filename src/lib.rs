//! App Menu - a menu bar launcher for installed applications
//!
//! Scans the standard application directories, groups what it finds by
//! declared category and presents the result as a status bar menu.
//!
//! The pipeline is data-first: `scanner` produces a `ScanReport`,
//! `menu_model` turns it into a declarative `MenuTree`, and `tray` renders
//! that tree. `controller` ties the steps together and dispatches menu
//! commands.

pub mod bundle;
pub mod cli;
pub mod controller;
pub mod directory_access;
pub mod error;
pub mod humanize;
pub mod launcher;
pub mod logging;
pub mod menu_model;
pub mod platform;
pub mod preferences;
pub mod scanner;
pub mod status_item;
#[cfg(not(test))]
pub mod tray;
