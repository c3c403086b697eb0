//! Launching applications with the OS default handler

use std::path::Path;

use tracing::info;

use crate::error::{AppMenuError, Result};

/// Opens an application bundle
pub trait Launcher: Send + Sync {
    fn launch(&self, bundle_path: &Path) -> Result<()>;
}

/// Launches through the platform's "open" operation without waiting for
/// the application to exit
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemLauncher;

impl Launcher for SystemLauncher {
    fn launch(&self, bundle_path: &Path) -> Result<()> {
        info!(app_path = %bundle_path.display(), "Launching application");

        open::that_detached(bundle_path).map_err(|e| AppMenuError::Launch {
            path: bundle_path.to_path_buf(),
            reason: e.to_string(),
        })
    }
}
