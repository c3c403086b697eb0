use notify::{recommended_watcher, RecursiveMode, Result as NotifyResult, Watcher};
use std::path::{Path, PathBuf};
use std::sync::mpsc::{channel, RecvTimeoutError};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use tracing::{debug, info, warn};

use super::store::JsonPreferenceStore;

/// Quiet period after the last file event before reloading
const DEBOUNCE: Duration = Duration::from_millis(250);

/// Watches the preferences file and reloads the store on external edits.
///
/// Reloading goes through `JsonPreferenceStore::reload`, so subscribers
/// see one `PreferenceChange` per key that actually changed. Writes made
/// by this process produce no extra notifications because the in-memory
/// state already matches the file.
pub struct PreferencesWatcher {
    store: Arc<JsonPreferenceStore>,
    watcher_thread: Option<thread::JoinHandle<()>>,
}

impl PreferencesWatcher {
    pub fn new(store: Arc<JsonPreferenceStore>) -> Self {
        Self {
            store,
            watcher_thread: None,
        }
    }

    /// Start watching in a background thread.
    pub fn start(&mut self) -> NotifyResult<()> {
        if self.watcher_thread.is_some() {
            return Err(std::io::Error::other("watcher already started").into());
        }

        let store = Arc::clone(&self.store);
        let watch_dir = store
            .path()
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_else(|| PathBuf::from("."));
        // notify refuses to watch a directory that does not exist yet
        std::fs::create_dir_all(&watch_dir)?;

        let thread_handle = thread::Builder::new()
            .name("preferences-watcher".into())
            .spawn(move || {
                if let Err(e) = Self::watch_loop(store, watch_dir) {
                    warn!(error = %e, watcher = "preferences", "Preferences watcher error");
                }
            })?;

        self.watcher_thread = Some(thread_handle);
        Ok(())
    }

    fn watch_loop(store: Arc<JsonPreferenceStore>, watch_dir: PathBuf) -> NotifyResult<()> {
        let file_name = store.path().file_name().map(|n| n.to_os_string());

        let (watch_tx, watch_rx) = channel();
        let mut watcher: Box<dyn Watcher> = Box::new(recommended_watcher(
            move |res: notify::Result<notify::Event>| {
                let _ = watch_tx.send(res);
            },
        )?);
        watcher.watch(&watch_dir, RecursiveMode::NonRecursive)?;

        info!(
            path = %watch_dir.display(),
            target = ?file_name,
            "Preferences watcher started"
        );

        let is_relevant = |event: &notify::Event| {
            let touches_file = event
                .paths
                .iter()
                .any(|path| path.file_name().map(|n| n.to_os_string()) == file_name);
            let is_write = matches!(
                event.kind,
                notify::EventKind::Create(_)
                    | notify::EventKind::Modify(_)
                    | notify::EventKind::Remove(_)
            );
            touches_file && is_write
        };

        let mut pending = false;
        loop {
            let timeout = if pending { DEBOUNCE } else { Duration::from_secs(3600) };
            match watch_rx.recv_timeout(timeout) {
                Ok(Ok(event)) => {
                    if is_relevant(&event) {
                        debug!(kind = ?event.kind, "Preferences file event");
                        pending = true;
                    }
                }
                Ok(Err(e)) => {
                    warn!(error = %e, watcher = "preferences", "File watcher error");
                }
                Err(RecvTimeoutError::Timeout) => {
                    if pending {
                        pending = false;
                        match store.reload() {
                            Ok(changed) => {
                                debug!(changed = changed.len(), "Preferences file changed")
                            }
                            Err(e) => {
                                warn!(error = %e, "Failed to reload preferences after edit")
                            }
                        }
                    }
                }
                Err(RecvTimeoutError::Disconnected) => {
                    info!(watcher = "preferences", "Preferences watcher shutting down");
                    break;
                }
            }
        }

        Ok(())
    }
}
