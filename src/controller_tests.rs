use super::*;
use crate::bundle::fixtures::write_app;
use crate::directory_access::{BookmarkBackend, ResolvedBookmark};
use crate::launcher::recording::RecordingLauncher;
use crate::menu_model::{GroupKind, MenuAction};
use crate::preferences::{MemoryPreferenceStore, MenuBarOption, PreferenceValue};
use std::cell::Cell;
use std::path::PathBuf;
use std::rc::Rc;
use tempfile::{tempdir, TempDir};

#[derive(Default)]
struct AccessCounts {
    starts: Cell<usize>,
    stops: Cell<usize>,
}

/// Tokens are the directory path itself, or "stale:path"
struct PathBackend(Rc<AccessCounts>);

impl BookmarkBackend for PathBackend {
    fn create(&self, dir: &Path) -> Result<Vec<u8>> {
        Ok(dir.to_string_lossy().into_owned().into_bytes())
    }

    fn resolve(&self, token: &[u8]) -> Result<ResolvedBookmark> {
        let text = String::from_utf8_lossy(token).into_owned();
        Ok(match text.strip_prefix("stale:") {
            Some(path) => ResolvedBookmark::new(path, true),
            None => ResolvedBookmark::new(text, false),
        })
    }

    fn start_access(&self, _bookmark: &ResolvedBookmark) -> bool {
        self.0.starts.set(self.0.starts.get() + 1);
        true
    }

    fn stop_access(&self, _bookmark: &ResolvedBookmark) {
        self.0.stops.set(self.0.stops.get() + 1);
    }
}

struct Harness {
    store: Arc<MemoryPreferenceStore>,
    counts: Rc<AccessCounts>,
    launched: Arc<parking_lot::Mutex<Vec<PathBuf>>>,
    controller: MenuController,
    apps: TempDir,
    web: TempDir,
}

fn harness() -> Harness {
    let apps = tempdir().unwrap();
    let web = tempdir().unwrap();
    write_app(apps.path(), "Xcode", "public.app-category.developer-tools");
    write_app(apps.path(), "Safari", "public.app-category.productivity");
    write_app(web.path(), "Gmail", "");

    let store = Arc::new(MemoryPreferenceStore::new());
    let counts = Rc::new(AccessCounts::default());
    let access = DirectoryAccess::new(store.clone(), Box::new(PathBackend(counts.clone())));
    let launcher = RecordingLauncher::default();
    let launched = launcher.launched.clone();

    let controller = MenuController::new(
        store.clone(),
        access,
        ScanSources {
            base_dirs: vec![apps.path().to_path_buf()],
            web_app_dirs: vec![web.path().to_path_buf()],
        },
        Box::new(launcher),
    );

    Harness {
        store,
        counts,
        launched,
        controller,
        apps,
        web,
    }
}

fn all_titles(tree: &MenuTree) -> Vec<String> {
    tree.all_group()
        .unwrap()
        .items
        .iter()
        .map(|i| i.title.clone())
        .collect()
}

#[test]
fn test_rebuild_without_grant() {
    let h = harness();
    let tree = h.controller.rebuild();
    assert_eq!(all_titles(&tree), vec!["Safari", "Xcode"]);
    assert!(tree.web_apps_group().is_none());
    assert_eq!(h.counts.starts.get(), 0);
}

#[test]
fn test_rebuild_scans_granted_directory_and_releases_access() {
    let h = harness();
    let granted = tempdir().unwrap();
    write_app(granted.path(), "Blender", "public.app-category.graphics-design");
    h.store
        .set(
            PreferenceKey::UserSelectedDirectory,
            PreferenceValue::Data(granted.path().to_string_lossy().into_owned().into_bytes()),
        )
        .unwrap();

    let tree = h.controller.rebuild();
    assert_eq!(all_titles(&tree), vec!["Blender", "Safari", "Xcode"]);
    assert_eq!(h.counts.starts.get(), 1);
    assert_eq!(h.counts.stops.get(), 1);
}

#[test]
fn test_granted_base_directory_is_not_scanned_twice() {
    let h = harness();
    h.store
        .set(
            PreferenceKey::UserSelectedDirectory,
            PreferenceValue::Data(h.apps.path().to_string_lossy().into_owned().into_bytes()),
        )
        .unwrap();

    let tree = h.controller.rebuild();
    assert_eq!(all_titles(&tree), vec!["Safari", "Xcode"]);
}

#[test]
fn test_web_apps_preference_toggles_group() {
    let h = harness();
    h.store
        .set(PreferenceKey::ShowWebApps, PreferenceValue::Bool(true))
        .unwrap();
    let shown = h.controller.rebuild();
    let web = shown.web_apps_group().expect("web apps shown");
    assert_eq!(web.items.len(), 1);
    assert!(web.items[0].bundle_path.starts_with(h.web.path()));

    h.store
        .set(PreferenceKey::ShowWebApps, PreferenceValue::Bool(false))
        .unwrap();
    assert!(h.controller.rebuild().web_apps_group().is_none());
}

#[test]
fn test_rebuild_is_idempotent() {
    let h = harness();
    assert_eq!(h.controller.rebuild(), h.controller.rebuild());
}

#[test]
fn test_dispatch_launch_uses_launcher_inside_access_scope() {
    let h = harness();
    h.store
        .set(
            PreferenceKey::UserSelectedDirectory,
            PreferenceValue::Data(b"/Volumes/Apps".to_vec()),
        )
        .unwrap();

    let target = h.apps.path().join("Safari.app");
    let hint = h.controller.dispatch(&MenuCommand::Launch(target.clone()));

    assert_eq!(hint, ControlFlowHint::Continue);
    assert_eq!(h.launched.lock().as_slice(), &[target]);
    assert_eq!(h.counts.starts.get(), 1);
    assert_eq!(h.counts.stops.get(), 1);
}

#[test]
fn test_launch_failure_is_not_fatal() {
    let store = Arc::new(MemoryPreferenceStore::new());
    let access = DirectoryAccess::new(
        store.clone(),
        Box::new(PathBackend(Rc::new(AccessCounts::default()))),
    );
    let controller = MenuController::new(
        store,
        access,
        ScanSources {
            base_dirs: vec![],
            web_app_dirs: vec![],
        },
        Box::new(RecordingLauncher {
            fail: true,
            ..RecordingLauncher::default()
        }),
    );

    let path = PathBuf::from("/Applications/Missing.app");
    assert!(controller.launch(&path).is_err());
    assert_eq!(
        controller.dispatch(&MenuCommand::Launch(path)),
        ControlFlowHint::Continue
    );
}

#[test]
fn test_dispatch_fixed_actions() {
    let h = harness();
    assert_eq!(
        h.controller.dispatch(&MenuCommand::Settings),
        ControlFlowHint::OpenSettings
    );
    assert_eq!(
        h.controller.dispatch(&MenuCommand::About),
        ControlFlowHint::ShowAbout
    );
    assert_eq!(h.controller.dispatch(&MenuCommand::Quit), ControlFlowHint::Quit);

    match h.controller.dispatch(&MenuCommand::Refresh) {
        ControlFlowHint::Rebuilt(tree) => {
            assert_eq!(tree.groups_of(GroupKind::Category).count(), 2);
            assert!(tree
                .iter_commands()
                .any(|c| c == MenuAction::Refresh.command()));
        }
        other => panic!("expected a rebuilt tree, got {:?}", other),
    }
}

#[test]
fn test_refresh_sees_new_bundles() {
    let h = harness();
    let before = h.controller.rebuild();
    write_app(h.apps.path(), "Notes", "public.app-category.productivity");
    let after = h.controller.rebuild();
    assert_ne!(before, after);
    assert_eq!(all_titles(&after), vec!["Notes", "Safari", "Xcode"]);
}

#[test]
fn test_preference_change_effects() {
    let h = harness();
    h.store
        .set(PreferenceKey::MenuBarOption, PreferenceValue::Int(1))
        .unwrap();
    assert_eq!(
        h.controller.on_preference_change(PreferenceKey::MenuBarOption),
        PreferenceEffect::UpdateStatusLabel(StatusLabel::for_option(MenuBarOption::Icon))
    );
    assert!(matches!(
        h.controller
            .on_preference_change(PreferenceKey::CaseInsensitiveAppsSorting),
        PreferenceEffect::Rebuild(_)
    ));
    assert_eq!(
        h.controller
            .on_preference_change(PreferenceKey::ListAppsFromSubDirsRecursively),
        PreferenceEffect::None
    );
}

#[test]
fn test_own_token_renewal_does_not_trigger_rebuild() {
    let h = harness();
    let granted = tempdir().unwrap();
    write_app(granted.path(), "Blender", "public.app-category.graphics-design");
    let token = format!("stale:{}", granted.path().display());
    h.store
        .set(
            PreferenceKey::UserSelectedDirectory,
            PreferenceValue::Data(token.into_bytes()),
        )
        .unwrap();

    let tree = h.controller.rebuild();
    assert_eq!(all_titles(&tree), vec!["Blender", "Safari", "Xcode"]);
    assert_eq!(
        h.controller
            .on_preference_change(PreferenceKey::UserSelectedDirectory),
        PreferenceEffect::None
    );
    let scans_after_renewal = h.counts.starts.get();

    // A grant changed elsewhere still rebuilds
    h.store
        .set(
            PreferenceKey::UserSelectedDirectory,
            PreferenceValue::Data(h.web.path().to_string_lossy().into_owned().into_bytes()),
        )
        .unwrap();
    assert!(matches!(
        h.controller
            .on_preference_change(PreferenceKey::UserSelectedDirectory),
        PreferenceEffect::Rebuild(_)
    ));
    assert_eq!(h.counts.starts.get(), scans_after_renewal + 1);
}

#[test]
fn test_about_text() {
    let text = about_text(&[]);
    assert!(text.starts_with("App Menu "));
    assert!(text.contains(env!("CARGO_PKG_VERSION")));
    assert!(text.contains("MIT License"));
    assert!(text.contains("tabler"));
    assert!(!text.contains("Recent activity"));

    let log: Vec<String> = (0..8).map(|i| format!("line {}", i)).collect();
    let text = about_text(&log);
    assert!(text.contains("Recent activity"));
    assert!(text.contains("line 7"));
    assert!(text.contains("line 3"));
    assert!(!text.contains("line 2"));
}
