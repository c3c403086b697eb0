use std::io;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tao::event::{Event, StartCause};
use tao::event_loop::{ControlFlow, EventLoopBuilder, EventLoopProxy};
use tracing::{error, info, warn};
use tray_icon::menu::MenuEvent;

use app_menu::cli::{self, Cli, Command};
use app_menu::controller::{self, ControlFlowHint, MenuController, PreferenceEffect};
use app_menu::directory_access::DialogPicker;
use app_menu::error::ResultExt;
use app_menu::logging;
use app_menu::menu_model::MenuCommand;
use app_menu::preferences::watcher::PreferencesWatcher;
use app_menu::preferences::{JsonPreferenceStore, PreferenceKey, PreferenceStore};
use app_menu::tray::TrayPresenter;

/// Events forwarded into the main-thread event loop
#[derive(Debug, Clone)]
enum UserEvent {
    Menu(MenuCommand),
    PreferenceChanged(PreferenceKey),
}

fn main() {
    let _log_guard = logging::init();
    let cli = Cli::parse();

    if let Err(e) = run(cli) {
        error!(error = %e, "Fatal error");
        eprintln!("error: {:#}", e);
        std::process::exit(1);
    }
}

fn run(cli: Cli) -> Result<()> {
    let store = Arc::new(JsonPreferenceStore::open_default());

    match cli.command.unwrap_or(Command::Run) {
        Command::Run => run_menu_bar(store),
        Command::Scan { json } => {
            let controller = MenuController::native(store);
            cli::run_scan(&controller, json, &mut io::stdout().lock())
        }
        Command::Config { action } => {
            let path = store.path().to_path_buf();
            cli::run_config(store.as_ref(), &path, &action, &mut io::stdout().lock())
        }
        Command::Access { action } => {
            let controller = MenuController::native(store);
            cli::run_access(
                controller.access(),
                &DialogPicker,
                &action,
                &mut io::stdout().lock(),
            )
        }
    }
}

fn run_menu_bar(store: Arc<JsonPreferenceStore>) -> Result<()> {
    info!(
        event_type = "app_lifecycle",
        version = env!("CARGO_PKG_VERSION"),
        "Starting App Menu"
    );

    #[allow(unused_mut)]
    let mut event_loop = EventLoopBuilder::<UserEvent>::with_user_event().build();

    // No Dock icon and no app menu; the status item is the whole UI
    #[cfg(target_os = "macos")]
    {
        use tao::platform::macos::{ActivationPolicy, EventLoopExtMacOS};
        event_loop.set_activation_policy(ActivationPolicy::Accessory);
    }

    let proxy = event_loop.create_proxy();
    forward_menu_events(proxy.clone());
    forward_preference_changes(store.as_ref(), proxy);

    let mut watcher = PreferencesWatcher::new(store.clone());
    if let Err(e) = watcher.start() {
        warn!(error = %e, "Preferences watcher unavailable, external edits need a restart");
    }

    let preferences_path = store.path().to_path_buf();
    let controller = MenuController::native(store);
    let mut presenter: Option<TrayPresenter> = None;

    event_loop.run(move |event, _, control_flow| {
        *control_flow = ControlFlow::Wait;
        // Keeps the watcher thread's store alive for the life of the loop
        let _ = &watcher;

        match event {
            Event::NewEvents(StartCause::Init) => {
                // The status item must be created once the loop is running
                let tree = controller.rebuild();
                match TrayPresenter::new(controller.status_label(), &tree) {
                    Ok(tray) => {
                        presenter = Some(tray);
                        info!(event_type = "app_lifecycle", "Menu bar item created");
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to create menu bar item");
                        *control_flow = ControlFlow::Exit;
                    }
                }
            }
            Event::UserEvent(UserEvent::Menu(command)) => match controller.dispatch(&command) {
                ControlFlowHint::Continue => {}
                ControlFlowHint::Rebuilt(tree) => {
                    if let Some(tray) = &presenter {
                        tray.set_menu(&tree).log_err();
                    }
                }
                ControlFlowHint::OpenSettings => {
                    controller::open_settings(&preferences_path).log_err();
                }
                ControlFlowHint::ShowAbout => controller::show_about(),
                ControlFlowHint::Quit => {
                    info!(event_type = "app_lifecycle", "Quit requested");
                    presenter.take();
                    *control_flow = ControlFlow::Exit;
                }
            },
            Event::UserEvent(UserEvent::PreferenceChanged(key)) => {
                let Some(tray) = &presenter else {
                    return;
                };
                match controller.on_preference_change(key) {
                    PreferenceEffect::None => {}
                    PreferenceEffect::UpdateStatusLabel(label) => {
                        tray.apply_label(label).log_err();
                    }
                    PreferenceEffect::Rebuild(tree) => {
                        tray.set_menu(&tree).log_err();
                    }
                }
            }
            _ => {}
        }
    })
}

/// Menu clicks arrive on the toolkit's callback; hand them to the loop.
fn forward_menu_events(proxy: EventLoopProxy<UserEvent>) {
    MenuEvent::set_event_handler(Some(move |event: MenuEvent| {
        match TrayPresenter::command_for(&event) {
            Some(command) => {
                let _ = proxy.send_event(UserEvent::Menu(command));
            }
            None => warn!(id = %event.id.0, "Menu event with unknown id"),
        }
    }));
}

fn forward_preference_changes(store: &dyn PreferenceStore, proxy: EventLoopProxy<UserEvent>) {
    let changes = store.subscribe();
    let spawned = std::thread::Builder::new()
        .name("preference-changes".into())
        .spawn(move || {
            while let Ok(change) = changes.recv_blocking() {
                if proxy
                    .send_event(UserEvent::PreferenceChanged(change.key))
                    .is_err()
                {
                    break;
                }
            }
        })
        .context("Failed to spawn preference listener");
    if let Err(e) = spawned {
        warn!(error = %e, "Preference changes will not update the menu");
    }
}
