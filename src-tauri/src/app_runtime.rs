use std::sync::Arc;

use posx_shell_core::{
    init_logging, runtime_paths, AppShell, ShellConfig, ShellError, UpdateCoordinator,
    UpdateHandle,
};
use tauri::{webview::PageLoadEvent, AppHandle, Manager, RunEvent, WindowEvent};

use crate::{
    append_desktop_log, append_startup_error, append_startup_log, append_update_log,
    dialog_ui::DialogUpdateUi, exit_events, menu_handler, shell_host::TauriShellHost,
    updater_channel::TauriUpdateChannel, window_actions, PROGRESS_WINDOW_LABEL,
};

pub(crate) fn run() {
    let config = ShellConfig::from_env();
    let log_dir = match &config {
        Ok(config) => config.log_dir.clone(),
        Err(_) => runtime_paths::default_log_dir(),
    };
    if let Err(error) = init_logging(log_dir.as_deref()) {
        eprintln!("failed to initialize logging: {error}");
    }
    let config = match config {
        Ok(config) => config,
        Err(error) => {
            append_startup_error(&format!("invalid configuration: {error}"));
            std::process::exit(1);
        }
    };

    append_startup_log(&format!(
        "desktop process starting: mode={:?} backend={}:{}",
        config.mode, config.backend_host, config.backend_port
    ));

    let app = tauri::Builder::default()
        .plugin(tauri_plugin_single_instance::init(|app_handle, _args, _cwd| {
            append_desktop_log("second instance launched, focusing main window");
            window_actions::show_main_window(app_handle, append_desktop_log);
        }))
        .plugin(tauri_plugin_updater::Builder::new().build())
        .plugin(tauri_plugin_dialog::init())
        .invoke_handler(tauri::generate_handler![
            crate::desktop_bridge_commands::save_user_data,
            crate::desktop_bridge_commands::get_user_data,
            crate::desktop_bridge_commands::delete_user_data,
            crate::desktop_bridge_commands::manual_check_update,
            crate::desktop_bridge_commands::cancel_download,
            crate::desktop_bridge_commands::get_app_info,
        ])
        .on_menu_event(|app_handle, event| {
            menu_handler::handle_menu_event(app_handle, event.id().as_ref());
        })
        .on_page_load(|webview, payload| {
            if !matches!(payload.event(), PageLoadEvent::Finished)
                || webview.label() != PROGRESS_WINDOW_LABEL
            {
                return;
            }
            let app_handle = webview.app_handle();
            window_actions::reveal_progress_window(app_handle, append_update_log);
            if let Some(updates) = update_handle(app_handle) {
                updates.surface_ready();
            }
        })
        .on_window_event(|window, event| {
            if window.label() != PROGRESS_WINDOW_LABEL {
                return;
            }
            if let WindowEvent::Destroyed = event {
                append_update_log("progress window closed");
                if let Some(updates) = update_handle(window.app_handle()) {
                    updates.surface_closed();
                }
            }
        })
        .setup(move |app| {
            let app_handle = app.handle().clone();
            let resource_dir = app.path().resource_dir().ok();
            let shell = AppShell::new(config, resource_dir.as_deref())?;

            let (coordinator, updates) = UpdateCoordinator::new(
                Arc::new(TauriUpdateChannel::new(app_handle.clone())),
                Arc::new(DialogUpdateUi::new(app_handle.clone())),
            );
            tauri::async_runtime::spawn(coordinator.run());
            app.manage(shell.with_updates(updates));

            tauri::async_runtime::spawn(async move {
                let shell = app_handle.state::<AppShell>();
                let host = TauriShellHost::new(app_handle.clone());
                match shell.launch(&host).await {
                    Ok(()) => append_startup_log("desktop shell ready"),
                    Err(ShellError::Aborted) => {
                        append_startup_log("startup aborted: application is shutting down");
                    }
                    Err(error) => {
                        append_startup_error(&format!("startup failed: {error}"));
                        app_handle.exit(1);
                    }
                }
            });
            Ok(())
        })
        .build(tauri::generate_context!());

    let app = match app {
        Ok(app) => app,
        Err(error) => {
            append_startup_error(&format!("failed to build tauri application: {error}"));
            std::process::exit(1);
        }
    };

    app.run(|app_handle, event| match event {
        RunEvent::ExitRequested { code, api, .. } => {
            exit_events::handle_exit_requested(app_handle, code, &api);
        }
        RunEvent::Exit => exit_events::handle_exit_event(app_handle),
        #[cfg(target_os = "macos")]
        RunEvent::Reopen {
            has_visible_windows: false,
            ..
        } => {
            if let Err(error) = window_actions::create_main_window(app_handle, append_desktop_log)
            {
                append_desktop_log(&format!("failed to reopen main window: {error}"));
            }
        }
        _ => {}
    });
}

fn update_handle(app_handle: &AppHandle) -> Option<UpdateHandle> {
    app_handle
        .try_state::<AppShell>()
        .and_then(|shell| shell.updates().cloned())
}
