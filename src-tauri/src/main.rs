#![cfg_attr(not(debug_assertions), windows_subsystem = "windows")]

mod app_constants;
mod app_helpers;
mod app_runtime;
mod app_types;
mod desktop_bridge_commands;
mod dialog_ui;
mod exit_events;
mod menu_actions;
mod menu_handler;
mod menu_setup;
mod shell_host;
mod updater_channel;
mod window_actions;

pub(crate) use app_constants::*;
pub(crate) use app_helpers::{
    append_desktop_log, append_shutdown_log, append_startup_error, append_startup_log,
    append_update_log,
};
pub(crate) use app_types::{AppInfo, BridgeResult, MenuState};

fn main() {
    app_runtime::run();
}
