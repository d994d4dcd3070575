pub const MENU_CHECK_FOR_UPDATES: &str = "menu_check_for_updates";
pub const MENU_TOGGLE_AUTO_UPDATE_CHECK: &str = "menu_toggle_auto_update_check";
pub const MENU_VIEW_LOGS: &str = "menu_view_logs";
pub const MENU_QUIT: &str = "menu_quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MenuAction {
    CheckForUpdates,
    ToggleAutoUpdateCheck,
    ViewLogs,
    Quit,
}

pub fn action_from_menu_id(menu_id: &str) -> Option<MenuAction> {
    match menu_id {
        MENU_CHECK_FOR_UPDATES => Some(MenuAction::CheckForUpdates),
        MENU_TOGGLE_AUTO_UPDATE_CHECK => Some(MenuAction::ToggleAutoUpdateCheck),
        MENU_VIEW_LOGS => Some(MenuAction::ViewLogs),
        MENU_QUIT => Some(MenuAction::Quit),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn action_from_menu_id_maps_all_known_actions() {
        assert_eq!(
            action_from_menu_id(MENU_CHECK_FOR_UPDATES),
            Some(MenuAction::CheckForUpdates)
        );
        assert_eq!(
            action_from_menu_id(MENU_TOGGLE_AUTO_UPDATE_CHECK),
            Some(MenuAction::ToggleAutoUpdateCheck)
        );
        assert_eq!(
            action_from_menu_id(MENU_VIEW_LOGS),
            Some(MenuAction::ViewLogs)
        );
        assert_eq!(action_from_menu_id(MENU_QUIT), Some(MenuAction::Quit));
    }

    #[test]
    fn action_from_menu_id_returns_none_for_unknown_menu_id() {
        assert_eq!(action_from_menu_id("unknown-menu"), None);
        assert_eq!(action_from_menu_id(""), None);
    }
}
