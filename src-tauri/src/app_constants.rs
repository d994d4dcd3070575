pub(crate) const MAIN_WINDOW_LABEL: &str = "main";
pub(crate) const MAIN_WINDOW_TITLE: &str = "POSX";
pub(crate) const MAIN_WINDOW_PAGE: &str = "index.html";
pub(crate) const MAIN_WINDOW_WIDTH: f64 = 1200.0;
pub(crate) const MAIN_WINDOW_HEIGHT: f64 = 800.0;

pub(crate) const PROGRESS_WINDOW_LABEL: &str = "update-progress";
pub(crate) const PROGRESS_WINDOW_PAGE: &str = "update-progress.html";
pub(crate) const PROGRESS_WINDOW_WIDTH: f64 = 400.0;
pub(crate) const PROGRESS_WINDOW_HEIGHT: f64 = 220.0;

pub(crate) const UPDATE_PROGRESS_EVENT: &str = "update-progress";
