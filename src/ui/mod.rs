//! Terminal front-end: tabbed tables with side-pane forms, autocomplete
//! pickers for borrows, and report popups.

mod app;
mod autocomplete;
mod forms;
mod helpers;
mod screens;
mod terminal;

pub use app::App;
pub use terminal::run_app;
