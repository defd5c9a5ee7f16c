//! Library manager: books, members and the borrows between them, kept in
//! SQLite and edited through a terminal UI.
//!
//! The binary only wires settings, logging and the database together; the
//! layers below are usable on their own.
pub mod config;
pub mod controller;
pub mod db;
pub mod error;
pub mod logging;
pub mod models;
pub mod ui;
pub mod validators;

pub use config::Settings;
pub use db::{open_database, open_in_memory};
pub use error::{LibraryError, LibraryResult};
pub use models::{Book, Borrow, Member};
pub use ui::{run_app, App};
