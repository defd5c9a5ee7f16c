//! Persistence module split across logical submodules.

mod connection;
mod dao;
mod entities;
pub mod reports;

pub use connection::{ensure_schema, open_database, open_in_memory};
pub use dao::{Dao, Entity};
pub use reports::{run_report, ReportKind, ReportTable};
