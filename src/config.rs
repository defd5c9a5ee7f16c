//! Runtime settings. Every option can come from the command line or the
//! environment; paths fall back to a folder in the user's home directory.

use std::path::PathBuf;

use anyhow::{anyhow, Result};
use clap::Parser;
use directories::BaseDirs;

/// Folder name used beneath the user's home directory for application data.
const DATA_DIR_NAME: &str = ".library-manager";
/// SQLite file name stored inside the application data directory.
const DB_FILE_NAME: &str = "library.sqlite";
/// Log folder inside the application data directory.
const LOG_DIR_NAME: &str = "log";

#[derive(Debug, Clone, Parser)]
#[command(name = "library-manager", version, about = "Track books, members and borrows")]
pub struct Settings {
    /// SQLite database file.
    #[arg(long, env = "LIBRARY_DATABASE")]
    pub database: Option<PathBuf>,

    /// Directory that receives `library.log`.
    #[arg(long, env = "LIBRARY_LOG_DIR")]
    pub log_dir: Option<PathBuf>,

    /// Log filter (`error`, `warn`, `info`, `debug`, `trace`); `RUST_LOG`
    /// takes precedence when set.
    #[arg(long, env = "LIBRARY_LOG_LEVEL", default_value = "info")]
    pub log_level: String,
}

impl Settings {
    pub fn database_path(&self) -> Result<PathBuf> {
        match &self.database {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join(DB_FILE_NAME)),
        }
    }

    pub fn log_dir(&self) -> Result<PathBuf> {
        match &self.log_dir {
            Some(path) => Ok(path.clone()),
            None => Ok(data_dir()?.join(LOG_DIR_NAME)),
        }
    }
}

/// Resolve `~/.library-manager`.
fn data_dir() -> Result<PathBuf> {
    let base_dirs = BaseDirs::new().ok_or_else(|| anyhow!("could not locate home directory"))?;
    Ok(base_dirs.home_dir().join(DATA_DIR_NAME))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn explicit_paths_win() {
        let dir = tempfile::tempdir().unwrap();
        let db = dir.path().join("db.sqlite");
        let settings = Settings::parse_from([
            "library-manager",
            "--database",
            db.to_str().unwrap(),
            "--log-dir",
            dir.path().to_str().unwrap(),
            "--log-level",
            "debug",
        ]);
        assert_eq!(settings.database_path().unwrap(), db);
        assert_eq!(settings.log_dir().unwrap(), dir.path());
        assert_eq!(settings.log_level, "debug");
    }

    #[test]
    fn defaults_live_under_the_data_dir() {
        let settings = Settings {
            database: None,
            log_dir: None,
            log_level: "info".to_string(),
        };
        if let Ok(db) = settings.database_path() {
            assert!(db.ends_with(".library-manager/library.sqlite"));
            assert!(settings.log_dir().unwrap().ends_with(".library-manager/log"));
        }
    }
}
