//! Error type shared by the validation, persistence and controller layers.
//! The terminal front-end converts these into `anyhow` errors and only ever
//! shows the message text, so every variant carries a sentence that reads
//! well in the status bar.

use thiserror::Error;

/// Everything that can go wrong below the UI.
#[derive(Error, Debug)]
pub enum LibraryError {
    /// A field failed its validator or a form value could not be parsed.
    #[error("{0}")]
    Validation(String),

    /// The requested row does not exist.
    #[error("{0}")]
    NotFound(String),

    /// A row could not be deleted because borrows still reference it.
    #[error("{0}")]
    InUse(String),

    /// The change would break a library rule (for example lending a book
    /// that is already out).
    #[error("{0}")]
    Conflict(String),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

pub type LibraryResult<T> = Result<T, LibraryError>;

impl LibraryError {
    pub(crate) fn validation(message: impl Into<String>) -> Self {
        LibraryError::Validation(message.into())
    }

    pub(crate) fn not_found(message: impl Into<String>) -> Self {
        LibraryError::NotFound(message.into())
    }

    /// Whether the error is a "no such row" outcome rather than a failure.
    pub fn is_not_found(&self) -> bool {
        matches!(self, LibraryError::NotFound(_))
    }
}
