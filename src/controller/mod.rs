//! Operations the UI invokes. Each one validates its input, runs the data
//! access, and logs the outcome; errors are returned for the UI to display.

pub mod books;
pub mod borrows;
pub mod members;
pub mod reports;

use tracing::{error, warn};

use crate::error::LibraryResult;

/// Run `op`, logging a failure as a warning when it is only a missing row and
/// as an error otherwise.
fn logged<T>(action: &str, op: impl FnOnce() -> LibraryResult<T>) -> LibraryResult<T> {
    let result = op();
    if let Err(err) = &result {
        if err.is_not_found() {
            warn!(action, "{err}");
        } else {
            error!(action, "{err}");
        }
    }
    result
}
