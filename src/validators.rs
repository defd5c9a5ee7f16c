//! Field validators applied before anything is written to the database.
//! Each validator takes the message to report on failure so callers can say
//! which field was wrong ("Invalid author name!" rather than "Invalid name").

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use crate::error::{LibraryError, LibraryResult};

/// Date format used by forms, the database and every report.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

fn name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z\s\.]{2,30}$").expect("valid name regex"))
}

fn title_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-zA-Z0-9\s]{2,30}$").expect("valid title regex"))
}

/// Person names: letters, spaces and dots, 2 to 30 characters.
pub fn name_validator(name: &str, message: &str) -> LibraryResult<String> {
    if name_pattern().is_match(name) {
        Ok(name.to_string())
    } else {
        Err(LibraryError::validation(message))
    }
}

/// Book titles: letters, digits and spaces, 2 to 30 characters.
pub fn title_validator(title: &str, message: &str) -> LibraryResult<String> {
    if title_pattern().is_match(title) {
        Ok(title.to_string())
    } else {
        Err(LibraryError::validation(message))
    }
}

/// Strictly positive integers (ids, page counts).
pub fn amount_validator(amount: i64, message: &str) -> LibraryResult<i64> {
    if amount > 0 {
        Ok(amount)
    } else {
        Err(LibraryError::validation(message))
    }
}

/// Parse a `YYYY-MM-DD` string into a date.
pub fn date_validator(input: &str, message: &str) -> LibraryResult<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT).map_err(|err| {
        LibraryError::validation(format!(
            "{message} Invalid date format! Use YYYY-MM-DD. {err}"
        ))
    })
}
