//! Domain models that mirror the SQLite schema and get passed throughout the
//! TUI. Constructors validate every field so a value of these types is always
//! something the database is allowed to hold; the id stays `0` until the row
//! has been saved.

use std::fmt;

use chrono::NaiveDate;

use crate::error::LibraryResult;
use crate::validators::{amount_validator, name_validator, title_validator, DATE_FORMAT};

/// A catalog item.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Book {
    /// Primary key, `0` for a book that has not been saved yet.
    pub id: i64,
    pub title: String,
    pub author: String,
    pub pages: i64,
}

impl Book {
    /// Build an unsaved book, validating title, author and page count.
    pub fn new(title: &str, author: &str, pages: i64) -> LibraryResult<Self> {
        Ok(Self {
            id: 0,
            title: title_validator(title, "Invalid book title!")?,
            author: name_validator(author, "Invalid author name!")?,
            pages: amount_validator(pages, "Invalid pages number!")?,
        })
    }

    /// Attach the primary key of an existing row (edit flows).
    pub fn with_id(mut self, id: i64) -> LibraryResult<Self> {
        self.id = amount_validator(id, "Invalid id!")?;
        Ok(self)
    }

    /// `"{id}-{title} by {author}"`, the text offered by the borrow form's
    /// autocomplete list.
    pub fn choice_label(&self) -> String {
        format!("{}-{} by {}", self.id, self.title, self.author)
    }

    /// Cell values in table column order.
    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.title.clone(),
            self.author.clone(),
            self.pages.to_string(),
        ]
    }
}

impl fmt::Display for Book {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} by {}", self.title, self.author)
    }
}

/// A library patron.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Member {
    pub id: i64,
    /// Given name.
    pub name: String,
    /// Family name, also used for the family-name lookup.
    pub family: String,
}

impl Member {
    pub fn new(name: &str, family: &str) -> LibraryResult<Self> {
        Ok(Self {
            id: 0,
            name: name_validator(name, "Invalid name!")?,
            family: name_validator(family, "Invalid family!")?,
        })
    }

    pub fn with_id(mut self, id: i64) -> LibraryResult<Self> {
        self.id = amount_validator(id, "Invalid id!")?;
        Ok(self)
    }

    /// `"{id}-{name} {family}"` for the borrow form's autocomplete list.
    pub fn choice_label(&self) -> String {
        format!("{}-{} {}", self.id, self.name, self.family)
    }

    pub fn to_row(&self) -> Vec<String> {
        vec![self.id.to_string(), self.name.clone(), self.family.clone()]
    }
}

impl fmt::Display for Member {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} {}", self.name, self.family)
    }
}

/// A member taking a book home. `return_date` stays `None` until the book
/// comes back, which is what every "currently borrowed" query keys on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Borrow {
    pub id: i64,
    pub member_id: i64,
    pub book_id: i64,
    pub borrow_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
}

impl Borrow {
    /// Build an unsaved borrow. Existence of the member and book is checked by
    /// the borrow controller, which has a connection to look them up.
    pub fn new(
        member_id: i64,
        book_id: i64,
        borrow_date: NaiveDate,
        return_date: Option<NaiveDate>,
    ) -> LibraryResult<Self> {
        Ok(Self {
            id: 0,
            member_id: amount_validator(member_id, "Invalid member id !")?,
            book_id: amount_validator(book_id, "Invalid book id !")?,
            borrow_date,
            return_date,
        })
    }

    pub fn with_id(mut self, id: i64) -> LibraryResult<Self> {
        self.id = amount_validator(id, "Invalid borrow id !")?;
        Ok(self)
    }

    pub fn is_returned(&self) -> bool {
        self.return_date.is_some()
    }

    pub fn to_row(&self) -> Vec<String> {
        vec![
            self.id.to_string(),
            self.member_id.to_string(),
            self.book_id.to_string(),
            format_date(Some(self.borrow_date)),
            format_date(self.return_date),
        ]
    }
}

/// Render an optional date the way tables show it (`-` when absent).
pub fn format_date(date: Option<NaiveDate>) -> String {
    date.map(|d| d.format(DATE_FORMAT).to_string())
        .unwrap_or_else(|| "-".to_string())
}
