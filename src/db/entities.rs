//! Table mappings for the three persisted types.

use rusqlite::types::Value;
use rusqlite::Row;

use super::dao::Entity;
use crate::models::{Book, Borrow, Member};
use crate::validators::DATE_FORMAT;

impl Entity for Book {
    const TABLE: &'static str = "books";
    const COLUMNS: &'static [&'static str] = &["title", "author", "pages"];
    const LABEL: &'static str = "book";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Book {
            id: row.get(0)?,
            title: row.get(1)?,
            author: row.get(2)?,
            pages: row.get(3)?,
        })
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.title.clone().into(),
            self.author.clone().into(),
            self.pages.into(),
        ]
    }
}

impl Entity for Member {
    const TABLE: &'static str = "members";
    const COLUMNS: &'static [&'static str] = &["name", "family"];
    const LABEL: &'static str = "member";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Member {
            id: row.get(0)?,
            name: row.get(1)?,
            family: row.get(2)?,
        })
    }

    fn values(&self) -> Vec<Value> {
        vec![self.name.clone().into(), self.family.clone().into()]
    }
}

impl Entity for Borrow {
    const TABLE: &'static str = "borrows";
    const COLUMNS: &'static [&'static str] =
        &["member_id", "book_id", "borrow_date", "return_date"];
    const LABEL: &'static str = "borrow";

    fn id(&self) -> i64 {
        self.id
    }

    fn set_id(&mut self, id: i64) {
        self.id = id;
    }

    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Borrow {
            id: row.get(0)?,
            member_id: row.get(1)?,
            book_id: row.get(2)?,
            borrow_date: row.get(3)?,
            return_date: row.get(4)?,
        })
    }

    fn values(&self) -> Vec<Value> {
        vec![
            self.member_id.into(),
            self.book_id.into(),
            self.borrow_date.format(DATE_FORMAT).to_string().into(),
            self.return_date
                .map(|date| date.format(DATE_FORMAT).to_string())
                .into(),
        ]
    }
}
