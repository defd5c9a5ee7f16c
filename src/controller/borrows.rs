use chrono::NaiveDate;
use rusqlite::Connection;
use tracing::info;

use super::logged;
use crate::db::Dao;
use crate::error::{LibraryError, LibraryResult};
use crate::models::{Book, Borrow, Member};

/// Lend `book_id` to `member_id`. Both must exist, the return date (if any)
/// cannot precede the borrow date, and a book that is still out cannot be
/// lent again.
pub fn add_borrow(
    conn: &Connection,
    member_id: i64,
    book_id: i64,
    borrow_date: NaiveDate,
    return_date: Option<NaiveDate>,
) -> LibraryResult<Borrow> {
    logged("add borrow", || {
        let borrow = checked_borrow(conn, member_id, book_id, borrow_date, return_date, None)?;
        let borrow = Dao::<Borrow>::new(conn).save(borrow)?;
        info!(id = borrow.id, member_id, book_id, "borrow saved");
        Ok(borrow)
    })
}

/// Replace every field of borrow `id`; setting `return_date` is how a return
/// is recorded.
pub fn edit_borrow(
    conn: &Connection,
    id: i64,
    member_id: i64,
    book_id: i64,
    borrow_date: NaiveDate,
    return_date: Option<NaiveDate>,
) -> LibraryResult<Borrow> {
    logged("edit borrow", || {
        let borrow = checked_borrow(conn, member_id, book_id, borrow_date, return_date, Some(id))?
            .with_id(id)?;
        let borrow = Dao::<Borrow>::new(conn).edit(borrow)?;
        info!(id, returned = borrow.is_returned(), "borrow edited");
        Ok(borrow)
    })
}

pub fn remove_borrow_by_id(conn: &Connection, id: i64) -> LibraryResult<Borrow> {
    logged("remove borrow", || {
        let removed = Dao::<Borrow>::new(conn)
            .remove_by_id(id)?
            .ok_or_else(|| no_borrow(id))?;
        info!(id, "borrow removed");
        Ok(removed)
    })
}

pub fn find_all_borrows(conn: &Connection) -> LibraryResult<Vec<Borrow>> {
    logged("find all borrows", || {
        let borrows = Dao::<Borrow>::new(conn).find_all()?;
        info!("{} borrows retrieved", borrows.len());
        Ok(borrows)
    })
}

pub fn find_borrow_by_id(conn: &Connection, id: i64) -> LibraryResult<Borrow> {
    logged("find borrow", || {
        let borrow = Dao::<Borrow>::new(conn)
            .find_by_id(id)?
            .ok_or_else(|| no_borrow(id))?;
        info!(id, returned = borrow.is_returned(), "borrow found");
        Ok(borrow)
    })
}

fn checked_borrow(
    conn: &Connection,
    member_id: i64,
    book_id: i64,
    borrow_date: NaiveDate,
    return_date: Option<NaiveDate>,
    editing: Option<i64>,
) -> LibraryResult<Borrow> {
    if Dao::<Member>::new(conn).find_by_id(member_id)?.is_none() {
        return Err(LibraryError::Validation(
            "Member must be a valid member!".to_string(),
        ));
    }
    if Dao::<Book>::new(conn).find_by_id(book_id)?.is_none() {
        return Err(LibraryError::Validation(
            "Book must be a valid book!".to_string(),
        ));
    }

    let borrow = Borrow::new(member_id, book_id, borrow_date, return_date)?;

    if let Some(returned) = return_date {
        if returned < borrow_date {
            return Err(LibraryError::Validation(
                "Return date cannot be earlier than borrow date.".to_string(),
            ));
        }
    }

    // Another open borrow of the book blocks an open candidate outright, and a
    // closed candidate whenever its period reaches the open loan's start.
    let still_out = Dao::<Borrow>::new(conn)
        .find_all_by("book_id", book_id)?
        .into_iter()
        .filter(|other| !other.is_returned() && Some(other.id) != editing)
        .any(|other| match return_date {
            None => true,
            Some(returned) => other.borrow_date <= returned,
        });
    if still_out {
        return Err(LibraryError::Conflict(format!(
            "Book {book_id} is already borrowed."
        )));
    }

    Ok(borrow)
}

fn no_borrow(id: i64) -> LibraryError {
    LibraryError::NotFound(format!("No borrow found with ID {id}."))
}
