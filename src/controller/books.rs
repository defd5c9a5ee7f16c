use rusqlite::Connection;
use tracing::info;

use super::logged;
use crate::db::Dao;
use crate::error::{LibraryError, LibraryResult};
use crate::models::Book;

/// Validate and insert a new book.
pub fn add_book(conn: &Connection, title: &str, author: &str, pages: i64) -> LibraryResult<Book> {
    logged("add book", || {
        let book = Dao::<Book>::new(conn).save(Book::new(title, author, pages)?)?;
        info!(id = book.id, title = %book.title, "book saved");
        Ok(book)
    })
}

/// Replace every field of book `id`.
pub fn edit_book(
    conn: &Connection,
    id: i64,
    title: &str,
    author: &str,
    pages: i64,
) -> LibraryResult<Book> {
    logged("edit book", || {
        let book = Book::new(title, author, pages)?.with_id(id)?;
        let book = Dao::<Book>::new(conn).edit(book)?;
        info!(id, title = %book.title, "book edited");
        Ok(book)
    })
}

/// Delete a book, returning the removed row. Books with borrow history are
/// refused with [`LibraryError::InUse`].
pub fn remove_book_by_id(conn: &Connection, id: i64) -> LibraryResult<Book> {
    logged("remove book", || {
        let removed = Dao::<Book>::new(conn)
            .remove_by_id(id)?
            .ok_or_else(|| no_book(id))?;
        info!(id, "book removed");
        Ok(removed)
    })
}

pub fn find_all_books(conn: &Connection) -> LibraryResult<Vec<Book>> {
    logged("find all books", || {
        let books = Dao::<Book>::new(conn).find_all()?;
        info!("{} books found", books.len());
        Ok(books)
    })
}

pub fn find_book_by_id(conn: &Connection, id: i64) -> LibraryResult<Book> {
    logged("find book", || {
        let book = Dao::<Book>::new(conn)
            .find_by_id(id)?
            .ok_or_else(|| no_book(id))?;
        info!(id, title = %book.title, "book found");
        Ok(book)
    })
}

fn no_book(id: i64) -> LibraryError {
    LibraryError::NotFound(format!("No book by id {id} found."))
}
