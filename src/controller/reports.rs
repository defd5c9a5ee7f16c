//! Report entry points for the UI. The queries live in `db::reports`; this
//! layer adds logging and pins "today" for the delay column.

use chrono::{Local, NaiveDate};
use rusqlite::Connection;
use tracing::info;

use super::logged;
use crate::db::reports::{
    self, BookBorrowCount, BookSummary, BorrowDetail, CurrentBorrow, MemberSummary,
    UnreturnedBorrow,
};
use crate::db::{ReportKind, ReportTable};
use crate::error::LibraryResult;

pub fn currently_borrowed(conn: &Connection) -> LibraryResult<Vec<CurrentBorrow>> {
    logged("currently borrowed report", || reports::current_borrows(conn))
}

pub fn books_never_borrowed(conn: &Connection) -> LibraryResult<Vec<BookSummary>> {
    logged("never borrowed books report", || {
        reports::books_never_borrowed(conn)
    })
}

/// Open borrows with their delay in days as of today.
pub fn members_with_unreturned(conn: &Connection) -> LibraryResult<Vec<UnreturnedBorrow>> {
    logged("unreturned books report", || {
        reports::members_with_unreturned_books(conn, today())
    })
}

pub fn members_never_borrowed(conn: &Connection) -> LibraryResult<Vec<MemberSummary>> {
    logged("members never borrowed report", || {
        reports::members_never_borrowed(conn)
    })
}

pub fn all_borrows(conn: &Connection) -> LibraryResult<Vec<BorrowDetail>> {
    logged("all borrows report", || reports::all_borrows(conn))
}

pub fn book_borrow_counts(conn: &Connection) -> LibraryResult<Vec<BookBorrowCount>> {
    logged("borrow counts report", || reports::book_borrow_counts(conn))
}

/// Render `kind` for display.
pub fn report(conn: &Connection, kind: ReportKind) -> LibraryResult<ReportTable> {
    logged(kind.title(), || {
        let table = reports::run_report(conn, kind, today())?;
        info!(report = kind.title(), rows = table.rows.len(), "report generated");
        Ok(table)
    })
}

/// The local calendar date, which is what librarians count delays against.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}
