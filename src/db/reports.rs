//! Read-only aggregate queries behind the Reports tab. Each function returns
//! typed rows; [`run_report`] flattens any of them into a [`ReportTable`] of
//! display strings so the UI can render every report with one table widget.

use chrono::NaiveDate;
use rusqlite::Connection;

use crate::error::LibraryResult;
use crate::models::format_date;

/// A book that is out right now, with who has it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentBorrow {
    pub book_id: i64,
    pub title: String,
    pub member_id: i64,
    pub name: String,
    pub family: String,
    pub borrow_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookSummary {
    pub id: i64,
    pub title: String,
    pub author: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MemberSummary {
    pub id: i64,
    pub name: String,
    pub family: String,
}

/// An open borrow and how many days it has been out.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnreturnedBorrow {
    pub member_id: i64,
    pub name: String,
    pub family: String,
    pub book_title: String,
    pub delay_days: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BorrowDetail {
    pub member_id: i64,
    pub name: String,
    pub family: String,
    pub book_id: i64,
    pub title: String,
    pub author: String,
    pub borrow_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BookBorrowCount {
    pub book_id: i64,
    pub title: String,
    pub author: String,
    pub borrow_times: i64,
}

pub fn current_borrows(conn: &Connection) -> LibraryResult<Vec<CurrentBorrow>> {
    let mut stmt = conn.prepare(
        "SELECT bk.id, bk.title, m.id, m.name, m.family, br.borrow_date
         FROM borrows br
         JOIN books bk ON bk.id = br.book_id
         JOIN members m ON m.id = br.member_id
         WHERE br.return_date IS NULL
         ORDER BY br.borrow_date, br.id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(CurrentBorrow {
                book_id: row.get(0)?,
                title: row.get(1)?,
                member_id: row.get(2)?,
                name: row.get(3)?,
                family: row.get(4)?,
                borrow_date: row.get(5)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn books_never_borrowed(conn: &Connection) -> LibraryResult<Vec<BookSummary>> {
    let mut stmt = conn.prepare(
        "SELECT id, title, author FROM books
         WHERE id NOT IN (SELECT DISTINCT book_id FROM borrows)
         ORDER BY id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(BookSummary {
                id: row.get(0)?,
                title: row.get(1)?,
                author: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Open borrows with the delay measured against `today`.
pub fn members_with_unreturned_books(
    conn: &Connection,
    today: NaiveDate,
) -> LibraryResult<Vec<UnreturnedBorrow>> {
    let mut stmt = conn.prepare(
        "SELECT m.id, m.name, m.family, bk.title, br.borrow_date
         FROM borrows br
         JOIN members m ON m.id = br.member_id
         JOIN books bk ON bk.id = br.book_id
         WHERE br.return_date IS NULL
         ORDER BY br.borrow_date, br.id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            let borrow_date: NaiveDate = row.get(4)?;
            Ok(UnreturnedBorrow {
                member_id: row.get(0)?,
                name: row.get(1)?,
                family: row.get(2)?,
                book_title: row.get(3)?,
                delay_days: (today - borrow_date).num_days(),
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn members_never_borrowed(conn: &Connection) -> LibraryResult<Vec<MemberSummary>> {
    let mut stmt = conn.prepare(
        "SELECT id, name, family FROM members m
         WHERE NOT EXISTS (SELECT 1 FROM borrows br WHERE br.member_id = m.id)
         ORDER BY id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(MemberSummary {
                id: row.get(0)?,
                name: row.get(1)?,
                family: row.get(2)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

pub fn all_borrows(conn: &Connection) -> LibraryResult<Vec<BorrowDetail>> {
    let mut stmt = conn.prepare(
        "SELECT m.id, m.name, m.family, bk.id, bk.title, bk.author,
                br.borrow_date, br.return_date
         FROM borrows br
         JOIN members m ON m.id = br.member_id
         JOIN books bk ON bk.id = br.book_id
         ORDER BY br.id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(BorrowDetail {
                member_id: row.get(0)?,
                name: row.get(1)?,
                family: row.get(2)?,
                book_id: row.get(3)?,
                title: row.get(4)?,
                author: row.get(5)?,
                borrow_date: row.get(6)?,
                return_date: row.get(7)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Books borrowed at least once, most popular first.
pub fn book_borrow_counts(conn: &Connection) -> LibraryResult<Vec<BookBorrowCount>> {
    let mut stmt = conn.prepare(
        "SELECT bk.id, bk.title, bk.author, COUNT(br.book_id) AS borrow_times
         FROM books bk
         JOIN borrows br ON br.book_id = bk.id
         GROUP BY bk.id, bk.title, bk.author
         ORDER BY borrow_times DESC, bk.id",
    )?;
    let rows = stmt
        .query_map([], |row| {
            Ok(BookBorrowCount {
                book_id: row.get(0)?,
                title: row.get(1)?,
                author: row.get(2)?,
                borrow_times: row.get(3)?,
            })
        })?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// The reports offered by the Reports tab, in menu order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportKind {
    AllBorrows,
    CurrentlyBorrowed,
    NeverBorrowedBooks,
    MembersWithUnreturned,
    MembersNeverBorrowed,
    BorrowCounts,
}

impl ReportKind {
    pub const ALL: [ReportKind; 6] = [
        ReportKind::AllBorrows,
        ReportKind::CurrentlyBorrowed,
        ReportKind::NeverBorrowedBooks,
        ReportKind::MembersWithUnreturned,
        ReportKind::MembersNeverBorrowed,
        ReportKind::BorrowCounts,
    ];

    pub fn title(self) -> &'static str {
        match self {
            ReportKind::AllBorrows => "All Borrows Information",
            ReportKind::CurrentlyBorrowed => "Books Currently Borrowed",
            ReportKind::NeverBorrowedBooks => "Books Never Borrowed",
            ReportKind::MembersWithUnreturned => "Members With Unreturned Books",
            ReportKind::MembersNeverBorrowed => "Members Who Never Borrowed",
            ReportKind::BorrowCounts => "Book Borrow Counts",
        }
    }

    pub fn headings(self) -> &'static [&'static str] {
        match self {
            ReportKind::AllBorrows => &[
                "Member ID",
                "Name",
                "Family",
                "Book ID",
                "Title",
                "Author",
                "Borrow Date",
                "Return Date",
            ],
            ReportKind::CurrentlyBorrowed => &[
                "Book ID",
                "Title",
                "Member ID",
                "Name",
                "Family",
                "Borrow Date",
            ],
            ReportKind::NeverBorrowedBooks => &["Book ID", "Title", "Author"],
            ReportKind::MembersWithUnreturned => {
                &["Member ID", "Name", "Family", "Book Title", "Delay (days)"]
            }
            ReportKind::MembersNeverBorrowed => &["Member ID", "Name", "Family"],
            ReportKind::BorrowCounts => &["Book ID", "Title", "Author", "Times Borrowed"],
        }
    }
}

/// Any report flattened into display strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReportTable {
    pub kind: ReportKind,
    pub rows: Vec<Vec<String>>,
}

impl ReportTable {
    pub fn headings(&self) -> &'static [&'static str] {
        self.kind.headings()
    }
}

/// Execute `kind` and render its rows. `today` only matters for the delay
/// column of [`ReportKind::MembersWithUnreturned`].
pub fn run_report(
    conn: &Connection,
    kind: ReportKind,
    today: NaiveDate,
) -> LibraryResult<ReportTable> {
    let rows = match kind {
        ReportKind::AllBorrows => all_borrows(conn)?
            .into_iter()
            .map(|b| {
                vec![
                    b.member_id.to_string(),
                    b.name,
                    b.family,
                    b.book_id.to_string(),
                    b.title,
                    b.author,
                    format_date(Some(b.borrow_date)),
                    format_date(b.return_date),
                ]
            })
            .collect(),
        ReportKind::CurrentlyBorrowed => current_borrows(conn)?
            .into_iter()
            .map(|b| {
                vec![
                    b.book_id.to_string(),
                    b.title,
                    b.member_id.to_string(),
                    b.name,
                    b.family,
                    format_date(Some(b.borrow_date)),
                ]
            })
            .collect(),
        ReportKind::NeverBorrowedBooks => books_never_borrowed(conn)?
            .into_iter()
            .map(|b| vec![b.id.to_string(), b.title, b.author])
            .collect(),
        ReportKind::MembersWithUnreturned => members_with_unreturned_books(conn, today)?
            .into_iter()
            .map(|b| {
                vec![
                    b.member_id.to_string(),
                    b.name,
                    b.family,
                    b.book_title,
                    b.delay_days.to_string(),
                ]
            })
            .collect(),
        ReportKind::MembersNeverBorrowed => members_never_borrowed(conn)?
            .into_iter()
            .map(|m| vec![m.id.to_string(), m.name, m.family])
            .collect(),
        ReportKind::BorrowCounts => book_borrow_counts(conn)?
            .into_iter()
            .map(|c| {
                vec![
                    c.book_id.to_string(),
                    c.title,
                    c.author,
                    c.borrow_times.to_string(),
                ]
            })
            .collect(),
    };

    Ok(ReportTable { kind, rows })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::{open_in_memory, Dao};
    use crate::models::{Book, Borrow, Member};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    /// Three members, three books:
    /// - Ada borrowed Dune twice (one returned) and Emma once (returned)
    /// - Alan borrowed Emma (still out)
    /// - Grace never borrowed, Walden never lent
    fn seeded() -> Connection {
        let conn = open_in_memory().unwrap();
        let members = Dao::<Member>::new(&conn);
        let ada = members.save(Member::new("Ada", "Lovelace").unwrap()).unwrap();
        let alan = members.save(Member::new("Alan", "Turing").unwrap()).unwrap();
        members.save(Member::new("Grace", "Hopper").unwrap()).unwrap();

        let books = Dao::<Book>::new(&conn);
        let dune = books.save(Book::new("Dune", "Frank Herbert", 412).unwrap()).unwrap();
        let emma = books.save(Book::new("Emma", "Jane Austen", 474).unwrap()).unwrap();
        books.save(Book::new("Walden", "Henry Thoreau", 352).unwrap()).unwrap();

        let borrows = Dao::<Borrow>::new(&conn);
        for borrow in [
            Borrow::new(ada.id, dune.id, date(2024, 1, 1), Some(date(2024, 1, 10))),
            Borrow::new(ada.id, emma.id, date(2024, 2, 1), Some(date(2024, 2, 5))),
            Borrow::new(ada.id, dune.id, date(2024, 3, 1), None),
            Borrow::new(alan.id, emma.id, date(2024, 3, 5), None),
        ] {
            borrows.save(borrow.unwrap()).unwrap();
        }
        conn
    }

    #[test]
    fn current_borrows_only_lists_open_loans() {
        let conn = seeded();
        let current = current_borrows(&conn).unwrap();
        let titles: Vec<_> = current.iter().map(|b| b.title.as_str()).collect();
        assert_eq!(titles, vec!["Dune", "Emma"]);
        assert_eq!(current[1].family, "Turing");
        assert_eq!(current[1].borrow_date, date(2024, 3, 5));
    }

    #[test]
    fn never_borrowed_reports_find_idle_rows() {
        let conn = seeded();
        let books = books_never_borrowed(&conn).unwrap();
        assert_eq!(books.len(), 1);
        assert_eq!(books[0].title, "Walden");

        let members = members_never_borrowed(&conn).unwrap();
        assert_eq!(members.len(), 1);
        assert_eq!(members[0].name, "Grace");
    }

    #[test]
    fn unreturned_delay_counts_days_since_borrowing() {
        let conn = seeded();
        let rows = members_with_unreturned_books(&conn, date(2024, 3, 15)).unwrap();
        let delays: Vec<_> = rows
            .iter()
            .map(|r| (r.name.as_str(), r.book_title.as_str(), r.delay_days))
            .collect();
        assert_eq!(delays, vec![("Ada", "Dune", 14), ("Alan", "Emma", 10)]);
    }

    #[test]
    fn all_borrows_includes_returned_history() {
        let conn = seeded();
        let rows = all_borrows(&conn).unwrap();
        assert_eq!(rows.len(), 4);
        assert_eq!(rows[0].return_date, Some(date(2024, 1, 10)));
        assert_eq!(rows[3].return_date, None);
    }

    #[test]
    fn borrow_counts_are_sorted_by_popularity() {
        let conn = seeded();
        let counts = book_borrow_counts(&conn).unwrap();
        let summary: Vec<_> = counts
            .iter()
            .map(|c| (c.title.as_str(), c.borrow_times))
            .collect();
        assert_eq!(summary, vec![("Dune", 2), ("Emma", 2)]);
        assert!(counts.iter().all(|c| c.title != "Walden"));
    }

    #[test]
    fn run_report_renders_rows_matching_headings() {
        let conn = seeded();
        for kind in ReportKind::ALL {
            let table = run_report(&conn, kind, date(2024, 3, 15)).unwrap();
            assert!(!table.rows.is_empty(), "{} returned no rows", kind.title());
            for row in &table.rows {
                assert_eq!(row.len(), table.headings().len());
            }
        }

        let all = run_report(&conn, ReportKind::AllBorrows, date(2024, 3, 15)).unwrap();
        assert_eq!(all.rows[3][7], "-");
        assert_eq!(all.rows[0][6], "2024-01-01");
    }

    #[test]
    fn reports_on_an_empty_library_are_empty() {
        let conn = open_in_memory().unwrap();
        for kind in ReportKind::ALL {
            assert!(run_report(&conn, kind, date(2024, 1, 1))
                .unwrap()
                .rows
                .is_empty());
        }
    }
}
