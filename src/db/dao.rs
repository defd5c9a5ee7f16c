//! Generic create/read/update/delete over any [`Entity`]. Controllers never
//! write SQL for plain CRUD; they pick the entity type and let [`Dao`] build
//! the statements from the table description.

use std::marker::PhantomData;

use rusqlite::types::Value;
use rusqlite::{
    params_from_iter, Connection, Error as SqlError, ErrorCode, OptionalExtension, Row,
};
use tracing::debug;

use crate::error::{LibraryError, LibraryResult};

/// A type stored as one row of one table with an `INTEGER` primary key
/// called `id`.
pub trait Entity: Sized {
    /// Table name.
    const TABLE: &'static str;
    /// Every column except `id`, in the order used by [`Entity::values`] and
    /// expected by [`Entity::from_row`] after the id.
    const COLUMNS: &'static [&'static str];
    /// Lower-case noun used in user-facing messages ("book").
    const LABEL: &'static str;

    fn id(&self) -> i64;
    fn set_id(&mut self, id: i64);

    /// Hydrate from a row selected as `id, COLUMNS...`.
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self>;

    /// Column values in `COLUMNS` order.
    fn values(&self) -> Vec<Value>;
}

/// Data-access object for entity type `T`, borrowing the app's connection.
pub struct Dao<'c, T> {
    conn: &'c Connection,
    entity: PhantomData<T>,
}

impl<'c, T: Entity> Dao<'c, T> {
    pub fn new(conn: &'c Connection) -> Self {
        Self {
            conn,
            entity: PhantomData,
        }
    }

    /// Insert a new row and return the entity carrying its fresh id.
    pub fn save(&self, mut entity: T) -> LibraryResult<T> {
        let placeholders = (1..=T::COLUMNS.len())
            .map(|idx| format!("?{idx}"))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO {} ({}) VALUES ({placeholders})",
            T::TABLE,
            T::COLUMNS.join(", ")
        );

        let tx = self.conn.unchecked_transaction()?;
        tx.execute(&sql, params_from_iter(entity.values()))?;
        entity.set_id(tx.last_insert_rowid());
        tx.commit()?;

        debug!(table = T::TABLE, id = entity.id(), "row inserted");
        Ok(entity)
    }

    /// Overwrite every column of the row with the entity's id.
    pub fn edit(&self, entity: T) -> LibraryResult<T> {
        let assignments = T::COLUMNS
            .iter()
            .enumerate()
            .map(|(idx, column)| format!("{column} = ?{}", idx + 1))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "UPDATE {} SET {assignments} WHERE id = ?{}",
            T::TABLE,
            T::COLUMNS.len() + 1
        );

        let mut values = entity.values();
        values.push(Value::Integer(entity.id()));

        let tx = self.conn.unchecked_transaction()?;
        let updated = tx.execute(&sql, params_from_iter(values))?;
        if updated == 0 {
            return Err(missing::<T>(entity.id()));
        }
        tx.commit()?;

        debug!(table = T::TABLE, id = entity.id(), "row updated");
        Ok(entity)
    }

    /// Delete the row backing `entity`.
    pub fn remove(&self, entity: &T) -> LibraryResult<Option<T>> {
        self.remove_by_id(entity.id())
    }

    /// Delete by primary key, returning what was deleted or `None` when the
    /// row never existed.
    pub fn remove_by_id(&self, id: i64) -> LibraryResult<Option<T>> {
        let tx = self.conn.unchecked_transaction()?;
        let Some(found) = find_in::<T>(&tx, id)? else {
            return Ok(None);
        };

        tx.execute(&format!("DELETE FROM {} WHERE id = ?1", T::TABLE), [id])
            .map_err(|err| map_foreign_key::<T>(err, id))?;
        tx.commit()?;

        debug!(table = T::TABLE, id, "row deleted");
        Ok(Some(found))
    }

    /// Every row, oldest first.
    pub fn find_all(&self) -> LibraryResult<Vec<T>> {
        let mut stmt = self
            .conn
            .prepare(&format!("{} ORDER BY id", select_sql::<T>()))?;
        let rows = stmt
            .query_map([], T::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }

    pub fn find_by_id(&self, id: i64) -> LibraryResult<Option<T>> {
        find_in::<T>(self.conn, id)
    }

    /// Rows whose `column` equals `value`. Only the entity's own columns (and
    /// `id`) are accepted, so the column name never comes from user input.
    pub fn find_all_by(&self, column: &str, value: impl Into<Value>) -> LibraryResult<Vec<T>> {
        if column != "id" && !T::COLUMNS.contains(&column) {
            return Err(LibraryError::validation(format!(
                "Unknown {} column: {column}",
                T::LABEL
            )));
        }

        let mut stmt = self.conn.prepare(&format!(
            "{} WHERE {column} = ?1 ORDER BY id",
            select_sql::<T>()
        ))?;
        let rows = stmt
            .query_map([value.into()], T::from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(rows)
    }
}

fn select_sql<T: Entity>() -> String {
    format!("SELECT id, {} FROM {}", T::COLUMNS.join(", "), T::TABLE)
}

fn find_in<T: Entity>(conn: &Connection, id: i64) -> LibraryResult<Option<T>> {
    let found = conn
        .query_row(
            &format!("{} WHERE id = ?1", select_sql::<T>()),
            [id],
            T::from_row,
        )
        .optional()?;
    Ok(found)
}

fn missing<T: Entity>(id: i64) -> LibraryError {
    LibraryError::not_found(format!("No {} by id {id} found.", T::LABEL))
}

/// Turn a foreign-key failure into a message the status bar can show. Only
/// borrows reference other tables, so "in use" always means borrow history.
fn map_foreign_key<T: Entity>(err: SqlError, id: i64) -> LibraryError {
    if matches!(
        err.sqlite_error_code(),
        Some(ErrorCode::ConstraintViolation)
    ) {
        LibraryError::InUse(format!(
            "The {} by id {id} has borrow records and cannot be removed.",
            T::LABEL
        ))
    } else {
        err.into()
    }
}
