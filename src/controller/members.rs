use rusqlite::Connection;
use tracing::info;

use super::logged;
use crate::db::Dao;
use crate::error::{LibraryError, LibraryResult};
use crate::models::Member;

pub fn add_member(conn: &Connection, name: &str, family: &str) -> LibraryResult<Member> {
    logged("add member", || {
        let member = Dao::<Member>::new(conn).save(Member::new(name, family)?)?;
        info!(id = member.id, "member {member} saved");
        Ok(member)
    })
}

pub fn edit_member(conn: &Connection, id: i64, name: &str, family: &str) -> LibraryResult<Member> {
    logged("edit member", || {
        let member = Member::new(name, family)?.with_id(id)?;
        let member = Dao::<Member>::new(conn).edit(member)?;
        info!(id, "member {member} edited");
        Ok(member)
    })
}

/// Delete a member. Members with borrow history are refused.
pub fn remove_member_by_id(conn: &Connection, id: i64) -> LibraryResult<Member> {
    logged("remove member", || {
        let removed = Dao::<Member>::new(conn)
            .remove_by_id(id)?
            .ok_or_else(|| no_member(id))?;
        info!(id, "member removed");
        Ok(removed)
    })
}

pub fn find_all_members(conn: &Connection) -> LibraryResult<Vec<Member>> {
    logged("find all members", || {
        let members = Dao::<Member>::new(conn).find_all()?;
        info!("{} members found", members.len());
        Ok(members)
    })
}

pub fn find_member_by_id(conn: &Connection, id: i64) -> LibraryResult<Member> {
    logged("find member", || {
        let member = Dao::<Member>::new(conn)
            .find_by_id(id)?
            .ok_or_else(|| no_member(id))?;
        info!(id, "member {member} found");
        Ok(member)
    })
}

/// Exact match on the family name. An empty result is reported as
/// [`LibraryError::NotFound`].
pub fn find_members_by_family(conn: &Connection, family: &str) -> LibraryResult<Vec<Member>> {
    logged("find members by family", || {
        let members = Dao::<Member>::new(conn).find_all_by("family", family.to_string())?;
        if members.is_empty() {
            return Err(LibraryError::NotFound(format!(
                "No member by family {family} found."
            )));
        }
        info!("{} member/s found by {family}", members.len());
        Ok(members)
    })
}

fn no_member(id: i64) -> LibraryError {
    LibraryError::NotFound(format!("No member by id {id} found."))
}
