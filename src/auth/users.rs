use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::User;

/// Fields a user can change on their profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProfileInput {
    pub username: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

pub fn find_by_username(conn: &Connection, username: &str) -> Result<Option<User>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE username = ?1", User::COLUMNS),
        params![username],
        User::from_row,
    )
    .optional()
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<User>, rusqlite::Error> {
    conn.query_row(
        &format!("SELECT {} FROM users WHERE id = ?1", User::COLUMNS),
        params![id],
        User::from_row,
    )
    .optional()
}

/// Whether `username` belongs to someone other than `except_id`.
pub fn username_taken(
    conn: &Connection,
    username: &str,
    except_id: Option<i64>,
) -> Result<bool, rusqlite::Error> {
    conn.query_row(
        "SELECT COUNT(*) > 0 FROM users WHERE username = ?1 AND id != ?2",
        params![username, except_id.unwrap_or(-1)],
        |row| row.get(0),
    )
}

pub fn insert(
    conn: &Connection,
    profile: &ProfileInput,
    password_hash: &str,
) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO users (username, email, first_name, last_name, password_hash)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            profile.username,
            profile.email,
            profile.first_name,
            profile.last_name,
            password_hash
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_profile(
    conn: &Connection,
    id: i64,
    profile: &ProfileInput,
) -> Result<(), rusqlite::Error> {
    conn.execute(
        "UPDATE users SET username = ?1, email = ?2, first_name = ?3, last_name = ?4 WHERE id = ?5",
        params![
            profile.username,
            profile.email,
            profile.first_name,
            profile.last_name,
            id
        ],
    )?;
    Ok(())
}

pub fn update_password(conn: &Connection, id: i64, password_hash: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "UPDATE users SET password_hash = ?1 WHERE id = ?2",
        params![password_hash, id],
    )?;
    Ok(())
}
