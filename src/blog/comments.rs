use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::Comment;

pub fn list_for_post(conn: &Connection, post_id: i64) -> Result<Vec<Comment>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "{} WHERE cm.post_id = ?1 ORDER BY cm.created_at ASC, cm.id ASC",
        Comment::SELECT
    ))?;
    let comments = stmt
        .query_map(params![post_id], Comment::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}

/// Look up a comment that belongs to `post_id`.
pub fn find_on_post(
    conn: &Connection,
    post_id: i64,
    comment_id: i64,
) -> Result<Option<Comment>, rusqlite::Error> {
    conn.query_row(
        &format!("{} WHERE cm.id = ?1 AND cm.post_id = ?2", Comment::SELECT),
        params![comment_id, post_id],
        Comment::from_row,
    )
    .optional()
}

pub fn count_for_post(conn: &Connection, post_id: i64) -> Result<i64, rusqlite::Error> {
    conn.query_row(
        "SELECT COUNT(*) FROM comments WHERE post_id = ?1",
        params![post_id],
        |row| row.get(0),
    )
}

pub fn insert(
    conn: &Connection,
    post_id: i64,
    author_id: i64,
    text: &str,
) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO comments (text, post_id, author_id) VALUES (?1, ?2, ?3)",
        params![text, post_id, author_id],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update(conn: &Connection, id: i64, text: &str) -> Result<(), rusqlite::Error> {
    conn.execute(
        "UPDATE comments SET text = ?1 WHERE id = ?2",
        params![text, id],
    )?;
    Ok(())
}

pub fn delete(conn: &Connection, id: i64) -> Result<(), rusqlite::Error> {
    conn.execute("DELETE FROM comments WHERE id = ?1", params![id])?;
    Ok(())
}
