use chrono::NaiveDateTime;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};

use crate::blog::pagination::{Page, PageWindow};
use crate::blog::visibility::{self, Scope, Viewer};
use crate::db::models::{format_db_time, Post};

/// Validated post fields ready to be stored.
#[derive(Debug, Clone, PartialEq)]
pub struct PostInput {
    pub title: String,
    pub text: String,
    pub pub_date: NaiveDateTime,
    pub category_id: i64,
    pub location_id: Option<i64>,
    pub is_published: bool,
    /// Path under the uploads directory.
    pub image: Option<String>,
}

/// One page of a listing, newest publication date first.
pub fn list_page(
    conn: &Connection,
    scope: Scope,
    viewer: Viewer,
    now: NaiveDateTime,
    requested_page: i64,
    per_page: u32,
) -> Result<Page<Post>, rusqlite::Error> {
    let predicate = visibility::listing(scope, viewer, now);

    let total: i64 = conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM posts p
             LEFT JOIN categories c ON c.id = p.category_id
             WHERE {}",
            predicate.sql
        ),
        params_from_iter(predicate.params.iter()),
        |row| row.get(0),
    )?;

    let window = PageWindow::resolve(requested_page, total.max(0) as u64, per_page);

    let sql = format!(
        "{} WHERE {} ORDER BY p.pub_date DESC, p.id DESC LIMIT ? OFFSET ?",
        Post::SELECT,
        predicate.sql
    );
    let mut values = predicate.params;
    values.push(Value::Integer(i64::from(window.limit())));
    values.push(Value::Integer(window.offset() as i64));

    let mut stmt = conn.prepare(&sql)?;
    let items = stmt
        .query_map(params_from_iter(values.iter()), Post::from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok(Page::new(items, window))
}

pub fn find(conn: &Connection, id: i64) -> Result<Option<Post>, rusqlite::Error> {
    conn.query_row(
        &format!("{} WHERE p.id = ?1", Post::SELECT),
        params![id],
        Post::from_row,
    )
    .optional()
}

pub fn insert(conn: &Connection, author_id: i64, input: &PostInput) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO posts (title, text, pub_date, author_id, category_id, location_id, image, is_published)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
        params![
            input.title,
            input.text,
            format_db_time(&input.pub_date),
            author_id,
            input.category_id,
            input.location_id,
            input.image,
            input.is_published,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update(conn: &Connection, id: i64, input: &PostInput) -> Result<(), rusqlite::Error> {
    conn.execute(
        "UPDATE posts SET title = ?1, text = ?2, pub_date = ?3, category_id = ?4,
                          location_id = ?5, image = ?6, is_published = ?7
         WHERE id = ?8",
        params![
            input.title,
            input.text,
            format_db_time(&input.pub_date),
            input.category_id,
            input.location_id,
            input.image,
            input.is_published,
            id,
        ],
    )?;
    Ok(())
}

pub fn delete(conn: &Connection, id: i64) -> Result<(), rusqlite::Error> {
    conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
    Ok(())
}
