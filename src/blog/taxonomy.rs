//! Categories and locations.

use rusqlite::{params, Connection, OptionalExtension};

use crate::db::models::{Category, Location};

/// Slugs are limited to ASCII letters, digits, hyphens and underscores.
pub fn is_valid_slug(slug: &str) -> bool {
    !slug.is_empty()
        && slug
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
}

pub fn published_category_by_slug(
    conn: &Connection,
    slug: &str,
) -> Result<Option<Category>, rusqlite::Error> {
    conn.query_row(
        &format!(
            "SELECT {} FROM categories WHERE slug = ?1 AND is_published = 1",
            Category::COLUMNS
        ),
        params![slug],
        Category::from_row,
    )
    .optional()
}

pub fn list_categories(conn: &Connection) -> Result<Vec<Category>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM categories ORDER BY title",
        Category::COLUMNS
    ))?;
    let categories = stmt
        .query_map([], Category::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(categories)
}

pub fn insert_category(
    conn: &Connection,
    title: &str,
    slug: &str,
    description: &str,
    is_published: bool,
) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO categories (title, slug, description, is_published) VALUES (?1, ?2, ?3, ?4)",
        params![title, slug, description, is_published],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Returns false when no category has that slug.
pub fn set_category_published(
    conn: &Connection,
    slug: &str,
    is_published: bool,
) -> Result<bool, rusqlite::Error> {
    let rows = conn.execute(
        "UPDATE categories SET is_published = ?1 WHERE slug = ?2",
        params![is_published, slug],
    )?;
    Ok(rows > 0)
}

pub fn list_locations(conn: &Connection) -> Result<Vec<Location>, rusqlite::Error> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {} FROM locations ORDER BY name",
        Location::COLUMNS
    ))?;
    let locations = stmt
        .query_map([], Location::from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(locations)
}

pub fn insert_location(
    conn: &Connection,
    name: &str,
    is_published: bool,
) -> Result<i64, rusqlite::Error> {
    conn.execute(
        "INSERT INTO locations (name, is_published) VALUES (?1, ?2)",
        params![name, is_published],
    )?;
    Ok(conn.last_insert_rowid())
}
