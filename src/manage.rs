//! Management subcommands for categories and locations.

use std::io::Write;

use anyhow::{bail, Context};
use rusqlite::Connection;

use crate::blog::taxonomy;
use crate::config::{CategoryCommand, Command, LocationCommand};

/// Run a management command, writing human-readable output to `out`.
/// `Serve` is not a management command and does nothing here.
pub fn run(conn: &Connection, command: &Command, out: &mut impl Write) -> anyhow::Result<()> {
    match command {
        Command::Serve => Ok(()),
        Command::Category { action } => category(conn, action, out),
        Command::Location { action } => location(conn, action, out),
    }
}

fn published_label(is_published: bool) -> &'static str {
    if is_published {
        "published"
    } else {
        "hidden"
    }
}

fn category(conn: &Connection, action: &CategoryCommand, out: &mut impl Write) -> anyhow::Result<()> {
    match action {
        CategoryCommand::Add {
            title,
            slug,
            description,
            hidden,
        } => {
            if title.trim().is_empty() {
                bail!("category title must not be empty");
            }
            if !taxonomy::is_valid_slug(slug) {
                bail!("invalid slug '{}': use letters, digits, hyphens and underscores", slug);
            }
            let id = taxonomy::insert_category(conn, title.trim(), slug, description, !hidden)
                .with_context(|| format!("could not create category '{}'", slug))?;
            tracing::info!("Created category {} ({})", slug, id);
            writeln!(out, "Created category {} ({})", slug, published_label(!hidden))?;
        }
        CategoryCommand::List => {
            for category in taxonomy::list_categories(conn)? {
                writeln!(
                    out,
                    "{}\t{}\t{}",
                    category.slug,
                    published_label(category.is_published),
                    category.title
                )?;
            }
        }
        CategoryCommand::Publish { slug } => set_published(conn, slug, true, out)?,
        CategoryCommand::Hide { slug } => set_published(conn, slug, false, out)?,
    }
    Ok(())
}

fn set_published(
    conn: &Connection,
    slug: &str,
    is_published: bool,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    if !taxonomy::set_category_published(conn, slug, is_published)? {
        bail!("no category with slug '{}'", slug);
    }
    tracing::info!("Category {} is now {}", slug, published_label(is_published));
    writeln!(out, "Category {} is now {}", slug, published_label(is_published))?;
    Ok(())
}

fn location(conn: &Connection, action: &LocationCommand, out: &mut impl Write) -> anyhow::Result<()> {
    match action {
        LocationCommand::Add { name, hidden } => {
            if name.trim().is_empty() {
                bail!("location name must not be empty");
            }
            let id = taxonomy::insert_location(conn, name.trim(), !hidden)?;
            tracing::info!("Created location {} ({})", name, id);
            writeln!(out, "Created location {} ({})", name.trim(), published_label(!hidden))?;
        }
        LocationCommand::List => {
            for location in taxonomy::list_locations(conn)? {
                writeln!(
                    out,
                    "{}\t{}\t{}",
                    location.id,
                    published_label(location.is_published),
                    location.name
                )?;
            }
        }
    }
    Ok(())
}
