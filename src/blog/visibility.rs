//! Which posts a viewer may see.
//!
//! A post is public when it is published, its category is published and its
//! publication date has passed. Signed-in viewers also see everything they
//! wrote. The same rule is exposed twice: as a pure check on a single post
//! and as SQL predicates for listings, so both paths agree.

use chrono::NaiveDateTime;
use rusqlite::types::Value;

use crate::db::models::{format_db_time, Post};

/// Who is asking to see content.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Viewer {
    Anonymous,
    User(i64),
}

impl Viewer {
    pub fn user_id(&self) -> Option<i64> {
        match self {
            Viewer::Anonymous => None,
            Viewer::User(id) => Some(*id),
        }
    }

    pub fn is(&self, user_id: i64) -> bool {
        self.user_id() == Some(user_id)
    }
}

/// The listing a predicate is built for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// Front page feed across all categories.
    Feed,
    /// Posts filed under one category. The caller has already checked that
    /// the category itself is published.
    Category(i64),
    /// Posts written by one user.
    Profile(i64),
}

/// The fields of a post that decide who may see it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Publication {
    pub author_id: i64,
    pub is_published: bool,
    /// `None` when the post has no category.
    pub category_published: Option<bool>,
    pub pub_date: NaiveDateTime,
}

impl Publication {
    pub fn of(post: &Post) -> Self {
        Publication {
            author_id: post.author_id,
            is_published: post.is_published,
            category_published: post.category.as_ref().map(|c| c.is_published),
            pub_date: post.pub_date,
        }
    }

    pub fn is_public(&self, now: NaiveDateTime) -> bool {
        self.is_published && self.category_published == Some(true) && self.pub_date <= now
    }

    pub fn visible_to(&self, viewer: Viewer, now: NaiveDateTime) -> bool {
        self.is_public(now) || viewer.is(self.author_id)
    }
}

/// A SQL condition over `posts p LEFT JOIN categories c`, with its bound
/// values in placeholder order.
#[derive(Debug, Clone, PartialEq)]
pub struct Predicate {
    pub sql: String,
    pub params: Vec<Value>,
}

impl Predicate {
    fn new(sql: impl Into<String>, params: Vec<Value>) -> Self {
        Predicate {
            sql: sql.into(),
            params,
        }
    }

    /// Publicly visible posts as of `now`.
    pub fn public(now: NaiveDateTime) -> Self {
        Predicate::new(
            "(p.is_published = 1 AND c.is_published = 1 AND p.pub_date <= ?)",
            vec![Value::Text(format_db_time(&now))],
        )
    }

    pub fn authored_by(user_id: i64) -> Self {
        Predicate::new("(p.author_id = ?)", vec![Value::Integer(user_id)])
    }

    pub fn in_category(category_id: i64) -> Self {
        Predicate::new("(p.category_id = ?)", vec![Value::Integer(category_id)])
    }

    pub fn and(self, other: Predicate) -> Self {
        self.combine("AND", other)
    }

    pub fn or(self, other: Predicate) -> Self {
        self.combine("OR", other)
    }

    fn combine(mut self, op: &str, other: Predicate) -> Self {
        self.params.extend(other.params);
        Predicate {
            sql: format!("({} {} {})", self.sql, op, other.sql),
            params: self.params,
        }
    }
}

/// Posts a viewer may see in general: public ones, plus their own.
pub fn visible_to(viewer: Viewer, now: NaiveDateTime) -> Predicate {
    match viewer {
        Viewer::Anonymous => Predicate::public(now),
        Viewer::User(id) => Predicate::public(now).or(Predicate::authored_by(id)),
    }
}

/// The filter applied to a listing page.
pub fn listing(scope: Scope, viewer: Viewer, now: NaiveDateTime) -> Predicate {
    match scope {
        Scope::Feed => visible_to(viewer, now),
        Scope::Category(category_id) => {
            Predicate::in_category(category_id).and(visible_to(viewer, now))
        }
        Scope::Profile(owner_id) if viewer.is(owner_id) => Predicate::authored_by(owner_id),
        Scope::Profile(owner_id) => Predicate::authored_by(owner_id).and(Predicate::public(now)),
    }
}
