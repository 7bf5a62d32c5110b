//! Author-only guard for edit and delete.

use crate::db::models::{Comment, Post};
use crate::extractors::CurrentUser;

/// Content with a single author and a page to fall back to.
pub trait Authored {
    fn author_id(&self) -> i64;

    /// Where a refused requester is sent.
    fn fallback_url(&self) -> String;
}

impl Authored for Post {
    fn author_id(&self) -> i64 {
        self.author_id
    }

    fn fallback_url(&self) -> String {
        self.url()
    }
}

impl Authored for Comment {
    fn author_id(&self) -> i64 {
        self.author_id
    }

    fn fallback_url(&self) -> String {
        format!("/posts/{}/", self.post_id)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    Allow,
    Deny { redirect_to: String },
}

pub fn check<T: Authored>(entity: &T, user: &CurrentUser) -> Access {
    if entity.author_id() == user.id {
        Access::Allow
    } else {
        Access::Deny {
            redirect_to: entity.fallback_url(),
        }
    }
}
