pub mod comments;
pub mod ownership;
pub mod pagination;
pub mod posts;
pub mod taxonomy;
pub mod visibility;

pub use ownership::Access;
pub use pagination::{Page, PageQuery};
pub use visibility::{Publication, Scope, Viewer};

/// Current time in the zone timestamps are stored in.
pub fn now() -> chrono::NaiveDateTime {
    chrono::Utc::now().naive_utc()
}
