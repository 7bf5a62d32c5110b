use serde::Deserialize;

pub const POSTS_PER_PAGE: u32 = 10;

/// `?page=` query string. Kept as text so junk input falls back to page one
/// instead of rejecting the request.
#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<String>,
}

impl PageQuery {
    pub fn requested(&self) -> i64 {
        self.page
            .as_deref()
            .and_then(|p| p.trim().parse::<i64>().ok())
            .unwrap_or(1)
    }
}

/// Where a page sits inside a listing of `total` items.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub number: u32,
    pub num_pages: u32,
    pub per_page: u32,
    pub total: u64,
}

impl PageWindow {
    /// Clamp `requested` into `1..=num_pages`. An empty listing still has one page.
    pub fn resolve(requested: i64, total: u64, per_page: u32) -> Self {
        let per_page = per_page.max(1);
        let num_pages = total.div_ceil(u64::from(per_page)).max(1) as u32;
        let number = requested.clamp(1, i64::from(num_pages)) as u32;
        PageWindow {
            number,
            num_pages,
            per_page,
            total,
        }
    }

    pub fn offset(&self) -> u64 {
        u64::from(self.number - 1) * u64::from(self.per_page)
    }

    pub fn limit(&self) -> u32 {
        self.per_page
    }
}

/// One page of items plus the navigation state templates need.
#[derive(Debug, Clone)]
pub struct Page<T> {
    pub items: Vec<T>,
    pub window: PageWindow,
}

impl<T> Page<T> {
    pub fn new(items: Vec<T>, window: PageWindow) -> Self {
        Page { items, window }
    }

    pub fn number(&self) -> u32 {
        self.window.number
    }

    pub fn num_pages(&self) -> u32 {
        self.window.num_pages
    }

    pub fn total(&self) -> u64 {
        self.window.total
    }

    pub fn has_previous(&self) -> bool {
        self.window.number > 1
    }

    pub fn has_next(&self) -> bool {
        self.window.number < self.window.num_pages
    }

    pub fn has_other_pages(&self) -> bool {
        self.has_previous() || self.has_next()
    }

    pub fn previous_number(&self) -> u32 {
        self.window.number.saturating_sub(1).max(1)
    }

    pub fn next_number(&self) -> u32 {
        (self.window.number + 1).min(self.window.num_pages)
    }
}
