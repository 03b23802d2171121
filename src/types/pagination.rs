use serde::Serialize;
use std::collections::HashMap;
use std::num::IntErrorKind;

/// Listings with fewer pages than this show every page number.
const FULL_WINDOW_LIMIT: usize = 6;

/// Pagination is computed from the `page` query parameter and the
/// number of items a listing holds.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Pagination {
    /// The current page, always within `1..=total_pages`
    pub page: usize,
    /// At least 1, even for an empty listing
    pub total_pages: usize,
    pub page_size: usize,
    /// Page numbers to render as links
    pub window: Vec<usize>,
    /// Index of the first item on the current page
    #[serde(skip)]
    pub start: usize,
    /// Index one past the last item on the current page
    #[serde(skip)]
    pub end: usize,
}

impl Pagination {
    /// The items of the current page. Bounds past the end of `items`
    /// yield a shorter (or empty) slice.
    pub fn slice<'a, T>(&self, items: &'a [T]) -> &'a [T] {
        let start = self.start.min(items.len());
        let end = self.end.min(items.len());
        &items[start..end]
    }

    pub fn limit(&self) -> i64 {
        self.page_size as i64
    }

    pub fn offset(&self) -> i64 {
        self.start as i64
    }
}

/// Reads the requested page from the query parameters.
/// A missing or unparseable `page` falls back to the first page. Numbers
/// too large for an `i64` saturate, so `paginate` clamps them to the
/// last page.
/// # Example query
/// /questions?page=3
pub fn extract_page(params: &HashMap<String, String>) -> i64 {
    let Some(page) = params.get("page") else {
        return 1;
    };

    match page.trim().parse::<i64>() {
        Ok(page) => page,
        Err(e) => match e.kind() {
            IntErrorKind::PosOverflow => i64::MAX,
            _ => 1,
        },
    }
}

/// Computes the page to show for a listing of `total_items`.
/// # Example
/// ```rust
/// use askboard::types::pagination::paginate;
/// let p = paginate(100, 4, 30);
/// assert_eq!(p.page, 25);
/// assert_eq!(p.window, vec![1, 22, 23, 24, 25]);
/// assert_eq!((p.start, p.end), (96, 100));
/// ```
pub fn paginate(total_items: usize, page_size: usize, requested_page: i64) -> Pagination {
    let page_size = page_size.max(1);
    let total_pages = total_items.div_ceil(page_size).max(1);
    let page = requested_page.clamp(1, total_pages as i64) as usize;
    let start = (page - 1) * page_size;

    Pagination {
        page,
        total_pages,
        page_size,
        window: window(page, total_pages),
        start,
        end: start + page_size,
    }
}

fn window(page: usize, total_pages: usize) -> Vec<usize> {
    if total_pages < FULL_WINDOW_LIMIT {
        (1..=total_pages).collect()
    } else if page < 4 {
        vec![1, 2, 3, 4, total_pages]
    } else if page > total_pages - 3 {
        vec![1, total_pages - 3, total_pages - 2, total_pages - 1, total_pages]
    } else {
        vec![1, page - 1, page, page + 1, total_pages]
    }
}
