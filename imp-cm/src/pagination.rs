//! Pagination utilities for imp-cm
//!
//! Cursor-paged views keep a [`CursorStack`]: slot 0 is the start sentinel
//! and slot `n` holds the cursor that fetches page `n`, recorded when the
//! user advances from page `n - 1`. Offset-paged data (ranked matches) uses
//! [`calculate_window`].

use tracing::debug;

/// Opaque position in a cursor-paged listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    /// Sentinel for the first page
    Start,
    /// Continue after this item id
    After(String),
    /// Advanced past an empty page; the page is empty by definition
    Undefined,
}

impl PageCursor {
    /// Value for the `startAfter` request parameter
    pub fn start_after(&self) -> Option<&str> {
        match self {
            PageCursor::After(id) => Some(id),
            PageCursor::Start | PageCursor::Undefined => None,
        }
    }
}

/// Page index → cursor
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CursorStack {
    slots: Vec<PageCursor>,
}

impl Default for CursorStack {
    fn default() -> Self {
        Self::new()
    }
}

impl CursorStack {
    pub fn new() -> Self {
        Self {
            slots: vec![PageCursor::Start],
        }
    }

    /// Back to `[Start]`
    pub fn reset(&mut self) {
        self.slots.clear();
        self.slots.push(PageCursor::Start);
    }

    /// Cursor recorded for `page`, if that page has been reached
    pub fn resolve(&self, page: usize) -> Option<&PageCursor> {
        self.slots.get(page)
    }

    /// Record the cursor for `page + 1` from the last item of `page`.
    ///
    /// An equal recorded slot is reused; a different one is overwritten and
    /// every later slot dropped. `None` (empty page) records `Undefined`.
    pub fn advance(&mut self, page: usize, last_id: Option<&str>) {
        if page >= self.slots.len() {
            debug!(page, slots = self.slots.len(), "Advance from unrecorded page ignored");
            return;
        }

        let cursor = match last_id {
            Some(id) => PageCursor::After(id.to_string()),
            None => PageCursor::Undefined,
        };

        let next = page + 1;
        if let Some(existing) = self.slots.get(next) {
            if *existing == cursor {
                return;
            }
            self.slots.truncate(next);
        }
        self.slots.push(cursor);
    }

    /// Keep slots `0..=to_page`
    pub fn truncate(&mut self, to_page: usize) {
        self.slots.truncate(to_page + 1);
    }

    pub fn cursors(&self) -> &[PageCursor] {
        &self.slots
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }
}

/// Cursor stack plus the current page of one view
#[derive(Debug, Clone, Default)]
pub struct CursorPager {
    stack: CursorStack,
    page: usize,
    has_more: bool,
    last_id: Option<String>,
    loaded: bool,
}

impl CursorPager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Full reset to page 0
    pub fn reset(&mut self) {
        self.stack.reset();
        self.page = 0;
        self.has_more = false;
        self.last_id = None;
        self.loaded = false;
    }

    pub fn page(&self) -> usize {
        self.page
    }

    pub fn stack(&self) -> &CursorStack {
        &self.stack
    }

    /// Cursor for the current page
    pub fn current_cursor(&self) -> PageCursor {
        self.stack
            .resolve(self.page)
            .cloned()
            .unwrap_or(PageCursor::Undefined)
    }

    /// Remember what the current page returned
    pub fn record_page(&mut self, has_more: bool, last_id: Option<String>) {
        self.has_more = has_more;
        self.last_id = last_id;
        self.loaded = true;
    }

    pub fn has_more(&self) -> bool {
        self.has_more
    }

    pub fn can_go_next(&self) -> bool {
        self.loaded && self.has_more
    }

    pub fn can_go_previous(&self) -> bool {
        self.page > 0
    }

    /// Move forward one page; no-op unless the current page reported more
    pub fn next_page(&mut self) -> bool {
        if !self.can_go_next() {
            return false;
        }
        self.stack.advance(self.page, self.last_id.as_deref());
        self.page += 1;
        self.loaded = false;
        true
    }

    /// Move back one page, keeping forward cursors
    pub fn previous_page(&mut self) -> bool {
        if !self.can_go_previous() {
            return false;
        }
        self.page -= 1;
        self.loaded = false;
        true
    }
}

/// Best-effort row count of a view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageTotal {
    Exact(usize),
    AtLeast(usize),
}

impl PageTotal {
    /// Total for a cursor page whose backend reports no count
    pub fn for_cursor_page(page: usize, page_size: usize, len: usize, has_more: bool) -> Self {
        let seen = page * page_size + len;
        if has_more {
            PageTotal::AtLeast(seen + page_size)
        } else {
            PageTotal::Exact(seen)
        }
    }

    pub fn value(&self) -> usize {
        match self {
            PageTotal::Exact(n) | PageTotal::AtLeast(n) => *n,
        }
    }

    pub fn is_exact(&self) -> bool {
        matches!(self, PageTotal::Exact(_))
    }
}

/// Offset window over a fully known result set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    /// Current page number (0-indexed)
    pub page: usize,
    /// Total number of pages
    pub total_pages: usize,
    /// Index of the first row on the page
    pub offset: usize,
}

/// Calculate the window for `requested_page`, clamped to `[0, total_pages)`
///
/// # Examples
/// ```
/// use imp_cm::pagination::calculate_window;
///
/// // 25 rows at 10 per page = 3 pages (10 + 10 + 5)
/// let w = calculate_window(25, 1, 10);
/// assert_eq!(w.offset, 10);
/// assert_eq!(w.total_pages, 3);
///
/// // Out-of-bounds page gets clamped
/// let w = calculate_window(25, 99, 10);
/// assert_eq!(w.page, 2);
/// assert_eq!(w.offset, 20);
/// ```
pub fn calculate_window(total: usize, requested_page: usize, page_size: usize) -> PageWindow {
    let page_size = page_size.max(1);
    let total_pages = total.div_ceil(page_size);
    let page = requested_page.min(total_pages.saturating_sub(1));

    PageWindow {
        page,
        total_pages,
        offset: page * page_size,
    }
}
