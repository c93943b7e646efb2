use std::ops::Range;

/// Up to this many page buttons are shown around the current page.
pub const VISIBLE_PAGE_BUTTONS: usize = 3;

/// Current page (1 based) and the fixed page size of a screen.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageWindow {
    pub page: usize,
    pub page_size: usize,
}

impl PageWindow {
    pub fn new(page_size: usize) -> Self {
        Self {
            page: 1,
            page_size: page_size.max(1),
        }
    }

    pub fn total_pages(&self, total: usize) -> usize {
        total.div_ceil(self.page_size).max(1)
    }

    /// Slice bounds of the current page inside `total` rows.
    pub fn range(&self, total: usize) -> Range<usize> {
        let start = ((self.page - 1) * self.page_size).min(total);
        let end = (self.page * self.page_size).min(total);
        start..end
    }

    pub fn reset(&mut self) {
        self.page = 1;
    }

    pub fn clamp(&mut self, total: usize) {
        self.page = self.page.clamp(1, self.total_pages(total));
    }

    pub fn next(&mut self, total: usize) -> bool {
        if self.page < self.total_pages(total) {
            self.page += 1;
            true
        } else {
            false
        }
    }

    pub fn prev(&mut self) -> bool {
        if self.page > 1 {
            self.page -= 1;
            true
        } else {
            false
        }
    }

    pub fn last(&mut self, total: usize) {
        self.page = self.total_pages(total);
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaginationBar {
    pub caption: String,
    pub buttons: Vec<usize>,
    pub current: usize,
    pub total_pages: usize,
    pub has_prev: bool,
    pub has_next: bool,
}

/// Nothing is rendered for an empty result, not even "0 of 0".
pub fn pagination_bar(window: &PageWindow, total: usize) -> Option<PaginationBar> {
    if total == 0 {
        return None;
    }
    let total_pages = window.total_pages(total);
    let current = window.page.clamp(1, total_pages);
    let range = PageWindow {
        page: current,
        ..*window
    }
    .range(total);

    let mut first = current.saturating_sub(VISIBLE_PAGE_BUTTONS / 2).max(1);
    let last = (first + VISIBLE_PAGE_BUTTONS - 1).min(total_pages);
    first = last.saturating_sub(VISIBLE_PAGE_BUTTONS - 1).max(1);

    Some(PaginationBar {
        caption: format!("Showing {}–{} of {}", range.start + 1, range.end, total),
        buttons: (first..=last).collect(),
        current,
        total_pages,
        has_prev: current > 1,
        has_next: current < total_pages,
    })
}
