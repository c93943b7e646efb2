use std::time::Instant;

use tracing::trace;

use super::column::Column;
use super::pagination::{PageWindow, PaginationBar, pagination_bar};
use super::search::search;
use crate::domain::SKELETON_ROWS;
use crate::records::Record;

pub const DEFAULT_PAGE_SIZE: usize = 25;

/// What the table area shows, in order of precedence.
#[derive(Debug, Clone, PartialEq)]
pub enum TableBody {
    /// Loading with no rows yet.
    Skeleton { rows: usize, columns: usize },
    /// A single full width message row.
    Empty(String),
    Rows(Vec<Vec<String>>),
}

/// Everything the UI needs to draw one table, already resolved to text.
#[derive(Debug, Clone, PartialEq)]
pub struct TableFrame {
    pub headers: Vec<String>,
    pub widths: Vec<Option<u16>>,
    pub body: TableBody,
    pub pagination: Option<PaginationBar>,
    /// `None` when the screen has nothing to search in.
    pub search: Option<String>,
    pub selected: Option<usize>,
    pub loading: bool,
}

/// Searchable, paginated view over an in-memory row sequence.
///
/// Performs no I/O. Rows are replaced wholesale on every refresh and the
/// filtered sequence is recomputed from scratch on every query change.
pub struct DataView<R: Record> {
    rows: Vec<R>,
    columns: Vec<Column<R>>,
    search_fields: Vec<String>,
    query: String,
    matches: Vec<usize>,
    window: PageWindow,
    cursor: usize,
    loading: bool,
    placeholder: String,
    empty_message: String,
    skeleton_rows: usize,
}

impl<R: Record> DataView<R> {
    /// Search fields default to the keys of the given columns.
    pub fn new(columns: Vec<Column<R>>) -> Self {
        let search_fields = columns.iter().filter_map(|c| c.key.clone()).collect();
        Self {
            rows: Vec::new(),
            columns,
            search_fields,
            query: String::new(),
            matches: Vec::new(),
            window: PageWindow::new(DEFAULT_PAGE_SIZE),
            cursor: 0,
            loading: false,
            placeholder: "-".to_string(),
            empty_message: "No records found".to_string(),
            skeleton_rows: SKELETON_ROWS,
        }
    }

    pub fn search_fields(mut self, fields: &[&str]) -> Self {
        self.search_fields = fields.iter().map(|f| f.to_string()).collect();
        self.refilter();
        self
    }

    pub fn page_size(mut self, page_size: usize) -> Self {
        self.window = PageWindow::new(page_size);
        self
    }

    pub fn placeholder(mut self, placeholder: &str) -> Self {
        self.placeholder = placeholder.to_string();
        self
    }

    pub fn empty_message(mut self, message: &str) -> Self {
        self.empty_message = message.to_string();
        self
    }

    pub fn skeleton_rows(mut self, count: usize) -> Self {
        self.skeleton_rows = count;
        self
    }

    pub fn set_rows(&mut self, rows: Vec<R>) {
        self.rows = rows;
        self.refilter();
        self.window.clamp(self.matches.len());
        self.clamp_cursor();
    }

    pub fn set_empty_message(&mut self, message: &str) {
        self.empty_message = message.to_string();
    }

    pub fn set_loading(&mut self, loading: bool) {
        self.loading = loading;
    }

    /// Updates the query and jumps back to the first page.
    pub fn set_query(&mut self, query: &str) {
        if self.query == query {
            return;
        }
        self.query = query.to_string();
        self.window.reset();
        self.cursor = 0;
        self.refilter();
    }

    pub fn query(&self) -> &str {
        &self.query
    }

    pub fn is_searchable(&self) -> bool {
        !self.search_fields.is_empty()
    }

    pub fn rows(&self) -> &[R] {
        &self.rows
    }

    pub fn columns(&self) -> &[Column<R>] {
        &self.columns
    }

    #[cfg(test)]
    pub fn filtered_len(&self) -> usize {
        self.matches.len()
    }

    pub fn page(&self) -> usize {
        self.window.page
    }

    pub fn total_pages(&self) -> usize {
        self.window.total_pages(self.matches.len())
    }

    pub fn filtered(&self) -> impl Iterator<Item = &R> {
        self.matches.iter().map(|&idx| &self.rows[idx])
    }

    /// Rows on the current page.
    pub fn visible(&self) -> Vec<&R> {
        self.matches[self.window.range(self.matches.len())]
            .iter()
            .map(|&idx| &self.rows[idx])
            .collect()
    }

    pub fn selected(&self) -> Option<&R> {
        self.visible().get(self.cursor).copied()
    }

    pub fn next_page(&mut self) {
        if self.window.next(self.matches.len()) {
            self.cursor = 0;
        }
    }

    pub fn prev_page(&mut self) {
        if self.window.prev() {
            self.cursor = 0;
        }
    }

    pub fn first_page(&mut self) {
        self.window.reset();
        self.cursor = 0;
    }

    pub fn last_page(&mut self) {
        self.window.last(self.matches.len());
        self.cursor = 0;
    }

    pub fn move_up(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_down(&mut self) {
        let len = self.window.range(self.matches.len()).len();
        if self.cursor + 1 < len {
            self.cursor += 1;
        }
    }

    /// Resolves the current page into text.
    pub fn frame(&self) -> TableFrame {
        let body = if self.loading && self.rows.is_empty() {
            TableBody::Skeleton {
                rows: self.skeleton_rows,
                columns: self.columns.len(),
            }
        } else if self.matches.is_empty() {
            TableBody::Empty(self.empty_message.clone())
        } else {
            TableBody::Rows(
                self.visible()
                    .into_iter()
                    .map(|row| self.render_row(row))
                    .collect(),
            )
        };
        let has_rows = matches!(body, TableBody::Rows(_));

        TableFrame {
            headers: self.columns.iter().map(|c| c.header.clone()).collect(),
            widths: self.columns.iter().map(|c| c.width).collect(),
            body,
            pagination: pagination_bar(&self.window, self.matches.len()),
            search: self.is_searchable().then(|| self.query.clone()),
            selected: has_rows.then_some(self.cursor),
            loading: self.loading,
        }
    }

    pub fn render_row(&self, row: &R) -> Vec<String> {
        self.columns
            .iter()
            .map(|c| c.cell_text(row, &self.placeholder))
            .collect()
    }

    /// The selected row as one CSV line, in column order.
    pub fn selected_as_csv(&self) -> Option<String> {
        let row = self.selected()?;
        Some(
            self.render_row(row)
                .iter()
                .map(|c| wrap_cell_content(c))
                .collect::<Vec<String>>()
                .join(","),
        )
    }

    fn refilter(&mut self) {
        let start_time = Instant::now();
        self.matches = search(&self.rows, &self.search_fields, &self.columns, &self.query);
        trace!(
            "Search \"{}\" kept {}/{} rows in {}us",
            self.query,
            self.matches.len(),
            self.rows.len(),
            start_time.elapsed().as_micros()
        );
    }

    fn clamp_cursor(&mut self) {
        let len = self.window.range(self.matches.len()).len();
        self.cursor = self.cursor.min(len.saturating_sub(1));
    }
}

fn wrap_cell_content(c: &str) -> String {
    let needs_escaping = c.contains('"');
    let needs_wrapping = c.chars().any(|c| c == ' ' || c == '\t' || c == ',' || c == '"');
    let mut out = String::from(c);

    if needs_escaping {
        out = out.replace('"', "\"\"");
    }
    if needs_wrapping {
        out = format!("\"{out}\"");
    }
    out
}
