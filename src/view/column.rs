use std::fmt;
use std::sync::Arc;

use crate::records::{Record, money};

pub type Renderer<R> = Arc<dyn Fn(&R) -> Option<String> + Send + Sync>;

/// Describes how one field is labelled and rendered across all rows.
pub struct Column<R> {
    pub key: Option<String>,
    pub header: String,
    pub width: Option<u16>,
    render: Option<Renderer<R>>,
}

impl<R> Clone for Column<R> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            header: self.header.clone(),
            width: self.width,
            render: self.render.clone(),
        }
    }
}

impl<R> fmt::Debug for Column<R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("key", &self.key)
            .field("header", &self.header)
            .field("width", &self.width)
            .field("custom_render", &self.render.is_some())
            .finish()
    }
}

impl<R: Record> Column<R> {
    pub fn new(key: &str, header: &str) -> Self {
        Self {
            key: Some(key.to_string()),
            header: header.to_string(),
            width: None,
            render: None,
        }
    }

    /// A column without a backing field, e.g. a status summary.
    pub fn computed<F>(header: &str, render: F) -> Self
    where
        F: Fn(&R) -> Option<String> + Send + Sync + 'static,
    {
        Self {
            key: None,
            header: header.to_string(),
            width: None,
            render: Some(Arc::new(render)),
        }
    }

    pub fn money(key: &str, header: &str) -> Self {
        let field = key.to_string();
        Self::new(key, header).render_with(move |row: &R| {
            row.value(&field).and_then(|c| c.as_f64()).map(money)
        })
    }

    pub fn render_with<F>(mut self, render: F) -> Self
    where
        F: Fn(&R) -> Option<String> + Send + Sync + 'static,
    {
        self.render = Some(Arc::new(render));
        self
    }

    pub fn width(mut self, width: u16) -> Self {
        self.width = Some(width);
        self
    }

    /// The cell text, or `None` when there is nothing to show.
    pub fn resolve(&self, row: &R) -> Option<String> {
        let text = match &self.render {
            Some(render) => render(row),
            None => {
                let key = self.key.as_deref()?;
                row.value(key)
                    .filter(|c| !c.is_blank())
                    .map(|c| c.display())
            }
        };
        text.filter(|s| !s.trim().is_empty())
    }

    pub fn cell_text(&self, row: &R, placeholder: &str) -> String {
        self.resolve(row).unwrap_or_else(|| placeholder.to_string())
    }
}
