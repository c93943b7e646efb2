//! Canonical row types.
//!
//! Raw JSON rows are converted exactly once, when a fetch result is applied
//! to a page. Everything downstream of this module works with typed records.

pub mod fields;
pub mod repair;
pub mod settings;
pub mod store;

use chrono::NaiveDate;
use serde_json::Value;

pub use repair::{GatePassFollowup, RepairPayment, RepairTask};
pub use settings::UserAccount;
pub use store::{IndentLine, PurchaseOrder, StockItem, StoreOutRequest, VendorRate};

/// A single typed cell value.
#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Int(i64),
    Number(f64),
    Date(NaiveDate),
}

impl Cell {
    /// Locale free string form, the one search matches against.
    pub fn raw(&self) -> String {
        match self {
            Cell::Text(s) => s.clone(),
            Cell::Int(i) => i.to_string(),
            Cell::Number(n) => n.to_string(),
            Cell::Date(d) => d.format("%Y-%m-%d").to_string(),
        }
    }

    pub fn display(&self) -> String {
        match self {
            Cell::Date(d) => d.format("%d %b %Y").to_string(),
            other => other.raw(),
        }
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Cell::Text(s) if s.trim().is_empty())
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Cell::Int(i) => Some(*i as f64),
            Cell::Number(n) => Some(*n),
            Cell::Text(s) => s.parse().ok(),
            Cell::Date(_) => None,
        }
    }
}

impl From<String> for Cell {
    fn from(value: String) -> Self {
        Cell::Text(value)
    }
}

impl From<&str> for Cell {
    fn from(value: &str) -> Self {
        Cell::Text(value.to_string())
    }
}

impl From<f64> for Cell {
    fn from(value: f64) -> Self {
        Cell::Number(value)
    }
}

impl From<i64> for Cell {
    fn from(value: i64) -> Self {
        Cell::Int(value)
    }
}

impl From<NaiveDate> for Cell {
    fn from(value: NaiveDate) -> Self {
        Cell::Date(value)
    }
}

/// Helper for optional struct fields.
pub fn cell<T: Into<Cell> + Clone>(value: &Option<T>) -> Option<Cell> {
    value.clone().map(Into::into)
}

/// A row that the table view can render and search.
pub trait Record: Send + Sync + 'static {
    fn from_json(raw: &Value) -> Self
    where
        Self: Sized;

    fn value(&self, key: &str) -> Option<Cell>;

    /// Explicit identity, when the backend provides one.
    fn row_key(&self) -> Option<String> {
        None
    }
}

/// Formats money the way the screens show it, two decimals with a rupee sign.
pub fn money(value: f64) -> String {
    let negative = value < 0.0;
    let cents = (value.abs() * 100.0).round() as u64;
    let whole = (cents / 100).to_string();
    let mut grouped = String::new();
    // Indian grouping: last three digits, then pairs.
    let (head, tail) = whole.split_at(whole.len().saturating_sub(3));
    let head_chars: Vec<char> = head.chars().collect();
    for (i, c) in head_chars.iter().enumerate() {
        if i > 0 && (head_chars.len() - i) % 2 == 0 {
            grouped.push(',');
        }
        grouped.push(*c);
    }
    if !head.is_empty() {
        grouped.push(',');
    }
    grouped.push_str(tail);
    format!(
        "{}₹{}.{:02}",
        if negative { "-" } else { "" },
        grouped,
        cents % 100
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn raw_and_display_forms() {
        let date = Cell::Date(NaiveDate::from_ymd_opt(2024, 1, 12).unwrap());
        assert_eq!(date.raw(), "2024-01-12");
        assert_eq!(date.display(), "12 Jan 2024");
        assert_eq!(Cell::Number(1200.0).raw(), "1200");
        assert_eq!(Cell::Number(12.5).raw(), "12.5");
        assert_eq!(Cell::Int(42).display(), "42");
    }

    #[test]
    fn blank_text() {
        assert!(Cell::from("  ").is_blank());
        assert!(!Cell::from("-").is_blank());
        assert!(!Cell::Int(0).is_blank());
    }

    #[test]
    fn money_uses_indian_grouping() {
        assert_eq!(money(0.0), "₹0.00");
        assert_eq!(money(999.5), "₹999.50");
        assert_eq!(money(1234.0), "₹1,234.00");
        assert_eq!(money(1234567.891), "₹12,34,567.89");
        assert_eq!(money(-50.0), "-₹50.00");
    }
}
