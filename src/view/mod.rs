//! The reusable table used by every list screen.

pub mod column;
pub mod pagination;
pub mod search;
pub mod table;

pub use column::Column;
pub use pagination::PaginationBar;
pub use table::{DEFAULT_PAGE_SIZE, DataView, TableBody, TableFrame};
