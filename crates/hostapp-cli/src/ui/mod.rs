//! Terminal output.
//!
//! - [`theme`] - Colors, icons, and column widths
//! - [`output`] - Console reporter used by every command
//! - [`list`] - App tables, plans and verification reports

pub mod list;
pub mod output;
pub mod theme;

pub use output::Output;
pub use theme::Theme;
