//! Reporting: the plain `Table` hand-off type and fixed-width terminal output.
//!
//! We keep formatting code in one place so:
//! - the fitting and batch code stays clean and testable
//! - output changes are localized

pub mod format;
pub mod table;

pub use format::*;
pub use table::*;
