//! Input/output helpers.
//!
//! - CSV/JSON dataset ingest (`ingest`)
//! - table exports (CSV/JSON) (`export`)
//! - staged downloads (`cache`)

pub mod cache;
pub mod export;
pub mod ingest;

pub use cache::*;
pub use export::*;
pub use ingest::*;
