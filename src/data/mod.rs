//! Dataset sources other than files.
//!
//! - seeded synthetic growth curves (`sample`)

pub mod sample;

pub use sample::*;
