//! Input/output helpers.
//!
//! - snapshot discovery + JSON decoding (`load`)
//! - series export to CSV (`export`)

pub mod export;
pub mod load;

pub use export::*;
pub use load::*;
