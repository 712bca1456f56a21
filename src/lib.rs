//! `icu-timeline` library crate.
//!
//! The binary (`icu`) is a thin wrapper around this library so that:
//!
//! - core logic is testable without spawning processes
//! - the chart, summary, and terminal view share one pipeline

pub mod app;
pub mod cli;
pub mod data;
pub mod domain;
pub mod error;
pub mod io;
pub mod logging;
pub mod render;
pub mod report;
pub mod timeline;
pub mod tui;
