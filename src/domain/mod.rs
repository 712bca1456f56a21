//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the status vocabulary (`BedStatus`, `StatusCategory`)
//! - ingested and deduplicated reports (`RawReport`, `Report`)
//! - as-of tallies (`CategoryCounts`, `SnapshotCounts`, `TimePoint`)
//! - run configuration (`RunConfig`, `EngineKind`)

pub mod types;

pub use types::*;
