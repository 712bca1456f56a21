//! Synthetic input data.

pub mod sample;

pub use sample::{SampleConfig, SampleSummary, Snapshot, generate_snapshots, write_sample};
