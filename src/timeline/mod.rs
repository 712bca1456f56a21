//! Status reconstruction: deduplicate → as-of snapshots → series.

pub mod asof;
pub mod dedup;
pub mod series;

pub use asof::{StatusSnapshot, brute_force, compute, distinct_times, snapshot_at, sweep};
pub use dedup::{ClinicRejection, Deduplicated, NormalizeError, deduplicate};
pub use series::{CategorySeries, StatusSeries, assemble};
