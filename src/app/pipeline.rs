//! Shared pipeline logic used by the CLI commands and the TUI.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! load snapshots -> deduplicate -> as-of snapshots -> series
//!
//! The front-ends can then focus on presentation (chart file, summary text,
//! terminal widgets).

use tracing::info_span;

use crate::domain::{RawReport, RunConfig, TimePoint};
use crate::error::AppError;
use crate::io::LoadedData;
use crate::timeline::{self, Deduplicated, StatusSeries};

/// All computed outputs of a single run.
#[derive(Debug)]
pub struct RunOutput {
    pub loaded: LoadedData,
    pub dedup: Deduplicated,
    pub points: Vec<TimePoint>,
    pub series: StatusSeries,
}

impl RunOutput {
    pub fn roster_size(&self) -> usize {
        self.loaded.roster.len()
    }
}

/// Execute the full pipeline: read the snapshot directory and reconstruct the series.
pub fn run_pipeline(config: &RunConfig) -> Result<RunOutput, AppError> {
    let mut loaded = {
        let _span = info_span!("load", dir = %config.data_dir.display()).entered();
        crate::io::load_snapshots(config)?
    };

    let raw = std::mem::take(&mut loaded.reports);
    let (dedup, points, series) = reconstruct(raw, config)?;

    Ok(RunOutput {
        loaded,
        dedup,
        points,
        series,
    })
}

/// Deduplicate, run the as-of engine, and assemble the series.
///
/// Fails with exit code 3 when nothing survives deduplication.
pub fn reconstruct(
    raw: Vec<RawReport>,
    config: &RunConfig,
) -> Result<(Deduplicated, Vec<TimePoint>, StatusSeries), AppError> {
    let _span = info_span!("reconstruct", engine = ?config.engine).entered();

    let dedup = timeline::deduplicate(raw, &config.invalid_clinic_id);
    if dedup.reports.is_empty() {
        return Err(AppError::new(3, "No valid reports remain after deduplication."));
    }

    let points = timeline::compute(&dedup.reports, config.engine);
    let series = timeline::assemble(&points);
    Ok((dedup, points, series))
}
