//! Reporting utilities: dataset statistics and formatted terminal output.

use chrono::NaiveDateTime;

use crate::app::pipeline::RunOutput;
use crate::domain::SnapshotCounts;

pub mod format;

pub use format::*;

/// Headline numbers of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DatasetStats {
    pub files: usize,
    pub records_read: usize,
    pub records_skipped: usize,
    pub excluded_invalid: usize,
    pub duplicates_removed: usize,
    pub rejected_clinics: usize,
    pub unique_reports: usize,
    pub clinics_seen: usize,
    pub roster_size: usize,
    pub timestamps: usize,
    pub first_report: Option<NaiveDateTime>,
    pub last_report: Option<NaiveDateTime>,
    pub unrecognized_statuses: usize,
}

pub fn dataset_stats(run: &RunOutput) -> DatasetStats {
    let reports = &run.dedup.reports;
    DatasetStats {
        files: run.loaded.files.len(),
        records_read: run.loaded.records_read,
        records_skipped: run.loaded.skipped.len(),
        excluded_invalid: run.dedup.excluded_invalid,
        duplicates_removed: run.dedup.duplicates_removed,
        rejected_clinics: run.dedup.rejected.len(),
        unique_reports: reports.len(),
        // Every surviving clinic is counted from its first report on.
        clinics_seen: run.points.last().map_or(0, |p| p.clinics),
        roster_size: run.roster_size(),
        timestamps: run.points.len(),
        first_report: reports.first().map(|r| r.report_timestamp),
        last_report: reports.last().map(|r| r.report_timestamp),
        unrecognized_statuses: run.loaded.unrecognized_statuses,
    }
}

/// Counts at the last distinct report timestamp.
pub fn latest_counts(run: &RunOutput) -> Option<(NaiveDateTime, SnapshotCounts)> {
    run.points.last().map(|p| (p.time, p.counts))
}
