//! Shared domain types.
//!
//! These types are intentionally kept small and explicit so they can be:
//!
//! - produced by the loader from free-form snapshot JSON
//! - compared/hashed during deduplication
//! - tallied by the as-of engine without any string handling

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// Clinic id used by the scraper for placeholder rows.
pub const DEFAULT_INVALID_CLINIC_ID: &str = "invalid";

/// Report timestamp format used by the register feed (`17.03.2020 14:05`).
pub const DEFAULT_TIMESTAMP_FORMAT: &str = "%d.%m.%Y %H:%M";

/// Availability status of one capacity category at one clinic.
///
/// Variant order is the stacking order of the chart (bottom to top) and the
/// column order of every export. `Unknown` is a real bucket: a clinic that
/// reported without a usable status is still counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BedStatus {
    Available,
    Limited,
    Occupied,
    Unknown,
}

impl BedStatus {
    pub const ALL: [BedStatus; 4] = [
        BedStatus::Available,
        BedStatus::Limited,
        BedStatus::Occupied,
        BedStatus::Unknown,
    ];

    /// Position in `ALL` (and in every per-status array).
    pub fn index(self) -> usize {
        match self {
            BedStatus::Available => 0,
            BedStatus::Limited => 1,
            BedStatus::Occupied => 2,
            BedStatus::Unknown => 3,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            BedStatus::Available => "available",
            BedStatus::Limited => "limited",
            BedStatus::Occupied => "occupied",
            BedStatus::Unknown => "unknown",
        }
    }

    /// Parse a status token from either feed generation.
    ///
    /// The legacy feed spelled the grey "no information" state `unavailable`;
    /// the current feed uses `NICHT_VERFUEGBAR` for "no capacity" (red). The
    /// two are therefore *not* the same bucket. Returns `None` for tokens
    /// outside both vocabularies.
    pub fn parse_token(raw: &str) -> Option<BedStatus> {
        let token = raw.trim();
        if token.is_empty() {
            return Some(BedStatus::Unknown);
        }
        let token = token.to_ascii_uppercase();
        match token.as_str() {
            "AVAILABLE" | "VERFUEGBAR" => Some(BedStatus::Available),
            "LIMITED" | "BEGRENZT" => Some(BedStatus::Limited),
            "OCCUPIED" | "NICHT_VERFUEGBAR" => Some(BedStatus::Occupied),
            "UNAVAILABLE" | "KEINE_ANGABE" | "NAN" | "UNKNOWN" => Some(BedStatus::Unknown),
            _ => None,
        }
    }
}

/// One of the three tracked capacity types.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StatusCategory {
    LowCare,
    HighCare,
    Ecmo,
}

impl StatusCategory {
    pub const ALL: [StatusCategory; 3] = [
        StatusCategory::LowCare,
        StatusCategory::HighCare,
        StatusCategory::Ecmo,
    ];

    pub fn index(self) -> usize {
        match self {
            StatusCategory::LowCare => 0,
            StatusCategory::HighCare => 1,
            StatusCategory::Ecmo => 2,
        }
    }

    /// Field name in the snapshot JSON (also used as export column prefix).
    pub fn field_name(self) -> &'static str {
        match self {
            StatusCategory::LowCare => "status_icu_low_care",
            StatusCategory::HighCare => "status_icu_high_care",
            StatusCategory::Ecmo => "status_ecmo",
        }
    }

    /// Human-readable label for chart titles and terminal output.
    pub fn display_name(self) -> &'static str {
        match self {
            StatusCategory::LowCare => "ICU low care",
            StatusCategory::HighCare => "ICU high care",
            StatusCategory::Ecmo => "ECMO",
        }
    }
}

/// The three statuses carried by every report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct CategoryStatuses {
    pub low_care: BedStatus,
    pub high_care: BedStatus,
    pub ecmo: BedStatus,
}

impl CategoryStatuses {
    pub fn new(low_care: BedStatus, high_care: BedStatus, ecmo: BedStatus) -> Self {
        Self { low_care, high_care, ecmo }
    }

    /// All three categories holding the same status.
    pub fn uniform(status: BedStatus) -> Self {
        Self::new(status, status, status)
    }

    pub fn get(&self, category: StatusCategory) -> BedStatus {
        match category {
            StatusCategory::LowCare => self.low_care,
            StatusCategory::HighCare => self.high_care,
            StatusCategory::Ecmo => self.ecmo,
        }
    }
}

impl Default for CategoryStatuses {
    fn default() -> Self {
        Self::uniform(BedStatus::Unknown)
    }
}

/// One record exactly as ingested from a snapshot file.
///
/// Structured sub-fields are kept as raw JSON; the deduplicator is the one
/// place that normalizes them.
#[derive(Debug, Clone, PartialEq)]
pub struct RawReport {
    pub clinic_id: String,
    pub report_timestamp: NaiveDateTime,
    pub statuses: CategoryStatuses,
    /// Current case count as found in the file (`None` when absent).
    pub case_count: Option<serde_json::Value>,
    /// Nested description block (`None` when absent).
    pub details: Option<serde_json::Value>,
    /// Scrape time encoded in the snapshot file name, when it parses.
    pub retrieved_at: Option<NaiveDateTime>,
    /// Global ingestion order (file order, then record order).
    pub sequence: usize,
}

/// A report that survived deduplication (a "unique report").
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub clinic_id: String,
    pub report_timestamp: NaiveDateTime,
    pub statuses: CategoryStatuses,
    pub case_count: i64,
    pub details: Option<serde_json::Value>,
}

impl From<&Report> for RawReport {
    fn from(report: &Report) -> Self {
        Self {
            clinic_id: report.clinic_id.clone(),
            report_timestamp: report.report_timestamp,
            statuses: report.statuses,
            case_count: Some(serde_json::Value::from(report.case_count)),
            details: report.details.clone(),
            retrieved_at: None,
            sequence: 0,
        }
    }
}

/// Number of clinics per status value for one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CategoryCounts([usize; 4]);

impl CategoryCounts {
    pub fn get(&self, status: BedStatus) -> usize {
        self.0[status.index()]
    }

    pub fn increment(&mut self, status: BedStatus) {
        self.0[status.index()] += 1;
    }

    /// Remove one clinic from `status`.
    ///
    /// Only called for a status previously added, so the count is non-zero.
    pub fn decrement(&mut self, status: BedStatus) {
        let slot = &mut self.0[status.index()];
        debug_assert!(*slot > 0, "decrement of empty {status:?} bucket");
        *slot -= 1;
    }

    pub fn total(&self) -> usize {
        self.0.iter().sum()
    }

    pub fn as_array(&self) -> [usize; 4] {
        self.0
    }
}

impl From<[usize; 4]> for CategoryCounts {
    fn from(value: [usize; 4]) -> Self {
        Self(value)
    }
}

/// Tally of one as-of snapshot: counts for each of the three categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SnapshotCounts([CategoryCounts; 3]);

impl SnapshotCounts {
    pub fn category(&self, category: StatusCategory) -> &CategoryCounts {
        &self.0[category.index()]
    }

    pub fn add(&mut self, statuses: &CategoryStatuses) {
        for category in StatusCategory::ALL {
            self.0[category.index()].increment(statuses.get(category));
        }
    }

    pub fn remove(&mut self, statuses: &CategoryStatuses) {
        for category in StatusCategory::ALL {
            self.0[category.index()].decrement(statuses.get(category));
        }
    }
}

/// The aggregate state at one distinct report timestamp.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimePoint {
    pub time: NaiveDateTime,
    /// Clinics with at least one report at or before `time`.
    pub clinics: usize,
    pub counts: SnapshotCounts,
}

/// Which as-of implementation to run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum EngineKind {
    /// Single sweep keeping the latest report per clinic (default).
    Incremental,
    /// Recompute every snapshot from scratch, one rayon task per timestamp.
    BruteForce,
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags, environment and defaults.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub data_dir: PathBuf,
    pub output: PathBuf,
    pub invalid_clinic_id: String,
    /// chrono format string for `last_update`.
    pub timestamp_format: String,
    pub engine: EngineKind,

    /// Left edge of the time axis ("start of reliable data").
    pub x_start: NaiveDate,
    /// Right edge of the time axis; `None` means "now".
    pub x_end: Option<NaiveDateTime>,
    pub width: u32,
    pub height: u32,

    pub export_csv: Option<PathBuf>,
}

impl RunConfig {
    /// Defaults for a data directory (used by tests and the TUI).
    pub fn for_dir(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            output: PathBuf::from("plot.png"),
            invalid_clinic_id: DEFAULT_INVALID_CLINIC_ID.to_string(),
            timestamp_format: DEFAULT_TIMESTAMP_FORMAT.to_string(),
            engine: EngineKind::Incremental,
            x_start: default_x_start(),
            x_end: None,
            width: 3000,
            height: 3000,
            export_csv: None,
        }
    }
}

/// First day of usable register data.
pub fn default_x_start() -> NaiveDate {
    NaiveDate::from_ymd_opt(2020, 3, 17).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_both_feed_vocabularies() {
        assert_eq!(BedStatus::parse_token("available"), Some(BedStatus::Available));
        assert_eq!(BedStatus::parse_token("VERFUEGBAR"), Some(BedStatus::Available));
        assert_eq!(BedStatus::parse_token(" begrenzt "), Some(BedStatus::Limited));
        assert_eq!(BedStatus::parse_token("NICHT_VERFUEGBAR"), Some(BedStatus::Occupied));
        assert_eq!(BedStatus::parse_token("occupied"), Some(BedStatus::Occupied));
    }

    #[test]
    fn legacy_unavailable_is_the_no_information_bucket() {
        assert_eq!(BedStatus::parse_token("unavailable"), Some(BedStatus::Unknown));
        assert_eq!(BedStatus::parse_token("NaN"), Some(BedStatus::Unknown));
        assert_eq!(BedStatus::parse_token(""), Some(BedStatus::Unknown));
        assert_ne!(
            BedStatus::parse_token("unavailable"),
            BedStatus::parse_token("NICHT_VERFUEGBAR")
        );
    }

    #[test]
    fn unrecognized_token_is_none() {
        assert_eq!(BedStatus::parse_token("ROT"), None);
    }

    #[test]
    fn index_matches_all_order() {
        for (i, status) in BedStatus::ALL.iter().enumerate() {
            assert_eq!(status.index(), i);
        }
        for (i, category) in StatusCategory::ALL.iter().enumerate() {
            assert_eq!(category.index(), i);
        }
    }

    #[test]
    fn snapshot_counts_add_remove() {
        let mut counts = SnapshotCounts::default();
        let a = CategoryStatuses::new(BedStatus::Available, BedStatus::Limited, BedStatus::Unknown);
        counts.add(&a);
        counts.add(&CategoryStatuses::uniform(BedStatus::Occupied));
        assert_eq!(counts.category(StatusCategory::LowCare).as_array(), [1, 0, 1, 0]);
        assert_eq!(counts.category(StatusCategory::Ecmo).as_array(), [0, 0, 1, 1]);

        counts.remove(&a);
        assert_eq!(counts.category(StatusCategory::HighCare).as_array(), [0, 0, 1, 0]);
        assert_eq!(counts.category(StatusCategory::HighCare).total(), 1);

        counts.remove(&CategoryStatuses::uniform(BedStatus::Occupied));
        for category in StatusCategory::ALL {
            assert_eq!(counts.category(category).total(), 0);
        }
    }

    #[test]
    #[cfg(debug_assertions)]
    #[should_panic(expected = "decrement of empty")]
    fn removing_a_status_never_added_panics() {
        let mut counts = SnapshotCounts::default();
        counts.add(&CategoryStatuses::uniform(BedStatus::Available));
        counts.remove(&CategoryStatuses::uniform(BedStatus::Limited));
    }
}
