//! Snapshot discovery and JSON decoding.
//!
//! This module turns a directory of scraped snapshot files into one flat
//! `Vec<RawReport>` that is safe to deduplicate.
//!
//! Design goals:
//! - **Typed schema** for records (unknown fields ignored, required fields checked)
//! - **Record-level isolation** (skip bad records, but report what happened)
//! - **File-level strictness** (an unreadable file aborts the run; a chart
//!   silently built from partial input would be misleading)
//! - **Append then batch**: records are pushed into one vector; sorting and
//!   grouping happen once, downstream

use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};

use chrono::NaiveDateTime;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::domain::{BedStatus, CategoryStatuses, RawReport, RunConfig};

/// Errors that abort loading.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read directory {path}: {source}")]
    DirectoryRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to read snapshot {path}: {source}")]
    FileRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON in snapshot {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("snapshot {path} is not a JSON array of records")]
    NotAnArray { path: PathBuf },

    #[error("no snapshot files (*.json) found in {path}")]
    NoSnapshots { path: PathBuf },
}

/// Errors that skip a single record.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("missing required field `{0}`")]
    MissingField(&'static str),

    #[error("invalid report timestamp '{value}' (expected format `{format}`)")]
    InvalidTimestamp { value: String, format: String },

    #[error("malformed record: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// A record skipped during loading.
#[derive(Debug)]
pub struct SkippedRecord {
    pub file: PathBuf,
    /// 0-based position inside the file's array.
    pub index: usize,
    pub clinic_id: Option<String>,
    pub error: RecordError,
}

/// Per-file bookkeeping.
#[derive(Debug, Clone)]
pub struct SnapshotFile {
    pub path: PathBuf,
    pub retrieved_at: Option<NaiveDateTime>,
    pub records: usize,
}

/// Loader output: raw reports + roster + what was skipped.
#[derive(Debug)]
pub struct LoadedData {
    pub reports: Vec<RawReport>,
    pub files: Vec<SnapshotFile>,
    /// Clinic ids present in the most recent snapshot file.
    pub roster: BTreeSet<String>,
    pub skipped: Vec<SkippedRecord>,
    /// Status values outside the known vocabularies (counted as unknown).
    pub unrecognized_statuses: usize,
    pub records_read: usize,
}

/// One snapshot record as it appears on the wire.
#[derive(Debug, Deserialize)]
struct WireRecord {
    #[serde(default, alias = "clinic_id")]
    name: Option<String>,
    #[serde(default, alias = "report_timestamp")]
    last_update: Option<String>,
    #[serde(default, alias = "status_low_care")]
    status_icu_low_care: Option<Value>,
    #[serde(default, alias = "status_high_care")]
    status_icu_high_care: Option<Value>,
    #[serde(default)]
    status_ecmo: Option<Value>,
    #[serde(default, alias = "current_cases")]
    current_case_count: Option<Value>,
    #[serde(default, alias = "details")]
    description: Option<Value>,
}

/// File-stem patterns carrying the scrape time (after any non-digit prefix).
const FILE_STEM_FORMATS: [&str; 5] = [
    "%Y-%m-%d_%H-%M-%S",
    "%Y-%m-%dT%H-%M-%S",
    "%Y%m%d_%H%M%S",
    "%Y-%m-%d_%H-%M",
    "%Y%m%d%H%M",
];

/// Fallback report-time formats tried after the configured one.
const FALLBACK_TIMESTAMP_FORMATS: [&str; 3] =
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y-%m-%dT%H:%M"];

/// Load every snapshot in `config.data_dir`.
pub fn load_snapshots(config: &RunConfig) -> Result<LoadedData, LoadError> {
    let paths = discover_snapshot_files(&config.data_dir)?;
    if paths.is_empty() {
        return Err(LoadError::NoSnapshots {
            path: config.data_dir.clone(),
        });
    }

    let mut data = LoadedData {
        reports: Vec::new(),
        files: Vec::with_capacity(paths.len()),
        roster: BTreeSet::new(),
        skipped: Vec::new(),
        unrecognized_statuses: 0,
        records_read: 0,
    };

    let last = paths.len() - 1;
    for (file_idx, path) in paths.iter().enumerate() {
        let before = data.reports.len();
        let records = load_snapshot_file(path, config, &mut data)?;
        debug!(file = %path.display(), records, "loaded snapshot");

        if file_idx == last {
            data.roster = data.reports[before..]
                .iter()
                .map(|r| r.clinic_id.clone())
                .filter(|id| *id != config.invalid_clinic_id)
                .collect();
        }
    }

    if !data.skipped.is_empty() {
        warn!(skipped = data.skipped.len(), "skipped malformed records");
    }
    info!(
        files = data.files.len(),
        records = data.records_read,
        reports = data.reports.len(),
        roster = data.roster.len(),
        "loaded snapshots"
    );

    Ok(data)
}

/// List `*.json` files in `dir`, sorted by file name (= chronological).
pub fn discover_snapshot_files(dir: &Path) -> Result<Vec<PathBuf>, LoadError> {
    let read_dir_err = |source| LoadError::DirectoryRead {
        path: dir.to_path_buf(),
        source,
    };

    let mut paths = Vec::new();
    for entry in fs::read_dir(dir).map_err(read_dir_err)? {
        let path = entry.map_err(read_dir_err)?.path();
        let is_json = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json && path.is_file() {
            paths.push(path);
        }
    }

    paths.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    Ok(paths)
}

/// Parse the scrape time encoded in a snapshot file name.
pub fn retrieval_time_from_path(path: &Path) -> Option<NaiveDateTime> {
    let stem = path.file_stem()?.to_str()?;
    let stem = stem.trim_start_matches(|c: char| !c.is_ascii_digit());
    FILE_STEM_FORMATS
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(stem, fmt).ok())
}

fn load_snapshot_file(path: &Path, config: &RunConfig, data: &mut LoadedData) -> Result<usize, LoadError> {
    let text = fs::read_to_string(path).map_err(|source| LoadError::FileRead {
        path: path.to_path_buf(),
        source,
    })?;
    let document: Value = serde_json::from_str(&text).map_err(|source| LoadError::Json {
        path: path.to_path_buf(),
        source,
    })?;
    let Value::Array(records) = document else {
        return Err(LoadError::NotAnArray {
            path: path.to_path_buf(),
        });
    };

    let retrieved_at = retrieval_time_from_path(path);
    let count = records.len();
    data.records_read += count;

    for (index, value) in records.into_iter().enumerate() {
        let sequence = data.records_read - count + index;
        match parse_record(value, &config.timestamp_format, &mut data.unrecognized_statuses) {
            Ok(mut report) => {
                report.retrieved_at = retrieved_at;
                report.sequence = sequence;
                data.reports.push(report);
            }
            Err((clinic_id, error)) => {
                debug!(file = %path.display(), index, %error, "skipping record");
                data.skipped.push(SkippedRecord {
                    file: path.to_path_buf(),
                    index,
                    clinic_id,
                    error,
                });
            }
        }
    }

    data.files.push(SnapshotFile {
        path: path.to_path_buf(),
        retrieved_at,
        records: count,
    });
    Ok(count)
}

/// Decode one JSON record.
///
/// On failure the clinic id is returned alongside the error when it could be
/// read, so the skip can be attributed.
pub fn parse_record(
    value: Value,
    timestamp_format: &str,
    unrecognized: &mut usize,
) -> Result<RawReport, (Option<String>, RecordError)> {
    let wire: WireRecord = serde_json::from_value(value).map_err(|e| (None, RecordError::from(e)))?;

    let clinic_id = wire
        .name
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .ok_or((None, RecordError::MissingField("name")))?;

    let Some(raw_ts) = wire.last_update.as_deref().map(str::trim).filter(|s| !s.is_empty()) else {
        return Err((Some(clinic_id), RecordError::MissingField("last_update")));
    };
    let report_timestamp = match parse_report_timestamp(raw_ts, timestamp_format) {
        Ok(ts) => ts,
        Err(e) => return Err((Some(clinic_id), e)),
    };

    let statuses = CategoryStatuses::new(
        parse_status(wire.status_icu_low_care.as_ref(), unrecognized),
        parse_status(wire.status_icu_high_care.as_ref(), unrecognized),
        parse_status(wire.status_ecmo.as_ref(), unrecognized),
    );

    Ok(RawReport {
        clinic_id,
        report_timestamp,
        statuses,
        case_count: wire.current_case_count.filter(|v| !v.is_null()),
        details: wire.description.filter(|v| !v.is_null()),
        retrieved_at: None,
        sequence: 0,
    })
}

/// Parse a report time with the configured format, then ISO fallbacks.
pub fn parse_report_timestamp(s: &str, format: &str) -> Result<NaiveDateTime, RecordError> {
    std::iter::once(format)
        .chain(FALLBACK_TIMESTAMP_FORMATS)
        .find_map(|fmt| NaiveDateTime::parse_from_str(s, fmt).ok())
        .ok_or_else(|| RecordError::InvalidTimestamp {
            value: s.to_string(),
            format: format.to_string(),
        })
}

fn parse_status(value: Option<&Value>, unrecognized: &mut usize) -> BedStatus {
    match value {
        None | Some(Value::Null) => BedStatus::Unknown,
        Some(Value::String(token)) => BedStatus::parse_token(token).unwrap_or_else(|| {
            debug!(token = %token, "unrecognized status value");
            *unrecognized += 1;
            BedStatus::Unknown
        }),
        Some(other) => {
            debug!(value = %other, "non-string status value");
            *unrecognized += 1;
            BedStatus::Unknown
        }
    }
}

#[cfg(test)]
mod tests {
    use chrono::NaiveDate;
    use serde_json::json;

    use super::*;
    use crate::domain::DEFAULT_TIMESTAMP_FORMAT;

    fn ts(d: u32, h: u32, m: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(2020, 4, d)
            .unwrap()
            .and_hms_opt(h, m, 0)
            .unwrap()
    }

    #[test]
    fn parses_register_record() {
        let mut unrecognized = 0;
        let report = parse_record(
            json!({
                "name": "Klinikum Nord",
                "last_update": "02.04.2020 13:45",
                "status_icu_low_care": "available",
                "status_icu_high_care": "BEGRENZT",
                "status_ecmo": null,
                "description": {"address": "Nordstr. 1", "phone": "0123"},
                "unrelated": 7
            }),
            DEFAULT_TIMESTAMP_FORMAT,
            &mut unrecognized,
        )
        .unwrap();

        assert_eq!(report.clinic_id, "Klinikum Nord");
        assert_eq!(report.report_timestamp, ts(2, 13, 45));
        assert_eq!(report.statuses.low_care, BedStatus::Available);
        assert_eq!(report.statuses.high_care, BedStatus::Limited);
        assert_eq!(report.statuses.ecmo, BedStatus::Unknown);
        assert!(report.case_count.is_none());
        assert!(report.details.is_some());
        assert_eq!(unrecognized, 0);
    }

    #[test]
    fn unknown_status_tokens_are_counted_not_fatal() {
        let mut unrecognized = 0;
        let report = parse_record(
            json!({
                "name": "A",
                "last_update": "2020-04-02T10:00:00",
                "status_icu_low_care": "ROT",
                "status_icu_high_care": 3,
            }),
            DEFAULT_TIMESTAMP_FORMAT,
            &mut unrecognized,
        )
        .unwrap();

        assert_eq!(report.statuses, CategoryStatuses::uniform(BedStatus::Unknown));
        assert_eq!(unrecognized, 2);
        assert_eq!(report.report_timestamp, ts(2, 10, 0));
    }

    #[test]
    fn missing_required_fields_are_explicit_errors() {
        let mut unrecognized = 0;
        let (id, err) = parse_record(json!({"last_update": "02.04.2020 13:45"}), DEFAULT_TIMESTAMP_FORMAT, &mut unrecognized)
            .unwrap_err();
        assert!(id.is_none());
        assert!(matches!(err, RecordError::MissingField("name")));

        let (id, err) = parse_record(json!({"name": "B"}), DEFAULT_TIMESTAMP_FORMAT, &mut unrecognized).unwrap_err();
        assert_eq!(id.as_deref(), Some("B"));
        assert!(matches!(err, RecordError::MissingField("last_update")));

        let (_, err) = parse_record(json!({"name": "B", "last_update": "yesterday"}), DEFAULT_TIMESTAMP_FORMAT, &mut unrecognized)
            .unwrap_err();
        assert!(matches!(err, RecordError::InvalidTimestamp { .. }));

        let (_, err) = parse_record(json!({"name": 17, "last_update": "02.04.2020 13:45"}), DEFAULT_TIMESTAMP_FORMAT, &mut unrecognized)
            .unwrap_err();
        assert!(matches!(err, RecordError::Malformed(_)));
    }

    #[test]
    fn retrieval_time_from_file_names() {
        assert_eq!(
            retrieval_time_from_path(Path::new("data/2020-04-03_12-30-00.json")),
            Some(ts(3, 12, 30))
        );
        assert_eq!(
            retrieval_time_from_path(Path::new("divi_20200403_123000.json")),
            Some(ts(3, 12, 30))
        );
        assert_eq!(retrieval_time_from_path(Path::new("latest.json")), None);
    }

    #[test]
    fn loads_directory_in_name_order_and_builds_roster() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(
            dir.path().join("2020-04-02_00-00-00.json"),
            json!([
                {"name": "A", "last_update": "01.04.2020 08:00", "status_icu_low_care": "available"},
                {"name": "Old", "last_update": "01.04.2020 09:00"},
            ])
            .to_string(),
        )
        .unwrap();
        fs::write(
            dir.path().join("2020-04-03_00-00-00.json"),
            json!([
                {"name": "A", "last_update": "02.04.2020 08:00", "status_icu_low_care": "limited"},
                {"name": "invalid", "last_update": "02.04.2020 08:00"},
                {"last_update": "02.04.2020 08:00"},
            ])
            .to_string(),
        )
        .unwrap();
        fs::write(dir.path().join("notes.txt"), "ignored").unwrap();

        let data = load_snapshots(&RunConfig::for_dir(dir.path())).unwrap();
        assert_eq!(data.files.len(), 2);
        assert_eq!(data.records_read, 5);
        assert_eq!(data.reports.len(), 4);
        assert_eq!(data.skipped.len(), 1);
        assert_eq!(data.roster.iter().collect::<Vec<_>>(), vec!["A"]);
        assert_eq!(data.reports[0].retrieved_at, Some(ts(2, 0, 0)));

        let sequences: Vec<usize> = data.reports.iter().map(|r| r.sequence).collect();
        assert_eq!(sequences, vec![0, 1, 2, 3]);
    }

    #[test]
    fn non_array_file_aborts() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("2020-04-02_00-00-00.json"), "{\"data\": []}").unwrap();
        let err = load_snapshots(&RunConfig::for_dir(dir.path())).unwrap_err();
        assert!(matches!(err, LoadError::NotAnArray { .. }));
    }

    #[test]
    fn empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        let err = load_snapshots(&RunConfig::for_dir(dir.path())).unwrap_err();
        assert!(matches!(err, LoadError::NoSnapshots { .. }));
    }
}
