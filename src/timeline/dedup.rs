//! Deduplication of raw reports.
//!
//! The scraper re-emits every clinic's current report on every run, so the
//! same report shows up in many snapshot files. This step keeps one copy of
//! each distinct report per clinic and orders the survivors by report time.

use std::collections::{HashMap, HashSet};

use chrono::NaiveDateTime;
use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};

use crate::domain::{CategoryStatuses, RawReport, Report};

/// A structured field that cannot be brought into canonical form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NormalizeError {
    #[error("unexpected shape for `{field}`: {found}")]
    UnexpectedShape { field: &'static str, found: String },
}

/// A clinic dropped because one of its records could not be normalized.
#[derive(Debug, Clone)]
pub struct ClinicRejection {
    pub clinic_id: String,
    pub error: NormalizeError,
}

/// Deduplicator output.
#[derive(Debug, Clone, Default)]
pub struct Deduplicated {
    /// Unique reports, non-decreasing in `report_timestamp`.
    pub reports: Vec<Report>,
    pub excluded_invalid: usize,
    pub duplicates_removed: usize,
    pub rejected: Vec<ClinicRejection>,
}

/// Equality key of a report inside its clinic group.
#[derive(Debug, PartialEq, Eq, Hash)]
struct ReportKey {
    report_timestamp: NaiveDateTime,
    statuses: CategoryStatuses,
    case_count: i64,
    details: String,
}

struct Normalized {
    sequence: usize,
    key: ReportKey,
    report: Report,
}

/// Remove sentinel ids and exact duplicates; sort by report time.
///
/// Ties in report time keep ingestion order (`RawReport::sequence`).
pub fn deduplicate(raw: Vec<RawReport>, invalid_clinic_id: &str) -> Deduplicated {
    let mut out = Deduplicated::default();

    // Group by clinic, keeping first-seen group order for deterministic diagnostics.
    let mut group_index: HashMap<String, usize> = HashMap::new();
    let mut groups: Vec<Vec<RawReport>> = Vec::new();
    for report in raw {
        if report.clinic_id == invalid_clinic_id {
            out.excluded_invalid += 1;
            continue;
        }
        let idx = *group_index.entry(report.clinic_id.clone()).or_insert_with(|| {
            groups.push(Vec::new());
            groups.len() - 1
        });
        groups[idx].push(report);
    }

    let mut survivors: Vec<(usize, Report)> = Vec::new();
    for group in groups {
        let normalized: Result<Vec<Normalized>, NormalizeError> = group.iter().map(normalize).collect();
        let normalized = match normalized {
            Ok(n) => n,
            Err(error) => {
                let clinic_id = group[0].clinic_id.clone();
                warn!(clinic = %clinic_id, %error, "excluding clinic: record could not be normalized");
                out.rejected.push(ClinicRejection { clinic_id, error });
                continue;
            }
        };

        let mut seen = HashSet::with_capacity(normalized.len());
        let before = normalized.len();
        for entry in normalized {
            if seen.insert(entry.key) {
                survivors.push((entry.sequence, entry.report));
            }
        }
        out.duplicates_removed += before - seen.len();
    }

    survivors.sort_by(|(seq_a, a), (seq_b, b)| {
        a.report_timestamp
            .cmp(&b.report_timestamp)
            .then(seq_a.cmp(seq_b))
    });
    out.reports = survivors.into_iter().map(|(_, report)| report).collect();

    info!(
        unique = out.reports.len(),
        duplicates = out.duplicates_removed,
        invalid = out.excluded_invalid,
        rejected_clinics = out.rejected.len(),
        "deduplicated reports"
    );
    out
}

fn normalize(raw: &RawReport) -> Result<Normalized, NormalizeError> {
    let case_count = normalize_case_count(raw.case_count.as_ref())?;
    let details = canonical_details(raw.details.as_ref());
    Ok(Normalized {
        sequence: raw.sequence,
        key: ReportKey {
            report_timestamp: raw.report_timestamp,
            statuses: raw.statuses,
            case_count,
            details,
        },
        report: Report {
            clinic_id: raw.clinic_id.clone(),
            report_timestamp: raw.report_timestamp,
            statuses: raw.statuses,
            case_count,
            details: raw.details.clone(),
        },
    })
}

/// Missing → 0, numbers truncated to an integer, numeric strings parsed.
pub fn normalize_case_count(value: Option<&Value>) -> Result<i64, NormalizeError> {
    let shape_err = |found: &Value| NormalizeError::UnexpectedShape {
        field: "current_case_count",
        found: found.to_string(),
    };

    match value {
        None | Some(Value::Null) => Ok(0),
        Some(v @ Value::Number(n)) => {
            if let Some(i) = n.as_i64() {
                return Ok(i);
            }
            match n.as_f64() {
                Some(f) if f.is_finite() => Ok(f.trunc() as i64),
                _ => Err(shape_err(v)),
            }
        }
        Some(v @ Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(0);
            }
            if let Ok(i) = s.parse::<i64>() {
                return Ok(i);
            }
            match s.parse::<f64>() {
                Ok(f) if f.is_finite() => Ok(f.trunc() as i64),
                _ => Err(shape_err(v)),
            }
        }
        Some(other) => Err(shape_err(other)),
    }
}

/// Stable string form of a nested JSON value.
///
/// `serde_json::Map` is ordered by key (no `preserve_order`), so the compact
/// serialization is already canonical.
pub fn canonical_details(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(v) => v.to_string(),
    }
}
