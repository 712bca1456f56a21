//! Synthetic snapshot generation.
//!
//! Simulates a clinic registry that is scraped at a fixed interval. Each
//! clinic reports at exponentially distributed intervals; between reports the
//! scrape re-emits its last report unchanged, so consecutive files overlap the
//! same way real scrapes do. Halfway through, the feed switches to the current
//! field names and status spellings. Some clinics stop reporting and vanish
//! from later scrapes, and every scrape carries one placeholder record.

use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use chrono::{Duration, NaiveDate, NaiveDateTime};
use rand::distributions::WeightedIndex;
use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Exp;
use serde_json::{Map, Value, json};
use tracing::info;

use crate::domain::{BedStatus, CategoryStatuses, DEFAULT_INVALID_CLINIC_ID, DEFAULT_TIMESTAMP_FORMAT, StatusCategory};
use crate::error::AppError;

/// File-name pattern of generated snapshots (sorts chronologically).
pub const SNAPSHOT_FILE_FORMAT: &str = "%Y-%m-%d_%H-%M-%S";

/// Share of clinics that stop reporting mid-run.
const DROPOUT_SHARE: f64 = 0.1;

/// Relative weights for Available, Limited, Occupied, Unknown.
const STATUS_WEIGHTS: [u32; 4] = [50, 30, 15, 5];

#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub clinics: usize,
    pub snapshots: usize,
    pub interval: Duration,
    pub first: NaiveDateTime,
    pub seed: u64,
    pub invalid_clinic_id: String,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            clinics: 40,
            snapshots: 48,
            interval: Duration::hours(6),
            first: NaiveDate::from_ymd_opt(2020, 3, 20)
                .and_then(|d| d.and_hms_opt(0, 0, 0))
                .unwrap_or_default(),
            seed: 42,
            invalid_clinic_id: DEFAULT_INVALID_CLINIC_ID.to_string(),
        }
    }
}

/// One generated scrape.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub retrieved_at: NaiveDateTime,
    pub records: Vec<Value>,
}

impl Snapshot {
    pub fn file_name(&self) -> String {
        format!("{}.json", self.retrieved_at.format(SNAPSHOT_FILE_FORMAT))
    }
}

/// What `write_sample` produced.
#[derive(Debug, Clone)]
pub struct SampleSummary {
    pub files: Vec<PathBuf>,
    pub records: usize,
    pub clinics: usize,
    pub dropouts: usize,
}

#[derive(Debug, Clone)]
struct ClinicState {
    id: String,
    mean_interval_hours: f64,
    next_report: NaiveDateTime,
    stops_at: Option<NaiveDateTime>,
    last: Option<LastReport>,
}

#[derive(Debug, Clone)]
struct LastReport {
    at: NaiveDateTime,
    statuses: CategoryStatuses,
    case_count: i64,
    details: Option<Value>,
}

/// Generate `config.snapshots` scrapes in memory.
pub fn generate_snapshots(config: &SampleConfig) -> Result<Vec<Snapshot>, AppError> {
    validate(config)?;

    let mut rng = StdRng::seed_from_u64(config.seed);
    let status_dist = WeightedIndex::new(STATUS_WEIGHTS)
        .map_err(|e| AppError::new(4, format!("Status distribution error: {e}")))?;

    let span_minutes = config.interval.num_minutes() * config.snapshots as i64;
    let mut clinics: Vec<ClinicState> = (0..config.clinics)
        .map(|i| {
            let mean_interval_hours = rng.gen_range(4.0..24.0);
            // Most clinics have a report on file before the first scrape.
            let lead = rng.gen_range(0..=(mean_interval_hours * 60.0) as i64);
            let stops_at = if rng.gen_bool(DROPOUT_SHARE) {
                let at = rng.gen_range(span_minutes / 4..=span_minutes * 3 / 4);
                Some(config.first + Duration::minutes(at))
            } else {
                None
            };
            ClinicState {
                id: format!("Klinikum {:03}", i + 1),
                mean_interval_hours,
                next_report: config.first - Duration::minutes(lead),
                stops_at,
                last: None,
            }
        })
        .collect();

    let switch_at = config.snapshots / 2;
    let mut out = Vec::with_capacity(config.snapshots);

    for s in 0..config.snapshots {
        let retrieved_at = config.first + config.interval * s as i32;
        let current_feed = s >= switch_at;
        let mut records = Vec::with_capacity(clinics.len() + 1);

        for clinic in &mut clinics {
            let stops_at = clinic.stops_at;
            let active = |t: NaiveDateTime| stops_at.is_none_or(|stop| t < stop);
            while clinic.next_report <= retrieved_at && active(clinic.next_report) {
                let at = clinic.next_report;
                clinic.last = Some(next_report(&mut rng, &status_dist, at, clinic.last.as_ref()));

                let exp = Exp::new(1.0 / clinic.mean_interval_hours)
                    .map_err(|e| AppError::new(4, format!("Interval distribution error: {e}")))?;
                let minutes = (exp.sample(&mut rng) * 60.0).round().max(1.0) as i64;
                // Past the end of the calendar the clinic simply goes quiet.
                clinic.next_report = Duration::try_minutes(minutes)
                    .and_then(|gap| at.checked_add_signed(gap))
                    .unwrap_or(NaiveDateTime::MAX);
            }

            if !active(retrieved_at) {
                continue;
            }
            if let Some(last) = &clinic.last {
                records.push(encode_record(&clinic.id, last, current_feed));
            }
        }

        records.push(placeholder_record(&config.invalid_clinic_id, retrieved_at));
        out.push(Snapshot { retrieved_at, records });
    }

    Ok(out)
}

/// Generate snapshots and write one JSON file per scrape into `dir`.
pub fn write_sample(dir: &Path, config: &SampleConfig) -> Result<SampleSummary, AppError> {
    let snapshots = generate_snapshots(config)?;
    fs::create_dir_all(dir)
        .map_err(|e| AppError::new(2, format!("Failed to create sample directory '{}': {e}", dir.display())))?;

    let mut files = Vec::with_capacity(snapshots.len());
    let mut records = 0;
    for snapshot in &snapshots {
        let path = dir.join(snapshot.file_name());
        let file = File::create(&path)
            .map_err(|e| AppError::new(2, format!("Failed to create snapshot '{}': {e}", path.display())))?;
        let mut writer = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut writer, &snapshot.records)
            .map_err(|e| AppError::new(2, format!("Failed to write snapshot '{}': {e}", path.display())))?;
        writer
            .flush()
            .map_err(|e| AppError::new(2, format!("Failed to flush snapshot '{}': {e}", path.display())))?;
        records += snapshot.records.len();
        files.push(path);
    }

    let last_ids = snapshots.last().map_or(0, |s| s.records.len().saturating_sub(1));
    let seen = distinct_clinics(&snapshots, &config.invalid_clinic_id);
    let summary = SampleSummary {
        files,
        records,
        clinics: seen,
        dropouts: seen.saturating_sub(last_ids),
    };
    info!(
        dir = %dir.display(),
        files = summary.files.len(),
        records = summary.records,
        "wrote sample snapshots"
    );
    Ok(summary)
}

fn validate(config: &SampleConfig) -> Result<(), AppError> {
    if config.clinics == 0 {
        return Err(AppError::new(2, "Clinic count must be > 0."));
    }
    if config.snapshots == 0 {
        return Err(AppError::new(2, "Snapshot count must be > 0."));
    }
    if config.interval < Duration::minutes(1) {
        return Err(AppError::new(2, "Snapshot interval must be at least one minute."));
    }
    if config.invalid_clinic_id.trim().is_empty() {
        return Err(AppError::new(2, "Placeholder clinic id must not be empty."));
    }
    if run_end(config).is_none() || config.first.checked_sub_signed(Duration::days(1)).is_none() {
        return Err(AppError::new(
            2,
            format!(
                "{} snapshots every {} minutes from {} run past the supported date range.",
                config.snapshots,
                config.interval.num_minutes(),
                config.first
            ),
        ));
    }
    Ok(())
}

/// One interval past the last scrape; `None` when that is not a valid date.
fn run_end(config: &SampleConfig) -> Option<NaiveDateTime> {
    let steps = i32::try_from(config.snapshots).ok()?;
    let span = config.interval.checked_mul(steps)?;
    config.first.checked_add_signed(span)
}

fn next_report(
    rng: &mut StdRng,
    status_dist: &WeightedIndex<u32>,
    at: NaiveDateTime,
    previous: Option<&LastReport>,
) -> LastReport {
    let mut draw = |category: StatusCategory| {
        // Mostly sticky: a report usually repeats the previous status.
        match previous {
            Some(prev) if rng.gen_bool(0.7) => prev.statuses.get(category),
            _ => BedStatus::ALL[status_dist.sample(&mut *rng)],
        }
    };
    let statuses = CategoryStatuses::new(
        draw(StatusCategory::LowCare),
        draw(StatusCategory::HighCare),
        draw(StatusCategory::Ecmo),
    );

    let case_count = match previous {
        Some(prev) => (prev.case_count + rng.gen_range(-2..=3)).max(0),
        None => rng.gen_range(0..20),
    };
    let details = rng.gen_bool(0.3).then(|| {
        json!({
            "beds": rng.gen_range(5..60),
            "contact": "Intensivstation",
        })
    });

    LastReport {
        at,
        statuses,
        case_count,
        details,
    }
}

fn legacy_token(status: BedStatus) -> &'static str {
    match status {
        BedStatus::Available => "available",
        BedStatus::Limited => "limited",
        BedStatus::Occupied => "occupied",
        BedStatus::Unknown => "unavailable",
    }
}

fn current_token(status: BedStatus) -> &'static str {
    match status {
        BedStatus::Available => "VERFUEGBAR",
        BedStatus::Limited => "BEGRENZT",
        BedStatus::Occupied => "NICHT_VERFUEGBAR",
        BedStatus::Unknown => "KEINE_ANGABE",
    }
}

/// Encode in the legacy field names and spellings, or the current ones.
fn encode_record(clinic_id: &str, report: &LastReport, current_feed: bool) -> Value {
    let mut record = Map::new();
    let timestamp = report.at.format(DEFAULT_TIMESTAMP_FORMAT).to_string();

    if current_feed {
        record.insert("clinic_id".into(), json!(clinic_id));
        record.insert("report_timestamp".into(), json!(timestamp));
        record.insert("status_low_care".into(), json!(current_token(report.statuses.low_care)));
        record.insert("status_high_care".into(), json!(current_token(report.statuses.high_care)));
        record.insert("status_ecmo".into(), json!(current_token(report.statuses.ecmo)));
        // The current feed ships counts as strings.
        record.insert("current_cases".into(), json!(report.case_count.to_string()));
        if let Some(details) = &report.details {
            record.insert("details".into(), details.clone());
        }
    } else {
        record.insert("name".into(), json!(clinic_id));
        record.insert("last_update".into(), json!(timestamp));
        record.insert("status_icu_low_care".into(), json!(legacy_token(report.statuses.low_care)));
        record.insert("status_icu_high_care".into(), json!(legacy_token(report.statuses.high_care)));
        record.insert("status_ecmo".into(), json!(legacy_token(report.statuses.ecmo)));
        record.insert("current_case_count".into(), json!(report.case_count));
        if let Some(details) = &report.details {
            record.insert("description".into(), details.clone());
        }
    }

    Value::Object(record)
}

fn placeholder_record(invalid_id: &str, at: NaiveDateTime) -> Value {
    json!({
        "name": invalid_id,
        "last_update": at.format(DEFAULT_TIMESTAMP_FORMAT).to_string(),
        "status_icu_low_care": "NaN",
        "status_icu_high_care": "NaN",
        "status_ecmo": "NaN",
    })
}

fn distinct_clinics(snapshots: &[Snapshot], invalid_id: &str) -> usize {
    let mut ids: Vec<&str> = snapshots
        .iter()
        .flat_map(|s| &s.records)
        .filter_map(|r| r.get("name").or_else(|| r.get("clinic_id")).and_then(Value::as_str))
        .filter(|id| *id != invalid_id)
        .collect();
    ids.sort_unstable();
    ids.dedup();
    ids.len()
}
