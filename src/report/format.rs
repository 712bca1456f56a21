//! Formatted terminal output.
//!
//! Formatting lives in one place so the timeline code stays free of
//! presentation details and output changes stay localized.

use chrono::NaiveDateTime;

use super::{DatasetStats, dataset_stats, latest_counts};
use crate::app::pipeline::RunOutput;
use crate::domain::{BedStatus, RunConfig, SnapshotCounts, StatusCategory};

const TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// How many skipped records are listed individually.
const MAX_LISTED_SKIPS: usize = 10;

/// Format the full run summary (input stats + dedup outcome + latest counts).
pub fn format_run_summary(run: &RunOutput, config: &RunConfig) -> String {
    let stats = dataset_stats(run);
    let mut out = String::new();

    out.push_str("=== icu - ICU bed availability timeline ===\n");
    out.push_str(&format!("Data dir: {}\n", config.data_dir.display()));
    out.push_str(&format!("Engine: {:?}\n", config.engine));
    out.push_str(&format_stats(&stats));

    if !run.dedup.rejected.is_empty() {
        out.push_str("\nExcluded clinics (malformed fields):\n");
        for rejection in &run.dedup.rejected {
            out.push_str(&format!("- {}: {}\n", truncate(&rejection.clinic_id, 40), rejection.error));
        }
    }

    if !run.loaded.skipped.is_empty() {
        out.push_str("\nSkipped records:\n");
        for skip in run.loaded.skipped.iter().take(MAX_LISTED_SKIPS) {
            let file = skip
                .file
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default();
            out.push_str(&format!(
                "- {file}[{}] {}: {}\n",
                skip.index,
                skip.clinic_id.as_deref().unwrap_or("?"),
                skip.error
            ));
        }
        let rest = run.loaded.skipped.len().saturating_sub(MAX_LISTED_SKIPS);
        if rest > 0 {
            out.push_str(&format!("  ... and {rest} more\n"));
        }
    }

    if let Some((time, counts)) = latest_counts(run) {
        out.push_str(&format!("\nLatest counts (as of {}):\n", time.format(TIME_FORMAT)));
        out.push_str(&format_counts_table(&counts));
    }

    out
}

fn format_stats(stats: &DatasetStats) -> String {
    let mut out = String::new();
    out.push_str(&format!(
        "Files: {} | records read={} skipped={}\n",
        stats.files, stats.records_read, stats.records_skipped
    ));
    out.push_str(&format!(
        "Dedup: sentinel={} duplicates={} rejected clinics={} | unique={}\n",
        stats.excluded_invalid, stats.duplicates_removed, stats.rejected_clinics, stats.unique_reports
    ));
    out.push_str(&format!(
        "Clinics: seen={} | roster={}\n",
        stats.clinics_seen, stats.roster_size
    ));
    out.push_str(&format!(
        "Reports: {} timestamps | [{}, {}]\n",
        stats.timestamps,
        fmt_time(stats.first_report),
        fmt_time(stats.last_report)
    ));
    if stats.unrecognized_statuses > 0 {
        out.push_str(&format!(
            "Unrecognized status values: {} (counted as unknown)\n",
            stats.unrecognized_statuses
        ));
    }
    out
}

/// Table of counts: one row per category, one column per status.
pub fn format_counts_table(counts: &SnapshotCounts) -> String {
    let mut out = String::new();

    let mut header = format!("{:<14}", "category");
    let mut rule = format!("{:-<14}", "");
    for status in BedStatus::ALL {
        header.push_str(&format!(" {:>10}", status.label()));
        rule.push_str(&format!(" {:-<10}", ""));
    }
    header.push_str(&format!(" {:>10}", "total"));
    rule.push_str(&format!(" {:-<10}", ""));
    out.push_str(header.trim_end());
    out.push('\n');
    out.push_str(rule.trim_end());
    out.push('\n');

    for category in StatusCategory::ALL {
        let c = counts.category(category);
        let mut row = format!("{:<14}", category.display_name());
        for status in BedStatus::ALL {
            row.push_str(&format!(" {:>10}", c.get(status)));
        }
        row.push_str(&format!(" {:>10}", c.total()));
        out.push_str(row.trim_end());
        out.push('\n');
    }

    out
}

fn fmt_time(t: Option<NaiveDateTime>) -> String {
    t.map(|t| t.format(TIME_FORMAT).to_string())
        .unwrap_or_else(|| "-".to_string())
}

fn truncate(s: &str, max: usize) -> String {
    if s.chars().count() <= max {
        return s.to_string();
    }
    let mut out: String = s.chars().take(max.saturating_sub(1)).collect();
    out.push('.');
    out
}
