//! Command-line parsing for the ICU bed availability timeline.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the timeline code.

use std::path::PathBuf;

use chrono::{NaiveDate, NaiveDateTime};
use clap::{Args, Parser, Subcommand};

use crate::domain::{DEFAULT_INVALID_CLINIC_ID, DEFAULT_TIMESTAMP_FORMAT, EngineKind};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "icu", version, about = "ICU bed availability timeline from snapshot files")]
pub struct Cli {
    /// More log output (-v info, -vv debug, -vvv trace).
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors.
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Rebuild the timeline and render the stacked-area chart (default).
    Chart(ChartArgs),
    /// Print the run summary without rendering.
    Summary(DataArgs),
    /// Interactive terminal chart.
    View(DataArgs),
    /// Write a directory of synthetic snapshot files.
    Sample(SampleArgs),
}

/// Where the snapshots live and how to read them.
#[derive(Debug, Args, Clone)]
pub struct DataArgs {
    /// Directory containing the `*.json` snapshot files.
    #[arg(short = 'd', long, env = "ICU_DATA_DIR", default_value = ".")]
    pub data_dir: PathBuf,

    /// Clinic id of placeholder records to drop.
    #[arg(long = "invalid-id", env = "ICU_INVALID_CLINIC_ID", default_value = DEFAULT_INVALID_CLINIC_ID)]
    pub invalid_id: String,

    /// chrono format of the `last_update` field.
    #[arg(long, default_value = DEFAULT_TIMESTAMP_FORMAT)]
    pub timestamp_format: String,

    /// As-of implementation.
    #[arg(long, value_enum, default_value_t = EngineKind::Incremental)]
    pub engine: EngineKind,

    /// Left edge of the time axis (YYYY-MM-DD).
    #[arg(long, default_value = "2020-03-17")]
    pub start: NaiveDate,

    /// Right edge of the time axis (YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS); defaults to now.
    #[arg(long, value_parser = parse_end)]
    pub end: Option<NaiveDateTime>,
}

/// Options for rendering the chart file.
#[derive(Debug, Args, Clone)]
pub struct ChartArgs {
    #[command(flatten)]
    pub data: DataArgs,

    /// Output image (`.png` or `.svg`).
    #[arg(short, long, env = "ICU_PLOT_OUTPUT", default_value = "plot.png")]
    pub output: PathBuf,

    /// Image width (pixels).
    #[arg(long, default_value_t = 3000)]
    pub width: u32,

    /// Image height (pixels).
    #[arg(long, default_value_t = 3000)]
    pub height: u32,

    /// Also write the assembled series to CSV.
    #[arg(long = "export-csv", value_name = "CSV")]
    pub export_csv: Option<PathBuf>,

    /// Print the run summary after rendering.
    #[arg(long)]
    pub summary: bool,
}

/// Options for the synthetic snapshot generator.
#[derive(Debug, Args, Clone)]
pub struct SampleArgs {
    /// Directory to write snapshot files into (created if missing).
    #[arg(short, long, value_name = "DIR")]
    pub out_dir: PathBuf,

    /// Number of clinics.
    #[arg(short = 'n', long, default_value_t = 40)]
    pub clinics: usize,

    /// Number of snapshot files (one scrape each).
    #[arg(long, default_value_t = 48)]
    pub snapshots: usize,

    /// Hours between scrapes.
    #[arg(long, default_value_t = 6)]
    pub interval_hours: u32,

    /// First scrape date (YYYY-MM-DD).
    #[arg(long, default_value = "2020-03-20")]
    pub first: NaiveDate,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

fn parse_end(raw: &str) -> Result<NaiveDateTime, String> {
    let raw = raw.trim();
    if let Ok(t) = NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S") {
        return Ok(t);
    }
    NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map(|d| d.and_time(chrono::NaiveTime::MIN))
        .map_err(|e| format!("expected YYYY-MM-DD or YYYY-MM-DDTHH:MM:SS: {e}"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chart_defaults() {
        let cli = Cli::parse_from(["icu", "chart", "--data-dir", "snapshots"]);
        let Command::Chart(args) = cli.command else {
            panic!("expected chart");
        };
        assert_eq!(args.data.data_dir, PathBuf::from("snapshots"));
        assert_eq!(args.data.invalid_id, "invalid");
        assert_eq!(args.data.engine, EngineKind::Incremental);
        assert_eq!(args.data.start, NaiveDate::from_ymd_opt(2020, 3, 17).unwrap());
        assert_eq!((args.width, args.height), (3000, 3000));
        assert_eq!(cli.verbose, 0);
    }

    #[test]
    fn global_flags_after_subcommand() {
        let cli = Cli::parse_from(["icu", "summary", "-vv", "--engine", "brute-force"]);
        assert_eq!(cli.verbose, 2);
        let Command::Summary(args) = cli.command else {
            panic!("expected summary");
        };
        assert_eq!(args.engine, EngineKind::BruteForce);
    }

    #[test]
    fn end_accepts_date_or_datetime() {
        assert_eq!(
            parse_end("2020-05-01").unwrap(),
            NaiveDate::from_ymd_opt(2020, 5, 1).unwrap().and_hms_opt(0, 0, 0).unwrap()
        );
        assert_eq!(
            parse_end("2020-05-01T12:30:00").unwrap(),
            NaiveDate::from_ymd_opt(2020, 5, 1).unwrap().and_hms_opt(12, 30, 0).unwrap()
        );
        assert!(parse_end("yesterday").is_err());
    }
}
