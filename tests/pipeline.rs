//! End-to-end: generate snapshots, load them back, rebuild the timeline,
//! and write the CSV and SVG outputs.

use chrono::{Duration, NaiveDate};
use icu_timeline::app::pipeline::run_pipeline;
use icu_timeline::data::{SampleConfig, write_sample};
use icu_timeline::domain::{BedStatus, EngineKind, RunConfig, StatusCategory};
use icu_timeline::io::write_series_csv;
use icu_timeline::render::render_chart;
use icu_timeline::report::format_run_summary;

fn sample_config() -> SampleConfig {
    SampleConfig {
        clinics: 25,
        snapshots: 16,
        interval: Duration::hours(6),
        first: NaiveDate::from_ymd_opt(2020, 3, 20)
            .unwrap()
            .and_hms_opt(0, 0, 0)
            .unwrap(),
        seed: 2020,
        ..Default::default()
    }
}

#[test]
fn sample_to_chart() {
    let dir = tempfile::tempdir().unwrap();
    let data_dir = dir.path().join("snapshots");
    let sample = write_sample(&data_dir, &sample_config()).unwrap();
    assert_eq!(sample.files.len(), 16);

    let mut config = RunConfig::for_dir(&data_dir);
    config.output = dir.path().join("plot.svg");
    config.width = 900;
    config.height = 900;
    config.export_csv = Some(dir.path().join("series.csv"));

    let run = run_pipeline(&config).unwrap();

    // Scrapes overlap heavily, so most records are re-emitted duplicates.
    assert_eq!(run.loaded.files.len(), 16);
    assert!(run.dedup.duplicates_removed > 0);
    assert_eq!(run.dedup.excluded_invalid, 16);
    assert!(run.dedup.reports.iter().all(|r| r.clinic_id != "invalid"));
    assert!(run.loaded.skipped.is_empty());
    // Both feed generations use known spellings.
    assert_eq!(run.loaded.unrecognized_statuses, 0);

    // Reports are time-ordered and unique.
    assert!(
        run.dedup
            .reports
            .windows(2)
            .all(|w| w[0].report_timestamp <= w[1].report_timestamp)
    );

    // The roster never exceeds the clinics seen; dropouts stay counted.
    let last = run.points.last().unwrap();
    assert!(run.roster_size() <= last.clinics);
    assert_eq!(last.clinics, sample.clinics);
    for category in StatusCategory::ALL {
        assert_eq!(last.counts.category(category).total(), last.clinics);
    }

    // Both engines agree on real-looking data.
    let mut brute = config.clone();
    brute.engine = EngineKind::BruteForce;
    assert_eq!(run_pipeline(&brute).unwrap().points, run.points);

    // Outputs.
    let csv_path = config.export_csv.clone().unwrap();
    write_series_csv(&csv_path, &run.series).unwrap();
    let csv = std::fs::read_to_string(&csv_path).unwrap();
    assert_eq!(csv.lines().count(), run.series.len() + 1);

    let now = NaiveDate::from_ymd_opt(2020, 4, 15)
        .unwrap()
        .and_hms_opt(0, 0, 0)
        .unwrap();
    render_chart(&run.series, &config, Some(run.roster_size()), now).unwrap();
    let svg = std::fs::read_to_string(&config.output).unwrap();
    assert!(svg.contains("ICU high care"));

    let summary = format_run_summary(&run, &config);
    assert!(summary.contains(&format!("sentinel={}", 16)));
    assert!(summary.contains(BedStatus::Available.label()));
}

#[test]
fn empty_directory_is_an_input_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = run_pipeline(&RunConfig::for_dir(dir.path())).unwrap_err();
    assert_eq!(err.exit_code(), 2);
}

#[test]
fn non_array_snapshot_aborts() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("2020-04-01_00-00-00.json"), r#"{"name": "A"}"#).unwrap();
    let err = run_pipeline(&RunConfig::for_dir(dir.path())).unwrap_err();
    assert_eq!(err.exit_code(), 2);
    assert!(err.to_string().contains("array"));
}
