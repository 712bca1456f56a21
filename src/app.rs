//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - loads `.env` and parses CLI arguments
//! - sets up logging
//! - runs the timeline pipeline
//! - renders the chart, prints summaries, or opens the terminal view
//! - writes synthetic snapshot directories

use std::io::IsTerminal;

use chrono::{Duration, NaiveDateTime};
use clap::Parser;
use tracing::{Level, info};

use crate::cli::{ChartArgs, Command, DataArgs, SampleArgs};
use crate::data::SampleConfig;
use crate::domain::RunConfig;
use crate::error::AppError;
use crate::logging::{LogConfig, init_logging};

pub mod pipeline;

/// Entry point for the `icu` binary.
pub fn run() -> Result<(), AppError> {
    // A missing .env is normal; anything else in it is not.
    match dotenvy::dotenv() {
        Ok(_) => {}
        Err(e) if e.not_found() => {}
        Err(e) => return Err(AppError::new(2, format!("Failed to read .env: {e}"))),
    }

    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    let mut log_config =
        LogConfig::from_verbosity(cli.verbose, cli.quiet).with_ansi(std::io::stderr().is_terminal());
    if matches!(cli.command, Command::View(_)) && log_config.level > Level::WARN {
        // Anything chattier would scribble over the alternate screen.
        log_config = log_config.with_level(Level::WARN);
    }
    init_logging(&log_config)?;

    match cli.command {
        Command::Chart(args) => handle_chart(args),
        Command::Summary(args) => handle_summary(args),
        Command::View(args) => handle_view(args),
        Command::Sample(args) => handle_sample(args),
    }
}

fn handle_chart(args: ChartArgs) -> Result<(), AppError> {
    let config = run_config_from_chart_args(&args);
    let run = pipeline::run_pipeline(&config)?;

    let now = chrono::Local::now().naive_local();
    crate::render::render_chart(&run.series, &config, Some(run.roster_size()), now)?;
    println!("Wrote {}", config.output.display());

    if let Some(path) = &config.export_csv {
        crate::io::export::write_series_csv(path, &run.series)?;
        info!(path = %path.display(), rows = run.series.len(), "wrote series csv");
        println!("Wrote {}", path.display());
    }

    if args.summary {
        println!();
        println!("{}", crate::report::format_run_summary(&run, &config));
    }
    Ok(())
}

fn handle_summary(args: DataArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args);
    let run = pipeline::run_pipeline(&config)?;
    println!("{}", crate::report::format_run_summary(&run, &config));
    Ok(())
}

fn handle_view(args: DataArgs) -> Result<(), AppError> {
    let config = run_config_from_args(&args);
    let run = pipeline::run_pipeline(&config)?;
    crate::tui::run(run, &config)
}

fn handle_sample(args: SampleArgs) -> Result<(), AppError> {
    let config = sample_config_from_args(&args)?;
    let summary = crate::data::write_sample(&args.out_dir, &config)?;
    println!(
        "Wrote {} snapshot files ({} records, {} clinics, {} stopped reporting) to {}",
        summary.files.len(),
        summary.records,
        summary.clinics,
        summary.dropouts,
        args.out_dir.display()
    );
    Ok(())
}

pub fn run_config_from_args(args: &DataArgs) -> RunConfig {
    RunConfig {
        invalid_clinic_id: args.invalid_id.clone(),
        timestamp_format: args.timestamp_format.clone(),
        engine: args.engine,
        x_start: args.start,
        x_end: args.end,
        ..RunConfig::for_dir(args.data_dir.clone())
    }
}

pub fn run_config_from_chart_args(args: &ChartArgs) -> RunConfig {
    RunConfig {
        output: args.output.clone(),
        width: args.width,
        height: args.height,
        export_csv: args.export_csv.clone(),
        ..run_config_from_args(&args.data)
    }
}

fn sample_config_from_args(args: &SampleArgs) -> Result<SampleConfig, AppError> {
    let first: NaiveDateTime = args.first.and_time(chrono::NaiveTime::MIN);
    Ok(SampleConfig {
        clinics: args.clinics,
        snapshots: args.snapshots,
        interval: Duration::try_hours(i64::from(args.interval_hours))
            .ok_or_else(|| AppError::new(2, "Snapshot interval is out of range."))?,
        first,
        seed: args.seed,
        ..SampleConfig::default()
    })
}

/// Rewrite argv so `icu` defaults to `icu chart`.
///
/// Rules:
/// - `icu`                      -> `icu chart`
/// - `icu -d snapshots ...`     -> `icu chart -d snapshots ...`
/// - `icu --help/--version/-h`  -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("chart".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(arg1.as_str(), "chart" | "summary" | "view" | "sample");
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "chart flags".
    if arg1.starts_with('-') {
        argv.insert(1, "chart".to_string());
        return argv;
    }

    argv
}

#[cfg(test)]
mod tests {
    use super::*;

    fn args(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn bare_invocation_defaults_to_chart() {
        assert_eq!(rewrite_args(args(&["icu"])), args(&["icu", "chart"]));
        assert_eq!(
            rewrite_args(args(&["icu", "-d", "snaps"])),
            args(&["icu", "chart", "-d", "snaps"])
        );
    }

    #[test]
    fn subcommands_and_help_untouched() {
        assert_eq!(rewrite_args(args(&["icu", "view"])), args(&["icu", "view"]));
        assert_eq!(rewrite_args(args(&["icu", "--help"])), args(&["icu", "--help"]));
    }

    #[test]
    fn chart_args_become_run_config() {
        let cli = crate::cli::Cli::parse_from([
            "icu", "chart", "-d", "snaps", "-o", "out.svg", "--width", "800", "--invalid-id", "dummy",
        ]);
        let Command::Chart(chart) = cli.command else {
            panic!("expected chart");
        };
        let config = run_config_from_chart_args(&chart);
        assert_eq!(config.data_dir, std::path::PathBuf::from("snaps"));
        assert_eq!(config.output, std::path::PathBuf::from("out.svg"));
        assert_eq!(config.width, 800);
        assert_eq!(config.height, 3000);
        assert_eq!(config.invalid_clinic_id, "dummy");
    }
}
