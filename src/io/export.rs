//! Export the assembled series to CSV.
//!
//! One row per distinct report timestamp; one column per (category, status)
//! pair, in the same order the chart stacks them.

use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::domain::{BedStatus, StatusCategory};
use crate::error::AppError;
use crate::timeline::StatusSeries;

/// CSV timestamp format (ISO-like, sorts lexically).
const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Write the series as CSV.
pub fn write_series_csv(path: &Path, series: &StatusSeries) -> Result<(), AppError> {
    let file = File::create(path)
        .map_err(|e| AppError::new(2, format!("Failed to create export CSV '{}': {e}", path.display())))?;
    let mut out = BufWriter::new(file);

    writeln!(out, "{}", csv_header())
        .map_err(|e| AppError::new(2, format!("Failed to write export CSV header: {e}")))?;

    for (i, time) in series.times.iter().enumerate() {
        let mut row = format!("{},{}", time.format(TIME_FORMAT), series.clinics[i]);
        for category in StatusCategory::ALL {
            for status in BedStatus::ALL {
                row.push(',');
                row.push_str(&series.category(category).layer(status)[i].to_string());
            }
        }
        writeln!(out, "{row}").map_err(|e| AppError::new(2, format!("Failed to write export CSV row: {e}")))?;
    }

    out.flush()
        .map_err(|e| AppError::new(2, format!("Failed to flush export CSV: {e}")))?;
    Ok(())
}

fn csv_header() -> String {
    let mut header = String::from("time,clinics");
    for category in StatusCategory::ALL {
        for status in BedStatus::ALL {
            header.push_str(&format!(",{}_{}", category.field_name(), status.label()));
        }
    }
    header
}
