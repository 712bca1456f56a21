//! Chart rendering with Plotters.
//!
//! - stacked-area panels, generic over the drawing backend (`chart`)
//! - colours, time axis mapping, and the visible window (this module)
//!
//! The time axis is plotted as `f64` seconds since the Unix epoch and
//! formatted back into dates for tick labels.

use std::path::PathBuf;
use std::sync::OnceLock;

use chrono::{DateTime, NaiveDateTime};
use plotters::style::{FontStyle, RGBColor, register_font};
use thiserror::Error;

use crate::domain::{BedStatus, RunConfig};

pub mod chart;

pub use chart::{PanelStyle, draw_category, render_chart};

/// Tick label format on the time axis.
pub const DATE_TICK_FORMAT: &str = "%Y.%m.%d";

/// Family name every chart label is drawn with.
pub const FONT_FAMILY: &str = "sans-serif";

static FONT_BYTES: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

#[derive(Debug, Error)]
pub enum RenderError {
    #[error("unsupported chart format '{extension}' for {path} (expected .png or .svg)")]
    UnsupportedFormat { path: PathBuf, extension: String },

    #[error("chart window is empty: start {start} is not before end {end}")]
    EmptyWindow { start: NaiveDateTime, end: NaiveDateTime },

    #[error("failed to draw chart {path}: {message}")]
    Draw { path: PathBuf, message: String },

    #[error("embedded font for '{family}' could not be loaded")]
    Font { family: &'static str },
}

/// Make the bundled font available to Plotters under [`FONT_FAMILY`].
///
/// Plotters has no system font lookup in this build, so every backend that
/// measures or rasterizes text needs this first. Safe to call repeatedly.
pub fn register_fonts() -> Result<(), RenderError> {
    static REGISTERED: OnceLock<bool> = OnceLock::new();
    let ok = *REGISTERED.get_or_init(|| register_font(FONT_FAMILY, FontStyle::Normal, FONT_BYTES).is_ok());
    if ok {
        Ok(())
    } else {
        Err(RenderError::Font { family: FONT_FAMILY })
    }
}

/// Fill colour of each status layer.
pub fn status_color(status: BedStatus) -> RGBColor {
    match status {
        BedStatus::Available => RGBColor(0x3C, 0xA9, 0x02),
        BedStatus::Limited => RGBColor(0xF6, 0xD5, 0x0E),
        BedStatus::Occupied => RGBColor(0xF6, 0x0E, 0x0E),
        BedStatus::Unknown => RGBColor(0xCC, 0xCC, 0xCC),
    }
}

/// Visible time range, in axis units.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ChartWindow {
    pub start: f64,
    pub end: f64,
}

impl ChartWindow {
    pub fn contains(&self, x: f64) -> bool {
        x >= self.start && x <= self.end
    }
}

/// Resolve the configured window; `now` stands in for an open end.
pub fn chart_window(config: &RunConfig, now: NaiveDateTime) -> Result<ChartWindow, RenderError> {
    let start = config.x_start.and_time(chrono::NaiveTime::MIN);
    let end = config.x_end.unwrap_or(now);
    if end <= start {
        return Err(RenderError::EmptyWindow { start, end });
    }
    Ok(ChartWindow {
        start: time_to_x(start),
        end: time_to_x(end),
    })
}

pub fn time_to_x(t: NaiveDateTime) -> f64 {
    t.and_utc().timestamp() as f64
}

pub fn x_to_time(x: f64) -> Option<NaiveDateTime> {
    if !x.is_finite() {
        return None;
    }
    DateTime::from_timestamp(x.round() as i64, 0).map(|dt| dt.naive_utc())
}

pub fn format_date_tick(x: f64) -> String {
    x_to_time(x)
        .map(|t| t.format(DATE_TICK_FORMAT).to_string())
        .unwrap_or_default()
}
