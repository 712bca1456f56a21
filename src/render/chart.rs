//! Stacked-area chart of clinic counts per status.
//!
//! `draw_category` is generic over the Plotters backend so the same drawing
//! code serves the image file (`BitMapBackend` / `SVGBackend`) and the
//! terminal view (`plotters-ratatui-backend`).

use chrono::NaiveDateTime;
use plotters::coord::Shift;
use plotters::prelude::*;
use tracing::info;

use super::{
    ChartWindow, FONT_FAMILY, RenderError, chart_window, format_date_tick, register_fonts, status_color, time_to_x,
};
use crate::domain::{BedStatus, RunConfig, StatusCategory};
use crate::timeline::StatusSeries;

/// Sizes and colours of one panel.
#[derive(Debug, Clone, Copy)]
pub struct PanelStyle {
    pub margin: u32,
    pub caption_size: u32,
    pub label_size: u32,
    pub x_label_area: u32,
    pub y_label_area: u32,
    pub x_labels: usize,
    pub text_color: RGBColor,
    pub axis_color: RGBColor,
    pub background: RGBColor,
    pub grid: bool,
    pub legend: bool,
}

impl PanelStyle {
    /// Image output, scaled to the panel height of a `height`-pixel image.
    pub fn raster(height: u32) -> Self {
        let unit = (height / 40).max(3);
        Self {
            margin: unit,
            caption_size: unit * 2,
            label_size: unit + unit / 4,
            x_label_area: unit * 3,
            y_label_area: unit * 4,
            x_labels: 10,
            text_color: BLACK,
            axis_color: BLACK,
            background: WHITE,
            grid: true,
            legend: true,
        }
    }

    /// Terminal cells are low-res, so keep label areas compact.
    pub fn terminal() -> Self {
        Self {
            margin: 1,
            caption_size: 10,
            label_size: 10,
            x_label_area: 3,
            y_label_area: 6,
            x_labels: 5,
            text_color: WHITE,
            axis_color: WHITE,
            background: BLACK,
            grid: false,
            legend: false,
        }
    }
}

/// Render the three panels to `config.output` (`.png` or `.svg`).
pub fn render_chart(
    series: &StatusSeries,
    config: &RunConfig,
    roster: Option<usize>,
    now: NaiveDateTime,
) -> Result<(), RenderError> {
    let window = chart_window(config, now)?;
    register_fonts()?;
    let path = &config.output;
    let size = (config.width, config.height);
    let style = PanelStyle::raster(config.height / 3);

    let draw_err = |message: String| RenderError::Draw {
        path: path.clone(),
        message,
    };

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase)
        .unwrap_or_default();

    match extension.as_str() {
        "png" => {
            let root = BitMapBackend::new(path, size).into_drawing_area();
            draw_panels(&root, series, window, roster, &style).map_err(|e| draw_err(e.to_string()))?;
            root.present().map_err(|e| draw_err(e.to_string()))?;
        }
        "svg" => {
            let root = SVGBackend::new(path, size).into_drawing_area();
            draw_panels(&root, series, window, roster, &style).map_err(|e| draw_err(e.to_string()))?;
            root.present().map_err(|e| draw_err(e.to_string()))?;
        }
        _ => {
            return Err(RenderError::UnsupportedFormat {
                path: path.clone(),
                extension,
            });
        }
    }

    info!(path = %path.display(), width = size.0, height = size.1, "wrote chart");
    Ok(())
}

/// Three vertically stacked panels: low care, high care, ECMO.
fn draw_panels<DB: DrawingBackend>(
    root: &DrawingArea<DB, Shift>,
    series: &StatusSeries,
    window: ChartWindow,
    roster: Option<usize>,
    style: &PanelStyle,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    root.fill(&style.background)?;
    let panels = root.split_evenly((StatusCategory::ALL.len(), 1));
    for (panel, category) in panels.iter().zip(StatusCategory::ALL) {
        let title = match roster {
            Some(n) => format!("{} (roster: {n} clinics)", category.display_name()),
            None => category.display_name().to_string(),
        };
        draw_category(panel, series, category, window, Some(&title), None, style)?;
    }
    Ok(())
}

/// Draw one category as stacked areas, bottom layer = `BedStatus::Available`.
///
/// Each layer is drawn as the area under its cumulative top, from the top
/// layer down, so lower layers paint over the upper ones. `cursor` adds a
/// vertical marker at that x position.
pub fn draw_category<DB: DrawingBackend>(
    area: &DrawingArea<DB, Shift>,
    series: &StatusSeries,
    category: StatusCategory,
    window: ChartWindow,
    title: Option<&str>,
    cursor: Option<f64>,
    style: &PanelStyle,
) -> Result<(), DrawingAreaErrorKind<DB::ErrorType>> {
    let y_max = series.max_clinics().max(1) as f64 * 1.05;

    let mut builder = ChartBuilder::on(area);
    builder
        .margin(style.margin)
        .set_label_area_size(LabelAreaPosition::Left, style.y_label_area)
        .set_label_area_size(LabelAreaPosition::Bottom, style.x_label_area);
    if let Some(title) = title {
        builder.caption(title, (FONT_FAMILY, style.caption_size).into_font().color(&style.text_color));
    }
    let mut chart = builder.build_cartesian_2d(window.start..window.end, 0f64..y_max)?;

    let fmt_x = |v: &f64| format_date_tick(*v);
    let fmt_y = |v: &f64| format!("{v:.0}");
    let mut mesh = chart.configure_mesh();
    mesh.x_labels(style.x_labels)
        .y_labels(5)
        .y_desc("Clinics")
        .x_label_formatter(&fmt_x)
        .y_label_formatter(&fmt_y)
        .label_style((FONT_FAMILY, style.label_size).into_font().color(&style.text_color))
        .axis_style(&style.axis_color);
    if !style.grid {
        mesh.disable_x_mesh().disable_y_mesh();
    }
    mesh.draw()?;

    let xs: Vec<f64> = series.times.iter().map(|t| time_to_x(*t)).collect();
    let stacked = series.category(category).stacked();

    for status in BedStatus::ALL.iter().rev().copied() {
        let color = status_color(status);
        let points = clip_layer(&xs, &stacked[status.index()], window);
        if points.is_empty() {
            continue;
        }

        let anno = chart.draw_series(AreaSeries::new(points, 0.0, color.filled()))?;
        if style.legend {
            anno.label(status.label())
                .legend(move |(x, y)| Rectangle::new([(x, y - 6), (x + 12, y + 6)], color.filled()));
        }
    }

    if let Some(x) = cursor.filter(|x| window.contains(*x)) {
        chart.draw_series(LineSeries::new([(x, 0.0), (x, y_max)], &style.axis_color))?;
    }

    if style.legend {
        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperLeft)
            .label_font((FONT_FAMILY, style.label_size).into_font().color(&style.text_color))
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .draw()?;
    }

    Ok(())
}

/// One layer's outline, cut to the window.
///
/// Segments crossing a window edge end at the edge with the interpolated
/// count, so a layer set before `window.start` still fills from the left border.
fn clip_layer(xs: &[f64], ys: &[usize], window: ChartWindow) -> Vec<(f64, f64)> {
    let mut points = Vec::new();
    let mut prev: Option<(f64, f64)> = None;
    for (&x, &y) in xs.iter().zip(ys) {
        let y = y as f64;
        if let Some((px, py)) = prev {
            let at = |edge: f64| (edge, py + (y - py) * (edge - px) / (x - px));
            if px < window.start && x > window.start {
                points.push(at(window.start));
            }
            if px < window.end && x > window.end {
                points.push(at(window.end));
            }
        }
        if window.contains(x) {
            points.push((x, y));
        }
        prev = Some((x, y));
    }
    points
}
