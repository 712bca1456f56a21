//! Plotters-powered status panel widget for Ratatui.
//!
//! The same `draw_category` used for the image file renders into the Ratatui
//! buffer through `plotters-ratatui-backend`.

use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

use crate::domain::StatusCategory;
use crate::render::{ChartWindow, PanelStyle, draw_category};
use crate::timeline::StatusSeries;

/// One category's stacked chart, render-only.
pub struct StatusPanelChart<'a> {
    pub series: &'a StatusSeries,
    pub category: StatusCategory,
    pub window: ChartWindow,
    /// x position (axis units) of the time cursor.
    pub cursor: Option<f64>,
}

impl<'a> Widget for StatusPanelChart<'a> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters may fail to lay out a chart in a tiny area.
        if area.width < 20 || area.height < 6 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let style = PanelStyle::terminal();
        let widget = widget_fn(move |root| {
            draw_category(&root, self.series, self.category, self.window, None, self.cursor, &style)?;
            Ok(())
        });

        widget.render(area, buf);
    }
}
