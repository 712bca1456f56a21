//! Ratatui-based terminal view.
//!
//! Shows the three stacked status charts of a finished run. A time cursor
//! (←/→) walks the distinct report timestamps; the footer shows the counts
//! at the cursor.

use std::io;
use std::time::Duration;

use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, Paragraph},
};

use crate::app::pipeline::RunOutput;
use crate::domain::{BedStatus, RunConfig, StatusCategory, TimePoint};
use crate::error::AppError;
use crate::render::{ChartWindow, chart_window, register_fonts, time_to_x};

mod plotters_chart;

use plotters_chart::StatusPanelChart;

const CURSOR_TIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// Cursor step for PageUp/PageDown.
const PAGE: usize = 10;

/// Start the view on an already computed run.
pub fn run(run: RunOutput, config: &RunConfig) -> Result<(), AppError> {
    let now = chrono::Local::now().naive_local();
    let window = chart_window(config, now)?;
    register_fonts()?;

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App::new(run, window, config.data_dir.display().to_string());
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::new(4, format!("Failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::new(4, format!("Failed to enter alternate screen: {e}")));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

struct App {
    run: RunOutput,
    window: ChartWindow,
    source: String,
    /// Index into `run.points`.
    cursor: usize,
}

impl App {
    fn new(run: RunOutput, window: ChartWindow, source: String) -> Self {
        let cursor = run.points.len().saturating_sub(1);
        Self {
            run,
            window,
            source,
            cursor,
        }
    }

    fn event_loop<B: ratatui::backend::Backend>(&mut self, terminal: &mut Terminal<B>) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::new(4, format!("Terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::new(4, format!("Event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::new(4, format!("Event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns `true` when the view should close.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        let last = self.run.points.len().saturating_sub(1);
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Left => self.cursor = self.cursor.saturating_sub(1),
            KeyCode::Right => self.cursor = (self.cursor + 1).min(last),
            KeyCode::PageUp => self.cursor = self.cursor.saturating_sub(PAGE),
            KeyCode::PageDown => self.cursor = (self.cursor + PAGE).min(last),
            KeyCode::Home => self.cursor = 0,
            KeyCode::End => self.cursor = last,
            _ => {}
        }
        false
    }

    fn current(&self) -> Option<&TimePoint> {
        self.run.points.get(self.cursor)
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(3), Constraint::Min(0), Constraint::Length(6)])
            .split(frame.area());

        self.draw_header(frame, chunks[0]);
        self.draw_charts(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let line = Line::from(vec![
            Span::styled(
                "ICU bed availability",
                Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
            ),
            Span::raw(format!(
                " | {} | files={} reports={} roster={}",
                self.source,
                self.run.loaded.files.len(),
                self.run.dedup.reports.len(),
                self.run.roster_size(),
            )),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_charts(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let panels = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Ratio(1, 3), Constraint::Ratio(1, 3), Constraint::Ratio(1, 3)])
            .split(area);

        let cursor = self.current().map(|p| time_to_x(p.time));
        for (rect, category) in panels.iter().zip(StatusCategory::ALL) {
            let block = Block::default().title(category.display_name()).borders(Borders::ALL);
            let inner = block.inner(*rect);
            frame.render_widget(block, *rect);
            frame.render_widget(Clear, inner);

            frame.render_widget(
                StatusPanelChart {
                    series: &self.run.series,
                    category,
                    window: self.window,
                    cursor,
                },
                inner,
            );
        }
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut lines = Vec::with_capacity(5);
        match self.current() {
            Some(point) => {
                lines.push(Line::from(vec![
                    Span::styled(
                        format!("as of {}", point.time.format(CURSOR_TIME_FORMAT)),
                        Style::default().fg(Color::Yellow),
                    ),
                    Span::raw(format!(
                        "  ({}/{})  clinics={}",
                        self.cursor + 1,
                        self.run.points.len(),
                        point.clinics
                    )),
                ]));
                for category in StatusCategory::ALL {
                    lines.push(counts_line(point, category));
                }
            }
            None => lines.push(Line::from("No report timestamps.")),
        }
        lines.push(Line::from(Span::styled(
            "←/→ move  PgUp/PgDn jump  Home/End  q quit",
            Style::default().fg(Color::Gray),
        )));

        let p = Paragraph::new(Text::from(lines));
        frame.render_widget(p, area);
    }
}

fn status_fg(status: BedStatus) -> Color {
    match status {
        BedStatus::Available => Color::Green,
        BedStatus::Limited => Color::Yellow,
        BedStatus::Occupied => Color::Red,
        BedStatus::Unknown => Color::Gray,
    }
}

fn counts_line(point: &TimePoint, category: StatusCategory) -> Line<'static> {
    let counts = point.counts.category(category);
    let mut spans = vec![Span::raw(format!("{:<14}", category.display_name()))];
    for status in BedStatus::ALL {
        spans.push(Span::styled(
            format!("{}={:<5}", status.label(), counts.get(status)),
            Style::default().fg(status_fg(status)),
        ));
    }
    Line::from(spans)
}
