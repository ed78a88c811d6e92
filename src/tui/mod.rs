//! Ratatui-based forecast dashboard.
//!
//! Reads the outputs of `callvol forecast` and renders, per LOB:
//! - Overview: monthly and weekly call-volume forecasts
//! - Sensitivity: weekly volume for a what-if membership level and contact rate
//! - Intervals: monthly forecast with its lower/upper band

use std::io;
use std::path::Path;
use std::time::Duration;

use chrono::NaiveDate;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span, Text},
    widgets::{Block, Borders, Clear, List, ListItem, ListState, Paragraph, Tabs},
};
use tracing::info;

use crate::error::AppError;

mod plotters_chart;
pub mod state;

use plotters_chart::{
    BAND_COLOR, ChartSeries, FORECAST_COLOR, ForecastChart, SCENARIO_COLOR, SeriesKind, WEEKLY_COLOR,
};
use state::{DashboardData, DashboardState, Field, Tab};

/// Start the dashboard over the outputs in `output_dir`.
pub fn run(output_dir: &Path) -> Result<(), AppError> {
    // Load before touching the terminal so errors print normally.
    let data = DashboardData::load(output_dir)?;
    info!(dir = %output_dir.display(), lobs = data.lobs.len(), "dashboard data loaded");

    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::new(4, format!("Failed to initialize terminal: {e}")))?;

    let mut app = App {
        data,
        state: DashboardState::default(),
    };
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
    data: DashboardData,
    state: DashboardState,
}

impl App {
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

    /// Returns true when the dashboard should exit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        match code {
            KeyCode::Char('q') | KeyCode::Esc => return true,
            KeyCode::Tab => self.state.next_tab(),
            KeyCode::Left => self.state.shift_lob(-1, self.data.lobs.len()),
            KeyCode::Right => self.state.shift_lob(1, self.data.lobs.len()),
            KeyCode::Up => self.state.select_field(Field::Membership),
            KeyCode::Down => self.state.select_field(Field::ContactRate),
            KeyCode::Char('+') | KeyCode::Char('=') => self.state.adjust(1),
            KeyCode::Char('-') => self.state.adjust(-1),
            _ => {}
        }
        false
    }

    fn current_lob(&self) -> Option<&str> {
        self.data.lobs.get(self.state.lob_index).map(String::as_str)
    }

    fn draw(&self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(5), Constraint::Min(0), Constraint::Length(3)])
            .split(size);

        self.draw_header(frame, chunks[0]);
        match self.state.tab {
            Tab::Overview => self.draw_overview(frame, chunks[1]),
            Tab::Sensitivity => self.draw_sensitivity(frame, chunks[1]),
            Tab::Intervals => self.draw_intervals(frame, chunks[1]),
        }
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let block = Block::default().borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);

        let rows = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(1), Constraint::Length(1), Constraint::Length(1)])
            .split(inner);

        let lob = self.current_lob().unwrap_or("-");
        let title = Line::from(vec![
            Span::styled("callvol", Style::default().fg(Color::Cyan)),
            Span::raw(" call volume forecast | LOB: "),
            Span::styled(
                format!("{lob} ({}/{})", self.state.lob_index + 1, self.data.lobs.len().max(1)),
                Style::default().add_modifier(Modifier::BOLD),
            ),
        ]);
        frame.render_widget(Paragraph::new(title), rows[0]);

        let titles: Vec<Line> = Tab::ALL.iter().map(|t| Line::from(t.title())).collect();
        let tabs = Tabs::new(titles)
            .select(self.state.tab.index())
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White));
        frame.render_widget(tabs, rows[1]);

        let detail = match self.current_lob().and_then(|l| self.data.summary_for(l)) {
            Some(s) => {
                let metrics = s
                    .metrics
                    .map(|m| format!("MAPE={:.2}% RMSE={:.1}", m.mape * 100.0, m.rmse))
                    .unwrap_or_else(|| "metrics n/a".to_string());
                format!(
                    "model: {} | contact rate: {:.2} | {metrics} | fallback months: {:?}",
                    s.model.model.display_name, s.contact_rate, s.fallback_months
                )
            }
            None => "no run summary available".to_string(),
        };
        frame.render_widget(
            Paragraph::new(detail).style(Style::default().fg(Color::Gray)),
            rows[2],
        );
    }

    fn draw_overview(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .split(area);

        let lob = self.current_lob().unwrap_or_default();
        let monthly: Vec<(f64, f64)> = self
            .data
            .monthly_for(lob)
            .iter()
            .map(|m| (day_number(m.period_start), m.monthly_call_volume))
            .collect();
        let weekly: Vec<(f64, f64)> = self
            .data
            .weekly_for(lob)
            .iter()
            .map(|w| (day_number(w.week_start), w.estimated_weekly_call_volume))
            .collect();

        let monthly_series = [ChartSeries {
            points: &monthly,
            color: FORECAST_COLOR,
            kind: SeriesKind::Line,
        }];
        self.draw_chart(frame, chunks[0], "Monthly call volume", &monthly_series);

        let weekly_series = [ChartSeries {
            points: &weekly,
            color: WEEKLY_COLOR,
            kind: SeriesKind::Line,
        }];
        self.draw_chart(frame, chunks[1], "Weekly call volume", &weekly_series);
    }

    fn draw_sensitivity(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Length(44), Constraint::Min(0)])
            .split(area);

        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Length(4), Constraint::Min(0)])
            .split(chunks[0]);

        let items = vec![
            ListItem::new(format!("Membership:   {:>9}", self.state.membership)),
            ListItem::new(format!("Contact rate: {:>9.2}", self.state.contact_rate())),
        ];
        let list = List::new(items)
            .block(Block::default().title("What-if").borders(Borders::ALL))
            .highlight_style(Style::default().fg(Color::Black).bg(Color::White))
            .highlight_symbol("» ");
        let mut list_state = ListState::default();
        list_state.select(Some(match self.state.field {
            Field::Membership => 0,
            Field::ContactRate => 1,
        }));
        frame.render_stateful_widget(list, left[0], &mut list_state);

        let lob = self.current_lob().unwrap_or_default();
        let adjusted = self.state.adjusted_weekly_volume();
        let mut lines = vec![Line::from(vec![
            Span::raw("Adjusted weekly volume: "),
            Span::styled(
                format!("{adjusted:.0}"),
                Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
            ),
        ])];
        lines.push(Line::from(format!(
            "Monthly equivalent:     {:.0}",
            self.state.membership as f64 * self.state.contact_rate() / 12.0
        )));
        if let Some(mean) = self.data.mean_weekly_volume(lob) {
            let diff = if mean.abs() > f64::EPSILON { (adjusted / mean - 1.0) * 100.0 } else { 0.0 };
            lines.push(Line::from(format!("Forecast mean weekly:   {mean:.0}")));
            lines.push(Line::from(format!("Difference:             {diff:+.1}%")));
        }
        let p = Paragraph::new(Text::from(lines)).block(Block::default().title("Result").borders(Borders::ALL));
        frame.render_widget(p, left[1]);

        let weekly: Vec<(f64, f64)> = self
            .data
            .weekly_for(lob)
            .iter()
            .map(|w| (day_number(w.week_start), w.estimated_weekly_call_volume))
            .collect();
        let scenario: Vec<(f64, f64)> = match (weekly.first(), weekly.last()) {
            (Some(&(x0, _)), Some(&(x1, _))) => vec![(x0, adjusted), (x1, adjusted)],
            _ => Vec::new(),
        };
        let series = [
            ChartSeries {
                points: &weekly,
                color: WEEKLY_COLOR,
                kind: SeriesKind::Line,
            },
            ChartSeries {
                points: &scenario,
                color: SCENARIO_COLOR,
                kind: SeriesKind::Line,
            },
        ];
        self.draw_chart(frame, chunks[1], "Weekly forecast vs what-if", &series);
    }

    fn draw_intervals(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let lob = self.current_lob().unwrap_or_default();
        let rows = self.data.monthly_for(lob);

        let mid: Vec<(f64, f64)> = rows
            .iter()
            .map(|m| (day_number(m.period_start), m.monthly_call_volume))
            .collect();
        let lower: Vec<(f64, f64)> = rows
            .iter()
            .filter_map(|m| m.monthly_call_volume_lower.map(|v| (day_number(m.period_start), v)))
            .collect();
        let upper: Vec<(f64, f64)> = rows
            .iter()
            .filter_map(|m| m.monthly_call_volume_upper.map(|v| (day_number(m.period_start), v)))
            .collect();

        let series = [
            ChartSeries {
                points: &lower,
                color: BAND_COLOR,
                kind: SeriesKind::Line,
            },
            ChartSeries {
                points: &upper,
                color: BAND_COLOR,
                kind: SeriesKind::Line,
            },
            ChartSeries {
                points: &mid,
                color: FORECAST_COLOR,
                kind: SeriesKind::Line,
            },
        ];
        self.draw_chart(frame, area, "Monthly forecast with interval", &series);
    }

    fn draw_chart(&self, frame: &mut ratatui::Frame<'_>, area: Rect, title: &str, series: &[ChartSeries<'_>]) {
        let block = Block::default().title(title.to_string()).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        let Some((x_bounds, y_bounds)) = chart_bounds(series) else {
            let msg = Paragraph::new("No forecast rows for this LOB.")
                .style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        };

        let (chart_rect, insets) = chart_layout(inner);
        let widget = ForecastChart {
            series,
            x_bounds,
            y_bounds,
            x_label: "month",
            y_label: "calls",
            fmt_x: fmt_axis_date,
            fmt_y: fmt_axis_volume,
        };
        frame.render_widget(widget, chart_rect);
        if let Some(insets) = insets {
            draw_axis_ticks(frame, inner, chart_rect, insets, x_bounds, y_bounds);
        }
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "Tab next tab  ←/→ LOB  ↑/↓ field  +/- adjust  q quit";
        let line = Line::from(vec![Span::styled(help, Style::default().fg(Color::Gray))]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

/// Days from the common era; lets the x axis carry calendar dates.
fn day_number(date: NaiveDate) -> f64 {
    use chrono::Datelike;
    date.num_days_from_ce() as f64
}

/// Combined x/y bounds over all series, with 5% vertical padding.
fn chart_bounds(series: &[ChartSeries<'_>]) -> Option<([f64; 2], [f64; 2])> {
    let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for &(x, y) in series.iter().flat_map(|s| s.points.iter()) {
        x_min = x_min.min(x);
        x_max = x_max.max(x);
        y_min = y_min.min(y);
        y_max = y_max.max(y);
    }
    if !(x_min.is_finite() && y_min.is_finite()) {
        return None;
    }
    if x_max <= x_min {
        x_min -= 15.0;
        x_max += 15.0;
    }
    if y_max <= y_min {
        y_min -= 1.0;
        y_max += 1.0;
    }
    let pad = ((y_max - y_min).abs() * 0.05).max(1e-12);
    Some(([x_min, x_max], [y_min - pad, y_max + pad]))
}

fn fmt_axis_date(v: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(v.round() as i32)
        .map(|d| d.format("%Y-%m").to_string())
        .unwrap_or_default()
}

fn fmt_axis_volume(v: f64) -> String {
    format!("{v:.0}")
}

#[derive(Debug, Clone, Copy)]
struct AxisInsets {
    left: u16,
    right: u16,
    top: u16,
    bottom: u16,
}

fn chart_layout(inner: Rect) -> (Rect, Option<AxisInsets>) {
    let insets = AxisInsets {
        left: 9,
        right: 2,
        top: 1,
        bottom: 2,
    };

    if inner.width <= insets.left + insets.right + 10
        || inner.height <= insets.top + insets.bottom + 5
    {
        return (inner, None);
    }

    let rect = Rect {
        x: inner.x + insets.left,
        y: inner.y + insets.top,
        width: inner.width - insets.left - insets.right,
        height: inner.height - insets.top - insets.bottom,
    };

    (rect, Some(insets))
}

fn draw_axis_ticks(
    frame: &mut ratatui::Frame<'_>,
    inner: Rect,
    chart: Rect,
    insets: AxisInsets,
    x_bounds: [f64; 2],
    y_bounds: [f64; 2],
) {
    let ticks = 5usize;
    let style = Style::default().fg(Color::Gray);

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let x_val = x_bounds[0] + u * (x_bounds[1] - x_bounds[0]);
        let x = chart.x + ((chart.width - 1) as f64 * u).round() as u16;
        let label = fmt_axis_date(x_val);
        let label_len = label.len() as u16;
        let start = x.saturating_sub((label.len() / 2) as u16);
        let y = chart.y + chart.height;
        if y >= inner.y + inner.height - 1 {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    for i in 0..ticks {
        let u = i as f64 / (ticks as f64 - 1.0);
        let y_val = y_bounds[0] + u * (y_bounds[1] - y_bounds[0]);
        let y = chart.y + (chart.height - 1) - ((chart.height - 1) as f64 * u).round() as u16;
        let label = fmt_axis_volume(y_val);
        let label_len = label.len() as u16;
        let x = inner.x + insets.left.saturating_sub(1);
        let start = x.saturating_sub(label.len() as u16);
        if start < inner.x {
            continue;
        }
        frame.render_widget(
            Paragraph::new(label).style(style),
            Rect {
                x: start,
                y,
                width: label_len,
                height: 1,
            },
        );
    }

    let x_label = Paragraph::new("month")
        .alignment(Alignment::Center)
        .style(Style::default().fg(Color::Gray));
    let x_rect = Rect {
        x: chart.x,
        y: chart.y + chart.height + 1,
        width: chart.width,
        height: 1,
    };
    if x_rect.y < inner.y + inner.height {
        frame.render_widget(x_label, x_rect);
    }

    let y_label = Paragraph::new("calls").style(Style::default().fg(Color::Gray).add_modifier(Modifier::BOLD));
    let y_rect = Rect {
        x: inner.x,
        y: inner.y,
        width: insets.left.saturating_sub(1),
        height: 1,
    };
    frame.render_widget(y_label, y_rect);
}
