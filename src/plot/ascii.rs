//! ASCII/Unicode plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - historical monthly call volume: `o`
//! - forecast line: `-` (joined to the last historical month), forecast months `*`
//! - forecast band (lower/upper): `:`

use chrono::NaiveDate;

use crate::domain::MonthlyForecastRow;
use crate::models::month_ordinal;

/// Render historical monthly volume plus the monthly forecast and its band.
pub fn render_volume_plot(
    history: &[(NaiveDate, f64)],
    monthly: &[MonthlyForecastRow],
    width: usize,
    height: usize,
) -> String {
    let Some(origin) = history
        .iter()
        .map(|(d, _)| *d)
        .chain(monthly.iter().map(|m| m.period_start))
        .min()
    else {
        return "Plot: no data\n".to_string();
    };
    let last = history
        .iter()
        .map(|(d, _)| *d)
        .chain(monthly.iter().map(|m| m.period_start))
        .max()
        .unwrap_or(origin);

    let points: Vec<(f64, f64)> = history
        .iter()
        .map(|&(d, v)| (month_ordinal(origin, d), v))
        .collect();
    let forecast: Vec<(f64, f64)> = monthly
        .iter()
        .map(|m| (month_ordinal(origin, m.period_start), m.monthly_call_volume))
        .collect();
    let mut line: Vec<(f64, f64)> = points.last().copied().into_iter().collect();
    line.extend(forecast.iter().copied());

    let mut band = Vec::new();
    for m in monthly {
        let t = month_ordinal(origin, m.period_start);
        for v in [m.monthly_call_volume_lower, m.monthly_call_volume_upper].into_iter().flatten() {
            band.push((t, v));
        }
    }

    let (t_min, t_max) = (0.0, month_ordinal(origin, last));
    let (t_min, t_max) = if t_max > t_min { (t_min, t_max) } else { (t_min - 1.0, t_max + 1.0) };

    let layers = Layers {
        points: &points,
        line: &line,
        band: &band,
        forecast: &forecast,
    };
    let mut out = String::new();
    let body = render_plot(&layers, t_min, t_max, width, height);
    out.push_str(&format!(
        "Plot: months=[{}, {}] | calls=[{:.2}, {:.2}]\n",
        origin.format("%Y-%m"),
        last.format("%Y-%m"),
        body.y_min,
        body.y_max
    ));
    out.push_str(&body.text);
    out
}

struct Layers<'a> {
    points: &'a [(f64, f64)],
    line: &'a [(f64, f64)],
    band: &'a [(f64, f64)],
    forecast: &'a [(f64, f64)],
}

struct PlotBody {
    text: String,
    y_min: f64,
    y_max: f64,
}

fn render_plot(layers: &Layers<'_>, t_min: f64, t_max: f64, width: usize, height: usize) -> PlotBody {
    let width = width.max(10);
    let height = height.max(5);

    let all = layers
        .points
        .iter()
        .chain(layers.line)
        .chain(layers.band)
        .map(|&(_, y)| y);
    let (y_min, y_max) = y_range(all).unwrap_or((0.0, 1.0));
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Line first, band only into blank cells, then markers on top.
    draw_curve(&mut grid, layers.line, t_min, t_max, y_min, y_max);
    for &(t, y) in layers.band {
        let x = map_x(t, t_min, t_max, width);
        let yy = map_y(y, y_min, y_max, height);
        if grid[yy][x] == ' ' {
            grid[yy][x] = ':';
        }
    }
    for &(t, y) in layers.points {
        grid[map_y(y, y_min, y_max, height)][map_x(t, t_min, t_max, width)] = 'o';
    }
    for &(t, y) in layers.forecast {
        grid[map_y(y, y_min, y_max, height)][map_x(t, t_min, t_max, width)] = '*';
    }

    let mut text = String::new();
    for row in grid {
        text.push_str(&row.into_iter().collect::<String>());
        text.push('\n');
    }

    PlotBody { text, y_min, y_max }
}

fn y_range(values: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min_y = f64::INFINITY;
    let mut max_y = f64::NEG_INFINITY;
    for y in values.filter(|y| y.is_finite()) {
        min_y = min_y.min(y);
        max_y = max_y.max(y);
    }

    if min_y.is_finite() && max_y.is_finite() && max_y > min_y {
        Some((min_y, max_y))
    } else if min_y.is_finite() {
        Some((min_y - 1.0, min_y + 1.0))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(t: f64, t_min: f64, t_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((t - t_min) / (t_max - t_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // y=top is max -> row 0
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], t_min: f64, t_max: f64, y_min: f64, y_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(t, y) in curve {
        let x = map_x(t, t_min, t_max, width);
        let yy = map_y(y, y_min, y_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, x, yy, '-');
        } else {
            grid[yy][x] = '-';
        }
        prev = Some((x, yy));
    }
}

/// Integer line drawing (Bresenham-ish).
fn draw_line(grid: &mut [Vec<char>], x0: usize, y0: usize, x1: usize, y1: usize, ch: char) {
    let mut x0 = x0 as isize;
    let mut y0 = y0 as isize;
    let x1 = x1 as isize;
    let y1 = y1 as isize;

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if y0 >= 0
            && (y0 as usize) < grid.len()
            && x0 >= 0
            && (x0 as usize) < grid[0].len()
            && grid[y0 as usize][x0 as usize] == ' '
        {
            grid[y0 as usize][x0 as usize] = ch;
        }

        if x0 == x1 && y0 == y1 {
            break;
        }
        let e2 = 2 * err;
        if e2 >= dy {
            err += dy;
            x0 += sx;
        }
        if e2 <= dx {
            err += dx;
            y0 += sy;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(y: i32, m: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, 1).unwrap()
    }

    #[test]
    fn plot_golden_snapshot_small() {
        let history = vec![(d(2024, 1), 100.0), (d(2024, 2), 110.0)];
        let mut row = MonthlyForecastRow::bare(d(2024, 3), 120.0, None);
        row.monthly_call_volume_lower = Some(115.0);
        row.monthly_call_volume_upper = Some(125.0);

        let txt = render_volume_plot(&history, &[row], 10, 5);
        let expected = concat!(
            "Plot: months=[2024-01, 2024-03] | calls=[98.75, 126.25]\n",
            "         :\n",
            "       --*\n",
            "     o-  :\n",
            "          \n",
            "o         \n",
        );
        assert_eq!(txt, expected);
    }

    #[test]
    fn empty_inputs_render_placeholder() {
        assert_eq!(render_volume_plot(&[], &[], 20, 8), "Plot: no data\n");
    }

    #[test]
    fn single_forecast_month_does_not_panic() {
        let row = MonthlyForecastRow::bare(d(2024, 3), 50.0, None);
        let txt = render_volume_plot(&[], &[row], 12, 6);
        assert!(txt.contains('*'));
        assert_eq!(txt.lines().count(), 7);
    }
}
