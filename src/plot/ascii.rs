//! ASCII plotting for terminal output.
//!
//! Fixed-size character grid, deterministic so it can be golden-tested.
//!
//! Plot elements:
//! - samples: `o`
//! - fitted curve: `-` line

use crate::domain::{FitResult, Sample};
use crate::plot::{pad_range, span};

/// Render samples and (optionally) the fitted curve into a `width × height` grid.
///
/// The flow axis spans the samples, or the fit range when there are fewer
/// than two distinct flow rates.
pub fn render_ascii_plot(
    samples: &[Sample],
    fit: Option<&FitResult>,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (x_min, x_max) = span(samples.iter().map(|s| s.flow_rate))
        .or_else(|| fit.map(|f| (f.flow_min, f.flow_max)).filter(|(lo, hi)| hi > lo))
        .unwrap_or((0.0, 1.0));

    let curve: Vec<(f64, f64)> = fit
        .map(|f| {
            crate::math::linspace(x_min, x_max, width)
                .into_iter()
                .map(|x| (x, f.evaluate(x)))
                .collect()
        })
        .unwrap_or_default();

    let ys = samples
        .iter()
        .map(|s| s.pressure)
        .chain(curve.iter().map(|&(_, y)| y));
    let (y_min, y_max) = span(ys).unwrap_or_else(|| {
        let v = samples.first().map_or(0.0, |s| s.pressure);
        (v - 1.0, v + 1.0)
    });
    let (y_min, y_max) = pad_range(y_min, y_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curve first so samples overlay it.
    draw_curve(&mut grid, &curve, x_min, x_max, y_min, y_max);

    for s in samples.iter().filter(|s| s.is_finite()) {
        let x = map_x(s.flow_rate, x_min, x_max, width);
        let y = map_y(s.pressure, y_min, y_max, height);
        grid[y][x] = 'o';
    }

    let mut out = format!(
        "Plot: flow=[{x_min:.3}, {x_max:.3}] m³/s | pressure=[{y_min:.2}, {y_max:.2}] Pa\n"
    );
    for row in grid {
        out.extend(row);
        out.push('\n');
    }
    out
}

fn map_x(x: f64, x_min: f64, x_max: f64, width: usize) -> usize {
    let u = ((x - x_min) / (x_max - x_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(y: f64, y_min: f64, y_max: f64, height: usize) -> usize {
    let u = ((y - y_min) / (y_max - y_min)).clamp(0.0, 1.0);
    // Highest pressure on row 0.
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], x_min: f64, x_max: f64, y_min: f64, y_max: f64) {
    let height = grid.len();
    let width = grid[0].len();

    let mut prev: Option<(usize, usize)> = None;
    for &(x, y) in curve.iter().filter(|(_, y)| y.is_finite()) {
        let cell = (map_x(x, x_min, x_max, width), map_y(y, y_min, y_max, height));
        match prev {
            Some(from) => draw_line(grid, from, cell, '-'),
            None => grid[cell.1][cell.0] = '-',
        }
        prev = Some(cell);
    }
}

/// Bresenham line between two cells; only blank cells are written.
fn draw_line(grid: &mut [Vec<char>], from: (usize, usize), to: (usize, usize), ch: char) {
    let (mut x0, mut y0) = (from.0 as isize, from.1 as isize);
    let (x1, y1) = (to.0 as isize, to.1 as isize);

    let dx = (x1 - x0).abs();
    let sx = if x0 < x1 { 1 } else { -1 };
    let dy = -(y1 - y0).abs();
    let sy = if y0 < y1 { 1 } else { -1 };
    let mut err = dx + dy;

    loop {
        if let Some(cell) = grid
            .get_mut(y0 as usize)
            .and_then(|row| row.get_mut(x0 as usize))
        {
            if *cell == ' ' {
                *cell = ch;
            }
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
