//! ASCII plotting for terminal output.
//!
//! This is intentionally "dumb" (fixed-size grid), optimized for:
//! - quick visual sanity checks in a terminal
//! - deterministic output (helpful for golden tests)
//!
//! Plot elements:
//! - observed points: `o`
//! - fitted curve: `-` line

use crate::domain::{FitFile, IvResidual};
use crate::math::linspace;
use crate::models::CurrentDensityModel;

/// Render observed samples with the fitted curve of `model` at `params`.
pub fn render_ascii_plot<M>(
    residuals: &[IvResidual],
    model: &M,
    params: &[f64],
    width: usize,
    height: usize,
) -> String
where
    M: CurrentDensityModel + ?Sized,
{
    let (v_min, v_max) = voltage_range(residuals.iter().map(|r| r.voltage)).unwrap_or((-1.0, 1.0));
    let voltage = linspace(v_min, v_max, width.max(2));
    let current = model.evaluate(&voltage, params);
    let curve: Vec<(f64, f64)> = voltage.into_iter().zip(current).collect();
    render_plot(residuals, &curve, v_min, v_max, width, height)
}

/// Render the fitted grid stored in a fit JSON file (curve only).
pub fn render_ascii_plot_from_fit_file(fit: &FitFile, width: usize, height: usize) -> String {
    let (v_min, v_max) = voltage_range(fit.grid.voltage.iter().copied()).unwrap_or((-1.0, 1.0));
    let curve: Vec<(f64, f64)> = fit
        .grid
        .voltage
        .iter()
        .copied()
        .zip(fit.grid.current.iter().copied())
        .collect();

    render_plot(&[], &curve, v_min, v_max, width, height)
}

fn render_plot(
    residuals: &[IvResidual],
    curve: &[(f64, f64)],
    v_min: f64,
    v_max: f64,
    width: usize,
    height: usize,
) -> String {
    let width = width.max(10);
    let height = height.max(5);

    let (j_min, j_max) = j_range(residuals, curve).unwrap_or((0.0, 1.0));
    let (j_min, j_max) = pad_range(j_min, j_max, 0.05);

    let mut grid = vec![vec![' '; width]; height];

    // Curve first so points overlay it.
    draw_curve(&mut grid, curve, v_min, v_max, j_min, j_max);

    for r in residuals {
        if !(r.voltage.is_finite() && r.current.is_finite()) {
            continue;
        }
        let x = map_x(r.voltage, v_min, v_max, width);
        let y = map_y(r.current, j_min, j_max, height);
        grid[y][x] = 'o';
    }

    let mut out = String::new();
    out.push_str(&format!(
        "Plot: V=[{v_min:.3}, {v_max:.3}] | J=[{j_min:.3e}, {j_max:.3e}]\n"
    ));

    for row in grid {
        out.push_str(&row.into_iter().collect::<String>());
        out.push('\n');
    }

    out
}

fn voltage_range(voltage: impl Iterator<Item = f64>) -> Option<(f64, f64)> {
    let mut min_v = f64::INFINITY;
    let mut max_v = f64::NEG_INFINITY;
    for v in voltage {
        min_v = min_v.min(v);
        max_v = max_v.max(v);
    }
    if min_v.is_finite() && max_v.is_finite() && max_v > min_v {
        Some((min_v, max_v))
    } else {
        None
    }
}

fn j_range(residuals: &[IvResidual], curve: &[(f64, f64)]) -> Option<(f64, f64)> {
    let mut min_j = f64::INFINITY;
    let mut max_j = f64::NEG_INFINITY;

    let observed = residuals.iter().map(|r| r.current);
    let fitted = curve.iter().map(|&(_, j)| j);
    for j in observed.chain(fitted).filter(|j| j.is_finite()) {
        min_j = min_j.min(j);
        max_j = max_j.max(j);
    }

    if min_j.is_finite() && max_j.is_finite() && max_j > min_j {
        Some((min_j, max_j))
    } else {
        None
    }
}

fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}

fn map_x(v: f64, v_min: f64, v_max: f64, width: usize) -> usize {
    let width = width.max(2);
    let u = ((v - v_min) / (v_max - v_min)).clamp(0.0, 1.0);
    (u * (width as f64 - 1.0)).round() as usize
}

fn map_y(j: f64, j_min: f64, j_max: f64, height: usize) -> usize {
    let height = height.max(2);
    let u = ((j - j_min) / (j_max - j_min)).clamp(0.0, 1.0);
    // Row 0 is the top (largest J).
    (height as f64 - 1.0 - (u * (height as f64 - 1.0))).round() as usize
}

fn draw_curve(grid: &mut [Vec<char>], curve: &[(f64, f64)], v_min: f64, v_max: f64, j_min: f64, j_max: f64) {
    if curve.len() < 2 {
        return;
    }
    let height = grid.len();
    let width = grid[0].len();

    let mut prev = None;
    for &(v, j) in curve {
        if !(v.is_finite() && j.is_finite()) {
            prev = None;
            continue;
        }
        let x = map_x(v, v_min, v_max, width);
        let y = map_y(j, j_min, j_max, height);
        if let Some((x0, y0)) = prev {
            draw_line(grid, x0, y0, x, y, '-');
        } else {
            grid[y][x] = '-';
        }
        prev = Some((x, y));
    }
}

/// Integer line drawing (Bresenham).
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
