//! Plotters-powered fan curve chart widget for Ratatui.
//!
//! We render Plotters output into the Ratatui buffer using `plotters-ratatui-backend`,
//! the same drawing library that produces the stored SVG previews.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// A render-only chart description; series and bounds are computed by the caller.
pub struct CurveChart<'a> {
    /// Fitted pressure curve; empty when there is no fit.
    pub curve: &'a [(f64, f64)],
    /// Complete sample rows.
    pub samples: &'a [(f64, f64)],
    /// Sample on the selected table row, drawn highlighted.
    pub selected: Option<(f64, f64)>,
    /// Flow-rate bounds (m³/s).
    pub x_bounds: [f64; 2],
    /// Pressure bounds (Pa).
    pub y_bounds: [f64; 2],
}

impl Widget for CurveChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        if area.width < 20 || area.height < 8 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite()) || x1 <= x0 || y1 <= y0 {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                .set_label_area_size(LabelAreaPosition::Left, 6)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            // Mesh lines are noise at terminal resolution; axes are enough.
            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc("flow (m³/s)")
                .y_desc("pressure (Pa)")
                .x_labels(5)
                .y_labels(5)
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            chart.draw_series(LineSeries::new(self.curve.iter().copied(), &RGBColor(0, 255, 255)))?;

            // `Circle` radii are mapped wrongly by the ratatui backend; pixels stay crisp.
            chart.draw_series(self.samples.iter().map(|&(x, y)| Pixel::new((x, y), WHITE)))?;
            chart.draw_series(
                self.selected
                    .into_iter()
                    .map(|(x, y)| Pixel::new((x, y), RGBColor(255, 255, 0))),
            )?;

            Ok(())
        });

        widget.render(area, buf);
    }
}

/// Chart series and bounds for the samples and an optional fit.
///
/// Bounds cover both the samples and the curve, padded by 5%. Without data
/// the chart falls back to the unit square.
pub fn chart_series(
    samples: &[(f64, f64)],
    curve: &[(f64, f64)],
) -> ([f64; 2], [f64; 2]) {
    let xs = samples.iter().chain(curve).map(|&(x, _)| x);
    let ys = samples.iter().chain(curve).map(|&(_, y)| y);

    let x_bounds = match crate::plot::span(xs) {
        Some((lo, hi)) => {
            let (lo, hi) = crate::plot::pad_range(lo, hi, 0.05);
            [lo, hi]
        }
        None => single_point_bounds(samples.first().map(|p| p.0)),
    };
    let y_bounds = match crate::plot::span(ys) {
        Some((lo, hi)) => {
            let (lo, hi) = crate::plot::pad_range(lo, hi, 0.05);
            [lo, hi]
        }
        None => single_point_bounds(samples.first().map(|p| p.1)),
    };
    (x_bounds, y_bounds)
}

fn single_point_bounds(value: Option<f64>) -> [f64; 2] {
    match value {
        Some(v) if v.is_finite() => {
            let pad = (v.abs() * 0.1).max(1.0);
            [v - pad, v + pad]
        }
        _ => [0.0, 1.0],
    }
}
