//! SVG preview of a fitted curve.
//!
//! The preview is stored with the fit artifact as opaque bytes and embedded in
//! reports. SVG keeps the renderer free of native font and image dependencies.

use plotters::prelude::*;

use crate::domain::{FitResult, MediaType, PreviewImage, Sample};
use crate::plot::{PreviewError, pad_range, span};

const PREVIEW_SIZE: (u32, u32) = (800, 500);

/// Draw samples and the dense fitted curve as an SVG image.
pub fn render_preview(samples: &[Sample], fit: &FitResult) -> Result<PreviewImage, PreviewError> {
    let curve = fit.curve();

    let (x0, x1) = span(samples.iter().map(|s| s.flow_rate).chain([fit.flow_min, fit.flow_max]))
        .unwrap_or((fit.flow_min - 1.0, fit.flow_max + 1.0));
    let (x0, x1) = pad_range(x0, x1, 0.05);

    let ys: Vec<f64> = samples
        .iter()
        .map(|s| s.pressure)
        .chain(curve.iter().map(|&(_, y)| y))
        .collect();
    let (y0, y1) = match span(ys.iter().copied()) {
        Some((lo, hi)) if hi - lo > 1e-9 * lo.abs().max(hi.abs()).max(1.0) => pad_range(lo, hi, 0.08),
        Some((lo, hi)) => level_range((lo + hi) / 2.0),
        None => {
            let level = ys.iter().copied().find(|v| v.is_finite()).ok_or_else(|| {
                PreviewError::Render("no finite pressure range to plot".to_string())
            })?;
            level_range(level)
        }
    };

    let mut svg = String::new();
    {
        let root = SVGBackend::with_string(&mut svg, PREVIEW_SIZE).into_drawing_area();
        root.fill(&WHITE).map_err(render_err)?;

        let mut chart = ChartBuilder::on(&root)
            .caption("Pump Curve", ("sans-serif", 24))
            .margin(16)
            .x_label_area_size(40)
            .y_label_area_size(60)
            .build_cartesian_2d(x0..x1, y0..y1)
            .map_err(render_err)?;

        chart
            .configure_mesh()
            .x_desc("Flow Rate (m³/s)")
            .y_desc("Pressure (Pa)")
            .draw()
            .map_err(render_err)?;

        chart
            .draw_series(LineSeries::new(curve.iter().copied(), BLUE.stroke_width(2)))
            .map_err(render_err)?
            .label(format!("Fitted Curve (degree {})", fit.degree))
            .legend(|(x, y)| PathElement::new(vec![(x, y), (x + 20, y)], BLUE));

        chart
            .draw_series(
                samples
                    .iter()
                    .map(|s| Circle::new((s.flow_rate, s.pressure), 4, RED.filled())),
            )
            .map_err(render_err)?
            .label("Data Points")
            .legend(|(x, y)| Circle::new((x + 10, y), 4, RED.filled()));

        chart
            .configure_series_labels()
            .background_style(WHITE.mix(0.8))
            .border_style(BLACK)
            .draw()
            .map_err(render_err)?;

        root.present().map_err(render_err)?;
    }

    Ok(PreviewImage {
        media_type: MediaType::Svg,
        bytes: svg.into_bytes(),
    })
}

/// A visible range around a constant pressure level.
fn level_range(level: f64) -> (f64, f64) {
    let pad = (level.abs() * 0.1).max(1.0);
    (level - pad, level + pad)
}

fn render_err(err: impl std::fmt::Display) -> PreviewError {
    PreviewError::Render(err.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fit::fit;

    #[test]
    fn preview_is_labelled_svg() {
        let samples = vec![
            Sample::new(1.0, 100.0),
            Sample::new(2.0, 80.0),
            Sample::new(3.0, 50.0),
        ];
        let fit = fit(&samples, 2).unwrap();
        let image = render_preview(&samples, &fit).unwrap();

        assert_eq!(image.media_type, MediaType::Svg);
        let text = String::from_utf8(image.bytes).unwrap();
        assert!(text.contains("<svg"));
        assert!(text.contains("Pump Curve"));
        assert!(text.contains("Pressure (Pa)"));
        assert!(text.matches("<circle").count() >= 3);
    }

    #[test]
    fn constant_pressure_still_renders() {
        for level in [0.0, 250.0] {
            let samples = vec![
                Sample::new(1.0, level),
                Sample::new(2.0, level),
                Sample::new(3.0, level),
            ];
            let fit = fit(&samples, 1).unwrap();
            let image = render_preview(&samples, &fit).unwrap();
            let text = String::from_utf8(image.bytes).unwrap();
            assert!(text.matches("<circle").count() >= 3);
        }
    }

    #[test]
    fn level_range_brackets_the_level() {
        assert_eq!(level_range(0.0), (-1.0, 1.0));
        assert_eq!(level_range(250.0), (225.0, 275.0));
    }
}
