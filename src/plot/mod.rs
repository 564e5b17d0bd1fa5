//! Curve rendering.
//!
//! - `svg`: the preview image stored with a fit artifact and embedded in reports
//! - `ascii`: a fixed-size text plot for the terminal

pub mod ascii;
pub mod svg;

pub use ascii::render_ascii_plot;
pub use svg::render_preview;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum PreviewError {
    #[error("Failed to render curve preview: {0}")]
    Render(String),
}

/// `(min, max)` over `values`, or `None` when empty, non-finite or flat.
pub(crate) fn span(values: impl IntoIterator<Item = f64>) -> Option<(f64, f64)> {
    let (lo, hi) = values
        .into_iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| (lo.min(v), hi.max(v)));
    if lo.is_finite() && hi.is_finite() && hi > lo {
        Some((lo, hi))
    } else {
        None
    }
}

/// Widen a range by `frac` of its span on both sides.
pub(crate) fn pad_range(min: f64, max: f64, frac: f64) -> (f64, f64) {
    let span = (max - min).abs();
    let pad = (span * frac).max(1e-12);
    (min - pad, max + pad)
}
