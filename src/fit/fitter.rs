//! Least-squares polynomial fitting of pressure against flow rate.
//!
//! Given samples `(x_i, y_i)` and a degree `d`, we solve
//!
//! ```text
//! minimize Σ (y_i - p(x_i))^2,   p(x) = c_d x^d + … + c_1 x + c_0
//! ```
//!
//! over a Vandermonde design matrix. Samples are treated as an unordered set;
//! duplicate flow rates are allowed but only distinct flow rates count towards
//! the degrees of freedom.

use chrono::Utc;
use nalgebra::{DMatrix, DVector};
use tracing::debug;

use crate::domain::{FitArtifact, FitQuality, FitResult, MAX_DEGREE, MIN_DEGREE, PreviewImage, Sample};
use crate::error::ErrorKind;
use crate::math::{linspace, solve_least_squares};
use crate::models::{fill_design_row, predict};

/// Number of points in the dense curve used for previews.
pub const DENSE_CURVE_POINTS: usize = 500;

/// Residual variance below this fraction of the total variance counts as an
/// exact fit when computing BIC.
const RELATIVE_VARIANCE_FLOOR: f64 = 1e-12;

/// Reasons a fit cannot be produced.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    #[error("Polynomial degree {degree} is outside 1..=7.")]
    InvalidDegree { degree: usize },

    #[error("Sample {index} has a non-finite flow rate or pressure.")]
    NonFiniteSample { index: usize },

    #[error(
        "At least {required} distinct flow rates are required for this fit (found {distinct})."
    )]
    InsufficientSamples { distinct: usize, required: usize },

    #[error("Degree {degree} fit is numerically ill-conditioned; try a lower degree or spread the flow rates.")]
    IllConditioned { degree: usize },
}

impl FitError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FitError::InvalidDegree { .. } | FitError::NonFiniteSample { .. } => {
                ErrorKind::PreconditionViolation
            }
            FitError::InsufficientSamples { .. } => ErrorKind::ValidationWarning,
            FitError::IllConditioned { .. } => ErrorKind::IllConditioned,
        }
    }
}

/// Fit a polynomial of `degree` to `samples`.
///
/// Preconditions are checked in order: degree range, finite samples, at least
/// two distinct flow rates, more distinct flow rates than the degree. A
/// degree-`d` fit through exactly `d` distinct points would interpolate rather
/// than regress, so it is rejected as `InsufficientSamples`.
pub fn fit(samples: &[Sample], degree: usize) -> Result<FitResult, FitError> {
    if !(MIN_DEGREE..=MAX_DEGREE).contains(&degree) {
        return Err(FitError::InvalidDegree { degree });
    }
    if let Some(index) = samples.iter().position(|s| !s.is_finite()) {
        return Err(FitError::NonFiniteSample { index });
    }

    let distinct = distinct_flow_rates(samples);
    if distinct < 2 {
        return Err(FitError::InsufficientSamples { distinct, required: 2 });
    }
    if distinct <= degree {
        return Err(FitError::InsufficientSamples {
            distinct,
            required: degree + 1,
        });
    }

    let n = samples.len();
    let p = degree + 1;
    let mut x = DMatrix::<f64>::zeros(n, p);
    let mut y = DVector::<f64>::zeros(n);
    let mut row = vec![0.0; p];

    for (i, s) in samples.iter().enumerate() {
        fill_design_row(s.flow_rate, &mut row);
        for (j, &v) in row.iter().enumerate() {
            x[(i, j)] = v;
        }
        y[i] = s.pressure;
    }

    let beta = solve_least_squares(&x, &y).ok_or(FitError::IllConditioned { degree })?;
    let coefficients: Vec<f64> = beta.iter().copied().collect();

    let quality = fit_quality(samples, &coefficients);
    if !(quality.sse.is_finite() && quality.bic.is_finite()) {
        return Err(FitError::IllConditioned { degree });
    }

    let (flow_min, flow_max) = flow_range(samples);
    debug!(degree, n, distinct, rmse = quality.rmse, "polynomial fit");

    Ok(FitResult {
        degree,
        coefficients,
        flow_min,
        flow_max,
        quality,
    })
}

/// Format coefficients (highest degree first) as `c_n*x^n + … + c_1*x + c_0`.
///
/// Coefficients are rounded to 2 decimals for display. Negative terms after the
/// first are written with ` - ` instead of `+ -`.
pub fn render_equation(coefficients: &[f64]) -> String {
    if coefficients.is_empty() {
        return "0.00".to_string();
    }

    let degree = coefficients.len() - 1;
    let mut out = String::new();

    for (i, &c) in coefficients.iter().enumerate() {
        let magnitude = format!("{:.2}", c.abs());
        let negative = c.is_sign_negative() && magnitude != "0.00";

        if i == 0 {
            if negative {
                out.push('-');
            }
        } else if negative {
            out.push_str(" - ");
        } else {
            out.push_str(" + ");
        }
        out.push_str(&magnitude);

        match degree - i {
            0 => {}
            1 => out.push_str("*x"),
            power => out.push_str(&format!("*x^{power}")),
        }
    }

    out
}

impl FitResult {
    /// Pressure predicted at `flow_rate`.
    pub fn evaluate(&self, flow_rate: f64) -> f64 {
        predict(&self.coefficients, flow_rate)
    }

    /// The fitted polynomial as a plain function of flow rate.
    pub fn evaluator(&self) -> impl Fn(f64) -> f64 + '_ {
        move |flow_rate| predict(&self.coefficients, flow_rate)
    }

    /// `n` evenly spaced `(flow_rate, pressure)` points over the fitted range.
    pub fn dense_curve(&self, n: usize) -> Vec<(f64, f64)> {
        let eval = self.evaluator();
        linspace(self.flow_min, self.flow_max, n)
            .into_iter()
            .map(|x| (x, eval(x)))
            .collect()
    }

    /// The reference-density curve used for rendering.
    pub fn curve(&self) -> Vec<(f64, f64)> {
        self.dense_curve(DENSE_CURVE_POINTS)
    }

    pub fn equation(&self) -> String {
        render_equation(&self.coefficients)
    }

    /// Package the fit for persistence.
    pub fn to_artifact(&self, preview: Option<PreviewImage>) -> FitArtifact {
        FitArtifact {
            degree: self.degree,
            coefficients: self.coefficients.clone(),
            equation: self.equation(),
            preview,
            fitted_at: Utc::now(),
        }
    }
}

/// Count flow rates that differ from each other.
pub fn distinct_flow_rates(samples: &[Sample]) -> usize {
    let mut xs: Vec<f64> = samples.iter().map(|s| s.flow_rate).collect();
    xs.sort_by(|a, b| a.total_cmp(b));
    xs.dedup_by(|a, b| a == b);
    xs.len()
}

fn flow_range(samples: &[Sample]) -> (f64, f64) {
    samples
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), s| {
            (lo.min(s.flow_rate), hi.max(s.flow_rate))
        })
}

fn fit_quality(samples: &[Sample], coefficients: &[f64]) -> FitQuality {
    let n = samples.len();
    let nf = n as f64;
    let mean = samples.iter().map(|s| s.pressure).sum::<f64>() / nf;

    let mut sse = 0.0;
    let mut tss = 0.0;
    for s in samples {
        let r = s.pressure - predict(coefficients, s.flow_rate);
        sse += r * r;
        tss += (s.pressure - mean) * (s.pressure - mean);
    }

    let rmse = (sse / nf).sqrt();
    let r_squared = if tss > 0.0 { 1.0 - sse / tss } else { 1.0 };

    // BIC = n ln(SSE/n) + k ln(n), with the variance floored so that exact fits
    // of different degrees tie on the likelihood term.
    let var_floor = (tss / nf * RELATIVE_VARIANCE_FLOOR).max(f64::MIN_POSITIVE);
    let k = coefficients.len() as f64;
    let bic = nf * (sse / nf).max(var_floor).ln() + k * nf.ln();

    FitQuality {
        sse,
        rmse,
        r_squared,
        bic,
        n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::prelude::*;
    use rand::rngs::StdRng;
    use rand_distr::Normal;

    fn samples(pairs: &[(f64, f64)]) -> Vec<Sample> {
        pairs.iter().map(|&(x, y)| Sample::new(x, y)).collect()
    }

    /// Reference solver: normal equations `(XᵀX) β = Xᵀy` via LU.
    fn normal_equations(samples: &[Sample], degree: usize) -> Vec<f64> {
        let n = samples.len();
        let p = degree + 1;
        let mut x = DMatrix::<f64>::zeros(n, p);
        let mut row = vec![0.0; p];
        for (i, s) in samples.iter().enumerate() {
            fill_design_row(s.flow_rate, &mut row);
            for j in 0..p {
                x[(i, j)] = row[j];
            }
        }
        let y = DVector::from_iterator(n, samples.iter().map(|s| s.pressure));
        let xtx = x.transpose() * &x;
        let xty = x.transpose() * y;
        xtx.lu().solve(&xty).unwrap().iter().copied().collect()
    }

    #[test]
    fn quadratic_through_three_points() {
        let s = samples(&[(1.0, 100.0), (2.0, 80.0), (3.0, 50.0)]);
        let fit = fit(&s, 2).unwrap();

        assert_eq!(fit.coefficients.len(), 3);
        for (got, want) in fit.coefficients.iter().zip([-5.0, -5.0, 110.0]) {
            assert!((got - want).abs() < 1e-9, "got {got}, want {want}");
        }
        assert_eq!(fit.equation(), "-5.00*x^2 - 5.00*x + 110.00");
        let eq = fit.equation();
        assert_eq!(1 + eq.matches(" + ").count() + eq.matches(" - ").count(), 3);
    }

    #[test]
    fn single_point_is_insufficient_for_every_degree() {
        let s = samples(&[(1.0, 100.0)]);
        for degree in MIN_DEGREE..=MAX_DEGREE {
            assert_eq!(
                fit(&s, degree),
                Err(FitError::InsufficientSamples { distinct: 1, required: 2 })
            );
        }
    }

    #[test]
    fn degree_at_or_above_distinct_count_is_rejected() {
        let s = samples(&[(1.0, 100.0), (2.0, 80.0), (3.0, 50.0)]);
        assert_eq!(
            fit(&s, 3),
            Err(FitError::InsufficientSamples { distinct: 3, required: 4 })
        );

        // Duplicate flow rates do not add degrees of freedom.
        let dup = samples(&[(1.0, 100.0), (1.0, 101.0), (2.0, 80.0), (2.0, 79.0)]);
        assert_eq!(
            fit(&dup, 2),
            Err(FitError::InsufficientSamples { distinct: 2, required: 3 })
        );
        assert!(fit(&dup, 1).is_ok());
    }

    #[test]
    fn degree_outside_range_is_invalid() {
        let s = samples(&[(1.0, 1.0), (2.0, 2.0), (3.0, 3.0)]);
        assert_eq!(fit(&s, 0), Err(FitError::InvalidDegree { degree: 0 }));
        assert_eq!(fit(&s, 8), Err(FitError::InvalidDegree { degree: 8 }));
    }

    #[test]
    fn non_finite_sample_is_rejected() {
        let s = samples(&[(1.0, 1.0), (f64::NAN, 2.0), (3.0, 3.0)]);
        assert_eq!(fit(&s, 1), Err(FitError::NonFiniteSample { index: 1 }));
    }

    #[test]
    fn near_duplicate_flow_rates_are_ill_conditioned_at_high_degree() {
        let s: Vec<Sample> = (0..8)
            .map(|i| Sample::new(1.0 + i as f64 * 1e-12, 100.0 - i as f64))
            .collect();
        assert_eq!(fit(&s, 7), Err(FitError::IllConditioned { degree: 7 }));
    }

    #[test]
    fn matches_reference_least_squares_on_noisy_data() {
        let mut rng = StdRng::seed_from_u64(7);
        let noise = Normal::new(0.0, 2.0).unwrap();

        let s: Vec<Sample> = (0..40)
            .map(|_| {
                let x: f64 = rng.gen_range(0.5..5.0);
                let y = 400.0 - 12.0 * x - 9.0 * x * x + noise.sample(&mut rng);
                Sample::new(x, y)
            })
            .collect();

        for degree in 1..=3 {
            let got = fit(&s, degree).unwrap();
            let reference = normal_equations(&s, degree);

            // Compare fitted values rather than raw coefficients: the normal
            // equations square the condition number.
            for sample in &s {
                let a = got.evaluate(sample.flow_rate);
                let b = predict(&reference, sample.flow_rate);
                assert!((a - b).abs() < 1e-6 * b.abs().max(1.0), "degree {degree}: {a} vs {b}");
            }
        }

        // The least-squares optimum has residuals orthogonal to every column.
        for degree in 1..=4 {
            let got = fit(&s, degree).unwrap();
            let p = degree + 1;
            let mut row = vec![0.0; p];
            let mut grad = vec![0.0; p];
            let mut scale = vec![0.0; p];
            for sample in &s {
                fill_design_row(sample.flow_rate, &mut row);
                let r = sample.pressure - got.evaluate(sample.flow_rate);
                for j in 0..p {
                    grad[j] += row[j] * r;
                    scale[j] += row[j].abs() * sample.pressure.abs();
                }
            }
            for j in 0..p {
                assert!(grad[j].abs() < 1e-7 * scale[j], "degree {degree}: gradient {}", grad[j]);
            }
        }
    }

    #[test]
    fn fit_is_bit_identical_across_calls() {
        let s = samples(&[(0.2, 310.0), (0.5, 295.0), (0.9, 250.0), (1.4, 160.0), (1.8, 40.0)]);
        let a = fit(&s, 3).unwrap();
        let b = fit(&s, 3).unwrap();
        let bits = |f: &FitResult| f.coefficients.iter().map(|c| c.to_bits()).collect::<Vec<_>>();
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn dense_curve_spans_flow_range() {
        let s = samples(&[(2.0, 80.0), (1.0, 100.0), (3.0, 50.0), (4.0, 30.0)]);
        let fit = fit(&s, 1).unwrap();
        let curve = fit.curve();
        assert_eq!(curve.len(), DENSE_CURVE_POINTS);
        assert_eq!(curve[0].0, 1.0);
        assert_eq!(curve[DENSE_CURVE_POINTS - 1].0, 4.0);
        assert!(curve.iter().all(|&(x, y)| y == fit.evaluate(x)));
    }

    #[test]
    fn quality_reports_perfect_fit() {
        let s = samples(&[(0.0, 1.0), (1.0, 3.0), (2.0, 5.0)]);
        let fit = fit(&s, 1).unwrap();
        assert!(fit.quality.sse < 1e-20);
        assert!((fit.quality.r_squared - 1.0).abs() < 1e-12);
        assert_eq!(fit.quality.n, 3);
    }

    #[test]
    fn equation_formatting_rounds_and_signs() {
        assert_eq!(render_equation(&[2.0, -3.456]), "2.00*x - 3.46");
        assert_eq!(render_equation(&[-0.001, 1.0, 0.0]), "0.00*x^2 + 1.00*x + 0.00");
        assert_eq!(render_equation(&[1.0, 0.0, 0.0, -7.5]), "1.00*x^3 + 0.00*x^2 + 0.00*x - 7.50");
        assert_eq!(render_equation(&[]), "0.00");
    }

    #[test]
    fn artifact_carries_equation_and_coefficients() {
        let s = samples(&[(1.0, 100.0), (2.0, 80.0), (3.0, 50.0), (4.0, 30.0)]);
        let fit = fit(&s, 1).unwrap();
        let artifact = fit.to_artifact(None);
        assert_eq!(artifact.degree, 1);
        assert_eq!(artifact.coefficients, fit.coefficients);
        assert_eq!(artifact.equation, fit.equation());
        assert!(artifact.preview.is_none());
    }
}
