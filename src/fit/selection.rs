//! Degree selection using BIC with guardrails.
//!
//! The advisor fits every admissible degree and computes:
//! - SSE / RMSE
//! - BIC = n * ln(SSE/n) + k * ln(n)
//!
//! Selection rules:
//! 1. Exclude interpolating degrees: require `distinct >= k + MIN_DOF_BUFFER`
//! 2. Choose the degree with minimum BIC
//! 3. If ΔBIC < 2 between the best and a simpler degree, pick the simpler degree

use rayon::prelude::*;

use crate::domain::{FitResult, MAX_DEGREE, MIN_DEGREE, Sample};
use crate::fit::fitter::{FitError, distinct_flow_rates, fit};

/// Residual degrees of freedom required beyond the parameter count.
const MIN_DOF_BUFFER: usize = 1;

/// BIC differences below this are treated as "no real evidence".
const BIC_TIE: f64 = 2.0;

/// Output of fitting + selection.
#[derive(Debug, Clone)]
pub struct DegreeAdvice {
    pub best: FitResult,
    /// Fits for all attempted degrees, ascending.
    pub fits: Vec<FitResult>,
    /// Degrees that were skipped and why (for diagnostics).
    pub skipped: Vec<(usize, String)>,
}

/// Fit all admissible degrees and recommend one.
pub fn advise_degree(samples: &[Sample]) -> Result<DegreeAdvice, FitError> {
    let distinct = distinct_flow_rates(samples);

    let mut candidates = Vec::new();
    let mut skipped = Vec::new();
    for degree in MIN_DEGREE..=MAX_DEGREE {
        let k = degree + 1;
        if distinct < k + MIN_DOF_BUFFER {
            skipped.push((
                degree,
                format!(
                    "Underdetermined: distinct={distinct} < k+{MIN_DOF_BUFFER}={}",
                    k + MIN_DOF_BUFFER
                ),
            ));
            continue;
        }
        candidates.push(degree);
    }

    if candidates.is_empty() {
        return Err(FitError::InsufficientSamples {
            distinct,
            required: MIN_DEGREE + 1 + MIN_DOF_BUFFER,
        });
    }

    // Each degree is an independent solve; `collect` keeps ascending order.
    let outcomes: Vec<(usize, Result<FitResult, FitError>)> = candidates
        .par_iter()
        .map(|&degree| (degree, fit(samples, degree)))
        .collect();

    let mut fits = Vec::new();
    for (degree, outcome) in outcomes {
        match outcome {
            Ok(f) => fits.push(f),
            Err(FitError::IllConditioned { .. }) => {
                skipped.push((degree, "Ill-conditioned".to_string()));
            }
            Err(e) => return Err(e),
        }
    }

    let Some(best) = select_by_bic(&fits) else {
        return Err(FitError::IllConditioned {
            degree: candidates[0],
        });
    };

    Ok(DegreeAdvice {
        best,
        fits,
        skipped,
    })
}

fn select_by_bic(fits: &[FitResult]) -> Option<FitResult> {
    let mut best = fits.first()?;
    for f in &fits[1..] {
        if f.quality.bic < best.quality.bic {
            best = f;
        }
    }

    // Prefer the simplest degree that is within the tie band of the best.
    let simplest = fits
        .iter()
        .filter(|f| f.degree < best.degree && f.quality.bic - best.quality.bic < BIC_TIE)
        .min_by_key(|f| f.degree)
        .unwrap_or(best);

    Some(simplest.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn quadratic(n: usize) -> Vec<Sample> {
        (0..n)
            .map(|i| {
                let x = 0.25 * (i + 1) as f64;
                Sample::new(x, 500.0 - 20.0 * x - 30.0 * x * x)
            })
            .collect()
    }

    #[test]
    fn noiseless_quadratic_selects_degree_two() {
        let advice = advise_degree(&quadratic(12)).unwrap();
        assert_eq!(advice.best.degree, 2);
        assert_eq!(advice.fits.first().map(|f| f.degree), Some(1));
        // 12 distinct points admit every degree up to 7.
        assert_eq!(advice.fits.len(), 7);
        assert!(advice.skipped.is_empty());
    }

    #[test]
    fn few_points_skip_high_degrees() {
        let advice = advise_degree(&quadratic(4)).unwrap();
        // distinct=4 admits k <= 3, i.e. degrees 1 and 2.
        assert_eq!(advice.fits.len(), 2);
        assert_eq!(advice.skipped.len(), 5);
        assert_eq!(advice.best.degree, 2);
    }

    #[test]
    fn two_points_cannot_be_advised() {
        let s = vec![Sample::new(1.0, 10.0), Sample::new(2.0, 5.0)];
        assert_eq!(
            advise_degree(&s).unwrap_err(),
            FitError::InsufficientSamples { distinct: 2, required: 3 }
        );
    }

    #[test]
    fn tie_prefers_simpler_degree() {
        let mk = |degree: usize, bic: f64| FitResult {
            degree,
            coefficients: vec![0.0; degree + 1],
            flow_min: 0.0,
            flow_max: 1.0,
            quality: crate::domain::FitQuality {
                sse: 0.0,
                rmse: 0.0,
                r_squared: 1.0,
                bic,
                n: 10,
            },
        };
        let fits = vec![mk(1, 10.0), mk(2, 4.0), mk(3, 3.0)];
        assert_eq!(select_by_bic(&fits).unwrap().degree, 2);

        let fits = vec![mk(1, 3.5), mk(2, 4.0), mk(3, 3.0)];
        assert_eq!(select_by_bic(&fits).unwrap().degree, 1);
    }
}
