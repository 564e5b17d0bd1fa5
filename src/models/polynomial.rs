//! Power-basis polynomials with coefficients ordered highest degree first.
//!
//! The fitter relies on two primitive operations:
//! - build a design row for a given flow rate (for OLS)
//! - predict pressure at a flow rate given coefficients (for residuals/plots)

/// Fill a Vandermonde design row `[x^d, x^(d-1), …, x, 1]`.
///
/// The row length defines the degree: `degree = out.len() - 1`.
pub fn fill_design_row(x: f64, out: &mut [f64]) {
    let mut power = 1.0;
    for slot in out.iter_mut().rev() {
        *slot = power;
        power *= x;
    }
}

/// Evaluate the polynomial at `x` with Horner's scheme.
///
/// An empty coefficient list evaluates to `0.0`.
pub fn predict(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().fold(0.0, |acc, &c| acc * x + c)
}
