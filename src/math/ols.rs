//! Ordinary least squares solver.
//!
//! Curve fitting solves one small problem per request:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! where each row `x_i` is a Vandermonde row of the flow rate.
//!
//! Implementation choices:
//! - Columns are scaled to unit norm before solving. Raw Vandermonde columns
//!   span many orders of magnitude (`x^7` next to `1`), and the scaling keeps
//!   the singular values comparable.
//! - We use SVD rather than QR: nalgebra's `QR::solve` is intended for square
//!   systems and panics on tall matrices.
//! - A singular value below the rank tolerance means the system is
//!   numerically rank deficient. We report that as "no solution" instead of
//!   silently returning the minimum-norm answer.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the matrix is rank deficient or the solution is not finite.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let (nrows, ncols) = x.shape();
    if ncols == 0 || nrows < ncols || y.len() != nrows {
        return None;
    }

    let mut scaled = x.clone();
    let mut scales = Vec::with_capacity(ncols);
    for j in 0..ncols {
        let norm = scaled.column(j).norm();
        if !(norm.is_finite() && norm > 0.0) {
            return None;
        }
        scaled.column_mut(j).scale_mut(1.0 / norm);
        scales.push(norm);
    }

    let svd = scaled.svd(true, true);
    let s_max = svd.singular_values.max();
    // Same cutoff as LAPACK-style rcond defaults: eps * max(m, n) * σ_max.
    let tol = s_max * f64::EPSILON * nrows.max(ncols) as f64;
    if svd.singular_values.iter().any(|&s| !(s > tol)) {
        return None;
    }

    let beta = svd.solve(y, tol).ok()?;
    let beta = DVector::from_iterator(
        ncols,
        beta.iter().zip(scales.iter()).map(|(b, s)| b / s),
    );

    if beta.iter().all(|v| v.is_finite()) {
        Some(beta)
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn least_squares_solves_simple_system() {
        // Fit y = 2 + 3x on x = [0,1,2]
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 0.0, 1.0, 1.0, 1.0, 2.0]);
        let y = DVector::from_row_slice(&[2.0, 5.0, 8.0]);

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 2.0).abs() < 1e-10);
        assert!((beta[1] - 3.0).abs() < 1e-10);
    }

    #[test]
    fn least_squares_handles_badly_scaled_columns() {
        // y = 1e-6 * x^2 with x in the thousands.
        let xs = [1000.0, 2000.0, 3000.0, 4000.0];
        let mut data = Vec::new();
        for &x in &xs {
            data.extend_from_slice(&[x * x, x, 1.0]);
        }
        let x = DMatrix::from_row_slice(4, 3, &data);
        let y = DVector::from_iterator(4, xs.iter().map(|x| 1e-6 * x * x));

        let beta = solve_least_squares(&x, &y).unwrap();
        assert!((beta[0] - 1e-6).abs() < 1e-15);
        assert!(beta[1].abs() < 1e-9);
        assert!(beta[2].abs() < 1e-6);
    }

    #[test]
    fn least_squares_rejects_rank_deficient_matrix() {
        // Two identical columns.
        let x = DMatrix::from_row_slice(3, 2, &[1.0, 1.0, 2.0, 2.0, 3.0, 3.0]);
        let y = DVector::from_row_slice(&[1.0, 2.0, 3.0]);
        assert!(solve_least_squares(&x, &y).is_none());
    }

    #[test]
    fn least_squares_rejects_underdetermined_shape() {
        let x = DMatrix::from_row_slice(1, 2, &[1.0, 2.0]);
        let y = DVector::from_row_slice(&[1.0]);
        assert!(solve_least_squares(&x, &y).is_none());
    }
}
