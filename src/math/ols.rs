//! Least squares solver.
//!
//! The membership model is linear in its coefficients:
//!
//! ```text
//! minimize Σ (y_i - x_i^T β)^2
//! ```
//!
//! where `x_i` holds the intercept, the month ordinal, and the yearly Fourier
//! terms. We solve it once per candidate model kind.
//!
//! Implementation choices:
//! - SVD handles tall design matrices (more months than coefficients).
//!   (Nalgebra's `QR::solve` is intended for square systems and will panic for
//!   non-square matrices.)
//! - Short histories can make Fourier columns nearly collinear, so the solve
//!   retries with progressively looser singular-value tolerances.

use nalgebra::{DMatrix, DVector};

/// Solve a least squares problem using SVD.
///
/// Returns `None` if the system is too ill-conditioned to solve robustly.
pub fn solve_least_squares(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<DVector<f64>> {
    let svd = x.clone().svd(true, true);

    for &tol in &[1e-10, 1e-8, 1e-6] {
        if let Ok(beta) = svd.solve(y, tol) {
            if beta.iter().all(|v| v.is_finite()) {
                return Some(beta);
            }
        }
    }

    None
}
