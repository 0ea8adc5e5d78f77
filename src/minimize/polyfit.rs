//! Closed-form polynomial least squares
//!
//! Solves the normal equations of the Vandermonde system directly, replacing
//! the coefficient vector in place. Coefficients are in ascending degree
//! order: `c[0] + c[1]x + c[2]x² + ...`.

use nalgebra::{DMatrix, DVector};

use crate::error::{FitError, Result};

/// Fit a polynomial to the samples by ordinary least squares.
///
/// The degree is implied by `coefficients.len() - 1`. Requires at least as
/// many samples as coefficients; fails with [`FitError::SingularMatrix`] when
/// the x values cannot determine the polynomial (for example all-equal x).
pub fn fit_polynomial(coefficients: &mut [f64], x: &[f64], y: &[f64]) -> Result<()> {
    let n = coefficients.len();
    if n == 0 {
        return Err(FitError::InvalidInput(
            "polynomial needs at least one coefficient".to_string(),
        ));
    }
    if x.len() != y.len() {
        return Err(FitError::DimensionMismatch(format!(
            "{} x values vs {} y values",
            x.len(),
            y.len()
        )));
    }
    if x.len() < n {
        return Err(FitError::InvalidInput(format!(
            "need at least {} samples to fit {} coefficients, got {}",
            n,
            n,
            x.len()
        )));
    }

    // normal equations: A[j][k] = Σ x^(j+k), b[j] = Σ y·x^j
    let mut a = DMatrix::zeros(n, n);
    let mut b = DVector::zeros(n);
    let mut powers = vec![0.0; 2 * n - 1];
    for (&xi, &yi) in x.iter().zip(y.iter()) {
        powers[0] = 1.0;
        for p in 1..powers.len() {
            powers[p] = powers[p - 1] * xi;
        }
        for j in 0..n {
            b[j] += yi * powers[j];
            for k in 0..n {
                a[(j, k)] += powers[j + k];
            }
        }
    }

    let solution = a.lu().solve(&b).ok_or(FitError::SingularMatrix)?;
    for (c, s) in coefficients.iter_mut().zip(solution.iter()) {
        *c = *s;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_exact_line() {
        let x = [0.0, 1.0, 2.0, 3.0];
        let y = [1.0, 3.0, 5.0, 7.0];
        let mut coeffs = [0.0, 0.0];
        fit_polynomial(&mut coeffs, &x, &y).unwrap();
        assert_relative_eq!(coeffs[0], 1.0, epsilon = 1e-10);
        assert_relative_eq!(coeffs[1], 2.0, epsilon = 1e-10);
    }

    #[test]
    fn test_noisy_line() {
        let x = [0.0, 1.0, 2.0, 3.0, 4.0];
        let y = [0.1, 0.9, 2.05, 2.95, 4.1];
        let mut coeffs = [0.0, 0.0];
        fit_polynomial(&mut coeffs, &x, &y).unwrap();
        assert_relative_eq!(coeffs[1], 1.0, epsilon = 0.05);
        assert_relative_eq!(coeffs[0], 0.0, epsilon = 0.1);
    }

    #[test]
    fn test_quadratic() {
        let x = [-2.0, -1.0, 0.0, 1.0, 2.0];
        let y: Vec<f64> = x.iter().map(|&v| 2.0 * v * v - v + 3.0).collect();
        let mut coeffs = [0.0; 3];
        fit_polynomial(&mut coeffs, &x, &y).unwrap();
        assert_relative_eq!(coeffs[0], 3.0, epsilon = 1e-9);
        assert_relative_eq!(coeffs[1], -1.0, epsilon = 1e-9);
        assert_relative_eq!(coeffs[2], 2.0, epsilon = 1e-9);
    }

    #[test]
    fn test_insufficient_samples() {
        let mut coeffs = [0.0; 3];
        assert!(fit_polynomial(&mut coeffs, &[1.0, 2.0], &[1.0, 2.0]).is_err());
    }

    #[test]
    fn test_degenerate_x() {
        // all-equal x cannot determine a line
        let mut coeffs = [0.0, 0.0];
        let result = fit_polynomial(&mut coeffs, &[2.0, 2.0, 2.0], &[1.0, 2.0, 3.0]);
        assert!(matches!(result, Err(FitError::SingularMatrix)));
    }
}
