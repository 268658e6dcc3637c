//! # Trajectory fitting
//!
//! The reference path handed to the controller is a cubic polynomial `y = f(x)` in the vehicle
//! frame, fitted to the road waypoints by least squares. Coefficients are ordered by ascending
//! power, i.e. `c[0] + c[1]*x + c[2]*x^2 + c[3]*x^3`.
//!
//! The fit builds the Vandermonde design matrix of the samples, with x scaled by its largest
//! magnitude, and solves it with a Householder QR decomposition. Should the design matrix be rank deficient (for example repeated x values)
//! the solve falls back to the SVD minimum-norm solution, so a best-effort path is still
//! produced. Such a path may be of poor quality.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::warn;
use nalgebra::{DMatrix, DVector, Point2, Vector4};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Order of the reference path polynomial
pub const CUBIC_ORDER: usize = 3;

/// Diagonal entries of R smaller than this fraction of the largest one mark the design matrix as
/// rank deficient.
const RANK_TOLERANCE: f64 = 1e-10;

/// Singular values smaller than this fraction of the largest one are treated as zero.
const SVD_TOLERANCE: f64 = 1e-12;

/// Iteration limit of the SVD fallback
const SVD_MAX_ITERATIONS: usize = 1000;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Coefficients of the cubic reference path, lowest power first.
pub type PolyCoeffs = Vector4<f64>;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum FitError {
    #[error("Found {x} x samples but {y} y samples")]
    LengthMismatch { x: usize, y: usize },

    #[error("Polynomial order must be at least 1")]
    InvalidOrder,

    #[error(
        "A polynomial of order {order} needs at least {required} samples, found {found}"
    )]
    InsufficientSamples {
        order: usize,
        required: usize,
        found: usize
    },

    #[error("The samples contain a non-finite value")]
    NonFiniteSample,

    #[error("The fitted coefficients are not finite")]
    NonFiniteCoeffs,

    #[error("The least squares solve failed: {0}")]
    SolveFailed(&'static str)
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Fit a polynomial of the given order to the samples.
///
/// Requires `1 <= order <= xs.len() - 1`. Returns `order + 1` coefficients, lowest power first.
pub fn polyfit(xs: &[f64], ys: &[f64], order: usize) -> Result<DVector<f64>, FitError> {
    if xs.len() != ys.len() {
        return Err(FitError::LengthMismatch { x: xs.len(), y: ys.len() })
    }
    if order < 1 {
        return Err(FitError::InvalidOrder)
    }
    if xs.len() < order + 1 {
        return Err(FitError::InsufficientSamples {
            order,
            required: order + 1,
            found: xs.len()
        })
    }
    if xs.iter().chain(ys.iter()).any(|v| !v.is_finite()) {
        return Err(FitError::NonFiniteSample)
    }

    // Samples are scaled into [-1, 1] so the conditioning of the design matrix doesn't depend
    // on the magnitude of the coordinates.
    let max_abs_x = xs.iter().fold(0f64, |m, x| m.max(x.abs()));
    let scale = if max_abs_x > 0.0 { max_abs_x } else { 1.0 };

    // Vandermonde design matrix, column i holds (x/scale)^i
    let design = DMatrix::from_fn(xs.len(), order + 1, |r, c| (xs[r] / scale).powi(c as i32));
    let obs = DVector::from_column_slice(ys);

    let scaled = solve_least_squares(design, &obs)?;

    // Undo the scaling, c_i = c'_i / scale^i
    let coeffs = DVector::from_fn(order + 1, |i, _| scaled[i] / scale.powi(i as i32));

    if coeffs.iter().any(|c| !c.is_finite()) {
        return Err(FitError::NonFiniteCoeffs)
    }

    Ok(coeffs)
}

/// Solve `design * c = obs` in the least squares sense.
fn solve_least_squares(
    design: DMatrix<f64>,
    obs: &DVector<f64>
) -> Result<DVector<f64>, FitError> {
    let qr = design.clone().qr();
    let r = qr.r();

    let max_diag = r.diagonal().iter().fold(0f64, |m, d| m.max(d.abs()));
    let full_rank = max_diag.is_finite()
        && max_diag > 0.0
        && r.diagonal().iter().all(|d| d.abs() > RANK_TOLERANCE * max_diag);

    if full_rank {
        // Solve R c = Q^T y
        let qty = qr.q().transpose() * obs;
        if let Some(coeffs) = r.solve_upper_triangular(&qty) {
            return Ok(coeffs)
        }
    }

    warn!(
        "Rank deficient design matrix for {} samples, using the minimum-norm solution",
        design.nrows()
    );

    let svd = design
        .try_svd(true, true, std::f64::EPSILON, SVD_MAX_ITERATIONS)
        .ok_or(FitError::SolveFailed("the SVD did not converge"))?;
    let eps = svd.singular_values.max() * SVD_TOLERANCE;

    svd.solve(obs, eps).map_err(FitError::SolveFailed)
}

/// Fit the cubic reference path to the given vehicle frame points.
pub fn fit_cubic(points: &[Point2<f64>]) -> Result<PolyCoeffs, FitError> {
    let xs: Vec<f64> = points.iter().map(|p| p.x).collect();
    let ys: Vec<f64> = points.iter().map(|p| p.y).collect();

    let coeffs = polyfit(&xs, &ys, CUBIC_ORDER)?;

    Ok(PolyCoeffs::from_iterator(coeffs.iter().copied()))
}

/// Evaluate the polynomial at `x`.
pub fn poly_eval(coeffs: &[f64], x: f64) -> f64 {
    coeffs.iter().rev().fold(0f64, |acc, c| acc * x + c)
}

/// Evaluate the first derivative of the polynomial at `x`.
pub fn poly_deriv_eval(coeffs: &[f64], x: f64) -> f64 {
    coeffs
        .iter()
        .enumerate()
        .skip(1)
        .rev()
        .fold(0f64, |acc, (i, c)| acc * x + (i as f64) * c)
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    fn points(xs: &[f64], ys: &[f64]) -> Vec<Point2<f64>> {
        xs.iter().zip(ys.iter()).map(|(x, y)| Point2::new(*x, *y)).collect()
    }

    #[test]
    fn test_fit_exact_quadratic() {
        let c = fit_cubic(&points(
            &[1.0, 2.0, 3.0, 4.0, 5.0],
            &[1.0, 4.0, 9.0, 16.0, 25.0]
        )).unwrap();

        let expected = [0.0, 0.0, 1.0, 0.0];
        for i in 0..4 {
            assert!(
                (c[i] - expected[i]).abs() < 1e-6,
                "c[{}] = {}, expected {}", i, c[i], expected[i]
            );
        }
    }

    #[test]
    fn test_fit_cubic_recovers_coeffs() {
        let truth = [0.8, -0.05, 0.012, -0.0004];
        let xs: Vec<f64> = (0..8).map(|i| -5.0 + 2.5 * i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| poly_eval(&truth, *x)).collect();

        let c = fit_cubic(&points(&xs, &ys)).unwrap();

        for i in 0..4 {
            assert!((c[i] - truth[i]).abs() < 1e-8);
        }
    }

    #[test]
    fn test_polyfit_lower_order() {
        // Least squares line, slope = Sxy / Sxx = 9 / 5
        let xs = [0.0, 1.0, 2.0, 3.0];
        let ys = [1.5, 2.5, 5.5, 6.5];

        let c = polyfit(&xs, &ys, 1).unwrap();

        assert_eq!(c.len(), 2);
        assert!((c[0] - 1.3).abs() < 1e-9);
        assert!((c[1] - 1.8).abs() < 1e-9);
    }

    #[test]
    fn test_fit_rejects_bad_input() {
        assert_eq!(
            fit_cubic(&points(&[1.0, 2.0, 3.0], &[1.0, 2.0, 3.0])),
            Err(FitError::InsufficientSamples { order: 3, required: 4, found: 3 })
        );
        assert_eq!(fit_cubic(&[]).unwrap_err(), FitError::InsufficientSamples {
            order: 3, required: 4, found: 0
        });
        assert_eq!(
            polyfit(&[1.0, 2.0], &[1.0], 1),
            Err(FitError::LengthMismatch { x: 2, y: 1 })
        );
        assert_eq!(polyfit(&[1.0, 2.0], &[1.0, 2.0], 0), Err(FitError::InvalidOrder));
        assert_eq!(
            polyfit(&[1.0, 2.0, std::f64::NAN], &[1.0, 2.0, 3.0], 1),
            Err(FitError::NonFiniteSample)
        );
    }

    #[test]
    fn test_fit_degenerate_samples() {
        // Only two distinct x values, the design matrix has rank 2
        let xs = [1.0, 1.0, 1.0, 2.0, 2.0, 2.0];
        let ys = [1.0, 1.0, 1.0, 4.0, 4.0, 4.0];

        let c = fit_cubic(&points(&xs, &ys)).unwrap();

        assert!(c.iter().all(|v| v.is_finite()));
        assert!((poly_eval(c.as_slice(), 1.0) - 1.0).abs() < 1e-6);
        assert!((poly_eval(c.as_slice(), 2.0) - 4.0).abs() < 1e-6);
    }

    #[test]
    fn test_fit_large_coordinates() {
        // Exact cubic sampled far from the origin
        let truth = [2.0, 3e-4, -2e-8, 1e-13];
        let xs: Vec<f64> = (1..=6).map(|i| 1e4 * i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| poly_eval(&truth, *x)).collect();

        let c = fit_cubic(&points(&xs, &ys)).unwrap();

        for (x, y) in xs.iter().zip(ys.iter()) {
            let fit = poly_eval(c.as_slice(), *x);
            assert!((fit - y).abs() < 1e-6, "x = {}: {} vs {}", x, fit, y);
        }

        // Exact line further out still has its slope
        let xs: Vec<f64> = (1..=6).map(|i| 1e5 * i as f64).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 1.0 + 2e-5 * x).collect();

        let c = fit_cubic(&points(&xs, &ys)).unwrap();

        assert!((c[0] - 1.0).abs() < 1e-6);
        assert!((c[1] - 2e-5).abs() < 1e-10);
    }

    #[test]
    fn test_fit_huge_coordinates_terminates() {
        // x^3 overflows for these samples unless they are scaled
        let xs: Vec<f64> = (1..=5).map(|i| 1e110 * i as f64).collect();
        let ys: Vec<f64> = (1..=5).map(|i| i as f64).collect();

        let c = fit_cubic(&points(&xs, &ys)).unwrap();

        assert!(c.iter().all(|v| v.is_finite()));
        assert!(c[0].abs() < 1e-9);
        assert!((c[1] * 1e110 - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_fit_tiny_coordinates_overflow() {
        // Rescaling the coefficients overflows
        let xs: Vec<f64> = (1..=5).map(|i| 1e-200 * i as f64).collect();
        let ys: Vec<f64> = (1..=5).map(|i| (i * i * i) as f64).collect();

        assert_eq!(fit_cubic(&points(&xs, &ys)), Err(FitError::NonFiniteCoeffs));
    }

    #[test]
    fn test_eval_at_zero() {
        let cases: [[f64; 4]; 3] = [
            [0.0, 0.0, 0.0, 0.0],
            [-3.25, 1.0, 2.0, -7.0],
            [1e6, -1e-6, 42.0, 0.5]
        ];

        for c in cases.iter() {
            assert_eq!(poly_eval(c, 0.0), c[0]);
            assert_eq!(poly_deriv_eval(c, 0.0), c[1]);
        }
    }

    #[test]
    fn test_eval() {
        let c = [1.0, 2.0, 3.0, 4.0];

        assert_eq!(poly_eval(&c, 2.0), 1.0 + 4.0 + 12.0 + 32.0);
        assert_eq!(poly_deriv_eval(&c, 2.0), 2.0 + 12.0 + 48.0);
        assert_eq!(poly_eval(&[], 3.0), 0.0);
        assert_eq!(poly_deriv_eval(&[5.0], 3.0), 0.0);
    }

    #[test]
    fn test_deriv_matches_finite_difference() {
        let c = [0.5, -0.2, 0.03, -0.0015];
        let h = 1e-5;

        for x in [-20.0, -2.5, 0.0, 1.0, 7.5, 30.0].iter() {
            let fd = (poly_eval(&c, x + h) - poly_eval(&c, x - h)) / (2.0 * h);
            let d = poly_deriv_eval(&c, *x);

            assert!((fd - d).abs() < 1e-4, "x = {}: {} vs {}", x, fd, d);
        }
    }
}
