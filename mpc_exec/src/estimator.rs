//! # State estimator
//!
//! Commands sent to the simulator take effect after a fixed actuation latency. Rather than
//! handing the controller the state measured in the telemetry, the estimator projects that state
//! forward by the latency so the controller optimises for the state the vehicle will be in when
//! the command is applied.
//!
//! All quantities are in the vehicle frame at measurement time, so the measured position and
//! heading are always zero. The projection is a first order (linear) approximation of a
//! kinematic bicycle model and is not exact over large latencies or tight turns.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use nalgebra::Vector6;
use serde::Serialize;

use crate::bridge::BridgeParams;
use crate::traj_fit::{poly_deriv_eval, poly_eval, PolyCoeffs};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Kinematic state of the vehicle in the vehicle frame, as handed to the controller.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct VehicleState {
    /// Position along the vehicle X axis
    pub x_m: f64,

    /// Position along the vehicle Y axis
    pub y_m: f64,

    /// Heading relative to the vehicle X axis
    pub psi_rad: f64,

    /// Speed
    pub v_ms: f64,

    /// Cross track error, lateral distance from the reference path
    pub cte_m: f64,

    /// Heading error relative to the reference path tangent
    pub epsi_rad: f64
}

/// Projects the measured state forward by the actuation latency.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct StateEstimator {
    /// Actuation latency
    latency_s: f64,

    /// Distance from the centre of mass to the front axle
    lf_m: f64,

    /// Factor converting the telemetry speed into meters/second
    mph_to_ms: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl VehicleState {
    /// The state as the 6-vector `[x, y, psi, v, cte, epsi]`.
    pub fn to_vector(&self) -> Vector6<f64> {
        Vector6::new(
            self.x_m, self.y_m, self.psi_rad, self.v_ms, self.cte_m, self.epsi_rad
        )
    }
}

impl StateEstimator {
    pub fn new(latency_s: f64, lf_m: f64, mph_to_ms: f64) -> Self {
        Self {
            latency_s,
            lf_m,
            mph_to_ms
        }
    }

    pub fn from_params(params: &BridgeParams) -> Self {
        Self::new(params.latency_s, params.lf_m, params.mph_to_ms)
    }

    /// The state at measurement time.
    ///
    /// The cross track error is the path offset at the vehicle (x = 0) and the heading error is
    /// minus the angle of the path tangent there.
    pub fn measured_state(&self, coeffs: &PolyCoeffs, speed_mph: f64) -> VehicleState {
        VehicleState {
            x_m: 0.0,
            y_m: 0.0,
            psi_rad: 0.0,
            v_ms: speed_mph * self.mph_to_ms,
            cte_m: poly_eval(coeffs.as_slice(), 0.0),
            epsi_rad: -poly_deriv_eval(coeffs.as_slice(), 0.0).atan()
        }
    }

    /// The state once the latency has elapsed, assuming the previous commands are held.
    ///
    /// A positive steering angle turns the vehicle clockwise (to the right), hence the sign of
    /// the heading change.
    pub fn estimate(
        &self,
        coeffs: &PolyCoeffs,
        speed_mph: f64,
        prior_steering_rad: f64,
        prior_throttle: f64
    ) -> VehicleState {
        let measured = self.measured_state(coeffs, speed_mph);
        let v_ms = measured.v_ms;

        // Distance covered during the latency
        let latency_dist_m = v_ms * self.latency_s;

        VehicleState {
            x_m: latency_dist_m,
            y_m: 0.0,
            psi_rad: -prior_steering_rad * latency_dist_m / self.lf_m,
            v_ms: v_ms + prior_throttle * self.latency_s,
            cte_m: measured.cte_m + latency_dist_m * measured.epsi_rad.sin(),
            epsi_rad: measured.epsi_rad + prior_steering_rad
        }
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------

#[cfg(test)]
mod test {
    use super::*;

    const TOL: f64 = 1e-12;

    fn estimator() -> StateEstimator {
        StateEstimator::new(0.1, 2.67, 0.44704)
    }

    #[test]
    fn test_measured_state() {
        let coeffs = PolyCoeffs::new(1.5, 1.0, 0.02, -0.001);
        let s = estimator().measured_state(&coeffs, 50.0);

        assert_eq!(s.x_m, 0.0);
        assert_eq!(s.y_m, 0.0);
        assert_eq!(s.psi_rad, 0.0);
        assert!((s.v_ms - 22.352).abs() < TOL);
        assert_eq!(s.cte_m, 1.5);
        assert!((s.epsi_rad + std::f64::consts::FRAC_PI_4).abs() < TOL);
    }

    #[test]
    fn test_no_prior_actuation() {
        let coeffs = PolyCoeffs::new(-0.7, 0.1, 0.003, 0.0);
        let est = estimator();

        let v_ms = 40.0 * 0.44704;
        let s = est.estimate(&coeffs, 40.0, 0.0, 0.0);

        assert_eq!(s.psi_rad, 0.0);
        assert_eq!(s.y_m, 0.0);
        assert!((s.v_ms - v_ms).abs() < TOL);
        assert!((s.x_m - v_ms * 0.1).abs() < TOL);

        let epsi = -(0.1f64).atan();
        assert!((s.epsi_rad - epsi).abs() < TOL);
        assert!((s.cte_m - (-0.7 + v_ms * 0.1 * epsi.sin())).abs() < TOL);
    }

    #[test]
    fn test_prior_actuation() {
        let coeffs = PolyCoeffs::new(0.2, 0.0, 0.0, 0.0);
        let est = estimator();

        let s = est.estimate(&coeffs, 30.0, 0.05, 0.4);

        let v_ms = 30.0 * 0.44704;
        assert!((s.psi_rad - (-0.05 * v_ms * 0.1 / 2.67)).abs() < TOL);
        assert!((s.v_ms - (v_ms + 0.04)).abs() < TOL);
        assert!((s.epsi_rad - 0.05).abs() < TOL);

        // Straight path ahead, no heading error so the cte doesn't change
        assert!((s.cte_m - 0.2).abs() < TOL);
    }

    #[test]
    fn test_stationary() {
        let coeffs = PolyCoeffs::new(0.3, -0.2, 0.0, 0.0);
        let s = estimator().estimate(&coeffs, 0.0, 0.1, 0.0);

        assert_eq!(s.x_m, 0.0);
        assert_eq!(s.psi_rad, 0.0);
        assert_eq!(s.v_ms, 0.0);
        assert_eq!(s.cte_m, 0.3);
    }

    #[test]
    fn test_to_vector() {
        let s = VehicleState {
            x_m: 1.0, y_m: 2.0, psi_rad: 3.0, v_ms: 4.0, cte_m: 5.0, epsi_rad: 6.0
        };

        assert_eq!(s.to_vector(), Vector6::new(1.0, 2.0, 3.0, 4.0, 5.0, 6.0));
    }
}
