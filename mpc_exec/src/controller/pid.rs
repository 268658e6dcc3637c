//! # PID tracking controller
//!
//! A simple stand-in for an optimal controller. Steering is computed by two PID loops on the
//! cross track and heading errors, throttle by a PID loop on the speed error. The predicted
//! trajectory is a kinematic bicycle rollout holding the computed commands over the horizon.
//!
//! Note that positive steering turns the vehicle clockwise, while the vehicle frame heading is
//! measured anticlockwise.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use log::trace;
use serde::Serialize;

// Internal
use super::{Controller, ControllerError, PidTrackerParams};
use crate::estimator::VehicleState;
use crate::traj_fit::PolyCoeffs;
use util::maths::clamp;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A PID controller
#[derive(Debug, Serialize, Clone)]
pub struct PidController {
    /// Proportional gain
    k_p: f64,

    /// Integral gain
    k_i: f64,

    /// Dervative gain
    k_d: f64,

    /// Previous error
    prev_error: Option<f64>,

    /// The integral accumulation
    integral: f64
}

/// Tracks the reference path with PID loops.
#[derive(Debug, Clone)]
pub struct PidTracker {
    params: PidTrackerParams,

    /// Cross track error controller
    lat_ctrl: PidController,

    /// Heading error controller
    head_ctrl: PidController,

    /// Speed error controller
    speed_ctrl: PidController
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PidController {

    /// Create a new controller with the given gains.
    pub fn new(k_p: f64, k_i: f64, k_d: f64) -> Self {
        Self {
            k_p, k_i, k_d,
            integral: 0f64,
            prev_error: None
        }
    }

    /// Get the value of the controller for the given error, `dt` seconds after the previous call.
    pub fn get(&mut self, error: f64, dt: f64) -> f64 {
        // Accumulate the integral term
        if dt > 0.0 {
            self.integral += error * dt;
        }

        // On the first call there's no previous error so no derivative term, otherwise the first
        // output would spike.
        let deriv = match self.prev_error {
            Some(e) if dt > 0.0 => (error - e) / dt,
            _ => 0f64
        };

        let out =
            self.k_p * error
            + self.k_i * self.integral
            + self.k_d * deriv;

        self.prev_error = Some(error);

        out
    }
}

impl PidTracker {

    /// Create a new instance of the tracker from the parameters
    pub fn new(params: PidTrackerParams) -> Self {
        Self {
            lat_ctrl: PidController::new(
                params.lat_k_p, params.lat_k_i, params.lat_k_d
            ),
            head_ctrl: PidController::new(
                params.head_k_p, params.head_k_i, params.head_k_d
            ),
            speed_ctrl: PidController::new(
                params.speed_k_p, params.speed_k_i, params.speed_k_d
            ),
            params
        }
    }

    /// Predict the vehicle positions over the horizon, holding the given commands.
    fn rollout(&self, state: &VehicleState, steer_rad: f64, throttle: f64) -> Vec<f64> {
        let dt = self.params.dt_s;
        let mut traj = Vec::with_capacity(2 * self.params.num_pred_steps);

        let mut x = state.x_m;
        let mut y = state.y_m;
        let mut psi = state.psi_rad;
        let mut v = state.v_ms;

        for _ in 0..self.params.num_pred_steps {
            x += v * psi.cos() * dt;
            y += v * psi.sin() * dt;
            psi -= v / self.params.lf_m * steer_rad * dt;
            v += throttle * dt;

            traj.push(x);
            traj.push(y);
        }

        traj
    }
}

impl Controller for PidTracker {
    fn solve(
        &mut self,
        state: &VehicleState,
        _coeffs: &PolyCoeffs
    ) -> Result<Vec<f64>, ControllerError> {
        let dt = self.params.dt_s;

        if !state.to_vector().iter().all(|v| v.is_finite()) {
            return Err(ControllerError::Infeasible(String::from("non-finite state")))
        }

        // A positive heading error means the vehicle points to the left of the path and must
        // steer right, a positive cross track error means the path is to the left.
        let raw_steer_rad =
            self.head_ctrl.get(state.epsi_rad, dt)
            - self.lat_ctrl.get(state.cte_m, dt);
        let raw_throttle = self.speed_ctrl.get(self.params.ref_speed_ms - state.v_ms, dt);

        let (steer_rad, _) = clamp(
            &raw_steer_rad, &-self.params.max_steer_rad, &self.params.max_steer_rad
        );
        let (throttle, _) = clamp(
            &raw_throttle, &self.params.min_throttle, &self.params.max_throttle
        );

        trace!(
            "PID tracker: cte {:.3} m, epsi {:.3} rad -> steer {:.4} rad, throttle {:.3}",
            state.cte_m, state.epsi_rad, steer_rad, throttle
        );

        let mut result = vec![steer_rad, throttle];
        result.extend(self.rollout(state, steer_rad, throttle));

        if result.iter().any(|v| !v.is_finite()) {
            return Err(ControllerError::SolverFailure(String::from(
                "non-finite predicted trajectory"
            )))
        }

        Ok(result)
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
