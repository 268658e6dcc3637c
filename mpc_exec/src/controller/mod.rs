//! # Controller module
//!
//! The controller computes the actuation for the vehicle given its (latency compensated) state
//! and the reference path. It is treated as an opaque solver behind the `Controller` trait: any
//! optimiser with the signature
//!
//! ```text
//! solve(state: [x, y, psi, v, cte, epsi], coeffs: [c0, c1, c2, c3]) -> [steer_rad, throttle, x0, y0, x1, y1, ...]
//! ```
//!
//! can be plugged into the bridge. The trailing values of the result are the trajectory the
//! controller predicts for the vehicle, in the vehicle frame, and are only used for display.
//!
//! The `ControllerAdapter` calls the controller once per telemetry frame and unpacks its result,
//! normalising the steering angle into the simulator's [-1, 1] range.
//!
//! A controller instance belongs to a single bridge session. It may keep state between calls
//! (for example to warm start an optimiser) but is never called concurrently.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod params;
pub mod pid;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::debug;
use nalgebra::Point2;
use serde::Serialize;

use crate::estimator::VehicleState;
use crate::frame::VehiclePoint;
use crate::traj_fit::PolyCoeffs;
use util::maths::{clamp, deg_to_rad, rad_to_deg};

pub use params::PidTrackerParams;
pub use pid::{PidController, PidTracker};

// ---------------------------------------------------------------------------
// TRAITS
// ---------------------------------------------------------------------------

/// An optimal controller for the vehicle.
pub trait Controller {
    /// Solve for the actuation of the vehicle.
    ///
    /// The result shall contain the steering angle in radians, the throttle, then interleaved
    /// `(x, y)` pairs of the predicted trajectory in the vehicle frame.
    fn solve(
        &mut self,
        state: &VehicleState,
        coeffs: &PolyCoeffs
    ) -> Result<Vec<f64>, ControllerError>;
}

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Command sent to the simulator's actuators.
#[derive(Debug, Copy, Clone, Default, PartialEq, Serialize)]
pub struct ControlCommand {
    /// Normalised steering demand in [-1, 1], positive turns right
    pub steering: f64,

    /// Throttle demand, negative values brake
    pub throttle: f64
}

/// The unpacked result of a controller call.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerOutput {
    /// The command to send
    pub command: ControlCommand,

    /// The steering angle demanded by the controller before normalisation
    pub steer_rad: f64,

    /// True if the normalised steering had to be limited to [-1, 1]
    pub steer_saturated: bool,

    /// Trajectory predicted by the controller
    pub trajectory: Vec<VehiclePoint>
}

/// Calls a controller and converts its result into a command.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct ControllerAdapter {
    /// Maximum physical steering angle of the vehicle
    max_steer_rad: f64
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors reported by a controller.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ControllerError {
    #[error("The control problem is infeasible: {0}")]
    Infeasible(String),

    #[error("The solver failed: {0}")]
    SolverFailure(String)
}

/// Errors raised while calling the controller or unpacking its result.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum AdapterError {
    #[error("Controller error: {0}")]
    ControllerError(ControllerError),

    #[error("The controller returned {0} values, at least 2 are expected")]
    ResultTooShort(usize),

    #[error("The controller returned an odd number ({0}) of trajectory values")]
    OddTrajectoryLength(usize),

    #[error("The controller returned a non-finite value at index {0}")]
    NonFiniteResult(usize)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<C: Controller + ?Sized> Controller for Box<C> {
    fn solve(
        &mut self,
        state: &VehicleState,
        coeffs: &PolyCoeffs
    ) -> Result<Vec<f64>, ControllerError> {
        (**self).solve(state, coeffs)
    }
}

impl ControllerAdapter {
    pub fn new(max_steer_deg: f64) -> Self {
        Self {
            max_steer_rad: deg_to_rad(max_steer_deg)
        }
    }

    /// Call the controller once and unpack the result.
    pub fn solve<C: Controller + ?Sized>(
        &self,
        controller: &mut C,
        state: &VehicleState,
        coeffs: &PolyCoeffs
    ) -> Result<ControllerOutput, AdapterError> {
        let result = controller
            .solve(state, coeffs)
            .map_err(AdapterError::ControllerError)?;

        self.unpack(&result)
    }

    /// Unpack a controller result.
    pub fn unpack(&self, result: &[f64]) -> Result<ControllerOutput, AdapterError> {
        if result.len() < 2 {
            return Err(AdapterError::ResultTooShort(result.len()))
        }
        if (result.len() - 2) % 2 != 0 {
            return Err(AdapterError::OddTrajectoryLength(result.len() - 2))
        }
        if let Some(i) = result.iter().position(|v| !v.is_finite()) {
            return Err(AdapterError::NonFiniteResult(i))
        }

        let steer_rad = result[0];
        let (steering, steer_saturated) = clamp(&(steer_rad / self.max_steer_rad), &-1.0, &1.0);

        if steer_saturated {
            debug!(
                "Steering demand of {:.2} deg exceeds the limit of {:.2} deg",
                rad_to_deg(steer_rad), rad_to_deg(self.max_steer_rad)
            );
        }

        let trajectory = result[2..]
            .chunks(2)
            .map(|xy| Point2::new(xy[0], xy[1]))
            .collect();

        Ok(ControllerOutput {
            command: ControlCommand {
                steering,
                throttle: result[1]
            },
            steer_rad,
            steer_saturated,
            trajectory
        })
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
