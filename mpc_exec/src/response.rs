//! # Response builder
//!
//! Assembles the reply to a telemetry frame: the command to apply, the trajectory predicted by
//! the controller and samples of the reference path, the latter two being drawn by the simulator.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::sim::{EnvelopeError, SteerPayload};
use nalgebra::Point2;

use crate::controller::ControlCommand;
use crate::estimator::VehicleState;
use crate::frame::VehiclePoint;
use crate::traj_fit::{poly_eval, PolyCoeffs};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Everything computed for one telemetry frame.
#[derive(Debug, Clone, PartialEq)]
pub struct ControlResponse {
    /// Latency compensated state handed to the controller
    pub state: VehicleState,

    /// Reference path
    pub coeffs: PolyCoeffs,

    /// Command for the simulator
    pub command: ControlCommand,

    /// True if the steering demand had to be limited
    pub steer_saturated: bool,

    /// Trajectory predicted by the controller
    pub predicted: Vec<VehiclePoint>,

    /// Samples of the reference path
    pub reference: Vec<VehiclePoint>
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl ControlResponse {
    /// Build the payload of the `steer` event.
    pub fn to_payload(&self) -> SteerPayload {
        SteerPayload {
            steering_angle: self.command.steering,
            throttle: self.command.throttle,
            mpc_x: self.predicted.iter().map(|p| p.x).collect(),
            mpc_y: self.predicted.iter().map(|p| p.y).collect(),
            next_x: self.reference.iter().map(|p| p.x).collect(),
            next_y: self.reference.iter().map(|p| p.y).collect()
        }
    }

    /// Serialize the response into a `steer` event frame.
    pub fn to_envelope(&self) -> Result<String, EnvelopeError> {
        self.to_payload().to_envelope()
    }
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Sample the reference path at `x = inc_m * i` for `i` in `1..=num_points`.
///
/// The vehicle position itself (`x = 0`) is never sampled.
pub fn reference_points(coeffs: &PolyCoeffs, inc_m: f64, num_points: usize) -> Vec<VehiclePoint> {
    (1..=num_points)
        .map(|i| {
            let x = inc_m * i as f64;
            Point2::new(x, poly_eval(coeffs.as_slice(), x))
        })
        .collect()
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
