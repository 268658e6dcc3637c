//! # Steering payload
//!
//! The payload of the `steer` event sent back to the simulator.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::envelope::{self, EnvelopeError};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Actuator command and visualisation data for the simulator.
///
/// All trajectories are in the vehicle frame.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SteerPayload {
    /// Normalised steering demand in the range [-1, 1]
    pub steering_angle: f64,

    /// Throttle demand
    pub throttle: f64,

    /// X coordinates of the trajectory predicted by the controller (drawn green)
    pub mpc_x: Vec<f64>,

    /// Y coordinates of the trajectory predicted by the controller
    pub mpc_y: Vec<f64>,

    /// X coordinates of the reference path (drawn yellow)
    pub next_x: Vec<f64>,

    /// Y coordinates of the reference path
    pub next_y: Vec<f64>
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl SteerPayload {
    /// Wrap the payload in a `steer` event envelope.
    pub fn to_envelope(&self) -> Result<String, EnvelopeError> {
        envelope::encode(envelope::STEER_EVENT, self)
    }

    /// Parse the payload of a `steer` event.
    pub fn from_value(payload: Value) -> Result<Self, serde_json::Error> {
        serde_json::from_value(payload)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
