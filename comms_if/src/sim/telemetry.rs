//! # Telemetry payload
//!
//! The payload of the `telemetry` event, as sent by the simulator.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Vehicle telemetry sent by the simulator.
///
/// Positions are in the simulator's global (map) frame. Unknown fields sent by the simulator are
/// ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Telemetry {
    /// X coordinates of the upcoming road waypoints in meters
    pub ptsx: Vec<f64>,

    /// Y coordinates of the upcoming road waypoints in meters
    pub ptsy: Vec<f64>,

    /// Vehicle position X in meters
    pub x: f64,

    /// Vehicle position Y in meters
    pub y: f64,

    /// Vehicle heading in radians
    pub psi: f64,

    /// Vehicle speed in miles per hour
    pub speed: f64,

    /// Steering angle currently applied by the vehicle in radians
    pub steering_angle: f64,

    /// Throttle currently applied by the vehicle
    pub throttle: f64
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TelemetryError {
    #[error("The telemetry payload is missing or malformed: {0}")]
    InvalidPayload(serde_json::Error)
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Telemetry {
    /// Parse the telemetry from the payload of a `telemetry` event.
    pub fn from_value(payload: Value) -> Result<Self, TelemetryError> {
        serde_json::from_value(payload).map_err(TelemetryError::InvalidPayload)
    }
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
