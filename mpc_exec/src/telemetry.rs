//! # Telemetry frames
//!
//! Validated snapshot of the simulator telemetry used by the pipeline.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::convert::TryFrom;

use comms_if::sim::Telemetry;
use nalgebra::Point2;

use crate::frame::{Pose2, WorldPoint};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A single telemetry snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct TelemetryFrame {
    /// Upcoming road waypoints in the world frame
    pub waypoints_m_wf: Vec<WorldPoint>,

    /// Pose of the vehicle in the world frame
    pub pose: Pose2,

    /// Vehicle speed in miles per hour
    pub speed_mph: f64,

    /// Steering angle applied by the previous command
    pub prior_steering_rad: f64,

    /// Throttle applied by the previous command
    pub prior_throttle: f64
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum TelemetryFrameError {
    #[error("Telemetry has {ptsx} waypoint x coordinates but {ptsy} y coordinates")]
    WaypointLengthMismatch { ptsx: usize, ptsy: usize },

    #[error("Telemetry field {0} is not finite")]
    NonFinite(&'static str)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl TryFrom<Telemetry> for TelemetryFrame {
    type Error = TelemetryFrameError;

    fn try_from(telem: Telemetry) -> Result<Self, Self::Error> {
        if telem.ptsx.len() != telem.ptsy.len() {
            return Err(TelemetryFrameError::WaypointLengthMismatch {
                ptsx: telem.ptsx.len(),
                ptsy: telem.ptsy.len()
            })
        }

        let scalars = [
            ("x", telem.x),
            ("y", telem.y),
            ("psi", telem.psi),
            ("speed", telem.speed),
            ("steering_angle", telem.steering_angle),
            ("throttle", telem.throttle)
        ];
        for (name, value) in scalars.iter() {
            if !value.is_finite() {
                return Err(TelemetryFrameError::NonFinite(*name))
            }
        }

        if telem.ptsx.iter().any(|v| !v.is_finite()) {
            return Err(TelemetryFrameError::NonFinite("ptsx"))
        }
        if telem.ptsy.iter().any(|v| !v.is_finite()) {
            return Err(TelemetryFrameError::NonFinite("ptsy"))
        }

        let waypoints_m_wf = telem.ptsx
            .iter()
            .zip(telem.ptsy.iter())
            .map(|(x, y)| Point2::new(*x, *y))
            .collect();

        Ok(Self {
            waypoints_m_wf,
            pose: Pose2::new(telem.x, telem.y, telem.psi),
            speed_mph: telem.speed,
            prior_steering_rad: telem.steering_angle,
            prior_throttle: telem.throttle
        })
    }
}

// ---------------------------------------------------------------------------
// TESTS
// ---------------------------------------------------------------------------
