//! Bridge parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};
use std::time::Duration;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the bridge
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct BridgeParams {

    /// Actuation latency compensated for by the state estimator
    pub latency_s: f64,

    /// Distance between the vehicle's centre of mass and its front axle
    pub lf_m: f64,

    /// Factor converting the telemetry speed into meters/second.
    ///
    /// The simulator reports speed in miles per hour.
    pub mph_to_ms: f64,

    /// Maximum physical steering angle of the vehicle, maps onto a normalised steering demand of
    /// 1.0
    pub max_steer_deg: f64,

    /// Spacing along the vehicle X axis of the reference path points sent for display
    pub ref_poly_inc_m: f64,

    /// Number of reference path points sent for display
    pub ref_num_points: usize,

    /// Artificial delay applied before each steering response is sent, emulating actuation
    /// latency
    pub response_delay_ms: u64,

    /// If true the per-frame state and command are archived into the session
    pub archive: bool
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum BridgeParamsError {
    #[error("Parameter {0} must be strictly positive, found {1}")]
    NotPositive(&'static str, f64),

    #[error("Parameter {0} must not be negative, found {1}")]
    Negative(&'static str, f64)
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for BridgeParams {
    fn default() -> Self {
        Self {
            latency_s: 0.1,
            lf_m: 2.67,
            mph_to_ms: 0.44704,
            max_steer_deg: 25.0,
            ref_poly_inc_m: 2.5,
            ref_num_points: 24,
            response_delay_ms: 100,
            archive: true
        }
    }
}

impl BridgeParams {
    /// Check the parameters are usable.
    pub fn validate(&self) -> Result<(), BridgeParamsError> {
        let positive = [
            ("lf_m", self.lf_m),
            ("mph_to_ms", self.mph_to_ms),
            ("max_steer_deg", self.max_steer_deg),
            ("ref_poly_inc_m", self.ref_poly_inc_m)
        ];

        for (name, value) in positive.iter() {
            if !(*value > 0.0) {
                return Err(BridgeParamsError::NotPositive(*name, *value))
            }
        }

        if !(self.latency_s >= 0.0) {
            return Err(BridgeParamsError::Negative("latency_s", self.latency_s))
        }

        Ok(())
    }

    /// The artificial delay to apply before sending a steering response.
    pub fn response_delay(&self) -> Duration {
        Duration::from_millis(self.response_delay_ms)
    }
}
