//! PID tracking controller parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the PID tracking controller
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
pub struct PidTrackerParams {

    /// Cross track error controller proportional gain
    pub lat_k_p: f64,

    /// Cross track error controller integral gain
    pub lat_k_i: f64,

    /// Cross track error controller derivative gain
    pub lat_k_d: f64,

    /// Heading error controller proportional gain
    pub head_k_p: f64,

    /// Heading error controller integral gain
    pub head_k_i: f64,

    /// Heading error controller derivative gain
    pub head_k_d: f64,

    /// Speed error controller proportional gain
    pub speed_k_p: f64,

    /// Speed error controller integral gain
    pub speed_k_i: f64,

    /// Speed error controller derivative gain
    pub speed_k_d: f64,

    /// Target speed
    pub ref_speed_ms: f64,

    /// Steering angle limit
    pub max_steer_rad: f64,

    /// Throttle demand minimum limit
    pub min_throttle: f64,

    /// Throttle demand maximum limit
    pub max_throttle: f64,

    /// Control period, used as the PID time step and the prediction time step
    pub dt_s: f64,

    /// Number of steps in the predicted trajectory
    pub num_pred_steps: usize,

    /// Distance from the centre of mass to the front axle
    pub lf_m: f64
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for PidTrackerParams {
    fn default() -> Self {
        Self {
            lat_k_p: 0.15,
            lat_k_i: 0.0,
            lat_k_d: 0.05,
            head_k_p: 0.8,
            head_k_i: 0.0,
            head_k_d: 0.05,
            speed_k_p: 0.2,
            speed_k_i: 0.01,
            speed_k_d: 0.0,
            ref_speed_ms: 20.0,
            max_steer_rad: 0.436332,
            min_throttle: -1.0,
            max_throttle: 1.0,
            dt_s: 0.1,
            num_pred_steps: 10,
            lf_m: 2.67
        }
    }
}
