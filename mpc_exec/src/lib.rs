//! # MPC bridge library.
//!
//! This library allows other crates in the workspace (and the benchmarks) to access items defined
//! inside the bridge crate.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Bridge - answers the simulator's frames for the duration of a session
pub mod bridge;

/// Controller interface, the adapter unpacking its results and a PID stand-in controller
pub mod controller;

/// State estimator - compensates for the actuation latency
pub mod estimator;

/// Frame transform - world frame to vehicle frame
pub mod frame;

/// Line links - stdio and replay file I/O for the bridge
pub mod link;

/// Pipeline - telemetry frame to control response
pub mod pipeline;

/// Response builder - reference path samples and the `steer` payload
pub mod response;

/// Validated telemetry frames
pub mod telemetry;

/// Trajectory fitter - least squares polynomial reference path
pub mod traj_fit;
