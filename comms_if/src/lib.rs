//! # Communications interface crate.
//!
//! Provides the wire-level definitions shared between the simulator and the
//! bridge.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Simulator message envelope, telemetry and steering payloads
pub mod sim;
