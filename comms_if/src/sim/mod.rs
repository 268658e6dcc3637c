//! # Simulator interface
//!
//! Messages exchanged with the driving simulator are socket.io style text frames. A message event
//! starts with the packet type `42` (`4` for a message, `2` for an event) followed by a JSON array
//! of `[event_name, payload]`:
//!
//! ```text
//! 42["telemetry",{"ptsx":[...],"ptsy":[...],"x":1.0,"y":2.0,"psi":0.1,"speed":30.0,...}]
//! 42["steer",{"steering_angle":0.1,"throttle":0.3,"mpc_x":[...],...}]
//! 42["manual",{}]
//! ```

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

pub mod envelope;
pub mod steer;
pub mod telemetry;

// ------------------------------------------------------------------------------------------------
// EXPORTS
// ------------------------------------------------------------------------------------------------

pub use envelope::{Inbound, EnvelopeError};
pub use steer::SteerPayload;
pub use telemetry::{Telemetry, TelemetryError};
