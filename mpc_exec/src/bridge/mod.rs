//! # Bridge module
//!
//! The bridge is the session-level module which answers the simulator. Each raw frame received
//! from the simulator is decoded, telemetry frames are run through the pipeline and a reply is
//! produced:
//!
//! - Frames which are not message events get no reply.
//! - Events other than `telemetry` get no reply.
//! - Telemetry frames which can't be processed (no data, invalid payload, too few waypoints,
//!   controller failure) are answered with the manual driving envelope. The session carries on
//!   with the next frame.
//! - All other telemetry frames are answered with a `steer` envelope.
//!
//! The bridge owns the controller for the whole session. `Bridge::serve` drives it from a line
//! link until the link's input is exhausted.

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

mod params;
mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use params::*;
pub use state::*;

use crate::link::LinkError;
use util::archive::ArchiveError;

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Errors which stop the bridge from processing.
#[derive(Debug, thiserror::Error)]
pub enum BridgeError {
    #[error("Could not create the bridge archive: {0}")]
    ArchiveInitError(ArchiveError),

    #[error("Could not archive the frame: {0}")]
    ArchiveWriteError(ArchiveError),

    #[error("Link failure: {0}")]
    RecvError(LinkError),

    #[error("Link failure: {0}")]
    SendError(LinkError)
}
