//! # Message envelope
//!
//! Decoding and encoding of the `42[event, payload]` envelope used by the simulator.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::Serialize;
use serde_json::Value;

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// Packet type prefix marking a message event.
pub const EVENT_PREFIX: &str = "42";

/// Marker found in frames which carry no data.
pub const NULL_MARKER: &str = "null";

/// Event carrying vehicle telemetry.
pub const TELEMETRY_EVENT: &str = "telemetry";

/// Event carrying the steering command back to the simulator.
pub const STEER_EVENT: &str = "steer";

/// Event handing control back to the simulator.
pub const MANUAL_EVENT: &str = "manual";

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// A decoded inbound frame.
#[derive(Debug, Clone, PartialEq)]
pub enum Inbound {
    /// The frame is not a message event (too short or a different packet type). No reply is
    /// expected for it.
    NotEvent,

    /// The frame is a message event without any data, the manual driving reply shall be sent.
    NoData,

    /// A message event with its name and payload.
    Event {
        name: String,
        payload: Value
    }
}

#[derive(Debug, thiserror::Error)]
pub enum EnvelopeError {
    #[error("The envelope contains invalid JSON: {0}")]
    InvalidJson(serde_json::Error),

    #[error("The envelope does not start with an event name")]
    MissingEventName,

    #[error("Could not serialize the payload: {0}")]
    SerializationError(serde_json::Error)
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

/// Find the JSON array held in the frame.
///
/// Returns `None` if the frame contains the null marker or if the array bounds (the first `[` and
/// the last `}]`) can't be found.
pub fn has_data(frame: &str) -> Option<&str> {
    if frame.contains(NULL_MARKER) {
        return None
    }

    let start = frame.find('[')?;
    let end = frame.rfind("}]")?;

    if end < start {
        return None
    }

    Some(&frame[start..end + 2])
}

/// Decode a raw text frame.
///
/// An `Err` means the frame was a message event but its data could not be understood, which
/// shall be treated the same as `Inbound::NoData`.
pub fn decode(frame: &str) -> Result<Inbound, EnvelopeError> {
    if frame.len() <= EVENT_PREFIX.len() || !frame.starts_with(EVENT_PREFIX) {
        return Ok(Inbound::NotEvent)
    }

    let data = match has_data(frame) {
        Some(d) => d,
        None => return Ok(Inbound::NoData)
    };

    let mut array: Vec<Value> = serde_json::from_str(data)
        .map_err(EnvelopeError::InvalidJson)?;

    if array.is_empty() {
        return Err(EnvelopeError::MissingEventName)
    }

    let name = match array[0].as_str() {
        Some(s) => s.to_string(),
        None => return Err(EnvelopeError::MissingEventName)
    };

    // Events with no payload carry a null
    let payload = if array.len() > 1 {
        array.swap_remove(1)
    }
    else {
        Value::Null
    };

    Ok(Inbound::Event { name, payload })
}

/// Encode an event and its payload into an envelope.
pub fn encode<T: Serialize>(event: &str, payload: &T) -> Result<String, EnvelopeError> {
    let body = serde_json::to_string(&(event, payload))
        .map_err(EnvelopeError::SerializationError)?;

    Ok(format!("{}{}", EVENT_PREFIX, body))
}

/// The manual driving envelope, `42["manual",{}]`.
pub fn manual() -> String {
    format!("{}[\"{}\",{{}}]", EVENT_PREFIX, MANUAL_EVENT)
}

// ------------------------------------------------------------------------------------------------
// TESTS
// ------------------------------------------------------------------------------------------------
