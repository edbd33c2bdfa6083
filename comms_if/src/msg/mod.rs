//! # Messages
//!
//! All messages are serialised as JSON. Inbound channels are multiplexed onto a single
//! subscription as variants of [`InputMsg`], the outbound final waypoints are a [`LaneMsg`].

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

mod input;
mod lane;

pub use input::*;
pub use lane::*;

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// Errors that can occur while parsing a message.
#[derive(Debug, thiserror::Error)]
pub enum MsgParseError {
    #[error("Could not parse the message as JSON: {0}")]
    JsonError(serde_json::Error),
}
