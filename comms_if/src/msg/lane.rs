//! Lane (ordered waypoint list) message definitions

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::Orientation;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Standard message header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Header {
    /// Time at which the message was produced
    pub stamp: DateTime<Utc>,

    /// Coordinate frame the poses in the message are expressed in
    pub frame_id: String,
}

/// A single waypoint on the wire.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaypointMsg {
    /// Position of the waypoint in meters.
    pub position_m: [f64; 3],

    /// Orientation of the waypoint.
    pub orientation: Orientation,

    /// Target speed at this waypoint in meters/second. On the route this is the cruise speed
    /// (the road's speed limit), on the final waypoints it is the speed to track.
    pub speed_ms: f64,
}

/// An ordered list of waypoints.
///
/// Used both for the base route delivered to the updater and for the final waypoints published
/// each cycle.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LaneMsg {
    pub header: Header,

    pub waypoints: Vec<WaypointMsg>,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl Header {
    /// Create a new header stamped with the current time.
    pub fn now(frame_id: &str) -> Self {
        Self {
            stamp: Utc::now(),
            frame_id: frame_id.to_string(),
        }
    }
}

impl LaneMsg {
    /// Serialise the lane into a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }
}
