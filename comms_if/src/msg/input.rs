//! Inbound channel message definitions

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use serde::{Deserialize, Serialize};

use super::{LaneMsg, MsgParseError};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Pose of the vehicle as reported by localisation.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PoseMsg {
    /// Position in meters.
    pub position_m: [f64; 3],

    pub orientation: Orientation,
}

/// Current forward velocity of the vehicle.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VelocityMsg {
    /// Forward (body x) velocity in meters/second.
    pub linear_x_ms: f64,
}

/// Index of the route waypoint the vehicle must stop at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct StopSignalMsg {
    /// The stop index. Any negative value (usually [`StopSignalMsg::NONE`]) means there is no
    /// stop required.
    pub index: i32,
}

/// Index of the route waypoint an obstacle has been detected at.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ObstacleMsg {
    pub index: i32,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

/// An orientation, either as a full quaternion or as a yaw angle about the z axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum Orientation {
    /// Quaternion in `[x, y, z, w]` order.
    Quaternion([f64; 4]),

    /// Yaw in radians.
    Yaw(f64),
}

/// Any message which can be received on the updater's input subscription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum InputMsg {
    Pose(PoseMsg),
    Velocity(VelocityMsg),
    Route(LaneMsg),
    StopSignal(StopSignalMsg),
    Obstacle(ObstacleMsg),

    /// Request that the updater stops its control loop.
    Shutdown,
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl StopSignalMsg {
    /// Sentinel value meaning no stop is required.
    pub const NONE: i32 = -1;

    /// Get the stop index if there is one.
    pub fn stop_index(&self) -> Option<usize> {
        if self.index < 0 {
            None
        } else {
            Some(self.index as usize)
        }
    }
}

impl InputMsg {
    /// Parse an input message from a JSON string.
    pub fn from_json(json_str: &str) -> Result<Self, MsgParseError> {
        serde_json::from_str(json_str).map_err(MsgParseError::JsonError)
    }

    /// Serialise the input message into a JSON string.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string(self)
    }

    /// Short name of the channel this message was received on, used in logs.
    pub fn channel_name(&self) -> &'static str {
        match self {
            InputMsg::Pose(_) => "pose",
            InputMsg::Velocity(_) => "velocity",
            InputMsg::Route(_) => "route",
            InputMsg::StopSignal(_) => "stop_signal",
            InputMsg::Obstacle(_) => "obstacle",
            InputMsg::Shutdown => "shutdown",
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_stop_index() {
        assert_eq!(StopSignalMsg { index: StopSignalMsg::NONE }.stop_index(), None);
        assert_eq!(StopSignalMsg { index: -7 }.stop_index(), None);
        assert_eq!(StopSignalMsg { index: 0 }.stop_index(), Some(0));
        assert_eq!(StopSignalMsg { index: 293 }.stop_index(), Some(293));
    }

    #[test]
    fn test_parse_input_json() {
        let msg = InputMsg::from_json(
            r#"{"Pose": {"position_m": [1.0, 2.0, 0.0], "orientation": {"Yaw": 0.5}}}"#,
        )
        .unwrap();
        assert_eq!(
            msg,
            InputMsg::Pose(PoseMsg {
                position_m: [1.0, 2.0, 0.0],
                orientation: Orientation::Yaw(0.5)
            })
        );

        let msg = InputMsg::from_json(r#"{"StopSignal": {"index": -1}}"#).unwrap();
        assert_eq!(msg.channel_name(), "stop_signal");

        assert_eq!(InputMsg::from_json(r#""Shutdown""#).unwrap(), InputMsg::Shutdown);
        assert!(InputMsg::from_json(r#"{"Throttle": 1.0}"#).is_err());
    }
}
