//! # Route
//!
//! The route is the fixed, ordered, circular sequence of waypoints the vehicle follows. It is
//! delivered once by the upstream planner and is never mutated, only replaced whole.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::convert::TryFrom;

use comms_if::msg::{LaneMsg, WaypointMsg};
use nalgebra::Vector3;
use serde::Serialize;

use crate::loc::{attitude_from_orientation, orientation_from_attitude, Pose, PoseError};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A point on the route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Waypoint {
    pub pose: Pose,

    /// Cruise speed (the speed limit) at this point, in meters/second.
    pub cruise_speed_ms: f64,
}

/// Index over the route.
///
/// The route is guaranteed to be non-empty, so every index can be reduced modulo the route
/// length and dereferenced. Indexes passed to any method may be larger than the route, they wrap.
#[derive(Debug, Clone)]
pub struct RouteIndex {
    waypoints: Vec<Waypoint>,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum RouteError {
    #[error("Attempted to create a route from an empty sequence")]
    EmptyRoute,

    #[error("Waypoint {index} has an invalid cruise speed of {speed_ms} m/s")]
    InvalidCruiseSpeed { index: usize, speed_ms: f64 },

    #[error("Waypoint {index} has an invalid pose: {error}")]
    InvalidPose { index: usize, error: PoseError },
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Waypoint {
    pub fn new(pose: Pose, cruise_speed_ms: f64) -> Self {
        Self {
            pose,
            cruise_speed_ms,
        }
    }

    pub fn position(&self) -> &Vector3<f64> {
        &self.pose.position_m
    }

    /// Build the wire representation of this waypoint with the given target speed.
    pub fn to_msg(&self, speed_ms: f64) -> WaypointMsg {
        WaypointMsg {
            position_m: [
                self.pose.position_m.x,
                self.pose.position_m.y,
                self.pose.position_m.z,
            ],
            orientation: orientation_from_attitude(&self.pose.attitude_q),
            speed_ms,
        }
    }
}

impl TryFrom<&WaypointMsg> for Waypoint {
    type Error = PoseError;

    fn try_from(msg: &WaypointMsg) -> Result<Self, Self::Error> {
        if msg.position_m.iter().any(|v| !v.is_finite()) {
            return Err(PoseError::NonFinite);
        }

        Ok(Self {
            pose: Pose {
                position_m: Vector3::from(msg.position_m),
                attitude_q: attitude_from_orientation(&msg.orientation)?,
            },
            cruise_speed_ms: msg.speed_ms,
        })
    }
}

impl RouteIndex {
    /// Create a new route index from a sequence of waypoints.
    ///
    /// The sequence must be non-empty and every cruise speed must be finite and non-negative.
    pub fn new(waypoints: Vec<Waypoint>) -> Result<Self, RouteError> {
        if waypoints.is_empty() {
            return Err(RouteError::EmptyRoute);
        }

        for (index, wp) in waypoints.iter().enumerate() {
            if !wp.cruise_speed_ms.is_finite() || wp.cruise_speed_ms < 0.0 {
                return Err(RouteError::InvalidCruiseSpeed {
                    index,
                    speed_ms: wp.cruise_speed_ms,
                });
            }
            if wp.pose.position_m.iter().any(|v| !v.is_finite()) {
                return Err(RouteError::InvalidPose {
                    index,
                    error: PoseError::NonFinite,
                });
            }
        }

        Ok(Self { waypoints })
    }

    /// Create a new route index from a lane message.
    pub fn from_lane(lane: &LaneMsg) -> Result<Self, RouteError> {
        let waypoints = lane
            .waypoints
            .iter()
            .enumerate()
            .map(|(index, msg)| {
                Waypoint::try_from(msg).map_err(|error| RouteError::InvalidPose { index, error })
            })
            .collect::<Result<Vec<_>, _>>()?;

        Self::new(waypoints)
    }

    /// Number of waypoints in the route, always at least 1.
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Reduce an index modulo the route length.
    pub fn wrap_index(&self, index: usize) -> usize {
        index % self.waypoints.len()
    }

    /// Get the waypoint at the given index, wrapping around the route.
    pub fn get(&self, index: usize) -> &Waypoint {
        &self.waypoints[self.wrap_index(index)]
    }

    /// Return the index of the waypoint closest (3D euclidean distance) to the given pose.
    ///
    /// Ties are broken in favour of the lowest index.
    pub fn closest_index(&self, pose: &Pose) -> usize {
        let mut closest = 0;
        let mut closest_dist_m = std::f64::INFINITY;

        for (i, wp) in self.waypoints.iter().enumerate() {
            let dist_m = (wp.position() - pose.position_m).norm();
            if dist_m < closest_dist_m {
                closest_dist_m = dist_m;
                closest = i;
            }
        }

        closest
    }

    /// Return the length of the path from waypoint `start` to waypoint `end` inclusive.
    ///
    /// The path walks forward one waypoint at a time from `start` to `end`, summing the segment
    /// lengths. Indexes wrap when dereferenced so `end` may lie past the end of the route.
    ///
    /// If `start` is greater than `end` the length is zero.
    pub fn path_length(&self, start: usize, end: usize) -> f64 {
        if start >= end {
            return 0.0;
        }

        (start + 1..=end)
            .map(|i| (self.get(i).position() - self.get(i - 1).position()).norm())
            .sum()
    }
}
