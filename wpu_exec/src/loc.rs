//! # Localisation types
//!
//! Pose of the vehicle as received from the localisation system. Acquisition of the pose is
//! external to the updater, this module only converts the wire messages into typed values.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::msg::{Orientation, PoseMsg};
use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// CONSTANTS
// ---------------------------------------------------------------------------

/// Minimum norm of a quaternion for it to be normalised into an attitude.
const MIN_QUAT_NORM: f64 = 1e-9;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A pose (position and attitude in the map frame).
#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct Pose {
    /// The position in the map frame
    pub position_m: Vector3<f64>,

    /// The attitude in the map frame.
    pub attitude_q: UnitQuaternion<f64>,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum PoseError {
    #[error("The orientation quaternion {0:?} cannot be normalised")]
    DegenerateQuaternion([f64; 4]),

    #[error("The pose contains a non-finite value")]
    NonFinite,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Pose {
    /// Create a new pose on the XY plane from a position and a yaw.
    pub fn from_xy_yaw(x_m: f64, y_m: f64, yaw_rad: f64) -> Self {
        Self {
            position_m: Vector3::new(x_m, y_m, 0.0),
            attitude_q: UnitQuaternion::from_euler_angles(0.0, 0.0, yaw_rad),
        }
    }

    /// Return the heading (angle to the positive X axis) in radians.
    ///
    /// Heading is the yaw euler angle and lies in the range [-pi, pi].
    pub fn get_heading(&self) -> f64 {
        self.attitude_q.euler_angles().2
    }

    /// Straight-line distance between the positions of two poses.
    pub fn distance_to(&self, other: &Pose) -> f64 {
        (self.position_m - other.position_m).norm()
    }
}

/// Convert a wire orientation into an attitude quaternion.
pub fn attitude_from_orientation(
    orientation: &Orientation,
) -> Result<UnitQuaternion<f64>, PoseError> {
    match *orientation {
        Orientation::Quaternion(q) => {
            if q.iter().any(|v| !v.is_finite()) {
                return Err(PoseError::NonFinite);
            }

            // Wire order is [x, y, z, w], nalgebra's constructor takes w first
            UnitQuaternion::try_new(Quaternion::new(q[3], q[0], q[1], q[2]), MIN_QUAT_NORM)
                .ok_or(PoseError::DegenerateQuaternion(q))
        }
        Orientation::Yaw(yaw_rad) => {
            if !yaw_rad.is_finite() {
                return Err(PoseError::NonFinite);
            }
            Ok(UnitQuaternion::from_euler_angles(0.0, 0.0, yaw_rad))
        }
    }
}

/// Convert an attitude back into a wire orientation.
pub fn orientation_from_attitude(attitude_q: &UnitQuaternion<f64>) -> Orientation {
    let q = attitude_q.quaternion();
    Orientation::Quaternion([q.i, q.j, q.k, q.w])
}

impl std::convert::TryFrom<&PoseMsg> for Pose {
    type Error = PoseError;

    fn try_from(msg: &PoseMsg) -> Result<Self, Self::Error> {
        if msg.position_m.iter().any(|v| !v.is_finite()) {
            return Err(PoseError::NonFinite);
        }

        Ok(Self {
            position_m: Vector3::from(msg.position_m),
            attitude_q: attitude_from_orientation(&msg.orientation)?,
        })
    }
}
