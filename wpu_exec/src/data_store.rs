//! # Data Store
//!
//! Holds the latest value received on each input channel. Inputs are written by independent
//! producers (the network client or a script player) and read once per cycle by the executor.
//! Each channel is guarded separately, a new value always replaces the previous one and there
//! is no queueing. Nothing guarantees that values from different channels were current at the
//! same time upstream.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::convert::TryFrom;
use std::sync::{Arc, Mutex, PoisonError};

use comms_if::msg::InputMsg;
use log::{info, warn};

use crate::{
    loc::{Pose, PoseError},
    wp_updater::{RouteError, RouteIndex, StopSignal},
};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// A guarded cell holding the latest value of an input.
///
/// Clones share the same underlying value.
#[derive(Debug)]
pub struct LatestCell<T> {
    value: Arc<Mutex<Option<T>>>,
}

/// Latest values of every input channel.
///
/// Clones share the same cells, so a clone can be handed to each producer.
#[derive(Debug, Clone, Default)]
pub struct DataStore {
    pub pose: LatestCell<Pose>,

    pub velocity_ms: LatestCell<f64>,

    pub route: LatestCell<Arc<RouteIndex>>,

    pub stop_signal: LatestCell<StopSignal>,

    /// Index of the latest detected obstacle. Stored but not used by the planner.
    pub obstacle_index: LatestCell<i32>,
}

/// A copy of the latest inputs taken at the start of a cycle.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub pose: Option<Pose>,
    pub velocity_ms: Option<f64>,
    pub route: Option<Arc<RouteIndex>>,
    pub stop_signal: Option<StopSignal>,
    pub obstacle_index: Option<i32>,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// Result of successfully applying an input.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Applied {
    /// The value was stored.
    Stored,

    /// The input asked for the control loop to stop.
    ShutdownRequested,
}

/// Reasons an input is rejected. Rejected inputs leave the previous value in place.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum InputError {
    #[error("Invalid pose: {0}")]
    InvalidPose(PoseError),

    #[error("Invalid velocity: {0}")]
    InvalidVelocity(f64),

    #[error("Invalid route: {0}")]
    InvalidRoute(RouteError),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl<T> Default for LatestCell<T> {
    fn default() -> Self {
        Self {
            value: Arc::new(Mutex::new(None)),
        }
    }
}

impl<T> Clone for LatestCell<T> {
    fn clone(&self) -> Self {
        Self {
            value: self.value.clone(),
        }
    }
}

impl<T: Clone> LatestCell<T> {
    /// Replace the value, returning the previous one.
    pub fn set(&self, value: T) -> Option<T> {
        // The cell holds plain data so a poisoned lock is still usable
        let mut v = self.value.lock().unwrap_or_else(PoisonError::into_inner);
        v.replace(value)
    }

    /// Get a copy of the latest value.
    pub fn get(&self) -> Option<T> {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_set(&self) -> bool {
        self.value
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }
}

impl DataStore {
    /// Validate an input message and store it in the matching cell.
    pub fn apply(&self, msg: &InputMsg) -> Result<Applied, InputError> {
        match msg {
            InputMsg::Pose(p) => {
                let pose = Pose::try_from(p).map_err(InputError::InvalidPose)?;
                self.pose.set(pose);
            }
            InputMsg::Velocity(v) => {
                if !v.linear_x_ms.is_finite() {
                    return Err(InputError::InvalidVelocity(v.linear_x_ms));
                }
                self.velocity_ms.set(v.linear_x_ms);
            }
            InputMsg::Route(lane) => {
                let route = RouteIndex::from_lane(lane).map_err(InputError::InvalidRoute)?;
                self.set_route(route);
            }
            InputMsg::StopSignal(s) => {
                self.stop_signal.set(StopSignal::from(s.stop_index()));
            }
            InputMsg::Obstacle(o) => {
                self.obstacle_index.set(o.index);
            }
            InputMsg::Shutdown => return Ok(Applied::ShutdownRequested),
        }

        Ok(Applied::Stored)
    }

    /// Store a new route, replacing any previous one whole.
    pub fn set_route(&self, route: RouteIndex) {
        let num_wps = route.len();

        match self.route.set(Arc::new(route)) {
            None => info!("Route received with {} waypoints", num_wps),
            Some(_) => warn!("Route replaced, new route has {} waypoints", num_wps),
        }
    }

    /// Take a copy of the latest value of every input.
    pub fn snapshot(&self) -> Snapshot {
        Snapshot {
            pose: self.pose.get(),
            velocity_ms: self.velocity_ms.get(),
            route: self.route.get(),
            stop_signal: self.stop_signal.get(),
            obstacle_index: self.obstacle_index.get(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use comms_if::msg::*;
    use std::thread;

    fn route_msg(num_points: usize) -> LaneMsg {
        LaneMsg {
            header: Header::now("world"),
            waypoints: (0..num_points)
                .map(|i| WaypointMsg {
                    position_m: [i as f64, 0.0, 0.0],
                    orientation: Orientation::Yaw(0.0),
                    speed_ms: 10.0,
                })
                .collect(),
        }
    }

    #[test]
    fn test_last_value_wins() {
        let ds = DataStore::default();

        for v in 0..10 {
            ds.apply(&InputMsg::Velocity(VelocityMsg {
                linear_x_ms: v as f64,
            }))
            .unwrap();
        }
        assert_eq!(ds.velocity_ms.get(), Some(9.0));

        ds.apply(&InputMsg::StopSignal(StopSignalMsg { index: 4 }))
            .unwrap();
        ds.apply(&InputMsg::StopSignal(StopSignalMsg {
            index: StopSignalMsg::NONE,
        }))
        .unwrap();
        assert_eq!(ds.stop_signal.get(), Some(StopSignal::Clear));
    }

    #[test]
    fn test_rejected_inputs_keep_previous() {
        let ds = DataStore::default();

        ds.apply(&InputMsg::Route(route_msg(5))).unwrap();
        assert_eq!(
            ds.apply(&InputMsg::Route(route_msg(0))),
            Err(InputError::InvalidRoute(RouteError::EmptyRoute))
        );
        assert_eq!(ds.route.get().unwrap().len(), 5);

        ds.apply(&InputMsg::Velocity(VelocityMsg { linear_x_ms: 3.0 }))
            .unwrap();
        assert!(ds
            .apply(&InputMsg::Velocity(VelocityMsg {
                linear_x_ms: std::f64::INFINITY
            }))
            .is_err());
        assert_eq!(ds.velocity_ms.get(), Some(3.0));

        assert!(ds
            .apply(&InputMsg::Pose(PoseMsg {
                position_m: [0.0; 3],
                orientation: Orientation::Quaternion([0.0; 4])
            }))
            .is_err());
        assert!(!ds.pose.is_set());
    }

    #[test]
    fn test_obstacle_and_shutdown() {
        let ds = DataStore::default();

        assert_eq!(
            ds.apply(&InputMsg::Obstacle(ObstacleMsg { index: 12 })),
            Ok(Applied::Stored)
        );
        assert_eq!(ds.snapshot().obstacle_index, Some(12));
        assert_eq!(ds.apply(&InputMsg::Shutdown), Ok(Applied::ShutdownRequested));
    }

    #[test]
    fn test_concurrent_producers() {
        let ds = DataStore::default();

        let handles: Vec<_> = (0..4)
            .map(|t| {
                let ds = ds.clone();
                thread::spawn(move || {
                    for i in 0..1000 {
                        ds.apply(&InputMsg::Velocity(VelocityMsg {
                            linear_x_ms: (t * 1000 + i) as f64,
                        }))
                        .unwrap();
                        ds.snapshot();
                    }
                })
            })
            .collect();

        for h in handles {
            h.join().unwrap();
        }

        // Whichever producer wrote last, the value is one of the final writes
        let v = ds.velocity_ms.get().unwrap();
        assert!([999.0, 1999.0, 2999.0, 3999.0].contains(&v));
    }
}
