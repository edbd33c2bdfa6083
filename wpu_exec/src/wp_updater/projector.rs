//! # Pose projector
//!
//! Maps the vehicle's pose onto the route, giving the tracking index (the first waypoint ahead
//! of the vehicle) which starts the output horizon. Projection is stateless, it is recomputed
//! from scratch every cycle.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use serde::Serialize;
use util::maths::get_ang_dist;

use super::RouteIndex;
use crate::loc::Pose;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Projects poses onto the route.
#[derive(Debug, Clone, Copy)]
pub struct PoseProjector {
    behind_angle_rad: f64,
}

/// Result of projecting a pose onto the route.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct Projection {
    /// Index of the waypoint nearest the vehicle
    pub nearest_index: usize,

    /// Index the output horizon starts at. Either `nearest_index` or the one after it, and is not
    /// reduced modulo the route length.
    pub tracking_index: usize,

    /// Angle between the vehicle heading and the direction from the vehicle to the nearest
    /// waypoint.
    pub bearing_error_rad: f64,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl PoseProjector {
    pub fn new(behind_angle_rad: f64) -> Self {
        Self { behind_angle_rad }
    }

    /// Project the pose onto the route.
    ///
    /// If the nearest waypoint lies more than the behind angle away from the vehicle's heading
    /// it is considered to be behind the vehicle, and tracking starts at the next waypoint.
    pub fn project(&self, route: &RouteIndex, pose: &Pose) -> Projection {
        let nearest_index = route.closest_index(pose);
        let nearest = route.get(nearest_index).position();

        let bearing_rad =
            (nearest.y - pose.position_m.y).atan2(nearest.x - pose.position_m.x);
        let bearing_error_rad = get_ang_dist(pose.get_heading(), bearing_rad);

        let tracking_index = if bearing_error_rad.abs() > self.behind_angle_rad {
            nearest_index + 1
        } else {
            nearest_index
        };

        Projection {
            nearest_index,
            tracking_index,
            bearing_error_rad,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::wp_updater::route::test::straight_route;
    use std::f64::consts::{FRAC_PI_4, PI};

    #[test]
    fn test_nearest_ahead() {
        let route = straight_route(10, 5.0, 10.0);
        let proj = PoseProjector::new(FRAC_PI_4);

        // Just behind waypoint 2 facing along the route
        let p = proj.project(&route, &Pose::from_xy_yaw(9.0, 0.0, 0.0));
        assert_eq!(p.nearest_index, 2);
        assert_eq!(p.tracking_index, 2);
    }

    #[test]
    fn test_nearest_behind() {
        let route = straight_route(10, 5.0, 10.0);
        let proj = PoseProjector::new(FRAC_PI_4);

        // Just past waypoint 2 facing along the route
        let p = proj.project(&route, &Pose::from_xy_yaw(11.0, 0.0, 0.0));
        assert_eq!(p.nearest_index, 2);
        assert_eq!(p.tracking_index, 3);
        assert!((p.bearing_error_rad.abs() - PI).abs() < 1e-9);
    }

    #[test]
    fn test_tracking_index_not_wrapped() {
        let route = straight_route(10, 5.0, 10.0);
        let proj = PoseProjector::new(FRAC_PI_4);

        // Past the last waypoint, the tracking index is one beyond the route
        let p = proj.project(&route, &Pose::from_xy_yaw(46.0, 0.0, 0.0));
        assert_eq!(p.nearest_index, 9);
        assert_eq!(p.tracking_index, 10);
        assert_eq!(route.wrap_index(p.tracking_index), 0);
    }

    #[test]
    fn test_heading_wraps() {
        // A route heading in the -x direction, the vehicle yaw is close to pi while the bearing
        // from atan2 is close to -pi. These are the same direction.
        let route = RouteIndex::new(
            (0..10)
                .map(|i| {
                    crate::wp_updater::Waypoint::new(
                        Pose::from_xy_yaw(-(i as f64) * 5.0, -0.01 * i as f64, PI),
                        10.0,
                    )
                })
                .collect(),
        )
        .unwrap();
        let proj = PoseProjector::new(FRAC_PI_4);

        let p = proj.project(&route, &Pose::from_xy_yaw(-9.0, 0.0, PI - 0.01));
        assert_eq!(p.nearest_index, 2);
        assert_eq!(p.tracking_index, 2);
    }
}
