//! # Speed profile builder
//!
//! Builds the horizon of waypoints and target speeds published each cycle.
//!
//! When cruising the route's own cruise speeds are passed through untouched. When braking
//! every waypoint from the stop index onwards gets a speed of zero, and the waypoints before the
//! stop follow the constant deceleration curve `v = sqrt(2 * a * d)`, where `d` is the
//! straight-line distance to the stop point less the standoff buffer. The curve is capped by
//! each waypoint's cruise speed.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use comms_if::msg::{Header, LaneMsg};
use serde::Serialize;

use super::{Params, PlannerState, RouteIndex, StopSignal, Waypoint};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Builds the output horizon.
#[derive(Debug, Clone)]
pub struct SpeedProfileBuilder {
    lookahead_wps: usize,

    buffer_break_m: f64,

    stop_speed_threshold_ms: f64,
}

/// A single entry in the trajectory.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TrajPoint {
    /// Index of the waypoint in the route, reduced modulo the route length.
    pub route_index: usize,

    /// The route waypoint this entry was built from.
    pub waypoint: Waypoint,

    /// Speed the vehicle should have at this waypoint.
    pub speed_ms: f64,
}

/// The horizon of waypoints and speeds for the downstream controller to track.
#[derive(Debug, Clone, PartialEq, Serialize, Default)]
pub struct Trajectory {
    pub points: Vec<TrajPoint>,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl SpeedProfileBuilder {
    pub fn new(params: &Params) -> Self {
        Self {
            lookahead_wps: params.lookahead_wps,
            buffer_break_m: params.buffer_break_m,
            stop_speed_threshold_ms: params.stop_speed_threshold_ms,
        }
    }

    /// Build the trajectory starting at the tracking index.
    ///
    /// A braking profile is only built if the planner is braking and there is a stop index to
    /// brake for, otherwise the cruise profile is built.
    pub fn build(
        &self,
        route: &RouteIndex,
        tracking_index: usize,
        state: PlannerState,
        stop: StopSignal,
    ) -> Trajectory {
        match (state, stop) {
            (PlannerState::Braking { decel_mss }, StopSignal::StopAt(stop_index)) => {
                self.build_braking(route, tracking_index, stop_index, decel_mss)
            }
            _ => self.build_cruise(route, tracking_index),
        }
    }

    /// Cruise profile, every waypoint keeps its cruise speed.
    fn build_cruise(&self, route: &RouteIndex, tracking_index: usize) -> Trajectory {
        Trajectory {
            points: (tracking_index..tracking_index + self.lookahead_wps)
                .map(|i| TrajPoint::cruise(route, i))
                .collect(),
        }
    }

    /// Braking profile, decelerating to a stop at `stop_index`.
    fn build_braking(
        &self,
        route: &RouteIndex,
        tracking_index: usize,
        stop_index: usize,
        decel_mss: f64,
    ) -> Trajectory {
        let horizon_end = tracking_index + self.lookahead_wps;

        // A stop index the vehicle has already passed stops it where it is
        let stop_start = stop_index.max(tracking_index);

        // Waypoints before the stop start at their cruise speeds and are corrected below. Only
        // those inside the horizon are built, the correction of each one depends only on its
        // distance to the stop point.
        let mut points: Vec<TrajPoint> = (tracking_index..stop_start.min(horizon_end))
            .map(|i| TrajPoint::cruise(route, i))
            .collect();
        let num_approach = points.len();

        // The stop point and everything after it within the horizon are stationary
        points.extend(
            (stop_start..horizon_end.max(stop_start + 1)).map(|i| TrajPoint::stopped(route, i)),
        );

        // Backward pass from the waypoint before the stop towards the vehicle
        let target = route.get(stop_start).pose;
        for point in points[..num_approach].iter_mut().rev() {
            let dist_m = (point.waypoint.pose.distance_to(&target) - self.buffer_break_m).max(0.0);

            let mut speed_ms = (2.0 * decel_mss * dist_m).sqrt();
            if speed_ms < self.stop_speed_threshold_ms {
                speed_ms = 0.0;
            }

            point.speed_ms = speed_ms.min(point.speed_ms);
        }

        points.truncate(self.lookahead_wps);

        Trajectory { points }
    }
}

impl TrajPoint {
    fn cruise(route: &RouteIndex, index: usize) -> Self {
        let waypoint = *route.get(index);
        Self {
            route_index: route.wrap_index(index),
            waypoint,
            speed_ms: waypoint.cruise_speed_ms,
        }
    }

    fn stopped(route: &RouteIndex, index: usize) -> Self {
        Self {
            route_index: route.wrap_index(index),
            waypoint: *route.get(index),
            speed_ms: 0.0,
        }
    }
}

impl Trajectory {
    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Iterate over the target speeds.
    pub fn speeds(&self) -> impl Iterator<Item = f64> + '_ {
        self.points.iter().map(|p| p.speed_ms)
    }

    /// Build the wire message for this trajectory, stamped now in the given frame.
    pub fn to_lane_msg(&self, frame_id: &str) -> LaneMsg {
        LaneMsg {
            header: Header::now(frame_id),
            waypoints: self
                .points
                .iter()
                .map(|p| p.waypoint.to_msg(p.speed_ms))
                .collect(),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::loc::Pose;
    use crate::wp_updater::route::test::straight_route;

    fn builder(lookahead_wps: usize) -> SpeedProfileBuilder {
        SpeedProfileBuilder::new(&Params {
            lookahead_wps,
            ..Default::default()
        })
    }

    #[test]
    fn test_cruise_pass_through() {
        // Varying cruise speeds so a copy from the wrong waypoint would be noticed
        let route = RouteIndex::new(
            (0..10)
                .map(|i| Waypoint::new(Pose::from_xy_yaw(i as f64, 0.0, 0.0), i as f64 + 1.0))
                .collect(),
        )
        .unwrap();

        let traj = builder(200).build(&route, 3, PlannerState::Cruise, StopSignal::Clear);

        assert_eq!(traj.len(), 200);
        for (k, p) in traj.points.iter().enumerate() {
            let idx = (3 + k) % 10;
            assert_eq!(p.route_index, idx);
            assert_eq!(p.waypoint, *route.get(idx));
            assert_eq!(p.speed_ms, route.get(idx).cruise_speed_ms);
        }
    }

    #[test]
    fn test_cruise_ignores_stop_signal() {
        let route = straight_route(10, 5.0, 10.0);

        let traj = builder(20).build(&route, 0, PlannerState::Cruise, StopSignal::StopAt(5));
        assert!(traj.speeds().all(|s| s == 10.0));
    }

    #[test]
    fn test_braking_profile() {
        let route = straight_route(10, 5.0, 10.0);
        let traj = builder(200).build(
            &route,
            0,
            PlannerState::Braking { decel_mss: 2.0 },
            StopSignal::StopAt(5),
        );

        assert_eq!(traj.len(), 200);

        // v = sqrt(2 * 2 * (5 * (5 - i) - 5))
        let expected = [80f64.sqrt(), 60f64.sqrt(), 40f64.sqrt(), 20f64.sqrt(), 0.0];
        for (i, exp) in expected.iter().enumerate() {
            assert!((traj.points[i].speed_ms - exp).abs() < 1e-9);
        }

        // Strictly decreasing towards the stop until it reaches zero
        for i in 1..5 {
            assert!(traj.points[i].speed_ms < traj.points[i - 1].speed_ms);
        }

        // The stop and everything after it is stationary
        assert!(traj.points[5..].iter().all(|p| p.speed_ms == 0.0));
        assert_eq!(traj.points[5].route_index, 5);
        assert_eq!(traj.points[12].route_index, 2);
    }

    #[test]
    fn test_braking_capped_by_cruise_speed() {
        let route = straight_route(40, 5.0, 6.0);
        let traj = builder(50).build(
            &route,
            0,
            PlannerState::Braking { decel_mss: 2.0 },
            StopSignal::StopAt(30),
        );

        for (i, p) in traj.points.iter().enumerate() {
            assert!(p.speed_ms >= 0.0);
            assert!(p.speed_ms <= route.get(i).cruise_speed_ms);
        }

        // Far from the stop the cap applies
        assert_eq!(traj.points[0].speed_ms, 6.0);

        // Non-increasing towards the stop, i.e. non-decreasing with distance from it
        for i in 1..30 {
            assert!(traj.points[i].speed_ms <= traj.points[i - 1].speed_ms);
        }
        assert!(traj.points[30..].iter().all(|p| p.speed_ms == 0.0));
    }

    #[test]
    fn test_braking_snaps_slow_speeds() {
        // Points 1 m apart with a 5 m buffer, at 0.2 m/s^2 the point 6 m out would be at
        // sqrt(0.4) m/s, which is below the threshold
        let route = straight_route(20, 1.0, 10.0);
        let traj = builder(20).build(
            &route,
            0,
            PlannerState::Braking { decel_mss: 0.2 },
            StopSignal::StopAt(12),
        );

        assert_eq!(traj.points[6].speed_ms, 0.0);
        assert!(traj.points[0].speed_ms >= 1.0);
    }

    #[test]
    fn test_stop_behind_vehicle() {
        let route = straight_route(10, 5.0, 10.0);
        let traj = builder(15).build(
            &route,
            6,
            PlannerState::Braking { decel_mss: 2.0 },
            StopSignal::StopAt(5),
        );

        assert_eq!(traj.len(), 15);
        assert_eq!(traj.points[0].route_index, 6);
        assert!(traj.speeds().all(|s| s == 0.0));
    }

    #[test]
    fn test_stop_beyond_horizon() {
        let route = straight_route(100, 5.0, 13.0);
        let traj = builder(20).build(
            &route,
            0,
            PlannerState::Braking { decel_mss: 0.5 },
            StopSignal::StopAt(50),
        );

        assert_eq!(traj.len(), 20);

        // 250 m from the stop the curve is above the cruise speed
        assert_eq!(traj.points[0].speed_ms, 13.0);

        // Point 19 is 155 m from the stop: sqrt(2 * 0.5 * 150)
        assert!((traj.points[19].speed_ms - 150f64.sqrt()).abs() < 1e-9);
    }

    #[test]
    fn test_braking_with_stale_clear_signal_cruises() {
        let route = straight_route(10, 5.0, 10.0);
        let traj = builder(10).build(
            &route,
            0,
            PlannerState::Braking { decel_mss: 2.0 },
            StopSignal::Clear,
        );
        assert!(traj.speeds().all(|s| s == 10.0));
    }

    #[test]
    fn test_lane_msg() {
        let route = straight_route(10, 5.0, 10.0);
        let traj = builder(3).build(&route, 8, PlannerState::Cruise, StopSignal::Clear);
        let msg = traj.to_lane_msg("world");

        assert_eq!(msg.header.frame_id, "world");
        assert_eq!(msg.waypoints.len(), 3);
        assert_eq!(msg.waypoints[2].position_m, [5.0, 0.0, 0.0]);
        assert_eq!(msg.waypoints[2].speed_ms, 10.0);
    }
}
