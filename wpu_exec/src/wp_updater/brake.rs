//! # Brake planner
//!
//! A two state machine which decides whether the vehicle cruises along the route or performs a
//! controlled stop at the stop index.
//!
//! On entering `Braking` the deceleration which brings the vehicle to rest exactly at the stop
//! point is computed and then held constant until the stop signal clears. It is deliberately not
//! recomputed as the vehicle approaches the stop, doing so would reshape the speed profile
//! every cycle.
//!
//! A stop is only attempted if the distance to the stop point is greater than the distance
//! needed to stop at the configured deceleration limit. If there is not enough room the planner
//! stays in `Cruise` and does not attempt an emergency stop.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use log::{info, warn};
use serde::Serialize;

use super::RouteIndex;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The brake planner state machine.
#[derive(Debug, Clone)]
pub struct BrakePlanner {
    state: PlannerState,

    decel_limit_mss: f64,
}

/// Quantities computed while evaluating a stop.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Default)]
pub struct StopEvaluation {
    /// Path length from the tracking index to the stop index.
    pub stop_dist_m: f64,

    /// Minimum distance needed to stop at the deceleration limit.
    pub min_stop_dist_m: f64,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

/// The latest stop signal from perception.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StopSignal {
    /// No stop required.
    Clear,

    /// Stop at the given route index.
    StopAt(usize),
}

/// State of the brake planner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum PlannerState {
    /// Drive at the route's cruise speeds.
    Cruise,

    /// Decelerate to a stop at the stop index.
    Braking {
        /// Deceleration magnitude fixed when braking started.
        decel_mss: f64,
    },
}

/// What happened during one evaluation of the planner.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub enum BrakeEvent {
    /// The state did not change.
    None,

    /// Braking started.
    BrakingStarted(StopEvaluation),

    /// A stop was requested but there is not enough room to stop within the deceleration limit.
    StopInfeasible(StopEvaluation),

    /// The stop signal cleared and the vehicle returns to cruise.
    BrakingCleared,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for StopSignal {
    fn default() -> Self {
        StopSignal::Clear
    }
}

impl From<Option<usize>> for StopSignal {
    fn from(index: Option<usize>) -> Self {
        match index {
            Some(i) => StopSignal::StopAt(i),
            None => StopSignal::Clear,
        }
    }
}

impl Default for PlannerState {
    fn default() -> Self {
        PlannerState::Cruise
    }
}

impl BrakePlanner {
    /// Create a new planner in the `Cruise` state.
    ///
    /// Only the magnitude of `decel_limit_mss` is used. The limit must already have been
    /// validated as non-zero.
    pub fn new(decel_limit_mss: f64) -> Self {
        Self {
            state: PlannerState::Cruise,
            decel_limit_mss: decel_limit_mss.abs(),
        }
    }

    /// Get the current state.
    pub fn state(&self) -> PlannerState {
        self.state
    }

    /// Evaluate the state transitions for this cycle.
    ///
    /// # Inputs
    /// - `route`: the route being followed.
    /// - `tracking_index`: the first waypoint ahead of the vehicle.
    /// - `stop`: the latest stop signal.
    /// - `velocity_ms`: the latest forward velocity of the vehicle.
    pub fn update(
        &mut self,
        route: &RouteIndex,
        tracking_index: usize,
        stop: StopSignal,
        velocity_ms: f64,
    ) -> BrakeEvent {
        match (self.state, stop) {
            (PlannerState::Cruise, StopSignal::Clear) => BrakeEvent::None,

            (PlannerState::Cruise, StopSignal::StopAt(stop_index)) => {
                let eval = StopEvaluation {
                    stop_dist_m: route.path_length(tracking_index, stop_index),
                    min_stop_dist_m: velocity_ms.powi(2) / (2.0 * self.decel_limit_mss),
                };

                if eval.stop_dist_m > eval.min_stop_dist_m {
                    let decel_mss = velocity_ms.powi(2) / (2.0 * eval.stop_dist_m);
                    self.state = PlannerState::Braking { decel_mss };

                    info!(
                        "Braking for stop at waypoint {} ({:.1} m away), deceleration {:.3} m/s^2",
                        stop_index, eval.stop_dist_m, decel_mss
                    );

                    BrakeEvent::BrakingStarted(eval)
                } else {
                    warn!(
                        "Too late to brake for stop at waypoint {}: {:.1} m away, {:.1} m needed",
                        stop_index, eval.stop_dist_m, eval.min_stop_dist_m
                    );

                    BrakeEvent::StopInfeasible(eval)
                }
            }

            (PlannerState::Braking { .. }, StopSignal::Clear) => {
                self.state = PlannerState::Cruise;

                info!("Stop signal cleared, returning to cruise");

                BrakeEvent::BrakingCleared
            }

            (PlannerState::Braking { .. }, StopSignal::StopAt(_)) => BrakeEvent::None,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::wp_updater::route::test::straight_route;

    #[test]
    fn test_cruise_without_stop() {
        let route = straight_route(10, 5.0, 10.0);
        let mut planner = BrakePlanner::new(-5.0);

        assert_eq!(planner.update(&route, 0, StopSignal::Clear, 10.0), BrakeEvent::None);
        assert_eq!(planner.state(), PlannerState::Cruise);
    }

    #[test]
    fn test_start_braking() {
        let route = straight_route(10, 5.0, 10.0);
        let mut planner = BrakePlanner::new(-5.0);

        // 25 m to the stop, 10 m needed at 5 m/s^2
        let event = planner.update(&route, 0, StopSignal::StopAt(5), 10.0);
        assert_eq!(
            event,
            BrakeEvent::BrakingStarted(StopEvaluation {
                stop_dist_m: 25.0,
                min_stop_dist_m: 10.0
            })
        );
        assert_eq!(planner.state(), PlannerState::Braking { decel_mss: 2.0 });
    }

    #[test]
    fn test_stop_infeasible() {
        let route = straight_route(10, 5.0, 10.0);
        let mut planner = BrakePlanner::new(5.0);

        // 5 m to the stop, 10 m needed
        let event = planner.update(&route, 4, StopSignal::StopAt(5), 10.0);
        assert!(matches!(event, BrakeEvent::StopInfeasible(_)));
        assert_eq!(planner.state(), PlannerState::Cruise);

        // Exactly the minimum distance is not enough either
        let event = planner.update(&route, 3, StopSignal::StopAt(5), 10.0);
        assert!(matches!(event, BrakeEvent::StopInfeasible(_)));
        assert_eq!(planner.state(), PlannerState::Cruise);
    }

    #[test]
    fn test_decel_held_while_braking() {
        let route = straight_route(10, 5.0, 10.0);
        let mut planner = BrakePlanner::new(-5.0);

        planner.update(&route, 0, StopSignal::StopAt(5), 10.0);

        // Closer to the stop and slower, the deceleration is not recomputed
        for (tracking, vel) in [(1, 8.0), (2, 6.0), (4, 1.0)].iter() {
            assert_eq!(
                planner.update(&route, *tracking, StopSignal::StopAt(5), *vel),
                BrakeEvent::None
            );
            assert_eq!(planner.state(), PlannerState::Braking { decel_mss: 2.0 });
        }
    }

    #[test]
    fn test_clear_returns_to_cruise() {
        let route = straight_route(10, 5.0, 10.0);
        let mut planner = BrakePlanner::new(-5.0);

        planner.update(&route, 0, StopSignal::StopAt(5), 10.0);
        assert_eq!(
            planner.update(&route, 1, StopSignal::Clear, 8.0),
            BrakeEvent::BrakingCleared
        );
        assert_eq!(planner.state(), PlannerState::Cruise);
    }

    #[test]
    fn test_stationary_vehicle_brakes_gently() {
        let route = straight_route(10, 5.0, 10.0);
        let mut planner = BrakePlanner::new(-5.0);

        // A stopped vehicle needs no distance to stop, so it holds with zero deceleration
        planner.update(&route, 0, StopSignal::StopAt(5), 0.0);
        assert_eq!(planner.state(), PlannerState::Braking { decel_mss: 0.0 });
    }

    #[test]
    fn test_stop_signal_from_option() {
        assert_eq!(StopSignal::from(None), StopSignal::Clear);
        assert_eq!(StopSignal::from(Some(3)), StopSignal::StopAt(3));
    }
}
