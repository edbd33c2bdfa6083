//! Waypoint updater module state

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::Arc;

use log::warn;
use serde::Serialize;

// Internal
use super::*;
use crate::loc::Pose;
use util::{module::State, params, session::Session};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

pub struct WpUpdater {
    params: Params,

    projector: PoseProjector,
    planner: BrakePlanner,
    profile_builder: SpeedProfileBuilder,

    /// Last out of range stop index which was warned about, so the warning isn't repeated every
    /// cycle.
    rejected_stop_index: Option<usize>,
}

/// Input data to the module, a snapshot of the latest inputs.
#[derive(Debug, Clone)]
pub struct InputData {
    pub route: Arc<RouteIndex>,

    pub pose: Pose,

    /// Forward velocity of the vehicle
    pub velocity_ms: f64,

    pub stop: StopSignal,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct OutputData {
    pub trajectory: Trajectory,
}

/// The status report containing the planner's decisions this cycle.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct StatusReport {
    /// The projection of the vehicle onto the route
    pub projection: Projection,

    /// State of the brake planner after evaluation
    pub state: PlannerState,

    /// Transition which occured this cycle
    pub event: BrakeEvent,

    /// The stop signal used this cycle
    pub stop: StopSignal,
}

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Potential errors that could occur during initialisation of the module.
#[derive(Debug, thiserror::Error)]
pub enum InitError {
    #[error("Could not load the parameters: {0}")]
    ParamLoadError(params::LoadError),

    #[error("The parameters are invalid: {0}")]
    InvalidParams(ParamsError),
}

/// Potential errors that can occur during processing of the module.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ProcError {
    #[error("The vehicle velocity is not finite ({0})")]
    InvalidVelocity(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for WpUpdater {
    fn default() -> Self {
        Self::from_valid_params(Params::default())
    }
}

impl State for WpUpdater {
    type InitData = &'static str;
    type InitError = InitError;

    type InputData = InputData;
    type OutputData = OutputData;
    type StatusReport = StatusReport;
    type ProcError = ProcError;

    /// Initialise the WpUpdater module.
    ///
    /// Expected init data is a path to the parameter file, relative to the params directory.
    fn init(&mut self, init_data: Self::InitData, _session: &Session) -> Result<(), Self::InitError> {
        let params: Params = params::load(init_data).map_err(InitError::ParamLoadError)?;

        *self = Self::new(params)?;

        Ok(())
    }

    /// Process one cycle of the updater.
    fn proc(
        &mut self,
        input_data: &Self::InputData,
    ) -> Result<(Self::OutputData, Self::StatusReport), Self::ProcError> {
        if !input_data.velocity_ms.is_finite() {
            return Err(ProcError::InvalidVelocity(input_data.velocity_ms));
        }

        let route = input_data.route.as_ref();
        let stop = self.check_stop_signal(route, input_data.stop);

        let projection = self.projector.project(route, &input_data.pose);

        let event = self.planner.update(
            route,
            projection.tracking_index,
            stop,
            input_data.velocity_ms,
        );
        let state = self.planner.state();

        let trajectory =
            self.profile_builder
                .build(route, projection.tracking_index, state, stop);

        Ok((
            OutputData { trajectory },
            StatusReport {
                projection,
                state,
                event,
                stop,
            },
        ))
    }
}

impl WpUpdater {
    /// Create a new updater from the given parameters, which are validated first.
    pub fn new(params: Params) -> Result<Self, InitError> {
        params.validate().map_err(InitError::InvalidParams)?;

        Ok(Self::from_valid_params(params))
    }

    fn from_valid_params(params: Params) -> Self {
        Self {
            projector: PoseProjector::new(params.behind_angle_rad),
            planner: BrakePlanner::new(params.decel_limit_mss),
            profile_builder: SpeedProfileBuilder::new(&params),
            params,
            rejected_stop_index: None,
        }
    }

    pub fn params(&self) -> &Params {
        &self.params
    }

    /// Current state of the brake planner.
    pub fn planner_state(&self) -> PlannerState {
        self.planner.state()
    }

    /// Ignore stop indexes which don't refer to a waypoint on the route.
    fn check_stop_signal(&mut self, route: &RouteIndex, stop: StopSignal) -> StopSignal {
        match stop {
            StopSignal::StopAt(index) if index >= route.len() => {
                if self.rejected_stop_index != Some(index) {
                    warn!(
                        "Ignoring stop index {} which is outside the route ({} waypoints)",
                        index,
                        route.len()
                    );
                    self.rejected_stop_index = Some(index);
                }
                StopSignal::Clear
            }
            s => {
                self.rejected_stop_index = None;
                s
            }
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::wp_updater::route::test::straight_route;

    fn input(tracking_x_m: f64, velocity_ms: f64, stop: StopSignal) -> InputData {
        InputData {
            route: Arc::new(straight_route(10, 5.0, 10.0)),
            pose: Pose::from_xy_yaw(tracking_x_m, 0.0, 0.0),
            velocity_ms,
            stop,
        }
    }

    #[test]
    fn test_invalid_params() {
        let res = WpUpdater::new(Params {
            decel_limit_mss: 0.0,
            ..Default::default()
        });
        assert!(matches!(
            res,
            Err(InitError::InvalidParams(ParamsError::InvalidDecelLimit(_)))
        ));
    }

    #[test]
    fn test_proc_cruise() {
        let mut wpu = WpUpdater::default();

        let (out, rpt) = wpu.proc(&input(-1.0, 10.0, StopSignal::Clear)).unwrap();
        assert_eq!(rpt.projection.tracking_index, 0);
        assert_eq!(rpt.state, PlannerState::Cruise);
        assert_eq!(out.trajectory.len(), 200);
        assert!(out.trajectory.speeds().all(|s| s == 10.0));
    }

    #[test]
    fn test_proc_braking() {
        let mut wpu = WpUpdater::default();

        let (out, rpt) = wpu.proc(&input(-1.0, 10.0, StopSignal::StopAt(5))).unwrap();
        assert!(matches!(rpt.event, BrakeEvent::BrakingStarted(_)));
        assert_eq!(rpt.state, PlannerState::Braking { decel_mss: 2.0 });
        assert!(out.trajectory.points[5..].iter().all(|p| p.speed_ms == 0.0));
        assert!(out.trajectory.points[0].speed_ms > 0.0);
    }

    #[test]
    fn test_out_of_range_stop_ignored() {
        let mut wpu = WpUpdater::default();

        let (out, rpt) = wpu.proc(&input(-1.0, 10.0, StopSignal::StopAt(10))).unwrap();
        assert_eq!(rpt.stop, StopSignal::Clear);
        assert_eq!(rpt.state, PlannerState::Cruise);
        assert!(out.trajectory.speeds().all(|s| s == 10.0));
    }

    #[test]
    fn test_invalid_velocity() {
        let mut wpu = WpUpdater::default();

        assert!(matches!(
            wpu.proc(&input(-1.0, std::f64::NAN, StopSignal::Clear)),
            Err(ProcError::InvalidVelocity(_))
        ));
    }
}
