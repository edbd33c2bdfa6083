//! # Control loop executor
//!
//! Runs the waypoint updater at a fixed rate. Each tick takes a snapshot of the latest inputs
//! and, once a route and a pose have both been received, runs the updater and emits the
//! resulting trajectory. Until then ticks produce nothing, there is no timeout on waiting for
//! the first inputs.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

use std::sync::atomic::{AtomicBool, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use log::{debug, info, warn};

use crate::{
    data_store::DataStore,
    wp_updater::{self, StatusReport, StopSignal, Trajectory, WpUpdater},
};
use util::module::State;

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// The control loop executor.
pub struct Executor {
    wp_updater: WpUpdater,

    data_store: DataStore,

    cycle_period: Duration,

    /// True while ticks are being skipped for missing inputs, so the wait is only logged once.
    waiting_for_inputs: bool,

    /// Number of cycles already executed
    pub num_cycles: u64,

    /// Number of consecutive cycle overruns
    pub num_consec_cycle_overruns: u64,
}

/// The result of a tick which produced output.
#[derive(Debug, Clone)]
pub struct TickOutput {
    pub trajectory: Trajectory,

    pub report: StatusReport,
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Executor {
    /// Create a new executor reading inputs from the given store.
    pub fn new(wp_updater: WpUpdater, data_store: DataStore) -> Self {
        let cycle_period = Duration::from_secs_f64(wp_updater.params().tick_period_s());

        Self {
            wp_updater,
            data_store,
            cycle_period,
            waiting_for_inputs: false,
            num_cycles: 0,
            num_consec_cycle_overruns: 0,
        }
    }

    /// Get the updater's parameters.
    pub fn params(&self) -> &wp_updater::Params {
        self.wp_updater.params()
    }

    /// Run a single tick.
    ///
    /// Returns `None` if the route or pose have not been received yet, or if processing failed.
    pub fn tick(&mut self) -> Option<TickOutput> {
        let snapshot = self.data_store.snapshot();

        let (route, pose) = match (snapshot.route, snapshot.pose) {
            (Some(r), Some(p)) => (r, p),
            (route, pose) => {
                if !self.waiting_for_inputs {
                    debug!(
                        "Waiting for inputs (route: {}, pose: {})",
                        route.is_some(),
                        pose.is_some()
                    );
                    self.waiting_for_inputs = true;
                }
                return None;
            }
        };

        if self.waiting_for_inputs {
            info!("Route and pose received, starting waypoint updates");
            self.waiting_for_inputs = false;
        }

        let input = wp_updater::InputData {
            route,
            pose,
            velocity_ms: snapshot.velocity_ms.unwrap_or(0.0),
            stop: snapshot.stop_signal.unwrap_or(StopSignal::Clear),
        };

        match self.wp_updater.proc(&input) {
            Ok((output, report)) => Some(TickOutput {
                trajectory: output.trajectory,
                report,
            }),
            Err(e) => {
                warn!("Error during WpUpdater processing: {}", e);
                None
            }
        }
    }

    /// Run the control loop until `stop` is raised.
    ///
    /// The stop flag is only checked between ticks, so a tick in progress always completes.
    /// Every tick which produces output passes it to `emit`.
    pub fn run<F>(&mut self, stop: &AtomicBool, mut emit: F)
    where
        F: FnMut(&TickOutput),
    {
        info!(
            "Begining control loop at {:.1} Hz",
            1.0 / self.cycle_period.as_secs_f64()
        );

        while !stop.load(Ordering::Relaxed) {
            let cycle_start_instant = Instant::now();

            if let Some(output) = self.tick() {
                emit(&output);
            }

            let cycle_dur = Instant::now() - cycle_start_instant;

            match self.cycle_period.checked_sub(cycle_dur) {
                Some(d) => {
                    self.num_consec_cycle_overruns = 0;
                    thread::sleep(d);
                }
                None => {
                    warn!(
                        "Cycle overran by {:.06} s",
                        cycle_dur.as_secs_f64() - self.cycle_period.as_secs_f64()
                    );
                    self.num_consec_cycle_overruns += 1;
                }
            }

            self.num_cycles += 1;
        }

        info!("Control loop stopped after {} cycles", self.num_cycles);
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::loc::Pose;
    use crate::wp_updater::{route::test::straight_route, Params, PlannerState};
    use comms_if::msg::{InputMsg, StopSignalMsg, VelocityMsg};

    fn executor(params: Params) -> (Executor, DataStore) {
        let ds = DataStore::default();
        let exec = Executor::new(WpUpdater::new(params).unwrap(), ds.clone());
        (exec, ds)
    }

    /// Ten waypoints 5 m apart, cruise speed 10 m/s, vehicle just before the first one.
    fn scenario_inputs(ds: &DataStore) {
        ds.set_route(straight_route(10, 5.0, 10.0));
        ds.pose.set(Pose::from_xy_yaw(-1.0, 0.0, 0.0));
    }

    #[test]
    fn test_cruise_scenario() {
        let (mut exec, ds) = executor(Params::default());
        scenario_inputs(&ds);
        ds.apply(&InputMsg::StopSignal(StopSignalMsg {
            index: StopSignalMsg::NONE,
        }))
        .unwrap();

        let out = exec.tick().unwrap();
        assert_eq!(out.report.projection.tracking_index, 0);
        assert_eq!(out.trajectory.len(), 200);
        for (k, p) in out.trajectory.points.iter().enumerate() {
            assert_eq!(p.route_index, k % 10);
            assert_eq!(p.speed_ms, 10.0);
        }
    }

    #[test]
    fn test_braking_scenario() {
        let (mut exec, ds) = executor(Params::default());
        scenario_inputs(&ds);
        ds.apply(&InputMsg::Velocity(VelocityMsg { linear_x_ms: 10.0 }))
            .unwrap();
        ds.apply(&InputMsg::StopSignal(StopSignalMsg { index: 5 }))
            .unwrap();

        let out = exec.tick().unwrap();

        // 25 m to the stop, 10 m needed at 5 m/s^2
        assert_eq!(out.report.state, PlannerState::Braking { decel_mss: 2.0 });

        let speeds: Vec<f64> = out.trajectory.speeds().collect();
        assert!(speeds[5..].iter().all(|s| *s == 0.0));
        for i in 1..5 {
            assert!(speeds[i] < speeds[i - 1]);
        }
        for (p, s) in out.trajectory.points.iter().zip(speeds.iter()) {
            assert!(*s >= 0.0 && *s <= p.waypoint.cruise_speed_ms);
        }
    }

    #[test]
    fn test_zero_decel_limit_rejected_before_loop() {
        assert!(WpUpdater::new(Params {
            decel_limit_mss: 0.0,
            ..Default::default()
        })
        .is_err());
    }

    #[test]
    fn test_clear_signal_returns_to_cruise() {
        let (mut exec, ds) = executor(Params::default());
        scenario_inputs(&ds);
        ds.velocity_ms.set(10.0);
        ds.stop_signal.set(StopSignal::StopAt(5));

        let out = exec.tick().unwrap();
        assert!(matches!(out.report.state, PlannerState::Braking { .. }));

        ds.stop_signal.set(StopSignal::Clear);
        let out = exec.tick().unwrap();
        assert_eq!(out.report.state, PlannerState::Cruise);
        assert!(out.trajectory.speeds().all(|s| s == 10.0));
    }

    #[test]
    fn test_no_output_until_inputs() {
        let (mut exec, ds) = executor(Params::default());

        for _ in 0..3 {
            assert!(exec.tick().is_none());
        }

        // Pose only
        ds.pose.set(Pose::from_xy_yaw(-1.0, 0.0, 0.0));
        assert!(exec.tick().is_none());

        ds.set_route(straight_route(10, 5.0, 10.0));
        assert!(exec.tick().is_some());

        // Route only
        let (mut exec, ds) = executor(Params::default());
        ds.set_route(straight_route(10, 5.0, 10.0));
        assert!(exec.tick().is_none());
    }

    #[test]
    fn test_missing_velocity_is_stationary() {
        let (mut exec, ds) = executor(Params::default());
        scenario_inputs(&ds);
        ds.stop_signal.set(StopSignal::StopAt(5));

        let out = exec.tick().unwrap();
        assert_eq!(out.report.state, PlannerState::Braking { decel_mss: 0.0 });
        assert!(out.trajectory.speeds().all(|s| s == 0.0));
    }

    #[test]
    fn test_run_stops_on_request() {
        let (mut exec, ds) = executor(Params {
            tick_rate_hz: 100.0,
            ..Default::default()
        });
        scenario_inputs(&ds);

        let stop = AtomicBool::new(false);
        let mut emitted = 0;
        exec.run(&stop, |out| {
            emitted += 1;
            assert_eq!(out.trajectory.len(), 200);
            if emitted == 5 {
                stop.store(true, Ordering::Relaxed);
            }
        });

        assert_eq!(emitted, 5);
        assert_eq!(exec.num_cycles, 5);
    }
}
