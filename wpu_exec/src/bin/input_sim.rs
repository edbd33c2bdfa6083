//! # Input Simulator
//!
//! Publishes a circular route and a vehicle driving around it, so the waypoint updater can be run
//! without the rest of the vehicle stack. Every so often a stop signal is raised a little way
//! ahead of the vehicle, which slows down to stop before it, and later cleared again.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::f64::consts::{FRAC_PI_2, PI};
use std::thread;
use std::time::{Duration, Instant};

use color_eyre::{eyre::WrapErr, Result};
use comms_if::{
    msg::{
        Header, InputMsg, LaneMsg, Orientation, PoseMsg, StopSignalMsg, VelocityMsg, WaypointMsg,
    },
    net::{zmq, MonitoredSocket, NetParams, SocketOptions},
};
use log::{info, warn};
use util::{
    logger::{logger_init, LevelFilter},
    session::Session,
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

const PERIOD_S: f64 = 0.05;

const NUM_WAYPOINTS: usize = 300;

const RADIUS_M: f64 = 150.0;

const CRUISE_SPEED_MS: f64 = 11.0;

const ACCEL_MSS: f64 = 1.5;

const DECEL_MSS: f64 = 3.0;

/// Time between toggles of the stop signal
const STOP_TOGGLE_PERIOD_S: f64 = 20.0;

/// Number of waypoints ahead of the vehicle a new stop signal is placed at
const STOP_AHEAD_WPS: usize = 40;

/// Standoff from the stop waypoint the simulated vehicle brakes to
const STOP_STANDOFF_M: f64 = 5.0;

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn main() -> Result<()> {
    color_eyre::install()?;

    let session = Session::new("input_sim", "sessions").wrap_err("Failed to create the session")?;
    logger_init(LevelFilter::Info, &session).wrap_err("Failed to initialise logging")?;

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    let ctx = zmq::Context::new();
    let socket = MonitoredSocket::new(
        &ctx,
        zmq::PUB,
        SocketOptions {
            bind: true,
            block_on_first_connect: false,
            linger: 1,
            send_timeout: 10,
            ..Default::default()
        },
        &net_params.input_sim_endpoint,
    )
    .wrap_err("Failed to create the input publisher")?;

    info!(
        "Publishing inputs on {} ({} waypoints, radius {} m)",
        net_params.input_sim_endpoint, NUM_WAYPOINTS, RADIUS_M
    );

    let route = circular_route();
    let wp_sep_m = 2.0 * PI * RADIUS_M / NUM_WAYPOINTS as f64;

    let start = Instant::now();
    let mut last_route_s = f64::NEG_INFINITY;
    let mut last_toggle_s = 0.0;

    // Arc length along the circle and current speed
    let mut s_m = 0.0;
    let mut speed_ms = 0.0;
    let mut stop_index: Option<usize> = None;

    loop {
        let t_s = start.elapsed().as_secs_f64();

        // Republish the route every second so late subscribers pick it up
        if t_s - last_route_s >= 1.0 {
            publish(&socket, &InputMsg::Route(route.clone()));
            last_route_s = t_s;
        }

        let current_wp = (s_m / wp_sep_m) as usize % NUM_WAYPOINTS;

        if t_s - last_toggle_s >= STOP_TOGGLE_PERIOD_S {
            stop_index = match stop_index {
                Some(_) => None,
                None => Some((current_wp + STOP_AHEAD_WPS) % NUM_WAYPOINTS),
            };
            info!("Stop signal now {:?}", stop_index);
            last_toggle_s = t_s;
        }

        // Simple longitudinal model, brake towards the stop line, otherwise cruise
        let target_ms = match stop_index {
            Some(i) => {
                let wps_ahead = (i + NUM_WAYPOINTS - current_wp) % NUM_WAYPOINTS;
                let dist_m = wps_ahead as f64 * wp_sep_m - STOP_STANDOFF_M;
                (2.0 * DECEL_MSS * dist_m.max(0.0)).sqrt().min(CRUISE_SPEED_MS)
            }
            None => CRUISE_SPEED_MS,
        };
        speed_ms = if target_ms < speed_ms {
            (speed_ms - DECEL_MSS * PERIOD_S).max(target_ms)
        } else {
            (speed_ms + ACCEL_MSS * PERIOD_S).min(target_ms)
        };
        s_m = (s_m + speed_ms * PERIOD_S) % (2.0 * PI * RADIUS_M);

        let theta = s_m / RADIUS_M;
        publish(
            &socket,
            &InputMsg::Pose(PoseMsg {
                position_m: [RADIUS_M * theta.cos(), RADIUS_M * theta.sin(), 0.0],
                orientation: Orientation::Yaw(theta + FRAC_PI_2),
            }),
        );
        publish(
            &socket,
            &InputMsg::Velocity(VelocityMsg {
                linear_x_ms: speed_ms,
            }),
        );
        publish(
            &socket,
            &InputMsg::StopSignal(StopSignalMsg {
                index: stop_index.map(|i| i as i32).unwrap_or(StopSignalMsg::NONE),
            }),
        );

        thread::sleep(Duration::from_secs_f64(PERIOD_S));
    }
}

/// Counter-clockwise circle centred on the origin.
fn circular_route() -> LaneMsg {
    let waypoints = (0..NUM_WAYPOINTS)
        .map(|i| {
            let theta = 2.0 * PI * (i as f64) / (NUM_WAYPOINTS as f64);
            WaypointMsg {
                position_m: [RADIUS_M * theta.cos(), RADIUS_M * theta.sin(), 0.0],
                orientation: Orientation::Yaw(theta + FRAC_PI_2),
                speed_ms: CRUISE_SPEED_MS,
            }
        })
        .collect();

    LaneMsg {
        header: Header::now("world"),
        waypoints,
    }
}

fn publish(socket: &MonitoredSocket, msg: &InputMsg) {
    let res = msg
        .to_json()
        .map_err(|e| format!("{}", e))
        .and_then(|s| socket.send(&s, 0).map_err(|e| format!("{}", e)));

    if let Err(e) = res {
        warn!("Could not publish {} input: {}", msg.channel_name(), e);
    }
}
