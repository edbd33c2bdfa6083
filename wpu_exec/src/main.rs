//! Main waypoint updater executable entry point.
//!
//! # Architecture
//!
//! The general execution methodology consists of:
//!
//!     - Initialise the session, logging and parameters
//!     - Start an input source:
//!         - Remote: inputs are received over the network by the InputClient
//!         - Script: inputs are replayed from a script by the ScriptPlayer
//!     - Main loop (fixed rate):
//!         - Snapshot the latest inputs
//!         - Project the vehicle onto the route
//!         - Update the braking decision
//!         - Build the speed profile over the lookahead
//!         - Publish the final waypoints
//!
//! Pass no arguments to receive inputs over the network, or the path to an input script to replay
//! it instead.

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use color_eyre::{
    eyre::{eyre, WrapErr},
    Report,
};
use log::{debug, info, warn};
use std::env;
use std::sync::{atomic::AtomicBool, Arc};

// Internal
use comms_if::net::NetParams;
use util::{
    logger::{logger_init, LevelFilter},
    module::State,
    session::Session,
};
use wpu_lib::{
    data_store::DataStore,
    exec::Executor,
    final_wp_server::FinalWpServer,
    input_client::InputClient,
    script_player::ScriptPlayer,
    wp_updater::WpUpdater,
};

// ---------------------------------------------------------------------------
// ENUMERATIONS
// ---------------------------------------------------------------------------

/// Where the updater's inputs come from. Kept alive for the duration of the main loop.
enum InputSource {
    Remote(InputClient),
    Script(ScriptPlayer),
}

// ---------------------------------------------------------------------------
// FUNCTIONS
// ---------------------------------------------------------------------------

/// Executable main function, entry point.
fn main() -> Result<(), Report> {
    color_eyre::install()?;

    // ---- EARLY INITIALISATION ----

    // Initialise session
    let session = Session::new("wpu_exec", "sessions").wrap_err("Failed to create the session")?;

    // Initialise logger
    logger_init(LevelFilter::Debug, &session).wrap_err("Failed to initialise logging")?;

    info!("Waypoint Updater Executable\n");
    info!("Session directory: {:?}\n", session.session_root);

    // ---- LOAD PARAMETERS ----

    let net_params: NetParams =
        util::params::load("net.toml").wrap_err("Could not load net params")?;

    let mut wp_updater = WpUpdater::default();
    wp_updater
        .init("wp_updater.toml", &session)
        .wrap_err("Failed to initialise the WpUpdater")?;

    session
        .save_json("wp_updater_params.json", wp_updater.params())
        .wrap_err("Could not record the parameters in the session")?;

    info!("Parameters loaded: {:?}", wp_updater.params());

    // ---- INITIALISE INPUT SOURCE ----

    let data_store = DataStore::default();
    let stop = Arc::new(AtomicBool::new(false));

    let zmq_ctx = comms_if::net::zmq::Context::new();

    let args: Vec<String> = env::args().collect();

    debug!("CLI arguments: {:?}", args);

    let _input_source = match args.len() {
        2 => {
            info!("Loading script from \"{}\"", &args[1]);
            InputSource::Script(
                ScriptPlayer::new(&args[1], data_store.clone(), stop.clone())
                    .wrap_err("Failed to load the input script")?,
            )
        }
        1 => {
            info!("No script provided, inputs will be received by the InputClient");
            InputSource::Remote(
                InputClient::new(&zmq_ctx, &net_params, data_store.clone(), stop.clone())
                    .wrap_err("Failed to initialise the InputClient")?,
            )
        }
        n => {
            return Err(eyre!(
                "Expected either zero or one argument, found {}",
                n - 1
            ))
        }
    };

    // ---- INITIALISE OUTPUT ----

    let mut final_wp_server = FinalWpServer::new(&zmq_ctx, &net_params, &wp_updater.params().frame_id)
        .wrap_err("Failed to initialise the FinalWpServer")?;
    info!("FinalWpServer initialised");

    // ---- MAIN LOOP ----

    let mut executor = Executor::new(wp_updater, data_store);

    executor.run(&stop, |output| {
        debug!(
            "Tracking {}, {:?}, first speed {:?}",
            output.report.projection.tracking_index,
            output.report.state,
            output.trajectory.speeds().next()
        );

        if let Err(e) = final_wp_server.send(&output.trajectory) {
            warn!("Could not publish final waypoints: {}", e);
        }
    });

    info!(
        "End of execution, {} cycles run ({} consecutive overruns at exit)",
        executor.num_cycles, executor.num_consec_cycle_overruns
    );

    Ok(())
}
