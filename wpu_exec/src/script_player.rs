//! # Script Player
//!
//! Replays an input script into the [`DataStore`] on a background thread, standing in for live
//! publishers. Once every input has been delivered the stop flag is raised so the control loop
//! ends with the script.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    path::Path,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
    time::{Duration, Instant},
};

use comms_if::msg::InputMsg;
use log::info;
use util::script_interpreter::{PendingInputs, ScriptError, ScriptInterpreter};

use crate::{
    data_store::DataStore,
    input_client::handle_input,
    wp_updater::{RouteError, RouteIndex},
};

// ------------------------------------------------------------------------------------------------
// CONSTANTS
// ------------------------------------------------------------------------------------------------

/// How often the player checks for due inputs.
const POLL_PERIOD: Duration = Duration::from_millis(10);

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct ScriptPlayer {
    bg_jh: Option<JoinHandle<()>>,
    bg_run: Arc<AtomicBool>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum ScriptPlayerError {
    #[error("Could not load the script: {0}")]
    ScriptError(#[from] ScriptError),

    #[error("The route at {0} s in the script is invalid: {1}")]
    InvalidRoute(f64, RouteError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl ScriptPlayer {
    /// Load the script at the given path and start replaying it.
    pub fn new<P: AsRef<Path>>(
        script_path: P,
        data_store: DataStore,
        stop: Arc<AtomicBool>,
    ) -> Result<Self, ScriptPlayerError> {
        let interp = ScriptInterpreter::new(script_path)?;
        Self::from_interpreter(interp, data_store, stop)
    }

    /// Start replaying an already loaded script.
    ///
    /// Every route in the script is checked before anything is replayed.
    pub fn from_interpreter(
        interp: ScriptInterpreter,
        data_store: DataStore,
        stop: Arc<AtomicBool>,
    ) -> Result<Self, ScriptPlayerError> {
        validate_routes(&interp)?;

        info!(
            "Loaded script with {} inputs lasting {:.2} s",
            interp.get_num_inputs(),
            interp.get_duration()
        );

        let bg_run = Arc::new(AtomicBool::new(true));
        let bg_run_clone = bg_run.clone();

        let bg_jh = Some(thread::spawn(move || {
            bg_thread(interp, bg_run_clone, data_store, stop)
        }));

        Ok(Self { bg_jh, bg_run })
    }
}

impl Drop for ScriptPlayer {
    fn drop(&mut self) {
        self.bg_run.store(false, Ordering::Relaxed);

        if let Some(jh) = self.bg_jh.take() {
            jh.join().ok();
        }
    }
}

// ------------------------------------------------------------------------------------------------
// FUNCTIONS
// ------------------------------------------------------------------------------------------------

fn validate_routes(interp: &ScriptInterpreter) -> Result<(), ScriptPlayerError> {
    for input in interp.inputs() {
        if let InputMsg::Route(ref lane) = input.msg {
            RouteIndex::from_lane(lane)
                .map_err(|e| ScriptPlayerError::InvalidRoute(input.exec_time_s, e))?;
        }
    }

    Ok(())
}

fn bg_thread(
    mut interp: ScriptInterpreter,
    run: Arc<AtomicBool>,
    data_store: DataStore,
    stop: Arc<AtomicBool>,
) {
    let start = Instant::now();

    while run.load(Ordering::Relaxed) {
        match interp.get_pending(start.elapsed().as_secs_f64()) {
            PendingInputs::None => (),
            PendingInputs::Some(msgs) => {
                for msg in msgs.iter() {
                    handle_input(msg, &data_store, &stop);
                }
            }
            PendingInputs::EndOfScript => {
                info!("End of script reached");
                stop.store(true, Ordering::Relaxed);
                break;
            }
        }

        thread::sleep(POLL_PERIOD);
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_empty_route_is_fatal() {
        let interp = ScriptInterpreter::from_str(
            r#"0.0: {"Route": {"header": {"stamp": "2021-03-01T12:00:00Z", "frame_id": "world"}, "waypoints": []}};"#,
        )
        .unwrap();

        let res = ScriptPlayer::from_interpreter(
            interp,
            DataStore::default(),
            Arc::new(AtomicBool::new(false)),
        );

        assert!(matches!(
            res,
            Err(ScriptPlayerError::InvalidRoute(_, RouteError::EmptyRoute))
        ));
    }

    #[test]
    fn test_replay_to_end() {
        let interp = ScriptInterpreter::from_str(
            "0.0: {\"Velocity\": {\"linear_x_ms\": 3.0}};\n\
             0.05: {\"StopSignal\": {\"index\": 7}};",
        )
        .unwrap();

        let ds = DataStore::default();
        let stop = Arc::new(AtomicBool::new(false));
        let _player = ScriptPlayer::from_interpreter(interp, ds.clone(), stop.clone()).unwrap();

        let deadline = Instant::now() + Duration::from_secs(5);
        while !stop.load(Ordering::Relaxed) && Instant::now() < deadline {
            thread::sleep(Duration::from_millis(5));
        }

        assert!(stop.load(Ordering::Relaxed));
        assert_eq!(ds.velocity_ms.get(), Some(3.0));
        assert_eq!(
            ds.stop_signal.get(),
            Some(crate::wp_updater::StopSignal::StopAt(7))
        );
    }
}
