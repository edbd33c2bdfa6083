//! # Input Client
//!
//! The InputClient subscribes to the updater's input channels (pose, velocity, route, stop
//! signal and obstacle) and writes each received message into the [`DataStore`]. Publishers
//! send as frequently as they like, each message simply replaces the previous value of its
//! channel.
//!
//! A `Shutdown` message raises the stop flag shared with the control loop.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use std::{
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc,
    },
    thread::{self, JoinHandle},
};

use comms_if::{
    msg::InputMsg,
    net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions},
};
use log::{error, info, trace, warn};

use crate::data_store::{Applied, DataStore};

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

pub struct InputClient {
    bg_jh: Option<JoinHandle<()>>,
    bg_run: Arc<AtomicBool>,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum InputClientError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl InputClient {
    /// Create a new instance of the InputClient.
    ///
    /// This function will not block until a publisher connects, the control loop idles until the
    /// first inputs arrive.
    pub fn new(
        ctx: &zmq::Context,
        params: &NetParams,
        data_store: DataStore,
        stop: Arc<AtomicBool>,
    ) -> Result<Self, InputClientError> {
        // TODO: Move these into a parameter file
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            connect_timeout: 1000,
            linger: 1,
            recv_timeout: 10,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(ctx, zmq::SUB, socket_options, &params.input_endpoint)
            .map_err(InputClientError::SocketError)?;

        let bg_run = Arc::new(AtomicBool::new(true));
        let bg_run_clone = bg_run.clone();

        let bg_jh = Some(thread::spawn(move || {
            bg_thread(socket, bg_run_clone, data_store, stop)
        }));

        Ok(Self { bg_jh, bg_run })
    }
}

impl Drop for InputClient {
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

/// Apply a single input to the data store, raising `stop` if a shutdown was requested.
///
/// Invalid inputs are logged and dropped.
pub fn handle_input(msg: &InputMsg, data_store: &DataStore, stop: &AtomicBool) {
    trace!("Input on {}", msg.channel_name());

    match data_store.apply(msg) {
        Ok(Applied::Stored) => (),
        Ok(Applied::ShutdownRequested) => {
            info!("Shutdown requested");
            stop.store(true, Ordering::Relaxed);
        }
        Err(e) => warn!("Rejected {} input: {}", msg.channel_name(), e),
    }
}

/// Background thread, updates the data store when a publisher sends something new.
fn bg_thread(
    socket: MonitoredSocket,
    run: Arc<AtomicBool>,
    data_store: DataStore,
    stop: Arc<AtomicBool>,
) {
    while run.load(Ordering::Relaxed) {
        let msg_str = match socket.recv_string(0) {
            Ok(Ok(s)) => s,
            Ok(Err(_)) => {
                warn!("Non UTF-8 message on the input subscription");
                continue;
            }
            Err(zmq::Error::EAGAIN) => continue,
            Err(e) => {
                error!("Error receiving input message: {:?}", e);
                break;
            }
        };

        match InputMsg::from_json(&msg_str) {
            Ok(msg) => handle_input(&msg, &data_store, &stop),
            Err(e) => warn!("Could not parse input message: {}", e),
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn test_shutdown_raises_stop() {
        let ds = DataStore::default();
        let stop = AtomicBool::new(false);

        handle_input(
            &InputMsg::Velocity(comms_if::msg::VelocityMsg { linear_x_ms: 1.0 }),
            &ds,
            &stop,
        );
        assert!(!stop.load(Ordering::Relaxed));

        handle_input(&InputMsg::Shutdown, &ds, &stop);
        assert!(stop.load(Ordering::Relaxed));
        assert_eq!(ds.velocity_ms.get(), Some(1.0));
    }
}
