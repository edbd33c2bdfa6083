//! # Final Waypoints Server
//!
//! Publishes the trajectory produced each cycle to the downstream controller.

// ------------------------------------------------------------------------------------------------
// IMPORTS
// ------------------------------------------------------------------------------------------------

use comms_if::net::{zmq, MonitoredSocket, MonitoredSocketError, NetParams, SocketOptions};

use crate::wp_updater::Trajectory;

// ------------------------------------------------------------------------------------------------
// STRUCTS
// ------------------------------------------------------------------------------------------------

/// Final waypoints server
pub struct FinalWpServer {
    socket: MonitoredSocket,

    frame_id: String,
}

// ------------------------------------------------------------------------------------------------
// ENUMS
// ------------------------------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum FinalWpServerError {
    #[error("Socket error: {0}")]
    SocketError(MonitoredSocketError),

    #[error("Could not send the final waypoints: {0}")]
    SendError(zmq::Error),

    #[error("Could not serialize the final waypoints: {0}")]
    SerializationError(serde_json::Error),
}

// ------------------------------------------------------------------------------------------------
// IMPLS
// ------------------------------------------------------------------------------------------------

impl FinalWpServer {
    /// Create a new instance of the server.
    ///
    /// This function will not block until a subscriber connects.
    pub fn new(
        ctx: &zmq::Context,
        params: &NetParams,
        frame_id: &str,
    ) -> Result<Self, FinalWpServerError> {
        // TODO: Move these into a parameter file
        let socket_options = SocketOptions {
            block_on_first_connect: false,
            bind: true,
            linger: 1,
            send_timeout: 10,
            send_hwm: 1,
            conflate: true,
            ..Default::default()
        };

        let socket = MonitoredSocket::new(
            ctx,
            zmq::PUB,
            socket_options,
            &params.final_wp_endpoint,
        )
        .map_err(FinalWpServerError::SocketError)?;

        Ok(Self {
            socket,
            frame_id: frame_id.to_string(),
        })
    }

    /// Publish a trajectory, stamped with the current time.
    pub fn send(&mut self, trajectory: &Trajectory) -> Result<(), FinalWpServerError> {
        let msg_string = trajectory
            .to_lane_msg(&self.frame_id)
            .to_json()
            .map_err(FinalWpServerError::SerializationError)?;

        self.socket
            .send(&msg_string, 0)
            .map_err(FinalWpServerError::SendError)
    }
}
