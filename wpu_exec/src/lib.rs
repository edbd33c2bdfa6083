//! # Waypoint updater library.
//!
//! This library allows the executables in this crate (and benchmarks) to access the updater's
//! modules.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Data store - latest value of every input channel
pub mod data_store;

/// Control loop executor - runs the waypoint updater at a fixed rate
pub mod exec;

/// Final waypoints server - publishes the planned trajectory
pub mod final_wp_server;

/// Input client - receives inputs from the network
pub mod input_client;

/// Localisation types - the vehicle's pose
pub mod loc;

/// Script player - replays inputs from a script
pub mod script_player;

/// Waypoint updater - projects the vehicle onto the route and plans the speed profile
pub mod wp_updater;
