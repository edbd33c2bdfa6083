//! # Waypoint updater module
//!
//! The waypoint updater produces, every cycle, a short horizon of waypoints and target speeds
//! for the downstream controller to track. It follows a fixed circular route, and comes to a
//! controlled stop when perception reports a waypoint the vehicle must stop at (such as a red
//! traffic light's stop line).
//!
//! Processing each cycle is:
//!
//!  1. Project the vehicle pose onto the route to find the tracking index, the first waypoint
//!     ahead of the vehicle ([`PoseProjector`]).
//!  1. Decide between cruising and braking ([`BrakePlanner`]). Braking only begins if the stop
//!     point is further away than the minimum stopping distance at the deceleration limit.
//!  1. Build the horizon starting at the tracking index, either passing through the route's
//!     cruise speeds or applying a constant deceleration curve down to zero at the stop point
//!     ([`SpeedProfileBuilder`]).

// ---------------------------------------------------------------------------
// MODULES
// ---------------------------------------------------------------------------

pub mod brake;
pub mod params;
pub mod profile;
pub mod projector;
pub mod route;
pub mod state;

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// Internal
pub use brake::*;
pub use params::{Params, ParamsError};
pub use profile::*;
pub use projector::*;
pub use route::*;
pub use state::*;
