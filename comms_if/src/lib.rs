//! # Communications interface crate.
//!
//! Provides all common communications interfaces for the software.

// ------------------------------------------------------------------------------------------------
// MODULES
// ------------------------------------------------------------------------------------------------

/// Message definitions for the inbound and outbound channels of the waypoint updater
pub mod msg;

/// Network module
pub mod net;
