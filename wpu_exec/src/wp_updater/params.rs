//! Waypoint updater parameters

// ---------------------------------------------------------------------------
// IMPORTS
// ---------------------------------------------------------------------------

// External
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// DATA STRUCTURES
// ---------------------------------------------------------------------------

/// Parameters for the waypoint updater.
///
/// Every field has a default so a parameter file only needs to list what it changes.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct Params {
    /// Number of waypoints published each cycle (the lookahead horizon).
    pub lookahead_wps: usize,

    /// Standoff distance kept before the stop point.
    ///
    /// Units: meters
    pub buffer_break_m: f64,

    /// The maximum comfortable deceleration. Only the magnitude is used, so both `-5.0` and
    /// `5.0` describe the same limit. Must be non-zero.
    ///
    /// Units: meters/second^2
    pub decel_limit_mss: f64,

    /// Rate at which the control loop ticks.
    ///
    /// Units: Hz
    pub tick_rate_hz: f64,

    /// Braking speeds below this threshold are snapped to zero.
    ///
    /// Units: meters/second
    pub stop_speed_threshold_ms: f64,

    /// If the angle between the vehicle's heading and the direction to the nearest waypoint is
    /// greater than this the waypoint is considered to be behind the vehicle.
    ///
    /// Units: radians
    pub behind_angle_rad: f64,

    /// Frame label attached to the published waypoints.
    pub frame_id: String,
}

// ---------------------------------------------------------------------------
// ENUMS
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error, PartialEq)]
pub enum ParamsError {
    #[error("The lookahead must contain at least one waypoint")]
    ZeroLookahead,

    #[error("The deceleration limit must be finite and non-zero, found {0}")]
    InvalidDecelLimit(f64),

    #[error("The tick rate must be finite and positive, found {0} Hz")]
    InvalidTickRate(f64),

    #[error("The brake buffer must be finite and non-negative, found {0} m")]
    InvalidBufferBreak(f64),

    #[error("The stop speed threshold must be finite and non-negative, found {0} m/s")]
    InvalidStopSpeedThreshold(f64),

    #[error("The behind angle must be within [0, pi], found {0} rad")]
    InvalidBehindAngle(f64),
}

// ---------------------------------------------------------------------------
// IMPLEMENTATIONS
// ---------------------------------------------------------------------------

impl Default for Params {
    fn default() -> Self {
        Self {
            lookahead_wps: 200,
            buffer_break_m: 5.0,
            decel_limit_mss: -5.0,
            tick_rate_hz: 10.0,
            stop_speed_threshold_ms: 1.0,
            behind_angle_rad: std::f64::consts::FRAC_PI_4,
            frame_id: String::from("world"),
        }
    }
}

impl Params {
    /// Check that the parameters describe a usable configuration.
    ///
    /// This must be called before the control loop starts, a zero deceleration limit for example
    /// would otherwise only show up as a division by zero while braking.
    pub fn validate(&self) -> Result<(), ParamsError> {
        if self.lookahead_wps == 0 {
            return Err(ParamsError::ZeroLookahead);
        }
        if !self.decel_limit_mss.is_finite() || self.decel_limit_mss == 0.0 {
            return Err(ParamsError::InvalidDecelLimit(self.decel_limit_mss));
        }
        if !self.tick_rate_hz.is_finite() || self.tick_rate_hz <= 0.0 {
            return Err(ParamsError::InvalidTickRate(self.tick_rate_hz));
        }
        if !self.buffer_break_m.is_finite() || self.buffer_break_m < 0.0 {
            return Err(ParamsError::InvalidBufferBreak(self.buffer_break_m));
        }
        if !self.stop_speed_threshold_ms.is_finite() || self.stop_speed_threshold_ms < 0.0 {
            return Err(ParamsError::InvalidStopSpeedThreshold(
                self.stop_speed_threshold_ms,
            ));
        }
        if !(0.0..=std::f64::consts::PI).contains(&self.behind_angle_rad) {
            return Err(ParamsError::InvalidBehindAngle(self.behind_angle_rad));
        }

        Ok(())
    }

    /// Magnitude of the deceleration limit.
    pub fn decel_limit_magnitude_mss(&self) -> f64 {
        self.decel_limit_mss.abs()
    }

    /// Period of one tick of the control loop.
    pub fn tick_period_s(&self) -> f64 {
        1.0 / self.tick_rate_hz
    }
}
