//! Runtime configuration structs for the cover state machine.
//!
//! These are the in-memory configs consumed by `CoverStateMachine`.
//! They are separate from the TOML-deserialized schema in `shade_config`.

use std::time::Duration;

/// Drive timing configuration for the primary position axis.
#[derive(Debug, Clone)]
pub struct DriveCfg {
    /// Full 0 -> 100 traversal time.
    pub travel_time_up: Duration,
    /// Full 100 -> 0 traversal time. May differ from `travel_time_up`
    /// (asymmetric motors, gravity assist).
    pub travel_time_down: Duration,
    /// Motor spin-up lag; elapsed time below this yields no position change.
    pub startup_delay: Duration,
    /// Issue a physical STOP even when arriving at a hard limit (0 or 100).
    /// Motors that self-stop at end positions leave this false.
    pub send_stop_at_end: bool,
    /// Gap between releasing one relay and engaging the opposing one.
    pub dead_time: Duration,
    /// Fast poll tick interval while traveling.
    pub poll_interval: Duration,
}

impl Default for DriveCfg {
    fn default() -> Self {
        Self {
            travel_time_up: Duration::from_secs(25),
            travel_time_down: Duration::from_secs(20),
            startup_delay: Duration::ZERO,
            send_stop_at_end: false,
            dead_time: Duration::from_millis(100),
            poll_interval: Duration::from_millis(100),
        }
    }
}

/// Tilt axis timing. Present only when both durations are positive;
/// the builder rejects half-configured tilt.
#[derive(Debug, Clone)]
pub struct TiltCfg {
    pub tilt_time_up: Duration,
    pub tilt_time_down: Duration,
}

impl Default for TiltCfg {
    fn default() -> Self {
        Self {
            tilt_time_up: Duration::from_millis(1500),
            tilt_time_down: Duration::from_millis(1500),
        }
    }
}

/// Environment-driven automation rules, evaluated on the coarse tick.
/// Every rule is off by default; missing signals disable the dependent
/// rule for that tick.
#[derive(Debug, Clone, Default)]
pub struct AutomationCfg {
    /// Open the cover at this wall-clock minute of day (0..1440).
    pub open_at_minute: Option<u16>,
    /// Close the cover at this wall-clock minute of day (0..1440).
    pub close_at_minute: Option<u16>,
    /// Open at sunrise and close at sunset, shifted by the delays below.
    pub sun_control: bool,
    /// Minutes added to sunrise before opening (may be negative).
    pub sunrise_delay_min: i32,
    /// Minutes added to sunset before closing (may be negative).
    pub sunset_delay_min: i32,
    /// Close after sunset while the linked light is on.
    pub night_lights: bool,
    /// Re-open the tilt axis during daylight.
    pub day_tilting: bool,
    /// Open fully when sustained wind exceeds this speed.
    pub wind_limit: Option<f32>,
    /// Open fully when gusts exceed this speed.
    pub gust_limit: Option<f32>,
    /// Open fully when the reported weather code exceeds this value.
    pub weather_code_limit: Option<u16>,
}
