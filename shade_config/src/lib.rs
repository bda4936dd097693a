#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
//! Config schema and validation for the cover controller.
//!
//! `Config` and sub-structs are deserialized from TOML and validated.
//! Durations are unit-suffixed (`_s`, `_ms`, `_min`); times of day are
//! `"HH:MM"` strings parsed into minutes since midnight.

use serde::Deserialize;

/// Full 0<->100 traversal takes this long per direction. The two may
/// differ (asymmetric motors, gravity assist).
#[derive(Debug, Deserialize)]
pub struct Drive {
    pub travel_time_up_s: f64,
    pub travel_time_down_s: f64,
    /// Motor spin-up lag before motion is assumed to begin.
    #[serde(default)]
    pub startup_delay_s: f64,
    /// Send a STOP pulse even when arriving at a hard limit (0/100).
    #[serde(default)]
    pub send_stop_at_end: bool,
    /// Gap between releasing one relay and engaging the other.
    #[serde(default = "default_dead_time_ms")]
    pub dead_time_ms: u64,
    /// Fast poll tick while traveling.
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
}

fn default_dead_time_ms() -> u64 {
    100
}

fn default_poll_interval_ms() -> u64 {
    100
}

/// References to the two relay/switch entities driving the motor.
#[derive(Debug, Deserialize)]
pub struct Actuators {
    pub up: String,
    pub down: String,
}

/// Optional tilt axis. Both durations must be positive when the section
/// is present; a cover with only one configured tilt time is rejected.
#[derive(Debug, Deserialize)]
pub struct Tilt {
    pub tilt_time_up_s: f64,
    pub tilt_time_down_s: f64,
}

/// Environment-driven automation toggles. Everything defaults to off.
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Automation {
    /// Open at this wall-clock time, "HH:MM".
    pub open_at: Option<String>,
    /// Close at this wall-clock time, "HH:MM".
    pub close_at: Option<String>,
    pub sun_control: bool,
    pub sunrise_delay_min: i32,
    pub sunset_delay_min: i32,
    pub night_lights: bool,
    pub day_tilting: bool,
    pub wind_limit: Option<f32>,
    pub gust_limit: Option<f32>,
    pub weather_code_limit: Option<u16>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
pub struct Logging {
    /// Path to a .log file (JSON lines); stderr when absent.
    pub file: Option<String>,
    /// "info", "debug", ...
    pub level: Option<String>,
}

/// Last published state, fed back as the known position at startup.
#[derive(Debug, Deserialize, Clone, Copy)]
pub struct Restore {
    pub position: u8,
    #[serde(default)]
    pub tilt: Option<u8>,
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub drive: Drive,
    pub actuators: Actuators,
    #[serde(default)]
    pub tilt: Option<Tilt>,
    #[serde(default)]
    pub automation: Automation,
    #[serde(default)]
    pub logging: Logging,
    #[serde(default)]
    pub restore: Option<Restore>,
}

pub fn load_toml(s: &str) -> Result<Config, toml::de::Error> {
    toml::from_str::<Config>(s)
}

impl Config {
    /// Reject configs a cover must never be constructed from.
    pub fn validate(&self) -> eyre::Result<()> {
        require_positive("drive.travel_time_up_s", self.drive.travel_time_up_s)?;
        require_positive("drive.travel_time_down_s", self.drive.travel_time_down_s)?;
        if !self.drive.startup_delay_s.is_finite() || self.drive.startup_delay_s < 0.0 {
            eyre::bail!("drive.startup_delay_s must be finite and non-negative");
        }
        if self.drive.poll_interval_ms == 0 {
            eyre::bail!("drive.poll_interval_ms must be positive");
        }
        if self.actuators.up.trim().is_empty() {
            eyre::bail!("actuators.up must reference an entity");
        }
        if self.actuators.down.trim().is_empty() {
            eyre::bail!("actuators.down must reference an entity");
        }
        if self.actuators.up == self.actuators.down {
            eyre::bail!("actuators.up and actuators.down must be distinct entities");
        }
        if let Some(tilt) = &self.tilt {
            require_positive("tilt.tilt_time_up_s", tilt.tilt_time_up_s)?;
            require_positive("tilt.tilt_time_down_s", tilt.tilt_time_down_s)?;
        }
        if let Some(restore) = &self.restore {
            if restore.position > 100 {
                eyre::bail!("restore.position must be in 0..=100");
            }
            if restore.tilt.is_some_and(|t| t > 100) {
                eyre::bail!("restore.tilt must be in 0..=100");
            }
            if restore.tilt.is_some() && self.tilt.is_none() {
                eyre::bail!("restore.tilt given but no [tilt] section configured");
            }
        }
        // Surface bad time strings at load, not on the first coarse tick.
        self.automation.open_at_minute()?;
        self.automation.close_at_minute()?;
        Ok(())
    }
}

impl Automation {
    pub fn open_at_minute(&self) -> eyre::Result<Option<u16>> {
        self.open_at.as_deref().map(parse_hhmm).transpose()
    }

    pub fn close_at_minute(&self) -> eyre::Result<Option<u16>> {
        self.close_at.as_deref().map(parse_hhmm).transpose()
    }
}

fn require_positive(name: &str, value: f64) -> eyre::Result<()> {
    if !value.is_finite() || value <= 0.0 {
        eyre::bail!("{name} must be a positive number, got {value}");
    }
    Ok(())
}

/// Parse `"HH:MM"` into minutes since midnight.
pub fn parse_hhmm(s: &str) -> eyre::Result<u16> {
    let (h, m) = s
        .split_once(':')
        .ok_or_else(|| eyre::eyre!("invalid time {s:?}, expected HH:MM"))?;
    let h: u16 = h
        .parse()
        .map_err(|_| eyre::eyre!("invalid hour in {s:?}"))?;
    let m: u16 = m
        .parse()
        .map_err(|_| eyre::eyre!("invalid minute in {s:?}"))?;
    if h > 23 || m > 59 {
        eyre::bail!("time {s:?} out of range");
    }
    Ok(h * 60 + m)
}

#[cfg(test)]
mod tests {
    use super::parse_hhmm;
    use rstest::rstest;

    #[rstest]
    #[case("00:00", 0)]
    #[case("07:30", 450)]
    #[case("23:59", 1439)]
    fn parses_valid_times(#[case] s: &str, #[case] expected: u16) {
        assert_eq!(parse_hhmm(s).unwrap(), expected);
    }

    #[rstest]
    #[case("24:00")]
    #[case("12:60")]
    #[case("noon")]
    #[case("7h30")]
    fn rejects_invalid_times(#[case] s: &str) {
        assert!(parse_hhmm(s).is_err());
    }
}
