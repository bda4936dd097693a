//! Environment-driven automation rules.
//!
//! Evaluated once per coarse tick (typically once a minute) as a pure
//! function of the pulled `EnvironmentSignals` value, the rule config,
//! and the current cover state. The host supplies the signals; the core
//! never fetches weather or sun data itself. A missing signal disables
//! the dependent rule for that tick.

use crate::config::AutomationCfg;
use crate::travel::{POSITION_CLOSED, POSITION_OPEN};

const MINUTES_PER_DAY: i32 = 24 * 60;

/// Environment snapshot pulled by the host for one coarse tick.
/// Times are minutes since local midnight.
#[derive(Debug, Clone, Copy, Default)]
pub struct EnvironmentSignals {
    pub minute_of_day: Option<u16>,
    pub sunrise_minute: Option<u16>,
    pub sunset_minute: Option<u16>,
    pub night_light_on: Option<bool>,
    pub wind_speed: Option<f32>,
    pub gust_speed: Option<f32>,
    pub weather_code: Option<u16>,
}

/// Action requested by a fired automation rule, applied through the
/// same public cover operations a user would invoke.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AutomationAction {
    Open,
    Close,
    OpenTilt,
}

/// Evaluate all rules in priority order and return the first that fires.
///
/// Priority mirrors manual expectations: explicit timed control, then
/// sun control, then night-light closing, then day tilting, with
/// weather protection last (it re-fires every tick while the threshold
/// is exceeded, so it wins eventually regardless).
pub fn evaluate(
    cfg: &AutomationCfg,
    signals: &EnvironmentSignals,
    position: u8,
    tilt: Option<u8>,
) -> Option<AutomationAction> {
    timed_control(cfg, signals, position)
        .or_else(|| sun_control(cfg, signals, position))
        .or_else(|| night_lights(cfg, signals, position))
        .or_else(|| day_tilting(cfg, signals, tilt))
        .or_else(|| weather_protection(cfg, signals, position))
}

fn timed_control(
    cfg: &AutomationCfg,
    signals: &EnvironmentSignals,
    position: u8,
) -> Option<AutomationAction> {
    let now = signals.minute_of_day?;
    if cfg.open_at_minute == Some(now) && position < POSITION_OPEN {
        return Some(AutomationAction::Open);
    }
    if cfg.close_at_minute == Some(now) && position > POSITION_CLOSED {
        return Some(AutomationAction::Close);
    }
    None
}

fn sun_control(
    cfg: &AutomationCfg,
    signals: &EnvironmentSignals,
    position: u8,
) -> Option<AutomationAction> {
    if !cfg.sun_control {
        return None;
    }
    let now = signals.minute_of_day?;
    let sunrise = signals.sunrise_minute?;
    let sunset = signals.sunset_minute?;

    let open_at = shift_minute(sunrise, cfg.sunrise_delay_min);
    let close_at = shift_minute(sunset, cfg.sunset_delay_min);

    if now == open_at && position < POSITION_OPEN {
        return Some(AutomationAction::Open);
    }
    if now == close_at && position > POSITION_CLOSED {
        return Some(AutomationAction::Close);
    }
    None
}

fn night_lights(
    cfg: &AutomationCfg,
    signals: &EnvironmentSignals,
    position: u8,
) -> Option<AutomationAction> {
    if !cfg.night_lights || signals.night_light_on != Some(true) {
        return None;
    }
    let now = signals.minute_of_day?;
    let sunrise = signals.sunrise_minute?;
    let sunset = signals.sunset_minute?;
    if is_night(now, sunrise, sunset) && position > POSITION_CLOSED {
        return Some(AutomationAction::Close);
    }
    None
}

fn day_tilting(
    cfg: &AutomationCfg,
    signals: &EnvironmentSignals,
    tilt: Option<u8>,
) -> Option<AutomationAction> {
    if !cfg.day_tilting {
        return None;
    }
    let tilt = tilt?;
    let now = signals.minute_of_day?;
    let sunrise = signals.sunrise_minute?;
    let sunset = signals.sunset_minute?;
    if !is_night(now, sunrise, sunset) && tilt < POSITION_OPEN {
        return Some(AutomationAction::OpenTilt);
    }
    None
}

fn weather_protection(
    cfg: &AutomationCfg,
    signals: &EnvironmentSignals,
    position: u8,
) -> Option<AutomationAction> {
    if position >= POSITION_OPEN {
        return None;
    }
    if let (Some(limit), Some(wind)) = (cfg.wind_limit, signals.wind_speed)
        && wind > limit
    {
        tracing::warn!(wind, limit, "wind above limit, opening cover");
        return Some(AutomationAction::Open);
    }
    if let (Some(limit), Some(gust)) = (cfg.gust_limit, signals.gust_speed)
        && gust > limit
    {
        tracing::warn!(gust, limit, "gusts above limit, opening cover");
        return Some(AutomationAction::Open);
    }
    if let (Some(limit), Some(code)) = (cfg.weather_code_limit, signals.weather_code)
        && code > limit
    {
        tracing::warn!(code, limit, "weather code above limit, opening cover");
        return Some(AutomationAction::Open);
    }
    None
}

/// Shift a minute-of-day by a signed offset, wrapping across midnight.
fn shift_minute(minute: u16, offset_min: i32) -> u16 {
    (i32::from(minute) + offset_min).rem_euclid(MINUTES_PER_DAY) as u16
}

fn is_night(now: u16, sunrise: u16, sunset: u16) -> bool {
    now < sunrise || now >= sunset
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    fn minute(h: u16, m: u16) -> u16 {
        h * 60 + m
    }

    #[test]
    fn no_rules_no_action() {
        let cfg = AutomationCfg::default();
        let signals = EnvironmentSignals {
            minute_of_day: Some(minute(12, 0)),
            ..Default::default()
        };
        assert_eq!(evaluate(&cfg, &signals, 50, None), None);
    }

    #[rstest]
    #[case(minute(7, 30), 40, Some(AutomationAction::Open))]
    #[case(minute(7, 30), 100, None)] // already open
    #[case(minute(7, 31), 40, None)] // wrong minute
    #[case(minute(21, 0), 40, Some(AutomationAction::Close))]
    #[case(minute(21, 0), 0, None)] // already closed
    fn timed_control_fires_at_configured_minute(
        #[case] now: u16,
        #[case] position: u8,
        #[case] expected: Option<AutomationAction>,
    ) {
        let cfg = AutomationCfg {
            open_at_minute: Some(minute(7, 30)),
            close_at_minute: Some(minute(21, 0)),
            ..Default::default()
        };
        let signals = EnvironmentSignals {
            minute_of_day: Some(now),
            ..Default::default()
        };
        assert_eq!(evaluate(&cfg, &signals, position, None), expected);
    }

    #[test]
    fn sun_control_applies_signed_delays() {
        let cfg = AutomationCfg {
            sun_control: true,
            sunrise_delay_min: 15,
            sunset_delay_min: -10,
            ..Default::default()
        };
        let base = EnvironmentSignals {
            sunrise_minute: Some(minute(6, 0)),
            sunset_minute: Some(minute(20, 0)),
            ..Default::default()
        };

        let at_open = EnvironmentSignals {
            minute_of_day: Some(minute(6, 15)),
            ..base
        };
        assert_eq!(evaluate(&cfg, &at_open, 0, None), Some(AutomationAction::Open));

        let at_close = EnvironmentSignals {
            minute_of_day: Some(minute(19, 50)),
            ..base
        };
        assert_eq!(
            evaluate(&cfg, &at_close, 100, None),
            Some(AutomationAction::Close)
        );
    }

    #[test]
    fn missing_sun_signal_disables_rule_without_error() {
        let cfg = AutomationCfg {
            sun_control: true,
            ..Default::default()
        };
        let signals = EnvironmentSignals {
            minute_of_day: Some(minute(6, 0)),
            ..Default::default()
        };
        assert_eq!(evaluate(&cfg, &signals, 0, None), None);
    }

    #[test]
    fn night_lights_close_after_sunset() {
        let cfg = AutomationCfg {
            night_lights: true,
            ..Default::default()
        };
        let signals = EnvironmentSignals {
            minute_of_day: Some(minute(22, 0)),
            sunrise_minute: Some(minute(6, 0)),
            sunset_minute: Some(minute(20, 0)),
            night_light_on: Some(true),
            ..Default::default()
        };
        assert_eq!(
            evaluate(&cfg, &signals, 60, None),
            Some(AutomationAction::Close)
        );

        let light_off = EnvironmentSignals {
            night_light_on: Some(false),
            ..signals
        };
        assert_eq!(evaluate(&cfg, &light_off, 60, None), None);
    }

    #[test]
    fn day_tilting_reopens_tilt_in_daylight_only() {
        let cfg = AutomationCfg {
            day_tilting: true,
            ..Default::default()
        };
        let day = EnvironmentSignals {
            minute_of_day: Some(minute(12, 0)),
            sunrise_minute: Some(minute(6, 0)),
            sunset_minute: Some(minute(20, 0)),
            ..Default::default()
        };
        assert_eq!(
            evaluate(&cfg, &day, 100, Some(40)),
            Some(AutomationAction::OpenTilt)
        );
        assert_eq!(evaluate(&cfg, &day, 100, Some(100)), None);

        let night = EnvironmentSignals {
            minute_of_day: Some(minute(23, 0)),
            ..day
        };
        assert_eq!(evaluate(&cfg, &night, 100, Some(40)), None);
    }

    #[rstest]
    #[case(Some(18.0), None, None, Some(AutomationAction::Open))]
    #[case(None, Some(25.0), None, Some(AutomationAction::Open))]
    #[case(None, None, Some(80), Some(AutomationAction::Open))]
    #[case(Some(10.0), Some(15.0), Some(30), None)] // all below limits
    fn weather_protection_opens_on_exceeded_limits(
        #[case] wind: Option<f32>,
        #[case] gust: Option<f32>,
        #[case] code: Option<u16>,
        #[case] expected: Option<AutomationAction>,
    ) {
        let cfg = AutomationCfg {
            wind_limit: Some(14.0),
            gust_limit: Some(20.0),
            weather_code_limit: Some(65),
            ..Default::default()
        };
        let signals = EnvironmentSignals {
            wind_speed: wind,
            gust_speed: gust,
            weather_code: code,
            ..Default::default()
        };
        assert_eq!(evaluate(&cfg, &signals, 20, None), expected);
    }

    #[test]
    fn weather_protection_idle_when_already_open() {
        let cfg = AutomationCfg {
            wind_limit: Some(14.0),
            ..Default::default()
        };
        let signals = EnvironmentSignals {
            wind_speed: Some(30.0),
            ..Default::default()
        };
        assert_eq!(evaluate(&cfg, &signals, 100, None), None);
    }

    #[rstest]
    #[case(minute(23, 50), 20, minute(0, 10))]
    #[case(minute(0, 5), -10, minute(23, 55))]
    #[case(minute(6, 0), 0, minute(6, 0))]
    fn shift_minute_wraps_midnight(#[case] base: u16, #[case] offset: i32, #[case] expected: u16) {
        assert_eq!(shift_minute(base, offset), expected);
    }
}
