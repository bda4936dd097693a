//! Validated construction of `CoverStateMachine`.
//!
//! All configuration checks live in `validate_and_build`, the single
//! source of truth shared by every construction path. A cover with a
//! rejected config must never come into existence (non-positive travel
//! times would make every estimate degenerate).

use std::sync::Arc;

use shade_traits::clock::{Clock, MonotonicClock};
use shade_traits::{Actuator, StateSink};

use crate::config::{AutomationCfg, DriveCfg, TiltCfg};
use crate::cover::CoverStateMachine;
use crate::error::{BuildError, Result};
use crate::interlock::ActuatorInterlock;
use crate::mocks::NullSink;
use crate::travel::TravelEstimator;

/// Boxed, dynamic-dispatch cover as used by the CLI and host adapters.
pub type Cover = CoverStateMachine<Box<dyn Actuator>, Box<dyn StateSink>>;

/// Builder for a boxed `Cover`. Actuators are required; everything else
/// has defaults (real monotonic clock, discarding sink, default drive
/// timing, no tilt, no automation).
#[derive(Default)]
pub struct CoverBuilder {
    up: Option<Box<dyn Actuator>>,
    down: Option<Box<dyn Actuator>>,
    sink: Option<Box<dyn StateSink>>,
    drive: Option<DriveCfg>,
    tilt: Option<TiltCfg>,
    automation: Option<AutomationCfg>,
    clock: Option<Arc<dyn Clock + Send + Sync>>,
}

impl CoverBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_up_actuator(mut self, actuator: impl Actuator + 'static) -> Self {
        self.up = Some(Box::new(actuator));
        self
    }

    pub fn with_down_actuator(mut self, actuator: impl Actuator + 'static) -> Self {
        self.down = Some(Box::new(actuator));
        self
    }

    pub fn with_sink(mut self, sink: impl StateSink + 'static) -> Self {
        self.sink = Some(Box::new(sink));
        self
    }

    pub fn with_drive(mut self, drive: DriveCfg) -> Self {
        self.drive = Some(drive);
        self
    }

    pub fn with_tilt(mut self, tilt: TiltCfg) -> Self {
        self.tilt = Some(tilt);
        self
    }

    pub fn with_automation(mut self, automation: AutomationCfg) -> Self {
        self.automation = Some(automation);
        self
    }

    pub fn with_clock(mut self, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<Cover> {
        let up = self
            .up
            .ok_or_else(|| eyre::Report::new(BuildError::MissingUpActuator))?;
        let down = self
            .down
            .ok_or_else(|| eyre::Report::new(BuildError::MissingDownActuator))?;
        validate_and_build(
            up,
            down,
            self.sink.unwrap_or_else(|| Box::new(NullSink)),
            self.drive.unwrap_or_default(),
            self.tilt,
            self.automation.unwrap_or_default(),
            self.clock
                .unwrap_or_else(|| Arc::new(MonotonicClock::new())),
        )
    }
}

/// Validate configuration and construct a `CoverStateMachine`.
pub fn validate_and_build<A: Actuator, P: StateSink>(
    up: A,
    down: A,
    sink: P,
    drive: DriveCfg,
    tilt: Option<TiltCfg>,
    automation: AutomationCfg,
    clock: Arc<dyn Clock + Send + Sync>,
) -> Result<CoverStateMachine<A, P>> {
    if drive.travel_time_up.is_zero() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "travel_time_up must be positive",
        )));
    }
    if drive.travel_time_down.is_zero() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "travel_time_down must be positive",
        )));
    }
    if drive.poll_interval.is_zero() {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "poll_interval must be positive",
        )));
    }
    if let Some(t) = &tilt
        && (t.tilt_time_up.is_zero() || t.tilt_time_down.is_zero())
    {
        return Err(eyre::Report::new(BuildError::InvalidConfig(
            "tilt travel times must both be positive",
        )));
    }

    let travel = TravelEstimator::new(
        drive.travel_time_down,
        drive.travel_time_up,
        drive.startup_delay,
        clock.clone(),
    );
    let tilt_estimator = tilt.as_ref().map(|t| {
        // Tilt follows the same startup lag as the primary axis.
        TravelEstimator::new(
            t.tilt_time_down,
            t.tilt_time_up,
            drive.startup_delay,
            clock.clone(),
        )
    });
    let interlock = ActuatorInterlock::new(up, down, drive.dead_time, clock.clone());

    Ok(CoverStateMachine {
        interlock,
        travel,
        tilt: tilt_estimator,
        drive,
        tilt_cfg: tilt,
        automation,
        sink,
        clock,
        poll_armed: false,
    })
}
