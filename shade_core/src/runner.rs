//! Blocking travel orchestration.
//!
//! Drives an armed cover with fast poll ticks until every axis arrives,
//! optionally reconciling external switch events between ticks. A
//! runtime cap derived from the configured travel times guards against
//! a run that never arrives (clock misconfiguration, estimator bug).

use std::time::Duration;

use eyre::WrapErr;
use shade_traits::{Actuator, StateSink};

use crate::config::{DriveCfg, TiltCfg};
use crate::cover::CoverStateMachine;
use crate::error::{CoverError, Report, Result};
use crate::observer::ExternalSwitchObserver;
use crate::status::TickStatus;

/// Runtime cap for one travel run: the worst-case leg (slower direction
/// plus spin-up, plus the tilt leg when present), doubled for margin,
/// plus a few poll ticks of slack.
fn run_budget(drive: &DriveCfg, tilt: Option<&TiltCfg>) -> Duration {
    let leg = drive.travel_time_up.max(drive.travel_time_down) + drive.startup_delay;
    let tilt_leg = tilt
        .map(|t| t.tilt_time_up.max(t.tilt_time_down))
        .unwrap_or(Duration::ZERO);
    (leg + tilt_leg) * 2 + drive.poll_interval * 10
}

/// Tick the cover until arrival, returning the final position.
/// Pass an observer to fold external switch events into each tick.
pub fn run_to_arrival<A: Actuator, P: StateSink>(
    cover: &mut CoverStateMachine<A, P>,
    mut observer: Option<&mut ExternalSwitchObserver>,
) -> Result<u8> {
    let budget = run_budget(cover.drive_cfg(), cover.tilt_cfg());
    let clock = cover.clock();
    let started = clock.now();

    loop {
        if let Some(obs) = observer.as_deref_mut() {
            obs.reconcile(cover)?;
        }
        match cover.tick()? {
            TickStatus::Idle => return Ok(cover.position()),
            TickStatus::Arrived { stop_issued } => {
                let position = cover.position();
                tracing::info!(position, stop_issued, "travel run finished");
                return Ok(position);
            }
            TickStatus::Moving => {}
        }
        if clock.since(started) >= budget {
            cover.stop().wrap_err("stopping after runtime cap")?;
            return Err(Report::new(CoverError::MaxRuntime));
        }
        clock.sleep(cover.poll_interval());
    }
}

/// Command a travel to `target` and block until arrival.
pub fn run_to_position<A: Actuator, P: StateSink>(
    cover: &mut CoverStateMachine<A, P>,
    target: u8,
) -> Result<u8> {
    cover.set_position(target)?;
    run_to_arrival(cover, None)
}

#[cfg(test)]
mod tests {
    use super::run_budget;
    use crate::config::{DriveCfg, TiltCfg};
    use std::time::Duration;

    #[test]
    fn budget_uses_slower_direction() {
        let drive = DriveCfg {
            travel_time_up: Duration::from_secs(25),
            travel_time_down: Duration::from_secs(20),
            startup_delay: Duration::ZERO,
            poll_interval: Duration::from_millis(100),
            ..Default::default()
        };
        assert_eq!(run_budget(&drive, None), Duration::from_secs(51));
    }

    #[test]
    fn budget_includes_startup_delay_and_tilt() {
        let drive = DriveCfg {
            travel_time_up: Duration::from_secs(10),
            travel_time_down: Duration::from_secs(10),
            startup_delay: Duration::from_secs(1),
            poll_interval: Duration::from_millis(100),
            ..Default::default()
        };
        let tilt = TiltCfg {
            tilt_time_up: Duration::from_millis(1500),
            tilt_time_down: Duration::from_millis(1500),
        };
        assert_eq!(run_budget(&drive, Some(&tilt)), Duration::from_secs(26));
    }
}
