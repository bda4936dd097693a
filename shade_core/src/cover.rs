//! The cover state machine.
//!
//! Translates user and automation intents (open/close/stop/set-position)
//! into estimator bookkeeping and physical relay commands, and drives
//! the poll tick that detects arrival and auto-stops the motor. Position
//! is never stored here; it is always delegated to the estimator(s).

use std::sync::Arc;
use std::sync::atomic::AtomicBool;
use std::time::Duration;

use shade_traits::clock::Clock;
use shade_traits::{Actuator, StateSink};

use crate::automation::{self, AutomationAction, EnvironmentSignals};
use crate::config::{AutomationCfg, DriveCfg, TiltCfg};
use crate::error::Result;
use crate::interlock::{ActuatorInterlock, DriveCommand};
use crate::status::{CoverSnapshot, TickStatus};
use crate::travel::{Direction, POSITION_CLOSED, POSITION_OPEN, TravelEstimator};

pub struct CoverStateMachine<A: Actuator, P: StateSink> {
    pub(crate) interlock: ActuatorInterlock<A>,
    pub(crate) travel: TravelEstimator,
    pub(crate) tilt: Option<TravelEstimator>,
    pub(crate) drive: DriveCfg,
    pub(crate) tilt_cfg: Option<TiltCfg>,
    pub(crate) automation: AutomationCfg,
    pub(crate) sink: P,
    pub(crate) clock: Arc<dyn Clock + Send + Sync>,
    pub(crate) poll_armed: bool,
}

impl<A: Actuator, P: StateSink> core::fmt::Debug for CoverStateMachine<A, P> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("CoverStateMachine")
            .field("position", &self.travel.current_position())
            .field("tilt", &self.tilt_position())
            .field("poll_armed", &self.poll_armed)
            .finish()
    }
}

impl<A: Actuator, P: StateSink> CoverStateMachine<A, P> {
    /// Open fully. No-op when already at the open extreme.
    pub fn open(&mut self) -> Result<()> {
        if self.travel.current_position() >= POSITION_OPEN {
            return Ok(());
        }
        tracing::info!("opening cover");
        self.travel.start_travel_up();
        self.arm();
        self.snap_tilt(Direction::Up);
        self.drive_checked(DriveCommand::Open)
    }

    /// Close fully. No-op when already at the closed extreme.
    pub fn close(&mut self) -> Result<()> {
        if self.travel.current_position() <= POSITION_CLOSED {
            return Ok(());
        }
        tracing::info!("closing cover");
        self.travel.start_travel_down();
        self.arm();
        self.snap_tilt(Direction::Down);
        self.drive_checked(DriveCommand::Close)
    }

    /// Stop all travel and release both relays.
    pub fn stop(&mut self) -> Result<()> {
        self.stop_estimators();
        self.drive_checked(DriveCommand::Stop)
    }

    /// Travel to a specific position. No-op when already there.
    pub fn set_position(&mut self, target: u8) -> Result<()> {
        let target = target.min(POSITION_OPEN);
        let current = self.travel.current_position();
        let (command, direction) = if target > current {
            (DriveCommand::Open, Direction::Up)
        } else if target < current {
            (DriveCommand::Close, Direction::Down)
        } else {
            return Ok(());
        };
        tracing::info!(target, "set position");
        self.travel.start_travel(target);
        self.arm();
        self.snap_tilt(direction);
        self.drive_checked(command)
    }

    /// Open the tilt axis fully. Silently ignored without tilt support.
    pub fn open_tilt(&mut self) -> Result<()> {
        let Some(tilt) = self.tilt.as_mut() else {
            return Ok(());
        };
        if tilt.current_position() >= POSITION_OPEN {
            return Ok(());
        }
        tilt.start_travel_up();
        self.arm();
        self.drive_checked(DriveCommand::Open)
    }

    /// Close the tilt axis fully. Silently ignored without tilt support.
    pub fn close_tilt(&mut self) -> Result<()> {
        let Some(tilt) = self.tilt.as_mut() else {
            return Ok(());
        };
        if tilt.current_position() <= POSITION_CLOSED {
            return Ok(());
        }
        tilt.start_travel_down();
        self.arm();
        self.drive_checked(DriveCommand::Close)
    }

    /// Travel the tilt axis to a specific position. Silently ignored
    /// without tilt support.
    pub fn set_tilt_position(&mut self, target: u8) -> Result<()> {
        let Some(tilt) = self.tilt.as_mut() else {
            return Ok(());
        };
        let target = target.min(POSITION_OPEN);
        let current = tilt.current_position();
        let command = if target > current {
            DriveCommand::Open
        } else if target < current {
            DriveCommand::Close
        } else {
            return Ok(());
        };
        tilt.start_travel(target);
        self.arm();
        self.drive_checked(command)
    }

    /// Calibration override for the position axis: pins the estimate
    /// without moving the actuator. Used to restore persisted state.
    pub fn set_known_position(&mut self, position: u8) {
        self.travel.set_position(position.min(POSITION_OPEN));
        self.publish();
    }

    /// Calibration override for the tilt axis; ignored without tilt.
    pub fn set_known_tilt_position(&mut self, position: u8) {
        if let Some(tilt) = self.tilt.as_mut() {
            tilt.set_position(position.min(POSITION_OPEN));
            self.publish();
        }
    }

    /// One fast poll tick: publish the fresh estimate, detect arrival on
    /// all axes, and auto-stop. Non-blocking apart from the interlock's
    /// stop sequence (which has no dead-time wait).
    pub fn tick(&mut self) -> Result<TickStatus> {
        if !self.poll_armed {
            return Ok(TickStatus::Idle);
        }
        self.publish();
        if !self.position_reached() {
            return Ok(TickStatus::Moving);
        }

        // A tilt-only run never hits a hard limit on the position axis,
        // so the end-stop exemption applies only when this axis drove.
        let position_drove = self.travel.direction() != Direction::Stopped;
        self.stop_estimators();
        let position = self.travel.current_position();
        let at_end =
            position_drove && (position == POSITION_CLOSED || position == POSITION_OPEN);
        let stop_issued = !at_end || self.drive.send_stop_at_end;
        if stop_issued {
            self.drive_checked(DriveCommand::Stop)?;
        } else {
            // Motor self-stops at the hard limit; just publish rest state.
            self.publish();
        }
        tracing::info!(position, stop_issued, "travel complete");
        Ok(TickStatus::Arrived { stop_issued })
    }

    /// One coarse automation tick. Rules are skipped entirely while the
    /// cover is traveling so automation never overrides a command in
    /// flight. Returns the action taken, if any.
    pub fn automation_tick(
        &mut self,
        signals: &EnvironmentSignals,
    ) -> Result<Option<AutomationAction>> {
        if self.is_traveling() {
            return Ok(None);
        }
        let action = automation::evaluate(
            &self.automation,
            signals,
            self.travel.current_position(),
            self.tilt_position(),
        );
        if let Some(action) = action {
            tracing::info!(?action, "automation rule fired");
            match action {
                AutomationAction::Open => self.open()?,
                AutomationAction::Close => self.close()?,
                AutomationAction::OpenTilt => self.open_tilt()?,
            }
        }
        Ok(action)
    }

    pub fn position(&self) -> u8 {
        self.travel.current_position()
    }

    pub fn tilt_position(&self) -> Option<u8> {
        self.tilt.as_ref().map(TravelEstimator::current_position)
    }

    pub fn has_tilt_support(&self) -> bool {
        self.tilt.is_some()
    }

    pub fn is_traveling(&self) -> bool {
        self.travel.is_traveling()
            || self.tilt.as_ref().is_some_and(TravelEstimator::is_traveling)
    }

    pub fn is_opening(&self) -> bool {
        self.axis_moving(Direction::Up)
    }

    pub fn is_closing(&self) -> bool {
        self.axis_moving(Direction::Down)
    }

    pub fn is_closed(&self) -> bool {
        self.travel.is_closed()
    }

    pub fn poll_armed(&self) -> bool {
        self.poll_armed
    }

    pub fn poll_interval(&self) -> Duration {
        self.drive.poll_interval
    }

    pub fn clock(&self) -> Arc<dyn Clock + Send + Sync> {
        self.clock.clone()
    }

    pub fn drive_cfg(&self) -> &DriveCfg {
        &self.drive
    }

    pub fn tilt_cfg(&self) -> Option<&TiltCfg> {
        self.tilt_cfg.as_ref()
    }

    /// See `ActuatorInterlock::self_drive_flag`.
    pub fn self_drive_flag(&self) -> Arc<AtomicBool> {
        self.interlock.self_drive_flag()
    }

    pub fn snapshot(&self) -> CoverSnapshot {
        CoverSnapshot {
            position: self.travel.current_position(),
            tilt: self.tilt_position(),
            opening: self.is_opening(),
            closing: self.is_closing(),
        }
    }

    fn axis_moving(&self, direction: Direction) -> bool {
        (self.travel.is_traveling() && self.travel.direction() == direction)
            || self
                .tilt
                .as_ref()
                .is_some_and(|t| t.is_traveling() && t.direction() == direction)
    }

    fn position_reached(&self) -> bool {
        self.travel.position_reached()
            && self
                .tilt
                .as_ref()
                .is_none_or(TravelEstimator::position_reached)
    }

    /// Tilt mechanically follows the position direction, so it is
    /// snapped fully open/closed before the physical command goes out.
    fn snap_tilt(&mut self, direction: Direction) {
        if let Some(tilt) = self.tilt.as_mut() {
            match direction {
                Direction::Up => tilt.start_travel_up(),
                Direction::Down => tilt.start_travel_down(),
                Direction::Stopped => {}
            }
        }
    }

    fn stop_estimators(&mut self) {
        self.travel.stop();
        if let Some(tilt) = self.tilt.as_mut() {
            tilt.stop();
        }
        self.disarm();
    }

    /// Issue the physical command; on failure, park the estimators where
    /// they were so the cover never pretends a move started. A failure of
    /// the first relay action returns before any time has elapsed, so the
    /// parked position is exact.
    fn drive_checked(&mut self, command: DriveCommand) -> Result<()> {
        if let Err(e) = self.interlock.apply(command) {
            self.stop_estimators();
            return Err(e);
        }
        self.publish();
        Ok(())
    }

    fn arm(&mut self) {
        // Idempotent: re-arming while armed is a no-op.
        self.poll_armed = true;
    }

    fn disarm(&mut self) {
        self.poll_armed = false;
    }

    fn publish(&mut self) {
        let snap = self.snapshot();
        self.sink
            .publish(snap.position, snap.tilt, snap.opening, snap.closing);
    }
}
