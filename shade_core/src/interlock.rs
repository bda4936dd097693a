//! Mutually exclusive sequencing of the two opposing relays.
//!
//! Relay hardware and most motor controllers require the active output
//! to be released before the opposing one is engaged, with a short gap
//! in between. `ActuatorInterlock` owns both relays and is the only
//! code path that writes them, so the never-both-active invariant holds
//! across every command sequence.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use eyre::WrapErr;
use shade_traits::Actuator;
use shade_traits::clock::Clock;

use crate::error::Result;
use crate::hw_error::map_actuator_error;

/// Relay channel identifiers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Channel {
    Up,
    Down,
}

/// Physical drive command issued to the relay pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DriveCommand {
    Open,
    Close,
    Stop,
}

pub struct ActuatorInterlock<A: Actuator> {
    up: A,
    down: A,
    dead_time: Duration,
    clock: Arc<dyn Clock + Send + Sync>,
    self_drive: Arc<AtomicBool>,
}

impl<A: Actuator> ActuatorInterlock<A> {
    pub fn new(up: A, down: A, dead_time: Duration, clock: Arc<dyn Clock + Send + Sync>) -> Self {
        Self {
            up,
            down,
            dead_time,
            clock,
            self_drive: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Shared flag that is raised for the duration of every command
    /// sequence, letting switch observers distinguish self-issued relay
    /// writes from external ones.
    pub fn self_drive_flag(&self) -> Arc<AtomicBool> {
        self.self_drive.clone()
    }

    /// Apply a drive command as a strictly ordered
    /// release / dead-time / engage sequence. The sequence runs to
    /// completion once started; a caller holding `&mut self` cannot be
    /// preempted by another command on the same cover.
    pub fn apply(&mut self, command: DriveCommand) -> Result<()> {
        self.self_drive.store(true, Ordering::SeqCst);
        let result = self.apply_sequenced(command);
        self.self_drive.store(false, Ordering::SeqCst);
        result
    }

    fn apply_sequenced(&mut self, command: DriveCommand) -> Result<()> {
        tracing::debug!(?command, "interlock apply");
        match command {
            DriveCommand::Open => self.reverse_into(Channel::Up),
            DriveCommand::Close => self.reverse_into(Channel::Down),
            DriveCommand::Stop => {
                // Both outputs go to the safe state; no dead-time needed
                // and a first failure must not skip the second release.
                let up = self.write(Channel::Up, false);
                let down = self.write(Channel::Down, false);
                up.wrap_err("releasing up relay")?;
                down.wrap_err("releasing down relay")
            }
        }
    }

    /// Release the opposing relay, wait out the dead-time, engage `engage`.
    fn reverse_into(&mut self, engage: Channel) -> Result<()> {
        let release = match engage {
            Channel::Up => Channel::Down,
            Channel::Down => Channel::Up,
        };
        self.write(release, false)
            .wrap_err_with(|| format!("releasing {release:?} relay"))?;
        self.clock.sleep(self.dead_time);
        if let Err(e) = self.write(engage, true) {
            // Partial failure: leave both outputs released.
            if let Err(off) = self.write(engage, false) {
                tracing::warn!(error = %off, "failsafe release after engage failure");
            }
            return Err(e).wrap_err_with(|| format!("engaging {engage:?} relay"));
        }
        Ok(())
    }

    fn write(&mut self, channel: Channel, active: bool) -> Result<()> {
        let actuator = match channel {
            Channel::Up => &mut self.up,
            Channel::Down => &mut self.down,
        };
        actuator
            .set_active(active)
            .map_err(|e| eyre::Report::new(map_actuator_error(&*e)))
    }
}
