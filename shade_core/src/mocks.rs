//! Test and helper doubles for shade_core.
//!
//! `ManualClock` is usable from downstream crates' tests as well, so it
//! lives here rather than behind `#[cfg(test)]`.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use shade_traits::clock::Clock;
use shade_traits::{Actuator, StateSink};

use crate::interlock::Channel;
use crate::status::CoverSnapshot;

/// Deterministic clock whose time is advanced manually.
///
/// now() = origin + offset; sleep(d) advances internal time by d
/// without actually sleeping.
#[derive(Debug, Clone)]
pub struct ManualClock {
    origin: Instant,
    offset: Arc<Mutex<Duration>>,
}

impl Default for ManualClock {
    fn default() -> Self {
        Self::new()
    }
}

impl ManualClock {
    pub fn new() -> Self {
        Self {
            origin: Instant::now(),
            offset: Arc::new(Mutex::new(Duration::ZERO)),
        }
    }

    /// Advance the clock by the given duration.
    pub fn advance(&self, d: Duration) {
        if let Ok(mut off) = self.offset.lock() {
            *off = off.saturating_add(d);
        }
    }
}

impl Clock for ManualClock {
    fn now(&self) -> Instant {
        let off = self.offset.lock().map(|g| *g).unwrap_or(Duration::ZERO);
        self.origin + off
    }

    fn sleep(&self, d: Duration) {
        self.advance(d);
    }
}

/// Chronological record of relay writes, shared by both spy actuators
/// of a cover so command sequencing can be replayed in order.
pub type RelayLog = Arc<Mutex<Vec<(Channel, bool)>>>;

/// Actuator double that records every write and mirrors it in a shared
/// state flag readable by observers and assertions.
pub struct SpyActuator {
    channel: Channel,
    state: Arc<AtomicBool>,
    log: RelayLog,
}

impl SpyActuator {
    pub fn new(channel: Channel, log: RelayLog) -> Self {
        Self {
            channel,
            state: Arc::new(AtomicBool::new(false)),
            log,
        }
    }

    /// Shared view of the relay state, for switch probes and tests.
    pub fn state_handle(&self) -> Arc<AtomicBool> {
        self.state.clone()
    }
}

impl Actuator for SpyActuator {
    fn is_active(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(self.state.load(Ordering::SeqCst))
    }

    fn set_active(
        &mut self,
        active: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        self.state.store(active, Ordering::SeqCst);
        if let Ok(mut log) = self.log.lock() {
            log.push((self.channel, active));
        }
        Ok(())
    }
}

/// Actuator that rejects every write; reads as inactive.
pub struct FailingActuator;

impl Actuator for FailingActuator {
    fn is_active(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        Ok(false)
    }

    fn set_active(
        &mut self,
        _active: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        Err(Box::new(std::io::Error::other("relay write refused")))
    }
}

/// Replay a relay log and verify the interlock invariant: at no point
/// are both channels active.
pub fn never_both_active(log: &[(Channel, bool)]) -> bool {
    let mut up = false;
    let mut down = false;
    for (channel, active) in log {
        match channel {
            Channel::Up => up = *active,
            Channel::Down => down = *active,
        }
        if up && down {
            return false;
        }
    }
    true
}

/// Sink that discards published state.
pub struct NullSink;

impl StateSink for NullSink {
    fn publish(&mut self, _position: u8, _tilt: Option<u8>, _opening: bool, _closing: bool) {}
}

/// Sink that records every published snapshot for inspection.
#[derive(Default)]
pub struct RecordingSink {
    snapshots: Arc<Mutex<Vec<CoverSnapshot>>>,
}

impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn handle(&self) -> Arc<Mutex<Vec<CoverSnapshot>>> {
        self.snapshots.clone()
    }
}

impl StateSink for RecordingSink {
    fn publish(&mut self, position: u8, tilt: Option<u8>, opening: bool, closing: bool) {
        if let Ok(mut snaps) = self.snapshots.lock() {
            snaps.push(CoverSnapshot {
                position,
                tilt,
                opening,
                closing,
            });
        }
    }
}
