//! External switch reconciliation.
//!
//! A physical wall switch can drive the same two relays directly,
//! bypassing this controller. `SwitchProbe` watches the actuator states
//! from a background thread and feeds transitions through a bounded
//! channel; `ExternalSwitchObserver` drains them on each tick and
//! reconciles the cover state machine. Writes issued by our own
//! interlock are tagged at capture time via the shared self-drive flag,
//! so they update bookkeeping without triggering policy (no feedback
//! loop).
//!
//! Each `SwitchProbe` spawns exactly one thread that is shut down when
//! the probe is dropped.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use crossbeam_channel as xch;
use shade_traits::Actuator;
use shade_traits::clock::Clock;

use crate::cover::CoverStateMachine;
use crate::error::Result;
use crate::interlock::Channel;
use shade_traits::StateSink;

/// Origin of a switch transition, tagged when the event is captured.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Origin {
    /// Written by our own interlock during a command sequence.
    SelfIssued,
    /// Anything else: wall switch, host automation, another controller.
    External,
}

/// One observed actuator state transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SwitchEvent {
    pub channel: Channel,
    pub active: bool,
    pub origin: Origin,
}

/// Reconciles unsolicited actuator transitions into the state machine.
///
/// Policy:
/// - both inputs active, or both inactive while traveling: fail-safe stop
///   (contradictory or released signal);
/// - exactly one input active: mirror the corresponding travel;
/// - self-issued events update the tracked switch states only.
pub struct ExternalSwitchObserver {
    events: xch::Receiver<SwitchEvent>,
    up_active: bool,
    down_active: bool,
}

impl ExternalSwitchObserver {
    pub fn new(events: xch::Receiver<SwitchEvent>) -> Self {
        Self {
            events,
            up_active: false,
            down_active: false,
        }
    }

    /// Drain all pending events without blocking and apply the policy.
    pub fn reconcile<A: Actuator, P: StateSink>(
        &mut self,
        cover: &mut CoverStateMachine<A, P>,
    ) -> Result<()> {
        while let Ok(event) = self.events.try_recv() {
            self.apply_event(cover, event)?;
        }
        Ok(())
    }

    fn apply_event<A: Actuator, P: StateSink>(
        &mut self,
        cover: &mut CoverStateMachine<A, P>,
        event: SwitchEvent,
    ) -> Result<()> {
        match event.channel {
            Channel::Up => self.up_active = event.active,
            Channel::Down => self.down_active = event.active,
        }
        if event.origin == Origin::SelfIssued {
            return Ok(());
        }
        tracing::debug!(?event, "external switch transition");

        match (self.up_active, self.down_active) {
            (true, true) => {
                // Contradictory signal: fail safe.
                cover.stop()
            }
            (false, false) => {
                // Released while moving: external stop request.
                if cover.is_traveling() {
                    cover.stop()
                } else {
                    Ok(())
                }
            }
            (true, false) => cover.open(),
            (false, true) => cover.close(),
        }
    }
}

/// Background poller that turns raw actuator states into `SwitchEvent`s.
pub struct SwitchProbe {
    events: xch::Receiver<SwitchEvent>,
    shutdown: Arc<AtomicBool>,
    join_handle: Option<std::thread::JoinHandle<()>>,
}

impl SwitchProbe {
    /// Spawn the probe thread. `self_drive` is the interlock's flag; it
    /// is sampled at capture time to tag each event's origin.
    pub fn spawn<A, C>(
        mut up: A,
        mut down: A,
        self_drive: Arc<AtomicBool>,
        interval: Duration,
        clock: C,
    ) -> Self
    where
        A: Actuator + Send + 'static,
        C: Clock + Send + Sync + 'static,
    {
        let (tx, rx) = xch::bounded(16);
        let shutdown = Arc::new(AtomicBool::new(false));
        let shutdown_flag = shutdown.clone();

        let join_handle = std::thread::spawn(move || {
            let mut last_up = false;
            let mut last_down = false;
            loop {
                if shutdown_flag.load(Ordering::Relaxed) {
                    break;
                }

                for (channel, actuator, last) in [
                    (Channel::Up, &mut up, &mut last_up),
                    (Channel::Down, &mut down, &mut last_down),
                ] {
                    match actuator.is_active() {
                        Ok(active) if active != *last => {
                            *last = active;
                            let origin = if self_drive.load(Ordering::SeqCst) {
                                Origin::SelfIssued
                            } else {
                                Origin::External
                            };
                            let event = SwitchEvent {
                                channel,
                                active,
                                origin,
                            };
                            if tx.send(event).is_err() {
                                tracing::debug!("switch probe consumer disconnected");
                                return;
                            }
                        }
                        Ok(_) => {}
                        Err(e) => {
                            tracing::warn!(error = %e, ?channel, "switch probe read failed");
                        }
                    }
                }

                if shutdown_flag.load(Ordering::Relaxed) {
                    break;
                }
                clock.sleep(interval);
            }
            tracing::trace!("switch probe thread exiting");
        });

        Self {
            events: rx,
            shutdown,
            join_handle: Some(join_handle),
        }
    }

    pub fn events(&self) -> xch::Receiver<SwitchEvent> {
        self.events.clone()
    }
}

impl Drop for SwitchProbe {
    fn drop(&mut self) {
        self.shutdown.store(true, Ordering::Relaxed);
        if let Some(handle) = self.join_handle.take()
            && let Err(e) = handle.join()
        {
            tracing::warn!(?e, "switch probe thread panicked during shutdown");
        }
    }
}
