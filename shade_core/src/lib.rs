#![cfg_attr(all(not(debug_assertions), not(test)), deny(warnings))]
#![cfg_attr(
    all(not(debug_assertions), not(test)),
    deny(clippy::all, clippy::pedantic, clippy::nursery)
)]
#![allow(clippy::module_name_repetitions, clippy::missing_errors_doc)]
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
//! Core cover control logic (hardware-agnostic).
//!
//! Estimates and controls the position of a motorized window covering
//! that has no position feedback: only two opposing relays and elapsed
//! travel time. All hardware interaction goes through the
//! `shade_traits::Actuator` and `shade_traits::StateSink` seams.
//!
//! ## Architecture
//!
//! - **Estimation**: open-loop travel timing per axis (`travel` module)
//! - **Interlock**: release / dead-time / engage relay sequencing
//!   (`interlock` module)
//! - **State machine**: intents, tilt coupling, arrival auto-stop
//!   (`cover` module)
//! - **Observation**: external switch reconciliation (`observer` module)
//! - **Automation**: environment rules on the coarse tick
//!   (`automation` module)
//! - **Orchestration**: blocking poll loop with a runtime cap
//!   (`runner` module)

pub mod automation;
pub mod builder;
pub mod config;
pub mod cover;
pub mod error;
pub mod hw_error;
pub mod interlock;
pub mod mocks;
pub mod observer;
pub mod runner;
pub mod status;
pub mod travel;

pub use automation::{AutomationAction, EnvironmentSignals};
pub use builder::{Cover, CoverBuilder};
pub use config::{AutomationCfg, DriveCfg, TiltCfg};
pub use cover::CoverStateMachine;
pub use error::{BuildError, CoverError, Result};
pub use interlock::{ActuatorInterlock, Channel, DriveCommand};
pub use observer::{ExternalSwitchObserver, Origin, SwitchEvent, SwitchProbe};
pub use status::{CoverSnapshot, TickStatus};
pub use travel::{Direction, POSITION_CLOSED, POSITION_OPEN, PositionKind, TravelEstimator};
