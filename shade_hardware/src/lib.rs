pub mod error;

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use shade_traits::Actuator;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Simulated relay actuator. The switch state lives behind a shared
/// atomic so tests and probe threads can observe or flip it.
pub struct SimulatedActuator {
    name: &'static str,
    state: Arc<AtomicBool>,
}

impl SimulatedActuator {
    pub fn new(name: &'static str) -> Self {
        SimulatedActuator {
            name,
            state: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Handle onto the relay state, e.g. to fake a wall-switch press.
    pub fn state_handle(&self) -> Arc<AtomicBool> {
        self.state.clone()
    }
}

impl Actuator for SimulatedActuator {
    fn is_active(&mut self) -> Result<bool, BoxError> {
        Ok(self.state.load(Ordering::SeqCst))
    }

    fn set_active(&mut self, active: bool) -> Result<(), BoxError> {
        self.state.store(active, Ordering::SeqCst);
        tracing::debug!(relay = self.name, active, "relay write (simulated)");
        Ok(())
    }
}

#[cfg(feature = "hardware")]
pub use gpio::GpioRelay;

#[cfg(feature = "hardware")]
mod gpio {
    use super::BoxError;
    use crate::error::HwError;
    use rppal::gpio::{Gpio, OutputPin};
    use shade_traits::Actuator;

    /// Active-high relay on a single GPIO output pin.
    pub struct GpioRelay {
        pin: OutputPin,
    }

    impl GpioRelay {
        pub fn new(bcm_pin: u8) -> Result<Self, HwError> {
            let gpio = Gpio::new().map_err(|e| HwError::Gpio(e.to_string()))?;
            let mut pin = gpio
                .get(bcm_pin)
                .map_err(|e| HwError::Gpio(e.to_string()))?
                .into_output();
            // Relays must come up released.
            pin.set_low();
            Ok(GpioRelay { pin })
        }
    }

    impl Actuator for GpioRelay {
        fn is_active(&mut self) -> Result<bool, BoxError> {
            Ok(self.pin.is_set_high())
        }

        fn set_active(&mut self, active: bool) -> Result<(), BoxError> {
            if active {
                self.pin.set_high();
            } else {
                self.pin.set_low();
            }
            tracing::debug!(pin = self.pin.pin(), active, "relay write");
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simulated_actuator_round_trips_state() {
        let mut relay = SimulatedActuator::new("up");
        assert!(!relay.is_active().unwrap());
        relay.set_active(true).unwrap();
        assert!(relay.is_active().unwrap());
        relay.set_active(false).unwrap();
        assert!(!relay.is_active().unwrap());
    }

    #[test]
    fn state_handle_observes_external_flips() {
        let mut relay = SimulatedActuator::new("down");
        let handle = relay.state_handle();
        handle.store(true, Ordering::SeqCst);
        assert!(relay.is_active().unwrap());
    }
}
