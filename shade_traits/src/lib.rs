pub mod clock;

pub use clock::{Clock, MonotonicClock};

/// One of the two opposing relay outputs that drive the cover motor
/// (or the host-platform switch entity standing in for it).
pub trait Actuator {
    fn is_active(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>>;
    fn set_active(
        &mut self,
        active: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>>;
}

/// Outward state push. Fire-and-forget: implementations must not fail
/// and must not block the tick handler.
pub trait StateSink {
    /// `position`/`tilt` are percentages in [0, 100]; `tilt` is `None`
    /// for covers without tilt support.
    fn publish(&mut self, position: u8, tilt: Option<u8>, opening: bool, closing: bool);
}

impl<T: Actuator + ?Sized> Actuator for Box<T> {
    fn is_active(&mut self) -> Result<bool, Box<dyn std::error::Error + Send + Sync>> {
        (**self).is_active()
    }

    fn set_active(
        &mut self,
        active: bool,
    ) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
        (**self).set_active(active)
    }
}

impl<T: StateSink + ?Sized> StateSink for Box<T> {
    fn publish(&mut self, position: u8, tilt: Option<u8>, opening: bool, closing: bool) {
        (**self).publish(position, tilt, opening, closing)
    }
}
