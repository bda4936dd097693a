//! Mapping of boxed actuator errors into typed `CoverError`s.

use crate::error::CoverError;

/// Map a boxed error from the `Actuator` seam to a `CoverError`.
/// With the `hardware-errors` feature, `shade_hardware::HwError` values
/// are downcast for a precise fault classification; anything else is
/// reported as a plain actuator command failure.
pub fn map_actuator_error(e: &(dyn std::error::Error + Send + Sync + 'static)) -> CoverError {
    #[cfg(feature = "hardware-errors")]
    if let Some(hw) = e.downcast_ref::<shade_hardware::error::HwError>() {
        return match hw {
            shade_hardware::error::HwError::Fault(msg) => CoverError::ActuatorFault(msg.clone()),
            other => CoverError::Actuator(other.to_string()),
        };
    }
    CoverError::Actuator(e.to_string())
}
