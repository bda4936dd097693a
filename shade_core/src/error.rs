use thiserror::Error;

#[derive(Debug, Error, Clone)]
pub enum CoverError {
    #[error("actuator command failed: {0}")]
    Actuator(String),
    #[error("actuator fault: {0}")]
    ActuatorFault(String),
    #[error("configuration error: {0}")]
    Config(String),
    #[error("invalid state: {0}")]
    State(String),
    #[error("travel exceeded the runtime cap")]
    MaxRuntime,
}

#[derive(Debug, Error, Clone)]
pub enum BuildError {
    #[error("missing up actuator")]
    MissingUpActuator,
    #[error("missing down actuator")]
    MissingDownActuator,
    #[error("invalid config: {0}")]
    InvalidConfig(&'static str),
}

pub type Result<T> = eyre::Result<T>;
pub use eyre::Report;
