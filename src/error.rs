use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ActuatorError {
    #[error("unknown key label `{0}`")]
    UnknownKey(String),
    #[error("input worker is no longer running")]
    Disconnected,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    #[error("a macro is already playing")]
    AlreadyPlaying,
    #[error(transparent)]
    Actuator(#[from] ActuatorError),
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read settings: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed settings: {0}")]
    Parse(#[from] serde_json::Error),
    #[error(transparent)]
    Invalid(#[from] EngineError),
}
