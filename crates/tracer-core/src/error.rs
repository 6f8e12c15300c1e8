use thiserror::Error;

/// Errors raised by the case and path model.
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("Invalid endpoint: {which} address must not be empty")]
    InvalidEndpoint { which: &'static str },

    #[error("Position {position} is out of range (valid: {min}..={max})")]
    PositionOutOfRange {
        position: usize,
        min: usize,
        max: usize,
    },

    #[error("Validation failed: {0}")]
    Validation(String),

    #[error("Configuration error: {0}")]
    Config(#[from] config::ConfigError),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, CoreError>;
