use thiserror::Error;

/// Errors shared across the astroline crates.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown zodiac sign: {0}")]
    UnknownSign(String),

    #[error("Unknown period: {0}")]
    UnknownPeriod(String),

    #[error("Invalid UTC offset: {0}")]
    InvalidOffset(String),

    #[error("Invalid notification time: {0}")]
    InvalidNotifyTime(String),
}

pub type Result<T> = std::result::Result<T, CoreError>;
