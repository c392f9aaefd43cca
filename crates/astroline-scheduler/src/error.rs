use thiserror::Error;

/// Errors that can occur within the scheduler subsystem.
#[derive(Debug, Error)]
pub enum SchedulerError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// The trigger time or offset is out of range.
    #[error("Invalid schedule: {0}")]
    InvalidSchedule(String),

    /// No job exists for this subscriber.
    #[error("No delivery job for subscriber {subscriber_id}")]
    JobNotFound { subscriber_id: i64 },
}

pub type Result<T> = std::result::Result<T, SchedulerError>;
