use thiserror::Error;

/// Errors from the subscriber directory.
#[derive(Debug, Error)]
pub enum SubscriberError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, SubscriberError>;
