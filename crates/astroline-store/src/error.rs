use thiserror::Error;

/// Errors from the content store.
///
/// "No record for this key" is not an error — lookups return `Ok(None)`.
/// Callers must not conflate the two.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite / rusqlite error.
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),
}

pub type Result<T> = std::result::Result<T, StoreError>;
