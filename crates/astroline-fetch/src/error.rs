use thiserror::Error;

use crate::retry::Retryable;

/// Errors from one fetch attempt against the upstream source.
///
/// An empty parse result is NOT an error — the adapter returns empty
/// content and consumers treat it as "not ready".
#[derive(Debug, Error)]
pub enum FetchError {
    /// Connection, timeout or protocol failure below the HTTP status line.
    #[error("HTTP transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// Upstream answered with a non-success status.
    #[error("Upstream returned HTTP {status}")]
    Status { status: u16 },
}

impl Retryable for FetchError {
    fn is_transient(&self) -> bool {
        match self {
            // Timeouts and connection-level failures are worth another try;
            // anything else from reqwest (bad URL, decode) is permanent.
            FetchError::Transport(e) => e.is_timeout() || e.is_connect(),
            // 5xx means the site hiccuped; 4xx means our request is wrong.
            FetchError::Status { status } => *status >= 500,
        }
    }
}

pub type Result<T> = std::result::Result<T, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_errors_are_transient() {
        assert!(FetchError::Status { status: 500 }.is_transient());
        assert!(FetchError::Status { status: 503 }.is_transient());
    }

    #[test]
    fn client_errors_are_permanent() {
        assert!(!FetchError::Status { status: 404 }.is_transient());
        assert!(!FetchError::Status { status: 403 }.is_transient());
    }
}
