use async_trait::async_trait;
use thiserror::Error;

/// How a send failed, as far as the delivery core cares.
///
/// Permanent means the recipient can never be reached again (blocked the
/// bot, deleted the account) — the sole trigger for auto-deactivation.
/// Everything else is transient and naturally retried at the next fire.
#[derive(Debug, Error)]
pub enum SendError {
    #[error("recipient permanently unreachable: {0}")]
    PermanentReject(String),

    #[error("transient send failure: {0}")]
    Transient(String),
}

/// The message-transport collaborator.
///
/// `markdown` requests the transport's inline-emphasis formatting mode;
/// the renderer's output is written against that subset.
#[async_trait]
pub trait Transport: Send + Sync {
    async fn send(&self, recipient: i64, text: &str, markdown: bool) -> Result<(), SendError>;
}
