//! One-shot announcement to every active subscriber.
//!
//! Used for service notices outside the scheduled delivery path. Sends are
//! strictly sequential with a pause between them so the transport's flood
//! limits are never hit; blocked recipients are deactivated the same way
//! the executor does it.

use std::time::Duration;

use tracing::{error, info, warn};

use astroline_subscribers::{SubscriberManager, SubscriberPatch};

use crate::transport::{SendError, Transport};

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct BroadcastReport {
    pub sent: usize,
    pub blocked: usize,
    pub failed: usize,
}

/// Send `text` (plain, no markup) to every active subscriber.
pub async fn broadcast(
    subscribers: &SubscriberManager,
    transport: &dyn Transport,
    text: &str,
    pause: Duration,
) -> BroadcastReport {
    let ids = match subscribers.list_active_ids() {
        Ok(ids) => ids,
        Err(e) => {
            error!(error = %e, "broadcast aborted: cannot list subscribers");
            return BroadcastReport::default();
        }
    };
    info!(recipients = ids.len(), "broadcast starting");

    let mut report = BroadcastReport::default();
    for id in ids {
        match transport.send(id, text, false).await {
            Ok(()) => report.sent += 1,
            Err(SendError::PermanentReject(reason)) => {
                warn!(subscriber_id = id, %reason, "recipient unreachable — deactivating");
                if let Err(e) = subscribers.update(id, &SubscriberPatch::deactivate()) {
                    error!(subscriber_id = id, error = %e, "failed to deactivate subscriber");
                }
                report.blocked += 1;
            }
            Err(SendError::Transient(reason)) => {
                error!(subscriber_id = id, %reason, "broadcast send failed");
                report.failed += 1;
            }
        }
        if !pause.is_zero() {
            tokio::time::sleep(pause).await;
        }
    }

    info!(
        sent = report.sent,
        blocked = report.blocked,
        failed = report.failed,
        "broadcast finished"
    );
    report
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use rusqlite::Connection;
    use std::sync::Mutex;

    /// Rejects a fixed set of recipients, accepts the rest.
    struct SelectiveTransport {
        blocked: Vec<i64>,
        sent: Mutex<Vec<i64>>,
    }

    #[async_trait]
    impl Transport for SelectiveTransport {
        async fn send(&self, recipient: i64, _text: &str, markdown: bool) -> Result<(), SendError> {
            assert!(!markdown, "broadcasts are plain text");
            if self.blocked.contains(&recipient) {
                Err(SendError::PermanentReject("blocked".to_string()))
            } else {
                self.sent.lock().unwrap().push(recipient);
                Ok(())
            }
        }
    }

    #[tokio::test]
    async fn broadcast_reaches_active_subscribers_and_deactivates_blocked() {
        let subscribers = SubscriberManager::new(Connection::open_in_memory().unwrap()).unwrap();
        for id in [1, 2, 3, 4] {
            subscribers.update(id, &SubscriberPatch::default()).unwrap();
        }
        subscribers.update(4, &SubscriberPatch::deactivate()).unwrap();

        let transport = SelectiveTransport {
            blocked: vec![2],
            sent: Mutex::new(Vec::new()),
        };

        let report = broadcast(&subscribers, &transport, "service notice", Duration::ZERO).await;
        assert_eq!(
            report,
            BroadcastReport {
                sent: 2,
                blocked: 1,
                failed: 0
            }
        );

        // Recipient 2 was deactivated; 4 was never contacted.
        assert!(!subscribers.get(2).unwrap().unwrap().is_active);
        let sent = transport.sent.lock().unwrap().clone();
        assert!(!sent.contains(&4));
    }
}
