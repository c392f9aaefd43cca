use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use astroline_core::Period;
use astroline_scheduler::FiredJob;
use astroline_store::ContentStore;
use astroline_subscribers::{SubscriberManager, SubscriberPatch};

use crate::render::render;
use crate::transport::{SendError, Transport};

/// What one fire amounted to. Returned for observability and tests; the
/// executor itself never propagates a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FireOutcome {
    /// Unknown, inactive or unconfigured subscriber — silent no-op.
    Skipped,
    /// Message handed to the transport.
    Delivered,
    /// Transport reported a permanent rejection; subscriber deactivated.
    Deactivated,
    /// Transient failure — the next scheduled fire is the retry boundary.
    Failed,
}

/// Consumes fired jobs and delivers the day's horoscope to each subscriber.
pub struct DeliveryExecutor {
    subscribers: Arc<SubscriberManager>,
    store: Arc<ContentStore>,
    transport: Arc<dyn Transport>,
}

impl DeliveryExecutor {
    pub fn new(
        subscribers: Arc<SubscriberManager>,
        store: Arc<ContentStore>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            subscribers,
            store,
            transport,
        }
    }

    /// Background task: drain the engine's fired-job channel for the
    /// lifetime of the process.
    ///
    /// Each fire runs in its own spawned task so one slow send never delays
    /// other subscribers' on-time deliveries.
    pub async fn run(self: Arc<Self>, mut fired_rx: mpsc::Receiver<FiredJob>) {
        while let Some(fired) = fired_rx.recv().await {
            let executor = Arc::clone(&self);
            tokio::spawn(async move {
                executor.handle_fire(fired.subscriber_id).await;
            });
        }
        info!("delivery executor exiting (channel closed)");
    }

    /// One fire: load subscriber → load content → render → send.
    ///
    /// Every failure is contained here. A permanent rejection deactivates
    /// the subscriber; the job itself stays registered and the next fire
    /// no-ops on the inactive guard.
    pub async fn handle_fire(&self, subscriber_id: i64) -> FireOutcome {
        let subscriber = match self.subscribers.get(subscriber_id) {
            Ok(Some(s)) => s,
            Ok(None) => {
                debug!(subscriber_id, "fire for unknown subscriber — skipping");
                return FireOutcome::Skipped;
            }
            Err(e) => {
                error!(subscriber_id, error = %e, "subscriber lookup failed");
                return FireOutcome::Failed;
            }
        };
        if !subscriber.is_active {
            debug!(subscriber_id, "subscriber is inactive — skipping");
            return FireOutcome::Skipped;
        }
        let Some(sign) = subscriber.sign else {
            debug!(subscriber_id, "subscriber has no sign configured — skipping");
            return FireOutcome::Skipped;
        };

        // The recurring path is daily-only; other periods are fetched on
        // demand outside the scheduled path.
        let record = match self.store.latest(sign, Period::Daily) {
            Ok(r) => r,
            Err(e) => {
                error!(subscriber_id, %sign, error = %e, "content lookup failed");
                return FireOutcome::Failed;
            }
        };

        let message = render(record.as_ref(), sign, Period::Daily);
        match self.transport.send(subscriber_id, &message, true).await {
            Ok(()) => {
                info!(subscriber_id, %sign, "daily horoscope delivered");
                FireOutcome::Delivered
            }
            Err(SendError::PermanentReject(reason)) => {
                warn!(subscriber_id, %reason, "recipient unreachable — deactivating");
                if let Err(e) = self
                    .subscribers
                    .update(subscriber_id, &SubscriberPatch::deactivate())
                {
                    error!(subscriber_id, error = %e, "failed to deactivate subscriber");
                }
                FireOutcome::Deactivated
            }
            Err(SendError::Transient(reason)) => {
                error!(
                    subscriber_id,
                    %reason,
                    "delivery failed; the next scheduled fire will retry"
                );
                FireOutcome::Failed
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use astroline_core::Sign;
    use astroline_store::{HoroscopeContent, HoroscopeRecord, Section};
    use async_trait::async_trait;
    use rusqlite::Connection;
    use std::sync::Mutex;

    #[derive(Clone, Copy)]
    enum Behaviour {
        Ok,
        Reject,
        Flaky,
    }

    struct FakeTransport {
        behaviour: Behaviour,
        sent: Mutex<Vec<(i64, String)>>,
    }

    impl FakeTransport {
        fn new(behaviour: Behaviour) -> Arc<Self> {
            Arc::new(Self {
                behaviour,
                sent: Mutex::new(Vec::new()),
            })
        }

        fn sent(&self) -> Vec<(i64, String)> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Transport for FakeTransport {
        async fn send(&self, recipient: i64, text: &str, _markdown: bool) -> Result<(), SendError> {
            match self.behaviour {
                Behaviour::Ok => {
                    self.sent.lock().unwrap().push((recipient, text.to_string()));
                    Ok(())
                }
                Behaviour::Reject => Err(SendError::PermanentReject("blocked".to_string())),
                Behaviour::Flaky => Err(SendError::Transient("network".to_string())),
            }
        }
    }

    fn subsystems() -> (Arc<SubscriberManager>, Arc<ContentStore>) {
        let subscribers =
            Arc::new(SubscriberManager::new(Connection::open_in_memory().unwrap()).unwrap());
        let store = Arc::new(ContentStore::new(Connection::open_in_memory().unwrap()).unwrap());
        (subscribers, store)
    }

    fn configured_subscriber(subscribers: &SubscriberManager, id: i64, sign: Sign) {
        subscribers
            .update(
                id,
                &SubscriberPatch {
                    sign: Some(sign),
                    offset: Some("UTC+3".parse().unwrap()),
                    notify_at: Some("09:00".parse().unwrap()),
                    ..Default::default()
                },
            )
            .unwrap();
    }

    #[tokio::test]
    async fn unknown_subscriber_is_a_silent_no_op() {
        let (subscribers, store) = subsystems();
        let transport = FakeTransport::new(Behaviour::Ok);
        let executor = DeliveryExecutor::new(subscribers, store, transport.clone());

        assert_eq!(executor.handle_fire(404).await, FireOutcome::Skipped);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn inactive_subscriber_is_skipped_without_sending() {
        let (subscribers, store) = subsystems();
        configured_subscriber(&subscribers, 1, Sign::Leo);
        subscribers.update(1, &SubscriberPatch::deactivate()).unwrap();

        let transport = FakeTransport::new(Behaviour::Ok);
        let executor = DeliveryExecutor::new(subscribers, store, transport.clone());

        assert_eq!(executor.handle_fire(1).await, FireOutcome::Skipped);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn subscriber_without_sign_is_skipped() {
        let (subscribers, store) = subsystems();
        subscribers.update(2, &SubscriberPatch::default()).unwrap();

        let transport = FakeTransport::new(Behaviour::Ok);
        let executor = DeliveryExecutor::new(subscribers, store, transport.clone());

        assert_eq!(executor.handle_fire(2).await, FireOutcome::Skipped);
        assert!(transport.sent().is_empty());
    }

    #[tokio::test]
    async fn missing_content_delivers_the_not_ready_message() {
        let (subscribers, store) = subsystems();
        configured_subscriber(&subscribers, 3, Sign::Virgo);

        let transport = FakeTransport::new(Behaviour::Ok);
        let executor = DeliveryExecutor::new(subscribers, store, transport.clone());

        assert_eq!(executor.handle_fire(3).await, FireOutcome::Delivered);
        let sent = transport.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].1.contains("not ready yet"));
        assert!(sent[0].1.contains("Virgo"));
    }

    #[tokio::test]
    async fn delivers_the_latest_daily_record() {
        let (subscribers, store) = subsystems();
        configured_subscriber(&subscribers, 4, Sign::Leo);
        store
            .upsert(&HoroscopeRecord::new(
                Sign::Leo,
                Period::Daily,
                "2024-06-02".parse().unwrap(),
                HoroscopeContent {
                    general_text: Some("Good day".to_string()),
                    business: Section {
                        text: Some("Profit".to_string()),
                        rating: None,
                    },
                    love: Section {
                        text: Some(String::new()),
                        rating: None,
                    },
                    ..Default::default()
                },
            ))
            .unwrap();

        let transport = FakeTransport::new(Behaviour::Ok);
        let executor = DeliveryExecutor::new(subscribers, store, transport.clone());

        assert_eq!(executor.handle_fire(4).await, FireOutcome::Delivered);
        let sent = transport.sent();
        assert_eq!(sent[0].0, 4);
        assert!(sent[0].1.contains("Good day"));
        assert!(sent[0].1.contains("Business"));
        assert!(!sent[0].1.contains("Love"));
    }

    #[tokio::test]
    async fn permanent_reject_deactivates_without_raising() {
        let (subscribers, store) = subsystems();
        configured_subscriber(&subscribers, 5, Sign::Leo);

        let transport = FakeTransport::new(Behaviour::Reject);
        let executor = DeliveryExecutor::new(subscribers.clone(), store, transport);

        assert_eq!(executor.handle_fire(5).await, FireOutcome::Deactivated);
        assert!(!subscribers.get(5).unwrap().unwrap().is_active);
    }

    #[tokio::test]
    async fn transient_failure_leaves_the_subscriber_active() {
        let (subscribers, store) = subsystems();
        configured_subscriber(&subscribers, 6, Sign::Leo);

        let transport = FakeTransport::new(Behaviour::Flaky);
        let executor = DeliveryExecutor::new(subscribers.clone(), store, transport);

        assert_eq!(executor.handle_fire(6).await, FireOutcome::Failed);
        assert!(subscribers.get(6).unwrap().unwrap().is_active);
    }
}
