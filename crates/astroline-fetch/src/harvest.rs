//! One fetch-and-store sweep over the full sign universe for one period.
//!
//! Concurrency is capped by a counting gate; after each attempt the task
//! keeps its slot through a randomized pause so the aggregate request rate
//! stays low regardless of the gate size. Failures are contained per sign —
//! every sign is attempted exactly once per pass.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use rand::Rng;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{error, info, warn};

use astroline_core::config::HarvestConfig;
use astroline_core::{Period, Sign, TimeZoneOffset};
use astroline_store::{ContentStore, HoroscopeRecord};

use crate::client::HoroscopeSource;

/// Aggregate result of one harvest pass.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct HarvestSummary {
    /// Signs whose content was fetched and stored.
    pub stored: usize,
    /// Signs the upstream had no content for yet.
    pub empty: usize,
    /// Signs whose fetch or store failed.
    pub failed: usize,
}

enum Outcome {
    Stored,
    Empty,
    Failed,
}

/// Runs harvest passes against a source and a store.
pub struct HarvestCoordinator {
    source: Arc<dyn HoroscopeSource>,
    store: Arc<ContentStore>,
    concurrency: usize,
    pause_min: u64,
    pause_max: u64,
    /// Publication zone of the upstream site — effective dates are computed
    /// on this clock.
    reference: TimeZoneOffset,
}

impl HarvestCoordinator {
    pub fn new(
        source: Arc<dyn HoroscopeSource>,
        store: Arc<ContentStore>,
        config: &HarvestConfig,
        reference: TimeZoneOffset,
    ) -> Self {
        Self {
            source,
            store,
            concurrency: config.concurrency.max(1),
            pause_min: config.pause_min_secs,
            pause_max: config.pause_max_secs.max(config.pause_min_secs),
            reference,
        }
    }

    /// Fetch and store every sign for `period`. Per-sign failures are
    /// logged and counted, never propagated — the pass always completes.
    pub async fn harvest_all(&self, period: Period) -> HarvestSummary {
        info!(%period, "harvest pass starting");
        let gate = Arc::new(Semaphore::new(self.concurrency));
        let mut tasks = JoinSet::new();

        for sign in Sign::ALL {
            let source = Arc::clone(&self.source);
            let store = Arc::clone(&self.store);
            let gate = Arc::clone(&gate);
            let reference = self.reference;
            let (pause_min, pause_max) = (self.pause_min, self.pause_max);

            tasks.spawn(async move {
                let _permit = match gate.acquire_owned().await {
                    Ok(p) => p,
                    Err(_) => return Outcome::Failed,
                };
                let outcome = harvest_one(&*source, &store, sign, period, reference).await;
                // Hold the slot through the pause so each task's own request
                // cadence stays human-paced.
                let pause = random_pause(pause_min, pause_max);
                if !pause.is_zero() {
                    tokio::time::sleep(pause).await;
                }
                outcome
            });
        }

        let mut summary = HarvestSummary::default();
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Outcome::Stored) => summary.stored += 1,
                Ok(Outcome::Empty) => summary.empty += 1,
                Ok(Outcome::Failed) => summary.failed += 1,
                Err(e) => {
                    error!(error = %e, "harvest task panicked");
                    summary.failed += 1;
                }
            }
        }

        info!(
            %period,
            stored = summary.stored,
            empty = summary.empty,
            failed = summary.failed,
            "harvest pass finished"
        );
        summary
    }
}

async fn harvest_one(
    source: &dyn HoroscopeSource,
    store: &ContentStore,
    sign: Sign,
    period: Period,
    reference: TimeZoneOffset,
) -> Outcome {
    match source.fetch(sign, period).await {
        Ok(content) if content.is_ready() => {
            let today = Utc::now()
                .with_timezone(&reference.to_fixed_offset())
                .date_naive();
            let date = period.effective_date(today);
            let record = HoroscopeRecord::new(sign, period, date, content);
            match store.upsert(&record) {
                Ok(()) => {
                    info!(%sign, %period, %date, "horoscope harvested");
                    Outcome::Stored
                }
                Err(e) => {
                    error!(%sign, %period, error = %e, "failed to store harvested horoscope");
                    Outcome::Failed
                }
            }
        }
        Ok(_) => {
            warn!(%sign, %period, "upstream has no content for this period yet");
            Outcome::Empty
        }
        Err(e) => {
            error!(%sign, %period, error = %e, "fetch failed");
            Outcome::Failed
        }
    }
}

fn random_pause(min_secs: u64, max_secs: u64) -> Duration {
    if max_secs == 0 {
        return Duration::ZERO;
    }
    let secs: f64 = rand::thread_rng().gen_range(min_secs as f64..=max_secs as f64);
    Duration::from_secs_f64(secs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::FetchError;
    use astroline_store::HoroscopeContent;
    use async_trait::async_trait;
    use rusqlite::Connection;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn quiet_config(concurrency: usize) -> HarvestConfig {
        HarvestConfig {
            concurrency,
            pause_min_secs: 0,
            pause_max_secs: 0,
            utc_hour: 0,
        }
    }

    fn mem_store() -> Arc<ContentStore> {
        Arc::new(ContentStore::new(Connection::open_in_memory().unwrap()).unwrap())
    }

    fn ready_content(text: &str) -> HoroscopeContent {
        HoroscopeContent {
            general_text: Some(text.to_string()),
            ..Default::default()
        }
    }

    /// Tracks the peak number of concurrently in-flight fetches.
    struct GateProbe {
        in_flight: AtomicUsize,
        peak: AtomicUsize,
    }

    #[async_trait]
    impl HoroscopeSource for GateProbe {
        async fn fetch(&self, _sign: Sign, _period: Period) -> crate::error::Result<HoroscopeContent> {
            let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
            self.peak.fetch_max(now, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            self.in_flight.fetch_sub(1, Ordering::SeqCst);
            Ok(HoroscopeContent::default())
        }
    }

    #[tokio::test]
    async fn gate_caps_in_flight_fetches() {
        let probe = Arc::new(GateProbe {
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        });
        let coordinator = HarvestCoordinator::new(
            probe.clone(),
            mem_store(),
            &quiet_config(2),
            TimeZoneOffset::UTC,
        );

        let summary = coordinator.harvest_all(Period::Daily).await;
        assert_eq!(summary.stored + summary.empty + summary.failed, 12);
        assert!(
            probe.peak.load(Ordering::SeqCst) <= 2,
            "more than 2 fetches were in flight: {}",
            probe.peak.load(Ordering::SeqCst)
        );
    }

    /// Fails for half the signs, succeeds for the rest.
    struct FlakySource;

    #[async_trait]
    impl HoroscopeSource for FlakySource {
        async fn fetch(&self, sign: Sign, _period: Period) -> crate::error::Result<HoroscopeContent> {
            if sign.id() % 2 == 0 {
                Err(FetchError::Status { status: 503 })
            } else {
                Ok(ready_content(&format!("forecast for {sign}")))
            }
        }
    }

    #[tokio::test]
    async fn per_sign_failures_do_not_abort_the_pass() {
        let store = mem_store();
        let coordinator = HarvestCoordinator::new(
            Arc::new(FlakySource),
            store.clone(),
            &quiet_config(2),
            TimeZoneOffset::UTC,
        );

        let summary = coordinator.harvest_all(Period::Daily).await;
        assert_eq!(summary.stored, 6);
        assert_eq!(summary.failed, 6);
        assert_eq!(summary.empty, 0);

        // Odd-id signs made it into the store.
        let leo = store.latest(Sign::Leo, Period::Daily).unwrap();
        assert!(leo.is_some());
        let taurus = store.latest(Sign::Taurus, Period::Daily).unwrap();
        assert!(taurus.is_none());
    }

    struct ConstSource(String);

    #[async_trait]
    impl HoroscopeSource for ConstSource {
        async fn fetch(&self, _sign: Sign, _period: Period) -> crate::error::Result<HoroscopeContent> {
            Ok(ready_content(&self.0))
        }
    }

    #[tokio::test]
    async fn repeat_passes_stay_idempotent() {
        let store = mem_store();
        let coordinator = HarvestCoordinator::new(
            Arc::new(ConstSource("same text".into())),
            store.clone(),
            &quiet_config(2),
            TimeZoneOffset::UTC,
        );

        coordinator.harvest_all(Period::Weekly).await;
        let second = coordinator.harvest_all(Period::Weekly).await;
        assert_eq!(second.stored, 12);

        // One record per sign, not two.
        let record = store.latest(Sign::Virgo, Period::Weekly).unwrap().unwrap();
        assert_eq!(record.content.general_text.as_deref(), Some("same text"));
    }

    #[tokio::test]
    async fn empty_content_is_counted_not_stored() {
        struct EmptySource;
        #[async_trait]
        impl HoroscopeSource for EmptySource {
            async fn fetch(
                &self,
                _sign: Sign,
                _period: Period,
            ) -> crate::error::Result<HoroscopeContent> {
                Ok(HoroscopeContent::default())
            }
        }

        let store = mem_store();
        let coordinator = HarvestCoordinator::new(
            Arc::new(EmptySource),
            store.clone(),
            &quiet_config(2),
            TimeZoneOffset::UTC,
        );
        let summary = coordinator.harvest_all(Period::Daily).await;
        assert_eq!(summary.empty, 12);
        assert!(store.latest(Sign::Leo, Period::Daily).unwrap().is_none());
    }
}
