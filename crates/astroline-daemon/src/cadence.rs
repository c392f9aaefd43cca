//! Harvest cadence: a plain timer that kicks off passes at a fixed UTC hour.
//!
//! Daily runs every day; Mondays add the weekly pass, the first of the
//! month the monthly pass, January 1st the yearly pass. The passes
//! themselves are independent of subscriber schedules — the content store
//! decouples harvesting from delivery.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Datelike, Duration as ChronoDuration, TimeZone, Utc, Weekday};
use tokio::sync::watch;
use tracing::info;

use astroline_core::Period;
use astroline_fetch::HarvestCoordinator;

pub async fn run_harvest_cadence(
    coordinator: Arc<HarvestCoordinator>,
    utc_hour: u8,
    mut shutdown: watch::Receiver<bool>,
) {
    info!(utc_hour, "harvest cadence started");
    loop {
        let wait = until_next_anchor(Utc::now(), utc_hour);
        tokio::select! {
            _ = tokio::time::sleep(wait) => {
                let today = Utc::now().date_naive();
                coordinator.harvest_all(Period::Daily).await;
                if today.weekday() == Weekday::Mon {
                    coordinator.harvest_all(Period::Weekly).await;
                }
                if today.day() == 1 {
                    coordinator.harvest_all(Period::Monthly).await;
                }
                if today.month() == 1 && today.day() == 1 {
                    coordinator.harvest_all(Period::Yearly).await;
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("harvest cadence shutting down");
                    break;
                }
            }
        }
    }
}

/// Time until the next occurrence of `hour:00` UTC, strictly in the future.
fn until_next_anchor(now: DateTime<Utc>, hour: u8) -> Duration {
    let candidate = Utc
        .with_ymd_and_hms(now.year(), now.month(), now.day(), hour as u32 % 24, 0, 0)
        .single()
        .unwrap_or(now);
    let next = if candidate > now {
        candidate
    } else {
        candidate + ChronoDuration::days(1)
    };
    (next - now).to_std().unwrap_or(Duration::from_secs(60))
}
