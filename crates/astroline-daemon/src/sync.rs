//! Boot-time reconciliation between subscriber profiles and the durable
//! job table.
//!
//! The preference flow owns the profile fields; the scheduler owns the job
//! table. After a restart or a restore the two can drift — a profile edited
//! while the daemon was down, or a job left active for a paused subscriber.
//! This pass makes the job table match the profiles before the engine runs.

use tracing::{info, warn};

use astroline_scheduler::JobRegistry;
use astroline_subscribers::SubscriberManager;

pub fn sync_jobs(registry: &JobRegistry, subscribers: &SubscriberManager) {
    // Jobs whose subscriber is gone, paused or unconfigured must not fire.
    let mut paused = 0usize;
    match registry.list() {
        Ok(jobs) => {
            for job in jobs {
                if !job.active {
                    continue;
                }
                let keep = matches!(
                    subscribers.get(job.subscriber_id),
                    Ok(Some(ref s)) if s.is_active && s.is_configured()
                );
                if !keep {
                    match registry.set_active(job.subscriber_id, false) {
                        Ok(()) => paused += 1,
                        Err(e) => warn!(
                            subscriber_id = job.subscriber_id,
                            error = %e,
                            "job sync: failed to pause orphaned job"
                        ),
                    }
                }
            }
        }
        Err(e) => warn!(error = %e, "job sync: cannot list jobs"),
    }

    // Every active, fully configured subscriber gets a job matching the
    // profile's offset and time.
    let ids = match subscribers.list_active_ids() {
        Ok(ids) => ids,
        Err(e) => {
            warn!(error = %e, "job sync: cannot list subscribers");
            return;
        }
    };

    let mut installed = 0usize;
    for id in ids {
        let Ok(Some(sub)) = subscribers.get(id) else {
            continue;
        };
        if sub.sign.is_none() {
            continue;
        }
        let (Some(offset), Some(at)) = (sub.offset, sub.notify_at) else {
            continue;
        };

        let current = registry.get(id).ok().flatten();
        let in_sync = current.as_ref().is_some_and(|j| {
            j.active && j.offset == offset && j.hour == at.hour && j.minute == at.minute
        });
        if in_sync {
            continue;
        }
        match registry.upsert(id, offset, at.hour, at.minute) {
            Ok(_) => installed += 1,
            Err(e) => warn!(subscriber_id = id, error = %e, "job sync: upsert failed"),
        }
    }

    if installed > 0 || paused > 0 {
        info!(installed, paused, "delivery jobs reconciled with subscriber profiles");
    }
}
