use chrono::Utc;
use rusqlite::Connection;
use tokio::sync::{mpsc, watch};
use tracing::{error, info, warn};

use astroline_core::TimeZoneOffset;

use crate::db::init_db;
use crate::error::Result;
use crate::schedule::next_fire;
use crate::types::FiredJob;

/// Drives job execution: polls the `delivery_jobs` table every second and
/// forwards due jobs to the delivery executor.
///
/// Owns its own `Connection`; the [`crate::JobRegistry`] mutates jobs over
/// a separate one, so a fire observes either the old or the new row of a
/// replacement, never a partial state.
pub struct DeliveryEngine {
    conn: Connection,
    fired_tx: mpsc::Sender<FiredJob>,
}

impl DeliveryEngine {
    /// Create a new engine, initialising the DB schema if needed.
    ///
    /// Fired jobs are forwarded with `try_send` so the tick loop is never
    /// stalled by a slow consumer.
    pub fn new(conn: Connection, fired_tx: mpsc::Sender<FiredJob>) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self { conn, fired_tx })
    }

    /// Main event loop. Polls every second until `shutdown` broadcasts `true`.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("delivery engine started");
        self.roll_forward_on_startup();

        let mut interval = tokio::time::interval(std::time::Duration::from_secs(1));
        loop {
            tokio::select! {
                _ = interval.tick() => {
                    if let Err(e) = self.tick() {
                        error!("delivery engine tick error: {e}");
                    }
                }
                _ = shutdown.changed() => {
                    if *shutdown.borrow() {
                        info!("delivery engine shutting down");
                        break;
                    }
                }
            }
        }
    }

    // --- private helpers ---------------------------------------------------

    /// On startup, advance any next_run that passed while the process was
    /// down to the next future occurrence. Jobs are perpetual — a restart
    /// must resume the schedule, not fire a backlog or drop jobs.
    fn roll_forward_on_startup(&mut self) {
        let now = Utc::now();
        let stale: Vec<(i64, String, u8, u8)> = {
            let Ok(mut stmt) = self.conn.prepare(
                "SELECT subscriber_id, utc_offset, hour, minute FROM delivery_jobs
                 WHERE next_run IS NOT NULL AND next_run <= ?1",
            ) else {
                return;
            };
            stmt.query_map([now.to_rfc3339()], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .map(|rows| rows.filter_map(|r| r.ok()).collect())
            .unwrap_or_default()
        };

        if stale.is_empty() {
            return;
        }
        warn!(count = stale.len(), "rolling stale jobs forward after restart");
        for (subscriber_id, offset_str, hour, minute) in stale {
            let Ok(offset) = offset_str.parse::<TimeZoneOffset>() else {
                error!(subscriber_id, offset = %offset_str, "job has unparseable offset");
                continue;
            };
            let next = next_fire(offset, hour, minute, now).map(|dt| dt.to_rfc3339());
            if let Err(e) = self.conn.execute(
                "UPDATE delivery_jobs SET next_run = ?1, updated_at = ?2
                 WHERE subscriber_id = ?3",
                rusqlite::params![next, now.to_rfc3339(), subscriber_id],
            ) {
                error!(subscriber_id, "roll-forward update failed: {e}");
            }
        }
    }

    /// Fire all active jobs whose next_run has arrived, advancing each to
    /// its next daily occurrence before forwarding.
    fn tick(&mut self) -> Result<()> {
        let now = Utc::now();
        let now_str = now.to_rfc3339();

        // Collect eagerly inside the block so `stmt` is dropped before we
        // borrow `self.conn` again for the UPDATE below.
        let due: Vec<(i64, String, u8, u8)> = {
            let mut stmt = self.conn.prepare_cached(
                "SELECT subscriber_id, utc_offset, hour, minute FROM delivery_jobs
                 WHERE active = 1 AND next_run IS NOT NULL AND next_run <= ?1",
            )?;
            let rows: Vec<_> = stmt
                .query_map([&now_str], |row| {
                    Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
                })?
                .filter_map(|r| r.ok())
                .collect();
            rows
        };

        for (subscriber_id, offset_str, hour, minute) in due {
            let Ok(offset) = offset_str.parse::<TimeZoneOffset>() else {
                error!(subscriber_id, offset = %offset_str, "job has unparseable offset — skipping");
                continue;
            };

            // Advance before forwarding so a slow consumer can never cause
            // the same slot to fire twice.
            let next = next_fire(offset, hour, minute, now).map(|dt| dt.to_rfc3339());
            self.conn.execute(
                "UPDATE delivery_jobs SET next_run = ?1, updated_at = ?2
                 WHERE subscriber_id = ?3",
                rusqlite::params![next, now_str, subscriber_id],
            )?;

            info!(subscriber_id, next_run = next.as_deref().unwrap_or("-"), "delivery job fired");

            let fired = FiredJob {
                subscriber_id,
                fired_at: now,
            };
            // try_send never blocks the tick loop; warn if the channel is full.
            if self.fired_tx.try_send(fired).is_err() {
                warn!(subscriber_id, "delivery channel full or closed — fire dropped");
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::JobRegistry;

    fn shared_db() -> (tempfile::NamedTempFile, Connection, Connection) {
        let file = tempfile::NamedTempFile::new().unwrap();
        let path = file.path().to_str().unwrap().to_string();
        let a = Connection::open(&path).unwrap();
        let b = Connection::open(&path).unwrap();
        (file, a, b)
    }

    fn off(s: &str) -> TimeZoneOffset {
        s.parse().unwrap()
    }

    /// Force a job's next_run into the past so the next tick sees it as due.
    fn backdate(conn: &Connection, subscriber_id: i64) {
        let past = (Utc::now() - chrono::Duration::minutes(5)).to_rfc3339();
        conn.execute(
            "UPDATE delivery_jobs SET next_run = ?1 WHERE subscriber_id = ?2",
            rusqlite::params![past, subscriber_id],
        )
        .unwrap();
    }

    #[tokio::test]
    async fn due_job_fires_once_and_advances_a_day() {
        let (_file, reg_conn, eng_conn) = shared_db();
        let registry = JobRegistry::new(reg_conn).unwrap();
        registry.upsert(100, off("UTC+3"), 9, 0).unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        let mut engine = DeliveryEngine::new(eng_conn, tx).unwrap();

        // Not due yet: nothing fires.
        engine.tick().unwrap();
        assert!(rx.try_recv().is_err());

        backdate(&engine.conn, 100);
        engine.tick().unwrap();
        let fired = rx.try_recv().unwrap();
        assert_eq!(fired.subscriber_id, 100);

        // The slot advanced into the future, so an immediate re-tick is quiet.
        engine.tick().unwrap();
        assert!(rx.try_recv().is_err());

        let job = registry.get(100).unwrap().unwrap();
        let next: chrono::DateTime<Utc> = job.next_run.as_deref().unwrap().parse().unwrap();
        assert!(next > Utc::now());
    }

    #[tokio::test]
    async fn replaced_job_fires_at_the_new_time_only() {
        let (_file, reg_conn, eng_conn) = shared_db();
        let registry = JobRegistry::new(reg_conn).unwrap();
        registry.upsert(200, off("UTC+3"), 9, 0).unwrap();
        registry.upsert(200, off("UTC-5"), 9, 0).unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        let mut engine = DeliveryEngine::new(eng_conn, tx).unwrap();

        backdate(&engine.conn, 200);
        engine.tick().unwrap();
        assert_eq!(rx.try_recv().unwrap().subscriber_id, 200);
        // Exactly one fire even after the rapid replacement.
        assert!(rx.try_recv().is_err());

        // And the advanced slot is 09:00 UTC-5 == 14:00 UTC.
        let job = registry.get(200).unwrap().unwrap();
        let next: chrono::DateTime<Utc> = job.next_run.as_deref().unwrap().parse().unwrap();
        assert_eq!(next.format("%H:%M").to_string(), "14:00");
    }

    #[tokio::test]
    async fn removed_job_never_fires() {
        let (_file, reg_conn, eng_conn) = shared_db();
        let registry = JobRegistry::new(reg_conn).unwrap();
        registry.upsert(300, off("UTC+0"), 12, 0).unwrap();
        backdate(&eng_conn, 300);
        registry.remove(300).unwrap();

        let (tx, mut rx) = mpsc::channel(16);
        let mut engine = DeliveryEngine::new(eng_conn, tx).unwrap();
        engine.tick().unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn inactive_job_is_skipped() {
        let (_file, reg_conn, eng_conn) = shared_db();
        let registry = JobRegistry::new(reg_conn).unwrap();
        registry.upsert(400, off("UTC+0"), 12, 0).unwrap();
        registry.set_active(400, false).unwrap();
        backdate(&eng_conn, 400);

        let (tx, mut rx) = mpsc::channel(16);
        let mut engine = DeliveryEngine::new(eng_conn, tx).unwrap();
        engine.tick().unwrap();
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn startup_rolls_stale_slots_forward_without_firing() {
        let (_file, reg_conn, eng_conn) = shared_db();
        let registry = JobRegistry::new(reg_conn).unwrap();
        registry.upsert(500, off("UTC+1"), 6, 45).unwrap();
        backdate(&eng_conn, 500);

        let (tx, mut rx) = mpsc::channel(16);
        let mut engine = DeliveryEngine::new(eng_conn, tx).unwrap();
        engine.roll_forward_on_startup();

        // The missed slot was skipped, not fired as a backlog.
        engine.tick().unwrap();
        assert!(rx.try_recv().is_err());

        let job = registry.get(500).unwrap().unwrap();
        let next: chrono::DateTime<Utc> = job.next_run.as_deref().unwrap().parse().unwrap();
        assert!(next > Utc::now());
    }
}
