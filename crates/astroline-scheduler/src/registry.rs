use std::sync::{Arc, Mutex};

use chrono::Utc;
use rusqlite::{Connection, OptionalExtension};
use tracing::info;

use astroline_core::TimeZoneOffset;

use crate::db::init_db;
use crate::error::{Result, SchedulerError};
use crate::schedule::next_fire;
use crate::types::DeliveryJob;

/// Management handle for delivery jobs (upsert / remove / activate) while
/// the engine loop runs.
///
/// Uses its own `Connection` so the preference flow can manage jobs without
/// conflicting with the engine's polling queries.
pub struct JobRegistry {
    conn: Arc<Mutex<Connection>>,
}

impl JobRegistry {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
        })
    }

    /// Install or replace the job for `subscriber_id`.
    ///
    /// Remove-then-add inside one transaction: a concurrent fire observes
    /// either the old job or the new one, never both and never a partial
    /// row — at most one live job per subscriber at any instant.
    pub fn upsert(
        &self,
        subscriber_id: i64,
        offset: TimeZoneOffset,
        hour: u8,
        minute: u8,
    ) -> Result<DeliveryJob> {
        if hour >= 24 || minute >= 60 {
            return Err(SchedulerError::InvalidSchedule(format!(
                "{hour:02}:{minute:02} is not a wall-clock time"
            )));
        }
        let now = Utc::now();
        let now_str = now.to_rfc3339();
        let next = next_fire(offset, hour, minute, now)
            .map(|dt| dt.to_rfc3339())
            .ok_or_else(|| {
                SchedulerError::InvalidSchedule(format!("{hour:02}:{minute:02} in {offset}"))
            })?;

        let mut conn = self.conn.lock().unwrap();
        let tx = conn.transaction()?;
        tx.execute(
            "DELETE FROM delivery_jobs WHERE subscriber_id = ?1",
            [subscriber_id],
        )?;
        tx.execute(
            "INSERT INTO delivery_jobs
             (subscriber_id, utc_offset, hour, minute, active, next_run,
              created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, 1, ?5, ?6, ?6)",
            rusqlite::params![subscriber_id, offset.to_string(), hour, minute, next, now_str],
        )?;
        tx.commit()?;

        info!(subscriber_id, %offset, hour, minute, next_run = %next, "delivery job installed");
        Ok(DeliveryJob {
            subscriber_id,
            offset,
            hour,
            minute,
            active: true,
            next_run: Some(next),
            created_at: now_str.clone(),
            updated_at: now_str,
        })
    }

    /// Remove the job. Prevents any future fire; an in-flight fire at the
    /// moment of removal completes.
    pub fn remove(&self, subscriber_id: i64) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let n = conn.execute(
            "DELETE FROM delivery_jobs WHERE subscriber_id = ?1",
            [subscriber_id],
        )?;
        if n == 0 {
            return Err(SchedulerError::JobNotFound { subscriber_id });
        }
        info!(subscriber_id, "delivery job removed");
        Ok(())
    }

    /// Flip the job's active flag (opt-out / re-opt-in without losing the
    /// configured time). Reactivation recomputes `next_run` so the job does
    /// not fire immediately for a slot that passed while paused.
    pub fn set_active(&self, subscriber_id: i64, active: bool) -> Result<()> {
        let conn = self.conn.lock().unwrap();
        let now = Utc::now();
        let n = if active {
            let job = conn
                .query_row(
                    "SELECT utc_offset, hour, minute FROM delivery_jobs
                     WHERE subscriber_id = ?1",
                    [subscriber_id],
                    |row| {
                        Ok((
                            row.get::<_, String>(0)?,
                            row.get::<_, u8>(1)?,
                            row.get::<_, u8>(2)?,
                        ))
                    },
                )
                .optional()?;
            let Some((offset_str, hour, minute)) = job else {
                return Err(SchedulerError::JobNotFound { subscriber_id });
            };
            let offset: TimeZoneOffset = offset_str
                .parse()
                .map_err(|_| SchedulerError::InvalidSchedule(offset_str))?;
            let next = next_fire(offset, hour, minute, now).map(|dt| dt.to_rfc3339());
            conn.execute(
                "UPDATE delivery_jobs SET active = 1, next_run = ?1, updated_at = ?2
                 WHERE subscriber_id = ?3",
                rusqlite::params![next, now.to_rfc3339(), subscriber_id],
            )?
        } else {
            conn.execute(
                "UPDATE delivery_jobs SET active = 0, updated_at = ?1
                 WHERE subscriber_id = ?2",
                rusqlite::params![now.to_rfc3339(), subscriber_id],
            )?
        };
        if n == 0 {
            return Err(SchedulerError::JobNotFound { subscriber_id });
        }
        info!(subscriber_id, active, "delivery job activity changed");
        Ok(())
    }

    pub fn get(&self, subscriber_id: i64) -> Result<Option<DeliveryJob>> {
        let conn = self.conn.lock().unwrap();
        let job = conn
            .query_row(
                "SELECT subscriber_id, utc_offset, hour, minute, active, next_run,
                        created_at, updated_at
                 FROM delivery_jobs WHERE subscriber_id = ?1",
                [subscriber_id],
                row_to_job,
            )
            .optional()?;
        Ok(job.flatten())
    }

    /// All jobs, ordered by subscriber id.
    pub fn list(&self) -> Result<Vec<DeliveryJob>> {
        let conn = self.conn.lock().unwrap();
        let mut stmt = conn.prepare(
            "SELECT subscriber_id, utc_offset, hour, minute, active, next_run,
                    created_at, updated_at
             FROM delivery_jobs ORDER BY subscriber_id",
        )?;
        let jobs = stmt
            .query_map([], row_to_job)?
            .filter_map(|r| r.ok())
            .flatten()
            .collect();
        Ok(jobs)
    }
}

/// A row whose stored offset no longer parses maps to `None` rather than
/// failing the whole listing.
fn row_to_job(row: &rusqlite::Row<'_>) -> rusqlite::Result<Option<DeliveryJob>> {
    let offset_str: String = row.get(1)?;
    let Ok(offset) = offset_str.parse::<TimeZoneOffset>() else {
        return Ok(None);
    };
    Ok(Some(DeliveryJob {
        subscriber_id: row.get(0)?,
        offset,
        hour: row.get(2)?,
        minute: row.get(3)?,
        active: row.get::<_, i64>(4)? != 0,
        next_run: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mem_registry() -> JobRegistry {
        JobRegistry::new(Connection::open_in_memory().unwrap()).unwrap()
    }

    fn off(s: &str) -> TimeZoneOffset {
        s.parse().unwrap()
    }

    #[test]
    fn upsert_installs_an_active_job_with_future_next_run() {
        let registry = mem_registry();
        let job = registry.upsert(100, off("UTC+3"), 9, 0).unwrap();
        assert!(job.active);
        let next: chrono::DateTime<chrono::Utc> =
            job.next_run.as_deref().unwrap().parse().unwrap();
        assert!(next > Utc::now());
    }

    #[test]
    fn second_upsert_replaces_the_job() {
        let registry = mem_registry();
        registry.upsert(100, off("UTC+3"), 9, 0).unwrap();
        registry.upsert(100, off("UTC-5"), 9, 0).unwrap();

        let jobs = registry.list().unwrap();
        assert_eq!(jobs.len(), 1, "exactly one live job per subscriber");
        assert_eq!(jobs[0].offset, off("UTC-5"));

        // 09:00 UTC-5 is 14:00 UTC.
        let next: chrono::DateTime<chrono::Utc> =
            jobs[0].next_run.as_deref().unwrap().parse().unwrap();
        assert_eq!(next.format("%H:%M").to_string(), "14:00");
    }

    #[test]
    fn upsert_rejects_out_of_range_times() {
        let registry = mem_registry();
        assert!(matches!(
            registry.upsert(1, off("UTC+0"), 24, 0),
            Err(SchedulerError::InvalidSchedule(_))
        ));
        assert!(matches!(
            registry.upsert(1, off("UTC+0"), 9, 60),
            Err(SchedulerError::InvalidSchedule(_))
        ));
    }

    #[test]
    fn remove_deletes_and_reports_missing() {
        let registry = mem_registry();
        registry.upsert(7, off("UTC+0"), 8, 30).unwrap();
        registry.remove(7).unwrap();
        assert!(registry.get(7).unwrap().is_none());
        assert!(matches!(
            registry.remove(7),
            Err(SchedulerError::JobNotFound { subscriber_id: 7 })
        ));
    }

    #[test]
    fn set_active_toggles_and_recomputes_next_run() {
        let registry = mem_registry();
        registry.upsert(5, off("UTC+2"), 7, 15).unwrap();
        registry.set_active(5, false).unwrap();
        assert!(!registry.get(5).unwrap().unwrap().active);

        registry.set_active(5, true).unwrap();
        let job = registry.get(5).unwrap().unwrap();
        assert!(job.active);
        let next: chrono::DateTime<chrono::Utc> =
            job.next_run.as_deref().unwrap().parse().unwrap();
        assert!(next > Utc::now());
    }

    #[test]
    fn set_active_on_missing_job_is_an_error() {
        let registry = mem_registry();
        assert!(matches!(
            registry.set_active(9, true),
            Err(SchedulerError::JobNotFound { subscriber_id: 9 })
        ));
    }
}
