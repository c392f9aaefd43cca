use rusqlite::Connection;

use crate::error::Result;

/// Initialise the scheduler schema in `conn`.
///
/// Creates the `delivery_jobs` table (idempotent) and an index on
/// `next_run` so the polling query stays cheap.
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS delivery_jobs (
            subscriber_id INTEGER NOT NULL PRIMARY KEY,
            utc_offset    TEXT    NOT NULL,   -- 'UTC+3' format
            hour          INTEGER NOT NULL,
            minute        INTEGER NOT NULL,
            active        INTEGER NOT NULL DEFAULT 1,
            next_run      TEXT,               -- ISO-8601 UTC or NULL
            created_at    TEXT    NOT NULL,
            updated_at    TEXT    NOT NULL
        ) STRICT;

        -- Efficient polling: SELECT … WHERE next_run <= ?
        CREATE INDEX IF NOT EXISTS idx_delivery_jobs_next_run
            ON delivery_jobs (next_run);
        ",
    )?;
    Ok(())
}
