use rusqlite::{Connection, Result};

/// Initialise the subscribers table. Safe to call on every startup
/// (idempotent).
pub fn init_db(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS subscribers (
            id            INTEGER PRIMARY KEY,
            first_name    TEXT,
            last_name     TEXT,
            username      TEXT,
            language_code TEXT,
            sign          TEXT,
            utc_offset    TEXT,               -- 'UTC+3' format
            notify_at     TEXT,               -- 'HH:MM' local wall clock
            is_active     INTEGER NOT NULL DEFAULT 1,
            created_at    TEXT NOT NULL,
            updated_at    TEXT NOT NULL
        );
        CREATE INDEX IF NOT EXISTS idx_subscribers_active
            ON subscribers (is_active);",
    )
}
