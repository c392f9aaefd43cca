use rusqlite::{Connection, Result};

/// Initialise content tables. Safe to call on every startup (idempotent).
pub fn init_db(conn: &Connection) -> Result<()> {
    create_horoscopes_table(conn)?;
    create_transits_cache_table(conn)?;
    Ok(())
}

fn create_horoscopes_table(conn: &Connection) -> Result<()> {
    // The unique index is the replace anchor: one row per (sign, period, date).
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS horoscopes (
            id              INTEGER PRIMARY KEY AUTOINCREMENT,
            sign_id         INTEGER NOT NULL,
            period          TEXT NOT NULL,
            date            TEXT NOT NULL,       -- ISO-8601 calendar date
            general_text    TEXT,
            business_text   TEXT,
            business_rating TEXT,
            health_text     TEXT,
            health_rating   TEXT,
            love_text       TEXT,
            love_rating     TEXT,
            lunar_text      TEXT,
            lunar_rating    TEXT,
            created_at      TEXT NOT NULL,
            updated_at      TEXT NOT NULL,
            UNIQUE(sign_id, period, date)
        );
        CREATE INDEX IF NOT EXISTS idx_horoscopes_latest
            ON horoscopes (sign_id, period, date DESC);",
    )
}

/// Side cache of planetary transit data, keyed by calendar date.
fn create_transits_cache_table(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "CREATE TABLE IF NOT EXISTS transits_cache (
            transit_date TEXT PRIMARY KEY NOT NULL,
            planet_data  TEXT NOT NULL,
            created_at   TEXT NOT NULL
        );",
    )
}
