use std::sync::Mutex;

use chrono::NaiveDate;
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use astroline_core::{Period, Sign};

use crate::db::init_db;
use crate::error::Result;
use crate::types::{HoroscopeContent, HoroscopeRecord, Section};

/// Durable keyed storage of horoscope records.
///
/// Thread-safe: wraps its SQLite connection in a Mutex so harvest tasks can
/// upsert concurrently. Upserts to different keys never conflict; the unique
/// index on `(sign_id, period, date)` makes same-key re-application a
/// replace, not an append.
pub struct ContentStore {
    db: Mutex<Connection>,
}

impl ContentStore {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    /// Insert or replace the record for its `(sign, period, date)` identity.
    ///
    /// Idempotent under re-application: harvesting the same page twice
    /// leaves exactly one row.
    pub fn upsert(&self, record: &HoroscopeRecord) -> Result<()> {
        let db = self.db.lock().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        let c = &record.content;
        db.execute(
            "INSERT INTO horoscopes
             (sign_id, period, date, general_text,
              business_text, business_rating, health_text, health_rating,
              love_text, love_rating, lunar_text, lunar_rating,
              created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?13)
             ON CONFLICT(sign_id, period, date) DO UPDATE SET
               general_text = excluded.general_text,
               business_text = excluded.business_text,
               business_rating = excluded.business_rating,
               health_text = excluded.health_text,
               health_rating = excluded.health_rating,
               love_text = excluded.love_text,
               love_rating = excluded.love_rating,
               lunar_text = excluded.lunar_text,
               lunar_rating = excluded.lunar_rating,
               updated_at = excluded.updated_at",
            rusqlite::params![
                record.sign.id(),
                record.period.as_str(),
                record.date.to_string(),
                c.general_text,
                c.business.text,
                c.business.rating,
                c.health.text,
                c.health.rating,
                c.love.text,
                c.love.rating,
                c.lunar.text,
                c.lunar.rating,
                now,
            ],
        )?;
        debug!(sign = %record.sign, period = %record.period, date = %record.date, "horoscope stored");
        Ok(())
    }

    /// The most-recently-dated record for `(sign, period)`, if any.
    ///
    /// Ordered by effective date, not write order — a late re-harvest of an
    /// old date never shadows newer content.
    pub fn latest(&self, sign: Sign, period: Period) -> Result<Option<HoroscopeRecord>> {
        let db = self.db.lock().unwrap();
        let record = db
            .query_row(
                "SELECT date, general_text,
                        business_text, business_rating, health_text, health_rating,
                        love_text, love_rating, lunar_text, lunar_rating
                 FROM horoscopes
                 WHERE sign_id = ?1 AND period = ?2
                 ORDER BY date DESC
                 LIMIT 1",
                rusqlite::params![sign.id(), period.as_str()],
                |row| {
                    let date: String = row.get(0)?;
                    Ok((date, row_to_content(row)?))
                },
            )
            .optional()?;

        Ok(record.and_then(|(date, content)| {
            let date = date.parse::<NaiveDate>().ok()?;
            Some(HoroscopeRecord::new(sign, period, date, content))
        }))
    }

    /// Cache auxiliary planetary transit data for a date (replaces).
    pub fn cache_transits(&self, date: NaiveDate, planet_data: &str) -> Result<()> {
        let db = self.db.lock().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        db.execute(
            "INSERT INTO transits_cache (transit_date, planet_data, created_at)
             VALUES (?1, ?2, ?3)
             ON CONFLICT(transit_date) DO UPDATE SET
               planet_data = excluded.planet_data",
            rusqlite::params![date.to_string(), planet_data, now],
        )?;
        Ok(())
    }

    pub fn cached_transits(&self, date: NaiveDate) -> Result<Option<String>> {
        let db = self.db.lock().unwrap();
        let data = db
            .query_row(
                "SELECT planet_data FROM transits_cache WHERE transit_date = ?1",
                [date.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(data)
    }
}

fn row_to_content(row: &rusqlite::Row<'_>) -> rusqlite::Result<HoroscopeContent> {
    Ok(HoroscopeContent {
        general_text: row.get(1)?,
        business: Section {
            text: row.get(2)?,
            rating: row.get(3)?,
        },
        health: Section {
            text: row.get(4)?,
            rating: row.get(5)?,
        },
        love: Section {
            text: row.get(6)?,
            rating: row.get(7)?,
        },
        lunar: Section {
            text: row.get(8)?,
            rating: row.get(9)?,
        },
    })
}
