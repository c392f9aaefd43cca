use std::sync::Mutex;

use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension};
use tracing::debug;

use crate::db::init_db;
use crate::error::Result;
use crate::types::{Subscriber, SubscriberPatch};

/// Narrow CRUD surface over the subscribers table.
///
/// Thread-safe via a Mutex around the connection, matching the other
/// storage subsystems.
pub struct SubscriberManager {
    db: Mutex<Connection>,
}

impl SubscriberManager {
    pub fn new(conn: Connection) -> Result<Self> {
        init_db(&conn)?;
        Ok(Self {
            db: Mutex::new(conn),
        })
    }

    pub fn get(&self, id: i64) -> Result<Option<Subscriber>> {
        let db = self.db.lock().unwrap();
        let sub = db
            .query_row(
                "SELECT id, first_name, last_name, username, language_code,
                        sign, utc_offset, notify_at, is_active, created_at, updated_at
                 FROM subscribers WHERE id = ?1",
                [id],
                row_to_subscriber,
            )
            .optional()?;
        Ok(sub)
    }

    /// Apply a partial update, creating the row first if it does not exist
    /// (upsert-on-missing). Only the fields set on the patch are written.
    pub fn update(&self, id: i64, patch: &SubscriberPatch) -> Result<()> {
        let db = self.db.lock().unwrap();
        let now = chrono::Utc::now().to_rfc3339();
        db.execute(
            "INSERT OR IGNORE INTO subscribers (id, created_at, updated_at)
             VALUES (?1, ?2, ?2)",
            rusqlite::params![id, now],
        )?;

        if patch.is_empty() {
            return Ok(());
        }

        let mut sets: Vec<&str> = Vec::new();
        let mut values: Vec<Value> = Vec::new();
        if let Some(ref v) = patch.first_name {
            sets.push("first_name = ?");
            values.push(Value::Text(v.clone()));
        }
        if let Some(ref v) = patch.last_name {
            sets.push("last_name = ?");
            values.push(Value::Text(v.clone()));
        }
        if let Some(ref v) = patch.username {
            sets.push("username = ?");
            values.push(Value::Text(v.clone()));
        }
        if let Some(ref v) = patch.language_code {
            sets.push("language_code = ?");
            values.push(Value::Text(v.clone()));
        }
        if let Some(v) = patch.sign {
            sets.push("sign = ?");
            values.push(Value::Text(v.display_name().to_string()));
        }
        if let Some(v) = patch.offset {
            sets.push("utc_offset = ?");
            values.push(Value::Text(v.to_string()));
        }
        if let Some(v) = patch.notify_at {
            sets.push("notify_at = ?");
            values.push(Value::Text(v.to_string()));
        }
        if let Some(v) = patch.is_active {
            sets.push("is_active = ?");
            values.push(Value::Integer(v as i64));
        }
        sets.push("updated_at = ?");
        values.push(Value::Text(now));
        values.push(Value::Integer(id));

        let sql = format!(
            "UPDATE subscribers SET {} WHERE id = ?",
            sets.join(", ")
        );
        db.execute(&sql, rusqlite::params_from_iter(values))?;
        debug!(subscriber_id = id, "subscriber updated");
        Ok(())
    }

    /// Ids of all opted-in subscribers, for broadcast fan-out.
    pub fn list_active_ids(&self) -> Result<Vec<i64>> {
        let db = self.db.lock().unwrap();
        let mut stmt = db.prepare("SELECT id FROM subscribers WHERE is_active = 1")?;
        let ids = stmt
            .query_map([], |row| row.get(0))?
            .filter_map(|r| r.ok())
            .collect();
        Ok(ids)
    }
}

fn row_to_subscriber(row: &rusqlite::Row<'_>) -> rusqlite::Result<Subscriber> {
    let sign: Option<String> = row.get(5)?;
    let offset: Option<String> = row.get(6)?;
    let notify_at: Option<String> = row.get(7)?;
    Ok(Subscriber {
        id: row.get(0)?,
        first_name: row.get(1)?,
        last_name: row.get(2)?,
        username: row.get(3)?,
        language_code: row.get(4)?,
        sign: sign.and_then(|s| s.parse().ok()),
        offset: offset.and_then(|s| s.parse().ok()),
        notify_at: notify_at.and_then(|s| s.parse().ok()),
        is_active: row.get::<_, i64>(8)? != 0,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}
