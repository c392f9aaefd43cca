use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use astroline_core::TimeZoneOffset;

/// A persisted recurring-delivery commitment — at most one per subscriber.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeliveryJob {
    /// Subscriber id — primary key; upsert-by-replacement keeps it unique.
    pub subscriber_id: i64,
    /// Fixed UTC offset the trigger time is interpreted in.
    pub offset: TimeZoneOffset,
    /// Local wall-clock trigger hour.
    pub hour: u8,
    /// Local wall-clock trigger minute.
    pub minute: u8,
    /// Mirrors the subscriber's opt-in state; inactive jobs never fire.
    pub active: bool,
    /// ISO-8601 UTC timestamp of the next planned fire.
    pub next_run: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// What the engine hands to the delivery executor when a job comes due.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FiredJob {
    pub subscriber_id: i64,
    pub fired_at: DateTime<Utc>,
}
