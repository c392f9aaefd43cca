//! `astroline-store` — durable keyed storage of horoscope records.
//!
//! Records are keyed by `(sign, period, effective date)` with a uniqueness
//! constraint; re-harvesting the same key replaces the payload atomically.
//! `latest` is a content-freshness query: it returns the most-recently-dated
//! record for a key regardless of when it was written.

pub mod db;
pub mod error;
pub mod store;
pub mod types;

pub use error::{Result, StoreError};
pub use store::ContentStore;
pub use types::{HoroscopeContent, HoroscopeRecord, Section};
