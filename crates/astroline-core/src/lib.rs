//! `astroline-core` — shared domain types, configuration and error taxonomy.
//!
//! Everything the other crates agree on lives here: the zodiac sign universe
//! with the upstream site's numeric ids, the horoscope period classes and
//! their effective-date policies, the fixed-offset time zone model used for
//! subscriber notification times, and the figment-backed config loader.

pub mod config;
pub mod error;
pub mod types;

pub use config::AstrolineConfig;
pub use error::{CoreError, Result};
pub use types::{NotifyTime, Period, Sign, TimeZoneOffset};
