//! `astroline-scheduler` — durable per-subscriber delivery jobs.
//!
//! # Overview
//!
//! Jobs are persisted to a SQLite `delivery_jobs` table, one row per
//! subscriber. The [`engine::DeliveryEngine`] polls the table every second
//! and forwards due jobs over an mpsc channel to the delivery executor; the
//! [`registry::JobRegistry`] is the management handle (upsert / remove /
//! activate) used by the preference flow.
//!
//! A job fires at its subscriber's local wall-clock `HH:MM` every day,
//! indefinitely, until removed. Local time is a fixed UTC offset — no
//! daylight-saving rules anywhere.

pub mod db;
pub mod engine;
pub mod error;
pub mod registry;
pub mod schedule;
pub mod types;

pub use engine::DeliveryEngine;
pub use error::{Result, SchedulerError};
pub use registry::JobRegistry;
pub use types::{DeliveryJob, FiredJob};
