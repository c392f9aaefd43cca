//! `astroline-fetch` — upstream content retrieval and the harvest pass.
//!
//! Transport and retry live in [`client`]; page-structure extraction is
//! delegated to a swappable [`adapter::ContentAdapter`] so upstream HTML
//! churn never touches the scheduling core. [`harvest`] sweeps the full
//! sign universe for one period with bounded concurrency and pacing.

pub mod adapter;
pub mod client;
pub mod error;
pub mod harvest;
pub mod retry;

pub use adapter::{ContentAdapter, GlobalmskAdapter};
pub use client::{HoroscopeClient, HoroscopeSource, UpstreamEndpoints};
pub use error::{FetchError, Result};
pub use harvest::{HarvestCoordinator, HarvestSummary};
pub use retry::{with_retry, Retryable, RetryPolicy};
