//! HTTP transport for upstream fetches: one request per attempt, rotating
//! client identity, bounded retry. Structure extraction is delegated to the
//! [`ContentAdapter`].

use std::time::Duration;

use async_trait::async_trait;
use rand::seq::SliceRandom;

use astroline_core::config::{UpstreamConfig, FETCH_TIMEOUT_SECS};
use astroline_core::{Period, Sign};
use astroline_store::HoroscopeContent;

use crate::adapter::ContentAdapter;
use crate::error::{FetchError, Result};
use crate::retry::{with_retry, RetryPolicy};

/// Browser identities rotated per request to reduce fingerprinting.
const USER_AGENTS: [&str; 5] = [
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/91.0.4472.124 Safari/537.36",
    "Mozilla/5.0 (Macintosh; Intel Mac OS X 10_15_7) AppleWebKit/605.1.15 (KHTML, like Gecko) Version/14.1.2 Safari/605.1.15",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64; rv:89.0) Gecko/20100101 Firefox/89.0",
    "Mozilla/5.0 (X11; Linux x86_64) AppleWebKit/537.36 (KHTML, like Gecko) Chrome/92.0.4515.107 Safari/537.36",
    "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 (KHTML, like Gecko) Edge/91.0.864.59",
];

/// Per-period base endpoints; the sign id is appended to form the URL.
#[derive(Debug, Clone)]
pub struct UpstreamEndpoints {
    pub daily: String,
    pub weekly: String,
    pub monthly: String,
    pub yearly: String,
}

impl UpstreamEndpoints {
    pub fn from_config(cfg: &UpstreamConfig) -> Self {
        Self {
            daily: cfg.daily_url.clone(),
            weekly: cfg.weekly_url.clone(),
            monthly: cfg.monthly_url.clone(),
            yearly: cfg.yearly_url.clone(),
        }
    }

    fn base(&self, period: Period) -> &str {
        match period {
            Period::Daily => &self.daily,
            Period::Weekly => &self.weekly,
            Period::Monthly => &self.monthly,
            Period::Yearly => &self.yearly,
        }
    }
}

/// Seam between the harvest coordinator and the network, so tests can swap
/// in a fake source.
#[async_trait]
pub trait HoroscopeSource: Send + Sync {
    async fn fetch(&self, sign: Sign, period: Period) -> Result<HoroscopeContent>;
}

/// The real upstream client: reqwest transport plus a content adapter.
pub struct HoroscopeClient {
    http: reqwest::Client,
    adapter: Box<dyn ContentAdapter>,
    endpoints: UpstreamEndpoints,
    policy: RetryPolicy,
}

impl HoroscopeClient {
    pub fn new(
        endpoints: UpstreamEndpoints,
        adapter: Box<dyn ContentAdapter>,
        policy: RetryPolicy,
    ) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(FETCH_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            http,
            adapter,
            endpoints,
            policy,
        })
    }

    /// One GET attempt. The status check turns non-2xx into a typed error
    /// so the retry predicate can distinguish 5xx from 4xx.
    async fn fetch_body(&self, url: &str) -> Result<String> {
        let ua = USER_AGENTS
            .choose(&mut rand::thread_rng())
            .copied()
            .unwrap_or(USER_AGENTS[0]);
        let response = self
            .http
            .get(url)
            .header(reqwest::header::USER_AGENT, ua)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchError::Status {
                status: status.as_u16(),
            });
        }
        Ok(response.text().await?)
    }
}

#[async_trait]
impl HoroscopeSource for HoroscopeClient {
    async fn fetch(&self, sign: Sign, period: Period) -> Result<HoroscopeContent> {
        let url = format!("{}{}", self.endpoints.base(period), sign.id());
        let body = with_retry(&self.policy, || self.fetch_body(&url)).await?;
        Ok(self.adapter.parse(&body))
    }
}
