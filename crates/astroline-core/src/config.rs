use figment::{
    providers::{Env, Format, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

/// Request timeout on the upstream fetch client.
pub const FETCH_TIMEOUT_SECS: u64 = 120;

/// Top-level config (astroline.toml + ASTROLINE_* env overrides).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AstrolineConfig {
    #[serde(default)]
    pub database: DatabaseConfig,
    pub telegram: TelegramConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub harvest: HarvestConfig,
    #[serde(default)]
    pub retry: RetrySettings,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    #[serde(default = "default_db_path")]
    pub path: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TelegramConfig {
    pub bot_token: String,
}

/// Per-period base endpoints of the upstream site. The sign id is appended
/// to the base to form the request URL.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default = "default_daily_url")]
    pub daily_url: String,
    #[serde(default = "default_weekly_url")]
    pub weekly_url: String,
    #[serde(default = "default_monthly_url")]
    pub monthly_url: String,
    #[serde(default = "default_yearly_url")]
    pub yearly_url: String,
    /// Fixed UTC offset of the site's publication zone — effective dates for
    /// daily content are computed against this clock, not the server's.
    #[serde(default = "default_reference_offset")]
    pub reference_utc_offset: i8,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            daily_url: default_daily_url(),
            weekly_url: default_weekly_url(),
            monthly_url: default_monthly_url(),
            yearly_url: default_yearly_url(),
            reference_utc_offset: default_reference_offset(),
        }
    }
}

/// Harvest pass tuning: upstream concurrency cap and per-task pacing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HarvestConfig {
    /// Maximum simultaneous upstream requests during a pass.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    /// Each task sleeps a uniform delay in this range after its attempt,
    /// before releasing its concurrency slot.
    #[serde(default = "default_pause_min")]
    pub pause_min_secs: u64,
    #[serde(default = "default_pause_max")]
    pub pause_max_secs: u64,
    /// UTC hour at which the daemon runs its daily harvest pass.
    #[serde(default = "default_harvest_hour")]
    pub utc_hour: u8,
}

impl Default for HarvestConfig {
    fn default() -> Self {
        Self {
            concurrency: default_concurrency(),
            pause_min_secs: default_pause_min(),
            pause_max_secs: default_pause_max(),
            utc_hour: default_harvest_hour(),
        }
    }
}

/// Fetch retry tuning — consumed by the fetcher's retry policy.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,
    #[serde(default = "default_base_delay")]
    pub base_delay_secs: u64,
    #[serde(default = "default_max_delay")]
    pub max_delay_secs: u64,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_secs: default_base_delay(),
            max_delay_secs: default_max_delay(),
        }
    }
}

fn default_db_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.astroline/astroline.db", home)
}
fn default_daily_url() -> String {
    "https://www.globalmsk.ru/horoscope/tomorrow/".to_string()
}
fn default_weekly_url() -> String {
    "https://www.globalmsk.ru/horoscope/week/".to_string()
}
fn default_monthly_url() -> String {
    "https://www.globalmsk.ru/horoscope/month/".to_string()
}
fn default_yearly_url() -> String {
    "https://www.globalmsk.ru/horoscope/year/".to_string()
}
fn default_reference_offset() -> i8 {
    3 // Europe/Moscow, the upstream site's zone
}
fn default_concurrency() -> usize {
    2
}
fn default_pause_min() -> u64 {
    3
}
fn default_pause_max() -> u64 {
    7
}
fn default_harvest_hour() -> u8 {
    19
}
fn default_max_attempts() -> u32 {
    3
}
fn default_base_delay() -> u64 {
    4
}
fn default_max_delay() -> u64 {
    30
}

impl AstrolineConfig {
    /// Load config from a TOML file with ASTROLINE_* env var overrides.
    ///
    /// Checks in order:
    ///   1. Explicit path argument
    ///   2. ~/.astroline/astroline.toml
    pub fn load(config_path: Option<&str>) -> crate::error::Result<Self> {
        let path = config_path
            .map(String::from)
            .unwrap_or_else(default_config_path);

        let config: AstrolineConfig = Figment::new()
            .merge(Toml::file(&path))
            .merge(Env::prefixed("ASTROLINE_").split("_"))
            .extract()
            .map_err(|e| crate::error::CoreError::Config(e.to_string()))?;

        Ok(config)
    }
}

fn default_config_path() -> String {
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    format!("{}/.astroline/astroline.toml", home)
}
