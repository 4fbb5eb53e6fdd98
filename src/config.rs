use std::path::PathBuf;
use std::time::Duration;

/// Application-level constants
pub const APP_NAME: &str = "Chansey";
pub const APP_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Remote per-case status endpoint (`?userId=..&sessionId=..`).
pub const DEFAULT_STATUS_URL: &str =
    "https://4lfbz4mx6rede2zhzllbptkkjq0myzfs.lambda-url.us-east-1.on.aws";
/// Remote queue listing endpoint.
pub const DEFAULT_QUEUE_URL: &str =
    "https://4lfbz4mx6rede2zhzllbptkkjq0myzfs.lambda-url.us-east-1.on.aws/queue";

/// Status-poll cadence for individual pending cases.
pub const DEFAULT_POLL_INTERVAL_MS: u64 = 2_000;
/// Queue-refresh cadence for the full listing.
pub const DEFAULT_QUEUE_POLL_INTERVAL_MS: u64 = 3_000;
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Simulated voice analysis latency.
pub const DEFAULT_ANALYSIS_DELAY_MS: u64 = 1_500;

/// Local store key holding the most recent triage capture.
pub const LATEST_TRIAGE_KEY: &str = "latest_triage_result";

pub const DEFAULT_RTC_APP_ID: &str = "1364f588b53c42baac5772751347347a";
pub const DEFAULT_RTC_CHANNEL: &str = "consultation-channel";

const ENV_STATUS_URL: &str = "CHANSEY_STATUS_URL";
const ENV_QUEUE_URL: &str = "CHANSEY_QUEUE_URL";
const ENV_POLL_INTERVAL_MS: &str = "CHANSEY_POLL_INTERVAL_MS";
const ENV_QUEUE_POLL_INTERVAL_MS: &str = "CHANSEY_QUEUE_POLL_INTERVAL_MS";
const ENV_HTTP_TIMEOUT_SECS: &str = "CHANSEY_HTTP_TIMEOUT_SECS";
const ENV_DATA_DIR: &str = "CHANSEY_DATA_DIR";
const ENV_RTC_APP_ID: &str = "CHANSEY_RTC_APP_ID";
const ENV_RTC_TOKEN: &str = "CHANSEY_RTC_TOKEN";
const ENV_RTC_CHANNEL: &str = "CHANSEY_RTC_CHANNEL";

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Cannot determine home directory")]
    NoHomeDir,
    #[error("Invalid value for {key}: {value:?}")]
    InvalidValue { key: String, value: String },
}

/// Default `tracing` filter when `RUST_LOG` is not set.
pub fn default_log_filter() -> &'static str {
    "warn,chansey=info,chansey_lib=info"
}

/// Get the application data directory.
/// `CHANSEY_DATA_DIR` when set, otherwise ~/Chansey/.
pub fn app_data_dir() -> Result<PathBuf, ConfigError> {
    app_data_dir_from(|key| std::env::var(key).ok())
}

fn app_data_dir_from<F>(lookup: F) -> Result<PathBuf, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(dir) = lookup(ENV_DATA_DIR).filter(|d| !d.trim().is_empty()) {
        return Ok(PathBuf::from(dir));
    }
    let home = dirs::home_dir().ok_or(ConfigError::NoHomeDir)?;
    Ok(home.join(APP_NAME))
}

/// Get the local store directory.
pub fn store_dir() -> Result<PathBuf, ConfigError> {
    Ok(app_data_dir()?.join("store"))
}

// ═══════════════════════════════════════════════════════════
// SyncConfig
// ═══════════════════════════════════════════════════════════

/// Endpoints and cadences for the queue synchronizer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncConfig {
    pub status_url: String,
    pub queue_url: String,
    pub poll_interval: Duration,
    pub queue_poll_interval: Duration,
    pub http_timeout_secs: u64,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            status_url: DEFAULT_STATUS_URL.to_string(),
            queue_url: DEFAULT_QUEUE_URL.to_string(),
            poll_interval: Duration::from_millis(DEFAULT_POLL_INTERVAL_MS),
            queue_poll_interval: Duration::from_millis(DEFAULT_QUEUE_POLL_INTERVAL_MS),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
        }
    }
}

impl SyncConfig {
    /// Build from `CHANSEY_*` environment variables, defaulting the rest.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Ok(Self {
            status_url: lookup(ENV_STATUS_URL).unwrap_or(defaults.status_url),
            queue_url: lookup(ENV_QUEUE_URL).unwrap_or(defaults.queue_url),
            poll_interval: parse_millis(&lookup, ENV_POLL_INTERVAL_MS)?
                .unwrap_or(defaults.poll_interval),
            queue_poll_interval: parse_millis(&lookup, ENV_QUEUE_POLL_INTERVAL_MS)?
                .unwrap_or(defaults.queue_poll_interval),
            http_timeout_secs: parse_u64(&lookup, ENV_HTTP_TIMEOUT_SECS)?
                .unwrap_or(defaults.http_timeout_secs),
        })
    }
}

// ═══════════════════════════════════════════════════════════
// CallConfig
// ═══════════════════════════════════════════════════════════

/// Consultation call parameters for the RTC session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallConfig {
    pub app_id: String,
    pub token: Option<String>,
    pub channel: String,
}

impl Default for CallConfig {
    fn default() -> Self {
        Self {
            app_id: DEFAULT_RTC_APP_ID.to_string(),
            token: None,
            channel: DEFAULT_RTC_CHANNEL.to_string(),
        }
    }
}

impl CallConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            app_id: lookup(ENV_RTC_APP_ID).unwrap_or(defaults.app_id),
            token: lookup(ENV_RTC_TOKEN).filter(|t| !t.is_empty()),
            channel: lookup(ENV_RTC_CHANNEL).unwrap_or(defaults.channel),
        }
    }
}

fn parse_u64<F>(lookup: &F, key: &str) -> Result<Option<u64>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    match lookup(key) {
        None => Ok(None),
        Some(raw) => match raw.trim().parse::<u64>() {
            Ok(v) if v > 0 => Ok(Some(v)),
            _ => Err(ConfigError::InvalidValue {
                key: key.to_string(),
                value: raw,
            }),
        },
    }
}

fn parse_millis<F>(lookup: &F, key: &str) -> Result<Option<Duration>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    Ok(parse_u64(lookup, key)?.map(Duration::from_millis))
}
