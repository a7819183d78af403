use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::AppError;
use crate::transport::retry::RetryPolicy;

pub const DEFAULT_API_URL: &str = "https://animek-api-rho.vercel.app";
pub const DEFAULT_API_SOURCE: &str = "samehadaku";

#[derive(Clone, Debug)]
pub struct Config {
    pub api_url: String,
    /// Scraper backend segment of every upstream path, e.g. `samehadaku`.
    pub api_source: String,
    pub retries: u32,
    pub retry_delay: Duration,
    pub retry_backoff: f64,
    pub request_timeout: Duration,
    /// Minimum spacing between outbound requests; zero disables the limiter.
    pub min_request_interval: Duration,
    pub logs_path: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

impl Config {
    pub fn new() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            api_source: DEFAULT_API_SOURCE.to_string(),
            retries: 2,
            retry_delay: Duration::from_millis(1000),
            retry_backoff: 1.5,
            request_timeout: Duration::from_secs(15),
            min_request_interval: Duration::from_millis(1000),
            logs_path: PathBuf::from("logs"),
        }
    }

    /// Overrides defaults from environment variables.
    pub fn load(&mut self) -> Result<(), AppError> {
        if let Some(url) = env_string("API_URL") {
            self.api_url = url;
        }
        if let Some(source) = env_string("API_SOURCE") {
            self.api_source = source;
        }
        if let Some(retries) = env_parse::<u32>("REQUEST_RETRIES")? {
            self.retries = retries;
        }
        if let Some(ms) = env_parse::<u64>("RETRY_DELAY_MS")? {
            self.retry_delay = Duration::from_millis(ms);
        }
        if let Some(factor) = env_parse::<f64>("RETRY_BACKOFF")? {
            if !factor.is_finite() || factor < 1.0 {
                return Err(AppError::InvalidConfig {
                    key: "RETRY_BACKOFF".to_string(),
                    msg: format!("expected a number >= 1, got {factor}"),
                });
            }
            self.retry_backoff = factor;
        }
        if let Some(secs) = env_parse::<u64>("REQUEST_TIMEOUT_SECS")? {
            self.request_timeout = Duration::from_secs(secs);
        }
        if let Some(ms) = env_parse::<u64>("MIN_REQUEST_INTERVAL_MS")? {
            self.min_request_interval = Duration::from_millis(ms);
        }
        if let Some(path) = env_string("LOGS_PATH") {
            self.logs_path = PathBuf::from(path);
        }
        Ok(())
    }

    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(self.retries, self.retry_delay, self.retry_backoff)
    }
}

fn env_string(key: &str) -> Option<String> {
    std::env::var(key)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T>(key: &str) -> Result<Option<T>, AppError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    env_string(key)
        .map(|raw| {
            raw.parse::<T>().map_err(|e| AppError::InvalidConfig {
                key: key.to_string(),
                msg: format!("`{raw}`: {e}"),
            })
        })
        .transpose()
}
