//! HTTP access to the upstream scraper API.

pub mod error;
pub mod limiter;
pub mod retry;

use std::time::Duration;

use async_trait::async_trait;
use log::debug;
use log::info;
use log::warn;
use reqwest::header::ACCEPT;
use reqwest::header::CONTENT_TYPE;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

use crate::transport::error::TransportError;
use crate::transport::limiter::RequestLimiter;
use crate::transport::retry::RetryPolicy;

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(15);
const USER_AGENT: &str = concat!("animek/", env!("CARGO_PKG_VERSION"));

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum Method {
    #[default]
    Get,
    Post,
}

#[derive(Clone, Debug, Default)]
pub struct RequestOptions {
    pub method: Method,
    pub cancel: CancellationToken,
}

impl RequestOptions {
    /// GET request tied to `cancel`.
    pub fn get(cancel: &CancellationToken) -> Self {
        Self {
            method: Method::Get,
            cancel: cancel.clone(),
        }
    }
}

/// Issues a request against the upstream API and returns its JSON body.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Transport: Send + Sync {
    /// `path` is relative to the configured base URL, e.g. `/samehadaku/anime/naruto`.
    async fn request(&self, path: &str, options: RequestOptions) -> Result<Value, TransportError>;
}

/// [`Transport`] backed by a `reqwest` client, with retries, per-attempt timeout
/// and a request limiter.
pub struct HttpTransport {
    base_url: String,
    client: reqwest::Client,
    retry: RetryPolicy,
    timeout: Duration,
    limiter: RequestLimiter,
}

impl HttpTransport {
    pub fn new(base_url: &str) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .user_agent(USER_AGENT)
            .build()?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
            retry: RetryPolicy::default(),
            timeout: DEFAULT_TIMEOUT,
            limiter: RequestLimiter::default(),
        })
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_limiter(mut self, limiter: RequestLimiter) -> Self {
        self.limiter = limiter;
        self
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url_for(&self, path: &str) -> Result<String, TransportError> {
        let url = format!("{}/{}", self.base_url, path.trim_start_matches('/'));
        url::Url::parse(&url).map_err(|_| TransportError::InvalidUrl { url: url.clone() })?;
        Ok(url)
    }

    async fn attempt(&self, url: &str, method: Method) -> Result<Value, TransportError> {
        debug!("Making request to: {url}");

        let request = match method {
            Method::Get => self.client.get(url),
            Method::Post => self.client.post(url),
        }
        .header(ACCEPT, "application/json");

        let response = request.send().await?;
        let status = response.status();
        debug!("Response status {} for {url}", status.as_u16());

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_string);
        let body = response.text().await?;

        if !status.is_success() {
            return Err(TransportError::Status {
                status: status.as_u16(),
                message: error_message(&body, status.canonical_reason()),
            });
        }

        parse_body(&body, content_type.as_deref())
    }

    /// Waits for the limiter, then runs one attempt. The timeout covers the
    /// attempt only.
    async fn attempt_with_timeout(&self, url: &str, method: Method) -> Result<Value, TransportError> {
        self.limiter.acquire().await;
        tokio::time::timeout(self.timeout, self.attempt(url, method))
            .await
            .map_err(|_| TransportError::Timeout {
                timeout: self.timeout,
            })?
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, path: &str, options: RequestOptions) -> Result<Value, TransportError> {
        let url = self.url_for(path)?;
        let cancel = &options.cancel;
        let mut attempt = 0;

        loop {
            if cancel.is_cancelled() {
                return Err(TransportError::Cancelled);
            }

            let result = tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransportError::Cancelled),
                result = self.attempt_with_timeout(&url, options.method) => result,
            };

            let err = match result {
                Ok(json) => return Ok(json),
                Err(err) => err,
            };

            if attempt >= self.retry.retries {
                warn!(
                    "Request to {url} failed after {} attempt(s): {err}",
                    attempt + 1
                );
                return Err(err);
            }

            let delay = self.retry.delay_for(attempt);
            info!(
                "Retrying request to {url} in {}ms ({} retries left): {err}",
                delay.as_millis(),
                self.retry.retries - attempt
            );
            tokio::select! {
                biased;
                _ = cancel.cancelled() => return Err(TransportError::Cancelled),
                _ = tokio::time::sleep(delay) => {}
            }
            attempt += 1;
        }
    }
}

/// Extracts a readable message from an error response body.
fn error_message(body: &str, reason: Option<&str>) -> String {
    match serde_json::from_str::<Value>(body) {
        Ok(json) => ["message", "error"]
            .iter()
            .find_map(|key| json.get(*key).and_then(Value::as_str))
            .map(str::to_string)
            .unwrap_or_else(|| json.to_string()),
        Err(_) => reason.unwrap_or("Unknown error").to_string(),
    }
}

/// Parses a successful response body.
///
/// JSON content types must parse. Other bodies are parsed when they look like
/// JSON and otherwise wrapped as `{"success": true, "text": ...}`.
fn parse_body(body: &str, content_type: Option<&str>) -> Result<Value, TransportError> {
    if content_type.is_some_and(|ct| ct.contains("application/json")) {
        return Ok(serde_json::from_str(body)?);
    }

    let trimmed = body.trim();
    if trimmed.starts_with('{') || trimmed.starts_with('[') {
        match serde_json::from_str(trimmed) {
            Ok(json) => return Ok(json),
            Err(e) => warn!("Response looks like JSON but couldn't be parsed: {e}"),
        }
    }

    Ok(serde_json::json!({ "success": true, "text": body }))
}
