//! HTTP fetcher with a global rate limit
//!
//! This module turns a [`FetchTicket`] into one HTTP request:
//! - Global rate limiting with governor (per-host politeness is the
//!   frontier's job; this quota caps the whole process)
//! - Session cookies sent from the ticket
//! - `Set-Cookie` parsed into the host's replacement cookie set
//! - Status classification into [`FetchError`]

use async_trait::async_trait;
use governor::{
    clock::DefaultClock,
    state::{InMemoryState, NotKeyed},
    Quota, RateLimiter,
};
use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, COOKIE, SET_COOKIE, USER_AGENT},
    Client,
};
use std::num::NonZeroU32;
use std::time::Duration;
use tokio::time::Instant;

use crate::config::FetchConfig;
use crate::frontier::{Cookie, FetchTicket};
use crate::utils::error::FetchError;

/// Result of a successful fetch
#[derive(Debug, Clone)]
pub struct FetchResponse {
    pub status: u16,

    /// Body size in bytes
    pub body_len: usize,

    /// Replacement cookie set, `None` when the response set no cookies
    pub cookies: Option<Vec<Cookie>>,

    pub latency: Duration,
}

/// Performs the fetch described by a ticket
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, ticket: &FetchTicket) -> Result<FetchResponse, FetchError>;
}

/// Fetcher backed by `reqwest`
pub struct HttpFetcher {
    /// HTTP client with configured timeout and compression
    client: Client,

    /// Process-wide request quota
    rate_limiter: RateLimiter<NotKeyed, InMemoryState, DefaultClock>,

    user_agent: String,
}

impl HttpFetcher {
    /// Create a fetcher with default settings
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn new(requests_per_second: u32) -> Result<Self, FetchError> {
        let defaults = FetchConfig::default();
        Self::with_config(&FetchConfig {
            requests_per_second,
            ..defaults
        })
    }

    /// Create a fetcher from configuration
    ///
    /// # Errors
    ///
    /// Returns `FetchError::Http` if the HTTP client cannot be created
    pub fn with_config(config: &FetchConfig) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .gzip(true)
            .build()?;

        let rate = NonZeroU32::new(config.requests_per_second).unwrap_or(NonZeroU32::MIN);
        let rate_limiter = RateLimiter::direct(Quota::per_second(rate));

        Ok(Self {
            client,
            rate_limiter,
            user_agent: config.user_agent.clone(),
        })
    }

    /// Build request headers for a ticket
    fn build_headers(&self, cookies: &[Cookie]) -> HeaderMap {
        let mut headers = HeaderMap::new();

        if let Ok(agent) = HeaderValue::from_str(&self.user_agent) {
            headers.insert(USER_AGENT, agent);
        }
        headers.insert(
            ACCEPT,
            HeaderValue::from_static("text/html,application/xhtml+xml,*/*;q=0.8"),
        );

        if let Some(value) = cookie_header(cookies) {
            if let Ok(value) = HeaderValue::from_str(&value) {
                headers.insert(COOKIE, value);
            }
        }

        headers
    }
}

/// Join cookies into a `Cookie` request header value
pub fn cookie_header(cookies: &[Cookie]) -> Option<String> {
    if cookies.is_empty() {
        return None;
    }
    Some(
        cookies
            .iter()
            .map(|c| format!("{}={}", c.name, c.value))
            .collect::<Vec<_>>()
            .join("; "),
    )
}

/// Parse every `Set-Cookie` header, `None` if there were none
pub fn parse_set_cookies(headers: &HeaderMap) -> Option<Vec<Cookie>> {
    let cookies: Vec<Cookie> = headers
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .filter_map(Cookie::from_set_cookie)
        .collect();

    if cookies.is_empty() {
        None
    } else {
        Some(cookies)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, ticket: &FetchTicket) -> Result<FetchResponse, FetchError> {
        self.rate_limiter.until_ready().await;

        let url = ticket.url();
        let headers = self.build_headers(&ticket.cookies);
        let started = Instant::now();

        tracing::debug!(url = %url, address = %ticket.address, "Fetching URL");

        let response = self
            .client
            .get(&url)
            .headers(headers)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    FetchError::Timeout
                } else {
                    FetchError::Http(e)
                }
            })?;

        let status = response.status().as_u16();
        if let Some(err) = FetchError::from_status(status) {
            return Err(err);
        }

        let cookies = parse_set_cookies(response.headers());
        let body = response.bytes().await?;

        Ok(FetchResponse {
            status,
            body_len: body.len(),
            cookies,
            latency: started.elapsed(),
        })
    }
}
