use std::num::NonZeroUsize;
use std::sync::{Arc, Mutex, OnceLock};
use std::time::Duration;

use anyhow::Result;
use chrono::{DateTime, Utc};
use futures::StreamExt;
use lru::LruCache;
use reqwest::redirect::Policy;
use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

use crate::feed::limiter::RateLimiter;
use crate::feed::parser::parse_feed;
use crate::feed::types::Feed;

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB
const FEED_CACHE_CAPACITY: usize = 64; // feeds kept per process run
const FEED_CACHE_TTL_SECS: i64 = 15 * 60; // refetch after 15 minutes

static SESSION_COOKIE: OnceLock<Option<SecretString>> = OnceLock::new();

fn get_session_cookie() -> Option<&'static SecretString> {
    SESSION_COOKIE
        .get_or_init(|| {
            std::env::var("SUBSTACK_SESSION")
                .ok()
                .filter(|v| !v.trim().is_empty())
                .map(SecretString::from)
        })
        .as_ref()
}

/// SEC-002: The paid-subscription session cookie is only ever attached to
/// HTTPS requests aimed at substack.com or one of its subdomains. Arbitrary
/// feed hosts never see it.
fn session_cookie_for(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    if parsed.scheme() != "https" {
        return None;
    }
    let host = parsed.host_str()?;
    if host != "substack.com" && !host.ends_with(".substack.com") {
        return None;
    }
    let cookie = get_session_cookie()?;
    Some(format!("substack.sid={}", cookie.expose_secret()))
}

/// Errors that can occur while fetching and parsing a feed.
#[derive(Debug, Error)]
pub enum FetchError {
    /// Network-level error (DNS, connection, TLS, etc.)
    #[error("Request failed: {0}")]
    Network(#[from] reqwest::Error),
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Request exceeded the configured timeout
    #[error("Request timed out")]
    Timeout,
    /// Feed bytes could not be parsed as RSS or Atom
    #[error("Parse error: {0}")]
    Parse(String),
    /// Server kept returning 429 Too Many Requests
    #[error("Rate limited after {0} retries")]
    RateLimited(u32),
    /// Response body exceeded the 10MB size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// Response was incomplete (received fewer bytes than Content-Length)
    #[error("Incomplete response: expected {expected} bytes, received {received}")]
    IncompleteResponse { expected: u64, received: usize },
}

/// Tunables for [`FeedClient`]. Defaults match polite scraping of small
/// publication hosts: one request per second, 30s timeout, three retries.
#[derive(Debug, Clone)]
pub struct FeedClientConfig {
    /// Minimum pause between any two outbound requests.
    pub request_gap: Duration,
    /// Per-request timeout.
    pub timeout: Duration,
    /// Retry budget for 429, 5xx, and incomplete-body responses.
    pub max_retries: u32,
}

impl Default for FeedClientConfig {
    fn default() -> Self {
        Self {
            request_gap: Duration::from_millis(1000),
            timeout: Duration::from_secs(30),
            max_retries: 3,
        }
    }
}

/// A fetched feed plus provenance: whether it was served from the
/// in-process cache and when its bytes were originally retrieved.
#[derive(Debug, Clone)]
pub struct FetchedFeed {
    pub feed: Arc<Feed>,
    pub cached: bool,
    pub fetched_at: DateTime<Utc>,
}

/// Rate-limited HTTP client for feed endpoints.
///
/// Owns the single request gate every fetch in a run passes through, plus
/// an LRU cache so repeated analysis of the same publication within one
/// run does not re-hit the network. Cache hits bypass the rate limiter
/// entirely (no request is made). Entries expire after fifteen minutes so
/// a long-running batch eventually sees new posts.
pub struct FeedClient {
    client: reqwest::Client,
    limiter: RateLimiter,
    cache: Mutex<LruCache<String, (Arc<Feed>, DateTime<Utc>)>>,
    timeout: Duration,
    max_retries: u32,
}

impl FeedClient {
    pub fn new(config: FeedClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .redirect(redirect_policy())
            .pool_max_idle_per_host(4)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(60))
            .timeout(config.timeout)
            .build()?;

        let capacity = NonZeroUsize::new(FEED_CACHE_CAPACITY).unwrap_or(NonZeroUsize::MIN);

        Ok(Self {
            client,
            limiter: RateLimiter::new(config.request_gap),
            cache: Mutex::new(LruCache::new(capacity)),
            timeout: config.timeout,
            max_retries: config.max_retries,
        })
    }

    /// Fetches and parses the feed at `url`.
    ///
    /// Serves from the in-process cache when possible; otherwise waits for
    /// the rate limiter, performs the request with retry/backoff, and
    /// caches the parsed result.
    ///
    /// # Errors
    ///
    /// - [`FetchError::Network`] - connection or TLS errors
    /// - [`FetchError::Timeout`] - request exceeded the configured timeout
    /// - [`FetchError::HttpStatus`] - non-2xx response (5xx after retries)
    /// - [`FetchError::RateLimited`] - 429 responses exhausted the retries
    /// - [`FetchError::ResponseTooLarge`] - body over the 10MB cap
    /// - [`FetchError::Parse`] - bytes were not valid RSS/Atom
    pub async fn fetch(&self, url: &str) -> Result<FetchedFeed, FetchError> {
        if let Some((feed, fetched_at)) = self.cache_get(url) {
            tracing::debug!(feed = %url, "Feed served from cache");
            return Ok(FetchedFeed {
                feed,
                cached: true,
                fetched_at,
            });
        }

        self.limiter.acquire().await;
        let bytes = self.fetch_bytes(url).await?;

        let parsed = parse_feed(&bytes, url).map_err(|e| FetchError::Parse(e.to_string()))?;
        if parsed.skipped > 0 {
            tracing::warn!(
                feed = %url,
                filtered = parsed.skipped,
                "Items without links skipped during parse"
            );
        }

        let feed = Arc::new(parsed.feed);
        let fetched_at = Utc::now();
        self.cache_put(url, Arc::clone(&feed), fetched_at);

        tracing::debug!(feed = %url, items = feed.items.len(), "Feed fetched");
        Ok(FetchedFeed {
            feed,
            cached: false,
            fetched_at,
        })
    }

    /// One HTTP fetch with retry. 429 and 5xx responses back off
    /// exponentially (1s, 2s, 4s); 4xx fails immediately; short reads are
    /// retried on the same schedule.
    async fn fetch_bytes(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        let mut retry_count = 0;

        loop {
            let mut request = self.client.get(url);
            if let Some(cookie) = session_cookie_for(url) {
                request = request.header(reqwest::header::COOKIE, cookie);
            }

            let response = tokio::time::timeout(self.timeout, request.send())
                .await
                .map_err(|_| FetchError::Timeout)?
                .map_err(FetchError::Network)?;

            if response.status() == reqwest::StatusCode::TOO_MANY_REQUESTS {
                if retry_count >= self.max_retries {
                    return Err(FetchError::RateLimited(self.max_retries));
                }
                let delay_secs = 2u64.pow(retry_count); // 1s, 2s, 4s
                tracing::warn!(
                    feed = %url,
                    retry = retry_count,
                    delay_secs = delay_secs,
                    "Rate limited, backing off"
                );
                tokio::time::sleep(Duration::from_secs(delay_secs)).await;
                retry_count += 1;
                continue;
            }

            if response.status().is_server_error() {
                if retry_count >= self.max_retries {
                    return Err(FetchError::HttpStatus(response.status().as_u16()));
                }
                let delay_secs = 2u64.pow(retry_count); // 1s, 2s, 4s
                tracing::warn!(
                    feed = %url,
                    status = %response.status(),
                    retry = retry_count,
                    delay_secs = delay_secs,
                    "Server error, retrying after delay"
                );
                tokio::time::sleep(Duration::from_secs(delay_secs)).await;
                retry_count += 1;
                continue;
            }

            if !response.status().is_success() {
                return Err(FetchError::HttpStatus(response.status().as_u16()));
            }

            match read_limited(response, MAX_FEED_SIZE).await {
                Ok(bytes) => return Ok(bytes),
                Err(FetchError::IncompleteResponse { expected, received }) => {
                    if retry_count >= self.max_retries {
                        return Err(FetchError::IncompleteResponse { expected, received });
                    }
                    let delay_secs = 2u64.pow(retry_count);
                    tracing::debug!(
                        feed = %url,
                        expected = expected,
                        received = received,
                        delay_secs = delay_secs,
                        "Retrying incomplete download"
                    );
                    tokio::time::sleep(Duration::from_secs(delay_secs)).await;
                    retry_count += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    fn cache_get(&self, url: &str) -> Option<(Arc<Feed>, DateTime<Utc>)> {
        let mut cache = self.cache.lock().ok()?;
        let (feed, fetched_at) = cache.get(url).cloned()?;
        if Utc::now() - fetched_at > chrono::Duration::seconds(FEED_CACHE_TTL_SECS) {
            cache.pop(url);
            return None;
        }
        Some((feed, fetched_at))
    }

    fn cache_put(&self, url: &str, feed: Arc<Feed>, fetched_at: DateTime<Utc>) {
        if let Ok(mut cache) = self.cache.lock() {
            cache.put(url.to_string(), (feed, fetched_at));
        }
    }
}

/// Reads a response body subject to a byte cap, verifying completeness
/// against Content-Length when the server declared one.
async fn read_limited(response: reqwest::Response, limit: usize) -> Result<Vec<u8>, FetchError> {
    let expected = response.content_length();
    if expected.is_some_and(|len| len as usize > limit) {
        return Err(FetchError::ResponseTooLarge);
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();
    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(FetchError::Network)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FetchError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    match expected {
        Some(expected) if (bytes.len() as u64) < expected => {
            Err(FetchError::IncompleteResponse {
                expected,
                received: bytes.len(),
            })
        }
        _ => Ok(bytes),
    }
}

fn redirect_policy() -> Policy {
    Policy::custom(|attempt| {
        if attempt.previous().len() >= 3 {
            return attempt.error("Too many redirects (max 3)");
        }

        let url = attempt.url();
        for prev in attempt.previous() {
            if prev.as_str() == url.as_str() {
                return attempt.error("Redirect loop detected");
            }
        }

        tracing::debug!(
            to = %url,
            hop = attempt.previous().len() + 1,
            "Following feed redirect"
        );

        attempt.follow()
    })
}
