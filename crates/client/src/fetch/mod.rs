//! HTTP fetch pipeline for the cache engine.
//!
//! ### URL resolution
//! - Root-relative and relative paths resolve against the configured origin
//! - Lowercase host, remove fragments, preserve query string
//!
//! ### Limits
//! - Bounded timeout; a fetch that exceeds it counts as a network failure
//! - Max body bytes (configurable)
//! - Max redirects: 5
//!
//! Status codes are never turned into errors here: the interceptor branches
//! on them, so any reachable response comes back `Ok`.

pub mod passthrough;
pub mod url;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use reqwest::Url;
use reqwest::{Client, Method, StatusCode, header};
use std::time::{Duration, Instant};

pub use passthrough::Passthrough;
pub use url::{UrlError, parse_origin, resolve};

use stow_core::{Error, StoredResponse};

/// Configuration for the fetch client.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// User agent string (default: "stow/0.1")
    pub user_agent: String,

    /// Maximum response body size in bytes (default: 5MB)
    pub max_bytes: usize,

    /// Request timeout (default: 20s)
    pub timeout: Duration,

    /// Maximum number of redirects to follow (default: 5)
    pub max_redirects: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            user_agent: "stow/0.1".to_string(),
            max_bytes: 5 * 1024 * 1024,
            timeout: Duration::from_millis(20000),
            max_redirects: 5,
        }
    }
}

/// Response from a fetch operation.
#[derive(Debug, Clone)]
pub struct FetchResponse {
    /// The original URL requested
    pub url: Url,
    /// The final URL after redirects
    pub final_url: Url,
    /// HTTP status code
    pub status: StatusCode,
    /// Content-Type header
    pub content_type: Option<String>,
    /// Response body bytes
    pub bytes: Bytes,
    /// Response headers
    pub headers: header::HeaderMap,
    /// Time taken to fetch in milliseconds
    pub fetch_ms: u64,
}

impl FetchResponse {
    /// Capture timestamp: the response `Date` header, when parseable.
    pub fn date(&self) -> Option<DateTime<Utc>> {
        self.headers
            .get(header::DATE)
            .and_then(|v| v.to_str().ok())
            .and_then(|s| DateTime::parse_from_rfc2822(s).ok())
            .map(|dt| dt.with_timezone(&Utc))
    }

    /// Shape the response for region storage, stamping the capture time
    /// from the `Date` header or the current instant.
    pub fn to_stored(&self) -> StoredResponse {
        let headers = self
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();
        StoredResponse {
            url: self.final_url.to_string(),
            status: self.status.as_u16(),
            content_type: self.content_type.clone(),
            headers,
            body: self.bytes.to_vec(),
            fetched_at: Some(self.date().unwrap_or_else(Utc::now)),
        }
    }
}

/// Network seam for the engine.
///
/// The interceptor and installer only ever talk to this trait, so tests can
/// script the network without sockets.
#[async_trait]
pub trait Fetch: Send + Sync {
    /// GET a URL for caching. Any reachable response is `Ok`, whatever its
    /// status; errors are transport-level only.
    async fn get(&self, url: &Url) -> Result<FetchResponse, Error>;

    /// Relay an arbitrary request unmodified (the bypass path).
    async fn forward(&self, method: Method, url: &Url, headers: header::HeaderMap) -> Result<FetchResponse, Error>;
}

/// HTTP fetch client backed by reqwest.
pub struct FetchClient {
    http: Client,
    config: FetchConfig,
}

impl FetchClient {
    /// Create a new fetch client with the given configuration.
    pub fn new(config: FetchConfig) -> Result<Self, Error> {
        let http = Client::builder()
            .user_agent(&config.user_agent)
            .timeout(config.timeout)
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .use_rustls_tls()
            .gzip(true)
            .brotli(true)
            .deflate(true)
            .build()
            .map_err(|e| Error::Network(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self { http, config })
    }

    /// Get reference to the configuration.
    pub fn config(&self) -> &FetchConfig {
        &self.config
    }

    async fn run(&self, request: reqwest::RequestBuilder, url: &Url) -> Result<FetchResponse, Error> {
        let start = Instant::now();

        let response = request.send().await.map_err(transport_error)?;

        let status = response.status();

        if let Some(len) = response.content_length()
            && len as usize > self.config.max_bytes
        {
            return Err(Error::TooLarge(format!("{} bytes exceeds {}", len, self.config.max_bytes)));
        }

        let final_url = response.url().clone();
        let headers = response.headers().clone();

        let bytes = response.bytes().await.map_err(transport_error)?;

        if bytes.len() > self.config.max_bytes {
            return Err(Error::TooLarge(format!(
                "{} bytes exceeds {}",
                bytes.len(),
                self.config.max_bytes
            )));
        }

        let content_type = headers
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(|s| s.to_string());

        let fetch_ms = start.elapsed().as_millis() as u64;

        tracing::debug!(
            "fetched {} -> {} {} in {}ms ({} bytes)",
            url,
            final_url,
            status.as_u16(),
            fetch_ms,
            bytes.len()
        );

        Ok(FetchResponse { url: url.clone(), final_url, status, content_type, bytes, headers, fetch_ms })
    }
}

fn transport_error(e: reqwest::Error) -> Error {
    if e.is_timeout() { Error::Timeout(e.to_string()) } else { Error::Network(e.to_string()) }
}

#[async_trait]
impl Fetch for FetchClient {
    async fn get(&self, url: &Url) -> Result<FetchResponse, Error> {
        let request = self.http.get(url.as_str()).header(
            "Accept",
            "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8",
        );
        self.run(request, url).await
    }

    async fn forward(&self, method: Method, url: &Url, headers: header::HeaderMap) -> Result<FetchResponse, Error> {
        let request = self.http.request(method, url.as_str()).headers(headers);
        self.run(request, url).await
    }
}
