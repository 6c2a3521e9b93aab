use std::time::Duration;

use futures::StreamExt;

use super::entry::Entry;
use super::error::FeedError;
use super::parser::{parse_entries_from_bytes, ParseOptions};
use crate::util::validate_url;

/// Time allowed to establish the TCP/TLS connection.
pub const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_millis(15_000);
/// Time allowed for any single read from an established connection.
pub const DEFAULT_READ_TIMEOUT: Duration = Duration::from_millis(10_000);

const MAX_FEED_SIZE: usize = 10 * 1024 * 1024; // 10MB

/// HTTP settings for feed requests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchConfig {
    pub connect_timeout: Duration,
    pub read_timeout: Duration,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            read_timeout: DEFAULT_READ_TIMEOUT,
        }
    }
}

/// Builds the HTTP client used for every feed request.
///
/// # Errors
///
/// [`FeedError::Connection`] if the TLS backend cannot be initialized.
pub fn build_client(config: &FetchConfig) -> Result<reqwest::Client, FeedError> {
    reqwest::Client::builder()
        .connect_timeout(config.connect_timeout)
        .read_timeout(config.read_timeout)
        .user_agent(concat!("pullfeed/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(FeedError::Connection)
}

/// Downloads a feed and parses it into entries, in document order.
///
/// This is the single entry point front ends need: one GET, one parse pass,
/// no retries. The response body is released on every exit path.
///
/// # Errors
///
/// Any [`FeedError`]; see [`FeedError::kind`] for the grouping into
/// connection, malformed-feed and invalid-entry failures. No partial list
/// is returned.
pub async fn fetch_and_parse(
    client: &reqwest::Client,
    url: &str,
    options: &ParseOptions,
) -> Result<Vec<Entry>, FeedError> {
    let bytes = fetch_feed(client, url).await?;
    let entries = parse_entries_from_bytes(&bytes, options)?;

    tracing::info!(feed = %url, entries = entries.len(), "Feed loaded");
    Ok(entries)
}

/// Performs the GET request for a feed and returns the response body.
///
/// # Errors
///
/// - [`FeedError::InvalidUrl`] - not an absolute http(s) URL
/// - [`FeedError::Timeout`] - connect or read timeout elapsed
/// - [`FeedError::Connection`] - DNS, refused connection, TLS, broken body
/// - [`FeedError::HttpStatus`] - non-2xx response
/// - [`FeedError::ResponseTooLarge`] - body exceeded 10MB
pub async fn fetch_feed(client: &reqwest::Client, url: &str) -> Result<Vec<u8>, FeedError> {
    fetch_feed_limited(client, url, MAX_FEED_SIZE).await
}

async fn fetch_feed_limited(
    client: &reqwest::Client,
    url: &str,
    limit: usize,
) -> Result<Vec<u8>, FeedError> {
    let url = validate_url(url)?;
    tracing::debug!(feed = %url, "Starting feed request");

    let response = client.get(url.clone()).send().await.map_err(request_error)?;

    if !response.status().is_success() {
        tracing::warn!(feed = %url, status = %response.status(), "Feed request rejected");
        return Err(FeedError::HttpStatus(response.status().as_u16()));
    }

    read_limited_bytes(response, limit).await
}

fn request_error(err: reqwest::Error) -> FeedError {
    if err.is_timeout() {
        FeedError::Timeout
    } else {
        FeedError::Connection(err)
    }
}

async fn read_limited_bytes(
    response: reqwest::Response,
    limit: usize,
) -> Result<Vec<u8>, FeedError> {
    // Fast path: check Content-Length header
    if let Some(len) = response.content_length() {
        if len > limit as u64 {
            return Err(FeedError::ResponseTooLarge);
        }
    }

    let mut bytes = Vec::new();
    let mut stream = response.bytes_stream();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(request_error)?;
        if bytes.len().saturating_add(chunk.len()) > limit {
            return Err(FeedError::ResponseTooLarge);
        }
        bytes.extend_from_slice(&chunk);
    }

    Ok(bytes)
}
