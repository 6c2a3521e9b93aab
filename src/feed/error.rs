use thiserror::Error;

use super::entry::EntryError;
use crate::util::UrlValidationError;

/// Errors that can occur while fetching or parsing a feed.
///
/// Every variant is terminal for the current attempt; nothing is retried.
/// Use [`FeedError::kind`] to map an error onto a user-facing category.
#[derive(Debug, Error)]
pub enum FeedError {
    /// The feed URL failed validation before any request was made
    #[error("Invalid feed URL: {0}")]
    InvalidUrl(#[from] UrlValidationError),
    /// Network-level error (DNS, refused connection, TLS, connect/read timeout)
    #[error("Request failed: {0}")]
    Connection(#[from] reqwest::Error),
    /// The request as a whole did not finish in time
    #[error("Request timed out")]
    Timeout,
    /// HTTP response with non-2xx status code
    #[error("HTTP error: status {0}")]
    HttpStatus(u16),
    /// Response body exceeded the size limit
    #[error("Response too large")]
    ResponseTooLarge,
    /// XML syntax error or mismatched tags
    #[error("Malformed feed: {0}")]
    Xml(#[from] quick_xml::Error),
    /// Input ended while elements were still open
    #[error("Malformed feed: document ended before all elements were closed")]
    Truncated,
    /// Input contained no element at all
    #[error("Malformed feed: no root element")]
    NoRootElement,
    /// An item's required field failed validation
    #[error("Invalid entry: {0}")]
    InvalidEntry(#[from] EntryError),
}

/// Coarse error categories surfaced to callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The feed could not be retrieved
    Connection,
    /// The feed was retrieved but is not a well-formed channel document
    MalformedFeed,
    /// The document is well-formed but an entry is invalid
    InvalidEntry,
}

impl FeedError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            FeedError::InvalidUrl(_)
            | FeedError::Connection(_)
            | FeedError::Timeout
            | FeedError::HttpStatus(_)
            | FeedError::ResponseTooLarge => ErrorKind::Connection,
            FeedError::Xml(_) | FeedError::Truncated | FeedError::NoRootElement => {
                ErrorKind::MalformedFeed
            }
            FeedError::InvalidEntry(_) => ErrorKind::InvalidEntry,
        }
    }
}

impl ErrorKind {
    /// Short message suitable for a status line.
    pub fn user_message(self) -> &'static str {
        match self {
            ErrorKind::Connection => "Unable to load the feed: connection error",
            ErrorKind::MalformedFeed => "Unable to load the feed: the XML could not be read",
            ErrorKind::InvalidEntry => "Unable to load the feed: it contains an invalid entry",
        }
    }
}
