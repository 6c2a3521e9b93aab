use thiserror::Error;
use url::Url;

/// Errors that can occur during URL validation.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed as an absolute URL.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host to connect to.
    #[error("URL has no host")]
    MissingHost,
}

/// Validates a URL string for use as a feed source.
///
/// Only absolute `http`/`https` URLs with a host are accepted. Surrounding
/// whitespace (common when URLs are pasted into a config file) is ignored.
///
/// # Errors
///
/// - [`UrlValidationError::InvalidUrl`] if the string does not parse
/// - [`UrlValidationError::UnsupportedScheme`] for `file://`, `ftp://`, ...
/// - [`UrlValidationError::MissingHost`] if there is nothing to connect to
///
/// # Examples
///
/// ```
/// use pullfeed::util::validate_url;
///
/// let url = validate_url("https://news.ycombinator.com/rss").unwrap();
/// assert_eq!(url.host_str(), Some("news.ycombinator.com"));
///
/// assert!(validate_url("file:///etc/passwd").is_err());
/// assert!(validate_url("/relative/feed.xml").is_err());
/// ```
pub fn validate_url(url_str: &str) -> Result<Url, UrlValidationError> {
    let url = Url::parse(url_str.trim())?;

    match url.scheme() {
        "http" | "https" => {}
        scheme => return Err(UrlValidationError::UnsupportedScheme(scheme.to_owned())),
    }

    if url.host_str().map_or(true, str::is_empty) {
        return Err(UrlValidationError::MissingHost);
    }

    Ok(url)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_urls() {
        assert!(validate_url("https://example.com/feed.xml").is_ok());
        assert!(validate_url("http://news.example.org").is_ok());
        assert!(validate_url("http://127.0.0.1:8080/rss").is_ok());
        assert!(validate_url("  https://example.com:443/feed.xml\n").is_ok());
    }

    #[test]
    fn test_invalid_schemes() {
        assert!(matches!(
            validate_url("file:///etc/passwd"),
            Err(UrlValidationError::UnsupportedScheme(ref s)) if s == "file"
        ));
        assert!(validate_url("ftp://example.com").is_err());
    }

    #[test]
    fn test_relative_and_garbage_rejected() {
        assert!(matches!(
            validate_url("feed.xml"),
            Err(UrlValidationError::InvalidUrl(_))
        ));
        assert!(validate_url("").is_err());
        assert!(validate_url("http://").is_err());
    }
}
