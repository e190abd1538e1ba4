use thiserror::Error;
use url::Url;

/// Errors that can occur while validating a configured feed URL.
#[derive(Error, Debug)]
pub enum UrlValidationError {
    /// The URL string could not be parsed.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),
    /// The URL uses a scheme other than http or https.
    #[error("Unsupported scheme: {0} (only http/https allowed)")]
    UnsupportedScheme(String),
    /// The URL has no host component.
    #[error("URL has no host")]
    MissingHost,
}

/// Validates a URL string for use as a feed base URL.
///
/// The base URL is the root of the candidate ladder, so it must be an absolute
/// `http`/`https` URL with a host. Local addresses are accepted: self-hosted
/// blogs and test servers commonly live there.
///
/// # Examples
///
/// ```
/// use feedpost::util::validate_url;
///
/// let url = validate_url("https://blog.example.com/feed/").unwrap();
/// assert_eq!(url.host_str(), Some("blog.example.com"));
///
/// assert!(validate_url("file:///etc/passwd").is_err());
/// assert!(validate_url("not a url").is_err());
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
