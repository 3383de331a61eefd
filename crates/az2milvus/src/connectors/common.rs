//! HTTP helpers shared by the REST connectors.

use crate::error::{Error, Result};
use reqwest::{Client, Response};
use std::time::Duration;

/// Default HTTP timeout for all connectors.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Seconds to wait when a 429 carries no usable `Retry-After`.
pub const DEFAULT_RETRY_AFTER_SECS: u64 = 60;

/// Which side of the migration a connector talks to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    /// The service documents are read from.
    Source,
    /// The service documents are written to.
    Destination,
}

/// Creates a configured HTTP client with timeout.
#[must_use]
pub fn create_http_client() -> Client {
    Client::builder()
        .timeout(DEFAULT_TIMEOUT)
        .connect_timeout(Duration::from_secs(10))
        .build()
        .unwrap_or_else(|_| Client::new())
}

/// Validates a service endpoint.
///
/// # Errors
///
/// Returns [`Error::Config`] unless the URL is `http://` or `https://`.
pub fn validate_url(url: &str) -> Result<()> {
    let Some(host) = url
        .strip_prefix("http://")
        .or_else(|| url.strip_prefix("https://"))
    else {
        return Err(Error::Config(format!(
            "Invalid URL scheme in '{url}'. Allowed: http, https"
        )));
    };

    if host.trim_matches('/').is_empty() {
        return Err(Error::Config(format!("Invalid URL format: {url}")));
    }

    Ok(())
}

/// Joins a base URL and a path with exactly one slash.
#[must_use]
pub fn join_url(base: &str, path: &str) -> String {
    format!("{}/{}", base.trim_end_matches('/'), path.trim_start_matches('/'))
}

/// Maps an HTTP error status to an error for the given side.
#[must_use]
pub fn handle_http_error(status_code: u16, body: &str, service: &str, side: Side) -> Error {
    match status_code {
        429 => Error::RateLimit(DEFAULT_RETRY_AFTER_SECS),
        401 | 403 => Error::Authentication(format!("{service} auth failed: {body}")),
        _ => {
            let msg = format!("{service} error {status_code}: {body}");
            match side {
                Side::Source => Error::SourceConnection(msg),
                Side::Destination => Error::DestinationConnection(msg),
            }
        }
    }
}

/// Parses a `Retry-After` header given in seconds.
#[must_use]
pub fn retry_after_secs(response: &Response) -> Option<u64> {
    response
        .headers()
        .get(reqwest::header::RETRY_AFTER)?
        .to_str()
        .ok()?
        .trim()
        .parse()
        .ok()
}

/// Passes successful responses through and turns the rest into errors.
///
/// # Errors
///
/// Returns the error [`handle_http_error`] maps the status to, with the
/// server's `Retry-After` hint for 429.
pub async fn check_status(response: Response, service: &str, side: Side) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let retry_after = retry_after_secs(&response);
    let body = response
        .text()
        .await
        .unwrap_or_else(|_| "Unknown error".to_string());

    match handle_http_error(status.as_u16(), &body, service, side) {
        Error::RateLimit(_) => Err(Error::RateLimit(
            retry_after.unwrap_or(DEFAULT_RETRY_AFTER_SECS),
        )),
        other => Err(other),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handle_http_error_rate_limit() {
        let err = handle_http_error(429, "too many requests", "Azure AI Search", Side::Source);
        assert!(matches!(err, Error::RateLimit(60)));
    }

    #[test]
    fn test_handle_http_error_auth() {
        let err = handle_http_error(401, "unauthorized", "Milvus", Side::Destination);
        assert!(matches!(err, Error::Authentication(_)));
    }

    #[test]
    fn test_handle_http_error_by_side() {
        assert!(matches!(
            handle_http_error(500, "internal error", "Azure AI Search", Side::Source),
            Error::SourceConnection(_)
        ));
        assert!(matches!(
            handle_http_error(503, "unavailable", "Milvus", Side::Destination),
            Error::DestinationConnection(_)
        ));
    }

    #[test]
    fn test_status_code_in_message() {
        let err = handle_http_error(503, "busy", "Milvus", Side::Destination);
        assert!(err.to_string().contains("503"));
    }

    #[test]
    fn test_validate_url() {
        assert!(validate_url("http://localhost:19530").is_ok());
        assert!(validate_url("https://svc.search.windows.net").is_ok());
        assert!(validate_url("ftp://files.example.com").is_err());
        assert!(validate_url("file:///etc/passwd").is_err());
        assert!(validate_url("https://").is_err());
    }

    #[test]
    fn test_join_url() {
        assert_eq!(join_url("http://h:1/", "/v2/x"), "http://h:1/v2/x");
        assert_eq!(join_url("http://h:1", "v2/x"), "http://h:1/v2/x");
    }

    #[test]
    fn test_create_http_client() {
        let client = create_http_client();
        assert!(client.get("http://example.com").build().is_ok());
    }
}
